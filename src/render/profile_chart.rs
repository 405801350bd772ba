// perfplot - Performance profiles for algorithm benchmark results
// Copyright (c) 2025 Oliver Seifert
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Performance-profile chart.
//!
//! The ratio axis is broken into up to three side-by-side panels: a zoom on
//! ratios just above one, the moderate range up to two, and the tail. When
//! timed-out or invalid results are present they are moved to the two decades
//! right above the largest measured ratio and the tail is drawn on a log
//! scale, so that real ratios stay compact.

use super::{
    Area, ColorMap, LegendEntry, LegendMode, PlotStyle, draw_legend, format_number, legend_size,
};
use crate::profile::RatioEntry;
use crate::record::Objective;
use anyhow::{Result, bail};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const PROFILE_SUFFIX: &str = "_performance_profile.svg";

/// Lower bounds of the three panels.
const LOWER_BOUNDS: [f64; 3] = [0.995, 1.1, 2.0];
const TAIL_HEADROOM: f64 = 1.05;
/// Tails reaching this ratio are drawn on a log scale.
const LOG_SCALE_FROM: f64 = 500.0;
const FRACTION_RANGE: Range<f64> = -0.01..1.01;

const X_LABEL_AREA: u32 = 45;
const Y_LABEL_AREA: u32 = 60;
const MARGIN: u32 = 10;
const BELOW_COLUMNS: usize = 2;
const EXTERNAL_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log10,
}

impl AxisScale {
    pub fn project(self, x: f64) -> f64 {
        match self {
            AxisScale::Linear => x,
            AxisScale::Log10 => x.log10(),
        }
    }
}

/// One panel of the broken ratio axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPanel {
    pub lo: f64,
    pub hi: f64,
    pub scale: AxisScale,
}

impl AxisPanel {
    /// Panel range in drawing coordinates.
    pub fn projected_range(&self) -> Range<f64> {
        self.scale.project(self.lo)..self.scale.project(self.hi)
    }
}

/// Panels needed to show ratios up to `max_ratio`.
///
/// A panel exists only when its lower bound is strictly below `max_ratio`; an
/// empty result means there is nothing to draw. With `log_tail` the last panel
/// uses a log scale.
pub fn axis_panels(max_ratio: f64, log_tail: bool) -> Vec<AxisPanel> {
    let upper_bounds = [LOWER_BOUNDS[1], LOWER_BOUNDS[2], max_ratio * TAIL_HEADROOM];
    let mut panels: Vec<AxisPanel> = LOWER_BOUNDS
        .iter()
        .zip(upper_bounds)
        .take_while(|(lo, _)| **lo < max_ratio)
        .map(|(&lo, hi)| AxisPanel {
            lo,
            hi,
            scale: AxisScale::Linear,
        })
        .collect();

    if log_tail {
        if let Some(last) = panels.last_mut() {
            last.scale = AxisScale::Log10;
        }
    }
    panels
}

/// Exponent of the first decade above `max_measured`. A ratio that is itself
/// a power of ten gets the next decade.
pub fn decade_base(max_measured: f64) -> i32 {
    let log = max_measured.max(1.0).log10();
    let base = log.ceil() as i32;
    if log.fract() == 0.0 { base + 1 } else { base }
}

/// Placement of the non-numeric ratios on the ratio axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelRemap {
    pub base: i32,
    pub show_timeout: bool,
    /// Imbalanced or unsolved results are present.
    pub show_invalid: bool,
}

impl SentinelRemap {
    pub fn new(entries: &[RatioEntry]) -> Self {
        let max_measured = entries
            .iter()
            .filter_map(|e| e.ratio.measured())
            .filter(|r| r.is_finite())
            .fold(1.0, f64::max);
        Self {
            base: decade_base(max_measured),
            show_timeout: entries.iter().any(|e| e.ratio == Objective::TimedOut),
            show_invalid: entries
                .iter()
                .any(|e| matches!(e.ratio, Objective::Imbalanced | Objective::Unsolved)),
        }
    }

    pub fn any(&self) -> bool {
        self.show_timeout || self.show_invalid
    }

    pub fn timeout_position(&self) -> f64 {
        10f64.powi(self.base)
    }

    pub fn invalid_position(&self) -> f64 {
        10f64.powi(self.base + 1)
    }

    /// X position of `ratio`.
    pub fn position(&self, ratio: Objective) -> f64 {
        match ratio {
            Objective::Measured(r) => r,
            Objective::TimedOut => self.timeout_position(),
            Objective::Imbalanced | Objective::Unsolved => self.invalid_position(),
        }
    }
}

/// Per algorithm, the `(ratio, fraction)` vertices with sentinels remapped.
pub(crate) fn curves(
    entries: &[RatioEntry],
    remap: &SentinelRemap,
) -> Vec<(String, Vec<(f64, f64)>)> {
    let mut curves: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    for entry in entries {
        let point = (remap.position(entry.ratio), entry.fraction);
        match curves.iter_mut().find(|(algo, _)| *algo == entry.algorithm) {
            Some((_, points)) => points.push(point),
            None => curves.push((entry.algorithm.clone(), vec![point])),
        }
    }
    curves
}

/// Project a polyline sorted by x into `panel`, cutting it at the panel edges.
pub(crate) fn clip_to_panel(points: &[(f64, f64)], panel: &AxisPanel) -> Vec<(f64, f64)> {
    let range = panel.projected_range();
    let projected: Vec<(f64, f64)> = points
        .iter()
        .filter(|(x, _)| panel.scale == AxisScale::Linear || *x > 0.0)
        .map(|&(x, y)| (panel.scale.project(x), y))
        .collect();

    let mut clipped = Vec::with_capacity(projected.len() + 2);
    for (i, &(x, y)) in projected.iter().enumerate() {
        if i > 0 {
            let (px, py) = projected[i - 1];
            for bound in [range.start, range.end] {
                if (px < bound && x > bound) || (px > bound && x < bound) {
                    let t = (bound - px) / (x - px);
                    clipped.push((bound, py + t * (y - py)));
                }
            }
        }
        if range.contains(&x) || x == range.end {
            clipped.push((x, y));
        }
    }
    clipped
}

fn tick_label(x: f64, panel: &AxisPanel, remap: &SentinelRemap) -> String {
    if panel.scale == AxisScale::Linear {
        return format_number(x);
    }

    let decade = x.round();
    if (x - decade).abs() > 1e-6 {
        return String::new();
    }
    let decade = decade as i32;
    if remap.any() && decade == remap.base {
        if remap.show_timeout { "timeout".to_string() } else { String::new() }
    } else if remap.any() && decade == remap.base + 1 {
        if remap.show_invalid { "invalid".to_string() } else { String::new() }
    } else {
        format_number(10f64.powi(decade))
    }
}

pub fn profile_chart_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", prefix, PROFILE_SUFFIX))
}

/// Path of an externalized legend: `<mode>.svg` in the chart's directory.
pub fn legend_path(prefix: &str, mode: LegendMode) -> PathBuf {
    let file = format!("{}.svg", mode.name());
    match Path::new(prefix).parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

/// Render `entries` to `<prefix>_performance_profile.svg`.
///
/// Returns `Ok(None)` without writing anything when the ratios leave no panel
/// to draw.
pub fn plot_performance_profile(
    prefix: &str,
    entries: &[RatioEntry],
    colors: &ColorMap,
    legend: LegendMode,
    style: &PlotStyle,
) -> Result<Option<PathBuf>> {
    if entries.is_empty() {
        log::warn!("No profile entries for {}, skipping", prefix);
        return Ok(None);
    }

    let remap = SentinelRemap::new(entries);
    if remap.any() {
        log::info!(
            "Remapping timeout to {} and invalid to {}",
            remap.timeout_position(),
            remap.invalid_position()
        );
    }
    let curves = curves(entries, &remap);
    let last_drawn = curves
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.0))
        .fold(f64::NEG_INFINITY, f64::max);

    if !last_drawn.is_finite() {
        bail!("Cannot draw a performance profile with ratio {} ({})", last_drawn, prefix);
    }
    let panels = axis_panels(last_drawn, last_drawn >= LOG_SCALE_FROM || remap.any());
    log::debug!("{} panels, max ratio {}", panels.len(), last_drawn);
    if panels.is_empty() {
        log::warn!(
            "Max ratio {} leaves no axis range to draw for {}, skipping",
            last_drawn,
            prefix
        );
        return Ok(None);
    }

    let legend_entries: Vec<LegendEntry> = curves
        .iter()
        .map(|(algo, _)| (algo.clone(), colors.get(algo)))
        .collect();
    let path = profile_chart_path(prefix);
    {
        let root = SVGBackend::new(&path, (style.width, style.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let plot_height = if legend == LegendMode::Below {
            let (_, height) = legend_size(&legend_entries, style, BELOW_COLUMNS);
            style.height.saturating_sub(height + MARGIN)
        } else {
            style.height
        };
        let (plot_area, below) = root.split_vertically(plot_height);
        let areas = plot_area.split_evenly((1, panels.len()));

        for (i, (area, panel)) in areas.iter().zip(&panels).enumerate() {
            draw_panel(
                area, i, panel, &panels, &curves, &remap, colors, legend, style,
            )?;
        }

        let (width, height) = legend_size(&legend_entries, style, 1);
        let anchor_at = |fx: f64, fy: f64| {
            (
                (style.width as f64 * fx) as i32,
                (style.height as f64 * (1.0 - fy)) as i32 - height as i32,
            )
        };
        match legend {
            LegendMode::Below => draw_legend(
                &below,
                &legend_entries,
                (Y_LABEL_AREA as i32, 0),
                style,
                BELOW_COLUMNS,
            )?,
            LegendMode::Wide => draw_legend(&root, &legend_entries, anchor_at(0.3, 0.3), style, 1)?,
            LegendMode::LowerRight => {
                let (x, y) = anchor_at(0.55, 0.2);
                let x = x.min(style.width as i32 - width as i32);
                draw_legend(&root, &legend_entries, (x, y), style, 1)?
            }
            LegendMode::Externalize => {
                write_external_legend(prefix, &legend_entries, style)?;
            }
            LegendMode::Inline | LegendMode::Hidden => {}
        }

        root.present()?;
    }

    log::info!("Generated: {}", path.display());
    Ok(Some(path))
}

#[allow(clippy::too_many_arguments)]
fn draw_panel(
    area: &Area<'_>,
    index: usize,
    panel: &AxisPanel,
    panels: &[AxisPanel],
    curves: &[(String, Vec<(f64, f64)>)],
    remap: &SentinelRemap,
    colors: &ColorMap,
    legend: LegendMode,
    style: &PlotStyle,
) -> Result<()> {
    let is_first = index == 0;
    let is_last = index + 1 == panels.len();
    // The axis title sits under the middle panel when there are three.
    let titled = if panels.len() == 3 { 1 } else { 0 };

    let mut chart = ChartBuilder::on(area)
        .margin_top(MARGIN)
        .margin_right(if is_last { MARGIN } else { 0 })
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(if is_first { Y_LABEL_AREA } else { 0 })
        .build_cartesian_2d(panel.projected_range(), FRACTION_RANGE)?;

    let format_x = |x: &f64| tick_label(*x, panel, remap);
    let format_y = |y: &f64| format_number(*y);
    let text = style.text(style.font_size);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(if panel.scale == AxisScale::Log10 { 12 } else { 4 })
            .y_labels(5)
            .x_label_formatter(&format_x)
            .y_label_formatter(&format_y)
            .label_style(text.clone())
            .axis_desc_style(text.clone());
        if !style.grid {
            mesh.disable_mesh();
        }
        if is_first {
            mesh.y_desc("fraction of instances");
        }
        if index == titled {
            mesh.x_desc("performance ratio");
        }
        mesh.draw()?;
    }

    for (algo, points) in curves {
        let color = colors.get(algo);
        let line = color.stroke_width(style.line_width);
        let clipped = clip_to_panel(points, panel);
        let series = chart.draw_series(LineSeries::new(clipped.clone(), line))?;
        if is_last {
            series
                .label(algo.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));
        }
        // A lone vertex has no line to show.
        if points.len() == 1 {
            chart.draw_series(clipped.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
        }
    }

    if is_last && legend == LegendMode::Inline {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE)
            .border_style(BLACK)
            .label_font(style.text(style.legend_font_size))
            .draw()?;
    }

    if let (true, Some(title)) = (is_last, &style.title) {
        let (width, height) = area.dim_in_pixel();
        area.draw(&Text::new(
            title.clone(),
            (width as i32 / 2, (height as f64 * 0.7) as i32),
            text.pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;
    }
    Ok(())
}

fn write_external_legend(
    prefix: &str,
    entries: &[LegendEntry],
    style: &PlotStyle,
) -> Result<PathBuf> {
    let path = legend_path(prefix, LegendMode::Externalize);
    let (width, height) = legend_size(entries, style, EXTERNAL_COLUMNS);
    {
        let size = (width + 2 * MARGIN, height + 2 * MARGIN);
        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw_legend(
            &root,
            entries,
            (MARGIN as i32, MARGIN as i32),
            style,
            EXTERNAL_COLUMNS,
        )?;
        root.present()?;
    }
    log::info!("Generated: {}", path.display());
    Ok(path)
}
