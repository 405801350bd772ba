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

//! Chart rendering.
//!
//! All styling is carried by an explicit [`PlotStyle`] value, so charts with
//! different looks can be produced side by side in one run.

pub mod profile_chart;
pub mod runtime_chart;

pub use profile_chart::{
    AxisPanel, AxisScale, PROFILE_SUFFIX, SentinelRemap, axis_panels, decade_base,
    plot_performance_profile, profile_chart_path,
};
pub use runtime_chart::{RUNTIME_SUFFIX, plot_runtimes, runtime_chart_path};

use anyhow::{Result, bail};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub(crate) type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Seaborn's default ("deep") palette.
const PALETTE: [RGBColor; 10] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
    RGBColor(218, 139, 195),
    RGBColor(140, 140, 140),
    RGBColor(204, 185, 116),
    RGBColor(100, 181, 205),
];

const UNKNOWN_COLOR: RGBColor = RGBColor(128, 128, 128);

// Legend box layout, in pixels.
const LEGEND_PADDING: i32 = 8;
const SWATCH_WIDTH: i32 = 22;
const SWATCH_GAP: i32 = 6;
const COLUMN_GAP: f64 = 14.0;

/// Fonts, sizes and decorations of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub font_family: String,
    pub font_size: f64,
    pub legend_font_size: f64,
    /// Width of the plotting region in pixels.
    pub width: u32,
    /// Height of one chart row in pixels.
    pub height: u32,
    pub line_width: u32,
    pub grid: bool,
    pub title: Option<String>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            font_family: "serif".to_string(),
            font_size: 14.0,
            legend_font_size: 12.0,
            width: 640,
            height: 400,
            line_width: 2,
            grid: true,
            title: None,
        }
    }
}

impl PlotStyle {
    pub(crate) fn text(&self, size: f64) -> TextStyle<'_> {
        (self.font_family.as_str(), size).into_font().color(&BLACK)
    }
}

/// Fixed color per algorithm, shared by every chart of a run.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    colors: BTreeMap<String, RGBColor>,
}

impl ColorMap {
    /// Assign palette colors in the order of `algos`, cycling when there are
    /// more algorithms than colors.
    pub fn new<S: AsRef<str>>(algos: &[S]) -> Self {
        let colors = algos
            .iter()
            .zip(PALETTE.iter().cycle())
            .map(|(algo, color)| (algo.as_ref().to_string(), *color))
            .collect();
        Self { colors }
    }

    pub fn get(&self, algo: &str) -> RGBColor {
        self.colors.get(algo).copied().unwrap_or(UNKNOWN_COLOR)
    }
}

/// Where the legend of a performance profile goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendMode {
    /// Inside the rightmost panel.
    #[default]
    Inline,
    /// Into a separate `<mode>.svg` file next to the chart.
    Externalize,
    /// Over the figure, left of center.
    Wide,
    /// Over the figure, lower right.
    LowerRight,
    /// In a strip below the panels.
    Below,
    Hidden,
}

impl LegendMode {
    pub fn name(self) -> &'static str {
        match self {
            LegendMode::Inline => "inline",
            LegendMode::Externalize => "externalize",
            LegendMode::Wide => "wide",
            LegendMode::LowerRight => "lower-right",
            LegendMode::Below => "below",
            LegendMode::Hidden => "none",
        }
    }
}

impl fmt::Display for LegendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LegendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mode = match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "yes" => LegendMode::Inline,
            "externalize" => LegendMode::Externalize,
            "wide" => LegendMode::Wide,
            "lower-right" | "lower right" => LegendMode::LowerRight,
            "below" => LegendMode::Below,
            "none" | "no" | "hidden" => LegendMode::Hidden,
            other => bail!(
                "Unknown legend mode `{}` \
                 (expected inline, externalize, wide, lower-right, below or none)",
                other
            ),
        };
        Ok(mode)
    }
}

/// Compact tick label: at most three decimals, trailing zeros removed.
pub(crate) fn format_number(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        t => t.to_string(),
    }
}

pub(crate) type LegendEntry = (String, RGBColor);

fn legend_grid(entries: &[LegendEntry], columns: usize) -> (usize, usize) {
    let columns = columns.clamp(1, entries.len().max(1));
    (columns, entries.len().div_ceil(columns))
}

fn legend_cell(entries: &[LegendEntry], style: &PlotStyle) -> (f64, f64) {
    let longest = entries.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let width = (SWATCH_WIDTH + SWATCH_GAP) as f64
        + longest as f64 * style.legend_font_size * 0.6
        + COLUMN_GAP;
    (width, style.legend_font_size * 1.6)
}

/// Pixel size of the legend box [`draw_legend`] draws.
pub(crate) fn legend_size(
    entries: &[LegendEntry],
    style: &PlotStyle,
    columns: usize,
) -> (u32, u32) {
    let (columns, rows) = legend_grid(entries, columns);
    let (cell_width, cell_height) = legend_cell(entries, style);
    (
        (cell_width * columns as f64) as u32 + 2 * LEGEND_PADDING as u32,
        (cell_height * rows as f64) as u32 + 2 * LEGEND_PADDING as u32,
    )
}

/// Draw a framed legend with its top left corner at `origin`.
pub(crate) fn draw_legend(
    area: &Area<'_>,
    entries: &[LegendEntry],
    origin: (i32, i32),
    style: &PlotStyle,
    columns: usize,
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let (width, height) = legend_size(entries, style, columns);
    let corner = (origin.0 + width as i32, origin.1 + height as i32);
    area.draw(&Rectangle::new([origin, corner], WHITE.filled()))?;
    area.draw(&Rectangle::new([origin, corner], BLACK.stroke_width(1)))?;

    let (columns, _) = legend_grid(entries, columns);
    let (cell_width, cell_height) = legend_cell(entries, style);
    let font = style
        .text(style.legend_font_size)
        .pos(Pos::new(HPos::Left, VPos::Center));

    for (i, (label, color)) in entries.iter().enumerate() {
        let x = origin.0 + LEGEND_PADDING + ((i % columns) as f64 * cell_width) as i32;
        let y = origin.1 + LEGEND_PADDING + (((i / columns) as f64 + 0.5) * cell_height) as i32;
        area.draw(&PathElement::new(
            vec![(x, y), (x + SWATCH_WIDTH, y)],
            color.stroke_width(style.line_width),
        ))?;
        area.draw(&Text::new(
            label.clone(),
            (x + SWATCH_WIDTH + SWATCH_GAP, y),
            font.clone(),
        ))?;
    }
    Ok(())
}
