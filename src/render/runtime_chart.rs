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

//! Runtime distribution chart: one row per block count, each showing the
//! per-instance mean times of every algorithm on a log time axis.

use super::{Area, ColorMap, PlotStyle, format_number};
use crate::runtime::InstanceMean;
use crate::stats::{self, BoxStats};
use anyhow::{Result, bail};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::PathBuf;

pub const RUNTIME_SUFFIX: &str = "runtime_plot.svg";

/// Width of the geometric-mean annotation next to each row.
const ANNOTATION_WIDTH: u32 = 260;
const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
/// Half the horizontal spread of the points around their category.
const JITTER: f64 = 0.2;
const BOX_HALF_WIDTH: f64 = 0.3;
const POINT_SIZE: u32 = 3;

pub fn runtime_chart_path(prefix: &str) -> PathBuf {
    if prefix.is_empty() {
        PathBuf::from(RUNTIME_SUFFIX)
    } else {
        PathBuf::from(format!("{}_{}", prefix, RUNTIME_SUFFIX))
    }
}

/// Horizontal offset of the `index`-th point of a strip. Low discrepancy and
/// deterministic, so repeated runs produce identical charts.
fn jitter(index: usize) -> f64 {
    ((index as f64 * GOLDEN_RATIO).fract() * 2.0 - 1.0) * JITTER
}

fn format_seconds(value: f64) -> String {
    if value >= 0.01 {
        format_number(value)
    } else {
        format!("{:e}", value)
    }
}

/// Category order on the x axis: `preferred` first, then any algorithm of
/// `means` it does not name, in order of appearance.
fn axis_order(means: &[InstanceMean], preferred: &[String]) -> Vec<String> {
    let mut order: Vec<String> = preferred
        .iter()
        .filter(|algo| means.iter().any(|m| &m.algorithm == *algo))
        .cloned()
        .collect();
    for mean in means {
        if !order.contains(&mean.algorithm) {
            order.push(mean.algorithm.clone());
        }
    }
    order
}

/// Geometric-mean annotation of one panel, one line per algorithm that has
/// data in it.
pub(crate) fn gmean_lines(panel: &[&InstanceMean], order: &[String]) -> Vec<(String, String)> {
    order
        .iter()
        .filter_map(|algo| {
            let values: Vec<f64> = panel
                .iter()
                .filter(|m| &m.algorithm == algo)
                .map(|m| m.value)
                .collect();
            let gmean = stats::geometric_mean(&values)?;
            Some((algo.clone(), format!("{}: {:.2}s", algo, gmean)))
        })
        .collect()
}

/// Render `means` to `<prefix>_runtime_plot.svg`.
///
/// `algo_order` fixes the category order and the colors; algorithms it does
/// not name are appended.
pub fn plot_runtimes(
    means: &[InstanceMean],
    colors: &ColorMap,
    algo_order: &[String],
    prefix: &str,
    field: &str,
    style: &PlotStyle,
) -> Result<PathBuf> {
    let drawable: Vec<&InstanceMean> = means.iter().filter(|m| m.value > 0.0).collect();
    if drawable.len() < means.len() {
        log::warn!(
            "Skipping {} non-positive `{}` values on the log time axis",
            means.len() - drawable.len(),
            field
        );
    }
    if drawable.is_empty() {
        bail!("No positive `{}` values to plot", field);
    }

    let mut ks: Vec<u32> = drawable.iter().map(|m| m.instance.k).collect();
    ks.sort_unstable();
    ks.dedup();
    let order = axis_order(means, algo_order);

    let path = runtime_chart_path(prefix);
    {
        let size = (style.width + ANNOTATION_WIDTH, style.height * ks.len() as u32);
        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE)?;

        for (row, k) in root.split_evenly((ks.len(), 1)).iter().zip(&ks) {
            let panel: Vec<&InstanceMean> = drawable
                .iter()
                .copied()
                .filter(|m| m.instance.k == *k)
                .collect();
            let (plot_area, note_area) = row.split_horizontally(style.width);
            draw_panel(&plot_area, *k, &panel, &order, colors, style)?;
            draw_annotation(&note_area, &gmean_lines(&panel, &order), colors, style)?;
        }
        root.present()?;
    }

    log::info!("Generated: {}", path.display());
    Ok(path)
}

fn draw_panel(
    area: &Area<'_>,
    k: u32,
    panel: &[&InstanceMean],
    order: &[String],
    colors: &ColorMap,
    style: &PlotStyle,
) -> Result<()> {
    let lo = panel.iter().map(|m| m.value).fold(f64::INFINITY, f64::min);
    let hi = panel.iter().map(|m| m.value).fold(f64::NEG_INFINITY, f64::max);

    let text = style.text(style.font_size);
    let mut chart = ChartBuilder::on(area)
        .caption(format!("k={}", k), text.clone())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5..(order.len() as f64 - 0.5),
            (lo / 1.5..hi * 1.5).log_scale(),
        )?;

    let format_x = |x: &f64| {
        let idx = x.round();
        if idx >= 0.0 && (x - idx).abs() < 0.3 {
            order.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    let format_y = |y: &f64| format_seconds(*y);
    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(order.len())
            .x_label_formatter(&format_x)
            .y_labels(8)
            .y_label_formatter(&format_y)
            .y_desc("Time [s]")
            .label_style(text.clone())
            .axis_desc_style(text);
        if !style.grid {
            mesh.disable_y_mesh();
        }
        mesh.draw()?;
    }

    for (idx, algo) in order.iter().enumerate() {
        let values: Vec<f64> = panel
            .iter()
            .filter(|m| &m.algorithm == algo)
            .map(|m| m.value)
            .collect();
        let Some(summary) = BoxStats::from_values(&values) else { continue };
        let color = colors.get(algo);
        let x = idx as f64;

        let point = color.mix(0.4).filled();
        chart.draw_series(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| Circle::new((x + jitter(i), v), POINT_SIZE, point)),
        )?;

        let line = color.stroke_width(style.line_width);
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        let cap = BOX_HALF_WIDTH / 2.0;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, summary.q1), (right, summary.q3)],
            line,
        )))?;
        chart.draw_series(
            [
                vec![(left, summary.median), (right, summary.median)],
                vec![(x, summary.q3), (x, summary.whisker_high)],
                vec![(x, summary.q1), (x, summary.whisker_low)],
                vec![
                    (x - cap, summary.whisker_high),
                    (x + cap, summary.whisker_high),
                ],
                vec![(x - cap, summary.whisker_low), (x + cap, summary.whisker_low)],
            ]
            .into_iter()
            .map(|points| PathElement::new(points, line)),
        )?;
    }
    Ok(())
}

fn draw_annotation(
    area: &Area<'_>,
    lines: &[(String, String)],
    colors: &ColorMap,
    style: &PlotStyle,
) -> Result<()> {
    let line_height = (style.font_size * 1.5) as i32;
    let (_, height) = area.dim_in_pixel();
    let top = (height as i32 - line_height * lines.len() as i32) / 2;

    area.draw(&Text::new(
        "gmean time",
        (10, top - line_height),
        style.text(style.font_size).pos(Pos::new(HPos::Left, VPos::Center)),
    ))?;
    for (i, (algo, line)) in lines.iter().enumerate() {
        let color = colors.get(algo);
        let font = style
            .text(style.font_size)
            .color(&color)
            .pos(Pos::new(HPos::Left, VPos::Center));
        area.draw(&Text::new(line.clone(), (10, top + i as i32 * line_height), font))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Instance;

    fn mean(graph: &str, k: u32, algorithm: &str, value: f64) -> InstanceMean {
        InstanceMean {
            instance: Instance::new(graph, k, 0.03),
            algorithm: algorithm.to_string(),
            value,
        }
    }

    fn names(algos: &[&str]) -> Vec<String> {
        algos.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_runtime_chart_path() {
        assert_eq!(runtime_chart_path(""), PathBuf::from("runtime_plot.svg"));
        assert_eq!(
            runtime_chart_path("out/km1"),
            PathBuf::from("out/km1_runtime_plot.svg")
        );
    }

    #[test]
    fn test_jitter_is_deterministic_and_bounded() {
        for i in 0..100 {
            assert_eq!(jitter(i), jitter(i));
            assert!(jitter(i).abs() <= JITTER);
        }
        assert_ne!(jitter(1), jitter(2));
    }

    #[test]
    fn test_axis_order_appends_unknown() {
        let means = vec![
            mean("g", 2, "c", 1.0),
            mean("g", 2, "a", 1.0),
            mean("g", 2, "b", 1.0),
        ];
        assert_eq!(
            axis_order(&means, &names(&["b", "missing", "a"])),
            names(&["b", "a", "c"])
        );
    }

    #[test]
    fn test_gmean_lines_only_present_algorithms() {
        let means = vec![
            mean("g1", 2, "a", 1.0),
            mean("g2", 2, "a", 4.0),
            mean("g1", 2, "c", 3.0),
        ];
        let panel: Vec<&InstanceMean> = means.iter().collect();
        let lines = gmean_lines(&panel, &names(&["a", "b", "c"]));
        assert_eq!(
            lines,
            vec![
                ("a".to_string(), "a: 2.00s".to_string()),
                ("c".to_string(), "c: 3.00s".to_string()),
            ]
        );
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(12.5), "12.5");
        assert_eq!(format_seconds(0.001), "1e-3");
    }

    #[test]
    fn test_plot_runtimes_writes_chart() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("km1");
        let means = vec![
            mean("g1", 2, "a", 1.0),
            mean("g2", 2, "a", 2.0),
            mean("g1", 2, "b", 0.5),
            mean("g1", 4, "a", 3.0),
            mean("g2", 4, "b", 0.0),
            mean("g1", 4, "b", 0.25),
        ];
        let algos = names(&["a", "b"]);
        let path = plot_runtimes(
            &means,
            &ColorMap::new(&algos),
            &algos,
            prefix.to_str().unwrap(),
            "totalPartitionTime",
            &PlotStyle::default(),
        )
        .unwrap();
        assert_eq!(path, dir.path().join("km1_runtime_plot.svg"));
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("k=2"));
        assert!(svg.contains("k=4"));
        assert!(svg.contains("gmean time"));
        // The 0.0 run of b is not drawn and does not drag its gmean to zero.
        for line in ["a: 1.41s", "b: 0.50s", "a: 3.00s", "b: 0.25s"] {
            assert!(svg.contains(line), "missing `{}`", line);
        }
    }

    #[test]
    fn test_plot_runtimes_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("none");
        let result = plot_runtimes(
            &[mean("g", 2, "a", 0.0)],
            &ColorMap::new(&["a"]),
            &[],
            prefix.to_str().unwrap(),
            "totalPartitionTime",
            &PlotStyle::default(),
        );
        assert!(result.is_err());
    }
}
