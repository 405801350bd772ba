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

//! # perfplot
//!
//! Performance profiles and runtime charts for algorithm benchmark results.
//!
//! Benchmark logs are CSV tables with one row per run (graph, k, epsilon,
//! algorithm and any number of measured columns). The pipeline is:
//!
//! 1. [`read_files`] loads and normalizes the logs into a [`RecordTable`].
//! 2. [`performance_profiles`] divides every algorithm's result on an
//!    instance by the best result on that instance and turns the sorted
//!    ratios into a step curve.
//! 3. [`render::plot_performance_profile`] draws the curves;
//!    [`render::plot_runtimes`] draws per-instance run times from
//!    [`aggregate_by_instance_mean`].
//!
//! ```no_run
//! use perfplot::render::{ColorMap, LegendMode, PlotStyle, plot_performance_profile};
//! use perfplot::{LoadOptions, performance_profiles, read_files};
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = LoadOptions::default().with_objective("km1");
//! let table = read_files(&["mt-kahypar.csv", "kahip.csv"], &options)?;
//! let algos = table.algorithms();
//! let profile = performance_profiles(&algos, &table.instances(), &table, "km1")?;
//! plot_performance_profile(
//!     "km1",
//!     &profile.entries,
//!     &ColorMap::new(&algos),
//!     LegendMode::Inline,
//!     &PlotStyle::default(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod profile;
pub mod record;
pub mod render;
pub mod runtime;
pub mod stats;

pub use loader::{LoadOptions, canonical_column, parse_table, read_and_convert, read_files};
pub use profile::{
    AlgorithmSummary, PerformanceProfile, RatioEntry, pairwise_profiles, performance_profiles,
};
pub use record::{Instance, Objective, Record, RecordTable};
pub use runtime::{InstanceMean, RuntimeSummary, aggregate_by_instance_mean, runtime_summary};
