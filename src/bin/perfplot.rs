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

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use perfplot::render::{ColorMap, LegendMode, PlotStyle, plot_performance_profile, plot_runtimes};
use perfplot::{
    LoadOptions, PerformanceProfile, RecordTable, aggregate_by_instance_mean, canonical_column,
    pairwise_profiles, performance_profiles, read_files, runtime_summary,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "perfplot")]
#[command(about = "Performance profiles and runtime charts for benchmark logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot the performance profile of an objective column
    Profile {
        /// Output prefix, e.g. 'plots/km1'
        prefix: String,
        /// Objective column to compare (lower is better)
        field: String,
        /// Benchmark logs (CSV)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
        /// Legend placement: inline, externalize, wide, lower-right, below or none
        #[arg(long, default_value = "inline")]
        legend: LegendMode,
        /// Also plot this algorithm against every other one, pair by pair
        #[arg(long)]
        baseline: Option<String>,
        /// Chart title
        #[arg(long)]
        title: Option<String>,
    },
    /// Plot per-instance running times, one row per k
    Runtime {
        /// Output prefix (may be empty)
        prefix: String,
        /// Timing column, e.g. 'totalPartitionTime'
        field: String,
        /// Benchmark logs (CSV)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// Keep only runs with this thread count
    #[arg(long)]
    filter_threads: Option<u32>,
    /// Suffix algorithm names with their thread count
    #[arg(long)]
    add_threads_to_name: bool,
    /// Loader options as JSON, e.g. '{"filter to threads": 64}'
    #[arg(long)]
    options: Option<String>,
    /// Drop algorithms whose name contains one of these (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
}

impl LoadArgs {
    /// Loader options; explicit flags win over the JSON mapping.
    fn load_options(&self, field: &str) -> Result<LoadOptions> {
        let mut options = match &self.options {
            Some(json) => LoadOptions::from_json(json)?,
            None => LoadOptions::default(),
        };
        if self.filter_threads.is_some() {
            options.filter_to_threads = self.filter_threads;
        }
        options.add_threads_to_name |= self.add_threads_to_name;
        Ok(options.with_objective(field))
    }

    fn load(&self, files: &[PathBuf], field: &str) -> Result<RecordTable> {
        let mut table = read_files(files, &self.load_options(field)?)?;
        if !self.exclude.is_empty() {
            table.exclude_algorithms(&self.exclude);
        }
        if table.is_empty() {
            bail!("No runs left to plot");
        }
        Ok(table)
    }
}

fn print_profile(title: &str, profile: &PerformanceProfile) {
    println!("\n{}", title.bold());
    println!(
        "  {} instances, {} unsolved by every algorithm",
        profile.num_instances,
        profile.unsolved.len()
    );
    for summary in &profile.summaries {
        let gmean = summary
            .gmean_ratio
            .map(|g| format!("{:.4}", g))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} solved {:>5}  best {:>5}  gmean ratio {}",
            summary.algorithm.cyan(),
            summary.solved,
            summary.num_best.green(),
            gmean
        );
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile {
            prefix,
            field,
            files,
            load,
            legend,
            baseline,
            title,
        } => {
            let field = canonical_column(&field).to_string();
            let table = load.load(&files, &field)?;
            let algos = table.algorithms();
            let instances = table.instances();
            let colors = ColorMap::new(&algos);
            let style = PlotStyle {
                title,
                ..PlotStyle::default()
            };

            if let Some(baseline) = &baseline {
                if !algos.contains(baseline) {
                    bail!("Baseline `{}` is not one of: {}", baseline, algos.join(", "));
                }
                let pairs = pairwise_profiles(baseline, &algos, &instances, &table, &field)?;
                for (algo, profile) in pairs {
                    let pair_prefix = format!("{}_{}_{}", prefix, baseline, algo);
                    print_profile(&format!("{} vs {}", baseline, algo), &profile);
                    plot_performance_profile(
                        &pair_prefix,
                        &profile.entries,
                        &colors,
                        legend,
                        &style,
                    )?;
                }
            }

            let profile = performance_profiles(&algos, &instances, &table, &field)?;
            print_profile(&format!("Performance profile of {}", field), &profile);
            let path =
                plot_performance_profile(&prefix, &profile.entries, &colors, legend, &style)?;
            if let Some(path) = path {
                println!("\n{} {}", "Generated:".green().bold(), path.display());
            }
        }
        Commands::Runtime {
            prefix,
            field,
            files,
            load,
        } => {
            let field = canonical_column(&field).to_string();
            let table = load.load(&files, &field)?;
            let algos = table.algorithms();
            let means = aggregate_by_instance_mean(&table, &field)?;

            println!("\n{}", format!("Running time ({})", field).bold());
            for summary in runtime_summary(&means) {
                println!("  {}", summary);
            }

            let path = plot_runtimes(
                &means,
                &ColorMap::new(&algos),
                &algos,
                &prefix,
                &field,
                &PlotStyle::default(),
            )?;
            println!("\n{} {}", "Generated:".green().bold(), path.display());
        }
    }

    Ok(())
}
