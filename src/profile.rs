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

//! Performance profiles.
//!
//! For every instance the best objective over all compared algorithms is
//! determined, and each algorithm's objective is divided by it. The sorted
//! ratios of one algorithm form a step function: the fraction of instances it
//! solved within a given factor of the best.

use crate::record::{Instance, Objective, RecordTable};
use crate::stats;
use anyhow::Result;
use std::collections::BTreeMap;

/// Per-instance, per-algorithm mean objective.
pub type InstanceMeans = BTreeMap<Instance, BTreeMap<String, Objective>>;

/// One vertex of a performance profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioEntry {
    pub algorithm: String,
    /// Fraction of all instances, in `[0, 1]`.
    pub fraction: f64,
    pub ratio: Objective,
}

/// Diagnostics for one algorithm of a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmSummary {
    pub algorithm: String,
    /// Instances on which the algorithm produced a measured ratio.
    pub solved: usize,
    /// Instances on which the algorithm matched the best.
    pub num_best: usize,
    /// Geometric mean over the measured ratios.
    pub gmean_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceProfile {
    /// Ordered by algorithm, then fraction.
    pub entries: Vec<RatioEntry>,
    pub summaries: Vec<AlgorithmSummary>,
    /// Instances no algorithm has a measured result for.
    pub unsolved: Vec<Instance>,
    /// Denominator of the fractions. Unsolved instances are counted.
    pub num_instances: usize,
}

/// Average repeated runs of each requested algorithm on each instance.
pub fn mean_per_instance(
    algos: &[String],
    table: &RecordTable,
    objective: &str,
) -> Result<InstanceMeans> {
    let mut runs: BTreeMap<Instance, BTreeMap<String, Vec<Objective>>> = BTreeMap::new();
    for record in table.iter().filter(|r| algos.contains(&r.algorithm)) {
        runs.entry(record.instance())
            .or_default()
            .entry(record.algorithm.clone())
            .or_default()
            .push(record.outcome(objective)?);
    }

    Ok(runs
        .into_iter()
        .map(|(instance, per_algo)| {
            let means = per_algo
                .into_iter()
                .map(|(algo, outcomes)| (algo, Objective::mean_of(&outcomes)))
                .collect();
            (instance, means)
        })
        .collect())
}

/// Minimum measured mean per instance. Instances without any measured mean are
/// absent.
pub fn best_per_instance(means: &InstanceMeans) -> BTreeMap<Instance, f64> {
    means
        .iter()
        .filter_map(|(instance, per_algo)| {
            per_algo
                .values()
                .filter_map(|mean| mean.measured())
                .min_by(f64::total_cmp)
                .map(|best| (instance.clone(), best))
        })
        .collect()
}

/// `objective / best`, with zero-cost bests handled without dividing by zero.
pub fn performance_ratio(objective: f64, best: f64) -> f64 {
    if best != 0.0 {
        objective / best
    } else if objective == 0.0 {
        1.0
    } else {
        objective + 1.0
    }
}

/// Turn one algorithm's ratios into profile vertices.
///
/// Equal ratios are coalesced into one vertex placed at the last occurrence of
/// the value, at fraction `index / num_instances`. When every ratio is exactly
/// one a single `(1.0, 1.0)` vertex is emitted.
pub fn profile_steps(
    algorithm: &str,
    ratios: &mut [Objective],
    num_instances: usize,
) -> Vec<RatioEntry> {
    ratios.sort_by(Objective::total_cmp);
    let n = num_instances.max(ratios.len()).max(1) as f64;

    let mut steps: Vec<RatioEntry> = ratios
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] != pair[1])
        .map(|(i, pair)| RatioEntry {
            algorithm: algorithm.to_string(),
            fraction: i as f64 / n,
            ratio: pair[0],
        })
        .collect();

    if !ratios.is_empty() && ratios.iter().all(|&r| r == Objective::Measured(1.0)) {
        steps.push(RatioEntry {
            algorithm: algorithm.to_string(),
            fraction: 1.0,
            ratio: Objective::Measured(1.0),
        });
    }
    steps
}

/// Compute the performance profile of `algos` on `instances`.
///
/// `instances` is the denominator of every fraction, so instances that no
/// algorithm solved (or that have no runs at all) still count.
pub fn performance_profiles(
    algos: &[String],
    instances: &[Instance],
    table: &RecordTable,
    objective: &str,
) -> Result<PerformanceProfile> {
    let means = mean_per_instance(algos, table, objective)?;
    let best_per_instance = best_per_instance(&means);

    let mut ratios: Vec<Vec<Objective>> = vec![Vec::new(); algos.len()];
    let mut unsolved = Vec::new();

    for instance in instances {
        let Some(&best) = best_per_instance.get(instance) else {
            log::debug!("No algorithm solved {}", instance);
            unsolved.push(instance.clone());
            continue;
        };
        let Some(per_algo) = means.get(instance) else {
            continue;
        };

        for (algo, algo_ratios) in algos.iter().zip(ratios.iter_mut()) {
            let Some(&mean) = per_algo.get(algo) else {
                continue;
            };
            let ratio = match mean {
                Objective::Measured(obj) => {
                    let r = performance_ratio(obj, best);
                    if r < 1.0 {
                        log::warn!(
                            "Ratio below one for {} on {}: objective {} < best {} (r = {})",
                            algo,
                            instance,
                            obj,
                            best,
                            r
                        );
                    }
                    Objective::Measured(r)
                }
                tag => tag,
            };
            algo_ratios.push(ratio);
        }
    }

    let max_ratio = ratios
        .iter()
        .flatten()
        .copied()
        .max_by(Objective::total_cmp);
    if let Some(max_ratio) = max_ratio {
        log::info!("max ratio = {}", max_ratio);
    }
    if !unsolved.is_empty() {
        log::info!("{} of {} instances unsolved", unsolved.len(), instances.len());
    }

    let mut entries = Vec::new();
    let mut summaries = Vec::with_capacity(algos.len());
    for (algo, algo_ratios) in algos.iter().zip(ratios.iter_mut()) {
        let measured: Vec<f64> = algo_ratios.iter().filter_map(|r| r.measured()).collect();
        let summary = AlgorithmSummary {
            algorithm: algo.clone(),
            solved: measured.len(),
            num_best: measured.iter().filter(|&&r| r == 1.0).count(),
            gmean_ratio: stats::geometric_mean(&measured),
        };
        log::info!(
            "{} solved {} instances. gmean performance ratio {}",
            algo,
            summary.solved,
            summary
                .gmean_ratio
                .map_or_else(|| "n/a".to_string(), |g| format!("{:.4}", g))
        );
        log::info!("{} is best on {} instances", algo, summary.num_best);
        summaries.push(summary);

        entries.extend(profile_steps(algo, algo_ratios, instances.len()));
    }

    Ok(PerformanceProfile {
        entries,
        summaries,
        unsolved,
        num_instances: instances.len(),
    })
}

/// Profiles of `baseline` against each other algorithm, one pair at a time.
pub fn pairwise_profiles(
    baseline: &str,
    algos: &[String],
    instances: &[Instance],
    table: &RecordTable,
    objective: &str,
) -> Result<Vec<(String, PerformanceProfile)>> {
    algos
        .iter()
        .filter(|algo| algo.as_str() != baseline)
        .map(|algo| {
            let pair = [baseline.to_string(), algo.clone()];
            Ok((algo.clone(), performance_profiles(&pair, instances, table, objective)?))
        })
        .collect()
}
