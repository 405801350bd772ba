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

//! Running-time aggregation for the runtime distribution chart.

use crate::record::{Instance, RecordTable};
use crate::stats;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;

/// Mean of a timing field over the repeated runs of one algorithm on one
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMean {
    pub instance: Instance,
    pub algorithm: String,
    pub value: f64,
}

/// Average `field` per (graph, k, epsilon, algorithm).
///
/// Rows are sorted by instance, then algorithm. Cells holding a non-numeric
/// outcome are skipped; a group without any numeric cell is dropped.
pub fn aggregate_by_instance_mean(table: &RecordTable, field: &str) -> Result<Vec<InstanceMean>> {
    let mut groups: BTreeMap<(Instance, String), Vec<f64>> = BTreeMap::new();
    for record in table {
        let values = groups
            .entry((record.instance(), record.algorithm.clone()))
            .or_default();
        if let Some(value) = record.value(field)?.measured() {
            values.push(value);
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|((instance, algorithm), values)| match stats::arithmetic_mean(&values) {
            Some(value) => Some(InstanceMean {
                instance,
                algorithm,
                value,
            }),
            None => {
                log::debug!("No numeric `{}` for {} on {}", field, algorithm, instance);
                None
            }
        })
        .collect())
}

/// Geometric mean and maximum of the aggregated times of one algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSummary {
    pub algorithm: String,
    pub gmean: f64,
    pub max: f64,
}

impl fmt::Display for RuntimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Algo {} gmean time {} max time {}",
            self.algorithm, self.gmean, self.max
        )
    }
}

/// Distinct algorithms of `means`, in order of first appearance.
pub fn algorithms_of(means: &[InstanceMean]) -> Vec<String> {
    let mut algorithms: Vec<String> = Vec::new();
    for mean in means {
        if !algorithms.contains(&mean.algorithm) {
            algorithms.push(mean.algorithm.clone());
        }
    }
    algorithms
}

/// Per algorithm, the geometric mean and maximum of the aggregated times.
pub fn runtime_summary(means: &[InstanceMean]) -> Vec<RuntimeSummary> {
    algorithms_of(means)
        .into_iter()
        .filter_map(|algorithm| {
            let values: Vec<f64> = means
                .iter()
                .filter(|m| m.algorithm == algorithm)
                .map(|m| m.value)
                .collect();
            let gmean = stats::geometric_mean(&values)?;
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Some(RuntimeSummary {
                algorithm,
                gmean,
                max,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Objective;
    use crate::record::tests::record;

    const FIELD: &str = "totalPartitionTime";

    #[test]
    fn test_aggregate_averages_runs() {
        let mut timed_out = record("g1", 2, "a", FIELD, 0.0);
        timed_out.fields.insert(FIELD.to_string(), Objective::TimedOut);
        let table = RecordTable::new(vec![
            record("g2", 2, "a", FIELD, 4.0),
            record("g1", 2, "b", FIELD, 1.0),
            record("g1", 2, "a", FIELD, 2.0),
            record("g1", 2, "a", FIELD, 6.0),
            timed_out,
        ]);
        let means = aggregate_by_instance_mean(&table, FIELD).unwrap();
        let rows: Vec<(&str, &str, f64)> = means
            .iter()
            .map(|m| (m.instance.graph.as_str(), m.algorithm.as_str(), m.value))
            .collect();
        assert_eq!(
            rows,
            vec![("g1", "a", 4.0), ("g1", "b", 1.0), ("g2", "a", 4.0)]
        );
    }

    #[test]
    fn test_aggregate_requires_field() {
        let table = RecordTable::new(vec![record("g1", 2, "a", FIELD, 1.0)]);
        assert!(aggregate_by_instance_mean(&table, "other").is_err());
    }

    #[test]
    fn test_runtime_summary() {
        let table = RecordTable::new(vec![
            record("g1", 2, "a", FIELD, 1.0),
            record("g2", 2, "a", FIELD, 100.0),
            record("g1", 2, "b", FIELD, 3.0),
        ]);
        let means = aggregate_by_instance_mean(&table, FIELD).unwrap();
        let summary = runtime_summary(&means);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].algorithm, "a");
        assert!((summary[0].gmean - 10.0).abs() < 1e-9);
        assert_eq!(summary[0].max, 100.0);
        assert_eq!(summary[1].max, 3.0);
        assert!(summary[1].to_string().starts_with("Algo b gmean time 3"));
    }
}
