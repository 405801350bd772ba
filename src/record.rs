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

//! In-memory benchmark table.
//!
//! A [`RecordTable`] holds one [`Record`] per benchmark run. Objective cells are
//! kept as [`Objective`] values so that non-numeric outcomes (timeouts,
//! imbalanced or missing solutions) travel through the pipeline as tags
//! instead of reserved numbers.

use anyhow::{Result, anyhow};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Largest objective value older logs could hold. The three integers directly
/// below it were reserved for non-numeric outcomes.
pub const LEGACY_MAX_OBJECTIVE: i64 = 2_147_483_647;

/// Status flag value marking a failed or timed-out run.
pub const FLAG_YES: &str = "yes";

/// Status flag value injected when a log has no `failed`/`timeout` column.
pub const FLAG_NO: &str = "no";

/// Outcome of a run (or of an aggregate over runs) for one objective.
///
/// Variants are totally ordered: every measured value sorts before
/// `TimedOut`, which sorts before `Imbalanced`, which sorts before `Unsolved`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    Measured(f64),
    TimedOut,
    Imbalanced,
    Unsolved,
}

impl Objective {
    /// Decode a numeric cell, mapping the legacy reserved integers to tags.
    pub fn from_legacy(value: f64) -> Self {
        if value == (LEGACY_MAX_OBJECTIVE - 1) as f64 {
            Objective::Unsolved
        } else if value == (LEGACY_MAX_OBJECTIVE - 2) as f64 {
            Objective::Imbalanced
        } else if value == (LEGACY_MAX_OBJECTIVE - 3) as f64 {
            Objective::TimedOut
        } else {
            Objective::Measured(value)
        }
    }

    pub fn measured(self) -> Option<f64> {
        match self {
            Objective::Measured(value) => Some(value),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Objective::Measured(_) => 0,
            Objective::TimedOut => 1,
            Objective::Imbalanced => 2,
            Objective::Unsolved => 3,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Objective::Measured(a), Objective::Measured(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Collapse repeated runs into one outcome.
    ///
    /// Measured runs are averaged and the failed ones ignored. When no run was
    /// measured the worst tag wins; an empty slice is `Unsolved`.
    pub fn mean_of(runs: &[Objective]) -> Objective {
        let measured: Vec<f64> = runs.iter().filter_map(|r| r.measured()).collect();
        if let Some(mean) = crate::stats::arithmetic_mean(&measured) {
            return Objective::Measured(mean);
        }
        runs.iter()
            .copied()
            .max_by(Objective::total_cmp)
            .unwrap_or(Objective::Unsolved)
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Measured(value) => write!(f, "{}", value),
            Objective::TimedOut => write!(f, "timeout"),
            Objective::Imbalanced => write!(f, "imbalanced"),
            Objective::Unsolved => write!(f, "unsolved"),
        }
    }
}

/// A problem configuration: graph, block count and imbalance tolerance.
#[derive(Debug, Clone)]
pub struct Instance {
    pub graph: String,
    pub k: u32,
    pub epsilon: f64,
}

impl Instance {
    pub fn new(graph: impl Into<String>, k: u32, epsilon: f64) -> Self {
        Self {
            graph: graph.into(),
            k,
            epsilon,
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Instance {}

impl PartialOrd for Instance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.graph
            .cmp(&other.graph)
            .then(self.k.cmp(&other.k))
            .then(self.epsilon.total_cmp(&other.epsilon))
    }
}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.graph.hash(state);
        self.k.hash(state);
        self.epsilon.to_bits().hash(state);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (k={}, eps={})", self.graph, self.k, self.epsilon)
    }
}

/// One benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub graph: String,
    pub k: u32,
    pub epsilon: f64,
    pub threads: Option<u32>,
    pub algorithm: String,
    pub failed: String,
    pub timeout: String,
    /// Achieved imbalance, when the log reports it.
    pub imbalance: Option<f64>,
    /// Objective columns requested at load time.
    pub fields: BTreeMap<String, Objective>,
}

impl Record {
    pub fn instance(&self) -> Instance {
        Instance::new(self.graph.clone(), self.k, self.epsilon)
    }

    pub fn has_failed(&self) -> bool {
        self.failed == FLAG_YES
    }

    pub fn has_timed_out(&self) -> bool {
        self.timeout == FLAG_YES
    }

    /// The cell stored for `field`, without looking at the status flags.
    pub fn value(&self, field: &str) -> Result<Objective> {
        self.fields.get(field).copied().ok_or_else(|| {
            anyhow!(
                "Column `{}` was not loaded for algorithm `{}` on {}",
                field,
                self.algorithm,
                self.instance()
            )
        })
    }

    /// The outcome of this run for `field`, with the status flags applied.
    pub fn outcome(&self, field: &str) -> Result<Objective> {
        let value = self.value(field)?;
        if self.has_timed_out() {
            Ok(Objective::TimedOut)
        } else if self.has_failed() {
            Ok(Objective::Unsolved)
        } else if self.imbalance.is_some_and(|imbalance| imbalance > self.epsilon) {
            Ok(Objective::Imbalanced)
        } else {
            Ok(value)
        }
    }
}

/// All runs loaded from one or more benchmark logs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the rows of `other`.
    pub fn extend(&mut self, other: RecordTable) {
        self.records.extend(other.records);
    }

    /// Keep only the runs executed with `threads` threads.
    pub fn filter_threads(&mut self, threads: u32) {
        self.records.retain(|r| r.threads == Some(threads));
    }

    pub fn thread_counts(&self) -> Vec<u32> {
        let mut counts: Vec<u32> = self.records.iter().filter_map(|r| r.threads).collect();
        counts.sort_unstable();
        counts.dedup();
        counts
    }

    /// Append `-<threads>` to every algorithm name when runs with more than
    /// one thread count are present.
    pub fn add_threads_to_name(&mut self) {
        if self.thread_counts().len() <= 1 {
            return;
        }
        for record in &mut self.records {
            if let Some(threads) = record.threads {
                record.algorithm = format!("{}-{}", record.algorithm, threads);
            }
        }
    }

    /// Drop every run whose algorithm name contains one of `patterns`.
    pub fn exclude_algorithms<S: AsRef<str>>(&mut self, patterns: &[S]) {
        self.records.retain(|r| {
            !patterns
                .iter()
                .any(|p| !p.as_ref().is_empty() && r.algorithm.contains(p.as_ref()))
        });
    }

    /// Distinct algorithm names in order of first appearance.
    pub fn algorithms(&self) -> Vec<String> {
        let mut algorithms: Vec<String> = Vec::new();
        for record in &self.records {
            if !algorithms.contains(&record.algorithm) {
                algorithms.push(record.algorithm.clone());
            }
        }
        algorithms
    }

    /// Cross product of the distinct graphs, block counts and tolerances.
    ///
    /// Not every returned instance necessarily has a run.
    pub fn instances(&self) -> Vec<Instance> {
        let mut graphs: Vec<&str> = Vec::new();
        let mut ks: Vec<u32> = Vec::new();
        let mut epsilons: Vec<f64> = Vec::new();
        for record in &self.records {
            if !graphs.contains(&record.graph.as_str()) {
                graphs.push(&record.graph);
            }
            if !ks.contains(&record.k) {
                ks.push(record.k);
            }
            if !epsilons.iter().any(|e| e.to_bits() == record.epsilon.to_bits()) {
                epsilons.push(record.epsilon);
            }
        }

        let mut instances = Vec::with_capacity(graphs.len() * ks.len() * epsilons.len());
        for graph in &graphs {
            for &k in &ks {
                for &epsilon in &epsilons {
                    instances.push(Instance::new(*graph, k, epsilon));
                }
            }
        }
        instances
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(graph: &str, k: u32, algorithm: &str, field: &str, value: f64) -> Record {
        Record {
            graph: graph.to_string(),
            k,
            epsilon: 0.03,
            threads: None,
            algorithm: algorithm.to_string(),
            failed: FLAG_NO.to_string(),
            timeout: FLAG_NO.to_string(),
            imbalance: None,
            fields: BTreeMap::from([(field.to_string(), Objective::Measured(value))]),
        }
    }

    #[test]
    fn test_legacy_sentinels_decode_to_tags() {
        assert_eq!(Objective::from_legacy(2147483646.0), Objective::Unsolved);
        assert_eq!(Objective::from_legacy(2147483645.0), Objective::Imbalanced);
        assert_eq!(Objective::from_legacy(2147483644.0), Objective::TimedOut);
        assert_eq!(Objective::from_legacy(12.5), Objective::Measured(12.5));
    }

    #[test]
    fn test_objective_order() {
        let mut values = vec![
            Objective::Unsolved,
            Objective::TimedOut,
            Objective::Measured(1e12),
            Objective::Imbalanced,
            Objective::Measured(1.0),
        ];
        values.sort_by(Objective::total_cmp);
        assert_eq!(
            values,
            vec![
                Objective::Measured(1.0),
                Objective::Measured(1e12),
                Objective::TimedOut,
                Objective::Imbalanced,
                Objective::Unsolved,
            ]
        );
    }

    #[test]
    fn test_mean_of_ignores_failed_runs() {
        let runs = [
            Objective::Measured(10.0),
            Objective::TimedOut,
            Objective::Measured(20.0),
        ];
        assert_eq!(Objective::mean_of(&runs), Objective::Measured(15.0));
        assert_eq!(
            Objective::mean_of(&[Objective::TimedOut, Objective::Imbalanced]),
            Objective::Imbalanced
        );
        assert_eq!(Objective::mean_of(&[]), Objective::Unsolved);
    }

    #[test]
    fn test_outcome_applies_status_flags() {
        let mut run = record("g", 2, "a", "cut", 7.0);
        assert_eq!(run.outcome("cut").unwrap(), Objective::Measured(7.0));

        run.imbalance = Some(0.05);
        assert_eq!(run.outcome("cut").unwrap(), Objective::Imbalanced);
        assert_eq!(run.value("cut").unwrap(), Objective::Measured(7.0));

        run.failed = FLAG_YES.to_string();
        assert_eq!(run.outcome("cut").unwrap(), Objective::Unsolved);

        run.timeout = FLAG_YES.to_string();
        assert_eq!(run.outcome("cut").unwrap(), Objective::TimedOut);

        assert!(run.outcome("time").is_err());
    }

    #[test]
    fn test_instances_are_cross_product() {
        let table = RecordTable::new(vec![
            record("g1", 2, "a", "cut", 1.0),
            record("g2", 4, "a", "cut", 1.0),
        ]);
        let instances = table.instances();
        assert_eq!(
            instances,
            vec![
                Instance::new("g1", 2, 0.03),
                Instance::new("g1", 4, 0.03),
                Instance::new("g2", 2, 0.03),
                Instance::new("g2", 4, 0.03),
            ]
        );
    }

    #[test]
    fn test_add_threads_to_name() {
        let mut one = record("g", 2, "a", "cut", 1.0);
        one.threads = Some(4);
        let mut two = one.clone();
        two.threads = Some(8);

        let mut single = RecordTable::new(vec![one.clone(), one.clone()]);
        single.add_threads_to_name();
        assert_eq!(single.algorithms(), vec!["a".to_string()]);

        let mut mixed = RecordTable::new(vec![one, two]);
        mixed.add_threads_to_name();
        assert_eq!(mixed.algorithms(), vec!["a-4".to_string(), "a-8".to_string()]);
    }

    #[test]
    fn test_exclude_algorithms() {
        let mut table = RecordTable::new(vec![
            record("g", 2, "KaHyPar-D 2", "cut", 1.0),
            record("g", 2, "KaHyPar-D 16", "cut", 1.0),
            record("g", 2, "KaHyPar-Q", "cut", 1.0),
        ]);
        table.exclude_algorithms(&["-D "]);
        assert_eq!(table.algorithms(), vec!["KaHyPar-Q".to_string()]);
    }
}
