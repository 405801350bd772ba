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

//! Loading and normalizing benchmark logs.
//!
//! Each log is a comma separated table with a header row. Lines starting with
//! `#` are comments. Logs from different tool versions are harmonized:
//! missing `failed`/`timeout` columns are filled with `"no"` and the legacy
//! `partitionTime` column is read as `totalPartitionTime`.

use crate::record::{FLAG_NO, FLAG_YES, Objective, Record, RecordTable};
use anyhow::{Context, Result, anyhow, bail};
use csv::StringRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const COMMENT_MARKER: u8 = b'#';

/// Columns every log must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["graph", "k", "epsilon", "algorithm"];

/// Old column names and the names they are read as.
const RENAMED_COLUMNS: &[(&str, &str)] = &[("partitionTime", "totalPartitionTime")];

/// Options understood by the loader.
///
/// Deserializes from the option mapping used by the plotting tools:
///
/// ```
/// use perfplot::LoadOptions;
///
/// let json = r#"{"filter to threads": 8, "add threads to name": true}"#;
/// let options = LoadOptions::from_json(json).unwrap();
/// assert_eq!(options.filter_to_threads, Some(8));
/// assert!(options.add_threads_to_name);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    /// Keep only runs with this thread count.
    #[serde(rename = "filter to threads", default)]
    pub filter_to_threads: Option<u32>,
    /// Treat each thread count of an algorithm as its own series.
    #[serde(rename = "add threads to name", default)]
    pub add_threads_to_name: bool,
    /// Objective columns that must be present and numeric.
    #[serde(skip)]
    pub objectives: Vec<String>,
}

impl LoadOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse loader options")
    }

    pub fn with_objective(mut self, column: impl Into<String>) -> Self {
        let column = canonical_column(&column.into()).to_string();
        if !self.objectives.contains(&column) {
            self.objectives.push(column);
        }
        self
    }
}

/// Name `name` is read as, after renaming legacy columns.
pub fn canonical_column(name: &str) -> &str {
    RENAMED_COLUMNS
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
        .unwrap_or(name)
}

/// Fixed columns of one run. Objective columns vary per plot and are looked up
/// by position instead.
#[derive(Debug, Deserialize)]
struct RunRow {
    graph: String,
    k: u32,
    epsilon: f64,
    #[serde(default)]
    threads: Option<u32>,
    algorithm: String,
    #[serde(default = "flag_no")]
    failed: String,
    #[serde(default = "flag_no")]
    timeout: String,
    #[serde(default)]
    imbalance: Option<f64>,
}

fn flag_no() -> String {
    FLAG_NO.to_string()
}

/// Where the objective columns of one log are.
struct Layout {
    objectives: Vec<(String, usize)>,
    has_threads: bool,
}

impl Layout {
    fn resolve(headers: &StringRecord, source: &str, objectives: &[String]) -> Result<Self> {
        let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
        for (idx, name) in headers.iter().enumerate() {
            positions.entry(canonical_column(name)).or_insert(idx);
        }

        let require = |column: &str| -> Result<usize> {
            match positions.get(column) {
                Some(&idx) => Ok(idx),
                None => bail!("Missing required column `{}` in {}", column, source),
            }
        };

        for column in REQUIRED_COLUMNS {
            require(column)?;
        }
        let objectives = objectives
            .iter()
            .map(|name| -> Result<(String, usize)> { Ok((name.clone(), require(name)?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            objectives,
            has_threads: positions.contains_key("threads"),
        })
    }

    fn parse(&self, row: &StringRecord, headers: &StringRecord, source: &str) -> Result<Record> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let run: RunRow = row
            .deserialize(Some(headers))
            .map_err(|e| row_error(e, headers, source, line))?;
        let flagged = run.failed == FLAG_YES || run.timeout == FLAG_YES;

        let mut fields = BTreeMap::new();
        for (name, idx) in &self.objectives {
            let cell = row.get(*idx).unwrap_or("");
            let value = if cell.is_empty() && flagged {
                // Aborted runs often leave the objective blank.
                Objective::Unsolved
            } else {
                Objective::from_legacy(parse_objective(cell, name, source, line)?)
            };
            fields.insert(name.clone(), value);
        }

        Ok(Record {
            graph: run.graph,
            k: run.k,
            epsilon: run.epsilon,
            threads: run.threads,
            algorithm: run.algorithm,
            failed: run.failed,
            timeout: run.timeout,
            imbalance: run.imbalance,
            fields,
        })
    }
}

/// Name the offending column when csv can tell which field failed.
fn row_error(err: csv::Error, headers: &StringRecord, source: &str, line: u64) -> anyhow::Error {
    if let csv::ErrorKind::Deserialize { err, .. } = err.kind() {
        if let Some(column) = err.field().and_then(|idx| headers.get(idx as usize)) {
            return anyhow!(
                "Invalid value in column `{}` ({}:{}): {}",
                column,
                source,
                line,
                err.kind()
            );
        }
    }
    anyhow!("Malformed row in {}:{}: {}", source, line, err)
}

fn parse_objective(cell: &str, column: &str, source: &str, line: u64) -> Result<f64> {
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => bail!(
            "Column `{}` is not finite ({}) in {}:{}",
            column,
            value,
            source,
            line
        ),
        Err(_) => bail!(
            "Invalid value `{}` in column `{}` ({}:{})",
            cell,
            column,
            source,
            line
        ),
    }
}

/// Parse one log from `reader`. `source` names the log in error messages.
pub fn parse_table<R: Read>(reader: R, source: &str, options: &LoadOptions) -> Result<RecordTable> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(COMMENT_MARKER))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", source))?
        .clone();
    let layout = Layout::resolve(&headers, source, &options.objectives)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Malformed row in {}", source))?;
        records.push(layout.parse(&row, &headers, source)?);
    }

    conversion(RecordTable::new(records), options, layout.has_threads, source)
}

/// Apply the thread options to one freshly parsed log.
fn conversion(
    mut table: RecordTable,
    options: &LoadOptions,
    has_threads: bool,
    source: &str,
) -> Result<RecordTable> {
    if let Some(threads) = options.filter_to_threads {
        if !has_threads {
            bail!(
                "Cannot filter to {} threads: {} has no `threads` column",
                threads,
                source
            );
        }
        table.filter_threads(threads);
        log::debug!("{}: {} runs with {} threads", source, table.len(), threads);
    }

    if options.add_threads_to_name {
        table.add_threads_to_name();
    }

    Ok(table)
}

/// Read and normalize a single log file.
pub fn read_and_convert(path: &Path, options: &LoadOptions) -> Result<RecordTable> {
    let file =
        File::open(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let table = parse_table(file, &path.display().to_string(), options)?;
    log::info!("Loaded {} runs from {}", table.len(), path.display());
    Ok(table)
}

/// Read every log in `paths` and concatenate them into one table.
pub fn read_files<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Result<RecordTable> {
    if paths.is_empty() {
        bail!("No input files given");
    }

    let mut table = RecordTable::default();
    for path in paths {
        table.extend(read_and_convert(path.as_ref(), options)?);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
# produced by the partitioning experiments
graph,k,epsilon,threads,algorithm,partitionTime,judiciousLoad
g1,2,0.03,4,alpha,1.5,100
g1,2,0.03,8,alpha,1.0,110
g2,4,0.03,4,beta,3.25,2147483644
";

    fn options() -> LoadOptions {
        LoadOptions::default().with_objective("judiciousLoad")
    }

    #[test]
    fn test_missing_flags_default_to_no() {
        let table = parse_table(LOG.as_bytes(), "log.csv", &options()).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|r| r.failed == "no" && r.timeout == "no"));
    }

    #[test]
    fn test_partition_time_is_renamed() {
        let options = LoadOptions::default().with_objective("totalPartitionTime");
        let table = parse_table(LOG.as_bytes(), "log.csv", &options).unwrap();
        assert_eq!(
            table.records()[2].value("totalPartitionTime").unwrap(),
            Objective::Measured(3.25)
        );

        // The old name resolves to the same column.
        let legacy = LoadOptions::default().with_objective("partitionTime");
        assert_eq!(legacy.objectives, vec!["totalPartitionTime".to_string()]);
    }

    #[test]
    fn test_legacy_sentinel_cells() {
        let table = parse_table(LOG.as_bytes(), "log.csv", &options()).unwrap();
        assert_eq!(
            table.records()[2].value("judiciousLoad").unwrap(),
            Objective::TimedOut
        );
    }

    #[test]
    fn test_filter_to_threads_keeps_other_columns() {
        let mut options = options();
        options.filter_to_threads = Some(4);
        let table = parse_table(LOG.as_bytes(), "log.csv", &options).unwrap();
        let full = parse_table(LOG.as_bytes(), "log.csv", &self::options()).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.threads == Some(4)));
        assert_eq!(table.records()[0], full.records()[0]);
        assert_eq!(table.records()[1], full.records()[2]);
    }

    #[test]
    fn test_filter_requires_threads_column() {
        let log = "graph,k,epsilon,algorithm,judiciousLoad\ng,2,0.03,a,1\n";
        let mut options = options();
        options.filter_to_threads = Some(4);
        let err = parse_table(log.as_bytes(), "nothreads.csv", &options).unwrap_err();
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn test_add_threads_to_name() {
        let mut options = options();
        options.add_threads_to_name = true;
        let table = parse_table(LOG.as_bytes(), "log.csv", &options).unwrap();
        assert_eq!(
            table.algorithms(),
            vec!["alpha-4".to_string(), "alpha-8".to_string(), "beta-4".to_string()]
        );
    }

    #[test]
    fn test_missing_required_column() {
        let log = "graph,k,algorithm,judiciousLoad\ng,2,a,1\n";
        let err = parse_table(log.as_bytes(), "broken.csv", &options()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("epsilon"));
        assert!(message.contains("broken.csv"));

        let log = "graph,k,epsilon,algorithm\ng,2,0.03,a\n";
        let err = parse_table(log.as_bytes(), "broken.csv", &options()).unwrap_err();
        assert!(err.to_string().contains("judiciousLoad"));
    }

    #[test]
    fn test_unparseable_row() {
        let log = "graph,k,epsilon,algorithm,judiciousLoad\ng,two,0.03,a,1\n";
        let err = parse_table(log.as_bytes(), "bad.csv", &options()).unwrap_err();
        assert!(err.to_string().contains("`k`"));

        let log = "graph,k,epsilon,algorithm,judiciousLoad\ng,2,0.03,a\n";
        assert!(parse_table(log.as_bytes(), "short.csv", &options()).is_err());
    }

    #[test]
    fn test_non_finite_objective_is_rejected() {
        for cell in ["inf", "-inf", "NaN"] {
            let log = format!(
                "graph,k,epsilon,algorithm,judiciousLoad\ng,2,0.03,a,1\ng,4,0.03,a,{}\n",
                cell
            );
            let err = parse_table(log.as_bytes(), "inf.csv", &options()).unwrap_err();
            let message = err.to_string();
            assert!(message.contains("judiciousLoad"), "{}", message);
            assert!(message.contains("inf.csv:3"), "{}", message);
        }
    }

    #[test]
    fn test_empty_optional_cells() {
        let log = "graph,k,epsilon,threads,algorithm,imbalance,judiciousLoad\n\
                   g,2,0.03,,a,,5\n";
        let table = parse_table(log.as_bytes(), "sparse.csv", &options()).unwrap();
        let record = &table.records()[0];
        assert_eq!(record.threads, None);
        assert_eq!(record.imbalance, None);
        assert_eq!(record.value("judiciousLoad").unwrap(), Objective::Measured(5.0));
    }

    #[test]
    fn test_blank_objective_of_failed_run() {
        let log = "graph,k,epsilon,algorithm,failed,timeout,judiciousLoad\ng,2,0.03,a,yes,no,\n";
        let table = parse_table(log.as_bytes(), "failed.csv", &options()).unwrap();
        assert_eq!(
            table.records()[0].outcome("judiciousLoad").unwrap(),
            Objective::Unsolved
        );
    }

    #[test]
    fn test_options_from_json() {
        let options = LoadOptions::from_json(r#"{"filter to threads": 16}"#).unwrap();
        assert_eq!(options.filter_to_threads, Some(16));
        assert!(!options.add_threads_to_name);
        assert!(LoadOptions::from_json(r#"{"threads": 16}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_files(&["/nonexistent/run.csv"], &options()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.csv"));
        assert!(read_files::<&str>(&[], &options()).is_err());
    }
}
