//! Per-folder filename classification.
//!
//! A folder carries a `rule.json` describing how to cut file names into
//! tokens and which tokens identify a row (e.g. the sample) and a column
//! (e.g. the read direction). Rows holding exactly one file per header column
//! are valid; everything else is reported.

pub mod export;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;

pub use export::{export_results_csv, save_invalid_files};

pub const RULE_FILE: &str = "rule.json";

/// Column key → file name for one row.
pub type RowCells = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    pub version: String,
    pub delimiter: Vec<String>,
    pub header: Vec<String>,
    pub row_rules: MatchRules,
    pub column_rules: MatchRules,
    pub size_rules: SizeRules,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchRules {
    pub match_parts: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeRules {
    pub min_size: i64,
    pub max_size: i64,
}

/// Read `<folder>/rule.json`.
pub fn load_rule_set(folder_path: &Path) -> Result<RuleSet, Error> {
    let metadata = fs::metadata(folder_path)?;
    if !metadata.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path is not a directory: {}", folder_path.display()),
        )));
    }

    let rule_path = folder_path.join(RULE_FILE);
    if !rule_path.is_file() {
        return Err(Error::RuleNotFound(folder_path.to_path_buf()));
    }

    let data = fs::read_to_string(&rule_path)?;
    Ok(serde_json::from_str(&data)?)
}

/// A rule set is valid unless some token index is claimed by both the row
/// and the column rules. Unused indices are fine.
pub fn validate_rule_set(rule_set: &RuleSet) -> bool {
    let row: BTreeSet<usize> = rule_set.row_rules.match_parts.iter().copied().collect();
    let column: BTreeSet<usize> = rule_set.column_rules.match_parts.iter().copied().collect();

    let conflicts: Vec<usize> = row.intersection(&column).copied().collect();
    if !conflicts.is_empty() {
        warn!(
            "Conflict detected: parts {:?} used by both row and column rules",
            conflicts
        );
        return false;
    }
    true
}

/// Replace every delimiter with a space and split on whitespace.
pub fn split_file_name(file_name: &str, delimiters: &[String]) -> Vec<String> {
    let mut name = file_name.to_string();
    for delim in delimiters.iter().filter(|d| !d.is_empty()) {
        name = name.replace(delim.as_str(), " ");
    }
    name.split_whitespace().map(str::to_string).collect()
}

fn build_key(parts: &[String], indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|&idx| parts.get(idx).map(String::as_str))
        .collect::<Vec<_>>()
        .join("_")
}

/// File names grouped into rows and columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Row index → cells. Indices follow first-seen order of the row keys.
    pub rows: BTreeMap<usize, RowCells>,
    /// `row_keys[i]` is the key that produced row `i`.
    pub row_keys: Vec<String>,
    /// Cells replaced by a later file with the same row and column key.
    pub overwritten: usize,
}

/// Group file names into `rows[row_index][column_key] = file_name`.
///
/// A later file landing on an occupied cell replaces the earlier one; the
/// number of replacements is kept in `overwritten`.
pub fn classify(file_names: &[String], rule_set: &RuleSet) -> Classification {
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut result = Classification::default();

    for file_name in file_names {
        let parts = split_file_name(file_name, &rule_set.delimiter);

        let row_key = build_key(&parts, &rule_set.row_rules.match_parts);
        let idx = *row_index.entry(row_key.clone()).or_insert_with(|| {
            result.row_keys.push(row_key);
            result.row_keys.len() - 1
        });

        let column_key = build_key(&parts, &rule_set.column_rules.match_parts);
        if let Some(previous) = result
            .rows
            .entry(idx)
            .or_default()
            .insert(column_key.clone(), file_name.clone())
        {
            warn!(
                "{} replaces {} at row {} column {:?}",
                file_name, previous, idx, column_key
            );
            result.overwritten += 1;
        }
    }

    result
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Complete rows, renumbered 0..n in row-key order.
    pub valid: BTreeMap<usize, RowCells>,
    /// Rows whose column count differs from the header, in row-key order.
    pub invalid: Vec<RowCells>,
}

/// Split rows by column count. Rows are visited sorted by their row key so
/// the numbering of valid rows is the same on every run.
pub fn partition(classification: &Classification, expected_columns: usize) -> Partition {
    let mut ordered: Vec<(&str, &RowCells)> = classification
        .rows
        .iter()
        .map(|(idx, cells)| {
            let key = classification
                .row_keys
                .get(*idx)
                .map(String::as_str)
                .unwrap_or_default();
            (key, cells)
        })
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    let mut result = Partition::default();
    for (_, cells) in ordered {
        if cells.len() == expected_columns {
            let next = result.valid.len();
            result.valid.insert(next, cells.clone());
        } else {
            result.invalid.push(cells.clone());
        }
    }
    result
}
