use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use super::RowCells;
use crate::error::Error;

pub const CSV_FILE: &str = "fileblock.csv";

/// Report names carry `.invalid` so the default exclusions keep them out of
/// the catalog.
pub const INVALID_REPORT_PREFIX: &str = "invalid_files_";
pub const INVALID_REPORT_SUFFIX: &str = ".invalid.txt";

fn ensure_dir(path: &Path) -> Result<(), Error> {
    if !fs::metadata(path)?.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("output path is not a directory: {}", path.display()),
        )));
    }
    Ok(())
}

/// Write valid rows to `<output_dir>/fileblock.csv` for people to look at.
///
/// First record is `Row` followed by the rule header; each data record is
/// `Row<i>` followed by the cells of the sorted union of column keys, blank
/// where a row lacks that column.
pub fn export_results_csv(
    valid: &BTreeMap<usize, RowCells>,
    headers: &[String],
    output_dir: &Path,
) -> Result<PathBuf, Error> {
    ensure_dir(output_dir)?;
    let csv_path = output_dir.join(CSV_FILE);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&csv_path)?;

    let mut header_row = vec!["Row".to_string()];
    header_row.extend(headers.iter().cloned());
    writer.write_record(&header_row)?;

    let column_keys: BTreeSet<&str> = valid
        .values()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    for (idx, row) in valid {
        let mut record = Vec::with_capacity(column_keys.len() + 1);
        record.push(format!("Row{}", idx));
        for key in &column_keys {
            record.push(row.get(*key).cloned().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", valid.len(), csv_path.display());
    Ok(csv_path)
}

/// Append every file name of the invalid rows, one per line, to a report
/// named after the current time. Nothing is created when there are none.
pub fn save_invalid_files(
    invalid: &[RowCells],
    output_dir: &Path,
) -> Result<Option<PathBuf>, Error> {
    if invalid.is_empty() {
        return Ok(None);
    }
    ensure_dir(output_dir)?;

    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let report_path = output_dir.join(format!(
        "{}{}{}",
        INVALID_REPORT_PREFIX, stamp, INVALID_REPORT_SUFFIX
    ));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)?;
    let mut out = BufWriter::new(file);
    for row in invalid {
        for file_name in row.values() {
            writeln!(out, "{}", file_name)?;
        }
    }
    out.flush()?;

    debug!(
        "Recorded {} invalid rows in {}",
        invalid.len(),
        report_path.display()
    );
    Ok(Some(report_path))
}
