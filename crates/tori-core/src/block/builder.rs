use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{save_block, FileBlock, Row};
use crate::error::Error;
use crate::progress::SyncReporter;
use crate::rules::{self, RowCells};
use crate::storage::models::FolderFiles;

/// `<folder>/<folder base name>files.pb`
pub fn file_block_path(folder_path: &Path) -> PathBuf {
    let base = folder_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    folder_path.join(format!("{}files.pb", base))
}

/// Turn valid rows into a FileBlock, rows in ascending index order.
pub fn to_file_block(valid: &BTreeMap<usize, RowCells>, headers: &[String], block_id: &str) -> FileBlock {
    FileBlock {
        block_id: block_id.to_string(),
        column_headers: headers.to_vec(),
        rows: valid
            .iter()
            .map(|(idx, cells)| Row {
                row_number: *idx as i32,
                cell_columns: cells.clone(),
            })
            .collect(),
    }
}

/// Classify one folder's files with its `rule.json` and write the results:
/// `fileblock.csv`, an invalid-row report when needed, and the binary
/// FileBlock (always overwritten).
pub fn build_file_block(folder_path: &str, file_names: &[String]) -> Result<FileBlock, Error> {
    let folder = Path::new(folder_path);

    let rule_set = rules::load_rule_set(folder)?;
    if !rules::validate_rule_set(&rule_set) {
        return Err(Error::InvalidRuleSet(folder_path.to_string()));
    }

    let classification = rules::classify(file_names, &rule_set);
    let partition = rules::partition(&classification, rule_set.header.len());

    rules::export_results_csv(&partition.valid, &rule_set.header, folder)?;
    rules::save_invalid_files(&partition.invalid, folder)?;

    let block = to_file_block(&partition.valid, &rule_set.header, folder_path);
    let block_path = file_block_path(folder);
    save_block(&block_path, &block)?;

    info!(
        "Classified {}: {} valid rows, {} invalid rows, {} overwritten cells",
        folder_path,
        partition.valid.len(),
        partition.invalid.len(),
        classification.overwritten
    );
    debug!("FileBlock written to {}", block_path.display());
    Ok(block)
}

/// Build a FileBlock for every folder. The first failing folder aborts the
/// whole batch.
pub fn build_file_blocks(
    folder_files: &[FolderFiles],
    reporter: &dyn SyncReporter,
) -> Result<Vec<FileBlock>, Error> {
    let mut blocks = Vec::with_capacity(folder_files.len());
    for folder in folder_files {
        let block = build_file_block(&folder.path, &folder.file_names)?;
        reporter.on_folder_classified(&folder.path, block.rows.len());
        blocks.push(block);
    }
    Ok(blocks)
}
