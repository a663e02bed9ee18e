pub mod builder;
pub mod merge;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use builder::{build_file_block, build_file_blocks};
pub use merge::{merge_blocks, persist_data_block, resolve_freshness, save_data_block_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row_number: i32,
    pub cell_columns: BTreeMap<String, String>,
}

/// Classified contents of one folder. `block_id` is the folder path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlock {
    pub block_id: String,
    pub column_headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Every FileBlock of the tree, stamped with the time they were merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBlock {
    pub updated_at: Option<DateTime<Utc>>,
    pub blocks: Vec<FileBlock>,
}

/// Serialize `message` with bincode and overwrite `path`.
pub fn save_block<T: Serialize>(path: &Path, message: &T) -> Result<(), Error> {
    let data = bincode::serialize(message)?;
    fs::write(path, data)?;
    Ok(())
}

fn load_block<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let data = fs::read(path)?;
    Ok(bincode::deserialize(&data)?)
}

pub fn load_file_block(path: &Path) -> Result<FileBlock, Error> {
    load_block(path)
}

pub fn load_data_block(path: &Path) -> Result<DataBlock, Error> {
    load_block(path)
}
