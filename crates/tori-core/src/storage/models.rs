use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A folder directly under the root of the catalog. `id == 0` means the row
/// has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub path: String,
    pub total_size: i64,
    pub file_count: i64,
    pub created_time: String,
}

/// A file inside a catalog folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: i64,
    pub folder_id: i64,
    pub name: String,
    pub size: i64,
    pub created_time: String,
    /// Path of the owning folder. Never persisted; used to resolve the
    /// folder before its id is known.
    pub path: String,
}

/// Aggregate disagreement between a folder on disk and its snapshot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDiff {
    pub folder_id: i64,
    pub path: String,
    pub disk_total_size: i64,
    pub db_total_size: i64,
    pub disk_file_count: i64,
    pub db_file_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(ChangeType::Added),
            "modified" => Ok(ChangeType::Modified),
            "removed" => Ok(ChangeType::Removed),
            other => Err(Error::InvalidChangeType(other.to_string())),
        }
    }
}

/// One file's disagreement between disk and snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub change_type: ChangeType,
    /// 0 for `Added`.
    pub file_id: i64,
    /// Resolved from `path` by the updater before the change is applied.
    pub folder_id: i64,
    pub name: String,
    pub disk_size: i64,
    pub db_size: i64,
    /// Path of the folder the file belongs to.
    pub path: String,
}

/// The full current file list of one folder, in the order the collector
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFiles {
    pub path: String,
    pub file_names: Vec<String>,
}
