use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Error;
use crate::scanner;
use crate::storage::models::{ChangeType, File, FileChange, Folder, FolderDiff, FolderFiles};
use crate::storage::SnapshotStore;

/// Result of comparing the whole tree against the snapshot.
#[derive(Debug, Default)]
pub struct DiffReport {
    /// Current file list of every disk folder, changed or not.
    pub folder_files: Vec<FolderFiles>,
    pub folder_diffs: Vec<FolderDiff>,
    pub file_changes: Vec<FileChange>,
}

impl DiffReport {
    pub fn is_unchanged(&self) -> bool {
        self.folder_diffs.is_empty() && self.file_changes.is_empty()
    }
}

/// Compare aggregate size/count of each disk subfolder with its snapshot row.
///
/// Returns `(unchanged, disk_folders, diffs)`. A folder missing from the
/// snapshot always yields a diff with `folder_id == 0`; a known folder only
/// when size or count differ.
pub fn compare_folders(
    conn: &Connection,
    root_path: &str,
    folder_exclusions: &[String],
    file_exclusions: &[String],
) -> Result<(bool, Vec<Folder>, Vec<FolderDiff>), Error> {
    let disk_folders =
        scanner::collect_subfolder_stats(root_path, folder_exclusions, file_exclusions)?;

    let db_folders: HashMap<String, Folder> = conn
        .select_all_folders()?
        .into_iter()
        .map(|f| (f.path.clone(), f))
        .collect();

    let mut diffs = Vec::new();
    for disk in &disk_folders {
        match db_folders.get(&disk.path) {
            None => diffs.push(FolderDiff {
                folder_id: 0,
                path: disk.path.clone(),
                disk_total_size: disk.total_size,
                db_total_size: 0,
                disk_file_count: disk.file_count,
                db_file_count: 0,
            }),
            Some(db) if db.total_size != disk.total_size || db.file_count != disk.file_count => {
                diffs.push(FolderDiff {
                    folder_id: db.id,
                    path: disk.path.clone(),
                    disk_total_size: disk.total_size,
                    db_total_size: db.total_size,
                    disk_file_count: disk.file_count,
                    db_file_count: db.file_count,
                })
            }
            Some(_) => {}
        }
    }

    debug!(
        "Compared {} disk folders with {} snapshot folders: {} diffs",
        disk_folders.len(),
        db_folders.len(),
        diffs.len()
    );
    Ok((diffs.is_empty(), disk_folders, diffs))
}

/// Compare the files of one folder by name and size.
///
/// Returns `(unchanged, disk_files, changes)`. Changes come out grouped as
/// added/modified (by name) followed by removed (by name).
pub fn compare_files(
    conn: &Connection,
    folder_path: &str,
    file_exclusions: &[String],
) -> Result<(bool, Vec<File>, Vec<FileChange>), Error> {
    let (_, disk_files) = scanner::collect_folder(folder_path, file_exclusions)?;
    let db_files = conn.select_files_for_folder(folder_path)?;

    let disk_map: BTreeMap<&str, &File> = disk_files.iter().map(|f| (f.name.as_str(), f)).collect();
    let db_map: BTreeMap<&str, &File> = db_files.iter().map(|f| (f.name.as_str(), f)).collect();

    let mut changes = Vec::new();
    for (name, disk) in &disk_map {
        match db_map.get(name) {
            None => changes.push(FileChange {
                change_type: ChangeType::Added,
                file_id: 0,
                folder_id: 0,
                name: name.to_string(),
                disk_size: disk.size,
                db_size: 0,
                path: folder_path.to_string(),
            }),
            Some(db) if db.size != disk.size => changes.push(FileChange {
                change_type: ChangeType::Modified,
                file_id: db.id,
                folder_id: db.folder_id,
                name: name.to_string(),
                disk_size: disk.size,
                db_size: db.size,
                path: folder_path.to_string(),
            }),
            Some(_) => {}
        }
    }
    for (name, db) in &db_map {
        if !disk_map.contains_key(name) {
            changes.push(FileChange {
                change_type: ChangeType::Removed,
                file_id: db.id,
                folder_id: db.folder_id,
                name: name.to_string(),
                disk_size: 0,
                db_size: db.size,
                path: folder_path.to_string(),
            });
        }
    }

    Ok((changes.is_empty(), disk_files, changes))
}

/// Run [`compare_folders`] then [`compare_files`] for every disk folder.
///
/// `folder_files` always lists every folder with its full current file list,
/// since classification needs the whole folder and not just the delta. When
/// nothing changed anywhere, diffs and changes are both empty.
pub fn diff_all(
    conn: &Connection,
    root_path: &str,
    folder_exclusions: &[String],
    file_exclusions: &[String],
) -> Result<DiffReport, Error> {
    let (_, disk_folders, folder_diffs) =
        compare_folders(conn, root_path, folder_exclusions, file_exclusions)?;

    let mut report = DiffReport {
        folder_diffs,
        ..DiffReport::default()
    };

    for folder in &disk_folders {
        let (unchanged, files, changes) = compare_files(conn, &folder.path, file_exclusions)?;
        if !unchanged {
            report.file_changes.extend(changes);
        }
        report.folder_files.push(FolderFiles {
            path: folder.path.clone(),
            file_names: files.into_iter().map(|f| f.name).collect(),
        });
    }

    info!(
        "Diff: {} folders on disk, {} folder diffs, {} file changes",
        report.folder_files.len(),
        report.folder_diffs.len(),
        report.file_changes.len()
    );
    Ok(report)
}
