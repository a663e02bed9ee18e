use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Error;
use crate::scanner;
use crate::storage::models::{ChangeType, FileChange, Folder, FolderDiff};
use crate::storage::{Database, SnapshotStore};

fn upsert_folder(conn: &Connection, diff: &FolderDiff) -> Result<(), Error> {
    if diff.folder_id == 0 {
        conn.insert_folder(&Folder {
            id: 0,
            path: diff.path.clone(),
            total_size: diff.disk_total_size,
            file_count: diff.disk_file_count,
            created_time: scanner::now_timestamp(),
        })?;
        debug!("Inserted folder {}", diff.path);
    } else {
        conn.update_folder_stats(diff.folder_id, diff.disk_total_size, diff.disk_file_count)?;
        debug!(
            "Updated folder {} (id {}): {} -> {} bytes, {} -> {} files",
            diff.path,
            diff.folder_id,
            diff.db_total_size,
            diff.disk_total_size,
            diff.db_file_count,
            diff.disk_file_count
        );
    }
    Ok(())
}

fn apply_change(conn: &Connection, change: &FileChange) -> Result<(), Error> {
    match change.change_type {
        ChangeType::Added => {
            conn.insert_file(
                change.folder_id,
                &change.name,
                change.disk_size,
                &scanner::now_timestamp(),
            )?;
        }
        ChangeType::Modified => conn.update_file(change.file_id, change.disk_size)?,
        ChangeType::Removed => conn.delete_file(change.file_id)?,
    }
    Ok(())
}

fn resolve_folder_id(conn: &Connection, path: &str) -> Result<i64, Error> {
    conn.get_folder_id_by_path(path)?
        .ok_or_else(|| Error::FolderNotFound(path.to_string()))
}

/// Insert unseen folders (`folder_id == 0`) and refresh stats of known ones.
pub fn apply_diffs(conn: &Connection, diffs: &[FolderDiff]) -> Result<(), Error> {
    for diff in diffs {
        upsert_folder(conn, diff)?;
    }
    Ok(())
}

/// Apply file changes. Must run after [`apply_diffs`]: each change's
/// `folder_id` is resolved from its `path` here, and new folders only get an
/// id once inserted.
pub fn apply_changes(conn: &Connection, changes: &mut [FileChange]) -> Result<(), Error> {
    let mut resolved: BTreeMap<String, i64> = BTreeMap::new();
    for change in changes.iter_mut() {
        let folder_id = match resolved.get(&change.path) {
            Some(id) => *id,
            None => {
                let id = resolve_folder_id(conn, &change.path)?;
                resolved.insert(change.path.clone(), id);
                id
            }
        };
        change.folder_id = folder_id;
        apply_change(conn, change)?;
    }
    Ok(())
}

/// Apply a whole diff report folder by folder. Each folder's upsert and its
/// file changes share one transaction, so a folder never shows up with half
/// of its file rows.
pub fn update_db(
    db: &Database,
    diffs: &[FolderDiff],
    changes: Vec<FileChange>,
) -> Result<(), Error> {
    let mut by_folder: BTreeMap<String, (Option<&FolderDiff>, Vec<FileChange>)> = BTreeMap::new();
    for diff in diffs {
        by_folder.entry(diff.path.clone()).or_default().0 = Some(diff);
    }
    for change in changes {
        by_folder.entry(change.path.clone()).or_default().1.push(change);
    }

    let folder_count = by_folder.len();
    for (path, (diff, mut folder_changes)) in by_folder {
        db.with_transaction(|tx| {
            if let Some(diff) = diff {
                apply_diffs(tx, std::slice::from_ref(diff))?;
            }
            apply_changes(tx, &mut folder_changes)
        })
        .map_err(|err| {
            debug!("Update of folder {} rolled back", path);
            err
        })?;
    }

    info!("Applied updates to {} folders", folder_count);
    Ok(())
}

/// Seed the snapshot with one folder: its row and all of its file rows are
/// written in a single transaction. Nothing is left behind on failure.
pub fn store_folder_snapshot(
    db: &Database,
    folder_path: &str,
    exclusions: &[String],
) -> Result<(), Error> {
    db.with_transaction(|tx| {
        let (folder, files) = scanner::collect_folder(folder_path, exclusions)?;

        tx.insert_folder(&folder)?;
        let folder_id = resolve_folder_id(tx, &folder.path)?;

        for file in &files {
            tx.insert_file(folder_id, &file.name, file.size, &file.created_time)?;
        }
        tx.refresh_folder_stats(folder_id)?;

        debug!(
            "Stored snapshot of {} ({} files, {} bytes)",
            folder.path, folder.file_count, folder.total_size
        );
        Ok(())
    })
}

/// Seed every subfolder of `root_path`. Folders that already have a row are
/// left alone, so running this twice is harmless.
pub fn save_folders(
    db: &Database,
    root_path: &str,
    folder_exclusions: &[String],
    file_exclusions: &[String],
) -> Result<usize, Error> {
    let folders = scanner::list_subfolders(root_path, folder_exclusions)?;
    let mut stored = 0;
    for folder in &folders {
        if db.connection().folder_exists_by_path(&folder.path)? {
            debug!("Folder {} already in snapshot, skipping", folder.path);
            continue;
        }
        store_folder_snapshot(db, &folder.path, file_exclusions)?;
        stored += 1;
    }
    info!("Stored {} of {} folders under {}", stored, folders.len(), root_path);
    Ok(stored)
}
