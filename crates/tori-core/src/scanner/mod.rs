use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::trace;

use crate::storage::models::{File, Folder};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp in the format stored in `created_time` columns.
pub fn now_timestamp() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

fn format_mtime(metadata: &fs::Metadata) -> String {
    metadata
        .modified()
        .map(|t| DateTime::<Local>::from(t).format(TIME_FORMAT).to_string())
        .unwrap_or_else(|_| now_timestamp())
}

/// `*.ext` excludes any name that contains `.ext`; anything else must match
/// the whole name.
pub fn is_excluded_file(name: &str, exclusions: &[String]) -> bool {
    exclusions.iter().any(|ex| match ex.strip_prefix('*') {
        Some(ext) if ext.starts_with('.') => name.contains(ext),
        _ => name == ex,
    })
}

fn read_dir_with_context(dir: &Path) -> io::Result<fs::ReadDir> {
    fs::read_dir(dir).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", dir.display(), err),
        )
    })
}

/// Read one directory level and return its aggregate stats plus one record
/// per included regular file. Subdirectories are ignored.
pub fn collect_folder(dir_path: &str, exclusions: &[String]) -> io::Result<(Folder, Vec<File>)> {
    let dir = Path::new(dir_path);
    let mut files = Vec::new();
    let mut total_size = 0i64;

    for entry_result in read_dir_with_context(dir)? {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        let metadata = entry.metadata().map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error getting metadata for {}: {}", path.display(), err),
            )
        })?;
        if metadata.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if is_excluded_file(&name, exclusions) {
            trace!("Excluded {}", path.display());
            continue;
        }

        let size = metadata.len() as i64;
        total_size += size;
        files.push(File {
            id: 0,
            folder_id: 0,
            name,
            size,
            created_time: format_mtime(&metadata),
            path: dir_path.to_string(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    let folder = Folder {
        id: 0,
        path: dir_path.to_string(),
        total_size,
        file_count: files.len() as i64,
        created_time: now_timestamp(),
    };
    Ok((folder, files))
}

/// Immediate child directories of `root_path`, skipping names listed in
/// `exclusions` (exact match only). Size and count are left at zero.
pub fn list_subfolders(root_path: &str, exclusions: &[String]) -> io::Result<Vec<Folder>> {
    let root = Path::new(root_path);
    let mut folders = Vec::new();

    for entry_result in read_dir_with_context(root)? {
        let entry = entry_result?;
        let file_type = entry.file_type()?;
        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if exclusions.iter().any(|ex| *ex == name) {
            continue;
        }

        let path = entry.path();
        let metadata = entry.metadata().map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error getting folder info for {}: {}", path.display(), err),
            )
        })?;

        folders.push(Folder {
            id: 0,
            path: path.to_string_lossy().into_owned(),
            total_size: 0,
            file_count: 0,
            created_time: format_mtime(&metadata),
        });
    }

    folders.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(folders)
}

/// List subfolders and fill in their size/count with one collector pass per
/// folder, in parallel. Output stays sorted by path.
pub fn collect_subfolder_stats(
    root_path: &str,
    folder_exclusions: &[String],
    file_exclusions: &[String],
) -> io::Result<Vec<Folder>> {
    let folders = list_subfolders(root_path, folder_exclusions)?;
    folders
        .into_par_iter()
        .map(|mut folder| {
            let (stats, _) = collect_folder(&folder.path, file_exclusions)?;
            folder.total_size = stats.total_size;
            folder.file_count = stats.file_count;
            Ok(folder)
        })
        .collect()
}
