use std::fs;
use std::path::Path;

use tempfile::tempdir;
use tori_core::config::default_file_exclusions;
use tori_core::diff::diff_all;
use tori_core::error::Error;
use tori_core::storage::models::{ChangeType, FileChange};
use tori_core::storage::{Database, SnapshotStore};
use tori_core::updater::{save_folders, store_folder_snapshot, update_db};

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn write_file(dir: &Path, name: &str, size: usize) {
    fs::write(dir.join(name), vec![b'x'; size]).unwrap();
}

fn diff_and_apply(db: &Database, root: &Path) {
    let report = diff_all(
        db.connection(),
        &path_str(root),
        &[],
        &default_file_exclusions(),
    )
    .unwrap();
    update_db(db, &report.folder_diffs, report.file_changes).unwrap();
}

#[test]
fn test_update_db_brings_snapshot_in_line_with_disk() {
    let dir = tempdir().unwrap();
    let run = dir.path().join("run1");
    fs::create_dir(&run).unwrap();
    write_file(&run, "a_R1.gz", 10);
    write_file(&run, "a_R2.gz", 20);

    let db = Database::open_in_memory().unwrap();
    diff_and_apply(&db, dir.path());

    let conn = db.connection();
    let folders = conn.select_all_folders().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!((folders[0].total_size, folders[0].file_count), (30, 2));
    assert_eq!(conn.select_files_for_folder(&path_str(&run)).unwrap().len(), 2);

    let report = diff_all(conn, &path_str(dir.path()), &[], &default_file_exclusions()).unwrap();
    assert!(report.is_unchanged());
}

#[test]
fn test_update_db_applies_modify_and_remove() {
    let dir = tempdir().unwrap();
    let run = dir.path().join("run1");
    fs::create_dir(&run).unwrap();
    write_file(&run, "keep.gz", 10);
    write_file(&run, "drop.gz", 5);

    let db = Database::open_in_memory().unwrap();
    diff_and_apply(&db, dir.path());

    write_file(&run, "keep.gz", 40);
    fs::remove_file(run.join("drop.gz")).unwrap();
    diff_and_apply(&db, dir.path());

    let conn = db.connection();
    let files = conn.select_files_for_folder(&path_str(&run)).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!((files[0].name.as_str(), files[0].size), ("keep.gz", 40));

    let folder = &conn.select_all_folders().unwrap()[0];
    assert_eq!((folder.total_size, folder.file_count), (40, 1));
}

#[test]
fn test_update_db_unknown_folder_rolls_back() {
    let db = Database::open_in_memory().unwrap();
    let change = FileChange {
        change_type: ChangeType::Added,
        file_id: 0,
        folder_id: 0,
        name: "a.gz".to_string(),
        disk_size: 1,
        db_size: 0,
        path: "/not/in/snapshot".to_string(),
    };

    let result = update_db(&db, &[], vec![change]);
    assert!(matches!(result, Err(Error::FolderNotFound(path)) if path == "/not/in/snapshot"));
    assert!(db.connection().select_all_files().unwrap().is_empty());
}

#[test]
fn test_store_folder_snapshot_writes_folder_and_files() {
    let dir = tempdir().unwrap();
    let run = dir.path().join("run1");
    fs::create_dir(&run).unwrap();
    write_file(&run, "a_R1.gz", 7);
    write_file(&run, "a_R2.gz", 8);
    write_file(&run, "rule.json", 64);

    let db = Database::open_in_memory().unwrap();
    store_folder_snapshot(&db, &path_str(&run), &default_file_exclusions()).unwrap();

    let conn = db.connection();
    let folders = conn.select_all_folders().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!((folders[0].total_size, folders[0].file_count), (15, 2));

    let names: Vec<String> = conn
        .select_files_for_folder(&path_str(&run))
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["a_R1.gz".to_string(), "a_R2.gz".to_string()]);
}

#[test]
fn test_store_folder_snapshot_missing_folder_leaves_nothing() {
    let dir = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();

    let result = store_folder_snapshot(&db, &path_str(&dir.path().join("gone")), &[]);
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(db.connection().select_all_folders().unwrap().is_empty());
}

#[test]
fn test_save_folders_skips_existing_rows() {
    let dir = tempdir().unwrap();
    for name in ["run1", "run2"] {
        let run = dir.path().join(name);
        fs::create_dir(&run).unwrap();
        write_file(&run, "a.gz", 3);
    }
    let root = path_str(dir.path());
    let exclusions = default_file_exclusions();

    let db = Database::open_in_memory().unwrap();
    assert_eq!(save_folders(&db, &root, &[], &exclusions).unwrap(), 2);
    assert_eq!(save_folders(&db, &root, &[], &exclusions).unwrap(), 0);

    fs::create_dir(dir.path().join("run3")).unwrap();
    assert_eq!(save_folders(&db, &root, &[], &exclusions).unwrap(), 1);

    let conn = db.connection();
    assert_eq!(conn.select_all_folders().unwrap().len(), 3);
    assert_eq!(conn.select_all_files().unwrap().len(), 2);
}

#[test]
fn test_save_folders_then_diff_is_unchanged() {
    let dir = tempdir().unwrap();
    let run = dir.path().join("run1");
    fs::create_dir(&run).unwrap();
    write_file(&run, "a_R1.gz", 11);

    let db = Database::open_in_memory().unwrap();
    let root = path_str(dir.path());
    save_folders(&db, &root, &["skipme".to_string()], &default_file_exclusions()).unwrap();

    let report = diff_all(db.connection(), &root, &[], &default_file_exclusions()).unwrap();
    assert!(report.is_unchanged());
    assert_eq!(report.folder_files.len(), 1);
}
