pub mod models;
pub mod queries;
pub mod sqlite;

pub use queries::SnapshotStore;
pub use sqlite::Database;

/// Statement templates, kept as plain `.sql` files next to this module.
mod sql {
    pub const INIT: &str = include_str!("sql/init.sql");
    pub const FOLDER_EXISTS: &str = include_str!("sql/folder_exists.sql");
    pub const INSERT_FOLDER: &str = include_str!("sql/insert_folder.sql");
    pub const UPDATE_FOLDER: &str = include_str!("sql/update_folder.sql");
    pub const REFRESH_FOLDER_STATS: &str = include_str!("sql/refresh_folder_stats.sql");
    pub const SELECT_FOLDERS: &str = include_str!("sql/select_folders.sql");
    pub const SELECT_FILES: &str = include_str!("sql/select_files.sql");
    pub const SELECT_FILES_FOR_FOLDER: &str = include_str!("sql/select_files_for_folder.sql");
    pub const INSERT_FILE: &str = include_str!("sql/insert_file.sql");
    pub const UPDATE_FILE: &str = include_str!("sql/update_file.sql");
    pub const DELETE_FILE: &str = include_str!("sql/delete_file.sql");
    pub const GET_FOLDER_ID: &str = include_str!("sql/get_folder_id.sql");
}
