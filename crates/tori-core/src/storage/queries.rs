use super::models::{File, Folder};
use super::sql;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use tracing::trace;

/// Parameterized reads and writes against the `folders`/`files` snapshot.
///
/// Implemented for [`Connection`], so every method is available both on a
/// plain connection and inside a [`rusqlite::Transaction`] (which derefs to
/// one).
pub trait SnapshotStore {
    fn folder_exists_by_path(&self, path: &str) -> Result<bool>;
    fn insert_folder(&self, folder: &Folder) -> Result<i64>;
    fn update_folder_stats(&self, folder_id: i64, total_size: i64, file_count: i64) -> Result<()>;
    fn refresh_folder_stats(&self, folder_id: i64) -> Result<()>;
    fn select_all_folders(&self) -> Result<Vec<Folder>>;
    fn select_all_files(&self) -> Result<Vec<File>>;
    fn select_files_for_folder(&self, folder_path: &str) -> Result<Vec<File>>;
    fn insert_file(&self, folder_id: i64, name: &str, size: i64, created_time: &str) -> Result<i64>;
    fn update_file(&self, file_id: i64, size: i64) -> Result<()>;
    fn delete_file(&self, file_id: i64) -> Result<()>;
    fn get_folder_id_by_path(&self, path: &str) -> Result<Option<i64>>;
}

fn folder_from_row(row: &Row<'_>) -> Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        path: row.get(1)?,
        total_size: row.get(2)?,
        file_count: row.get(3)?,
        created_time: row.get(4)?,
    })
}

fn file_from_row(row: &Row<'_>) -> Result<File> {
    Ok(File {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        name: row.get(2)?,
        size: row.get(3)?,
        created_time: row.get(4)?,
        path: row.get(5)?,
    })
}

impl SnapshotStore for Connection {
    fn folder_exists_by_path(&self, path: &str) -> Result<bool> {
        self.query_row(sql::FOLDER_EXISTS, params![path], |row| row.get(0))
    }

    fn insert_folder(&self, folder: &Folder) -> Result<i64> {
        self.prepare_cached(sql::INSERT_FOLDER)?.execute(params![
            folder.path,
            folder.total_size,
            folder.file_count,
            folder.created_time,
        ])?;
        let id = self.last_insert_rowid();
        trace!("Inserted folder {} as id {}", folder.path, id);
        Ok(id)
    }

    fn update_folder_stats(&self, folder_id: i64, total_size: i64, file_count: i64) -> Result<()> {
        self.prepare_cached(sql::UPDATE_FOLDER)?
            .execute(params![total_size, file_count, folder_id])?;
        Ok(())
    }

    fn refresh_folder_stats(&self, folder_id: i64) -> Result<()> {
        self.prepare_cached(sql::REFRESH_FOLDER_STATS)?
            .execute(params![folder_id])?;
        Ok(())
    }

    fn select_all_folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self.prepare_cached(sql::SELECT_FOLDERS)?;
        let folders = stmt
            .query_map([], folder_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(folders)
    }

    fn select_all_files(&self) -> Result<Vec<File>> {
        let mut stmt = self.prepare_cached(sql::SELECT_FILES)?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    fn select_files_for_folder(&self, folder_path: &str) -> Result<Vec<File>> {
        let mut stmt = self.prepare_cached(sql::SELECT_FILES_FOR_FOLDER)?;
        let files = stmt
            .query_map(params![folder_path], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    fn insert_file(&self, folder_id: i64, name: &str, size: i64, created_time: &str) -> Result<i64> {
        self.prepare_cached(sql::INSERT_FILE)?
            .execute(params![folder_id, name, size, created_time])?;
        Ok(self.last_insert_rowid())
    }

    fn update_file(&self, file_id: i64, size: i64) -> Result<()> {
        self.prepare_cached(sql::UPDATE_FILE)?
            .execute(params![size, file_id])?;
        Ok(())
    }

    fn delete_file(&self, file_id: i64) -> Result<()> {
        self.prepare_cached(sql::DELETE_FILE)?
            .execute(params![file_id])?;
        Ok(())
    }

    fn get_folder_id_by_path(&self, path: &str) -> Result<Option<i64>> {
        self.query_row(sql::GET_FOLDER_ID, params![path], |row| row.get(0))
            .optional()
    }
}
