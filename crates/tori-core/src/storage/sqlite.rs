use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use super::sql;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.initialize_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    /// True only when both `folders` and `files` exist.
    pub fn is_initialized(&self) -> rusqlite::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('folders', 'files')",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 2)
    }

    /// Create the schema unless it is already there.
    pub fn initialize_schema(&self) -> rusqlite::Result<()> {
        if self.is_initialized()? {
            debug!("Schema already initialized, skipping init.sql");
            return Ok(());
        }
        self.conn.execute_batch(sql::INIT)?;
        info!("SQLite schema initialized");
        Ok(())
    }

    /// Reports `PRAGMA foreign_keys`; cascade deletes rely on it.
    pub fn foreign_keys_enabled(&self) -> rusqlite::Result<bool> {
        let fk: i64 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(fk == 1)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction. Commits on success; on failure rolls back
    /// and returns the original error. A failed rollback is only logged.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb_err) = tx.rollback() {
                    warn!("Rollback failed: {}", rb_err);
                }
                Err(err)
            }
        }
    }

    /// Delete every folder; file rows go with them through the cascade.
    pub fn clear_database(&self) -> rusqlite::Result<()> {
        self.conn.execute("DELETE FROM folders", [])?;
        debug!("All catalog rows removed");
        Ok(())
    }
}
