use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::block::{self, DataBlock};
use crate::config::AppConfig;
use crate::diff::{self, DiffReport};
use crate::error::Error;
use crate::progress::SyncReporter;
use crate::storage::Database;
use crate::updater;

/// Stages of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    Diffing,
    UnchangedExit,
    Updating,
    Classifying,
    Merging,
    Done,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Idle => "idle",
            SyncStage::Diffing => "diffing",
            SyncStage::UnchangedExit => "unchanged",
            SyncStage::Updating => "updating",
            SyncStage::Classifying => "classifying",
            SyncStage::Merging => "merging",
            SyncStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Reconciles the snapshot with the tree under `config.root_dir` and
/// republishes the DataBlock.
pub struct SyncEngine {
    config: AppConfig,
    db: Database,
    cancel_token: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self {
            config: config.with_artifact_exclusions(),
            db,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open (and initialize if needed) the store at `config.db_path`.
    pub fn open(config: AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.db_path)?;
        Ok(Self::new(config, db))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn data_block_path(&self) -> PathBuf {
        self.config.data_block_path()
    }

    /// Setting the token cancels the running sync at the next stage boundary.
    /// Work inside a stage always finishes first. The token is cleared when a
    /// sync starts, so a cancel made while idle has no effect.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    fn check_cancelled(&self, next: SyncStage) -> Result<(), Error> {
        if self.cancel_token.swap(false, Ordering::Relaxed) {
            warn!("Sync cancelled before {}", next);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn run_stage<T>(
        &self,
        stage: SyncStage,
        reporter: &dyn SyncReporter,
        f: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        reporter.on_stage_start(stage);
        let start = Instant::now();
        let result = f();
        match &result {
            Ok(_) => reporter.on_stage_complete(stage, start.elapsed().as_secs_f64()),
            Err(err) => warn!("Sync aborted while {}: {}", stage, err),
        }
        result
    }

    /// Seed the snapshot: one transactional insert per subfolder not yet in
    /// the store.
    pub fn save_folders(&self) -> Result<usize, Error> {
        updater::save_folders(
            &self.db,
            &self.config.root_dir,
            &self.config.folder_exclusions,
            &self.config.file_exclusions,
        )
    }

    /// Reconcile and republish. Returns `Ok(false)` when nothing changed and
    /// the DataBlock already exists, `Ok(true)` once a new DataBlock is saved.
    ///
    /// Any error aborts the run; the previous DataBlock stays in place.
    pub fn sync_folders(&self, reporter: &dyn SyncReporter) -> Result<bool, Error> {
        self.cancel_token.store(false, Ordering::Relaxed);
        info!("Syncing {} ({})", self.config.root_dir, SyncStage::Idle);

        let report = self.run_stage(SyncStage::Diffing, reporter, || {
            diff::diff_all(
                self.db.connection(),
                &self.config.root_dir,
                &self.config.folder_exclusions,
                &self.config.file_exclusions,
            )
        })?;

        let data_block_path = self.data_block_path();
        let first_run = !data_block_path.exists();
        if report.is_unchanged() && !first_run {
            info!(
                "All files and folders unchanged and {} exists; skipping update ({})",
                data_block_path.display(),
                SyncStage::UnchangedExit
            );
            return Ok(false);
        }

        let DiffReport {
            folder_files,
            folder_diffs,
            file_changes,
        } = report;

        if !folder_diffs.is_empty() || !file_changes.is_empty() {
            self.check_cancelled(SyncStage::Updating)?;
            self.run_stage(SyncStage::Updating, reporter, || {
                updater::update_db(&self.db, &folder_diffs, file_changes)
            })?;
        }

        self.check_cancelled(SyncStage::Classifying)?;
        let blocks = self.run_stage(SyncStage::Classifying, reporter, || {
            block::build_file_blocks(&folder_files, reporter)
        })?;

        self.check_cancelled(SyncStage::Merging)?;
        self.run_stage(SyncStage::Merging, reporter, || {
            let data_block = block::merge_blocks(blocks)?;
            block::persist_data_block(&data_block, &data_block_path)
        })?;

        info!("Sync {}: DataBlock republished", SyncStage::Done);
        Ok(true)
    }

    /// Load the published DataBlock and apply the freshness rules against the
    /// client's timestamp. `Ok(None)` means the client is up to date.
    pub fn get_data_block(
        &self,
        client_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Option<DataBlock>, Error> {
        let server = block::load_data_block(&self.data_block_path())?;
        block::resolve_freshness(server, client_updated_at)
    }
}
