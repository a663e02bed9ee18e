use crate::engine::SyncStage;

/// Trait for reporting sync progress.
///
/// The CLI implements it with indicatif spinners. All methods have default
/// no-op implementations.
pub trait SyncReporter: Send + Sync {
    fn on_stage_start(&self, _stage: SyncStage) {}
    fn on_stage_complete(&self, _stage: SyncStage, _duration_secs: f64) {}
    fn on_folder_classified(&self, _folder: &str, _rows: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl SyncReporter for SilentReporter {}
