use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tori_core::{SyncReporter, SyncStage};

/// One spinner per sync stage.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Clear the current spinner, if any, and install `next` in its place.
    fn replace_bar(&self, next: Option<ProgressBar>) {
        let mut slot = self.bar.lock().unwrap();
        if let Some(previous) = std::mem::replace(&mut *slot, next) {
            previous.finish_and_clear();
        }
    }
}

impl Drop for CliReporter {
    fn drop(&mut self) {
        self.replace_bar(None);
    }
}

fn stage_label(stage: SyncStage) -> &'static str {
    match stage {
        SyncStage::Diffing => "Comparing folders with the snapshot...",
        SyncStage::Updating => "Updating the snapshot...",
        SyncStage::Classifying => "Classifying folders...",
        SyncStage::Merging => "Merging file blocks...",
        _ => "Working...",
    }
}

impl SyncReporter for CliReporter {
    fn on_stage_start(&self, stage: SyncStage) {
        self.replace_bar(Some(Self::spinner(stage_label(stage).to_string())));
    }

    fn on_stage_complete(&self, stage: SyncStage, duration_secs: f64) {
        self.replace_bar(None);
        eprintln!("  {} {} done in {:.2}s", "✓".green(), stage, duration_secs);
    }

    fn on_folder_classified(&self, folder: &str, rows: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!("Classified {} ({} rows)", folder, rows));
        }
    }
}
