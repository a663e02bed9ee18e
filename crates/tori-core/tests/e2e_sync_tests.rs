use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tempfile::tempdir;
use tori_core::block::load_data_block;
use tori_core::storage::{Database, SnapshotStore};
use tori_core::{AppConfig, Error, SilentReporter, SyncEngine, SyncReporter, SyncStage};

const PAIRED_RULE: &str = r#"{
    "version": "1.0.0",
    "delimiter": ["_", "."],
    "header": ["R1", "R2"],
    "rowRules": { "matchParts": [0, 1, 2] },
    "columnRules": { "matchParts": [3] }
}"#;

/// Layout:
///   root/
///     run_a/  rule.json, s1 R1+R2, s2 R1 only
///     run_b/  rule.json, t1 R1+R2
fn create_test_tree(root: &Path) {
    let run_a = root.join("run_a");
    let run_b = root.join("run_b");
    fs::create_dir_all(&run_a).unwrap();
    fs::create_dir_all(&run_b).unwrap();

    fs::write(run_a.join("rule.json"), PAIRED_RULE).unwrap();
    fs::write(run_a.join("s1_S1_L001_R1_001.fastq.gz"), "AAAA").unwrap();
    fs::write(run_a.join("s1_S1_L001_R2_001.fastq.gz"), "CCCC").unwrap();
    fs::write(run_a.join("s2_S2_L001_R1_001.fastq.gz"), "GG").unwrap();

    fs::write(run_b.join("rule.json"), PAIRED_RULE).unwrap();
    fs::write(run_b.join("t1_S1_L002_R1_001.fastq.gz"), "TTTTTT").unwrap();
    fs::write(run_b.join("t1_S1_L002_R2_001.fastq.gz"), "TTTTTT").unwrap();
}

fn make_engine(root: &Path) -> SyncEngine {
    let config = AppConfig::new(root.to_string_lossy().into_owned());
    SyncEngine::new(config, Database::open_in_memory().unwrap())
}

#[derive(Default)]
struct RecordingReporter {
    stages: std::sync::Mutex<Vec<SyncStage>>,
    classified: std::sync::Mutex<Vec<(String, usize)>>,
}

impl SyncReporter for RecordingReporter {
    fn on_stage_complete(&self, stage: SyncStage, _duration_secs: f64) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_folder_classified(&self, folder: &str, rows: usize) {
        self.classified
            .lock()
            .unwrap()
            .push((folder.to_string(), rows));
    }
}

#[test]
fn test_first_sync_publishes_data_block() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());
    let reporter = RecordingReporter::default();

    assert!(engine.sync_folders(&reporter).unwrap());

    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![
            SyncStage::Diffing,
            SyncStage::Updating,
            SyncStage::Classifying,
            SyncStage::Merging
        ]
    );
    let classified = reporter.classified.lock().unwrap();
    assert_eq!(classified.len(), 2);
    assert_eq!(classified[0].1, 1);
    assert_eq!(classified[1].1, 1);

    let data_block = load_data_block(&engine.data_block_path()).unwrap();
    assert!(data_block.updated_at.is_some());
    assert_eq!(data_block.blocks.len(), 2);
    assert!(data_block.blocks[0].block_id.ends_with("run_a"));
    assert!(data_block.blocks[1].block_id.ends_with("run_b"));

    let conn = engine.database().connection();
    assert_eq!(conn.select_all_folders().unwrap().len(), 2);
    // rule.json and the generated outputs are not catalog files
    assert_eq!(conn.select_all_files().unwrap().len(), 5);
}

#[test]
fn test_second_sync_without_changes_is_skipped() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    assert!(engine.sync_folders(&SilentReporter).unwrap());
    let path = engine.data_block_path();
    let before = fs::read(&path).unwrap();
    let mtime_before = fs::metadata(&path).unwrap().modified().unwrap();

    let reporter = RecordingReporter::default();
    assert!(!engine.sync_folders(&reporter).unwrap());

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime_before);
    assert_eq!(*reporter.stages.lock().unwrap(), vec![SyncStage::Diffing]);
}

#[test]
fn test_drift_triggers_republish() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    assert!(engine.sync_folders(&SilentReporter).unwrap());
    let first = load_data_block(&engine.data_block_path()).unwrap();

    fs::write(
        dir.path().join("run_a").join("s2_S2_L001_R2_001.fastq.gz"),
        "TT",
    )
    .unwrap();
    assert!(engine.sync_folders(&SilentReporter).unwrap());

    let second = load_data_block(&engine.data_block_path()).unwrap();
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.blocks[0].rows.len(), 2);
    assert!(!engine.sync_folders(&SilentReporter).unwrap());
}

#[test]
fn test_missing_data_block_forces_rebuild() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    assert!(engine.sync_folders(&SilentReporter).unwrap());
    fs::remove_file(engine.data_block_path()).unwrap();

    let reporter = RecordingReporter::default();
    assert!(engine.sync_folders(&reporter).unwrap());
    assert!(engine.data_block_path().is_file());
    // Snapshot already matched, so the update stage is not run
    assert!(!reporter.stages.lock().unwrap().contains(&SyncStage::Updating));
}

#[test]
fn test_missing_rule_aborts_without_publishing() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    fs::remove_file(dir.path().join("run_b").join("rule.json")).unwrap();
    let engine = make_engine(dir.path());

    let result = engine.sync_folders(&SilentReporter);
    assert!(matches!(result, Err(Error::RuleNotFound(_))));
    assert!(!engine.data_block_path().exists());

    fs::write(dir.path().join("run_b").join("rule.json"), PAIRED_RULE).unwrap();
    assert!(engine.sync_folders(&SilentReporter).unwrap());
    assert!(engine.data_block_path().exists());
}

#[test]
fn test_empty_root_cannot_merge() {
    let dir = tempdir().unwrap();
    let engine = make_engine(dir.path());

    let result = engine.sync_folders(&SilentReporter);
    assert!(matches!(result, Err(Error::EmptyInput)));
    assert!(!engine.data_block_path().exists());
}

/// Requests cancellation as soon as the given stage completes.
struct CancelAfter {
    stage: SyncStage,
    token: Arc<AtomicBool>,
}

impl SyncReporter for CancelAfter {
    fn on_stage_complete(&self, stage: SyncStage, _duration_secs: f64) {
        if stage == self.stage {
            self.token.store(true, Ordering::Relaxed);
        }
    }
}

#[test]
fn test_cancel_stops_at_next_stage() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    let reporter = CancelAfter {
        stage: SyncStage::Diffing,
        token: engine.cancel_token(),
    };
    let result = engine.sync_folders(&reporter);
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(engine
        .database()
        .connection()
        .select_all_folders()
        .unwrap()
        .is_empty());
    assert!(!engine.data_block_path().exists());

    assert!(engine.sync_folders(&SilentReporter).unwrap());
}

#[test]
fn test_cancel_after_update_keeps_previous_data_block() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());
    assert!(engine.sync_folders(&SilentReporter).unwrap());
    let before = fs::read(engine.data_block_path()).unwrap();

    fs::write(
        dir.path().join("run_b").join("t2_S2_L002_R1_001.fastq.gz"),
        "AC",
    )
    .unwrap();
    let reporter = CancelAfter {
        stage: SyncStage::Updating,
        token: engine.cancel_token(),
    };
    assert!(matches!(
        engine.sync_folders(&reporter),
        Err(Error::Cancelled)
    ));
    assert_eq!(fs::read(engine.data_block_path()).unwrap(), before);
}

#[test]
fn test_cancel_requested_while_idle_is_ignored() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    engine.cancel_token().store(true, Ordering::Relaxed);
    assert!(engine.sync_folders(&SilentReporter).unwrap());
    assert!(engine.data_block_path().exists());
}

#[test]
fn test_configured_exclusions_still_skip_sync_outputs() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let mut config = AppConfig::new(dir.path().to_string_lossy().into_owned());
    config.file_exclusions = vec!["rule.json".to_string()];
    let engine = SyncEngine::new(config, Database::open_in_memory().unwrap());

    assert!(engine.sync_folders(&SilentReporter).unwrap());
    assert!(!engine.sync_folders(&SilentReporter).unwrap());
    assert!(!engine.sync_folders(&SilentReporter).unwrap());

    let run_a = dir.path().join("run_a");
    let reports = fs::read_dir(&run_a)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("invalid_files_"))
        .count();
    assert_eq!(reports, 1);

    let names: Vec<String> = engine
        .database()
        .connection()
        .select_files_for_folder(&run_a.to_string_lossy())
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "s1_S1_L001_R1_001.fastq.gz".to_string(),
            "s1_S1_L001_R2_001.fastq.gz".to_string(),
            "s2_S2_L001_R1_001.fastq.gz".to_string(),
        ]
    );
}

#[test]
fn test_save_folders_then_sync_skips_update() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());

    assert_eq!(engine.save_folders().unwrap(), 2);

    let reporter = RecordingReporter::default();
    assert!(engine.sync_folders(&reporter).unwrap());
    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![SyncStage::Diffing, SyncStage::Classifying, SyncStage::Merging]
    );
}

#[test]
fn test_get_data_block_freshness() {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path());
    let engine = make_engine(dir.path());
    engine.sync_folders(&SilentReporter).unwrap();

    let full = engine.get_data_block(None).unwrap().unwrap();
    let server_time = full.updated_at.unwrap();

    let stale = engine
        .get_data_block(Some(server_time - Duration::seconds(60)))
        .unwrap();
    assert_eq!(stale, Some(full.clone()));

    assert_eq!(engine.get_data_block(Some(server_time)).unwrap(), None);

    let ahead = engine.get_data_block(Some(server_time + Duration::seconds(60)));
    assert!(matches!(ahead, Err(Error::ClientAheadOfServer { .. })));
}

#[test]
fn test_get_data_block_before_first_sync_is_io_error() {
    let dir = tempdir().unwrap();
    let engine = make_engine(dir.path());
    assert!(matches!(engine.get_data_block(None), Err(Error::Io(_))));
}
