use std::fs;
use std::path::{Path, PathBuf};

use readmesync_core::comparison::{Direction, TimestampComparator};
use readmesync_core::sync::PairOutcome;
use readmesync_core::{Config, ConfigManager, MappingStatus, SyncEngine};
use tempfile::TempDir;

fn config(tmp: &TempDir) -> Config {
    let code = tmp.path().join("code");
    let notes = tmp.path().join("notes");
    fs::create_dir_all(&code).unwrap();
    fs::create_dir_all(&notes).unwrap();

    ConfigManager::finalize(Config {
        source_folders: vec![code],
        target_folder: notes,
        database_path: Some(tmp.path().join("state").join("mappings.db")),
        ..Config::default()
    })
    .unwrap()
}

fn write_source(tmp: &TempDir, project: &str, content: &str) -> PathBuf {
    let path = tmp.path().join("code").join(project).join("README.md");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    dunce::canonicalize(path).unwrap()
}

fn target(tmp: &TempDir, name: &str) -> PathBuf {
    tmp.path().join("notes").join(name)
}

#[test]
fn test_mappings_survive_engine_restart() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(&tmp, "alpha", "# Alpha\n");

    {
        let engine = SyncEngine::from_config(config(&tmp)).unwrap();
        let report = engine.run_full_sync().unwrap();
        assert_eq!(report.created(), 1);
    }

    let engine = SyncEngine::from_config(config(&tmp)).unwrap();
    let mapping = engine.store().get(&source).unwrap().unwrap();
    assert_eq!(mapping.status, MappingStatus::Active);
    assert_eq!(mapping.source_hash, mapping.target_hash);

    let report = engine.run_full_sync().unwrap();
    assert_eq!(report.total_operations(), 0);
    assert!(report.is_success());
}

#[test]
fn test_collection_edit_reaches_source_after_restart() {
    let tmp = TempDir::new().unwrap();
    let source = write_source(&tmp, "beta", "original\n");

    SyncEngine::from_config(config(&tmp))
        .unwrap()
        .run_full_sync()
        .unwrap();

    let collected = target(&tmp, "beta-README.md");
    fs::write(&collected, "edited in the collection\n").unwrap();
    let later = TimestampComparator::modified_secs(&source).unwrap() + 60;
    TimestampComparator::set_modified(&collected, TimestampComparator::from_secs(later)).unwrap();

    let engine = SyncEngine::from_config(config(&tmp)).unwrap();
    let report = engine.run_full_sync().unwrap();

    assert_eq!(
        report.outcome_for(&source),
        Some(&PairOutcome::Updated(Direction::TargetToSource))
    );
    assert_eq!(fs::read_to_string(&source).unwrap(), "edited in the collection\n");
}

#[test]
fn test_status_reflects_cleanup() {
    let tmp = TempDir::new().unwrap();
    write_source(&tmp, "gamma", "g\n");
    fs::write(target(&tmp, "stray.md"), "stray\n").unwrap();

    let engine = SyncEngine::from_config(config(&tmp)).unwrap();
    engine.run_full_sync().unwrap();
    assert!(engine.status().unwrap().last_cleanup_at.is_none());

    let report = engine.run_cleanup().unwrap();
    assert_eq!(report.unlinked_moved.len(), 1);
    assert!(target(&tmp, "unlinked").join("stray.md").is_file());

    let status = engine.status().unwrap();
    assert_eq!(status.active, 1);
    assert!(status.last_cleanup_at.is_some());
}

#[test]
fn test_store_path_must_be_configured() {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        database_path: None,
        ..config(&tmp)
    };
    assert!(SyncEngine::from_config(config).is_err());
}

#[test]
fn test_corrupt_store_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    let db = config.database_path.clone().unwrap();
    fs::create_dir_all(db.parent().unwrap()).unwrap();
    fs::write(&db, "this is not a database").unwrap();

    let error = SyncEngine::from_config(config).err().unwrap();
    assert!(error.is_fatal());
    assert!(Path::new(&db).is_file());
}
