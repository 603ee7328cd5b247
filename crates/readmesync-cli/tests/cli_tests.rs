use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Lay out `code/alpha/README.md`, an empty `notes/` collection and a config
fn workspace(tmp: &TempDir) -> PathBuf {
    let code = tmp.path().join("code");
    let notes = tmp.path().join("notes");
    fs::create_dir_all(code.join("alpha")).unwrap();
    fs::create_dir_all(&notes).unwrap();
    fs::write(code.join("alpha").join("README.md"), "# Alpha\n").unwrap();

    let config = tmp.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "source_folders:\n  - {}\ntarget_folder: {}\ndatabase_path: {}\n",
            code.display(),
            notes.display(),
            tmp.path().join("state").join("mappings.db").display()
        ),
    )
    .unwrap();
    config
}

fn readmesync(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("readmesync").unwrap();
    cmd.env_remove("READMESYNC_CONFIG").arg("--config").arg(config);
    cmd
}

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("readmesync").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("README Collection Synchronization Tool"));
}

#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("readmesync").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("readmesync"));
}

#[test]
fn test_subcommand_help_lists_commands() {
    let mut cmd = Command::cargo_bin("readmesync").unwrap();
    cmd.arg("help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sync-file"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn test_sync_creates_collection_file() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);

    readmesync(&config)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Sync Summary ==="))
        .stdout(predicate::str::contains("Created:  1"));

    let target = tmp.path().join("notes").join("alpha-README.md");
    assert_eq!(fs::read_to_string(target).unwrap(), "# Alpha\n");
}

#[test]
fn test_second_sync_skips_identical() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created:  0"))
        .stdout(predicate::str::contains("identical content"));
}

#[test]
fn test_status_reports_mappings() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mappings: 1"))
        .stdout(predicate::str::contains("Daemon: not running"));
}

#[test]
fn test_sync_file_for_untracked_path() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);
    let stray = tmp.path().join("stray.txt");
    fs::write(&stray, "x").unwrap();

    readmesync(&config)
        .arg("sync-file")
        .arg(&stray)
        .assert()
        .success()
        .stdout(predicate::str::contains("is not a tracked document"));
}

#[test]
fn test_cleanup_moves_unlinked_file() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);
    fs::write(tmp.path().join("notes").join("loose.md"), "loose\n").unwrap();

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("cleanup")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Cleanup Summary ==="))
        .stdout(predicate::str::contains("Unlinked files moved: 1"));

    assert!(tmp.path().join("notes").join("unlinked").join("loose.md").is_file());
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    readmesync(&tmp.path().join("absent.yaml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.yaml");
    fs::write(&config, "target_folder: /tmp/nowhere\n").unwrap();

    readmesync(&config)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("source folder"));
}

#[test]
fn test_mappings_lists_synced_pair() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("mappings")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Mappings (1) ==="))
        .stdout(predicate::str::contains("[active]"))
        .stdout(predicate::str::contains("alpha-README.md"));
}

#[test]
fn test_list_unlinked_previews_without_moving() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);
    let loose = tmp.path().join("notes").join("loose.md");
    fs::write(&loose, "loose\n").unwrap();

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("list-unlinked")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Unlinked Files (1) ==="))
        .stdout(predicate::str::contains("loose.md"));

    assert!(loose.is_file());
}

#[test]
fn test_conflicts_lists_manual_conflict() {
    let tmp = TempDir::new().unwrap();
    let config = workspace(&tmp);
    let mut yaml = fs::read_to_string(&config).unwrap();
    yaml.push_str("conflict_resolution: manual\n");
    fs::write(&config, yaml).unwrap();

    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("conflicts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No unresolved conflicts"));

    fs::write(tmp.path().join("notes").join("alpha-README.md"), "edited\n").unwrap();
    readmesync(&config).arg("sync").assert().success();
    readmesync(&config)
        .arg("conflicts")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Conflicts (1) ==="))
        .stdout(predicate::str::contains("alpha-README.md.conflict-"));
}
