//! Tests for the runscript validation and executable discovery of RealLauncher

use assert_matches::assert_matches;
use tempfile::tempdir;

use super::common::fake_implementation;
use crate::error::StressError;
use crate::services::launcher::{Executable, RealLauncher};
use crate::traits::{LaunchPlan, ProcessLauncher};

#[test]
fn test_missing_runscript_is_rejected() {
    let dir = tempdir().unwrap();

    let result = RealLauncher::from_runscript(dir.path().join("run.sh"));
    assert_matches!(result, Err(StressError::RunscriptMissing { .. }));
}

#[test]
fn test_runscript_must_be_named_run_sh() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("start.sh");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();

    let error = RealLauncher::from_runscript(&script).unwrap_err();
    assert!(error.is_configuration());
    assert_matches!(error, StressError::NotARunscript { .. });
}

#[test]
fn test_directory_named_run_sh_is_not_a_runscript() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("run.sh")).unwrap();

    let result = RealLauncher::from_runscript(dir.path().join("run.sh"));
    assert_matches!(result, Err(StressError::RunscriptMissing { .. }));
}

#[test]
fn test_missing_binary_is_rejected() {
    let dir = tempdir().unwrap();
    let runscript = fake_implementation(dir.path(), None);

    let error = RealLauncher::from_runscript(&runscript).unwrap_err();
    assert_matches!(error, StressError::BinaryNotFound { .. });
    assert!(error.to_string().contains("Make sure you build"));
}

#[test]
fn test_native_binary_preferred_over_jar() {
    let dir = tempdir().unwrap();
    let runscript = fake_implementation(dir.path(), Some("da_proc.jar"));
    std::fs::write(dir.path().join("bin").join("da_proc"), "").unwrap();

    let launcher = RealLauncher::from_runscript(&runscript).unwrap();
    assert_eq!(
        launcher.executable(),
        &Executable::Native(dir.path().join("bin").join("da_proc"))
    );
}

#[test]
fn test_jar_discovered() {
    let dir = tempdir().unwrap();
    let runscript = fake_implementation(dir.path(), Some("da_proc.jar"));

    let launcher = RealLauncher::from_runscript(&runscript).unwrap();
    assert_matches!(launcher.executable(), Executable::Jar(path) if path.ends_with("bin/da_proc.jar"));
    assert!(launcher.runscript().is_absolute());
}

#[tokio::test]
async fn test_launch_requires_existing_output_dir() {
    let dir = tempdir().unwrap();
    let runscript = fake_implementation(dir.path(), Some("da_proc"));
    let launcher = RealLauncher::from_runscript(&runscript).unwrap();

    let plan = LaunchPlan {
        process_count: 3,
        hosts_file: dir.path().join("hosts"),
        config_files: vec![dir.path().join("config")],
        output_dir: dir.path().join("missing"),
    };

    let result = launcher.launch(&plan).await;
    assert_matches!(result, Err(StressError::OutputDirMissing { .. }));
}

#[tokio::test]
async fn test_launch_requires_a_config_file() {
    let dir = tempdir().unwrap();
    let runscript = fake_implementation(dir.path(), Some("da_proc"));
    let launcher = RealLauncher::from_runscript(&runscript).unwrap();

    let plan = LaunchPlan {
        process_count: 3,
        hosts_file: dir.path().join("hosts"),
        config_files: vec![],
        output_dir: dir.path().to_path_buf(),
    };

    let result = launcher.launch(&plan).await;
    assert_matches!(result, Err(StressError::ConfigurationError { .. }));
}

#[tokio::test]
async fn test_output_files_created_before_spawn_attempt() {
    let dir = tempdir().unwrap();
    // Not executable, so spawning fails after the redirects are opened
    let runscript = fake_implementation(dir.path(), Some("da_proc"));
    let launcher = RealLauncher::from_runscript(&runscript).unwrap();

    let plan = LaunchPlan {
        process_count: 2,
        hosts_file: dir.path().join("hosts"),
        config_files: vec![dir.path().join("config")],
        output_dir: dir.path().to_path_buf(),
    };

    let result = launcher.launch(&plan).await;
    assert_matches!(result, Err(StressError::SpawnFailed { logical_id, .. }) if logical_id.get() == 1);
    assert!(dir.path().join("proc01.stdout").is_file());
    assert!(dir.path().join("proc01.stderr").is_file());
    assert!(!dir.path().join("proc02.stdout").exists());
}
