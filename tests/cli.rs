use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn runs_from_config_and_writes_reports() {
    let output = tempdir().unwrap();
    let assert = Command::cargo_bin("viral_load")
        .unwrap()
        .args(["--config", "tests/data/params.json", "--output-dir"])
        .arg(output.path())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Completed 2 replicates"), "{stdout}");
    for name in ["compartments.csv", "age_summary.csv", "viral_load_profiles.csv"] {
        assert!(output.path().join(name).exists(), "{name} missing");
    }
}

#[test]
fn command_line_overrides_replicates() {
    let output = tempdir().unwrap();
    let assert = Command::cargo_bin("viral_load")
        .unwrap()
        .args([
            "--config",
            "tests/data/params.json",
            "--replicates",
            "3",
            "--threads",
            "2",
            "--random-seed",
            "5",
            "--log-level",
            "viral_load_abm::aggregate=info",
            "--output-dir",
        ])
        .arg(output.path())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Completed 3 replicates"), "{stdout}");
}

#[test]
fn invalid_config_fails_before_running() {
    let output = tempdir().unwrap();
    let assert = Command::cargo_bin("viral_load")
        .unwrap()
        .args(["--config", "tests/data/invalid_params.json", "--output-dir"])
        .arg(output.path())
        .assert()
        .failure();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("ConfigError"), "{stderr}");
    assert!(!output.path().join("compartments.csv").exists());
}

#[test]
fn unknown_log_level_is_rejected() {
    let output = tempdir().unwrap();
    Command::cargo_bin("viral_load")
        .unwrap()
        .args(["--log-level", "loud", "--output-dir"])
        .arg(output.path())
        .assert()
        .failure();
}
