use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("dei-explorer").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn score_without_artifacts_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("dei-explorer").expect("binary exists");
    cmd.env("DATA_DIR", dir.path().join("data"))
        .env("OUTPUTS_DIR", dir.path().join("outputs"))
        .env("MODELS_DIR", dir.path().join("models"))
        .arg("score")
        .assert()
        .failure();
    assert!(!dir.path().join("outputs/drug_condition_dei.csv").exists());
}
