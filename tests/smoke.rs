mod common;

use std::fs;

use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("review-labeler").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn serve_without_artifacts_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("review-labeler").expect("binary exists");
    cmd.env("DATA_DIR", dir.path().join("data"))
        .env("ARTIFACTS_DIR", dir.path().join("artifacts"))
        .args(["serve", "--port", "0"])
        .assert()
        .failure();
}

#[test]
fn label_then_train_activates_a_version() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let artifacts = dir.path().join("artifacts");
    let export = dir.path().join("reviews.csv");
    let mut csv = String::from("ReviewContent,ReviewScore,Verified\n");
    for text in common::corpus() {
        csv.push_str(&format!("\"{text}\",4.0 out of 5 stars,True\n"));
    }
    fs::write(&export, csv).unwrap();

    let run = |args: &[&str]| {
        Command::cargo_bin("review-labeler")
            .expect("binary exists")
            .current_dir(dir.path())
            .env("DATA_DIR", &data)
            .env("ARTIFACTS_DIR", &artifacts)
            .args(args)
            .assert()
            .success();
    };
    run(&["label", "--input", export.to_str().unwrap()]);
    let labeled = fs::read_to_string(data.join("labeled.csv")).unwrap();
    assert_eq!(labeled.lines().count(), 46);

    run(&["train"]);
    let version = fs::read_to_string(artifacts.join("CURRENT")).unwrap();
    assert!(artifacts.join(version.trim()).join("manifest.json").exists());

    let output = Command::cargo_bin("review-labeler")
        .expect("binary exists")
        .current_dir(dir.path())
        .env("DATA_DIR", &data)
        .env("ARTIFACTS_DIR", &artifacts)
        .args(["predict", "bad headache and felt groggy"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let response: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(response["predictions"].as_array().unwrap().len(), 1);
}
