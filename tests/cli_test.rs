//! CLI contract tests
//!
//! Runs the `cardshark` binary against small corpora in a temporary
//! workspace: init, build, score (text and JSON), validate.

use std::path::Path;
use std::process::Command;

fn cardshark_bin() -> String {
    env!("CARGO_BIN_EXE_cardshark").to_string()
}

fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(cardshark_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run cardshark");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn setup_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("positive.json"),
        r#"[{"pmid": 28000001, "text": "novel gene X-12 confers resistance", "title": "A gene", "journal": "J1", "label": 1}]"#,
    )
    .expect("write positive");
    std::fs::write(
        dir.path().join("background.json"),
        r#"[{"pmid": 28000002, "text": "old gene Y confers immunity", "title": "Another", "journal": "J2", "label": 0}]"#,
    )
    .expect("write background");
    dir
}

fn build(dir: &Path) {
    let (code, _, stderr) = run(
        dir,
        &[
            "build",
            "--positive",
            "positive.json",
            "--background",
            "background.json",
            "-o",
            "model.json",
        ],
    );
    assert_eq!(code, 0, "build failed: {}", stderr);
    assert!(dir.join("model.json").exists());
}

#[test]
fn test_version_and_help() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (code, stdout, _) = run(dir.path(), &["version"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("cardshark "));

    let (code, stdout, _) = run(dir.path(), &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("validate"));
}

#[test]
fn test_init_writes_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (code, _, stderr) = run(dir.path(), &["init"]);
    assert_eq!(code, 0, "init failed: {}", stderr);
    let config = std::fs::read_to_string(dir.path().join("cardshark.toml")).expect("config");
    assert!(config.contains("[scoring]"));
}

#[test]
fn test_build_then_score_json() {
    let dir = setup_workspace();
    build(dir.path());

    std::fs::write(
        dir.path().join("both.json"),
        r#"[{"pmid": 1, "text": "novel gene X-12 confers resistance", "title": "T", "journal": "J1", "label": 1},
            {"pmid": 2, "text": "old gene Y confers immunity", "title": "T", "journal": "J2", "label": 0}]"#,
    )
    .expect("write corpus");

    let (code, stdout, stderr) = run(
        dir.path(),
        &[
            "score",
            "both.json",
            "--model",
            "model.json",
            "--format",
            "json",
            "--predictions-out",
            "preds.json",
        ],
    );
    assert_eq!(code, 0, "score failed: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).expect("json report");
    assert_eq!(report["cutoff"].as_f64(), Some(11.0));
    assert_eq!(report["records"][0]["score"].as_f64(), Some(21.0));
    assert_eq!(report["records"][0]["prediction"], 1);
    assert_eq!(report["records"][1]["prediction"], 0);
    assert_eq!(report["metrics"]["confusion"]["true_positive"], 1);

    let preds: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("preds.json")).expect("preds"),
    )
    .expect("preds json");
    assert_eq!(preds["shark"][0][0], "1");
    assert_eq!(preds["shark"][0][1], 1);
}

#[test]
fn test_score_text_output_to_file() {
    let dir = setup_workspace();
    build(dir.path());

    let (code, _, stderr) = run(
        dir.path(),
        &[
            "score",
            "positive.json",
            "--model",
            "model.json",
            "--predictions-only",
            "-o",
            "report.txt",
        ],
    );
    assert_eq!(code, 0, "score failed: {}", stderr);
    let report = std::fs::read_to_string(dir.path().join("report.txt")).expect("report");
    assert!(report.contains("28000001"));
    assert!(!report.contains("EVALUATION"));
}

#[test]
fn test_score_missing_model_fails() {
    let dir = setup_workspace();
    let (code, _, stderr) = run(dir.path(), &["score", "positive.json", "--model", "nope.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("nope.json"));
}

#[test]
fn test_validate_with_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("cardshark.toml"),
        "[validation]\nheaders = [\"is_amr\", \"is_novel\"]\nfilename_terms = [\"review\"]\n",
    )
    .expect("write config");
    let sheets = dir.path().join("card");
    std::fs::create_dir(&sheets).expect("mkdir");
    std::fs::write(
        sheets.join("review_a.csv"),
        "pmid,is_amr,is_novel,abstract\n1,T,T,x\n2,F,F,y\n",
    )
    .expect("write sheet");
    std::fs::write(
        dir.path().join("preds.json"),
        r#"{"shark": [[1, 1], [2, 1]]}"#,
    )
    .expect("write preds");

    let (code, stdout, stderr) = run(
        dir.path(),
        &["validate", "card", "--predictions", "preds.json", "--format", "json"],
    );
    assert_eq!(code, 0, "validate failed: {}", stderr);
    let reports: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(reports[0]["name"], "card");
    assert_eq!(reports[0]["tallies"]["shark"]["TP"], 1);
    assert_eq!(reports[0]["tallies"]["shark"]["FP"], 1);
}

#[test]
fn test_invalid_workers_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (code, _, _) = run(dir.path(), &["--workers", "0", "version"]);
    assert_ne!(code, 0);
}
