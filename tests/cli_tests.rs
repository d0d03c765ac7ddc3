//! Exit code tests for the process_video_task binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn command() -> Command {
    let mut command = Command::cargo_bin("process_video_task").unwrap();
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn test_missing_config_exits_2() {
    let temp_dir = TempDir::new().unwrap();
    command()
        .arg(temp_dir.path().join("absent.json"))
        .assert()
        .code(2);
}

#[test]
fn test_invalid_config_exits_3() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tasks.json");
    fs::write(&config, "{ not json").unwrap();

    command().arg(&config).assert().code(3);
}

#[test]
fn test_only_info_lists_tasks_and_exits_0() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("a.h264");
    fs::write(&input, b"segment").unwrap();
    let config = temp_dir.path().join("tasks.json");
    let content = json!({
        "tasks": [
            {
                "type": "process_video_task",
                "output_concatenation_filename": temp_dir.path().join("cam2.mkv"),
                "input_files": [input],
            },
            {
                "type": "process_video_task",
                "output_concatenation_filename": temp_dir.path().join("missing").join("cam3.mkv"),
                "input_files": [input],
            }
        ]
    });
    fs::write(&config, format!("-- two cameras\n{}", content)).unwrap();

    command()
        .arg(&config)
        .arg("--only_info")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[runnable]"))
        .stdout(predicate::str::contains("[not runnable]"))
        .stdout(predicate::str::contains("1 files"));
}

#[test]
fn test_short_only_info_flag() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tasks.json");
    fs::write(&config, r#"{"tasks": []}"#).unwrap();

    command().arg(&config).arg("-i").assert().code(0);
}

#[test]
fn test_unknown_log_level_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tasks.json");
    fs::write(&config, r#"{"tasks": []}"#).unwrap();

    command()
        .arg(&config)
        .args(["--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}
