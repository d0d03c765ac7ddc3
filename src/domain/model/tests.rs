// Unit tests for domain models

use super::*;
use chrono::NaiveDate;
use tempfile::TempDir;

fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 8, 22)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

#[test]
fn test_builder_defaults() {
    let task = TaskConfig::builder().build().unwrap();
    assert_eq!(task.output_width(), 960);
    assert_eq!(task.output_height(), 540);
    assert_eq!(task.skip_frame_count(), 110);
    assert!(task.auto_date_prefix());
    assert_eq!(task.prefix_time_format(), "%Y%m%d%H%M");
    assert_eq!(task.output_fps(), 30.0);
    assert_eq!(task.output_codec(), "h264");
    assert!(task.input_files().is_empty());
    assert!(task.output_path_template().is_none());
}

#[test]
fn test_builder_rejects_invalid_values() {
    assert!(TaskConfig::builder().output_size(0, 540).build().is_err());
    assert!(TaskConfig::builder().output_size(960, 0).build().is_err());
    assert!(TaskConfig::builder().output_fps(0.0).build().is_err());
    assert!(TaskConfig::builder().output_fps(f64::NAN).build().is_err());
    assert!(TaskConfig::builder().output_codec("  ").build().is_err());
    assert!(TaskConfig::builder().prefix_time_format("%Y%J").build().is_err());
}

#[test]
fn test_is_runnable_requires_output_path() {
    let task = TaskConfig::builder().build().unwrap();
    assert!(!task.is_runnable());
}

#[test]
fn test_is_runnable_requires_existing_parent() {
    let temp_dir = TempDir::new().unwrap();

    let missing = TaskConfig::builder()
        .output_path(temp_dir.path().join("missing").join("cam.mkv"))
        .build()
        .unwrap();
    assert!(!missing.is_runnable());

    let present = TaskConfig::builder()
        .output_path(temp_dir.path().join("cam.mkv"))
        .build()
        .unwrap();
    assert!(present.is_runnable());
}

#[test]
fn test_is_runnable_bare_file_name_uses_current_dir() {
    let task = TaskConfig::builder().output_path("cam.mkv").build().unwrap();
    assert!(task.is_runnable());
}

#[test]
fn test_is_runnable_ignores_input_files() {
    let temp_dir = TempDir::new().unwrap();
    let task = TaskConfig::builder()
        .input_files(["/definitely/not/here.h264"])
        .output_path(temp_dir.path().join("cam.mkv"))
        .build()
        .unwrap();
    assert!(task.is_runnable());
}

#[test]
fn test_actual_output_path_without_prefix() {
    let task = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .auto_date_prefix(false)
        .build()
        .unwrap();
    assert_eq!(
        task.actual_output_path(at(14, 17, 0)).unwrap(),
        PathBuf::from("/records/cam2.mkv")
    );
}

#[test]
fn test_actual_output_path_with_prefix() {
    let task = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .build()
        .unwrap();
    assert_eq!(
        task.actual_output_path(at(14, 17, 0)).unwrap(),
        PathBuf::from("/records/202208221417_cam2.mkv")
    );
}

#[test]
fn test_actual_output_path_stable_within_unit() {
    let task = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .build()
        .unwrap();
    let first = task.actual_output_path(at(14, 17, 1)).unwrap();
    let second = task.actual_output_path(at(14, 17, 59)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_actual_output_path_changes_across_unit_boundary() {
    let task = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .build()
        .unwrap();
    let before = task.actual_output_path(at(14, 17, 59)).unwrap();
    let after = task.actual_output_path(at(14, 18, 0)).unwrap();
    assert_ne!(before.file_name(), after.file_name());
    assert_eq!(before.parent(), after.parent());
}

#[test]
fn test_actual_output_path_requires_output() {
    let task = TaskConfig::builder().build().unwrap();
    assert!(matches!(
        task.actual_output_path(at(0, 0, 0)),
        Err(ConcatError::TaskNotRunnable { .. })
    ));
}

#[test]
fn test_object_detection_path_follows_output_prefix() {
    let task = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .object_detection_path("/records/cam2_people.mkv")
        .build()
        .unwrap();
    assert_eq!(
        task.actual_object_detection_path(at(14, 17, 0)).unwrap(),
        Some(PathBuf::from("/records/202208221417_cam2_people.mkv"))
    );

    let plain = TaskConfig::builder()
        .output_path("/records/cam2.mkv")
        .build()
        .unwrap();
    assert_eq!(plain.actual_object_detection_path(at(14, 17, 0)).unwrap(), None);
}

#[test]
fn test_task_display() {
    let task = TaskConfig::builder()
        .input_files(["a.h264", "b.h264"])
        .output_path("out.mkv")
        .build()
        .unwrap();
    let text = task.to_string();
    assert!(text.contains("2 files"));
    assert!(text.contains("out.mkv"));
    assert!(text.contains("960x540"));
}

#[test]
fn test_resolution_rejects_zero() {
    assert!(Resolution::new(0, 0).is_err());
    assert_eq!(Resolution::new(4, 2).unwrap().to_string(), "4x2");
}
