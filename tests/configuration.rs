//! Capture configuration tests.

use std::path::{Path, PathBuf};

use facecap::{CaptureConfig, CaptureOptions, FaceCaptureError};

const FULL_CONFIGURATION: &str = "
[main]
frame_redundancy = 25
image_width = 256
image_height = 320
eye_diff_threshold = 42.5
min_face_confidence = 0.9
dry_run = yes

[face_conf.custom]
video_path = /data/episode01.mp4
sub_path = /data/episode01.srt
avatar_output_path = /data/avatars/episode01
analysis_endpoint = http://127.0.0.1:5005
";

fn origin() -> &'static Path {
    Path::new("face_capture.conf")
}

// ── Options ────────────────────────────────────────────────────────

#[test]
fn default_options() {
    let options = CaptureOptions::new();
    assert_eq!(options.frame_redundancy(), 50);
    assert_eq!(options.target_size(), (300, 300));
    assert_eq!(options.eye_diff_threshold(), 50.0);
    assert_eq!(options.min_face_confidence(), 0.95);
}

#[test]
fn builder_overrides() {
    let options = CaptureOptions::new()
        .with_frame_redundancy(5)
        .with_target_size(0, 64)
        .with_eye_diff_threshold(12.0)
        .with_min_face_confidence(0.5)
        .with_batch_size(0);
    assert_eq!(options.frame_redundancy(), 5);
    assert_eq!(options.target_size(), (1, 64));
    assert_eq!(options.eye_diff_threshold(), 12.0);
    assert_eq!(options.min_face_confidence(), 0.5);

    let debug = format!("{options:?}");
    assert!(debug.contains("frame_redundancy: 5"));
    assert!(debug.contains("batch_size: 1"));
}

// ── Config file ────────────────────────────────────────────────────

#[test]
fn parse_full_configuration() {
    let config = CaptureConfig::parse(FULL_CONFIGURATION, origin()).expect("parse");
    assert_eq!(config.frame_redundancy, 25);
    assert_eq!((config.image_width, config.image_height), (256, 320));
    assert_eq!(config.eye_diff_threshold, 42.5);
    assert_eq!(config.min_face_confidence, 0.9);
    assert!(config.dry_run);
    assert_eq!(config.video_path, Some(PathBuf::from("/data/episode01.mp4")));
    assert_eq!(config.subtitle_path, Some(PathBuf::from("/data/episode01.srt")));
    assert_eq!(
        config.output_directory,
        Some(PathBuf::from("/data/avatars/episode01"))
    );
    assert_eq!(
        config.analysis_endpoint.as_deref(),
        Some("http://127.0.0.1:5005")
    );

    let options = config.capture_options();
    assert_eq!(options.frame_redundancy(), 25);
    assert_eq!(options.target_size(), (256, 320));
}

#[test]
fn missing_keys_take_defaults() {
    let config = CaptureConfig::parse("[main]\nframe_redundancy = 10\n", origin()).expect("parse");
    assert_eq!(
        config,
        CaptureConfig {
            frame_redundancy: 10,
            ..CaptureConfig::default()
        }
    );

    let empty = CaptureConfig::parse("", origin()).expect("parse empty");
    assert_eq!(empty, CaptureConfig::default());
}

#[test]
fn empty_value_takes_default() {
    let config =
        CaptureConfig::parse("[main]\nimage_width =\n[face_conf.custom]\nsub_path =\n", origin())
            .expect("parse");
    assert_eq!(config.image_width, 300);
    assert_eq!(config.subtitle_path, None);
}

#[test]
fn bad_number_is_a_configuration_error() {
    let result = CaptureConfig::parse("[main]\nframe_redundancy = lots\n", origin());
    match result {
        Err(FaceCaptureError::ConfigurationError { path, reason }) => {
            assert_eq!(path, PathBuf::from("face_capture.conf"));
            assert!(reason.contains("frame_redundancy"), "reason: {reason}");
        }
        other => panic!("expected ConfigurationError, got {other:?}"),
    }
}

#[test]
fn dry_run_flag_spellings() {
    for (raw, expected) in [("true", true), ("On", true), ("1", true), ("no", false), ("0", false)] {
        let config = CaptureConfig::parse(&format!("[main]\ndry_run = {raw}\n"), origin())
            .expect("parse");
        assert_eq!(config.dry_run, expected, "dry_run = {raw}");
    }
    assert!(CaptureConfig::parse("[main]\ndry_run = maybe\n", origin()).is_err());
}

#[test]
fn load_from_disk() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("face_capture.conf");
    std::fs::write(&path, FULL_CONFIGURATION).expect("Failed to write config");

    let config = CaptureConfig::load(&path).expect("load");
    assert_eq!(config.frame_redundancy, 25);
}

#[test]
fn missing_file_is_fatal() {
    let result = CaptureConfig::load("conf/does_not_exist.conf");
    let error = result.expect_err("missing file");
    assert!(matches!(error, FaceCaptureError::ConfigurationMissing(_)));
    assert!(error.is_fatal());
    assert!(error.to_string().contains("does not exist"));
}

// ── FFmpeg log level ───────────────────────────────────────────────

#[test]
fn ffmpeg_log_level_names() {
    use facecap::FfmpegLogLevel;

    assert_eq!("quiet".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Quiet));
    assert_eq!("Error".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Error));
    assert_eq!("warn".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Warning));
    assert_eq!(FfmpegLogLevel::Verbose.to_string(), "verbose");

    let error = "loud".parse::<FfmpegLogLevel>().expect_err("unknown level");
    assert!(error.contains("loud"));
}
