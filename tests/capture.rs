//! Face capture loop and pipeline integration tests.

mod common;

use std::sync::{Arc, Mutex};

use facecap::{
    CaptureOptions, FaceAnalysis, FaceCaptureError, FaceRegion, OperationType, ProgressCallback,
    ProgressInfo, SubtitleInterval,
    capture::{avatar_file_name, capture_faces},
    pipeline::{CaptureJob, capture_avatars},
};

use common::{FakeVideo, ScriptedAnalyzer, face_with_confidence, face_with_region, frontal_face};

fn analysis_failure() -> FaceCaptureError {
    FaceCaptureError::AnalysisError("service unavailable".to_string())
}

// ── Capture loop ───────────────────────────────────────────────────

#[test]
fn admitted_faces_are_saved_at_target_size() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[48],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert_eq!(faces.len(), 1);
    let face = &faces[0];
    assert_eq!(face.frame_number, 48);
    assert_eq!(face.face_index, 0);
    assert_eq!(
        face.image_path,
        temporary_directory.path().join("frame_48_face_0.jpg")
    );

    let avatar = image::open(&face.image_path).expect("Failed to open saved avatar");
    assert_eq!((avatar.width(), avatar.height()), (300, 300));

    let (path, age, gender, race, emotion) = face.as_record();
    assert_eq!(path, face.image_path.as_path());
    assert_eq!(age, 31.0);
    assert_eq!((gender, race, emotion), ("女", "亚洲人", "开心"));
}

#[test]
fn target_size_is_configurable() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()])]);
    let options = CaptureOptions::new().with_target_size(128, 96);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[0],
        temporary_directory.path(),
        &options,
    )
    .expect("capture");

    let avatar = image::open(&faces[0].image_path).expect("Failed to open saved avatar");
    assert_eq!((avatar.width(), avatar.height()), (128, 96));
}

#[test]
fn file_names_use_the_face_position_in_the_frame() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut second = frontal_face();
    second.region = Some(FaceRegion::new(400, 150, 50, 50).with_eyes((440.0, 165.0), (380.0, 165.0)));
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![
        face_with_confidence(Some(0.5)),
        second,
    ])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[12],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].face_index, 1);
    assert!(temporary_directory.path().join(avatar_file_name(12, 1)).exists());
    assert!(!temporary_directory.path().join(avatar_file_name(12, 0)).exists());
}

#[test]
fn results_follow_frame_then_detection_order() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([
        Ok(vec![frontal_face(), frontal_face()]),
        Ok(vec![]),
        Ok(vec![frontal_face()]),
    ]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20, 30],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    let order: Vec<(u64, usize)> = faces
        .iter()
        .map(|face| (face.frame_number, face.face_index))
        .collect();
    assert_eq!(order, vec![(10, 0), (10, 1), (30, 0)]);
    assert_eq!(analyzer.calls, 3);
}

#[test]
fn unreadable_frame_is_skipped() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    video.unreadable.insert(10);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert_eq!(video.reads, vec![10, 20]);
    assert_eq!(analyzer.calls, 1);
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].frame_number, 20);
}

#[test]
fn analysis_failure_skips_only_that_frame() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([Err(analysis_failure()), Ok(vec![frontal_face()])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].frame_number, 20);
}

#[test]
fn unknown_label_aborts_the_run() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut odd = frontal_face();
    odd.race = facecap::AttributeScores::new([("martian", 99.0)]);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![odd]), Ok(vec![frontal_face()])]);

    let result = capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20],
        temporary_directory.path(),
        &CaptureOptions::new(),
    );

    assert!(matches!(result, Err(FaceCaptureError::UnknownCategory { .. })));
    assert_eq!(analyzer.calls, 1);
}

#[test]
fn skipped_faces_write_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let faces: Vec<FaceAnalysis> = vec![
        // No region: attributes resolve but there is nothing to crop.
        face_with_region(None),
        // Zero-width region with frontal eyes.
        face_with_region(Some(
            FaceRegion::new(100, 100, 0, 60).with_eyes((200.0, 120.0), (100.0, 120.0)),
        )),
        // Entirely outside the 640x360 frame.
        face_with_region(Some(
            FaceRegion::new(2000, 2000, 40, 40).with_eyes((2100.0, 2010.0), (2000.0, 2010.0)),
        )),
    ];
    let mut analyzer = ScriptedAnalyzer::new([Ok(faces)]);

    let accepted = capture_faces(
        &mut video,
        &mut analyzer,
        &[5],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert!(accepted.is_empty());
    let written = std::fs::read_dir(temporary_directory.path())
        .expect("read output dir")
        .count();
    assert_eq!(written, 0);
}

#[test]
fn write_failure_is_frame_scoped() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = temporary_directory.path().join("not_created");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()]), Ok(vec![frontal_face()])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20],
        &missing,
        &CaptureOptions::new(),
    )
    .expect("capture");

    assert!(faces.is_empty());
    assert_eq!(analyzer.calls, 2);
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().expect("lock").push(info.clone());
    }
}

#[test]
fn capture_reports_progress_per_keyframe() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let recorder = Arc::new(RecordingProgress::default());
    let options = CaptureOptions::new().with_progress(recorder.clone());
    let mut video = FakeVideo::new(25, 250);
    video.unreadable.insert(20);
    let mut analyzer = ScriptedAnalyzer::default();

    capture_faces(
        &mut video,
        &mut analyzer,
        &[10, 20, 30],
        temporary_directory.path(),
        &options,
    )
    .expect("capture");

    let reports = recorder.reports.lock().expect("lock");
    let frames: Vec<Option<u64>> = reports.iter().map(|info| info.current_frame).collect();
    assert_eq!(frames, vec![Some(10), Some(20), Some(30), Some(30)]);
    assert!(reports.iter().all(|info| info.operation == OperationType::FaceCapture));
    assert_eq!(reports.last().expect("final").percentage, Some(100.0));
}

// ── Pipeline ───────────────────────────────────────────────────────

#[test]
fn pipeline_creates_output_directory_and_captures() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("avatars").join("episode01");
    let mut video = FakeVideo::new(25, 250).with_keyframes(&[0, 24, 100, 200]);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()]), Ok(vec![frontal_face()])]);
    let intervals = [
        SubtitleInterval::new("00:00:01,000", "00:00:02,000"),
        SubtitleInterval::new("00:00:03,800", "00:00:04,200"),
    ];

    let faces = capture_avatars(
        &mut video,
        &mut analyzer,
        &intervals,
        &output,
        &CaptureOptions::new().with_frame_redundancy(10),
    )
    .expect("pipeline");

    assert!(output.is_dir());
    assert_eq!(video.reads, vec![24, 100]);
    let frames: Vec<u64> = faces.iter().map(|face| face.frame_number).collect();
    assert_eq!(frames, vec![24, 100]);
    assert!(output.join("frame_100_face_0.jpg").exists());
}

#[test]
fn job_creates_output_directory_before_opening_the_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let subtitles = temporary_directory.path().join("episode01.srt");
    std::fs::write(&subtitles, "1\n00:00:01,000 --> 00:00:02,000\nHello.\n")
        .expect("Failed to write subtitles");
    let output = temporary_directory.path().join("avatars").join("episode01");
    let job = CaptureJob::new(
        temporary_directory.path().join("missing.mp4"),
        &subtitles,
        &output,
    );
    let mut analyzer = ScriptedAnalyzer::default();

    let error = job.run(&mut analyzer).expect_err("missing video must not open");

    assert!(matches!(error, FaceCaptureError::FileOpen { .. }), "got {error:?}");
    assert!(output.is_dir());
    assert_eq!(analyzer.calls, 0);
}

#[test]
fn pipeline_without_keyframes_returns_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250).with_keyframes(&[0]);
    let mut analyzer = ScriptedAnalyzer::default();
    let intervals = [SubtitleInterval::new("00:00:05,000", "00:00:06,000")];

    let faces = capture_avatars(
        &mut video,
        &mut analyzer,
        &intervals,
        temporary_directory.path(),
        &CaptureOptions::new().with_frame_redundancy(0),
    )
    .expect("pipeline");

    assert!(faces.is_empty());
    assert_eq!(analyzer.calls, 0);
}

#[test]
fn accepted_faces_serialize_with_display_names() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut video = FakeVideo::new(25, 250);
    let mut analyzer = ScriptedAnalyzer::new([Ok(vec![frontal_face()])]);

    let faces = capture_faces(
        &mut video,
        &mut analyzer,
        &[7],
        temporary_directory.path(),
        &CaptureOptions::new(),
    )
    .expect("capture");

    let value = serde_json::to_value(&faces).expect("serialize");
    assert_eq!(value[0]["frame_number"], 7);
    assert_eq!(value[0]["gender"], "女");
    assert_eq!(value[0]["race"], "亚洲人");
    assert_eq!(value[0]["emotion"], "开心");
}
