use std::{fs, path::Path, sync::Arc};

use gazetrack_lib::{
    calibration::DotSchedule,
    capture::{spawn_ingest_loop, FrameEvent},
    device::{FixedDeviceMetrics, REFERENCE_DEVICE},
    geometry::{Point, Rect},
    models::{
        DeviceOrientation, FaceLandmarks, FaceObservation, RawFrame, ScreenMetrics, SessionStatus,
    },
    settings::RecorderSettings,
    synthetic::{SyntheticConfig, SyntheticSource},
    RecorderError, SessionRecorder,
};
use serde_json::Value;

const FACE: Rect = Rect::new(0.2, 0.3, 0.5, 0.4);

fn settings(root: &Path) -> RecorderSettings {
    RecorderSettings {
        output_root: root.to_path_buf(),
        ..RecorderSettings::default()
    }
}

fn recorder(root: &Path) -> SessionRecorder {
    recorder_with(settings(root), None)
}

fn recorder_with(settings: RecorderSettings, points_per_cm: Option<f32>) -> SessionRecorder {
    SessionRecorder::new(
        settings,
        Arc::new(FixedDeviceMetrics::new(REFERENCE_DEVICE, points_per_cm)),
    )
}

fn portrait() -> ScreenMetrics {
    ScreenMetrics::new(390, 844, DeviceOrientation::Portrait)
}

fn frame(i: usize) -> RawFrame {
    RawFrame::filled(16, 16, [40, 90, 200, 255], i as f64 / 30.0)
}

fn brow(x: f32) -> Vec<Point> {
    vec![Point::new(x, 0.6), Point::new(x + 0.05, 0.62), Point::new(x + 0.1, 0.6)]
}

fn face() -> FaceObservation {
    FaceObservation::new(FACE)
        .with_landmarks(FaceLandmarks {
            left_eyebrow: brow(0.25),
            right_eyebrow: brow(0.5),
        })
        .with_pose(0.1, -0.05, 0.02)
        .with_quality(0.8)
}

fn read_json(dir: &Path, file: &str) -> Value {
    let bytes = fs::read(dir.join(file)).unwrap_or_else(|err| panic!("{file}: {err}"));
    serde_json::from_slice(&bytes).unwrap()
}

fn len(value: &Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

#[tokio::test]
async fn twenty_five_valid_frames_produce_full_dataset() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let session = recorder.start_session().await.unwrap();
    assert_eq!(recorder.status().await, SessionStatus::Recording);

    let detection = face();
    for i in 0..25 {
        recorder
            .record_frame(Some(&detection), frame(i), portrait(), None)
            .await
            .unwrap();
    }
    let snapshot = recorder.snapshot().await;
    assert_eq!(snapshot.total_frames, 25);
    assert_eq!(snapshot.buffered_frames, 5);
    assert_eq!(snapshot.flushes, 1);

    let report = recorder.stop_session().await.unwrap();
    assert_eq!(recorder.status().await, SessionStatus::Idle);

    assert_eq!(report.total_frames, 25);
    assert_eq!(report.flush_batches, vec![20, 5]);
    assert_eq!(report.frames_written, 25);
    assert!(report.is_complete(), "{report:?}");

    let dir = session.directory.as_path();
    let info = read_json(dir, "info.json");
    assert_eq!(info["TotalFrames"], 25);
    assert_eq!(info["NumFaceDetections"], 25);
    assert_eq!(info["NumEyeDetections"], 25);
    assert_eq!(info["DeviceName"], REFERENCE_DEVICE);

    let frames = read_json(dir, "frames.json");
    assert_eq!(len(&frames["frameNames"]), 25);
    assert_eq!(frames["frameNames"][24], format!("{}_24.jpg", session.name));

    let expected_height = FACE.height * 844.0;
    let face_table = read_json(dir, "appleFace.json");
    for key in ["H", "W", "X", "Y", "IsValid"] {
        assert_eq!(len(&face_table[key]), 25, "appleFace.{key}");
    }
    for h in face_table["H"].as_array().unwrap() {
        assert!((h.as_f64().unwrap() - expected_height as f64).abs() < 1e-3);
    }

    let screen = read_json(dir, "screen.json");
    assert_eq!(screen["W"][0], 390);
    assert_eq!(screen["H"][0], 844);
    assert_eq!(screen["Orientation"][0], 1);

    for i in 0..25 {
        assert!(dir.join(format!("frame_{i}.jpg")).is_file(), "frame_{i}.jpg");
    }
    assert!(!dir.join("headPose.json").exists());
}

#[tokio::test]
async fn frames_without_detection_are_recorded_as_invalid() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let session = recorder.start_session().await.unwrap();

    for i in 0..5 {
        recorder
            .record_frame(None, frame(i), portrait(), None)
            .await
            .unwrap();
    }
    let report = recorder.stop_session().await.unwrap();
    assert_eq!(report.total_frames, 5);
    assert_eq!(report.num_face_detections, 0);

    let dir = session.directory.as_path();
    for file in ["appleFace.json", "appleLeftEye.json", "appleRightEye.json"] {
        let table = read_json(dir, file);
        let valids = table["IsValid"].as_array().unwrap();
        assert_eq!(valids.len(), 5, "{file}");
        assert!(valids.iter().all(|v| v == 0), "{file}");
    }
    assert_eq!(read_json(dir, "info.json")["NumFaceDetections"], 0);

    let dots = read_json(dir, "dotInfo.json");
    assert_eq!(len(&dots["DotNum"]), 5);
    assert!(dots["DotNum"].as_array().unwrap().iter().all(|d| d == -1));
}

#[tokio::test]
async fn lifecycle_errors() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());

    let idle = recorder.record_frame(None, frame(0), portrait(), None).await;
    assert!(matches!(idle, Err(RecorderError::NotRecording)));
    assert!(matches!(
        recorder.stop_session().await,
        Err(RecorderError::NotRecording)
    ));

    recorder.start_session().await.unwrap();
    assert!(matches!(
        recorder.start_session().await,
        Err(RecorderError::AlreadyRecording)
    ));
    recorder.stop_session().await.unwrap();

    let after_stop = recorder.record_frame(None, frame(1), portrait(), None).await;
    assert!(matches!(after_stop, Err(RecorderError::NotRecording)));
}

#[tokio::test]
async fn consecutive_sessions_get_their_own_directories() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());

    let first = recorder.start_session().await.unwrap();
    recorder
        .record_frame(None, frame(0), portrait(), None)
        .await
        .unwrap();
    recorder.stop_session().await.unwrap();

    let second = recorder.start_session().await.unwrap();
    let report = recorder.stop_session().await.unwrap();

    assert_ne!(first.directory, second.directory);
    assert_eq!(report.total_frames, 0);
    assert_eq!(read_json(&second.directory, "info.json")["TotalFrames"], 0);
    assert_eq!(read_json(&first.directory, "info.json")["TotalFrames"], 1);
}

#[tokio::test]
async fn unwritable_output_root_fails_start() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("not-a-dir");
    fs::write(&blocker, b"occupied").unwrap();

    let recorder = recorder(&blocker);
    let err = recorder.start_session().await.unwrap_err();
    assert!(matches!(err, RecorderError::Storage { .. }), "{err}");
    assert_eq!(recorder.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn cancel_discards_the_session() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let session = recorder.start_session().await.unwrap();

    for i in 0..3 {
        recorder
            .record_frame(Some(&face()), frame(i), portrait(), None)
            .await
            .unwrap();
    }
    recorder.cancel_session().await.unwrap();

    assert_eq!(recorder.status().await, SessionStatus::Idle);
    assert!(!session.directory.join("info.json").exists());
    assert!(matches!(
        recorder.stop_session().await,
        Err(RecorderError::NotRecording)
    ));
    recorder.cancel_session().await.unwrap();
}

#[tokio::test]
async fn head_pose_table_is_written_when_enabled() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder_with(
        RecorderSettings {
            export_head_pose: true,
            ..settings(root.path())
        },
        None,
    );
    let session = recorder.start_session().await.unwrap();
    recorder
        .record_frame(Some(&face()), frame(0), portrait(), None)
        .await
        .unwrap();
    recorder
        .record_frame(None, frame(1), portrait(), None)
        .await
        .unwrap();
    let report = recorder.stop_session().await.unwrap();

    assert_eq!(report.files_written.len(), 8);
    let pose = read_json(&session.directory, "headPose.json");
    assert!((pose["Yaw"][0].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(pose["Yaw"][1], 0.0);
    assert_eq!(len(&pose["Quality"]), 2);
}

#[tokio::test]
async fn calibration_dots_convert_to_camera_space() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder_with(settings(root.path()), Some(100.0));
    let session = recorder.start_session().await.unwrap();

    let schedule = DotSchedule::thirds(390, 844);
    let times = [0.0f32, 5.0];
    for (i, secs) in times.iter().enumerate() {
        let sample = schedule.sample_at(std::time::Duration::from_secs_f32(*secs));
        recorder
            .record_frame(None, frame(i), portrait(), sample)
            .await
            .unwrap();
    }
    let report = recorder.stop_session().await.unwrap();
    assert_eq!(report.diagnostics.unknown_device_frames, 0);

    let dots = read_json(&session.directory, "dotInfo.json");
    assert_eq!(dots["DotNum"][0], 0);
    assert_eq!(dots["DotNum"][1], 1);

    let x_cam = dots["XCam"][0].as_f64().unwrap();
    let y_cam = dots["YCam"][0].as_f64().unwrap();
    assert!((x_cam - (1.3 - 2.6)).abs() < 1e-3, "{x_cam}");
    assert!((y_cam - -(844.0 / 300.0 - 0.5)).abs() < 1e-3, "{y_cam}");
}

#[tokio::test]
async fn unknown_device_records_zero_camera_coordinates() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let session = recorder.start_session().await.unwrap();

    let sample = DotSchedule::thirds(390, 844).sample_at(std::time::Duration::ZERO);
    recorder
        .record_frame(None, frame(0), portrait(), sample)
        .await
        .unwrap();
    let report = recorder.stop_session().await.unwrap();

    assert_eq!(report.diagnostics.unknown_device_frames, 1);
    let dots = read_json(&session.directory, "dotInfo.json");
    assert_eq!(dots["XCam"][0], 0.0);
    assert_eq!(dots["YCam"][0], 0.0);
    assert!((dots["XPts"][0].as_f64().unwrap() - 130.0).abs() < 1e-3);
}

#[tokio::test]
async fn ingest_loop_feeds_the_recorder_in_order() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder_with(
        RecorderSettings {
            max_frames_cache_size: 8,
            ..settings(root.path())
        },
        None,
    );
    let session = recorder.start_session().await.unwrap();

    let (sender, ingest) = spawn_ingest_loop(recorder.clone(), 4);
    let source = SyntheticSource::new(SyntheticConfig {
        frame_width: 24,
        frame_height: 32,
        dropout_every: Some(5),
        ..SyntheticConfig::default()
    });
    for event in source.take(20) {
        sender.send(event).await.unwrap();
    }
    drop(sender);

    let stats = ingest.join().await.unwrap();
    assert_eq!(stats.recorded, 20);
    assert_eq!(stats.rejected, 0);

    let report = recorder.stop_session().await.unwrap();
    assert_eq!(report.total_frames, 20);
    assert_eq!(report.num_face_detections, 16);
    assert_eq!(report.flush_batches, vec![8, 8, 4]);
    assert_eq!(report.frames_written, 20);

    let names = read_json(&session.directory, "frames.json");
    for i in 0..20 {
        assert_eq!(names["frameNames"][i], format!("{}_{i}.jpg", session.name));
    }
}

#[tokio::test]
async fn ingest_rejects_frames_when_idle() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let (sender, ingest) = spawn_ingest_loop(recorder, 2);

    sender
        .send(FrameEvent {
            detection: None,
            frame: frame(0),
            screen: portrait(),
            calibration: None,
        })
        .await
        .unwrap();
    drop(sender);

    let stats = ingest.join().await.unwrap();
    assert_eq!(stats.recorded, 0);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn stop_timeout_still_exports_and_accounts_for_every_frame() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder_with(
        RecorderSettings {
            flush_timeout_secs: 0,
            ..settings(root.path())
        },
        None,
    );
    let session = recorder.start_session().await.unwrap();

    // Everything stays in the buffer, so all writing happens after stop.
    // Large enough that encoding outlasts the zero timeout.
    let detection = face();
    for i in 0..12 {
        let big = RawFrame::filled(800, 800, [40, 90, 200, 255], i as f64 / 30.0);
        recorder
            .record_frame(Some(&detection), big, portrait(), None)
            .await
            .unwrap();
    }

    let report = recorder.stop_session().await.unwrap();
    assert_eq!(recorder.status().await, SessionStatus::Idle);
    assert!(report.flush_error.is_some(), "{report:?}");
    assert!(!report.is_complete());
    assert_eq!(report.total_frames, 12);
    assert_eq!(
        report.frames_written + report.frame_failures.len(),
        report.total_frames
    );

    let mut accounted: Vec<u64> = report.frame_failures.iter().map(|f| f.index).collect();
    accounted.sort_unstable();
    accounted.dedup();
    assert_eq!(accounted.len(), report.frame_failures.len());

    let dir = session.directory.as_path();
    for file in [
        "appleFace.json",
        "appleLeftEye.json",
        "appleRightEye.json",
        "dotInfo.json",
        "frames.json",
        "info.json",
        "screen.json",
    ] {
        assert!(dir.join(file).is_file(), "{file}");
    }
    assert!(report.export_failures.is_empty());
    assert_eq!(read_json(dir, "info.json")["TotalFrames"], 12);
}

#[tokio::test]
async fn unwritable_frame_is_listed_in_the_report() {
    let root = tempfile::tempdir().unwrap();
    let recorder = recorder(root.path());
    let session = recorder.start_session().await.unwrap();

    // A directory where the first JPEG should go.
    fs::create_dir(session.directory.join("frame_0.jpg")).unwrap();

    for i in 0..3 {
        recorder
            .record_frame(Some(&face()), frame(i), portrait(), None)
            .await
            .unwrap();
    }
    let report = recorder.stop_session().await.unwrap();

    assert!(report.flush_error.is_none(), "{report:?}");
    assert_eq!(report.frames_written, 2);
    assert_eq!(report.frame_failures.len(), 1);
    assert_eq!(report.frame_failures[0].index, 0);
    assert!(report.export_failures.is_empty());
    assert!(!report.is_complete());

    assert!(session.directory.join("frame_1.jpg").is_file());
    assert!(session.directory.join("frame_2.jpg").is_file());
    assert_eq!(len(&read_json(&session.directory, "frames.json")["frameNames"]), 3);
}
