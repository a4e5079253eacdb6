//! Session lifecycle tests against the fake backend
//!
//! Each test drives a `Camera2Session` on the test thread through
//! `SessionHarness`, delivering platform completions explicitly.

use camera2_session::invariant_ppt::{
    clear_invariant_log, contract_test, CAMERA_THREAD_CONFINEMENT, SINGLE_CREATION_OUTCOME,
    STOPPED_BEFORE_RELEASE,
};
use camera2_session::session::{
    CameraEvent, CaptureFailure, CreateOutcome, DeviceEvent, FlashOutcome, RequestTemplate,
    SessionNotification, SessionOptions, SessionRequest, SessionState, StillCaptureOptions,
    SurfaceId,
};
use camera2_session::testing::{
    front_capabilities, BackendCall, ConfigureBehavior, FakeBehavior, OpenBehavior,
    SessionHarness,
};
use camera2_session::types::{
    AfMode, DeviceErrorCode, FlashMode, FramerateRange, OpticalStabilizationMode, Size,
    VideoStabilizationMode,
};
use camera2_session::{CameraError, ErrorKind};
use tokio::sync::oneshot;

fn request() -> SessionRequest {
    SessionRequest::new("0", 1280, 720, 30)
}

fn running() -> SessionHarness {
    let mut harness = SessionHarness::start(FakeBehavior::default(), request());
    harness.pump();
    assert_eq!(harness.session.state(), SessionState::Running);
    harness
}

fn failure_kind(harness: &SessionHarness) -> Option<ErrorKind> {
    match harness.outcomes().as_slice() {
        [CreateOutcome::Failure { kind, .. }] => Some(*kind),
        _ => None,
    }
}

fn assert_close(actual: (f32, f32), expected: (f32, f32)) {
    assert!(
        (actual.0 - expected.0).abs() < 1e-5 && (actual.1 - expected.1).abs() < 1e-5,
        "{:?} != {:?}",
        actual,
        expected
    );
}

// ─── Startup ────────────────────────────────────────────────────────────────

#[test]
fn test_startup_reaches_running_and_reports_done_once() {
    let harness = running();

    assert_eq!(harness.outcomes(), vec![CreateOutcome::Done(harness.session.id())]);
    assert_eq!(harness.events.notifications()[0], SessionNotification::Opening);
    assert_eq!(
        harness.backend.calls(),
        vec![
            BackendCall::Characteristics("0".into()),
            BackendCall::OpenCamera("0".into()),
            BackendCall::SetTextureSize(Size::new(1280, 720)),
            BackendCall::CreateSurface,
            BackendCall::CreateImageReader {
                size: Size::new(4032, 3024),
                max_images: 2
            },
            BackendCall::CreateCaptureSession(vec![SurfaceId(1), SurfaceId(2)]),
            BackendCall::SetRepeatingRequest,
            BackendCall::StartListening,
        ]
    );
}

#[test]
fn test_repeating_request_uses_negotiated_format() {
    let harness = running();
    let request = harness.backend.last_request().unwrap();

    assert_eq!(request.template, RequestTemplate::Record);
    assert_eq!(request.targets, vec![SurfaceId(1)]);
    assert_eq!(request.ae_target_fps_range, Some(FramerateRange::new(30, 30)));
    assert_eq!(request.ae_lock, Some(false));
    assert_eq!(request.flash_mode, FlashMode::Off);
    assert_eq!(request.optical_stabilization, Some(OpticalStabilizationMode::On));
    assert_eq!(request.video_stabilization, Some(VideoStabilizationMode::Off));
    assert_eq!(request.af_mode, Some(AfMode::ContinuousVideo));

    let format = harness.session.capture_format().unwrap();
    assert_eq!(format.framerate, FramerateRange::new(30000, 30000));
}

#[test]
fn test_front_camera_request_and_fallback_still_size() {
    let mut behavior = FakeBehavior::default();
    behavior.capabilities = Ok(front_capabilities());
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    let request = harness.backend.last_request().unwrap();
    // Device reports fps * 1000, so the range goes back unscaled.
    assert_eq!(request.ae_target_fps_range, Some(FramerateRange::new(30000, 30000)));
    assert_eq!(request.video_stabilization, Some(VideoStabilizationMode::On));
    assert_eq!(request.optical_stabilization, Some(OpticalStabilizationMode::Off));
    assert_eq!(request.af_mode, None);
    assert_eq!(
        harness.backend.count(&BackendCall::CreateImageReader {
            size: Size::new(1920, 1080),
            max_images: 2
        }),
        1
    );
}

#[test]
fn test_open_error_is_a_creation_failure() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Fail(DeviceErrorCode::CameraInUse);
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(
        harness.outcomes(),
        vec![CreateOutcome::Failure {
            kind: ErrorKind::DeviceAccessError,
            message: "Camera device is in use already.".to_string()
        }]
    );
    assert!(harness.events.errors().is_empty());
    assert_eq!(harness.session.state(), SessionState::Stopped);
}

#[test]
fn test_open_refused_is_a_creation_failure() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Refuse;
    let harness = SessionHarness::start(behavior, request());

    assert_eq!(failure_kind(&harness), Some(ErrorKind::DeviceAccessError));
    assert_eq!(harness.session.state(), SessionState::Stopped);
    // No open was accepted, so no completion is awaited.
    assert!(harness.session.is_finished());
}

#[test]
fn test_characteristics_failure_is_a_creation_failure() {
    let mut behavior = FakeBehavior::default();
    behavior.capabilities = Err(CameraError::DeviceAccessError("unknown camera".into()));
    let harness = SessionHarness::start(behavior, request());

    assert_eq!(failure_kind(&harness), Some(ErrorKind::DeviceAccessError));
    assert_eq!(
        harness.backend.count(&BackendCall::OpenCamera("0".into())),
        0
    );
}

#[test]
fn test_disconnect_while_opening_is_a_creation_failure() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Disconnect;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(
        harness.outcomes(),
        vec![CreateOutcome::Failure {
            kind: ErrorKind::Disconnected,
            message: "Camera disconnected / evicted.".to_string()
        }]
    );
    assert_eq!(
        harness
            .events
            .count(|n| matches!(n, SessionNotification::Disconnected(_))),
        0
    );
}

#[test]
fn test_repeating_request_failure_during_start_is_a_creation_failure() {
    let mut behavior = FakeBehavior::default();
    behavior.fail_repeating_request = true;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(failure_kind(&harness), Some(ErrorKind::CaptureStartFailed));
    assert!(!harness.backend.is_listening());
    assert_eq!(harness.backend.count(&BackendCall::CloseCaptureSession), 1);
    assert_eq!(harness.backend.count(&BackendCall::CloseDevice), 1);
}

#[test]
fn test_preview_surface_failure_closes_device() {
    let mut behavior = FakeBehavior::default();
    behavior.fail_create_surface = true;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(failure_kind(&harness), Some(ErrorKind::SessionConfigureFailed));
    assert_eq!(harness.backend.count(&BackendCall::CloseDevice), 1);
    assert!(harness.session.is_finished());
}

#[test]
fn test_disconnect_after_configure_failure_reports_one_outcome() {
    let mut behavior = FakeBehavior::default();
    behavior.configure = ConfigureBehavior::Fail;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();
    harness.post(CameraEvent::Device(DeviceEvent::Disconnected));
    harness.pump();

    assert_eq!(failure_kind(&harness), Some(ErrorKind::SessionConfigureFailed));
    assert!(harness.events.errors().is_empty());
    assert_eq!(
        harness
            .events
            .count(|n| matches!(n, SessionNotification::Disconnected(_))),
        0
    );
}

// ─── Running ────────────────────────────────────────────────────────────────

#[test]
fn test_frame_is_rotated_and_counted() {
    let mut harness = running();
    assert!(harness.backend.emit_frame(0));
    harness.pump();

    let frames = harness.events.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].rotation, 90);
    // Sensor rotation of 90 is undone around the texture center.
    assert_close(frames[0].buffer.transform.map_point(1.0, 0.5), (0.5, 0.0));
    assert_close(frames[0].buffer.transform.map_point(0.5, 0.5), (0.5, 0.5));

    assert_eq!(harness.session.stats().frames_delivered, 1);
    assert!(harness.session.stats().start_latency_ms.is_some());
}

#[test]
fn test_front_frame_rotation_mirrors_display_rotation() {
    let mut behavior = FakeBehavior::default();
    behavior.capabilities = Ok(front_capabilities());
    behavior.display_rotation = 90;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();
    harness.backend.emit_frame(0);
    harness.pump();

    let frames = harness.events.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].rotation, 180);
    assert_close(frames[0].buffer.transform.map_point(0.5, 0.5), (0.5, 0.5));
}

#[test]
fn test_back_frame_rotation_follows_display_rotation() {
    let mut behavior = FakeBehavior::default();
    behavior.display_rotation = 90;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(harness.session.frame_orientation(), 180);
}

#[test]
fn test_device_error_while_running_is_a_runtime_error() {
    let mut harness = running();
    harness.post(CameraEvent::Device(DeviceEvent::Error(DeviceErrorCode::CameraDevice)));
    harness.pump();

    assert_eq!(
        harness.events.errors(),
        vec!["Camera device has encountered a fatal error.".to_string()]
    );
    assert_eq!(harness.outcomes().len(), 1);
    assert_eq!(harness.session.state(), SessionState::Stopped);
}

#[test]
fn test_disconnect_while_running_notifies_disconnected() {
    let mut harness = running();
    harness.post(CameraEvent::Device(DeviceEvent::Disconnected));
    harness.pump();

    let id = harness.session.id();
    assert_eq!(
        harness
            .events
            .count(|n| *n == SessionNotification::Disconnected(id)),
        1
    );
    assert!(harness.events.errors().is_empty());
}

#[test]
fn test_unexpected_close_while_running() {
    let mut harness = running();
    harness.backend.set_behavior(|b| b.emit_closed_on_close = false);
    harness.post(CameraEvent::Device(DeviceEvent::Closed));
    harness.pump();

    let id = harness.session.id();
    assert_eq!(
        harness.events.errors(),
        vec!["Camera device closed unexpectedly.".to_string()]
    );
    assert_eq!(
        harness.events.count(|n| *n == SessionNotification::Closed(id)),
        1
    );
    assert!(harness.session.is_finished());
}

#[test]
fn test_capture_failures_are_counted_only() {
    let mut harness = running();
    harness.post(CameraEvent::CaptureFailed(CaptureFailure {
        frame_number: 3,
        reason: "buffer lost".into(),
    }));
    harness.pump();

    assert_eq!(harness.session.stats().capture_failures, 1);
    assert_eq!(harness.session.state(), SessionState::Running);
    assert!(harness.events.errors().is_empty());
}

// ─── Stop and teardown ──────────────────────────────────────────────────────

#[test]
fn test_teardown_releases_in_order() {
    let mut harness = running();
    harness.backend.clear_calls();
    harness.session.stop().unwrap();

    assert_eq!(
        harness.backend.calls(),
        vec![
            BackendCall::StopListening,
            BackendCall::CloseCaptureSession,
            BackendCall::ReleaseSurface(SurfaceId(1)),
            BackendCall::ReleaseSurface(SurfaceId(2)),
            BackendCall::CloseDevice,
        ]
    );
}

#[test]
fn test_stop_is_idempotent() {
    let mut harness = running();
    harness.session.stop().unwrap();
    harness.session.stop().unwrap();
    harness.pump();
    harness.session.stop().unwrap();

    assert_eq!(harness.backend.count(&BackendCall::CloseDevice), 1);
    assert_eq!(harness.backend.count(&BackendCall::CloseCaptureSession), 1);
    assert!(harness.events.errors().is_empty());
    assert!(harness.session.is_finished());
    assert!(harness.session.stats().stop_duration_ms.is_some());

    let id = harness.session.id();
    assert_eq!(
        harness.events.count(|n| *n == SessionNotification::Closed(id)),
        1
    );
}

#[test]
fn test_frame_after_stop_is_dropped() {
    let mut harness = running();
    harness.session.stop().unwrap();
    assert!(!harness.backend.emit_frame(1));
    assert!(harness.backend.emit_stray_frame(2));
    harness.pump();

    assert!(harness.events.frames().is_empty());
    assert_eq!(harness.session.stats().frames_dropped, 1);
}

#[test]
fn test_stop_before_open_closes_late_device() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Manual;
    let mut harness = SessionHarness::start(behavior, request());
    harness.session.stop().unwrap();
    assert_eq!(harness.backend.count(&BackendCall::CloseDevice), 0);
    assert!(!harness.session.is_finished());

    harness.backend.emit_opened();
    harness.pump();

    assert_eq!(harness.backend.count(&BackendCall::CloseDevice), 1);
    assert_eq!(harness.backend.count(&BackendCall::CreateSurface), 0);
    assert!(harness.outcomes().is_empty());
    assert!(harness.session.is_finished());
    let id = harness.session.id();
    assert_eq!(
        harness.events.count(|n| *n == SessionNotification::Closed(id)),
        1
    );
}

#[test]
fn test_stop_during_configure_closes_late_capture_session() {
    let mut behavior = FakeBehavior::default();
    behavior.configure = ConfigureBehavior::Manual;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();
    assert_eq!(harness.session.state(), SessionState::Configuring);

    harness.session.stop().unwrap();
    assert_eq!(harness.backend.count(&BackendCall::CloseCaptureSession), 0);
    harness.backend.emit_configured();
    harness.pump();

    assert_eq!(harness.backend.count(&BackendCall::CloseCaptureSession), 1);
    assert_eq!(harness.backend.count(&BackendCall::SetRepeatingRequest), 0);
    assert!(harness.outcomes().is_empty());
}

#[test]
fn test_drop_tears_down_running_session() {
    let harness = running();
    let backend = harness.backend.clone();
    drop(harness);

    assert_eq!(backend.count(&BackendCall::CloseDevice), 1);
    assert!(!backend.is_listening());
}

// ─── Flash ──────────────────────────────────────────────────────────────────

#[test]
fn test_flash_while_running_reissues_request() {
    let mut harness = running();
    assert_eq!(harness.session.set_flash(true).unwrap(), FlashOutcome::Applied);

    assert_eq!(harness.backend.count(&BackendCall::SetRepeatingRequest), 2);
    assert_eq!(harness.backend.last_request().unwrap().flash_mode, FlashMode::Torch);
    assert!(harness.session.flash_enabled());
}

#[test]
fn test_flash_before_running_is_deferred() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Manual;
    let mut harness = SessionHarness::start(behavior, request());
    assert_eq!(harness.session.set_flash(true).unwrap(), FlashOutcome::Deferred);

    harness.backend.emit_opened();
    harness.pump();

    assert_eq!(harness.session.state(), SessionState::Running);
    assert_eq!(harness.backend.count(&BackendCall::SetRepeatingRequest), 1);
    assert_eq!(harness.backend.last_request().unwrap().flash_mode, FlashMode::Torch);
}

#[test]
fn test_flash_after_stop_is_ignored() {
    let mut harness = running();
    harness.session.stop().unwrap();
    assert_eq!(harness.session.set_flash(true).unwrap(), FlashOutcome::Ignored);
    assert_eq!(harness.backend.count(&BackendCall::SetRepeatingRequest), 1);
}

#[test]
fn test_flash_reissue_failure_is_a_runtime_error() {
    let mut harness = running();
    harness.backend.set_behavior(|b| b.fail_repeating_request = true);

    let result = harness.session.set_flash(true);
    assert!(matches!(result, Err(CameraError::CaptureStartFailed(_))));
    assert_eq!(harness.events.errors().len(), 1);
    assert_eq!(harness.session.state(), SessionState::Stopped);
    assert_eq!(harness.outcomes().len(), 1);
}

// ─── Still capture ──────────────────────────────────────────────────────────

#[test]
fn test_still_capture_delivers_image() {
    let mut harness = running();
    let (reply, mut rx) = oneshot::channel();
    harness
        .session
        .capture_still(StillCaptureOptions { jpeg_quality: Some(80) }, reply);
    harness.pump();

    let image = rx.try_recv().unwrap().unwrap();
    assert_eq!((image.width, image.height), (4032, 3024));
    assert_eq!(image.orientation, 90);
    assert!(!image.data.is_empty());

    let still_request = harness.backend.last_request().unwrap();
    assert_eq!(still_request.template, RequestTemplate::StillCapture);
    assert_eq!(still_request.targets, vec![SurfaceId(2)]);
    assert_eq!(still_request.jpeg_quality, Some(80));
}

#[test]
fn test_pending_still_fails_on_stop() {
    let mut behavior = FakeBehavior::default();
    behavior.auto_still = false;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    let (reply, mut rx) = oneshot::channel();
    harness
        .session
        .capture_still(StillCaptureOptions::default(), reply);
    harness.session.stop().unwrap();

    assert!(matches!(
        rx.try_recv().unwrap(),
        Err(CameraError::SessionStopped(_))
    ));
}

#[test]
fn test_still_capture_before_running_fails() {
    let mut behavior = FakeBehavior::default();
    behavior.open = OpenBehavior::Manual;
    let mut harness = SessionHarness::start(behavior, request());

    let (reply, mut rx) = oneshot::channel();
    harness
        .session
        .capture_still(StillCaptureOptions::default(), reply);
    assert!(matches!(
        rx.try_recv().unwrap(),
        Err(CameraError::StillCaptureError(_))
    ));
}

#[test]
fn test_still_output_disabled() {
    let options = SessionOptions {
        still_capture: false,
        ..SessionOptions::default()
    };
    let mut harness =
        SessionHarness::start_with_options(FakeBehavior::default(), request(), options);
    harness.pump();

    assert_eq!(
        harness.backend.count(&BackendCall::CreateCaptureSession(vec![SurfaceId(1)])),
        1
    );
    let (reply, mut rx) = oneshot::channel();
    harness
        .session
        .capture_still(StillCaptureOptions::default(), reply);
    assert!(matches!(
        rx.try_recv().unwrap(),
        Err(CameraError::StillCaptureError(_))
    ));
}

#[test]
fn test_still_output_failure_does_not_block_startup() {
    let mut behavior = FakeBehavior::default();
    behavior.fail_image_reader = true;
    let mut harness = SessionHarness::start(behavior, request());
    harness.pump();

    assert_eq!(harness.session.state(), SessionState::Running);
    assert_eq!(
        harness.backend.count(&BackendCall::CreateCaptureSession(vec![SurfaceId(1)])),
        1
    );
}

// ─── Thread confinement and contracts ───────────────────────────────────────

#[test]
#[cfg(debug_assertions)]
fn test_stop_from_another_thread_panics() {
    let harness = running();
    let result = std::thread::spawn(move || {
        let mut harness = harness;
        harness.session.stop()
    })
    .join();
    assert!(result.is_err());
}

#[test]
#[cfg(not(debug_assertions))]
fn test_stop_from_another_thread_is_refused() {
    let harness = running();
    let result = std::thread::spawn(move || {
        let mut harness = harness;
        let result = harness.session.stop();
        (result, harness.session.state())
    })
    .join()
    .unwrap();
    assert!(matches!(result.0, Err(CameraError::WrongThread(_))));
    assert_eq!(result.1, SessionState::Running);
}

#[test]
fn test_lifecycle_contracts_are_checked() {
    clear_invariant_log();

    let mut harness = running();
    harness.session.stop().unwrap();
    harness.pump();

    let mut behavior = FakeBehavior::default();
    behavior.configure = ConfigureBehavior::Fail;
    let mut failed = SessionHarness::start(behavior, request());
    failed.pump();

    contract_test(
        "session lifecycle",
        &[
            CAMERA_THREAD_CONFINEMENT,
            STOPPED_BEFORE_RELEASE,
            SINGLE_CREATION_OUTCOME,
        ],
    );
}
