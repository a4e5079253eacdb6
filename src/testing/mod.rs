//! Testing utilities for camera sessions
//!
//! A fake camera backend with a shared call log, synthetic capability
//! snapshots and frames, and a harness that drives a session on the test
//! thread.

pub mod fake_backend;
pub mod harness;
pub mod synthetic_data;

pub use fake_backend::{
    BackendCall, ConfigureBehavior, FakeBackend, FakeBehavior, FakeCameraDevice,
    FakeCameraManager, FakeCaptureSession, FakeSurface, FakeSurfaceTextureHelper, OpenBehavior,
};
pub use harness::{outcome_recorder, RecordingEvents, SessionHarness};
pub use synthetic_data::{front_capabilities, synthetic_capabilities, synthetic_frame};
