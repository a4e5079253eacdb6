//! Capture session lifecycle.
//!
//! A [`Camera2Session`] walks one device from open through a running
//! repeating request and back down. Sessions live on a [`CameraThread`];
//! callers hold a [`SessionHandle`].

pub mod backend;
pub mod camera2;
pub mod events;
pub mod format;
pub mod frame;
pub mod handle;
pub mod request;
pub mod state;
pub mod thread;

pub use backend::{
    CameraDevice, CameraEvent, CameraEventSender, CameraManager, CaptureFailure, CaptureSession,
    CaptureSessionEvent, DeviceEvent, OutputSurface, StillCaptureOptions, StillImage, SurfaceId,
    SurfaceInfo, SurfaceTextureHelper, SurfaceUsage,
};
pub use camera2::{Camera2Session, FlashOutcome, SessionHost, SessionOptions, SessionRequest};
pub use events::{
    CameraEvents, ChannelEvents, CreateOutcome, CreateSessionCallback, SessionNotification,
};
pub use frame::{Matrix, TextureBuffer, VideoFrame};
pub use handle::SessionHandle;
pub use request::{CaptureRequestConfig, RequestTemplate};
pub use state::{SessionId, SessionState};
pub use thread::{CameraCommand, CameraThread, ThreadChecker};
