//! Interfaces to the platform camera subsystem.
//!
//! Every completion from the platform comes back as a [`CameraEvent`] posted
//! through a [`CameraEventSender`], so the session sees one ordered stream of
//! tagged events on its camera thread.

use crate::errors::CameraError;
use crate::session::frame::VideoFrame;
use crate::session::request::CaptureRequestConfig;
use crate::session::state::SessionId;
use crate::session::thread::CameraCommand;
use crate::types::{CameraCapabilities, DeviceErrorCode, Size};
use bytes::Bytes;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SurfaceUsage {
    Preview,
    StillCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurfaceInfo {
    pub id: SurfaceId,
    pub size: Size,
    pub usage: SurfaceUsage,
}

/// A capture output owned by the session until teardown releases it.
pub trait OutputSurface: Send {
    fn info(&self) -> SurfaceInfo;
    fn release(&mut self);
}

/// Entry point to the camera service.
pub trait CameraManager: Send + Sync {
    fn characteristics(&self, camera_id: &str) -> Result<CameraCapabilities, CameraError>;

    /// Starts opening the device. The outcome arrives as a [`DeviceEvent`].
    fn open_camera(&self, camera_id: &str, events: CameraEventSender) -> Result<(), CameraError>;

    /// Allocates a still-capture output of `size` holding up to `max_images`.
    fn create_image_reader(
        &self,
        size: Size,
        max_images: u32,
    ) -> Result<Box<dyn OutputSurface>, CameraError>;

    /// Current display rotation in degrees (0, 90, 180 or 270).
    fn display_rotation(&self) -> u32;
}

/// An opened camera device.
pub trait CameraDevice: Send {
    /// Starts configuring a capture session over `outputs`. The outcome
    /// arrives as a [`CaptureSessionEvent`].
    fn create_capture_session(
        &mut self,
        outputs: &[SurfaceInfo],
        events: CameraEventSender,
    ) -> Result<(), CameraError>;

    /// Platform answers with [`DeviceEvent::Closed`] once the device is free.
    fn close(&mut self);
}

/// A configured capture session.
pub trait CaptureSession: Send {
    /// Replaces the repeating request. Per-frame failures arrive as
    /// [`CameraEvent::CaptureFailed`].
    fn set_repeating_request(&mut self, request: &CaptureRequestConfig) -> Result<(), CameraError>;

    /// Submits a single still capture. The image arrives as
    /// [`CameraEvent::StillImage`].
    fn capture(&mut self, request: &CaptureRequestConfig) -> Result<(), CameraError>;

    fn close(&mut self);
}

/// Texture-backed frame source feeding the preview surface.
pub trait SurfaceTextureHelper: Send {
    fn set_texture_size(&mut self, size: Size);
    fn create_surface(&mut self) -> Result<Box<dyn OutputSurface>, CameraError>;
    /// Frames arrive as [`CameraEvent::Frame`] until `stop_listening`.
    fn start_listening(&mut self, events: CameraEventSender);
    fn stop_listening(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureFailure {
    pub frame_number: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub width: u32,
    pub height: u32,
    pub orientation: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StillCaptureOptions {
    /// Overrides the configured JPEG quality.
    pub jpeg_quality: Option<u8>,
}

pub enum DeviceEvent {
    Opened(Box<dyn CameraDevice>),
    Closed,
    Disconnected,
    Error(DeviceErrorCode),
}

pub enum CaptureSessionEvent {
    Configured(Box<dyn CaptureSession>),
    ConfigureFailed,
}

/// Inbound signal for one session.
pub enum CameraEvent {
    Device(DeviceEvent),
    Session(CaptureSessionEvent),
    Frame(VideoFrame),
    CaptureFailed(CaptureFailure),
    StillImage(Result<StillImage, String>),
}

impl fmt::Debug for CameraEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraEvent::Device(DeviceEvent::Opened(_)) => write!(f, "Device(Opened)"),
            CameraEvent::Device(DeviceEvent::Closed) => write!(f, "Device(Closed)"),
            CameraEvent::Device(DeviceEvent::Disconnected) => write!(f, "Device(Disconnected)"),
            CameraEvent::Device(DeviceEvent::Error(code)) => write!(f, "Device(Error({:?}))", code),
            CameraEvent::Session(CaptureSessionEvent::Configured(_)) => {
                write!(f, "Session(Configured)")
            }
            CameraEvent::Session(CaptureSessionEvent::ConfigureFailed) => {
                write!(f, "Session(ConfigureFailed)")
            }
            CameraEvent::Frame(frame) => write!(f, "Frame({})", frame.timestamp_ns),
            CameraEvent::CaptureFailed(failure) => write!(f, "CaptureFailed({:?})", failure),
            CameraEvent::StillImage(Ok(_)) => write!(f, "StillImage(Ok)"),
            CameraEvent::StillImage(Err(e)) => write!(f, "StillImage(Err({}))", e),
        }
    }
}

/// Posts events for one session onto the camera thread queue.
#[derive(Clone)]
pub struct CameraEventSender {
    session: SessionId,
    tx: Sender<CameraCommand>,
}

impl CameraEventSender {
    pub fn new(session: SessionId, tx: Sender<CameraCommand>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns false once the camera thread is gone.
    pub fn send(&self, event: CameraEvent) -> bool {
        self.tx
            .send(CameraCommand::Event {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

impl fmt::Debug for CameraEventSender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CameraEventSender")
            .field("session", &self.session)
            .finish()
    }
}
