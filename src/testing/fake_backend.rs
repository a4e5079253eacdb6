//! In-memory camera backend
//!
//! Every call is appended to a shared call log so tests can assert ordering.
//! Completions are posted back through the [`CameraEventSender`] the session
//! hands in, the same way a platform backend would deliver them.

use crate::errors::CameraError;
use crate::session::backend::{
    CameraDevice, CameraEvent, CameraEventSender, CameraManager, CaptureSession,
    CaptureSessionEvent, DeviceEvent, OutputSurface, StillImage, SurfaceId, SurfaceInfo,
    SurfaceTextureHelper, SurfaceUsage,
};
use crate::session::request::CaptureRequestConfig;
use crate::testing::synthetic_data::{synthetic_capabilities, synthetic_frame};
use crate::types::{CameraCapabilities, DeviceErrorCode, Size};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded backend interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Characteristics(String),
    OpenCamera(String),
    CreateImageReader { size: Size, max_images: u32 },
    SetTextureSize(Size),
    CreateSurface,
    CreateCaptureSession(Vec<SurfaceId>),
    SetRepeatingRequest,
    Capture,
    CloseCaptureSession,
    ReleaseSurface(SurfaceId),
    CloseDevice,
    StartListening,
    StopListening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Post `Opened` right away.
    Succeed,
    /// Post `Error(code)` instead of opening.
    Fail(DeviceErrorCode),
    /// Post `Disconnected` instead of opening.
    Disconnect,
    /// `open_camera` itself returns an error.
    Refuse,
    /// Post nothing; the test delivers the outcome.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureBehavior {
    Succeed,
    Fail,
    Refuse,
    Manual,
}

/// Knobs controlling how the fake answers.
#[derive(Debug, Clone)]
pub struct FakeBehavior {
    pub capabilities: Result<CameraCapabilities, CameraError>,
    pub open: OpenBehavior,
    pub configure: ConfigureBehavior,
    pub fail_repeating_request: bool,
    pub fail_image_reader: bool,
    pub fail_create_surface: bool,
    /// `close()` on the device posts `Closed`.
    pub emit_closed_on_close: bool,
    /// `capture()` posts a still image.
    pub auto_still: bool,
    pub display_rotation: u32,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            capabilities: Ok(synthetic_capabilities()),
            open: OpenBehavior::Succeed,
            configure: ConfigureBehavior::Succeed,
            fail_repeating_request: false,
            fail_image_reader: false,
            fail_create_surface: false,
            emit_closed_on_close: true,
            auto_still: true,
            display_rotation: 0,
        }
    }
}

#[derive(Default)]
struct Shared {
    calls: Vec<BackendCall>,
    requests: Vec<CaptureRequestConfig>,
    device_events: Option<CameraEventSender>,
    session_events: Option<CameraEventSender>,
    frame_listener: Option<CameraEventSender>,
    still_size: Option<Size>,
}

/// Handle to the fake backend. Clones share state.
#[derive(Clone)]
pub struct FakeBackend {
    behavior: Arc<Mutex<FakeBehavior>>,
    shared: Arc<Mutex<Shared>>,
    next_surface: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeBackend {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            shared: Arc::new(Mutex::new(Shared::default())),
            next_surface: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn manager(&self) -> Arc<FakeCameraManager> {
        Arc::new(FakeCameraManager {
            backend: self.clone(),
        })
    }

    pub fn texture_helper(&self) -> Box<FakeSurfaceTextureHelper> {
        Box::new(FakeSurfaceTextureHelper {
            backend: self.clone(),
            size: None,
        })
    }

    pub fn set_behavior(&self, update: impl FnOnce(&mut FakeBehavior)) {
        update(&mut lock(&self.behavior));
    }

    fn behavior(&self) -> FakeBehavior {
        lock(&self.behavior).clone()
    }

    fn record(&self, call: BackendCall) {
        lock(&self.shared).calls.push(call);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.shared).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.shared).calls.clear();
    }

    pub fn count(&self, call: &BackendCall) -> usize {
        lock(&self.shared).calls.iter().filter(|c| *c == call).count()
    }

    /// Repeating and still requests in submission order.
    pub fn requests(&self) -> Vec<CaptureRequestConfig> {
        lock(&self.shared).requests.clone()
    }

    pub fn last_request(&self) -> Option<CaptureRequestConfig> {
        lock(&self.shared).requests.last().cloned()
    }

    fn next_surface_id(&self) -> SurfaceId {
        SurfaceId(self.next_surface.fetch_add(1, Ordering::Relaxed))
    }

    /// Posts a device signal on the channel handed to `open_camera`.
    pub fn emit_device(&self, event: DeviceEvent) -> bool {
        let sender = lock(&self.shared).device_events.clone();
        match sender {
            Some(sender) => sender.send(CameraEvent::Device(event)),
            None => false,
        }
    }

    /// Delivers an `Opened` signal carrying a fresh fake device.
    pub fn emit_opened(&self) -> bool {
        let device = FakeCameraDevice {
            backend: self.clone(),
        };
        self.emit_device(DeviceEvent::Opened(Box::new(device)))
    }

    /// Delivers a `Configured` signal carrying a fresh fake capture session.
    pub fn emit_configured(&self) -> bool {
        let sender = lock(&self.shared).session_events.clone();
        match sender {
            Some(sender) => {
                let capture_session = FakeCaptureSession {
                    backend: self.clone(),
                };
                sender.send(CameraEvent::Session(CaptureSessionEvent::Configured(
                    Box::new(capture_session),
                )))
            }
            None => false,
        }
    }

    pub fn emit_configure_failed(&self) -> bool {
        let sender = lock(&self.shared).session_events.clone();
        sender
            .map(|s| s.send(CameraEvent::Session(CaptureSessionEvent::ConfigureFailed)))
            .unwrap_or(false)
    }

    /// Delivers a frame if a listener is attached. Returns false otherwise.
    pub fn emit_frame(&self, frame_number: u64) -> bool {
        let listener = lock(&self.shared).frame_listener.clone();
        match listener {
            Some(listener) => listener.send(CameraEvent::Frame(synthetic_frame(frame_number))),
            None => false,
        }
    }

    /// Delivers a frame on the device channel even with no listener, the way
    /// a frame already in flight at stop time arrives.
    pub fn emit_stray_frame(&self, frame_number: u64) -> bool {
        let sender = lock(&self.shared).device_events.clone();
        sender
            .map(|s| s.send(CameraEvent::Frame(synthetic_frame(frame_number))))
            .unwrap_or(false)
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.shared).frame_listener.is_some()
    }
}

pub struct FakeCameraManager {
    backend: FakeBackend,
}

impl CameraManager for FakeCameraManager {
    fn characteristics(&self, camera_id: &str) -> Result<CameraCapabilities, CameraError> {
        self.backend
            .record(BackendCall::Characteristics(camera_id.to_string()));
        self.backend.behavior().capabilities
    }

    fn open_camera(&self, camera_id: &str, events: CameraEventSender) -> Result<(), CameraError> {
        self.backend
            .record(BackendCall::OpenCamera(camera_id.to_string()));
        lock(&self.backend.shared).device_events = Some(events);

        match self.backend.behavior().open {
            OpenBehavior::Succeed => {
                self.backend.emit_opened();
            }
            OpenBehavior::Fail(code) => {
                self.backend.emit_device(DeviceEvent::Error(code));
            }
            OpenBehavior::Disconnect => {
                self.backend.emit_device(DeviceEvent::Disconnected);
            }
            OpenBehavior::Refuse => {
                return Err(CameraError::DeviceAccessError(format!(
                    "camera {} is not available",
                    camera_id
                )))
            }
            OpenBehavior::Manual => {}
        }
        Ok(())
    }

    fn create_image_reader(
        &self,
        size: Size,
        max_images: u32,
    ) -> Result<Box<dyn OutputSurface>, CameraError> {
        self.backend
            .record(BackendCall::CreateImageReader { size, max_images });
        if self.backend.behavior().fail_image_reader {
            return Err(CameraError::StillCaptureError(
                "image reader allocation failed".to_string(),
            ));
        }
        lock(&self.backend.shared).still_size = Some(size);
        Ok(Box::new(FakeSurface {
            backend: self.backend.clone(),
            info: SurfaceInfo {
                id: self.backend.next_surface_id(),
                size,
                usage: SurfaceUsage::StillCapture,
            },
            released: false,
        }))
    }

    fn display_rotation(&self) -> u32 {
        self.backend.behavior().display_rotation
    }
}

pub struct FakeCameraDevice {
    backend: FakeBackend,
}

impl CameraDevice for FakeCameraDevice {
    fn create_capture_session(
        &mut self,
        outputs: &[SurfaceInfo],
        events: CameraEventSender,
    ) -> Result<(), CameraError> {
        self.backend.record(BackendCall::CreateCaptureSession(
            outputs.iter().map(|o| o.id).collect(),
        ));
        lock(&self.backend.shared).session_events = Some(events);

        match self.backend.behavior().configure {
            ConfigureBehavior::Succeed => {
                self.backend.emit_configured();
            }
            ConfigureBehavior::Fail => {
                self.backend.emit_configure_failed();
            }
            ConfigureBehavior::Refuse => {
                return Err(CameraError::SessionConfigureFailed(
                    "outputs rejected".to_string(),
                ))
            }
            ConfigureBehavior::Manual => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        self.backend.record(BackendCall::CloseDevice);
        if self.backend.behavior().emit_closed_on_close {
            self.backend.emit_device(DeviceEvent::Closed);
        }
    }
}

pub struct FakeCaptureSession {
    backend: FakeBackend,
}

impl CaptureSession for FakeCaptureSession {
    fn set_repeating_request(&mut self, request: &CaptureRequestConfig) -> Result<(), CameraError> {
        self.backend.record(BackendCall::SetRepeatingRequest);
        if self.backend.behavior().fail_repeating_request {
            return Err(CameraError::CaptureStartFailed(
                "repeating request rejected".to_string(),
            ));
        }
        lock(&self.backend.shared).requests.push(request.clone());
        Ok(())
    }

    fn capture(&mut self, request: &CaptureRequestConfig) -> Result<(), CameraError> {
        self.backend.record(BackendCall::Capture);
        let (sender, size) = {
            let mut shared = lock(&self.backend.shared);
            shared.requests.push(request.clone());
            (shared.session_events.clone(), shared.still_size)
        };

        if self.backend.behavior().auto_still {
            let size = size.unwrap_or(Size::new(1920, 1080));
            let image = StillImage {
                width: size.width,
                height: size.height,
                orientation: request.jpeg_orientation.unwrap_or(0),
                data: Bytes::from_static(b"\xff\xd8fake-jpeg\xff\xd9"),
            };
            if let Some(sender) = sender {
                sender.send(CameraEvent::StillImage(Ok(image)));
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.backend.record(BackendCall::CloseCaptureSession);
    }
}

pub struct FakeSurfaceTextureHelper {
    backend: FakeBackend,
    size: Option<Size>,
}

impl SurfaceTextureHelper for FakeSurfaceTextureHelper {
    fn set_texture_size(&mut self, size: Size) {
        self.backend.record(BackendCall::SetTextureSize(size));
        self.size = Some(size);
    }

    fn create_surface(&mut self) -> Result<Box<dyn OutputSurface>, CameraError> {
        self.backend.record(BackendCall::CreateSurface);
        if self.backend.behavior().fail_create_surface {
            return Err(CameraError::SessionConfigureFailed(
                "surface allocation failed".to_string(),
            ));
        }
        Ok(Box::new(FakeSurface {
            backend: self.backend.clone(),
            info: SurfaceInfo {
                id: self.backend.next_surface_id(),
                size: self.size.unwrap_or(Size::new(0, 0)),
                usage: SurfaceUsage::Preview,
            },
            released: false,
        }))
    }

    fn start_listening(&mut self, events: CameraEventSender) {
        self.backend.record(BackendCall::StartListening);
        lock(&self.backend.shared).frame_listener = Some(events);
    }

    fn stop_listening(&mut self) {
        self.backend.record(BackendCall::StopListening);
        lock(&self.backend.shared).frame_listener = None;
    }
}

pub struct FakeSurface {
    backend: FakeBackend,
    info: SurfaceInfo,
    released: bool,
}

impl OutputSurface for FakeSurface {
    fn info(&self) -> SurfaceInfo {
        self.info
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.backend.record(BackendCall::ReleaseSurface(self.info.id));
        }
    }
}
