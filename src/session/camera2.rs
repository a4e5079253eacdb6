//! Camera capture session state machine
//!
//! # Spell: Camera2Session
//! ^ Intent: drive one device from open to a running repeating request and
//!   back down, reporting exactly one terminal outcome
//!
//! @Camera2Session
//!   : (request, options, host, callback) -> Camera2Session
//!   ! every_event_handled_on_the_camera_thread
//!   ! stopped_before_release
//!   ! teardown_runs_once
//!   ! one_terminal_outcome
//!   ! late_completions_are_discarded
//!   - locks
//!   - blocking_calls

use crate::assert_invariant;
use crate::errors::{CameraError, ErrorKind};
use crate::invariant_ppt::{SINGLE_CREATION_OUTCOME, STOPPED_BEFORE_RELEASE};
use crate::session::backend::{
    CameraDevice, CameraEvent, CameraEventSender, CameraManager, CaptureFailure, CaptureSession,
    CaptureSessionEvent, DeviceEvent, OutputSurface, StillCaptureOptions, StillImage,
    SurfaceTextureHelper,
};
use crate::session::events::{CameraEvents, CreateSessionCallback};
use crate::session::format;
use crate::session::frame::{self, VideoFrame};
use crate::session::request::CaptureRequestConfig;
use crate::session::state::{Outputs, Phase, SessionId, SessionState};
use crate::session::thread::ThreadChecker;
use crate::timing::{duration_ms, SessionStats, SessionTimer};
use crate::types::{CameraCapabilities, CaptureFormat, DeviceErrorCode, Size};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Caller-requested capture parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub camera_id: String,
    pub width: u32,
    pub height: u32,
    /// Whole frames per second.
    pub framerate: u32,
}

impl SessionRequest {
    pub fn new(camera_id: impl Into<String>, width: u32, height: u32, framerate: u32) -> Self {
        Self {
            camera_id: camera_id.into(),
            width,
            height,
            framerate,
        }
    }
}

/// Per-session knobs taken from [`crate::config::CameraSessionConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub still_capture: bool,
    pub still_max_images: u32,
    pub still_fallback_size: Size,
    pub jpeg_quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            still_capture: true,
            still_max_images: 2,
            still_fallback_size: Size::new(1920, 1080),
            jpeg_quality: 95,
        }
    }
}

/// Collaborators a session talks to. The event sink and the manager are
/// shared with the caller; the texture helper belongs to the session.
pub struct SessionHost {
    pub manager: Arc<dyn CameraManager>,
    pub texture_helper: Box<dyn SurfaceTextureHelper>,
    pub events: Arc<dyn CameraEvents>,
    pub sender: CameraEventSender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlashOutcome {
    /// Repeating request rebuilt and reissued.
    Applied,
    /// Stored; the first repeating request will use it.
    Deferred,
    /// Session already stopped.
    Ignored,
}

pub type StillReply = oneshot::Sender<Result<StillImage, CameraError>>;

pub struct Camera2Session {
    id: SessionId,
    confinement: ThreadChecker,
    callback: Option<Box<dyn CreateSessionCallback>>,
    events: Arc<dyn CameraEvents>,
    manager: Arc<dyn CameraManager>,
    texture_helper: Box<dyn SurfaceTextureHelper>,
    sender: CameraEventSender,
    request: SessionRequest,
    options: SessionOptions,

    // Initialized at start
    capabilities: Option<CameraCapabilities>,
    camera_orientation: u32,
    is_front_facing: bool,
    fps_unit_factor: i32,
    capture_format: Option<CaptureFormat>,

    phase: Phase,
    flash_enabled: bool,
    first_frame_reported: bool,
    open_pending: bool,
    awaiting_device_close: bool,
    pending_stills: VecDeque<StillReply>,

    timer: SessionTimer,
    stats: SessionStats,
}

impl Camera2Session {
    /// Builds the session on the current thread, which becomes its camera
    /// thread, and starts opening the device.
    pub fn create(
        request: SessionRequest,
        options: SessionOptions,
        host: SessionHost,
        callback: Box<dyn CreateSessionCallback>,
    ) -> Self {
        log::debug!("Create new camera2 session on camera {}", request.camera_id);

        let mut session = Self {
            id: host.sender.session(),
            confinement: ThreadChecker::current(),
            callback: Some(callback),
            events: host.events,
            manager: host.manager,
            texture_helper: host.texture_helper,
            sender: host.sender,
            request,
            options,
            capabilities: None,
            camera_orientation: 0,
            is_front_facing: false,
            fps_unit_factor: 1000,
            capture_format: None,
            phase: Phase::Created,
            flash_enabled: false,
            first_frame_reported: false,
            open_pending: false,
            awaiting_device_close: false,
            pending_stills: VecDeque::new(),
            timer: SessionTimer::start(),
            stats: SessionStats::new(),
        };
        session.start();
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn camera_id(&self) -> &str {
        &self.request.camera_id
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    pub fn capture_format(&self) -> Option<CaptureFormat> {
        self.capture_format
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_enabled
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Stopped, with no open completion or device close still outstanding.
    pub fn is_finished(&self) -> bool {
        self.state() == SessionState::Stopped && !self.open_pending && !self.awaiting_device_close
    }

    /// Rotation reported with each frame and embedded in still captures.
    pub fn frame_orientation(&self) -> u32 {
        frame::frame_orientation(
            self.camera_orientation,
            self.is_front_facing,
            self.manager.display_rotation(),
        )
    }

    fn start(&mut self) {
        if self.confinement.check("Camera2Session::start").is_err() {
            return;
        }
        log::debug!("start");

        let capabilities = match self.manager.characteristics(&self.request.camera_id) {
            Ok(capabilities) => capabilities,
            Err(e) => {
                self.report_error(CameraError::DeviceAccessError(format!(
                    "Failed to read camera characteristics: {}",
                    e.message()
                )));
                return;
            }
        };
        self.camera_orientation = capabilities.sensor_orientation;
        self.is_front_facing = capabilities.is_front_facing();
        self.fps_unit_factor = format::fps_unit_factor(&capabilities.fps_ranges);

        let negotiated = format::negotiate(
            &capabilities,
            self.request.width,
            self.request.height,
            self.request.framerate,
        );
        self.capabilities = Some(capabilities);
        match negotiated {
            Ok(capture_format) => {
                log::debug!("Using capture format: {}", capture_format);
                self.capture_format = Some(capture_format);
            }
            Err(e) => {
                self.report_error(e);
                return;
            }
        }

        self.open_camera();
    }

    fn open_camera(&mut self) {
        log::debug!("Opening camera {}", self.request.camera_id);
        self.phase = Phase::Opening;
        self.events.on_camera_opening();

        match self
            .manager
            .open_camera(&self.request.camera_id, self.sender.clone())
        {
            Ok(()) => self.open_pending = true,
            Err(e) => self.report_error(CameraError::DeviceAccessError(format!(
                "Failed to open camera: {}",
                e.message()
            ))),
        }
    }

    /// Dispatch one inbound event.
    pub fn handle_event(&mut self, event: CameraEvent) {
        if self
            .confinement
            .check("Camera2Session::handle_event")
            .is_err()
        {
            return;
        }
        match event {
            CameraEvent::Device(DeviceEvent::Opened(device)) => self.on_opened(device),
            CameraEvent::Device(DeviceEvent::Closed) => self.on_closed(),
            CameraEvent::Device(DeviceEvent::Disconnected) => self.on_disconnected(),
            CameraEvent::Device(DeviceEvent::Error(code)) => self.on_device_error(code),
            CameraEvent::Session(CaptureSessionEvent::Configured(capture_session)) => {
                self.on_configured(capture_session)
            }
            CameraEvent::Session(CaptureSessionEvent::ConfigureFailed) => {
                self.on_configure_failed()
            }
            CameraEvent::Frame(frame) => self.on_frame(frame),
            CameraEvent::CaptureFailed(failure) => self.on_capture_failed(failure),
            CameraEvent::StillImage(result) => self.on_still_image(result),
        }
    }

    fn on_opened(&mut self, mut device: Box<dyn CameraDevice>) {
        self.open_pending = false;
        if self.state() != SessionState::Opening {
            log::debug!("Camera opened in state {:?}; closing it.", self.state());
            device.close();
            self.awaiting_device_close = true;
            return;
        }

        log::debug!("Camera opened.");
        self.phase = Phase::DeviceOpen { device };

        let outputs = match self.create_outputs() {
            Ok(outputs) => outputs,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };
        let surfaces = outputs.infos();

        self.phase = match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::DeviceOpen { device } => Phase::Configuring {
                device,
                outputs,
                capture_session: None,
            },
            other => {
                outputs.release();
                other
            }
        };

        let sender = self.sender.clone();
        let result = match &mut self.phase {
            Phase::Configuring { device, .. } => device.create_capture_session(&surfaces, sender),
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.report_error(CameraError::SessionConfigureFailed(format!(
                "Failed to create capture session. {}",
                e.message()
            )));
        }
    }

    fn create_outputs(&mut self) -> Result<Outputs, CameraError> {
        let capture_format = self.capture_format.ok_or_else(|| {
            CameraError::SessionConfigureFailed("capture format was not negotiated".to_string())
        })?;

        self.texture_helper.set_texture_size(capture_format.size());
        let preview = self.texture_helper.create_surface().map_err(|e| {
            CameraError::SessionConfigureFailed(format!(
                "Failed to create preview surface: {}",
                e.message()
            ))
        })?;

        Ok(Outputs {
            preview,
            still: self.create_still_output(),
        })
    }

    fn create_still_output(&self) -> Option<Box<dyn OutputSurface>> {
        if !self.options.still_capture {
            return None;
        }
        let sizes = self
            .capabilities
            .as_ref()
            .and_then(|c| c.still_capture_sizes.as_deref());
        let Some(size) = format::largest_still_size(sizes, self.options.still_fallback_size) else {
            log::error!("Still capture output failed to init: no still sizes");
            return None;
        };

        match self
            .manager
            .create_image_reader(size, self.options.still_max_images)
        {
            Ok(reader) => {
                log::debug!("Add still capture output {} to capture session.", size);
                Some(reader)
            }
            Err(e) => {
                log::error!("Still capture output failed to init: {}", e);
                None
            }
        }
    }

    fn on_configured(&mut self, mut capture_session: Box<dyn CaptureSession>) {
        let state = self.state();
        let Phase::Configuring {
            capture_session: slot,
            ..
        } = &mut self.phase
        else {
            log::debug!(
                "Capture session configured in state {:?}; closing it.",
                state
            );
            capture_session.close();
            return;
        };

        log::debug!("Camera capture session configured.");
        if let Some(mut previous) = slot.replace(capture_session) {
            previous.close();
        }
        self.start_capture();
    }

    fn start_capture(&mut self) {
        let request = match self.build_repeating_request() {
            Ok(request) => request,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };

        let result = match &mut self.phase {
            Phase::Configuring {
                capture_session: Some(capture_session),
                ..
            } => capture_session.set_repeating_request(&request),
            _ => return,
        };
        if let Err(e) = result {
            self.report_error(CameraError::CaptureStartFailed(format!(
                "Failed to start capture request. {}",
                e.message()
            )));
            return;
        }

        self.phase = match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Configuring {
                device,
                outputs,
                capture_session: Some(capture_session),
            } => Phase::Running {
                device,
                outputs,
                capture_session,
            },
            other => other,
        };
        self.texture_helper.start_listening(self.sender.clone());

        log::debug!("Camera device successfully started.");
        if let Some(callback) = self.callback.take() {
            callback.on_done(self.id);
        }
    }

    fn build_repeating_request(&self) -> Result<CaptureRequestConfig, CameraError> {
        let (Some(capabilities), Some(capture_format)) =
            (&self.capabilities, &self.capture_format)
        else {
            return Err(CameraError::CaptureStartFailed(
                "capture format was not negotiated".to_string(),
            ));
        };
        let target = match &self.phase {
            Phase::Configuring { outputs, .. } | Phase::Running { outputs, .. } => {
                outputs.preview.info().id
            }
            _ => {
                return Err(CameraError::CaptureStartFailed(
                    "no preview surface".to_string(),
                ))
            }
        };
        Ok(CaptureRequestConfig::repeating(
            capabilities,
            capture_format,
            self.fps_unit_factor,
            self.flash_enabled,
            target,
        ))
    }

    fn on_configure_failed(&mut self) {
        self.report_error(CameraError::SessionConfigureFailed(
            "Failed to configure capture session.".to_string(),
        ));
    }

    fn on_frame(&mut self, frame: VideoFrame) {
        if self.state() != SessionState::Running {
            log::debug!("Texture frame captured but camera is no longer running.");
            self.stats.frames_dropped += 1;
            return;
        }

        if !self.first_frame_reported {
            self.first_frame_reported = true;
            let start_time_ms = duration_ms(self.timer.elapsed());
            self.stats.start_latency_ms = Some(start_time_ms);
            log::info!("Camera2 start time: {} ms", start_time_ms);
        }

        // Undo the preview mirror for front cameras, and undo the sensor
        // mounting rotation: it is reported as frame rotation instead.
        let buffer = frame::create_texture_buffer_with_modified_transform_matrix(
            &frame.buffer,
            self.is_front_facing,
            -(self.camera_orientation as i32),
        );
        let modified = VideoFrame {
            buffer,
            rotation: self.frame_orientation(),
            timestamp_ns: frame.timestamp_ns,
        };
        self.events.on_frame_captured(self.id, &modified);
        self.stats.frames_delivered += 1;
    }

    fn on_capture_failed(&mut self, failure: CaptureFailure) {
        self.stats.capture_failures += 1;
        log::debug!("Capture failed: {:?}", failure);
    }

    fn on_still_image(&mut self, result: Result<StillImage, String>) {
        match self.pending_stills.pop_front() {
            Some(reply) => {
                let result = result.map_err(CameraError::StillCaptureError);
                if reply.send(result).is_err() {
                    log::debug!("Still capture requester went away");
                }
            }
            None => log::debug!("Still image arrived with no pending request"),
        }
    }

    fn on_device_error(&mut self, code: DeviceErrorCode) {
        self.open_pending = false;
        self.report_error(CameraError::DeviceAccessError(code.description()));
    }

    fn on_disconnected(&mut self) {
        self.open_pending = false;
        if self.state() == SessionState::Stopped {
            log::debug!("Camera disconnected after stop.");
            return;
        }
        let start_failure = self.is_start_failure();
        self.stop_internal();
        if start_failure {
            self.report_creation_failure(
                ErrorKind::Disconnected,
                "Camera disconnected / evicted.".to_string(),
            );
        } else {
            self.events.on_camera_disconnected(self.id);
        }
    }

    fn on_closed(&mut self) {
        if self.state() != SessionState::Stopped {
            log::warn!("Camera device closed in state {:?}.", self.state());
            self.report_error(CameraError::DeviceAccessError(
                "Camera device closed unexpectedly.".to_string(),
            ));
        }
        log::debug!("Camera device closed.");
        self.awaiting_device_close = false;
        self.events.on_camera_closed(self.id);
    }

    /// Toggle the torch. While running the repeating request is rebuilt and
    /// reissued on the existing capture session.
    pub fn set_flash(&mut self, enabled: bool) -> Result<FlashOutcome, CameraError> {
        self.confinement.check("Camera2Session::set_flash")?;

        match self.state() {
            SessionState::Stopped => {
                log::debug!("Flash toggle ignored: session stopped.");
                Ok(FlashOutcome::Ignored)
            }
            SessionState::Running => {
                self.flash_enabled = enabled;
                let request = self.build_repeating_request()?;
                let result = match &mut self.phase {
                    Phase::Running {
                        capture_session, ..
                    } => capture_session.set_repeating_request(&request),
                    _ => Ok(()),
                };
                match result {
                    Ok(()) => Ok(FlashOutcome::Applied),
                    Err(e) => {
                        let error = CameraError::CaptureStartFailed(format!(
                            "Failed to start capture request. {}",
                            e.message()
                        ));
                        self.report_error(error.clone());
                        Err(error)
                    }
                }
            }
            _ => {
                self.flash_enabled = enabled;
                Ok(FlashOutcome::Deferred)
            }
        }
    }

    /// Submit a still capture. `reply` resolves when the image arrives, or
    /// with an error if the request is refused or the session stops first.
    pub fn capture_still(&mut self, options: StillCaptureOptions, reply: StillReply) {
        if let Err(e) = self.confinement.check("Camera2Session::capture_still") {
            let _ = reply.send(Err(e));
            return;
        }

        let orientation = self.frame_orientation();
        let jpeg_quality = options.jpeg_quality.unwrap_or(self.options.jpeg_quality);
        let flash_enabled = self.flash_enabled;

        let result = match &mut self.phase {
            Phase::Running {
                outputs,
                capture_session,
                ..
            } => match &outputs.still {
                Some(still) => {
                    let request = CaptureRequestConfig::still(
                        flash_enabled,
                        orientation,
                        jpeg_quality,
                        still.info().id,
                    );
                    capture_session.capture(&request).map_err(|e| {
                        CameraError::StillCaptureError(format!(
                            "Capture photo failed: {}",
                            e.message()
                        ))
                    })
                }
                None => Err(CameraError::StillCaptureError(
                    "no still capture output".to_string(),
                )),
            },
            Phase::Stopped => Err(CameraError::SessionStopped(
                "still capture requested after stop".to_string(),
            )),
            _ => Err(CameraError::StillCaptureError(
                "session is not running".to_string(),
            )),
        };

        match result {
            Ok(()) => self.pending_stills.push_back(reply),
            Err(e) => {
                log::error!("Capture photo failed: {}", e);
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Caller-initiated teardown. Reports nothing; idempotent.
    pub fn stop(&mut self) -> Result<(), CameraError> {
        log::debug!("Stop camera2 session on camera {}", self.request.camera_id);
        self.confinement.check("Camera2Session::stop")?;

        if self.state() != SessionState::Stopped {
            let stop_start = Instant::now();
            if self.callback.take().is_some() {
                log::debug!("Session stopped before creation completed.");
            }
            self.stop_internal();
            let stop_time_ms = duration_ms(stop_start.elapsed());
            self.stats.stop_duration_ms = Some(stop_time_ms);
            log::debug!("Camera2 stop time: {} ms", stop_time_ms);
        }
        Ok(())
    }

    /// No repeating request has been accepted yet and the session is live.
    fn is_start_failure(&self) -> bool {
        !matches!(self.state(), SessionState::Running | SessionState::Stopped)
    }

    fn report_error(&mut self, error: CameraError) {
        if self.confinement.check("Camera2Session::report_error").is_err() {
            return;
        }
        if self.state() == SessionState::Stopped {
            log::debug!("Error after stop ignored: {}", error);
            return;
        }
        log::error!("Error: {}", error);

        let start_failure = self.is_start_failure();
        self.stop_internal();
        if start_failure {
            self.report_creation_failure(error.kind(), error.message().to_string());
        } else {
            self.events.on_camera_error(self.id, error.message());
        }
    }

    fn report_creation_failure(&mut self, kind: ErrorKind, message: String) {
        let callback = self.callback.take();
        assert_invariant!(
            callback.is_some(),
            SINGLE_CREATION_OUTCOME,
            "Camera2Session::report_creation_failure"
        );
        if let Some(callback) = callback {
            callback.on_failure(kind, message);
        }
    }

    fn stop_internal(&mut self) {
        log::debug!("Stop internal");
        let phase = std::mem::replace(&mut self.phase, Phase::Stopped);
        assert_invariant!(
            self.state() == SessionState::Stopped,
            STOPPED_BEFORE_RELEASE,
            "Camera2Session::stop_internal"
        );

        self.texture_helper.stop_listening();
        if phase.release() {
            self.awaiting_device_close = true;
        }
        for reply in self.pending_stills.drain(..) {
            let _ = reply.send(Err(CameraError::SessionStopped(
                "session stopped before the still image arrived".to_string(),
            )));
        }
        log::debug!("Stop done");
    }
}

impl Drop for Camera2Session {
    fn drop(&mut self) {
        if self.state() != SessionState::Stopped {
            log::warn!(
                "Session {} dropped while {:?}; tearing down",
                self.id,
                self.state()
            );
            self.stop_internal();
        }
    }
}
