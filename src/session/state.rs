use crate::session::backend::{CameraDevice, CaptureSession, OutputSurface, SurfaceInfo};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable session state. Moves forward only, except for the jump to
/// `Stopped`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SessionState {
    Created,
    Opening,
    DeviceOpen,
    Configuring,
    Running,
    Stopped,
}

/// Surfaces handed to the capture session.
pub(crate) struct Outputs {
    pub preview: Box<dyn OutputSurface>,
    pub still: Option<Box<dyn OutputSurface>>,
}

impl Outputs {
    pub fn infos(&self) -> Vec<SurfaceInfo> {
        let mut infos = vec![self.preview.info()];
        if let Some(still) = &self.still {
            infos.push(still.info());
        }
        infos
    }

    pub fn release(mut self) {
        self.preview.release();
        if let Some(still) = self.still.as_mut() {
            still.release();
        }
    }
}

/// Resources owned in each state. A slot only exists in the states where
/// the matching handle can be held.
pub(crate) enum Phase {
    Created,
    Opening,
    DeviceOpen {
        device: Box<dyn CameraDevice>,
    },
    Configuring {
        device: Box<dyn CameraDevice>,
        outputs: Outputs,
        /// Held between `configured` and a successful repeating request.
        capture_session: Option<Box<dyn CaptureSession>>,
    },
    Running {
        device: Box<dyn CameraDevice>,
        outputs: Outputs,
        capture_session: Box<dyn CaptureSession>,
    },
    Stopped,
}

impl Phase {
    pub fn state(&self) -> SessionState {
        match self {
            Phase::Created => SessionState::Created,
            Phase::Opening => SessionState::Opening,
            Phase::DeviceOpen { .. } => SessionState::DeviceOpen,
            Phase::Configuring { .. } => SessionState::Configuring,
            Phase::Running { .. } => SessionState::Running,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    /// Releases everything the phase owns: capture session, then output
    /// surfaces, then the device. Returns whether a device was closed.
    pub fn release(self) -> bool {
        let (device, outputs, capture_session) = match self {
            Phase::Created | Phase::Opening | Phase::Stopped => (None, None, None),
            Phase::DeviceOpen { device } => (Some(device), None, None),
            Phase::Configuring {
                device,
                outputs,
                capture_session,
            } => (Some(device), Some(outputs), capture_session),
            Phase::Running {
                device,
                outputs,
                capture_session,
            } => (Some(device), Some(outputs), Some(capture_session)),
        };

        if let Some(mut capture_session) = capture_session {
            capture_session.close();
        }
        if let Some(outputs) = outputs {
            outputs.release();
        }
        match device {
            Some(mut device) => {
                device.close();
                true
            }
            None => false,
        }
    }
}
