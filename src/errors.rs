use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("No supported capture formats: {0}")]
    NoSupportedFormat(String),
    #[error("Camera access error: {0}")]
    DeviceAccessError(String),
    #[error("Failed to configure capture session: {0}")]
    SessionConfigureFailed(String),
    #[error("Failed to start capture request: {0}")]
    CaptureStartFailed(String),
    #[error("Camera disconnected: {0}")]
    Disconnected(String),
    #[error("Wrong thread: {0} must run on the camera thread")]
    WrongThread(String),
    #[error("Session stopped: {0}")]
    SessionStopped(String),
    #[error("Still capture error: {0}")]
    StillCaptureError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Camera thread unavailable: {0}")]
    ThreadUnavailable(String),
}

/// Fieldless discriminant of [`CameraError`], reported to creation callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NoSupportedFormat,
    DeviceAccessError,
    SessionConfigureFailed,
    CaptureStartFailed,
    Disconnected,
    WrongThread,
    SessionStopped,
    StillCaptureError,
    ConfigError,
    ThreadUnavailable,
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::NoSupportedFormat(_) => ErrorKind::NoSupportedFormat,
            CameraError::DeviceAccessError(_) => ErrorKind::DeviceAccessError,
            CameraError::SessionConfigureFailed(_) => ErrorKind::SessionConfigureFailed,
            CameraError::CaptureStartFailed(_) => ErrorKind::CaptureStartFailed,
            CameraError::Disconnected(_) => ErrorKind::Disconnected,
            CameraError::WrongThread(_) => ErrorKind::WrongThread,
            CameraError::SessionStopped(_) => ErrorKind::SessionStopped,
            CameraError::StillCaptureError(_) => ErrorKind::StillCaptureError,
            CameraError::ConfigError(_) => ErrorKind::ConfigError,
            CameraError::ThreadUnavailable(_) => ErrorKind::ThreadUnavailable,
        }
    }

    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::NoSupportedFormat => CameraError::NoSupportedFormat(message),
            ErrorKind::DeviceAccessError => CameraError::DeviceAccessError(message),
            ErrorKind::SessionConfigureFailed => CameraError::SessionConfigureFailed(message),
            ErrorKind::CaptureStartFailed => CameraError::CaptureStartFailed(message),
            ErrorKind::Disconnected => CameraError::Disconnected(message),
            ErrorKind::WrongThread => CameraError::WrongThread(message),
            ErrorKind::SessionStopped => CameraError::SessionStopped(message),
            ErrorKind::StillCaptureError => CameraError::StillCaptureError(message),
            ErrorKind::ConfigError => CameraError::ConfigError(message),
            ErrorKind::ThreadUnavailable => CameraError::ThreadUnavailable(message),
        }
    }

    /// The payload without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CameraError::NoSupportedFormat(msg)
            | CameraError::DeviceAccessError(msg)
            | CameraError::SessionConfigureFailed(msg)
            | CameraError::CaptureStartFailed(msg)
            | CameraError::Disconnected(msg)
            | CameraError::WrongThread(msg)
            | CameraError::SessionStopped(msg)
            | CameraError::StillCaptureError(msg)
            | CameraError::ConfigError(msg)
            | CameraError::ThreadUnavailable(msg) => msg,
        }
    }
}
