//! Core value types shared by the negotiator, the request builder and the
//! session state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frame-rate range.
///
/// Inside a [`CaptureFormat`] the bounds are normalized to frames per
/// second multiplied by 1000. Ranges reported by a device in
/// [`CameraCapabilities::fps_ranges`] are in the device's native unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FramerateRange {
    pub min: i32,
    pub max: i32,
}

impl FramerateRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn span(&self) -> i64 {
        (self.max as i64 - self.min as i64).abs()
    }
}

impl fmt::Display for FramerateRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}:{}]", self.min as f32 / 1000.0, self.max as f32 / 1000.0)
    }
}

/// Resolved capture format. Computed once per session, before device open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: FramerateRange,
}

impl CaptureFormat {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.framerate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LensFacing {
    Front,
    Back,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpticalStabilizationMode {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoStabilizationMode {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfMode {
    Off,
    Auto,
    Macro,
    ContinuousVideo,
    ContinuousPicture,
    Edof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeMode {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    Single,
    Torch,
}

/// Device capability snapshot, read once at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    /// Supported preview/record output sizes.
    pub sizes: Vec<Size>,
    /// Auto-exposure target fps ranges in the device's native unit.
    pub fps_ranges: Vec<FramerateRange>,
    /// Fixed sensor mounting orientation in degrees.
    pub sensor_orientation: u32,
    pub lens_facing: LensFacing,
    #[serde(default)]
    pub optical_stabilization_modes: Vec<OpticalStabilizationMode>,
    #[serde(default)]
    pub video_stabilization_modes: Vec<VideoStabilizationMode>,
    #[serde(default)]
    pub af_modes: Vec<AfMode>,
    /// Still-capture (JPEG) output sizes. `None` when the device exposes no
    /// stream configuration for still capture.
    #[serde(default)]
    pub still_capture_sizes: Option<Vec<Size>>,
}

impl CameraCapabilities {
    pub fn is_front_facing(&self) -> bool {
        self.lens_facing == LensFacing::Front
    }
}

/// Error codes carried by a device `errored` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceErrorCode {
    CameraInUse,
    MaxCamerasInUse,
    CameraDisabled,
    CameraDevice,
    CameraService,
    Unknown(i32),
}

impl From<i32> for DeviceErrorCode {
    fn from(code: i32) -> Self {
        match code {
            1 => DeviceErrorCode::CameraInUse,
            2 => DeviceErrorCode::MaxCamerasInUse,
            3 => DeviceErrorCode::CameraDisabled,
            4 => DeviceErrorCode::CameraDevice,
            5 => DeviceErrorCode::CameraService,
            other => DeviceErrorCode::Unknown(other),
        }
    }
}

impl DeviceErrorCode {
    pub fn description(&self) -> String {
        match self {
            DeviceErrorCode::CameraDevice => "Camera device has encountered a fatal error.".into(),
            DeviceErrorCode::CameraDisabled => {
                "Camera device could not be opened due to a device policy.".into()
            }
            DeviceErrorCode::CameraInUse => "Camera device is in use already.".into(),
            DeviceErrorCode::CameraService => {
                "Camera service has encountered a fatal error.".into()
            }
            DeviceErrorCode::MaxCamerasInUse => concat!(
                "Camera device could not be opened because there are too many ",
                "other open camera devices."
            )
            .into(),
            DeviceErrorCode::Unknown(code) => format!("Unknown camera error: {}", code),
        }
    }
}
