//! Capability snapshots and frames for offline testing
//!
//! The capability sets resemble what a typical phone back camera and selfie
//! camera declare, with fps ranges in whole fps.

use crate::session::frame::{TextureBuffer, VideoFrame};
use crate::types::{
    AfMode, CameraCapabilities, FramerateRange, LensFacing, OpticalStabilizationMode, Size,
    VideoStabilizationMode,
};

/// Frame interval at 30 fps in nanoseconds.
const FRAME_INTERVAL_NS: i64 = 33_333_333;

/// Back camera: sensor mounted at 90 degrees, optical and video
/// stabilization, continuous video focus.
pub fn synthetic_capabilities() -> CameraCapabilities {
    CameraCapabilities {
        sizes: vec![
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(1920, 1080),
            Size::new(3840, 2160),
        ],
        fps_ranges: vec![
            FramerateRange::new(15, 15),
            FramerateRange::new(15, 30),
            FramerateRange::new(30, 30),
            FramerateRange::new(60, 60),
        ],
        sensor_orientation: 90,
        lens_facing: LensFacing::Back,
        optical_stabilization_modes: vec![
            OpticalStabilizationMode::Off,
            OpticalStabilizationMode::On,
        ],
        video_stabilization_modes: vec![VideoStabilizationMode::Off, VideoStabilizationMode::On],
        af_modes: vec![
            AfMode::Off,
            AfMode::Auto,
            AfMode::ContinuousVideo,
            AfMode::ContinuousPicture,
        ],
        still_capture_sizes: Some(vec![Size::new(1920, 1080), Size::new(4032, 3024)]),
    }
}

/// Front camera: sensor at 270 degrees, video stabilization only, fixed
/// focus, fps ranges in fps * 1000.
pub fn front_capabilities() -> CameraCapabilities {
    CameraCapabilities {
        sizes: vec![Size::new(640, 480), Size::new(1280, 720)],
        fps_ranges: vec![FramerateRange::new(15000, 30000), FramerateRange::new(30000, 30000)],
        sensor_orientation: 270,
        lens_facing: LensFacing::Front,
        optical_stabilization_modes: vec![OpticalStabilizationMode::Off],
        video_stabilization_modes: vec![VideoStabilizationMode::Off, VideoStabilizationMode::On],
        af_modes: vec![AfMode::Off],
        still_capture_sizes: None,
    }
}

/// Unrotated 1280x720 texture frame with an identity transform.
pub fn synthetic_frame(frame_number: u64) -> VideoFrame {
    VideoFrame {
        buffer: TextureBuffer::new(1, 1280, 720),
        rotation: 0,
        timestamp_ns: frame_number as i64 * FRAME_INTERVAL_NS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_camera_uses_whole_fps() {
        let caps = synthetic_capabilities();
        assert!(caps.fps_ranges.iter().all(|r| r.max < 1000));
        assert!(!caps.is_front_facing());
    }

    #[test]
    fn test_front_camera_uses_scaled_fps() {
        let caps = front_capabilities();
        assert!(caps.fps_ranges.iter().all(|r| r.max >= 1000));
        assert!(caps.is_front_facing());
    }

    #[test]
    fn test_synthetic_frame_timestamps_increase() {
        assert!(synthetic_frame(1).timestamp_ns > synthetic_frame(0).timestamp_ns);
    }
}
