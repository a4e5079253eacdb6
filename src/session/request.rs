//! Capture request construction for the repeating stream and for stills.

use crate::session::backend::SurfaceId;
use crate::types::{
    AeMode, AfMode, CameraCapabilities, CaptureFormat, FlashMode, FramerateRange,
    OpticalStabilizationMode, VideoStabilizationMode,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestTemplate {
    /// Stable frame rate with recording-quality post-processing.
    Record,
    StillCapture,
}

/// Parameters of one capture request. `None` leaves a control unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureRequestConfig {
    pub template: RequestTemplate,
    pub targets: Vec<SurfaceId>,
    /// Auto-exposure target range in the device's native fps unit.
    pub ae_target_fps_range: Option<FramerateRange>,
    pub ae_mode: Option<AeMode>,
    pub ae_lock: Option<bool>,
    pub flash_mode: FlashMode,
    pub optical_stabilization: Option<OpticalStabilizationMode>,
    pub video_stabilization: Option<VideoStabilizationMode>,
    pub af_mode: Option<AfMode>,
    pub jpeg_orientation: Option<u32>,
    pub jpeg_quality: Option<u8>,
}

impl CaptureRequestConfig {
    fn from_template(template: RequestTemplate) -> Self {
        Self {
            template,
            targets: Vec::new(),
            ae_target_fps_range: None,
            ae_mode: None,
            ae_lock: None,
            flash_mode: FlashMode::Off,
            optical_stabilization: None,
            video_stabilization: None,
            af_mode: None,
            jpeg_orientation: None,
            jpeg_quality: None,
        }
    }

    /// Continuous-capture request targeting the preview surface.
    pub fn repeating(
        capabilities: &CameraCapabilities,
        format: &CaptureFormat,
        fps_unit_factor: i32,
        flash_enabled: bool,
        target: SurfaceId,
    ) -> Self {
        let factor = fps_unit_factor.max(1);
        let mut request = Self::from_template(RequestTemplate::Record);
        request.ae_target_fps_range = Some(FramerateRange::new(
            format.framerate.min / factor,
            format.framerate.max / factor,
        ));
        request.ae_mode = Some(AeMode::On);
        request.ae_lock = Some(false);
        request.flash_mode = if flash_enabled {
            FlashMode::Torch
        } else {
            FlashMode::Off
        };
        request.choose_stabilization_mode(capabilities);
        request.choose_focus_mode(capabilities);
        request.targets.push(target);
        request
    }

    /// Single still capture targeting the still output.
    pub fn still(
        flash_enabled: bool,
        orientation: u32,
        jpeg_quality: u8,
        target: SurfaceId,
    ) -> Self {
        let mut request = Self::from_template(RequestTemplate::StillCapture);
        request.af_mode = Some(AfMode::Auto);
        request.jpeg_orientation = Some(orientation);
        request.jpeg_quality = Some(jpeg_quality);
        request.flash_mode = if flash_enabled {
            FlashMode::Torch
        } else {
            FlashMode::Off
        };
        request.targets.push(target);
        request
    }

    /// Optical stabilization wins over video stabilization. Only one is ever
    /// switched on; the other is explicitly set off.
    pub fn choose_stabilization_mode(&mut self, capabilities: &CameraCapabilities) {
        if capabilities
            .optical_stabilization_modes
            .contains(&OpticalStabilizationMode::On)
        {
            self.optical_stabilization = Some(OpticalStabilizationMode::On);
            self.video_stabilization = Some(VideoStabilizationMode::Off);
            log::debug!("Using optical stabilization.");
            return;
        }
        if capabilities
            .video_stabilization_modes
            .contains(&VideoStabilizationMode::On)
        {
            self.video_stabilization = Some(VideoStabilizationMode::On);
            self.optical_stabilization = Some(OpticalStabilizationMode::Off);
            log::debug!("Using video stabilization.");
            return;
        }
        log::debug!("Stabilization not available.");
    }

    pub fn choose_focus_mode(&mut self, capabilities: &CameraCapabilities) {
        if capabilities.af_modes.contains(&AfMode::ContinuousVideo) {
            self.af_mode = Some(AfMode::ContinuousVideo);
            log::debug!("Using continuous video auto-focus.");
            return;
        }
        log::debug!("Auto-focus is not available.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LensFacing, Size};

    fn capabilities() -> CameraCapabilities {
        CameraCapabilities {
            sizes: vec![Size::new(1280, 720)],
            fps_ranges: vec![FramerateRange::new(15, 30)],
            sensor_orientation: 90,
            lens_facing: LensFacing::Back,
            optical_stabilization_modes: vec![],
            video_stabilization_modes: vec![],
            af_modes: vec![],
            still_capture_sizes: None,
        }
    }

    fn format() -> CaptureFormat {
        CaptureFormat {
            width: 1280,
            height: 720,
            framerate: FramerateRange::new(15000, 30000),
        }
    }

    #[test]
    fn test_optical_preferred_and_video_disabled() {
        let mut caps = capabilities();
        caps.optical_stabilization_modes =
            vec![OpticalStabilizationMode::Off, OpticalStabilizationMode::On];
        caps.video_stabilization_modes = vec![VideoStabilizationMode::On];

        let request = CaptureRequestConfig::repeating(&caps, &format(), 1000, false, SurfaceId(1));
        assert_eq!(request.optical_stabilization, Some(OpticalStabilizationMode::On));
        assert_eq!(request.video_stabilization, Some(VideoStabilizationMode::Off));
    }

    #[test]
    fn test_video_stabilization_fallback() {
        let mut caps = capabilities();
        caps.optical_stabilization_modes = vec![OpticalStabilizationMode::Off];
        caps.video_stabilization_modes =
            vec![VideoStabilizationMode::Off, VideoStabilizationMode::On];

        let request = CaptureRequestConfig::repeating(&caps, &format(), 1000, false, SurfaceId(1));
        assert_eq!(request.video_stabilization, Some(VideoStabilizationMode::On));
        assert_eq!(request.optical_stabilization, Some(OpticalStabilizationMode::Off));
    }

    #[test]
    fn test_no_stabilization_leaves_controls_unset() {
        let request =
            CaptureRequestConfig::repeating(&capabilities(), &format(), 1000, false, SurfaceId(1));
        assert_eq!(request.optical_stabilization, None);
        assert_eq!(request.video_stabilization, None);
        assert_eq!(request.af_mode, None);
    }

    #[test]
    fn test_repeating_request_exposure_and_flash() {
        let mut caps = capabilities();
        caps.af_modes = vec![AfMode::Auto, AfMode::ContinuousVideo];

        let request = CaptureRequestConfig::repeating(&caps, &format(), 1000, true, SurfaceId(7));
        assert_eq!(request.template, RequestTemplate::Record);
        assert_eq!(request.ae_target_fps_range, Some(FramerateRange::new(15, 30)));
        assert_eq!(request.ae_mode, Some(AeMode::On));
        assert_eq!(request.ae_lock, Some(false));
        assert_eq!(request.flash_mode, FlashMode::Torch);
        assert_eq!(request.af_mode, Some(AfMode::ContinuousVideo));
        assert_eq!(request.targets, vec![SurfaceId(7)]);
    }

    #[test]
    fn test_still_request() {
        let request = CaptureRequestConfig::still(false, 270, 90, SurfaceId(2));
        assert_eq!(request.template, RequestTemplate::StillCapture);
        assert_eq!(request.af_mode, Some(AfMode::Auto));
        assert_eq!(request.jpeg_orientation, Some(270));
        assert_eq!(request.flash_mode, FlashMode::Off);
    }
}
