//! Capture format negotiation
//!
//! # Spell: ClosestCaptureFormat
//! ^ Intent: pick one size and one fps range from the device's declared sets
//!
//! @negotiate
//!   : (capabilities, width, height, fps) -> CaptureFormat | NoSupportedFormat
//!   ! result_drawn_from_supplied_sets
//!   ! size_and_fps_selected_independently
//!   - device_access

use crate::errors::CameraError;
use crate::types::{CameraCapabilities, CaptureFormat, FramerateRange, Size};
use std::cmp::Reverse;

/// Native fps ranges below this upper bound are expressed in whole fps.
const FPS_UNIT_THRESHOLD: i32 = 1000;

/// Multiplier that brings the device's native fps unit to fps * 1000.
pub fn fps_unit_factor(native_ranges: &[FramerateRange]) -> i32 {
    match native_ranges.first() {
        None => 1000,
        Some(range) if range.max < FPS_UNIT_THRESHOLD => 1000,
        Some(_) => 1,
    }
}

pub fn convert_framerates(native_ranges: &[FramerateRange], factor: i32) -> Vec<FramerateRange> {
    native_ranges
        .iter()
        .map(|r| FramerateRange::new(r.min.saturating_mul(factor), r.max.saturating_mul(factor)))
        .collect()
}

/// Range whose bounds sit closest to `requested` (fps * 1000).
///
/// Ties prefer a range containing the requested value, then the narrower one.
pub fn closest_framerate_range(
    ranges: &[FramerateRange],
    requested: i32,
) -> Option<FramerateRange> {
    ranges.iter().copied().min_by_key(|range| {
        let distance = (range.min as i64 - requested as i64).abs()
            + (range.max as i64 - requested as i64).abs();
        (distance, !range.contains(requested), range.span())
    })
}

/// Size closest to the requested area; ties prefer the larger size.
pub fn closest_size(sizes: &[Size], width: u32, height: u32) -> Option<Size> {
    let requested = width as u64 * height as u64;
    sizes
        .iter()
        .copied()
        .min_by_key(|size| (size.area().abs_diff(requested), Reverse(size.area())))
}

/// Largest still-capture size by area, ties toward the wider size.
///
/// `None` input means the device exposes no still-size list, in which case
/// `fallback` is used. An empty list yields no still size.
pub fn largest_still_size(sizes: Option<&[Size]>, fallback: Size) -> Option<Size> {
    match sizes {
        None => Some(fallback),
        Some(sizes) => sizes.iter().copied().max_by_key(|size| (size.area(), size.width)),
    }
}

/// Negotiate a capture format against the device capability snapshot.
///
/// `framerate` is in whole frames per second.
pub fn negotiate(
    capabilities: &CameraCapabilities,
    width: u32,
    height: u32,
    framerate: u32,
) -> Result<CaptureFormat, CameraError> {
    let factor = fps_unit_factor(&capabilities.fps_ranges);
    let ranges = convert_framerates(&capabilities.fps_ranges, factor);
    log::debug!("Available preview sizes: {:?}", capabilities.sizes);
    log::debug!("Available fps ranges: {:?}", ranges);

    let requested_fps = (framerate as i64 * 1000).min(i32::MAX as i64) as i32;
    let (Some(framerate), Some(size)) = (
        closest_framerate_range(&ranges, requested_fps),
        closest_size(&capabilities.sizes, width, height),
    ) else {
        return Err(CameraError::NoSupportedFormat(
            "No supported capture formats.".to_string(),
        ));
    };

    Ok(CaptureFormat {
        width: size.width,
        height: size.height,
        framerate,
    })
}
