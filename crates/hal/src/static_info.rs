//! Capability-derived static characteristics.
//!
//! Queries the device for formats, frame sizes, and frame durations, then
//! turns them into metadata components. Devices that cannot provide the
//! required formats or a usable FPS floor are rejected here.

use std::sync::Arc;

use tracing::{debug, warn};

use iris_core::prelude::{Error, Result};
use iris_core::tags;
use iris_metadata::component::PartialMetadata;
use iris_metadata::control::Control;
use iris_metadata::property::FixedProperty;
use iris_v4l2::stream_format::HalFormat;
use iris_v4l2::wrapper::V4l2Wrapper;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
/// Direction marker for output stream configurations.
const STREAM_CONFIGURATION_OUTPUT: i32 = 0;

/// Build the components describing what this device can capture.
pub fn static_components(device: &Arc<V4l2Wrapper>) -> Result<Vec<Box<dyn PartialMetadata>>> {
    // Map driver formats into the HAL taxonomy; discard unrecognized ones.
    let mut recognized: Vec<(HalFormat, u32)> = Vec::new();
    for pixelformat in device.formats()? {
        match HalFormat::from_v4l2(pixelformat) {
            Some(hal) => recognized.push((hal, pixelformat)),
            None => {
                debug!(pixelformat, "discarding unrecognized format");
            }
        }
    }
    let has = |wanted: HalFormat| recognized.iter().any(|&(hal, _)| hal == wanted);
    if !has(HalFormat::Ycbcr420) || !has(HalFormat::Blob) {
        return Err(Error::NotSupported(
            "device must support both flexible YCbCr 4:2:0 and JPEG".into(),
        ));
    }

    let mut stream_configs: Vec<i32> = Vec::new();
    let mut min_frame_durations: Vec<i64> = Vec::new();
    let mut stall_durations: Vec<i64> = Vec::new();
    let mut max_frame_duration: i64 = 0;
    let mut yuv_min_duration = i64::MAX;
    let mut yuv_max_duration = i64::MIN;
    let mut largest_yuv = (0u32, 0u32);

    for &(hal, pixelformat) in &recognized {
        for size in device.frame_sizes(pixelformat)? {
            let (min_duration, max_duration) = device.frame_duration_range(pixelformat, size)?;
            if min_duration <= 0 {
                warn!(pixelformat, ?size, "skipping size with bogus durations");
                continue;
            }
            stream_configs.extend([
                hal.code(),
                size.0 as i32,
                size.1 as i32,
                STREAM_CONFIGURATION_OUTPUT,
            ]);
            min_frame_durations.extend([
                hal.code() as i64,
                size.0 as i64,
                size.1 as i64,
                min_duration,
            ]);
            // JPEG captures stall the pipeline for about a frame; YUV
            // streams don't stall.
            let stall = if hal == HalFormat::Blob { min_duration } else { 0 };
            stall_durations.extend([hal.code() as i64, size.0 as i64, size.1 as i64, stall]);
            max_frame_duration = max_frame_duration.max(max_duration);

            if hal == HalFormat::Ycbcr420 {
                yuv_min_duration = yuv_min_duration.min(min_duration);
                yuv_max_duration = yuv_max_duration.max(max_duration);
                if size.0 * size.1 > largest_yuv.0 * largest_yuv.1 {
                    largest_yuv = size;
                }
            }
        }
    }
    if yuv_min_duration <= 0 || yuv_min_duration == i64::MAX {
        return Err(Error::NotSupported(
            "no usable YUV frame durations reported".into(),
        ));
    }

    // Derive the supported FPS ranges from the YUV durations.
    let max_yuv_fps = (NANOS_PER_SECOND / yuv_min_duration) as i32;
    let min_yuv_fps = (NANOS_PER_SECOND / yuv_max_duration) as i32;
    if min_yuv_fps > 15 {
        return Err(Error::NotSupported(format!(
            "minimum YUV frame rate {min_yuv_fps} is above the 15 fps ceiling"
        )));
    }
    let mut fps_ranges: Vec<[i32; 2]> = vec![[min_yuv_fps, max_yuv_fps], [max_yuv_fps, max_yuv_fps]];
    if max_yuv_fps > 30 {
        fps_ranges.push([30, 30]);
    }
    fps_ranges.dedup();
    let default_range = fps_ranges[0];

    debug!(
        formats = recognized.len(),
        min_yuv_fps, max_yuv_fps, "derived stream capabilities"
    );

    Ok(vec![
        Box::new(FixedProperty::new(
            tags::SCALER_AVAILABLE_STREAM_CONFIGURATIONS,
            stream_configs,
        )),
        Box::new(FixedProperty::new(
            tags::SCALER_AVAILABLE_MIN_FRAME_DURATIONS,
            min_frame_durations,
        )),
        Box::new(FixedProperty::new(
            tags::SCALER_AVAILABLE_STALL_DURATIONS,
            stall_durations,
        )),
        Box::new(FixedProperty::one(
            tags::SENSOR_INFO_MAX_FRAME_DURATION,
            max_frame_duration,
        )),
        Box::new(FixedProperty::new(
            tags::SENSOR_INFO_PIXEL_ARRAY_SIZE,
            vec![largest_yuv.0 as i32, largest_yuv.1 as i32],
        )),
        Box::new(FixedProperty::new(
            tags::SENSOR_INFO_ACTIVE_ARRAY_SIZE,
            vec![0, 0, largest_yuv.0 as i32, largest_yuv.1 as i32],
        )),
        Box::new(Control::<[i32; 2]>::ignored(
            tags::CONTROL_AE_TARGET_FPS_RANGE,
            tags::CONTROL_AE_AVAILABLE_TARGET_FPS_RANGES,
            fps_ranges,
            default_range,
        )),
    ])
}
