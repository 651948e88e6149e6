//! Well-known metadata tags and enum values.
//!
//! Tags are grouped into sections; distinct partial metadata components must
//! own disjoint tag sets, so every tag is declared exactly once here.

use crate::metadata::Tag;

/// Section numbers (high half of a tag).
pub mod section {
    pub const COLOR_CORRECTION: u16 = 0;
    pub const CONTROL: u16 = 1;
    pub const EDGE: u16 = 2;
    pub const FLASH: u16 = 3;
    pub const HOT_PIXEL: u16 = 4;
    pub const JPEG: u16 = 5;
    pub const LENS: u16 = 6;
    pub const NOISE_REDUCTION: u16 = 7;
    pub const REQUEST: u16 = 8;
    pub const SCALER: u16 = 9;
    pub const SENSOR: u16 = 10;
    pub const SHADING: u16 = 11;
    pub const STATISTICS: u16 = 12;
    pub const SYNC: u16 = 13;
    pub const INFO: u16 = 14;
}

use section::*;

pub const COLOR_CORRECTION_ABERRATION_MODE: Tag = Tag::new(COLOR_CORRECTION, 0);
pub const COLOR_CORRECTION_AVAILABLE_ABERRATION_MODES: Tag = Tag::new(COLOR_CORRECTION, 1);

pub const CONTROL_AE_MODE: Tag = Tag::new(CONTROL, 0);
pub const CONTROL_AE_AVAILABLE_MODES: Tag = Tag::new(CONTROL, 1);
pub const CONTROL_AE_ANTIBANDING_MODE: Tag = Tag::new(CONTROL, 2);
pub const CONTROL_AE_AVAILABLE_ANTIBANDING_MODES: Tag = Tag::new(CONTROL, 3);
pub const CONTROL_AE_TARGET_FPS_RANGE: Tag = Tag::new(CONTROL, 4);
pub const CONTROL_AE_AVAILABLE_TARGET_FPS_RANGES: Tag = Tag::new(CONTROL, 5);
pub const CONTROL_AWB_MODE: Tag = Tag::new(CONTROL, 6);
pub const CONTROL_AWB_AVAILABLE_MODES: Tag = Tag::new(CONTROL, 7);
pub const CONTROL_AF_MODE: Tag = Tag::new(CONTROL, 8);
pub const CONTROL_AF_AVAILABLE_MODES: Tag = Tag::new(CONTROL, 9);
pub const CONTROL_SCENE_MODE: Tag = Tag::new(CONTROL, 10);
pub const CONTROL_AVAILABLE_SCENE_MODES: Tag = Tag::new(CONTROL, 11);
pub const CONTROL_EFFECT_MODE: Tag = Tag::new(CONTROL, 12);
pub const CONTROL_AVAILABLE_EFFECTS: Tag = Tag::new(CONTROL, 13);
pub const CONTROL_VIDEO_STABILIZATION_MODE: Tag = Tag::new(CONTROL, 14);
pub const CONTROL_AVAILABLE_VIDEO_STABILIZATION_MODES: Tag = Tag::new(CONTROL, 15);
pub const CONTROL_CAPTURE_INTENT: Tag = Tag::new(CONTROL, 16);
pub const CONTROL_MAX_REGIONS: Tag = Tag::new(CONTROL, 17);
pub const CONTROL_MODE: Tag = Tag::new(CONTROL, 18);

pub const EDGE_MODE: Tag = Tag::new(EDGE, 0);
pub const EDGE_AVAILABLE_EDGE_MODES: Tag = Tag::new(EDGE, 1);

pub const FLASH_MODE: Tag = Tag::new(FLASH, 0);
pub const FLASH_INFO_AVAILABLE: Tag = Tag::new(FLASH, 1);

pub const HOT_PIXEL_MODE: Tag = Tag::new(HOT_PIXEL, 0);
pub const HOT_PIXEL_AVAILABLE_HOT_PIXEL_MODES: Tag = Tag::new(HOT_PIXEL, 1);

pub const JPEG_QUALITY: Tag = Tag::new(JPEG, 0);
pub const JPEG_THUMBNAIL_SIZE: Tag = Tag::new(JPEG, 1);
pub const JPEG_AVAILABLE_THUMBNAIL_SIZES: Tag = Tag::new(JPEG, 2);

pub const LENS_APERTURE: Tag = Tag::new(LENS, 0);
pub const LENS_INFO_AVAILABLE_APERTURES: Tag = Tag::new(LENS, 1);
pub const LENS_FOCAL_LENGTH: Tag = Tag::new(LENS, 2);
pub const LENS_INFO_AVAILABLE_FOCAL_LENGTHS: Tag = Tag::new(LENS, 3);
pub const LENS_FILTER_DENSITY: Tag = Tag::new(LENS, 4);
pub const LENS_INFO_AVAILABLE_FILTER_DENSITIES: Tag = Tag::new(LENS, 5);
pub const LENS_OPTICAL_STABILIZATION_MODE: Tag = Tag::new(LENS, 6);
pub const LENS_INFO_AVAILABLE_OPTICAL_STABILIZATION: Tag = Tag::new(LENS, 7);
pub const LENS_INFO_FOCUS_DISTANCE_CALIBRATION: Tag = Tag::new(LENS, 8);
pub const LENS_FACING: Tag = Tag::new(LENS, 9);

pub const NOISE_REDUCTION_MODE: Tag = Tag::new(NOISE_REDUCTION, 0);
pub const NOISE_REDUCTION_AVAILABLE_NOISE_REDUCTION_MODES: Tag = Tag::new(NOISE_REDUCTION, 1);

pub const REQUEST_MAX_NUM_OUTPUT_STREAMS: Tag = Tag::new(REQUEST, 0);
pub const REQUEST_MAX_NUM_INPUT_STREAMS: Tag = Tag::new(REQUEST, 1);
pub const REQUEST_PIPELINE_MAX_DEPTH: Tag = Tag::new(REQUEST, 2);
pub const REQUEST_AVAILABLE_CAPABILITIES: Tag = Tag::new(REQUEST, 3);
pub const REQUEST_AVAILABLE_REQUEST_KEYS: Tag = Tag::new(REQUEST, 4);
pub const REQUEST_AVAILABLE_RESULT_KEYS: Tag = Tag::new(REQUEST, 5);
pub const REQUEST_AVAILABLE_CHARACTERISTICS_KEYS: Tag = Tag::new(REQUEST, 6);

pub const SCALER_AVAILABLE_STREAM_CONFIGURATIONS: Tag = Tag::new(SCALER, 0);
pub const SCALER_AVAILABLE_MIN_FRAME_DURATIONS: Tag = Tag::new(SCALER, 1);
pub const SCALER_AVAILABLE_STALL_DURATIONS: Tag = Tag::new(SCALER, 2);
pub const SCALER_CROPPING_TYPE: Tag = Tag::new(SCALER, 3);

pub const SENSOR_TIMESTAMP: Tag = Tag::new(SENSOR, 0);
pub const SENSOR_ORIENTATION: Tag = Tag::new(SENSOR, 1);
pub const SENSOR_INFO_PHYSICAL_SIZE: Tag = Tag::new(SENSOR, 2);
pub const SENSOR_INFO_TIMESTAMP_SOURCE: Tag = Tag::new(SENSOR, 3);
pub const SENSOR_INFO_MAX_FRAME_DURATION: Tag = Tag::new(SENSOR, 4);
pub const SENSOR_INFO_PIXEL_ARRAY_SIZE: Tag = Tag::new(SENSOR, 5);
pub const SENSOR_INFO_ACTIVE_ARRAY_SIZE: Tag = Tag::new(SENSOR, 6);

pub const SHADING_MODE: Tag = Tag::new(SHADING, 0);
pub const SHADING_AVAILABLE_MODES: Tag = Tag::new(SHADING, 1);

pub const STATISTICS_FACE_DETECT_MODE: Tag = Tag::new(STATISTICS, 0);
pub const STATISTICS_INFO_AVAILABLE_FACE_DETECT_MODES: Tag = Tag::new(STATISTICS, 1);
pub const STATISTICS_INFO_MAX_FACE_COUNT: Tag = Tag::new(STATISTICS, 2);
pub const STATISTICS_HOT_PIXEL_MAP_MODE: Tag = Tag::new(STATISTICS, 3);
pub const STATISTICS_INFO_AVAILABLE_HOT_PIXEL_MAP_MODES: Tag = Tag::new(STATISTICS, 4);
pub const STATISTICS_LENS_SHADING_MAP_MODE: Tag = Tag::new(STATISTICS, 5);
pub const STATISTICS_INFO_AVAILABLE_LENS_SHADING_MAP_MODES: Tag = Tag::new(STATISTICS, 6);

pub const SYNC_MAX_LATENCY: Tag = Tag::new(SYNC, 0);

pub const INFO_SUPPORTED_HARDWARE_LEVEL: Tag = Tag::new(INFO, 0);

/// Enum values carried in byte-typed entries.
pub mod values {
    pub const ABERRATION_MODE_OFF: u8 = 0;
    pub const ABERRATION_MODE_FAST: u8 = 1;
    pub const ABERRATION_MODE_HIGH_QUALITY: u8 = 2;

    pub const AE_MODE_OFF: u8 = 0;
    pub const AE_MODE_ON: u8 = 1;

    pub const ANTIBANDING_OFF: u8 = 0;
    pub const ANTIBANDING_50HZ: u8 = 1;
    pub const ANTIBANDING_60HZ: u8 = 2;
    pub const ANTIBANDING_AUTO: u8 = 3;

    pub const AWB_MODE_OFF: u8 = 0;
    pub const AWB_MODE_AUTO: u8 = 1;
    pub const AWB_MODE_INCANDESCENT: u8 = 2;
    pub const AWB_MODE_FLUORESCENT: u8 = 3;
    pub const AWB_MODE_DAYLIGHT: u8 = 4;
    pub const AWB_MODE_CLOUDY_DAYLIGHT: u8 = 5;
    pub const AWB_MODE_SHADE: u8 = 6;

    pub const AF_MODE_OFF: u8 = 0;
    pub const AF_MODE_AUTO: u8 = 1;
    pub const AF_MODE_CONTINUOUS_VIDEO: u8 = 3;
    pub const AF_MODE_CONTINUOUS_PICTURE: u8 = 4;

    pub const SCENE_MODE_DISABLED: u8 = 0;
    pub const SCENE_MODE_BEACH: u8 = 1;
    pub const SCENE_MODE_CANDLELIGHT: u8 = 2;
    pub const SCENE_MODE_FIREWORKS: u8 = 3;
    pub const SCENE_MODE_LANDSCAPE: u8 = 4;
    pub const SCENE_MODE_NIGHT: u8 = 5;
    pub const SCENE_MODE_PARTY: u8 = 6;
    pub const SCENE_MODE_SPORTS: u8 = 7;
    pub const SCENE_MODE_SUNSET: u8 = 8;

    pub const EFFECT_MODE_OFF: u8 = 0;
    pub const EFFECT_MODE_MONO: u8 = 1;
    pub const EFFECT_MODE_NEGATIVE: u8 = 2;
    pub const EFFECT_MODE_SOLARIZE: u8 = 3;
    pub const EFFECT_MODE_SEPIA: u8 = 4;
    pub const EFFECT_MODE_AQUA: u8 = 5;

    pub const VIDEO_STABILIZATION_OFF: u8 = 0;
    pub const VIDEO_STABILIZATION_ON: u8 = 1;

    pub const CONTROL_MODE_AUTO: u8 = 1;

    pub const CAPTURE_INTENT_PREVIEW: u8 = 1;
    pub const CAPTURE_INTENT_STILL_CAPTURE: u8 = 2;
    pub const CAPTURE_INTENT_VIDEO_RECORD: u8 = 3;
    pub const CAPTURE_INTENT_VIDEO_SNAPSHOT: u8 = 4;

    pub const EDGE_MODE_FAST: u8 = 1;
    pub const FLASH_MODE_OFF: u8 = 0;
    pub const HOT_PIXEL_MODE_FAST: u8 = 1;
    pub const HOT_PIXEL_MODE_HIGH_QUALITY: u8 = 2;
    pub const HOT_PIXEL_MAP_MODE_OFF: u8 = 0;
    pub const OPTICAL_STABILIZATION_OFF: u8 = 0;
    pub const FOCUS_DISTANCE_CALIBRATION_UNCALIBRATED: u8 = 0;
    pub const LENS_FACING_EXTERNAL: u8 = 2;
    pub const NOISE_REDUCTION_MODE_FAST: u8 = 1;
    pub const SHADING_MODE_FAST: u8 = 1;
    pub const SHADING_MODE_HIGH_QUALITY: u8 = 2;
    pub const LENS_SHADING_MAP_MODE_OFF: u8 = 0;
    pub const FACE_DETECT_MODE_OFF: u8 = 0;
    pub const TIMESTAMP_SOURCE_UNKNOWN: u8 = 0;
    pub const CROPPING_TYPE_FREEFORM: u8 = 1;
    pub const HARDWARE_LEVEL_LIMITED: u8 = 0;
    pub const CAPABILITY_BACKWARD_COMPATIBLE: u8 = 0;

    pub const SYNC_MAX_LATENCY_UNKNOWN: i32 = -1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_carry_their_section() {
        assert_eq!(SENSOR_TIMESTAMP.section(), section::SENSOR);
        assert_eq!(CONTROL_AE_MODE.section(), section::CONTROL);
        assert_eq!(CONTROL_AE_MODE.index(), 0);
    }
}
