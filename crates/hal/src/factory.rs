//! Assembles the full metadata registry for one V4L2 camera.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use nix::time::{ClockId, clock_gettime};

use iris_core::prelude::{MetadataBlock, Result, Tag};
use iris_core::tags::{self, values};
use iris_metadata::component::PartialMetadata;
use iris_metadata::control::Control;
use iris_metadata::delegate::{NoEffectDelegate, TaggedDelegate};
use iris_metadata::enum_control::{enum_control, enum_control_or_ignored};
use iris_metadata::property::FixedProperty;
use iris_metadata::registry::Metadata;
use iris_v4l2::ioctl::{cid, menu};
use iris_v4l2::wrapper::V4l2Wrapper;

use crate::static_info::static_components;

/// Emits the shutter timestamp into every result from the boottime clock.
///
/// Timestamps are forced strictly increasing so back-to-back frames never
/// alias.
struct SensorClock {
    tag: [Tag; 1],
    last: AtomicI64,
}

impl SensorClock {
    fn new() -> Self {
        Self {
            tag: [tags::SENSOR_TIMESTAMP],
            last: AtomicI64::new(0),
        }
    }

    fn now_ns() -> Result<i64> {
        let ts = clock_gettime(ClockId::CLOCK_BOOTTIME)
            .map_err(|errno| iris_core::error::Error::Io(format!("clock_gettime: {errno}")))?;
        Ok(ts.tv_sec() * 1_000_000_000 + ts.tv_nsec())
    }
}

impl PartialMetadata for SensorClock {
    fn static_tags(&self) -> &[Tag] {
        &[]
    }

    fn control_tags(&self) -> &[Tag] {
        &[]
    }

    fn dynamic_tags(&self) -> &[Tag] {
        &self.tag
    }

    fn populate_static(&self, _out: &mut MetadataBlock) -> Result<()> {
        Ok(())
    }

    fn populate_dynamic(&self, out: &mut MetadataBlock) -> Result<()> {
        let now = Self::now_ns()?;
        let previous = self.last.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(last.max(now - 1) + 1)
        });
        let timestamp = match previous {
            Ok(last) => last.max(now - 1) + 1,
            Err(_) => now,
        };
        out.set_one(tags::SENSOR_TIMESTAMP, timestamp);
        Ok(())
    }

    fn populate_template(&self, _template_id: i32, _out: &mut MetadataBlock) -> Result<()> {
        Ok(())
    }

    fn supports_request_values(&self, _request: &MetadataBlock) -> bool {
        true
    }

    fn set_request_values(&self, _request: &MetadataBlock) -> Result<()> {
        Ok(())
    }
}

/// A control with no options and a recorded default, for request tags the
/// hardware cannot influence.
fn recorded<T: iris_core::prelude::TagCodec + 'static>(tag: Tag, default: T) -> Box<Control<T>> {
    Box::new(Control::new(
        TaggedDelegate::new(tag, Box::new(NoEffectDelegate::new(default))),
        None,
    ))
}

/// Build the metadata registry for a connected device.
///
/// Components that need device capabilities query the wrapper here; enum
/// controls degrade to ignored controls with one synthetic default when
/// the driver does not expose them.
pub fn build_metadata(device: Arc<V4l2Wrapper>) -> Result<Metadata> {
    let mut metadata = Metadata::new();

    metadata.add_component(Box::new(Control::ignored(
        tags::COLOR_CORRECTION_ABERRATION_MODE,
        tags::COLOR_CORRECTION_AVAILABLE_ABERRATION_MODES,
        vec![
            values::ABERRATION_MODE_FAST,
            values::ABERRATION_MODE_HIGH_QUALITY,
        ],
        values::ABERRATION_MODE_FAST,
    )));

    // 3A. Default to ON/AUTO: they imply pretty much nothing, while OFF
    // makes guarantees about not hindering performance.
    metadata.add_component(Box::new(FixedProperty::new(
        tags::CONTROL_MAX_REGIONS,
        vec![0i32, 0, 0],
    )));
    metadata.add_component(enum_control_or_ignored(
        device.clone(),
        cid::V4L2_CID_EXPOSURE_AUTO,
        tags::CONTROL_AE_MODE,
        tags::CONTROL_AE_AVAILABLE_MODES,
        &[
            (menu::V4L2_EXPOSURE_AUTO, values::AE_MODE_ON),
            (menu::V4L2_EXPOSURE_MANUAL, values::AE_MODE_OFF),
        ],
        values::AE_MODE_ON,
    ));
    metadata.add_component(enum_control_or_ignored(
        device.clone(),
        cid::V4L2_CID_POWER_LINE_FREQUENCY,
        tags::CONTROL_AE_ANTIBANDING_MODE,
        tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES,
        &[
            (menu::V4L2_POWER_LINE_FREQUENCY_DISABLED, values::ANTIBANDING_OFF),
            (menu::V4L2_POWER_LINE_FREQUENCY_50HZ, values::ANTIBANDING_50HZ),
            (menu::V4L2_POWER_LINE_FREQUENCY_60HZ, values::ANTIBANDING_60HZ),
            (menu::V4L2_POWER_LINE_FREQUENCY_AUTO, values::ANTIBANDING_AUTO),
        ],
        values::ANTIBANDING_AUTO,
    ));

    // V4L2 offers two white balance interfaces; try the preset one before
    // falling back to the simple boolean control.
    let advanced_awb = enum_control(
        device.clone(),
        cid::V4L2_CID_AUTO_N_PRESET_WHITE_BALANCE,
        tags::CONTROL_AWB_MODE,
        tags::CONTROL_AWB_AVAILABLE_MODES,
        &[
            (menu::V4L2_WHITE_BALANCE_MANUAL, values::AWB_MODE_OFF),
            (menu::V4L2_WHITE_BALANCE_AUTO, values::AWB_MODE_AUTO),
            (menu::V4L2_WHITE_BALANCE_INCANDESCENT, values::AWB_MODE_INCANDESCENT),
            (menu::V4L2_WHITE_BALANCE_FLUORESCENT, values::AWB_MODE_FLUORESCENT),
            (menu::V4L2_WHITE_BALANCE_DAYLIGHT, values::AWB_MODE_DAYLIGHT),
            (menu::V4L2_WHITE_BALANCE_CLOUDY, values::AWB_MODE_CLOUDY_DAYLIGHT),
            (menu::V4L2_WHITE_BALANCE_SHADE, values::AWB_MODE_SHADE),
        ],
    );
    match advanced_awb {
        Ok(control) => metadata.add_component(Box::new(control)),
        Err(_) => metadata.add_component(enum_control_or_ignored(
            device.clone(),
            cid::V4L2_CID_AUTO_WHITE_BALANCE,
            tags::CONTROL_AWB_MODE,
            tags::CONTROL_AWB_AVAILABLE_MODES,
            &[(0, values::AWB_MODE_OFF), (1, values::AWB_MODE_AUTO)],
            values::AWB_MODE_AUTO,
        )),
    }

    metadata.add_component(enum_control_or_ignored(
        device.clone(),
        cid::V4L2_CID_SCENE_MODE,
        tags::CONTROL_SCENE_MODE,
        tags::CONTROL_AVAILABLE_SCENE_MODES,
        &[
            (menu::V4L2_SCENE_MODE_NONE, values::SCENE_MODE_DISABLED),
            (menu::V4L2_SCENE_MODE_BEACH_SNOW, values::SCENE_MODE_BEACH),
            (menu::V4L2_SCENE_MODE_CANDLE_LIGHT, values::SCENE_MODE_CANDLELIGHT),
            (menu::V4L2_SCENE_MODE_FIREWORKS, values::SCENE_MODE_FIREWORKS),
            (menu::V4L2_SCENE_MODE_LANDSCAPE, values::SCENE_MODE_LANDSCAPE),
            (menu::V4L2_SCENE_MODE_NIGHT, values::SCENE_MODE_NIGHT),
            (menu::V4L2_SCENE_MODE_PARTY_INDOOR, values::SCENE_MODE_PARTY),
            (menu::V4L2_SCENE_MODE_SPORTS, values::SCENE_MODE_SPORTS),
            (menu::V4L2_SCENE_MODE_SUNSET, values::SCENE_MODE_SUNSET),
        ],
        values::SCENE_MODE_DISABLED,
    ));
    metadata.add_component(enum_control_or_ignored(
        device.clone(),
        cid::V4L2_CID_COLORFX,
        tags::CONTROL_EFFECT_MODE,
        tags::CONTROL_AVAILABLE_EFFECTS,
        &[
            (menu::V4L2_COLORFX_NONE, values::EFFECT_MODE_OFF),
            (menu::V4L2_COLORFX_BW, values::EFFECT_MODE_MONO),
            (menu::V4L2_COLORFX_NEGATIVE, values::EFFECT_MODE_NEGATIVE),
            (menu::V4L2_COLORFX_SOLARIZATION, values::EFFECT_MODE_SOLARIZE),
            (menu::V4L2_COLORFX_SEPIA, values::EFFECT_MODE_SEPIA),
            (menu::V4L2_COLORFX_AQUA, values::EFFECT_MODE_AQUA),
        ],
        values::EFFECT_MODE_OFF,
    ));

    // FAST is allowed to be equivalent to OFF, so it is safe to list even
    // when the hardware does nothing.
    metadata.add_component(Box::new(Control::ignored(
        tags::EDGE_MODE,
        tags::EDGE_AVAILABLE_EDGE_MODES,
        vec![values::EDGE_MODE_FAST],
        values::EDGE_MODE_FAST,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::HOT_PIXEL_MODE,
        tags::HOT_PIXEL_AVAILABLE_HOT_PIXEL_MODES,
        vec![
            values::HOT_PIXEL_MODE_FAST,
            values::HOT_PIXEL_MODE_HIGH_QUALITY,
        ],
        values::HOT_PIXEL_MODE_FAST,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::STATISTICS_HOT_PIXEL_MAP_MODE,
        tags::STATISTICS_INFO_AVAILABLE_HOT_PIXEL_MAP_MODES,
        vec![values::HOT_PIXEL_MAP_MODE_OFF],
        values::HOT_PIXEL_MAP_MODE_OFF,
    )));

    // Lens parameters V4L2 cannot report; faked and informative only.
    metadata.add_component(Box::new(Control::ignored(
        tags::LENS_APERTURE,
        tags::LENS_INFO_AVAILABLE_APERTURES,
        vec![2.0f32],
        2.0,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::LENS_FOCAL_LENGTH,
        tags::LENS_INFO_AVAILABLE_FOCAL_LENGTHS,
        vec![3.04f32],
        3.04,
    )));
    // 0 marks filter density as unsupported.
    metadata.add_component(Box::new(Control::ignored(
        tags::LENS_FILTER_DENSITY,
        tags::LENS_INFO_AVAILABLE_FILTER_DENSITIES,
        vec![0.0f32],
        0.0,
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::LENS_INFO_FOCUS_DISTANCE_CALIBRATION,
        values::FOCUS_DISTANCE_CALIBRATION_UNCALIBRATED,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::SHADING_MODE,
        tags::SHADING_AVAILABLE_MODES,
        vec![values::SHADING_MODE_FAST, values::SHADING_MODE_HIGH_QUALITY],
        values::SHADING_MODE_FAST,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::STATISTICS_LENS_SHADING_MAP_MODE,
        tags::STATISTICS_INFO_AVAILABLE_LENS_SHADING_MAP_MODES,
        vec![values::LENS_SHADING_MAP_MODE_OFF],
        values::LENS_SHADING_MAP_MODE_OFF,
    )));

    // V4L2 doesn't separate optical from video stabilization; report one
    // and pin the other off.
    metadata.add_component(enum_control_or_ignored(
        device.clone(),
        cid::V4L2_CID_IMAGE_STABILIZATION,
        tags::CONTROL_VIDEO_STABILIZATION_MODE,
        tags::CONTROL_AVAILABLE_VIDEO_STABILIZATION_MODES,
        &[
            (0, values::VIDEO_STABILIZATION_OFF),
            (1, values::VIDEO_STABILIZATION_ON),
        ],
        values::VIDEO_STABILIZATION_OFF,
    ));
    metadata.add_component(Box::new(Control::ignored(
        tags::LENS_OPTICAL_STABILIZATION_MODE,
        tags::LENS_INFO_AVAILABLE_OPTICAL_STABILIZATION,
        vec![values::OPTICAL_STABILIZATION_OFF],
        values::OPTICAL_STABILIZATION_OFF,
    )));
    metadata.add_component(Box::new(Control::ignored(
        tags::NOISE_REDUCTION_MODE,
        tags::NOISE_REDUCTION_AVAILABLE_NOISE_REDUCTION_MODES,
        vec![values::NOISE_REDUCTION_MODE_FAST],
        values::NOISE_REDUCTION_MODE_FAST,
    )));

    // No autofocus plumbing in this core.
    metadata.add_component(Box::new(Control::ignored(
        tags::CONTROL_AF_MODE,
        tags::CONTROL_AF_AVAILABLE_MODES,
        vec![values::AF_MODE_OFF],
        values::AF_MODE_OFF,
    )));
    metadata.add_component(recorded(tags::CONTROL_MODE, values::CONTROL_MODE_AUTO));
    metadata.add_component(recorded(
        tags::CONTROL_CAPTURE_INTENT,
        values::CAPTURE_INTENT_PREVIEW,
    ));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::FLASH_INFO_AVAILABLE,
        0u8,
    )));
    metadata.add_component(recorded(tags::FLASH_MODE, values::FLASH_MODE_OFF));
    metadata.add_component(recorded(tags::JPEG_QUALITY, 80u8));

    // Only the "no thumbnail" size is offered.
    metadata.add_component(Box::new(Control::<[i32; 2]>::ignored(
        tags::JPEG_THUMBNAIL_SIZE,
        tags::JPEG_AVAILABLE_THUMBNAIL_SIZES,
        vec![[0, 0]],
        [0, 0],
    )));

    // V4L2 supports one stream at a time; report the minimum allowable for
    // LIMITED devices.
    metadata.add_component(Box::new(FixedProperty::new(
        tags::REQUEST_MAX_NUM_OUTPUT_STREAMS,
        vec![0i32, 2, 1],
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::REQUEST_MAX_NUM_INPUT_STREAMS,
        0i32,
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::REQUEST_PIPELINE_MAX_DEPTH,
        4u8,
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::SYNC_MAX_LATENCY,
        values::SYNC_MAX_LATENCY_UNKNOWN,
    )));

    // Crop behavior is driver dependent and unqueryable; assume freeform.
    metadata.add_component(Box::new(FixedProperty::one(
        tags::SCALER_CROPPING_TYPE,
        values::CROPPING_TYPE_FREEFORM,
    )));
    // Physical size feeds field-of-view math in the framework; faking it
    // may skew those results.
    metadata.add_component(Box::new(FixedProperty::new(
        tags::SENSOR_INFO_PHYSICAL_SIZE,
        vec![3.674f32, 2.760],
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::SENSOR_INFO_TIMESTAMP_SOURCE,
        values::TIMESTAMP_SOURCE_UNKNOWN,
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::SENSOR_ORIENTATION,
        0i32,
    )));
    // V4L2 cannot determine mounting; external is the only honest answer.
    metadata.add_component(Box::new(FixedProperty::one(
        tags::LENS_FACING,
        values::LENS_FACING_EXTERNAL,
    )));

    metadata.add_component(Box::new(Control::ignored(
        tags::STATISTICS_FACE_DETECT_MODE,
        tags::STATISTICS_INFO_AVAILABLE_FACE_DETECT_MODES,
        vec![values::FACE_DETECT_MODE_OFF],
        values::FACE_DETECT_MODE_OFF,
    )));
    metadata.add_component(Box::new(FixedProperty::one(
        tags::STATISTICS_INFO_MAX_FACE_COUNT,
        0i32,
    )));

    metadata.add_component(Box::new(FixedProperty::one(
        tags::INFO_SUPPORTED_HARDWARE_LEVEL,
        values::HARDWARE_LEVEL_LIMITED,
    )));
    metadata.add_component(Box::new(FixedProperty::new(
        tags::REQUEST_AVAILABLE_CAPABILITIES,
        vec![values::CAPABILITY_BACKWARD_COMPATIBLE],
    )));

    metadata.add_component(Box::new(SensorClock::new()));

    for component in static_components(&device)? {
        metadata.add_component(component);
    }

    debug_assert!(metadata.has_disjoint_tags());
    Ok(metadata)
}
