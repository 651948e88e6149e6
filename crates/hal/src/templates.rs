//! Default request templates.

use iris_core::prelude::{MetadataBlock, Result, Tag};
use iris_core::tags::{self, values};
use iris_metadata::registry::Metadata;
use tracing::debug;

/// Request template ids, valid in `[1, COUNT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Preview = 1,
    StillCapture = 2,
    VideoRecord = 3,
    VideoSnapshot = 4,
    ZeroShutterLag = 5,
    Manual = 6,
}

/// One past the largest valid template id.
pub const TEMPLATE_COUNT: i32 = 7;

impl TemplateKind {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(TemplateKind::Preview),
            2 => Some(TemplateKind::StillCapture),
            3 => Some(TemplateKind::VideoRecord),
            4 => Some(TemplateKind::VideoSnapshot),
            5 => Some(TemplateKind::ZeroShutterLag),
            6 => Some(TemplateKind::Manual),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Zero-shutter-lag and manual templates are not offered by this HAL.
    pub fn is_supported(self) -> bool {
        !matches!(self, TemplateKind::ZeroShutterLag | TemplateKind::Manual)
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Preview => "TEMPLATE_PREVIEW",
            TemplateKind::StillCapture => "TEMPLATE_STILL_CAPTURE",
            TemplateKind::VideoRecord => "TEMPLATE_VIDEO_RECORD",
            TemplateKind::VideoSnapshot => "TEMPLATE_VIDEO_SNAPSHOT",
            TemplateKind::ZeroShutterLag => "TEMPLATE_ZERO_SHUTTER_LAG",
            TemplateKind::Manual => "TEMPLATE_MANUAL",
        }
    }

    fn capture_intent(self) -> u8 {
        match self {
            TemplateKind::Preview => values::CAPTURE_INTENT_PREVIEW,
            TemplateKind::StillCapture => values::CAPTURE_INTENT_STILL_CAPTURE,
            TemplateKind::VideoRecord => values::CAPTURE_INTENT_VIDEO_RECORD,
            TemplateKind::VideoSnapshot | TemplateKind::ZeroShutterLag | TemplateKind::Manual => {
                values::CAPTURE_INTENT_VIDEO_SNAPSHOT
            }
        }
    }
}

/// Pick the available FPS range whose endpoints minimize L1 distance to
/// `desired`. Flat selection only considers ranges with `min == max`.
pub fn closest_fps_range(
    available: &[[i32; 2]],
    desired: [i32; 2],
    flat: bool,
) -> Option<[i32; 2]> {
    available
        .iter()
        .filter(|range| !flat || range[0] == range[1])
        .min_by_key(|range| {
            (range[0] - desired[0]).abs() as i64 + (range[1] - desired[1]).abs() as i64
        })
        .copied()
}

/// First of `preferred` present in the advertised mode list, else the
/// first advertised mode, else `fallback`.
fn pick_mode(static_info: &MetadataBlock, available: Tag, preferred: &[u8], fallback: u8) -> u8 {
    let Ok(Some(modes)) = static_info.all::<u8>(available) else {
        return fallback;
    };
    preferred
        .iter()
        .copied()
        .find(|mode| modes.contains(mode))
        .or_else(|| modes.first().copied())
        .unwrap_or(fallback)
}

/// Build the default request for one template.
///
/// Component defaults come first, then the base defaults every template
/// shares, then the per-template overlay.
pub fn build_template(
    metadata: &Metadata,
    static_info: &MetadataBlock,
    kind: TemplateKind,
) -> Result<MetadataBlock> {
    debug!(template = kind.name(), "building request template");
    let mut template = MetadataBlock::new();
    metadata.fill_template(kind.id(), &mut template)?;

    // Base defaults. Auto modes imply pretty much nothing, while OFF makes
    // performance guarantees this hardware can't honor.
    template.set_one(tags::CONTROL_MODE, values::CONTROL_MODE_AUTO);
    template.set_one(
        tags::CONTROL_AE_MODE,
        pick_mode(
            static_info,
            tags::CONTROL_AE_AVAILABLE_MODES,
            &[values::AE_MODE_ON],
            values::AE_MODE_OFF,
        ),
    );
    template.set_one(
        tags::CONTROL_AWB_MODE,
        pick_mode(
            static_info,
            tags::CONTROL_AWB_AVAILABLE_MODES,
            &[values::AWB_MODE_AUTO],
            values::AWB_MODE_OFF,
        ),
    );
    template.set_one(tags::FLASH_MODE, values::FLASH_MODE_OFF);
    template.set_one(tags::JPEG_QUALITY, 80u8);

    // Per-template overlay.
    template.set_one(tags::CONTROL_CAPTURE_INTENT, kind.capture_intent());

    let available_ranges = static_info
        .all::<i32>(tags::CONTROL_AE_AVAILABLE_TARGET_FPS_RANGES)?
        .map(|flat| {
            flat.chunks_exact(2)
                .map(|pair| [pair[0], pair[1]])
                .collect::<Vec<[i32; 2]>>()
        })
        .unwrap_or_default();
    // Flat for preview/video so frame pacing stays steady; variable for
    // still capture.
    let (desired, flat) = match kind {
        TemplateKind::StillCapture => ([5, 30], false),
        _ => ([30, 30], true),
    };
    if let Some(range) = closest_fps_range(&available_ranges, desired, flat)
        .or_else(|| closest_fps_range(&available_ranges, desired, false))
    {
        template.set(tags::CONTROL_AE_TARGET_FPS_RANGE, range.to_vec());
    }

    let af_preferred = match kind {
        TemplateKind::VideoRecord | TemplateKind::VideoSnapshot => {
            [values::AF_MODE_CONTINUOUS_VIDEO, values::AF_MODE_AUTO]
        }
        _ => [values::AF_MODE_CONTINUOUS_PICTURE, values::AF_MODE_AUTO],
    };
    template.set_one(
        tags::CONTROL_AF_MODE,
        pick_mode(
            static_info,
            tags::CONTROL_AF_AVAILABLE_MODES,
            &af_preferred,
            values::AF_MODE_OFF,
        ),
    );

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_ids_map_into_the_valid_window() {
        assert!(TemplateKind::from_id(0).is_none());
        assert!(TemplateKind::from_id(TEMPLATE_COUNT).is_none());
        for id in 1..TEMPLATE_COUNT {
            assert_eq!(TemplateKind::from_id(id).unwrap().id(), id);
        }
    }

    #[test]
    fn unsupported_templates_are_zsl_and_manual() {
        assert!(TemplateKind::Preview.is_supported());
        assert!(TemplateKind::StillCapture.is_supported());
        assert!(!TemplateKind::ZeroShutterLag.is_supported());
        assert!(!TemplateKind::Manual.is_supported());
    }

    #[test]
    fn flat_selection_requires_equal_endpoints() {
        let available = [[15, 30], [30, 30], [15, 15]];
        assert_eq!(closest_fps_range(&available, [30, 30], true), Some([30, 30]));
        assert_eq!(closest_fps_range(&available, [5, 30], false), Some([15, 30]));
        // No flat range at all.
        assert_eq!(closest_fps_range(&[[15, 30]], [30, 30], true), None);
    }

    #[test]
    fn l1_distance_breaks_ties_toward_the_closest() {
        let available = [[10, 10], [28, 28], [60, 60]];
        assert_eq!(closest_fps_range(&available, [30, 30], true), Some([28, 28]));
    }
}
