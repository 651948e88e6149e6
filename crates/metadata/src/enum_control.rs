//! Controls backed by a V4L2 menu control through a bidirectional value map.

use std::sync::Arc;

use tracing::warn;

use iris_core::prelude::{Error, Result, Tag};
use iris_v4l2::ioctl::V4L2_CTRL_TYPE_MENU;
use iris_v4l2::wrapper::V4l2Wrapper;

use crate::component::PartialMetadata;
use crate::control::Control;
use crate::delegate::{ControlDelegate, TaggedDelegate};
use crate::options::{MenuOptions, TaggedOptions};

/// Delegate translating metadata values to V4L2 control values and back.
struct EnumDelegate {
    device: Arc<V4l2Wrapper>,
    v4l2_control: u32,
    v4l2_to_metadata: Vec<(i32, u8)>,
}

impl EnumDelegate {
    fn to_metadata(&self, v4l2_value: i32) -> Option<u8> {
        self.v4l2_to_metadata
            .iter()
            .find(|(v, _)| *v == v4l2_value)
            .map(|&(_, m)| m)
    }

    fn to_v4l2(&self, metadata_value: u8) -> Option<i32> {
        self.v4l2_to_metadata
            .iter()
            .find(|(_, m)| *m == metadata_value)
            .map(|&(v, _)| v)
    }
}

impl ControlDelegate<u8> for EnumDelegate {
    fn get(&self) -> Result<u8> {
        let v4l2_value = self.device.get_control(self.v4l2_control)?;
        self.to_metadata(v4l2_value).ok_or_else(|| {
            Error::NoDevice(format!(
                "unknown value {v4l2_value} for control {:#x}",
                self.v4l2_control
            ))
        })
    }

    fn set(&self, value: &u8) -> Result<()> {
        let v4l2_value = self.to_v4l2(*value).ok_or_else(|| {
            Error::NoDevice(format!(
                "no V4L2 conversion for valid control value {value}"
            ))
        })?;
        self.device.set_control(self.v4l2_control, v4l2_value)?;
        Ok(())
    }
}

/// Build a control mapping a V4L2 menu control onto a metadata enum.
///
/// The driver is queried for the control's valid range; mapped values
/// outside it are filtered out. Fails when the control is missing, is not
/// a menu, or no mapping survives filtering — callers typically fall back
/// to an ignored control with one synthetic default.
pub fn enum_control(
    device: Arc<V4l2Wrapper>,
    v4l2_control: u32,
    control_tag: Tag,
    options_tag: Tag,
    v4l2_to_metadata: &[(i32, u8)],
) -> Result<Control<u8>> {
    let query = device.query_control(v4l2_control)?;
    if query.kind != V4L2_CTRL_TYPE_MENU {
        return Err(Error::NotSupported(format!(
            "control {v4l2_control:#x} is not a menu (type {})",
            query.kind
        )));
    }

    // Walk the driver's inclusive range, keeping mapped options only.
    let mut options = Vec::new();
    let step = query.step.max(1) as i64;
    let mut v4l2_value = query.minimum;
    while v4l2_value <= query.maximum {
        match v4l2_to_metadata
            .iter()
            .find(|(v, _)| *v as i64 == v4l2_value)
        {
            Some(&(_, metadata_value)) => options.push(metadata_value),
            None => {
                warn!(control = v4l2_control, value = v4l2_value, "unmapped option")
            }
        }
        v4l2_value += step;
    }
    if options.is_empty() {
        return Err(Error::NotSupported(format!(
            "no supported options for control {v4l2_control:#x}"
        )));
    }

    Ok(Control::new(
        TaggedDelegate::new(
            control_tag,
            Box::new(EnumDelegate {
                device,
                v4l2_control,
                v4l2_to_metadata: v4l2_to_metadata.to_vec(),
            }),
        ),
        Some(TaggedOptions::new(
            options_tag,
            Box::new(MenuOptions::new(options)),
        )),
    ))
}

/// An enum control when the device supports it, otherwise an ignored
/// control with a single synthetic default.
pub fn enum_control_or_ignored(
    device: Arc<V4l2Wrapper>,
    v4l2_control: u32,
    control_tag: Tag,
    options_tag: Tag,
    v4l2_to_metadata: &[(i32, u8)],
    default: u8,
) -> Box<dyn PartialMetadata> {
    match enum_control(
        device,
        v4l2_control,
        control_tag,
        options_tag,
        v4l2_to_metadata,
    ) {
        Ok(control) => Box::new(control),
        Err(err) => {
            warn!(control = v4l2_control, %err, "falling back to ignored control");
            Box::new(Control::ignored(
                control_tag,
                options_tag,
                vec![default],
                default,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::prelude::MetadataBlock;
    use iris_core::tags;
    use iris_v4l2::fake::{FakeControl, FakeDevice};
    use iris_v4l2::ioctl::V4L2_CTRL_TYPE_INTEGER;

    const CID: u32 = 0x0098_0918;
    const MAP: [(i32, u8); 3] = [(0, 10), (1, 11), (3, 13)];

    fn connected(device: &FakeDevice) -> Arc<V4l2Wrapper> {
        let wrapper = Arc::new(device.wrapper());
        wrapper.connect().unwrap();
        wrapper
    }

    #[test]
    fn unmapped_driver_values_are_filtered() {
        let device = FakeDevice::new();
        // Range 0..=3; value 2 has no mapping and must be dropped.
        device.add_control(CID, FakeControl::menu(0, 3, 1));
        let wrapper = connected(&device);

        let control = enum_control(
            wrapper,
            CID,
            tags::CONTROL_AE_ANTIBANDING_MODE,
            tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES,
            &MAP,
        )
        .unwrap();

        let mut stat = MetadataBlock::new();
        control.populate_static(&mut stat).unwrap();
        assert_eq!(
            stat.all::<u8>(tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES)
                .unwrap(),
            Some(&[10u8, 11, 13][..])
        );
    }

    #[test]
    fn values_translate_both_ways() {
        let device = FakeDevice::new();
        device.add_control(CID, FakeControl::menu(0, 3, 1));
        let wrapper = connected(&device);

        let control = enum_control(
            wrapper,
            CID,
            tags::CONTROL_AE_ANTIBANDING_MODE,
            tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES,
            &MAP,
        )
        .unwrap();

        let mut request = MetadataBlock::new();
        request.set_one(tags::CONTROL_AE_ANTIBANDING_MODE, 13u8);
        control.set_request_values(&request).unwrap();
        assert_eq!(device.control_value(CID), Some(3));

        let mut result = MetadataBlock::new();
        control.populate_dynamic(&mut result).unwrap();
        assert_eq!(
            result.one::<u8>(tags::CONTROL_AE_ANTIBANDING_MODE).unwrap(),
            Some(13)
        );
    }

    #[test]
    fn non_menu_controls_are_rejected() {
        let device = FakeDevice::new();
        device.add_control(
            CID,
            FakeControl {
                typ: V4L2_CTRL_TYPE_INTEGER,
                minimum: 0,
                maximum: 3,
                step: 1,
                default_value: 0,
                value: 0,
            },
        );
        let wrapper = connected(&device);
        assert!(matches!(
            enum_control(
                wrapper,
                CID,
                tags::CONTROL_AE_ANTIBANDING_MODE,
                tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES,
                &MAP,
            ),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn fallback_installs_an_ignored_control() {
        let device = FakeDevice::new();
        // No such control on the device at all.
        let wrapper = connected(&device);
        let component = enum_control_or_ignored(
            wrapper,
            CID,
            tags::CONTROL_AE_ANTIBANDING_MODE,
            tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES,
            &MAP,
            11,
        );

        let mut stat = MetadataBlock::new();
        component.populate_static(&mut stat).unwrap();
        assert_eq!(
            stat.all::<u8>(tags::CONTROL_AE_AVAILABLE_ANTIBANDING_MODES)
                .unwrap(),
            Some(&[11u8][..])
        );
        let mut dynamic = MetadataBlock::new();
        component.populate_dynamic(&mut dynamic).unwrap();
        assert_eq!(
            dynamic.one::<u8>(tags::CONTROL_AE_ANTIBANDING_MODE).unwrap(),
            Some(11)
        );
    }

}
