//! Immutable static properties.

use iris_core::prelude::{MetadataBlock, Result, Tag, TagData};

use crate::component::PartialMetadata;

/// A partial metadata with a single static tag and a value fixed at
/// creation.
pub struct FixedProperty<T> {
    tag: [Tag; 1],
    value: Vec<T>,
}

impl<T: TagData> FixedProperty<T> {
    pub fn new(tag: Tag, value: impl Into<Vec<T>>) -> Self {
        Self {
            tag: [tag],
            value: value.into(),
        }
    }

    /// Single-element property.
    pub fn one(tag: Tag, value: T) -> Self {
        Self::new(tag, vec![value])
    }
}

impl<T: TagData + Send + Sync> PartialMetadata for FixedProperty<T> {
    fn static_tags(&self) -> &[Tag] {
        &self.tag
    }

    fn control_tags(&self) -> &[Tag] {
        &[]
    }

    fn dynamic_tags(&self) -> &[Tag] {
        &[]
    }

    fn populate_static(&self, out: &mut MetadataBlock) -> Result<()> {
        out.set(self.tag[0], self.value.clone());
        Ok(())
    }

    fn populate_dynamic(&self, _out: &mut MetadataBlock) -> Result<()> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::tags;

    #[test]
    fn property_fills_only_static_metadata() {
        let property = FixedProperty::new(tags::CONTROL_MAX_REGIONS, vec![0i32, 0, 0]);
        assert_eq!(property.static_tags(), &[tags::CONTROL_MAX_REGIONS]);
        assert!(property.control_tags().is_empty());
        assert!(property.dynamic_tags().is_empty());

        let mut stat = MetadataBlock::new();
        property.populate_static(&mut stat).unwrap();
        assert_eq!(
            stat.all::<i32>(tags::CONTROL_MAX_REGIONS).unwrap(),
            Some(&[0, 0, 0][..])
        );

        let mut dynamic = MetadataBlock::new();
        property.populate_dynamic(&mut dynamic).unwrap();
        assert!(dynamic.is_empty());
    }

    #[test]
    fn property_accepts_any_request() {
        let property = FixedProperty::one(tags::SENSOR_ORIENTATION, 0i32);
        let mut request = MetadataBlock::new();
        request.set_one(tags::SENSOR_ORIENTATION, 90i32);
        assert!(property.supports_request_values(&request));
        property.set_request_values(&request).unwrap();
    }
}
