//! The metadata registry: an ordered sequence of partial components.

use std::collections::HashSet;

use tracing::error;

use iris_core::prelude::{MetadataBlock, Result, Tag};
use iris_core::tags;

use crate::component::PartialMetadata;

/// Aggregates partial metadata components and dispatches fill, validate,
/// and apply operations across them.
///
/// The sequence is mutated only during construction via
/// [`Metadata::add_component`]; once the camera is initialized it is
/// immutable and shared read-only.
#[derive(Default)]
pub struct Metadata {
    components: Vec<Box<dyn PartialMetadata>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component. Components must own pairwise disjoint tag sets;
    /// sharing a tag between two components is undefined behavior.
    pub fn add_component(&mut self, component: Box<dyn PartialMetadata>) {
        self.components.push(component);
    }

    /// Whether every pair of components owns disjoint tags.
    pub fn has_disjoint_tags(&self) -> bool {
        let mut seen = HashSet::new();
        for component in &self.components {
            for tag in component
                .static_tags()
                .iter()
                .chain(component.control_tags())
                .chain(component.dynamic_tags())
            {
                if !seen.insert(*tag) {
                    return false;
                }
            }
        }
        true
    }

    /// Fill the static characteristics, appending the available-keys meta
    /// entries derived from what the components own.
    pub fn fill_static(&self, out: &mut MetadataBlock) -> Result<()> {
        let mut static_tags: Vec<i32> = Vec::new();
        let mut control_tags: Vec<i32> = Vec::new();
        let mut dynamic_tags: Vec<i32> = Vec::new();

        for component in &self.components {
            component.populate_static(out).inspect_err(|err| {
                error!(%err, "failed to get all static properties");
            })?;
            static_tags.extend(component.static_tags().iter().map(|t| t.0 as i32));
            control_tags.extend(component.control_tags().iter().map(|t| t.0 as i32));
            dynamic_tags.extend(component.dynamic_tags().iter().map(|t| t.0 as i32));
        }

        static_tags.push(tags::REQUEST_AVAILABLE_REQUEST_KEYS.0 as i32);
        out.set(tags::REQUEST_AVAILABLE_REQUEST_KEYS, control_tags);
        static_tags.push(tags::REQUEST_AVAILABLE_RESULT_KEYS.0 as i32);
        out.set(tags::REQUEST_AVAILABLE_RESULT_KEYS, dynamic_tags);
        // The characteristics-keys entry lists itself as well.
        static_tags.push(tags::REQUEST_AVAILABLE_CHARACTERISTICS_KEYS.0 as i32);
        out.set(tags::REQUEST_AVAILABLE_CHARACTERISTICS_KEYS, static_tags);
        Ok(())
    }

    /// Fill per-frame result metadata from every component.
    pub fn fill_result(&self, out: &mut MetadataBlock) -> Result<()> {
        for component in &self.components {
            component.populate_dynamic(out).inspect_err(|err| {
                error!(%err, "failed to get all dynamic result fields");
            })?;
        }
        Ok(())
    }

    /// Fill a default request for the given template id.
    pub fn fill_template(&self, template_id: i32, out: &mut MetadataBlock) -> Result<()> {
        for component in &self.components {
            component.populate_template(template_id, out)?;
        }
        Ok(())
    }

    /// Whether every component accepts its slice of the request.
    ///
    /// An empty block means "use previous settings", which is inherently
    /// valid.
    pub fn is_valid_request(&self, request: &MetadataBlock) -> bool {
        if request.is_empty() {
            return true;
        }
        self.components
            .iter()
            .all(|component| component.supports_request_values(request))
    }

    /// Write the request through every component; the first failure
    /// short-circuits and is reported.
    pub fn apply_request(&self, request: &MetadataBlock) -> Result<()> {
        if request.is_empty() {
            return Ok(());
        }
        for component in &self.components {
            component.set_request_values(request).inspect_err(|err| {
                error!(%err, "failed to set all requested settings");
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::property::FixedProperty;

    fn registry() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.add_component(Box::new(FixedProperty::one(tags::SENSOR_ORIENTATION, 0i32)));
        metadata.add_component(Box::new(Control::ignored(
            tags::EDGE_MODE,
            tags::EDGE_AVAILABLE_EDGE_MODES,
            vec![1u8, 2],
            1,
        )));
        metadata.add_component(Box::new(Control::ignored(
            tags::SHADING_MODE,
            tags::SHADING_AVAILABLE_MODES,
            vec![1u8],
            1,
        )));
        metadata
    }

    #[test]
    fn component_tags_are_disjoint() {
        assert!(registry().has_disjoint_tags());

        let mut clashing = registry();
        clashing.add_component(Box::new(FixedProperty::one(tags::SENSOR_ORIENTATION, 0i32)));
        assert!(!clashing.has_disjoint_tags());
    }

    #[test]
    fn static_fill_appends_available_key_lists() {
        let metadata = registry();
        let mut stat = MetadataBlock::new();
        metadata.fill_static(&mut stat).unwrap();

        let request_keys = stat
            .all::<i32>(tags::REQUEST_AVAILABLE_REQUEST_KEYS)
            .unwrap()
            .unwrap();
        assert!(request_keys.contains(&(tags::EDGE_MODE.0 as i32)));
        assert!(request_keys.contains(&(tags::SHADING_MODE.0 as i32)));

        let result_keys = stat
            .all::<i32>(tags::REQUEST_AVAILABLE_RESULT_KEYS)
            .unwrap()
            .unwrap();
        assert!(result_keys.contains(&(tags::EDGE_MODE.0 as i32)));

        let characteristics_keys = stat
            .all::<i32>(tags::REQUEST_AVAILABLE_CHARACTERISTICS_KEYS)
            .unwrap()
            .unwrap();
        assert!(
            characteristics_keys.contains(&(tags::REQUEST_AVAILABLE_CHARACTERISTICS_KEYS.0 as i32))
        );
        assert!(characteristics_keys.contains(&(tags::SENSOR_ORIENTATION.0 as i32)));
    }

    #[test]
    fn empty_request_is_valid_and_applies_cleanly() {
        let metadata = registry();
        let empty = MetadataBlock::new();
        assert!(metadata.is_valid_request(&empty));
        metadata.apply_request(&empty).unwrap();
    }

    #[test]
    fn invalid_request_leaves_state_untouched() {
        let metadata = registry();
        let mut request = MetadataBlock::new();
        request.set_one(tags::EDGE_MODE, 9u8);
        assert!(!metadata.is_valid_request(&request));
        assert!(metadata.apply_request(&request).is_err());

        // The rejected write must not have reached the delegate.
        let mut result = MetadataBlock::new();
        metadata.fill_result(&mut result).unwrap();
        assert_eq!(result.one::<u8>(tags::EDGE_MODE).unwrap(), Some(1));
    }

    #[test]
    fn valid_request_round_trips_through_results() {
        let metadata = registry();
        let mut request = MetadataBlock::new();
        request.set_one(tags::EDGE_MODE, 2u8);
        assert!(metadata.is_valid_request(&request));
        metadata.apply_request(&request).unwrap();

        let mut result = MetadataBlock::new();
        metadata.fill_result(&mut result).unwrap();
        assert_eq!(result.one::<u8>(tags::EDGE_MODE).unwrap(), Some(2));
        assert_eq!(result.one::<u8>(tags::SHADING_MODE).unwrap(), Some(1));
    }

    #[test]
    fn templates_collect_defaults_from_every_control() {
        let metadata = registry();
        let mut template = MetadataBlock::new();
        metadata.fill_template(1, &mut template).unwrap();
        assert_eq!(template.one::<u8>(tags::EDGE_MODE).unwrap(), Some(1));
        assert_eq!(template.one::<u8>(tags::SHADING_MODE).unwrap(), Some(1));
        assert!(!template.contains(tags::SENSOR_ORIENTATION));
    }
}
