//! The partial metadata contract.

use iris_core::prelude::{MetadataBlock, Result, Tag};

/// A self-contained unit owning a subset of metadata tags.
///
/// Components expose up to three tag sets: static tags filled into the
/// camera characteristics, control tags read/written through capture
/// requests, and dynamic tags emitted into per-frame results. Distinct
/// components registered with one [`crate::registry::Metadata`] must own
/// pairwise disjoint tag sets.
pub trait PartialMetadata: Send + Sync {
    /// Static tags this component owns.
    fn static_tags(&self) -> &[Tag];

    /// Control tags this component owns.
    fn control_tags(&self) -> &[Tag];

    /// Dynamic tags this component owns.
    fn dynamic_tags(&self) -> &[Tag];

    /// Write every static tag this component owns. A no-op returning
    /// success when the component has no static tags.
    fn populate_static(&self, out: &mut MetadataBlock) -> Result<()>;

    /// Write current values for the dynamic tags, typically by reading the
    /// underlying device control.
    fn populate_dynamic(&self, out: &mut MetadataBlock) -> Result<()>;

    /// Write a sensible default for the given template id.
    fn populate_template(&self, template_id: i32, out: &mut MetadataBlock) -> Result<()>;

    /// Whether the request's values for this component's control tags are
    /// all supported. Missing tags mean "no request" and are supported; an
    /// empty block is implicitly supported.
    fn supports_request_values(&self, request: &MetadataBlock) -> bool;

    /// Validate and write through the request's values for this
    /// component's control tags. Missing tags mean "no change".
    fn set_request_values(&self, request: &MetadataBlock) -> Result<()>;
}
