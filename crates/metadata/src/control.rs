//! A control: partial metadata whose value can be read and written.

use smallvec::SmallVec;
use tracing::{debug, warn};

use iris_core::prelude::{Error, MetadataBlock, Result, Tag, TagCodec};

use crate::component::PartialMetadata;
use crate::delegate::{NoEffectDelegate, TaggedDelegate};
use crate::options::{ControlOptions, MenuOptions, TaggedOptions};

/// A [`PartialMetadata`] with a gettable/settable value.
///
/// The delegate is mandatory; options are optional. With options present
/// the control owns one static tag (the advertised option set) in addition
/// to its control/dynamic tag.
pub struct Control<T> {
    delegate: TaggedDelegate<T>,
    options: Option<TaggedOptions<T>>,
    static_tags: SmallVec<[Tag; 1]>,
    request_tags: SmallVec<[Tag; 1]>,
}

impl<T: TagCodec + 'static> Control<T> {
    pub fn new(delegate: TaggedDelegate<T>, options: Option<TaggedOptions<T>>) -> Self {
        let static_tags = options.iter().map(|o| o.tag()).collect();
        let request_tags = SmallVec::from_slice(&[delegate.tag()]);
        Self {
            delegate,
            options,
            static_tags,
            request_tags,
        }
    }

    /// An ignored control: a fixed option list plus a default; writes are
    /// validated, recorded, and otherwise discarded.
    pub fn ignored(control_tag: Tag, options_tag: Tag, options: Vec<T>, default: T) -> Self {
        Self::new(
            TaggedDelegate::new(control_tag, Box::new(NoEffectDelegate::new(default))),
            Some(TaggedOptions::new(
                options_tag,
                Box::new(MenuOptions::new(options)),
            )),
        )
    }

    /// An ignored menu control defaulting to the first option.
    ///
    /// Fails when `options` is empty.
    pub fn no_effect_menu(control_tag: Tag, options_tag: Tag, options: Vec<T>) -> Result<Self> {
        let Some(default) = options.first().cloned() else {
            return Err(Error::InvalidArgument(
                "at least one option must be provided".into(),
            ));
        };
        Ok(Self::ignored(control_tag, options_tag, options, default))
    }

    /// The requested value for this control, if any.
    fn requested(&self, request: &MetadataBlock) -> Result<Option<T>> {
        T::read(request, self.delegate.tag())
    }
}

impl<T: TagCodec + 'static> PartialMetadata for Control<T> {
    fn static_tags(&self) -> &[Tag] {
        &self.static_tags
    }

    fn control_tags(&self) -> &[Tag] {
        &self.request_tags
    }

    fn dynamic_tags(&self) -> &[Tag] {
        &self.request_tags
    }

    fn populate_static(&self, out: &mut MetadataBlock) -> Result<()> {
        if let Some(options) = &self.options {
            T::write_list(out, options.tag(), &options.metadata_representation());
        }
        Ok(())
    }

    fn populate_dynamic(&self, out: &mut MetadataBlock) -> Result<()> {
        let value = self.delegate.get()?;
        T::write(out, self.delegate.tag(), &value);
        Ok(())
    }

    fn populate_template(&self, template_id: i32, out: &mut MetadataBlock) -> Result<()> {
        let value = match &self.options {
            Some(options) => match options.default_for_template(template_id) {
                Ok(value) => value,
                // Options with no opinion defer to the current device value.
                Err(Error::NotSupported(_)) => self.delegate.get()?,
                Err(err) => return Err(err),
            },
            None => self.delegate.get()?,
        };
        T::write(out, self.delegate.tag(), &value);
        Ok(())
    }

    fn supports_request_values(&self, request: &MetadataBlock) -> bool {
        if request.is_empty() {
            return true;
        }
        match self.requested(request) {
            // Nothing requested of this control, that's fine.
            Ok(None) => true,
            Ok(Some(value)) => match &self.options {
                Some(options) => options.is_supported(&value),
                None => {
                    debug!(tag = %self.delegate.tag(), "no options; implicitly supported");
                    true
                }
            },
            Err(err) => {
                warn!(tag = %self.delegate.tag(), %err, "malformed request value");
                false
            }
        }
    }

    fn set_request_values(&self, request: &MetadataBlock) -> Result<()> {
        if request.is_empty() {
            return Ok(());
        }
        let Some(value) = self.requested(request)? else {
            return Ok(());
        };
        if let Some(options) = &self.options
            && !options.is_supported(&value)
        {
            return Err(Error::InvalidArgument(format!(
                "unsupported value requested for control {}",
                self.delegate.tag()
            )));
        }
        self.delegate.set(&value)
    }
}
