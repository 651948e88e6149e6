//! Acceptable-value providers for controls.

use iris_core::prelude::{Error, Result, Tag};

/// The supported option set of a control.
pub trait ControlOptions<T>: Send + Sync {
    /// How the option set is represented in static metadata.
    fn metadata_representation(&self) -> Vec<T>;

    /// Whether a requested value is acceptable.
    fn is_supported(&self, value: &T) -> bool;

    /// Default value for a request template.
    fn default_for_template(&self, template_id: i32) -> Result<T>;
}

/// An explicit list of acceptable values; the metadata representation is
/// the list itself.
pub struct MenuOptions<T> {
    options: Vec<T>,
}

impl<T> MenuOptions<T> {
    pub fn new(options: Vec<T>) -> Self {
        Self { options }
    }
}

impl<T: Clone + PartialEq + Send + Sync> ControlOptions<T> for MenuOptions<T> {
    fn metadata_representation(&self) -> Vec<T> {
        self.options.clone()
    }

    fn is_supported(&self, value: &T) -> bool {
        self.options.contains(value)
    }

    fn default_for_template(&self, _template_id: i32) -> Result<T> {
        // Every template defaults to the first option.
        match self.options.first() {
            Some(option) => Ok(option.clone()),
            None => Err(Error::NoDevice(
                "can't get default value, options are empty".into(),
            )),
        }
    }
}

/// An inclusive range of acceptable values, represented as `[min, max]`.
pub struct SliderOptions<T> {
    min: T,
    max: T,
}

impl<T> SliderOptions<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Clone + PartialOrd + Send + Sync> ControlOptions<T> for SliderOptions<T> {
    fn metadata_representation(&self) -> Vec<T> {
        vec![self.min.clone(), self.max.clone()]
    }

    fn is_supported(&self, value: &T) -> bool {
        *value >= self.min && *value <= self.max
    }

    fn default_for_template(&self, _template_id: i32) -> Result<T> {
        // No preferred point in the range; callers fall back to the device.
        Err(Error::NotSupported(
            "slider options have no template default".into(),
        ))
    }
}

/// Options paired with the static tag advertising them.
pub struct TaggedOptions<T> {
    tag: Tag,
    inner: Box<dyn ControlOptions<T>>,
}

impl<T> TaggedOptions<T> {
    pub fn new(tag: Tag, inner: Box<dyn ControlOptions<T>>) -> Self {
        Self { tag, inner }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn metadata_representation(&self) -> Vec<T> {
        self.inner.metadata_representation()
    }

    pub fn is_supported(&self, value: &T) -> bool {
        self.inner.is_supported(value)
    }

    pub fn default_for_template(&self, template_id: i32) -> Result<T> {
        self.inner.default_for_template(template_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_template_defaults_stay_in_the_option_set() {
        let options = MenuOptions::new(vec![1i32, 10, 19, 30]);
        for template_id in 1..=5 {
            let default = options.default_for_template(template_id).unwrap();
            assert!(options.is_supported(&default), "template {template_id}");
        }
    }

    #[test]
    fn empty_menu_has_no_default_for_any_template() {
        let options = MenuOptions::new(Vec::<i32>::new());
        for template_id in 1..=5 {
            assert!(matches!(
                options.default_for_template(template_id),
                Err(Error::NoDevice(_))
            ));
        }
    }

    #[test]
    fn menu_supports_exactly_its_options() {
        let options = MenuOptions::new(vec![1u8, 3]);
        assert!(options.is_supported(&1));
        assert!(options.is_supported(&3));
        assert!(!options.is_supported(&2));
    }

    #[test]
    fn slider_covers_the_inclusive_range() {
        let options = SliderOptions::new(10i32, 20);
        assert!(options.is_supported(&10));
        assert!(options.is_supported(&20));
        assert!(!options.is_supported(&9));
        assert!(!options.is_supported(&21));
        assert_eq!(options.metadata_representation(), vec![10, 20]);
    }

    #[test]
    fn slider_defers_template_defaults() {
        let options = SliderOptions::new(0.5f32, 2.0);
        assert!(matches!(
            options.default_for_template(1),
            Err(Error::NotSupported(_))
        ));
    }
}
