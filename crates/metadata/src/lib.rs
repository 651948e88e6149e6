#![doc = include_str!("../README.md")]

pub mod component;
pub mod control;
pub mod delegate;
pub mod enum_control;
pub mod options;
pub mod property;
pub mod registry;

pub mod prelude {
    pub use crate::component::PartialMetadata;
    pub use crate::control::Control;
    pub use crate::delegate::{ControlDelegate, NoEffectDelegate, TaggedDelegate};
    pub use crate::enum_control::{enum_control, enum_control_or_ignored};
    pub use crate::options::{ControlOptions, MenuOptions, SliderOptions, TaggedOptions};
    pub use crate::property::FixedProperty;
    pub use crate::registry::Metadata;
    pub use iris_core::prelude::*;
}
