#![doc = include_str!("../README.md")]

pub mod error;
pub mod format;
pub mod metadata;
pub mod queue;
pub mod tags;

pub mod prelude {
    pub use crate::{
        error::{Error, Result},
        format::FourCc,
        metadata::{MetadataBlock, Rational, Tag, TagCodec, TagData, TagValue, ValueKind},
        queue::{BoundedRx, BoundedTx, RecvOutcome, SendOutcome, bounded},
    };
}
