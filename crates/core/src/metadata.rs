//! Tagged metadata blocks.
//!
//! A metadata block is an ordered map from 32-bit tags to typed value
//! arrays. Tags are partitioned into sections (see [`crate::tags`]); within
//! one block a tag appears at most once.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// A 32-bit metadata tag: section in the high half, index in the low half.
///
/// # Example
/// ```rust
/// use iris_core::prelude::Tag;
///
/// let tag = Tag::new(3, 7);
/// assert_eq!(tag.section(), 3);
/// assert_eq!(tag.index(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag(pub u32);

impl Tag {
    /// Build a tag from a section and an index within it.
    pub const fn new(section: u16, index: u16) -> Self {
        Tag(((section as u32) << 16) | index as u32)
    }

    /// Section this tag belongs to.
    pub const fn section(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Index within the section.
    pub const fn index(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Signed rational, the sixth metadata base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rational {
    pub numerator: i32,
    pub denominator: i32,
}

/// Base type discriminant for a metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Byte,
    Int32,
    Int64,
    Float,
    Double,
    Rational,
}

/// A typed value array stored under one tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagValue {
    Byte(Vec<u8>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Rational(Vec<Rational>),
}

impl TagValue {
    /// Number of elements in the entry.
    pub fn count(&self) -> usize {
        match self {
            TagValue::Byte(v) => v.len(),
            TagValue::Int32(v) => v.len(),
            TagValue::Int64(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
            TagValue::Rational(v) => v.len(),
        }
    }

    /// Base type of the entry.
    pub fn kind(&self) -> ValueKind {
        match self {
            TagValue::Byte(_) => ValueKind::Byte,
            TagValue::Int32(_) => ValueKind::Int32,
            TagValue::Int64(_) => ValueKind::Int64,
            TagValue::Float(_) => ValueKind::Float,
            TagValue::Double(_) => ValueKind::Double,
            TagValue::Rational(_) => ValueKind::Rational,
        }
    }
}

/// Rust types storable in a metadata entry.
pub trait TagData: Sized + Clone + PartialEq {
    const KIND: ValueKind;

    fn wrap(values: Vec<Self>) -> TagValue;
    fn unwrap(value: &TagValue) -> Option<&[Self]>;
}

macro_rules! impl_tag_data {
    ($ty:ty, $variant:ident) => {
        impl TagData for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn wrap(values: Vec<Self>) -> TagValue {
                TagValue::$variant(values)
            }

            fn unwrap(value: &TagValue) -> Option<&[Self]> {
                match value {
                    TagValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl TagCodec for $ty {
            fn read(block: &MetadataBlock, tag: Tag) -> crate::error::Result<Option<Self>> {
                block.one::<$ty>(tag)
            }

            fn write(block: &mut MetadataBlock, tag: Tag, value: &Self) {
                block.set_one(tag, value.clone());
            }

            fn write_list(block: &mut MetadataBlock, tag: Tag, values: &[Self]) {
                block.set(tag, values.to_vec());
            }
        }
    };
}

impl_tag_data!(u8, Byte);
impl_tag_data!(i32, Int32);
impl_tag_data!(i64, Int64);
impl_tag_data!(f32, Float);
impl_tag_data!(f64, Double);
impl_tag_data!(Rational, Rational);

/// Values that read and write themselves as one logical metadata entry.
///
/// Scalars occupy single-element entries; `[T; N]` arrays flatten into one
/// N-element entry (an FPS range is one `int32[2]` entry, not two).
pub trait TagCodec: Sized + Clone + PartialEq + Send + Sync {
    fn read(block: &MetadataBlock, tag: Tag) -> crate::error::Result<Option<Self>>;
    fn write(block: &mut MetadataBlock, tag: Tag, value: &Self);
    /// Write a list of values as one flattened entry.
    fn write_list(block: &mut MetadataBlock, tag: Tag, values: &[Self]);
}

impl<T: TagData + Send + Sync, const N: usize> TagCodec for [T; N] {
    fn read(block: &MetadataBlock, tag: Tag) -> crate::error::Result<Option<Self>> {
        block.array::<T, N>(tag)
    }

    fn write(block: &mut MetadataBlock, tag: Tag, value: &Self) {
        block.set(tag, value.to_vec());
    }

    fn write_list(block: &mut MetadataBlock, tag: Tag, values: &[Self]) {
        let flat: Vec<T> = values.iter().flat_map(|v| v.iter().cloned()).collect();
        block.set(tag, flat);
    }
}

/// An ordered tag→value map.
///
/// # Example
/// ```rust
/// use iris_core::prelude::{MetadataBlock, Tag};
///
/// let mut block = MetadataBlock::new();
/// block.set_one(Tag::new(1, 2), 42i32);
/// assert_eq!(block.one::<i32>(Tag::new(1, 2)).unwrap(), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetadataBlock {
    entries: BTreeMap<u32, TagValue>,
}

impl MetadataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag.0)
    }

    /// Tags present in the block, in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().map(|&raw| Tag(raw))
    }

    /// Raw entry lookup.
    pub fn find(&self, tag: Tag) -> Option<&TagValue> {
        self.entries.get(&tag.0)
    }

    /// Replace (or insert) the entry for `tag`.
    pub fn set<T: TagData>(&mut self, tag: Tag, values: impl Into<Vec<T>>) {
        self.entries.insert(tag.0, T::wrap(values.into()));
    }

    /// Replace (or insert) a single-element entry.
    pub fn set_one<T: TagData>(&mut self, tag: Tag, value: T) {
        self.set(tag, vec![value]);
    }

    /// Typed slice access.
    ///
    /// `Ok(None)` when the tag is absent; `InvalidArgument` when the entry
    /// exists with a different base type.
    pub fn all<T: TagData>(&self, tag: Tag) -> Result<Option<&[T]>> {
        match self.find(tag) {
            None => Ok(None),
            Some(value) => T::unwrap(value).map(Some).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "tag {tag} holds {:?}, expected {:?}",
                    value.kind(),
                    T::KIND
                ))
            }),
        }
    }

    /// Single-value access; the entry must contain exactly one element.
    pub fn one<T: TagData>(&self, tag: Tag) -> Result<Option<T>> {
        match self.all::<T>(tag)? {
            None => Ok(None),
            Some([value]) => Ok(Some(value.clone())),
            Some(values) => Err(Error::InvalidArgument(format!(
                "tag {tag} expected 1 value, found {}",
                values.len()
            ))),
        }
    }

    /// Fixed-arity access, for paired entries such as FPS ranges.
    pub fn array<T: TagData, const N: usize>(&self, tag: Tag) -> Result<Option<[T; N]>> {
        match self.all::<T>(tag)? {
            None => Ok(None),
            Some(values) => {
                let arr: [T; N] = values.to_vec().try_into().map_err(|_| {
                    Error::InvalidArgument(format!(
                        "tag {tag} expected {N} values, found {}",
                        values.len()
                    ))
                })?;
                Ok(Some(arr))
            }
        }
    }

    /// Overlay every entry of `other` onto this block.
    pub fn merge(&mut self, other: &MetadataBlock) {
        for (&raw, value) in &other.entries {
            self.entries.insert(raw, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_A: Tag = Tag::new(1, 1);
    const TAG_B: Tag = Tag::new(1, 2);

    #[test]
    fn tag_appears_at_most_once() {
        let mut block = MetadataBlock::new();
        block.set_one(TAG_A, 1i32);
        block.set_one(TAG_A, 2i32);
        assert_eq!(block.len(), 1);
        assert_eq!(block.one::<i32>(TAG_A).unwrap(), Some(2));
    }

    #[test]
    fn typed_access_rejects_wrong_kind() {
        let mut block = MetadataBlock::new();
        block.set_one(TAG_A, 5u8);
        assert!(block.one::<i32>(TAG_A).is_err());
        assert_eq!(block.one::<u8>(TAG_B).unwrap(), None);
    }

    #[test]
    fn one_rejects_multi_element_entries() {
        let mut block = MetadataBlock::new();
        block.set(TAG_A, vec![1i32, 2, 3]);
        assert!(block.one::<i32>(TAG_A).is_err());
        assert_eq!(block.all::<i32>(TAG_A).unwrap(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn array_access_checks_arity() {
        let mut block = MetadataBlock::new();
        block.set(TAG_A, vec![15i32, 30]);
        assert_eq!(block.array::<i32, 2>(TAG_A).unwrap(), Some([15, 30]));
        assert!(block.array::<i32, 3>(TAG_A).is_err());
    }

    #[test]
    fn merge_overlays_existing_entries() {
        let mut base = MetadataBlock::new();
        base.set_one(TAG_A, 1i32);
        base.set_one(TAG_B, 2i32);
        let mut overlay = MetadataBlock::new();
        overlay.set_one(TAG_B, 9i32);
        base.merge(&overlay);
        assert_eq!(base.one::<i32>(TAG_A).unwrap(), Some(1));
        assert_eq!(base.one::<i32>(TAG_B).unwrap(), Some(9));
    }

    #[test]
    fn array_codec_flattens_lists() {
        let mut block = MetadataBlock::new();
        <[i32; 2]>::write_list(&mut block, TAG_A, &[[15, 30], [30, 30]]);
        assert_eq!(
            block.all::<i32>(TAG_A).unwrap(),
            Some(&[15, 30, 30, 30][..])
        );
        <[i32; 2]>::write(&mut block, TAG_B, &[5, 30]);
        assert_eq!(<[i32; 2]>::read(&block, TAG_B).unwrap(), Some([5, 30]));
    }

    #[test]
    fn tags_iterate_in_ascending_order() {
        let mut block = MetadataBlock::new();
        block.set_one(Tag::new(2, 0), 0u8);
        block.set_one(Tag::new(1, 0), 0u8);
        let tags: Vec<Tag> = block.tags().collect();
        assert_eq!(tags, vec![Tag::new(1, 0), Tag::new(2, 0)]);
    }
}
