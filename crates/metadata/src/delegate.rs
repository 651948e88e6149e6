//! Get/set backends for controls.

use parking_lot::Mutex;

use iris_core::prelude::{Result, Tag};

/// Backend a control reads and writes through.
pub trait ControlDelegate<T>: Send + Sync {
    /// Current value.
    fn get(&self) -> Result<T>;

    /// Apply a new value.
    fn set(&self, value: &T) -> Result<()>;
}

/// A delegate that records the last value set and otherwise does nothing.
///
/// Backs ignored controls: options are advertised, writes are accepted and
/// discarded, reads return the last accepted value.
pub struct NoEffectDelegate<T> {
    value: Mutex<T>,
}

impl<T> NoEffectDelegate<T> {
    pub fn new(default: T) -> Self {
        Self {
            value: Mutex::new(default),
        }
    }
}

impl<T: Clone + Send> ControlDelegate<T> for NoEffectDelegate<T>
where
    T: Sync,
{
    fn get(&self) -> Result<T> {
        Ok(self.value.lock().clone())
    }

    fn set(&self, value: &T) -> Result<()> {
        *self.value.lock() = value.clone();
        Ok(())
    }
}

/// A delegate paired with the metadata tag it answers for.
pub struct TaggedDelegate<T> {
    tag: Tag,
    inner: Box<dyn ControlDelegate<T>>,
}

impl<T> TaggedDelegate<T> {
    pub fn new(tag: Tag, inner: Box<dyn ControlDelegate<T>>) -> Self {
        Self { tag, inner }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn get(&self) -> Result<T> {
        self.inner.get()
    }

    pub fn set(&self, value: &T) -> Result<()> {
        self.inner.set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_effect_delegate_echoes_last_set() {
        let delegate = NoEffectDelegate::new(3u8);
        assert_eq!(delegate.get().unwrap(), 3);
        delegate.set(&9).unwrap();
        assert_eq!(delegate.get().unwrap(), 9);
    }

    #[test]
    fn tagged_delegate_forwards_to_inner() {
        let tag = Tag::new(1, 4);
        let tagged = TaggedDelegate::new(tag, Box::new(NoEffectDelegate::new(1i32)));
        assert_eq!(tagged.tag(), tag);
        tagged.set(&5).unwrap();
        assert_eq!(tagged.get().unwrap(), 5);
    }
}
