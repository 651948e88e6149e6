#![doc = include_str!("../README.md")]

pub mod backend;
pub mod fake;
pub mod gralloc;
pub mod ioctl;
pub mod stream_format;
pub mod wrapper;

pub mod prelude {
    pub use crate::backend::V4l2Backend;
    pub use crate::fake::{FakeControl, FakeDevice, FakeFormat, FakeOp};
    pub use crate::gralloc::{BufferHandle, Gralloc, HeapGralloc, LockedBuffer};
    pub use crate::stream_format::{HalFormat, StreamFormat};
    pub use crate::wrapper::{ControlQuery, DequeuedFrame, V4l2Wrapper};
    pub use iris_core::prelude::*;
}
