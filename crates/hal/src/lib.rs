#![doc = include_str!("../README.md")]

pub mod callbacks;
pub mod camera;
pub mod config;
pub mod factory;
pub mod request;
pub mod static_info;
pub mod stream;
pub mod templates;
mod worker;

pub use iris_core as core;
pub use iris_metadata as metadata;
pub use iris_v4l2 as v4l2;

pub mod prelude {
    pub use crate::callbacks::{CameraEvents, CaptureResult, ErrorCode, NotifyMessage};
    pub use crate::camera::{Camera, CameraInfo, DEVICE_API_VERSION_3_4, RESOURCE_COST};
    pub use crate::config::{HalConfig, HalTunables, set_hal_tunables};
    pub use crate::factory::build_metadata;
    pub use crate::request::{
        BufferStatus, CaptureRequest, FdFence, Fence, FrameNumber, SignaledFence, StreamBuffer,
        StuckFence,
    };
    pub use crate::stream::{DataSpace, Stream, StreamConfig, StreamType};
    pub use crate::templates::{TEMPLATE_COUNT, TemplateKind};
    pub use iris_metadata::prelude::*;
    pub use iris_v4l2::prelude::*;
}
