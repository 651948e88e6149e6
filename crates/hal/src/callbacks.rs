//! The framework callback channel.

use std::sync::Arc;

use iris_core::prelude::MetadataBlock;

use crate::request::{FrameNumber, StreamBuffer};

/// Error codes carried by error notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The whole device is unusable.
    ErrorDevice,
    /// One request failed entirely.
    ErrorRequest,
    /// Result metadata for one request is unavailable.
    ErrorResult,
    /// One buffer of a request failed.
    ErrorBuffer,
}

/// Asynchronous notification to the framework.
#[derive(Debug)]
pub enum NotifyMessage {
    Shutter {
        frame_number: FrameNumber,
        /// Start of exposure, nanoseconds, strictly increasing per frame.
        timestamp: i64,
    },
    Error {
        frame_number: FrameNumber,
        code: ErrorCode,
    },
}

/// One completed capture.
///
/// Settings are shared read-only between the pipeline and the callback so
/// they outlive the call.
#[derive(Debug)]
pub struct CaptureResult {
    pub frame_number: FrameNumber,
    pub settings: Arc<MetadataBlock>,
    pub output_buffers: Vec<StreamBuffer>,
    pub input_buffer: Option<StreamBuffer>,
}

/// Callback table stored at `initialize`.
///
/// For every accepted request the pipeline issues exactly one notify
/// (shutter or error) followed by exactly one `process_capture_result`.
pub trait CameraEvents: Send + Sync {
    fn notify(&self, message: NotifyMessage);
    fn process_capture_result(&self, result: CaptureResult);
}
