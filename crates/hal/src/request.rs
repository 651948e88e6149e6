//! Capture requests and buffer synchronization.

use std::os::fd::{AsFd, OwnedFd};
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout};

use iris_core::prelude::{Error, MetadataBlock, Result};
use iris_v4l2::gralloc::BufferHandle;

/// Per-camera capture sequence number.
pub type FrameNumber = u32;

/// Terminal state of a returned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    Ok,
    Error,
}

/// Producer/consumer synchronization object guarding a buffer.
///
/// The acquire fence signals when the HAL may begin writing.
pub trait Fence: Send {
    /// Block until the fence signals, at most `timeout`.
    fn wait(&self, timeout: Duration) -> Result<()>;
}

/// A fence backed by a sync file descriptor; signaled means readable.
pub struct FdFence {
    fd: OwnedFd,
}

impl FdFence {
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }
}

impl Fence for FdFence {
    fn wait(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(u16::MAX as u128) as u16;
            let poll_timeout = PollTimeout::from(millis);
            let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
            match nix::poll::poll(&mut fds, poll_timeout) {
                Ok(0) => {
                    return Err(Error::Timeout(
                        "timeout waiting on buffer acquire fence".into(),
                    ));
                }
                Ok(_) => return Ok(()),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(errno) => {
                    return Err(Error::Io(format!(
                        "error waiting on buffer acquire fence: {errno}"
                    )));
                }
            }
        }
    }
}

/// An already-signaled fence.
pub struct SignaledFence;

impl Fence for SignaledFence {
    fn wait(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// A fence that never signals; every wait times out.
pub struct StuckFence;

impl Fence for StuckFence {
    fn wait(&self, _timeout: Duration) -> Result<()> {
        Err(Error::Timeout(
            "timeout waiting on buffer acquire fence".into(),
        ))
    }
}

/// One output buffer of a capture request.
pub struct StreamBuffer {
    /// Owning stream (framework cookie).
    pub stream_id: u64,
    /// Graphics buffer to fill.
    pub buffer: BufferHandle,
    /// Signals when the HAL may write; cleared once waited upon.
    pub acquire_fence: Option<Box<dyn Fence>>,
    /// Never set by this core; cleared on all exit paths.
    pub release_fence: Option<Box<dyn Fence>>,
    pub status: BufferStatus,
}

impl StreamBuffer {
    pub fn new(stream_id: u64, buffer: BufferHandle) -> Self {
        Self {
            stream_id,
            buffer,
            acquire_fence: None,
            release_fence: None,
            status: BufferStatus::Ok,
        }
    }

    pub fn with_acquire_fence(mut self, fence: Box<dyn Fence>) -> Self {
        self.acquire_fence = Some(fence);
        self
    }

    /// Wait for the acquire fence and clear both fences.
    pub(crate) fn preprocess(&mut self, timeout: Duration) -> Result<()> {
        if let Some(fence) = self.acquire_fence.take() {
            fence.wait(timeout)?;
        }
        // Acquire fence waited upon; no release fence unless the device
        // sets one.
        self.release_fence = None;
        self.status = BufferStatus::Ok;
        Ok(())
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("stream_id", &self.stream_id)
            .field("buffer", &self.buffer)
            .field("has_acquire_fence", &self.acquire_fence.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// A self-contained capture work item.
///
/// Owned by the pipeline from acceptance until its result callback
/// completes; settings may be empty, meaning "reuse the last non-empty
/// settings".
#[derive(Debug)]
pub struct CaptureRequest {
    pub frame_number: FrameNumber,
    pub settings: MetadataBlock,
    pub output_buffers: Vec<StreamBuffer>,
    /// Always absent in this core; reprocessing is unsupported.
    pub input_buffer: Option<StreamBuffer>,
}

impl CaptureRequest {
    pub fn new(frame_number: FrameNumber, settings: MetadataBlock) -> Self {
        Self {
            frame_number,
            settings,
            output_buffers: Vec::new(),
            input_buffer: None,
        }
    }

    pub fn with_output(mut self, buffer: StreamBuffer) -> Self {
        self.output_buffers.push(buffer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_clears_fences_and_marks_ok() {
        let mut buffer =
            StreamBuffer::new(1, 7).with_acquire_fence(Box::new(SignaledFence));
        buffer.status = BufferStatus::Error;
        buffer.preprocess(Duration::from_millis(10)).unwrap();
        assert!(buffer.acquire_fence.is_none());
        assert!(buffer.release_fence.is_none());
        assert_eq!(buffer.status, BufferStatus::Ok);
    }

    #[test]
    fn stuck_fence_times_out() {
        let mut buffer = StreamBuffer::new(1, 7).with_acquire_fence(Box::new(StuckFence));
        assert!(matches!(
            buffer.preprocess(Duration::from_millis(1)),
            Err(Error::Timeout(_))
        ));
    }

    #[test]
    fn missing_fence_is_immediately_ready() {
        let mut buffer = StreamBuffer::new(1, 7);
        buffer.preprocess(Duration::from_millis(1)).unwrap();
        assert_eq!(buffer.status, BufferStatus::Ok);
    }
}
