//! Scripted in-memory V4L2 driver for hardware-free tests.
//!
//! [`FakeDevice`] holds shared state that tests configure and inspect;
//! [`FakeDevice::backend`] mints [`V4l2Backend`] instances over that state,
//! so a wrapper can connect, disconnect, and reconnect against the same
//! scripted driver.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use nix::errno::Errno;
use parking_lot::Mutex;

use crate::backend::V4l2Backend;
use crate::ioctl::{
    self, v4l2_buffer, v4l2_control, v4l2_fmtdesc, v4l2_format, v4l2_fract, v4l2_frmivalenum,
    v4l2_frmsizeenum, v4l2_query_ext_ctrl, v4l2_queryctrl, v4l2_querymenu, v4l2_requestbuffers,
};

/// One scripted control.
#[derive(Debug, Clone)]
pub struct FakeControl {
    pub typ: u32,
    pub minimum: i64,
    pub maximum: i64,
    pub step: u64,
    pub default_value: i64,
    pub value: i32,
}

impl FakeControl {
    /// A menu control spanning `[minimum, maximum]` with step 1.
    pub fn menu(minimum: i64, maximum: i64, value: i32) -> Self {
        Self {
            typ: ioctl::V4L2_CTRL_TYPE_MENU,
            minimum,
            maximum,
            step: 1,
            default_value: minimum,
            value,
        }
    }

    /// An integer control.
    pub fn integer(minimum: i64, maximum: i64, value: i32) -> Self {
        Self {
            typ: ioctl::V4L2_CTRL_TYPE_INTEGER,
            minimum,
            maximum,
            step: 1,
            default_value: value as i64,
            value,
        }
    }
}

/// One advertised capture format.
#[derive(Debug, Clone)]
pub struct FakeFormat {
    pub pixelformat: u32,
    pub sizes: Vec<(u32, u32)>,
    /// Frame intervals advertised for every size of this format.
    pub intervals: Vec<(u32, u32)>,
}

/// Ioctl selector for error injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    QueryExtCtrl,
    QueryCtrl,
    GetCtrl,
    SetCtrl,
    SetFormat,
    RequestBuffers,
    QueryBuffer,
    QueueBuffer,
    DequeueBuffer,
    StreamOn,
    StreamOff,
}

/// Call counters, for idempotence assertions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeCounters {
    pub query_ext_ctrl: usize,
    pub query_ctrl: usize,
    pub get_ctrl: usize,
    pub set_ctrl: usize,
    pub set_format: usize,
    pub request_buffers: usize,
    pub query_buffer: usize,
    pub queue_buffer: usize,
    pub dequeue_buffer: usize,
    pub stream_on: usize,
    pub stream_off: usize,
}

#[derive(Debug)]
struct QueuedBuffer {
    index: u32,
    userptr: libc::c_ulong,
    length: u32,
}

struct FakeState {
    ext_ctrl_supported: bool,
    controls: BTreeMap<u32, FakeControl>,
    formats: Vec<FakeFormat>,
    current_format: Option<(u32, u32, u32)>,
    buffer_count: u32,
    streaming: bool,
    sequence: u32,
    queued: VecDeque<QueuedBuffer>,
    errors: HashMap<FakeOp, Errno>,
    counters: FakeCounters,
}

/// Shared scripted-driver state.
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                ext_ctrl_supported: true,
                controls: BTreeMap::new(),
                formats: Vec::new(),
                current_format: None,
                buffer_count: 4,
                streaming: false,
                sequence: 0,
                queued: VecDeque::new(),
                errors: HashMap::new(),
                counters: FakeCounters::default(),
            })),
        }
    }

    /// A device advertising the formats the HAL requires, 640x480/1280x720
    /// at 15 and 30 fps.
    pub fn with_default_formats() -> Self {
        let device = Self::new();
        device.add_format(FakeFormat {
            pixelformat: ioctl::pix::V4L2_PIX_FMT_YUV420,
            sizes: vec![(640, 480), (1280, 720)],
            intervals: vec![(1, 30), (1, 15)],
        });
        device.add_format(FakeFormat {
            pixelformat: ioctl::pix::V4L2_PIX_FMT_JPEG,
            sizes: vec![(640, 480), (1280, 720)],
            intervals: vec![(1, 30), (1, 15)],
        });
        device
    }

    pub fn add_control(&self, id: u32, control: FakeControl) {
        self.state.lock().controls.insert(id, control);
    }

    pub fn add_format(&self, format: FakeFormat) {
        self.state.lock().formats.push(format);
    }

    pub fn set_ext_ctrl_supported(&self, supported: bool) {
        self.state.lock().ext_ctrl_supported = supported;
    }

    pub fn set_buffer_count(&self, count: u32) {
        self.state.lock().buffer_count = count;
    }

    /// Make one ioctl fail with `errno` until cleared.
    pub fn inject_error(&self, op: FakeOp, errno: Errno) {
        self.state.lock().errors.insert(op, errno);
    }

    pub fn clear_error(&self, op: FakeOp) {
        self.state.lock().errors.remove(&op);
    }

    pub fn counters(&self) -> FakeCounters {
        self.state.lock().counters
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    pub fn control_value(&self, id: u32) -> Option<i32> {
        self.state.lock().controls.get(&id).map(|c| c.value)
    }

    /// Mint a backend view over this device's state.
    pub fn backend(&self) -> Box<dyn V4l2Backend> {
        Box::new(FakeBackend {
            state: self.state.clone(),
        })
    }

    /// A wrapper wired to this scripted driver with a heap gralloc bridge.
    pub fn wrapper(&self) -> crate::wrapper::V4l2Wrapper {
        let source = self.clone();
        crate::wrapper::V4l2Wrapper::with_connector(
            "fake:0",
            Box::new(move || Ok(source.backend())),
            Box::new(crate::gralloc::HeapGralloc::new()),
        )
    }
}

struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeState {
    fn check(&self, op: FakeOp) -> Result<(), Errno> {
        match self.errors.get(&op) {
            Some(&errno) => Err(errno),
            None => Ok(()),
        }
    }

    fn sizeimage(&self) -> u32 {
        match self.current_format {
            Some((_, width, height)) => width * height * 3 / 2,
            None => 0,
        }
    }
}

fn fill_ext(query: &mut v4l2_query_ext_ctrl, id: u32, control: &FakeControl) {
    *query = v4l2_query_ext_ctrl::zeroed(id);
    query.r#type = control.typ;
    query.minimum = control.minimum;
    query.maximum = control.maximum;
    query.step = control.step;
    query.default_value = control.default_value;
    query.elems = 1;
    query.elem_size = if control.typ == ioctl::V4L2_CTRL_TYPE_INTEGER64 {
        8
    } else {
        4
    };
}

impl V4l2Backend for FakeBackend {
    fn query_ext_ctrl(&mut self, query: &mut v4l2_query_ext_ctrl) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.query_ext_ctrl += 1;
        state.check(FakeOp::QueryExtCtrl)?;
        if !state.ext_ctrl_supported {
            return Err(Errno::ENOTTY);
        }
        let flags = ioctl::V4L2_CTRL_FLAG_NEXT_CTRL | ioctl::V4L2_CTRL_FLAG_NEXT_COMPOUND;
        if query.id & flags != 0 {
            // Probe path: report the first control, EINVAL when none exist.
            match state.controls.iter().next() {
                Some((&id, control)) => {
                    fill_ext(query, id, control);
                    Ok(())
                }
                None => Err(Errno::EINVAL),
            }
        } else {
            match state.controls.get(&query.id) {
                Some(control) => {
                    fill_ext(query, query.id, control);
                    Ok(())
                }
                None => Err(Errno::EINVAL),
            }
        }
    }

    fn query_ctrl(&mut self, query: &mut v4l2_queryctrl) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.query_ctrl += 1;
        state.check(FakeOp::QueryCtrl)?;
        match state.controls.get(&query.id) {
            Some(control) => {
                let id = query.id;
                *query = v4l2_queryctrl::zeroed(id);
                query.r#type = control.typ;
                query.minimum = control.minimum as i32;
                query.maximum = control.maximum as i32;
                query.step = control.step as i32;
                query.default_value = control.default_value as i32;
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn query_menu(&mut self, query: &mut v4l2_querymenu) -> Result<(), Errno> {
        let state = self.state.lock();
        let id = query.id;
        let index = query.index as i64;
        match state.controls.get(&id) {
            Some(control)
                if control.typ == ioctl::V4L2_CTRL_TYPE_MENU
                    && index >= control.minimum
                    && index <= control.maximum =>
            {
                let mut name = [0u8; 32];
                let text = format!("option {index}");
                name[..text.len()].copy_from_slice(text.as_bytes());
                query.u.name = name;
                Ok(())
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn get_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.get_ctrl += 1;
        state.check(FakeOp::GetCtrl)?;
        match state.controls.get(&ctrl.id) {
            Some(control) => {
                ctrl.value = control.value;
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn set_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.set_ctrl += 1;
        state.check(FakeOp::SetCtrl)?;
        let id = ctrl.id;
        match state.controls.get_mut(&id) {
            Some(control) => {
                // Drivers clamp out-of-range values and echo the result.
                let clamped = (ctrl.value as i64)
                    .clamp(control.minimum, control.maximum) as i32;
                control.value = clamped;
                ctrl.value = clamped;
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn set_format(&mut self, format: &mut v4l2_format) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.set_format += 1;
        state.check(FakeOp::SetFormat)?;
        let pix = format.pix();
        let supported = state.formats.iter().any(|f| {
            f.pixelformat == pix.pixelformat && f.sizes.contains(&(pix.width, pix.height))
        });
        if !supported {
            // Coerce to the first advertised mode, like permissive drivers do.
            let Some(first) = state.formats.first() else {
                return Err(Errno::EINVAL);
            };
            let (width, height) = first.sizes.first().copied().unwrap_or((640, 480));
            let pixelformat = first.pixelformat;
            let out = format.pix_mut();
            out.pixelformat = pixelformat;
            out.width = width;
            out.height = height;
        }
        let pix = format.pix();
        state.current_format = Some((pix.pixelformat, pix.width, pix.height));
        let out = format.pix_mut();
        out.bytesperline = out.width * 3 / 2;
        out.sizeimage = out.width * out.height * 3 / 2;
        Ok(())
    }

    fn request_buffers(&mut self, req: &mut v4l2_requestbuffers) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.request_buffers += 1;
        state.check(FakeOp::RequestBuffers)?;
        // REQBUFS returns queued buffers to the user.
        state.queued.clear();
        req.count = state.buffer_count;
        Ok(())
    }

    fn query_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.query_buffer += 1;
        state.check(FakeOp::QueryBuffer)?;
        if state.current_format.is_none() {
            return Err(Errno::EINVAL);
        }
        buffer.length = state.sizeimage();
        Ok(())
    }

    fn queue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.queue_buffer += 1;
        state.check(FakeOp::QueueBuffer)?;
        let queued = QueuedBuffer {
            index: buffer.index,
            userptr: buffer.userptr(),
            length: buffer.length,
        };
        state.queued.push_back(queued);
        Ok(())
    }

    fn dequeue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.dequeue_buffer += 1;
        state.check(FakeOp::DequeueBuffer)?;
        if !state.streaming {
            return Err(Errno::EINVAL);
        }
        let Some(queued) = state.queued.pop_front() else {
            return Err(Errno::EAGAIN);
        };
        state.sequence += 1;
        buffer.index = queued.index;
        buffer.m.userptr = queued.userptr;
        buffer.length = queued.length;
        buffer.bytesused = state.sizeimage().min(queued.length);
        buffer.sequence = state.sequence;
        Ok(())
    }

    fn stream_on(&mut self, _buf_type: u32) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.stream_on += 1;
        state.check(FakeOp::StreamOn)?;
        state.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self, _buf_type: u32) -> Result<(), Errno> {
        let mut state = self.state.lock();
        state.counters.stream_off += 1;
        state.check(FakeOp::StreamOff)?;
        state.streaming = false;
        state.queued.clear();
        Ok(())
    }

    fn enum_format(&mut self, desc: &mut v4l2_fmtdesc) -> Result<(), Errno> {
        let state = self.state.lock();
        match state.formats.get(desc.index as usize) {
            Some(format) => {
                desc.pixelformat = format.pixelformat;
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn enum_frame_sizes(&mut self, query: &mut v4l2_frmsizeenum) -> Result<(), Errno> {
        let state = self.state.lock();
        let Some(format) = state
            .formats
            .iter()
            .find(|f| f.pixelformat == query.pixel_format)
        else {
            return Err(Errno::EINVAL);
        };
        match format.sizes.get(query.index as usize) {
            Some(&(width, height)) => {
                query.r#type = ioctl::V4L2_FRMSIZE_TYPE_DISCRETE;
                query.u.discrete = crate::ioctl::v4l2_frmsize_discrete { width, height };
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn enum_frame_intervals(&mut self, query: &mut v4l2_frmivalenum) -> Result<(), Errno> {
        let state = self.state.lock();
        let Some(format) = state
            .formats
            .iter()
            .find(|f| f.pixelformat == query.pixel_format)
        else {
            return Err(Errno::EINVAL);
        };
        if !format.sizes.contains(&(query.width, query.height)) {
            return Err(Errno::EINVAL);
        }
        match format.intervals.get(query.index as usize) {
            Some(&(numerator, denominator)) => {
                query.r#type = ioctl::V4L2_FRMIVAL_TYPE_DISCRETE;
                query.u.discrete = v4l2_fract {
                    numerator,
                    denominator,
                };
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ctrl_clamps_like_a_driver() {
        let device = FakeDevice::new();
        device.add_control(1, FakeControl::integer(0, 10, 5));
        let mut backend = device.backend();
        let mut ctrl = v4l2_control { id: 1, value: 99 };
        backend.set_ctrl(&mut ctrl).unwrap();
        assert_eq!(ctrl.value, 10);
        assert_eq!(device.control_value(1), Some(10));
    }

    #[test]
    fn dequeue_requires_streaming() {
        let device = FakeDevice::with_default_formats();
        let mut backend = device.backend();
        let mut buf = v4l2_buffer::zeroed(ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE);
        assert_eq!(backend.dequeue_buffer(&mut buf), Err(Errno::EINVAL));
    }

    #[test]
    fn injected_errors_surface_once_set() {
        let device = FakeDevice::with_default_formats();
        device.inject_error(FakeOp::StreamOn, Errno::EIO);
        let mut backend = device.backend();
        assert_eq!(
            backend.stream_on(ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE),
            Err(Errno::EIO)
        );
        device.clear_error(FakeOp::StreamOn);
        assert_eq!(
            backend.stream_on(ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE),
            Ok(())
        );
    }
}
