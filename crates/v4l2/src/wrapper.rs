//! Serialized access to one V4L2 video-capture node.
//!
//! A single device lock guards the file descriptor, the cached stream
//! format, the buffer bookkeeping, and the gralloc bridge, so every
//! ioctl-bearing operation is serialized. Calls on a disconnected wrapper
//! fail with `NoDevice`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use parking_lot::Mutex;
use tracing::{debug, error};

use iris_core::prelude::{Error, Result};

use crate::backend::{KernelBackend, V4l2Backend};
use crate::gralloc::{BufferHandle, Gralloc, HeapGralloc};
use crate::ioctl::{
    self, v4l2_buffer, v4l2_control, v4l2_fmtdesc, v4l2_format, v4l2_frmivalenum, v4l2_frmsizeenum,
    v4l2_fract, v4l2_query_ext_ctrl, v4l2_queryctrl, v4l2_requestbuffers,
};
use crate::stream_format::StreamFormat;

/// Discrete sizes to snap stepwise ranges onto.
const STANDARD_SIZES: [(u32, u32); 4] = [(1920, 1080), (1280, 720), (640, 480), (320, 240)];

/// Normalized control description in the extended shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlQuery {
    pub id: u32,
    pub kind: u32,
    pub minimum: i64,
    pub maximum: i64,
    pub step: u64,
    pub default_value: i64,
    pub flags: u32,
    pub elems: u32,
    pub elem_size: u32,
}

impl ControlQuery {
    fn from_ext(query: &v4l2_query_ext_ctrl) -> Self {
        Self {
            id: query.id,
            kind: query.r#type,
            minimum: query.minimum,
            maximum: query.maximum,
            step: query.step,
            default_value: query.default_value,
            flags: query.flags,
            elems: query.elems,
            elem_size: query.elem_size,
        }
    }

    fn from_legacy(query: &v4l2_queryctrl) -> Self {
        // Per V4L2 docs, BITMASK maximum/default are __u32: widening to 64
        // bits must zero-extend, never sign-extend.
        let (maximum, default_value) = if query.r#type == ioctl::V4L2_CTRL_TYPE_BITMASK {
            (
                query.maximum as u32 as i64,
                query.default_value as u32 as i64,
            )
        } else {
            (query.maximum as i64, query.default_value as i64)
        };
        let elem_size = match query.r#type {
            ioctl::V4L2_CTRL_TYPE_INTEGER64 => std::mem::size_of::<i64>() as u32,
            ioctl::V4L2_CTRL_TYPE_STRING => (maximum + 1) as u32,
            _ => std::mem::size_of::<i32>() as u32,
        };
        Self {
            id: query.id,
            kind: query.r#type,
            minimum: query.minimum as i64,
            maximum,
            step: query.step as u32 as u64,
            default_value,
            flags: query.flags,
            elems: 1,
            elem_size,
        }
    }
}

/// A buffer handed back by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeuedFrame {
    pub handle: BufferHandle,
    pub index: u32,
    pub bytes_used: u32,
    pub sequence: u32,
}

type Connector = Box<dyn Fn() -> Result<Box<dyn V4l2Backend>> + Send + Sync>;

struct Inner {
    backend: Option<Box<dyn V4l2Backend>>,
    extended_query_supported: bool,
    format: Option<StreamFormat>,
    max_buffers: u32,
    gralloc: Box<dyn Gralloc>,
    queued: HashMap<u32, BufferHandle>,
}

/// Thread-safe handle to one video device.
pub struct V4l2Wrapper {
    label: String,
    connector: Connector,
    inner: Mutex<Inner>,
}

fn ioctl_failed(label: &str, op: &str, errno: Errno) -> Error {
    error!(device = %label, op, %errno, "ioctl failed");
    Error::NoDevice(format!("{op} on {label} failed: {errno}"))
}

impl V4l2Wrapper {
    /// Wrapper over a real video node such as `/dev/video0`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let label = path.display().to_string();
        let open_path = path.clone();
        Self::with_connector(
            label,
            Box::new(move || open_kernel(&open_path)),
            Box::new(HeapGralloc::new()),
        )
    }

    /// Wrapper over an arbitrary backend source, for tests and simulation.
    pub fn with_connector(
        label: impl Into<String>,
        connector: Connector,
        gralloc: Box<dyn Gralloc>,
    ) -> Self {
        Self {
            label: label.into(),
            connector,
            inner: Mutex::new(Inner {
                backend: None,
                extended_query_supported: false,
                format: None,
                max_buffers: 0,
                gralloc,
                queued: HashMap::new(),
            }),
        }
    }

    /// Device label (path for kernel-backed wrappers).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().backend.is_some()
    }

    /// Buffers currently locked through the gralloc bridge.
    pub fn locked_buffers(&self) -> usize {
        self.inner.lock().gralloc.locked_count()
    }

    /// Open the device and probe extended control query support.
    pub fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.backend.is_some() {
            return Err(Error::Busy(format!("{} is already connected", self.label)));
        }
        let mut backend = (self.connector)()?;

        // Probe whether this connection understands VIDIOC_QUERY_EXT_CTRL.
        let mut probe = v4l2_query_ext_ctrl::zeroed(
            ioctl::V4L2_CTRL_FLAG_NEXT_CTRL | ioctl::V4L2_CTRL_FLAG_NEXT_COMPOUND,
        );
        inner.extended_query_supported = backend.query_ext_ctrl(&mut probe).is_ok();
        inner.backend = Some(backend);
        debug!(
            device = %self.label,
            extended_query = inner.extended_query_supported,
            "connected"
        );
        Ok(())
    }

    /// Close the device, dropping the format cache and all buffer locks.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        if inner.backend.take().is_none() {
            debug!(device = %self.label, "disconnect on idle wrapper");
            return;
        }
        inner.format = None;
        inner.max_buffers = 0;
        inner.queued.clear();
        // Closing the node releases queued buffers back to the user.
        let _ = inner.gralloc.unlock_all();
        debug!(device = %self.label, "disconnected");
    }

    pub fn stream_on(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let Some(format) = inner.format else {
            return Err(Error::InvalidArgument(
                "stream format must be set before turning on stream".into(),
            ));
        };
        let backend = connected(&mut inner.backend, &self.label)?;
        backend
            .stream_on(format.buf_type)
            .map_err(|errno| ioctl_failed(&self.label, "STREAMON", errno))
    }

    pub fn stream_off(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let Some(format) = inner.format else {
            return Err(Error::NoDevice(
                "stream format must be set to turn off stream".into(),
            ));
        };
        let backend = connected(&mut inner.backend, &self.label)?;
        let res = backend.stream_off(format.buf_type);
        // STREAMOFF releases all queued buffers back to the user.
        inner.queued.clear();
        let gralloc_res = inner.gralloc.unlock_all();
        res.map_err(|errno| ioctl_failed(&self.label, "STREAMOFF", errno))?;
        gralloc_res
    }

    /// Query a control, preferring `QUERY_EXT_CTRL` and normalizing the
    /// legacy `QUERYCTRL` result into the extended shape.
    pub fn query_control(&self, id: u32) -> Result<ControlQuery> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let extended = inner.extended_query_supported;
        let backend = connected(&mut inner.backend, &self.label)?;

        if extended {
            let mut query = v4l2_query_ext_ctrl::zeroed(id);
            match backend.query_ext_ctrl(&mut query) {
                Ok(()) => return Ok(ControlQuery::from_ext(&query)),
                // Not implemented after all; fall back to the basic query.
                Err(Errno::ENOTTY) => {}
                Err(errno) => return Err(ioctl_failed(&self.label, "QUERY_EXT_CTRL", errno)),
            }
        }

        let mut query = v4l2_queryctrl::zeroed(id);
        backend
            .query_ctrl(&mut query)
            .map_err(|errno| ioctl_failed(&self.label, "QUERYCTRL", errno))?;
        Ok(ControlQuery::from_legacy(&query))
    }

    /// Name of one item of a menu control.
    pub fn query_menu(&self, id: u32, index: u32) -> Result<String> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut query: crate::ioctl::v4l2_querymenu = unsafe { std::mem::zeroed() };
        query.id = id;
        query.index = index;
        backend
            .query_menu(&mut query)
            .map_err(|errno| ioctl_failed(&self.label, "QUERYMENU", errno))?;
        let name = unsafe { query.u.name };
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        Ok(String::from_utf8_lossy(&name[..end]).into_owned())
    }

    pub fn get_control(&self, id: u32) -> Result<i32> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut ctrl = v4l2_control { id, value: 0 };
        backend
            .get_ctrl(&mut ctrl)
            .map_err(|errno| ioctl_failed(&self.label, "G_CTRL", errno))?;
        Ok(ctrl.value)
    }

    /// Set a control and return the value the driver actually applied.
    pub fn set_control(&self, id: u32, desired: i32) -> Result<i32> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut ctrl = v4l2_control { id, value: desired };
        backend
            .set_ctrl(&mut ctrl)
            .map_err(|errno| ioctl_failed(&self.label, "S_CTRL", errno))?;
        Ok(ctrl.value)
    }

    /// Pixel formats the device advertises for capture.
    pub fn formats(&self) -> Result<BTreeSet<u32>> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut formats = BTreeSet::new();
        let mut desc: v4l2_fmtdesc = unsafe { std::mem::zeroed() };
        desc.r#type = ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE;
        loop {
            match backend.enum_format(&mut desc) {
                Ok(()) => {
                    formats.insert(desc.pixelformat);
                    desc.index += 1;
                }
                Err(Errno::EINVAL) => break,
                Err(errno) => return Err(ioctl_failed(&self.label, "ENUM_FMT", errno)),
            }
        }
        Ok(formats)
    }

    /// Frame sizes for one pixel format. Stepwise ranges are snapped onto
    /// standard sizes (rounding up) plus the largest supported size.
    pub fn frame_sizes(&self, pixelformat: u32) -> Result<BTreeSet<(u32, u32)>> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut sizes = BTreeSet::new();
        let mut query: v4l2_frmsizeenum = unsafe { std::mem::zeroed() };
        query.pixel_format = pixelformat;
        backend
            .enum_frame_sizes(&mut query)
            .map_err(|errno| ioctl_failed(&self.label, "ENUM_FRAMESIZES", errno))?;
        if query.r#type == ioctl::V4L2_FRMSIZE_TYPE_DISCRETE {
            loop {
                let discrete = unsafe { query.u.discrete };
                sizes.insert((discrete.width, discrete.height));
                query.index += 1;
                match backend.enum_frame_sizes(&mut query) {
                    Ok(()) => {}
                    Err(Errno::EINVAL) => break,
                    Err(errno) => return Err(ioctl_failed(&self.label, "ENUM_FRAMESIZES", errno)),
                }
            }
        } else {
            let step = unsafe { query.u.stepwise };
            sizes.insert((step.max_width, step.max_height));
            for (desired_width, desired_height) in STANDARD_SIZES {
                if desired_width < step.min_width || desired_height < step.min_height {
                    continue;
                }
                if desired_width > step.max_width && desired_height > step.max_height {
                    continue;
                }
                let width_steps =
                    (desired_width - step.min_width).div_ceil(step.step_width.max(1));
                let height_steps =
                    (desired_height - step.min_height).div_ceil(step.step_height.max(1));
                sizes.insert((
                    step.min_width + width_steps * step.step_width,
                    step.min_height + height_steps * step.step_height,
                ));
            }
        }
        Ok(sizes)
    }

    /// `[min, max]` frame duration in nanoseconds for a (format, size) pair.
    pub fn frame_duration_range(
        &self,
        pixelformat: u32,
        size: (u32, u32),
    ) -> Result<(i64, i64)> {
        let mut inner = self.inner.lock();
        let backend = connected(&mut inner.backend, &self.label)?;
        let mut query: v4l2_frmivalenum = unsafe { std::mem::zeroed() };
        query.pixel_format = pixelformat;
        query.width = size.0;
        query.height = size.1;
        backend
            .enum_frame_intervals(&mut query)
            .map_err(|errno| ioctl_failed(&self.label, "ENUM_FRAMEINTERVALS", errno))?;
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        if query.r#type == ioctl::V4L2_FRMIVAL_TYPE_DISCRETE {
            loop {
                let ns = fract_to_ns(unsafe { query.u.discrete });
                min = min.min(ns);
                max = max.max(ns);
                query.index += 1;
                match backend.enum_frame_intervals(&mut query) {
                    Ok(()) => {}
                    Err(Errno::EINVAL) => break,
                    Err(errno) => {
                        return Err(ioctl_failed(&self.label, "ENUM_FRAMEINTERVALS", errno));
                    }
                }
            }
        } else {
            let step = unsafe { query.u.stepwise };
            min = fract_to_ns(step.min);
            max = fract_to_ns(step.max);
        }
        Ok((min, max))
    }

    /// Program the capture format, skipping the ioctl when the cached
    /// format already matches. Returns the driver's buffer limit.
    pub fn set_format(&self, desired: &StreamFormat) -> Result<u32> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        if let Some(current) = inner.format
            && current == *desired
        {
            debug!(device = %self.label, format = %current, "format already set");
            return Ok(inner.max_buffers);
        }

        let backend = connected(&mut inner.backend, &self.label)?;
        let mut request = v4l2_format::zeroed(desired.buf_type);
        desired.fill_request(&mut request);
        backend
            .set_format(&mut request)
            .map_err(|errno| ioctl_failed(&self.label, "S_FMT", errno))?;

        // The driver may coerce parameters; any coercion is an error.
        let actual = StreamFormat::from_device(&request);
        if actual != *desired {
            return Err(Error::InvalidArgument(format!(
                "device coerced {desired} to {actual}"
            )));
        }
        inner.format = Some(actual);
        setup_buffers(inner, &self.label)?;
        Ok(inner.max_buffers)
    }

    /// Queue a framework buffer to the device at index 0.
    pub fn enqueue_buffer(&self, handle: BufferHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let Some(format) = inner.format else {
            return Err(Error::NoDevice(
                "stream format must be set before enqueuing buffers".into(),
            ));
        };
        let backend = connected(&mut inner.backend, &self.label)?;

        let mut buffer = v4l2_buffer::zeroed(format.buf_type);
        buffer.index = 0;
        // QUERYBUF checks buffer/device health and fills the buffer length.
        backend
            .query_buffer(&mut buffer)
            .map_err(|errno| ioctl_failed(&self.label, "QUERYBUF", errno))?;
        buffer.memory = ioctl::V4L2_MEMORY_USERPTR;

        let length = if buffer.length > 0 {
            buffer.length
        } else {
            format.min_buffer_size
        };
        let locked = inner
            .gralloc
            .lock(handle, format.bytes_per_line, length)?;
        buffer.m.userptr = locked.userptr as libc::c_ulong;
        buffer.length = locked.length;

        if let Err(errno) = backend.queue_buffer(&mut buffer) {
            let _ = inner.gralloc.unlock(handle);
            return Err(ioctl_failed(&self.label, "QBUF", errno));
        }
        inner.queued.insert(buffer.index, handle);
        Ok(())
    }

    /// Dequeue the next filled buffer and release its gralloc lock.
    pub fn dequeue_buffer(&self) -> Result<DequeuedFrame> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let Some(format) = inner.format else {
            return Err(Error::NoDevice(
                "stream format must be set before dequeueing buffers".into(),
            ));
        };
        let backend = connected(&mut inner.backend, &self.label)?;

        let mut buffer = v4l2_buffer::zeroed(format.buf_type);
        buffer.memory = ioctl::V4L2_MEMORY_USERPTR;
        backend
            .dequeue_buffer(&mut buffer)
            .map_err(|errno| ioctl_failed(&self.label, "DQBUF", errno))?;

        let handle = inner.queued.remove(&buffer.index).ok_or_else(|| {
            Error::NoDevice(format!("driver returned unknown buffer index {}", buffer.index))
        })?;
        inner.gralloc.unlock(handle)?;
        Ok(DequeuedFrame {
            handle,
            index: buffer.index,
            bytes_used: buffer.bytesused,
            sequence: buffer.sequence,
        })
    }
}

fn open_kernel(path: &Path) -> Result<Box<dyn V4l2Backend>> {
    match KernelBackend::open(path) {
        Ok(backend) => Ok(Box::new(backend)),
        Err(errno) => {
            error!(device = %path.display(), %errno, "failed to open device");
            Err(Error::NoDevice(format!(
                "failed to open {}: {errno}",
                path.display()
            )))
        }
    }
}

fn connected<'a>(
    backend: &'a mut Option<Box<dyn V4l2Backend>>,
    label: &str,
) -> Result<&'a mut Box<dyn V4l2Backend>> {
    backend
        .as_mut()
        .ok_or_else(|| Error::NoDevice(format!("{label} is not connected")))
}

/// Switch into user-pointer mode. REQBUFS releases all queued buffers, so
/// every gralloc lock is dropped unconditionally afterward.
fn setup_buffers(inner: &mut Inner, label: &str) -> Result<()> {
    let Some(format) = inner.format else {
        return Err(Error::NoDevice(
            "stream format must be set before setting up buffers".into(),
        ));
    };
    let backend = connected(&mut inner.backend, label)?;
    let mut request = v4l2_requestbuffers {
        count: 1,
        r#type: format.buf_type,
        memory: ioctl::V4L2_MEMORY_USERPTR,
        capabilities: 0,
        flags: 0,
        reserved: [0; 3],
    };
    let res = backend.request_buffers(&mut request);
    inner.queued.clear();
    let gralloc_res = inner.gralloc.unlock_all();
    res.map_err(|errno| ioctl_failed(label, "REQBUFS", errno))?;
    gralloc_res?;

    inner.max_buffers = request.count;
    if inner.max_buffers < 1 {
        return Err(Error::NoDevice(
            "REQBUFS claims it can't handle any buffers".into(),
        ));
    }
    Ok(())
}

/// Converts a fraction of seconds to nanoseconds.
fn fract_to_ns(fract: v4l2_fract) -> i64 {
    if fract.denominator == 0 {
        return 0;
    }
    1_000_000_000i64 * fract.numerator as i64 / fract.denominator as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeControl, FakeDevice, FakeOp};
    use iris_core::prelude::FourCc;

    fn fake_wrapper(device: &FakeDevice) -> V4l2Wrapper {
        let source = device.clone();
        V4l2Wrapper::with_connector(
            "fake:0",
            Box::new(move || Ok(source.backend())),
            Box::new(HeapGralloc::new()),
        )
    }

    fn yu12_640() -> StreamFormat {
        StreamFormat::new(FourCc::new(*b"YU12"), 640, 480)
    }

    #[test]
    fn operations_require_a_connection() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        assert!(matches!(
            wrapper.get_control(1),
            Err(Error::NoDevice(_))
        ));
        assert!(matches!(
            wrapper.set_format(&yu12_640()),
            Err(Error::NoDevice(_))
        ));
    }

    #[test]
    fn connect_twice_is_busy() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();
        assert!(matches!(wrapper.connect(), Err(Error::Busy(_))));
        wrapper.disconnect();
        wrapper.connect().unwrap();
    }

    #[test]
    fn query_control_falls_back_to_legacy_query() {
        // S3: driver without QUERY_EXT_CTRL still yields a normalized result.
        let device = FakeDevice::with_default_formats();
        device.set_ext_ctrl_supported(false);
        device.add_control(0x0098_0900, FakeControl::integer(-4, 4, 0));
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        let query = wrapper.query_control(0x0098_0900).unwrap();
        assert_eq!(query.kind, ioctl::V4L2_CTRL_TYPE_INTEGER);
        assert_eq!(query.elems, 1);
        assert_eq!(query.elem_size, 4);
        assert_eq!(query.minimum, -4);
        assert_eq!(query.maximum, 4);
        assert_eq!(device.counters().query_ctrl, 1);
    }

    #[test]
    fn bitmask_widening_zero_extends() {
        // S4: BITMASK maximum/default widen as __u32, not sign-extended.
        let device = FakeDevice::with_default_formats();
        device.set_ext_ctrl_supported(false);
        device.add_control(
            42,
            FakeControl {
                typ: ioctl::V4L2_CTRL_TYPE_BITMASK,
                minimum: 0,
                maximum: 0xFFFF_FFFF,
                step: 1,
                default_value: 0x8000_0000,
                value: 0,
            },
        );
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        let query = wrapper.query_control(42).unwrap();
        assert_eq!(query.maximum, 0x0000_0000_FFFF_FFFF);
        assert_eq!(query.default_value, 0x0000_0000_8000_0000);
    }

    #[test]
    fn menu_items_are_queryable_by_index() {
        let device = FakeDevice::with_default_formats();
        device.add_control(5, FakeControl::menu(0, 2, 0));
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        assert_eq!(wrapper.query_menu(5, 1).unwrap(), "option 1");
        assert!(wrapper.query_menu(5, 9).is_err());
    }

    #[test]
    fn set_format_is_idempotent() {
        // S6: a second identical set_format performs no ioctl.
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        let first = wrapper.set_format(&yu12_640()).unwrap();
        assert!(first >= 1);
        let second = wrapper.set_format(&yu12_640()).unwrap();
        assert_eq!(first, second);
        assert_eq!(device.counters().set_format, 1);
        assert_eq!(device.counters().request_buffers, 1);
    }

    #[test]
    fn set_format_rejects_driver_coercion() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        let unsupported = StreamFormat::new(FourCc::new(*b"YU12"), 333, 333);
        assert!(matches!(
            wrapper.set_format(&unsupported),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn failed_qbuf_releases_the_gralloc_lock() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();
        wrapper.set_format(&yu12_640()).unwrap();

        device.inject_error(FakeOp::QueueBuffer, Errno::EIO);
        assert!(wrapper.enqueue_buffer(9).is_err());
        assert_eq!(wrapper.locked_buffers(), 0);
    }

    #[test]
    fn enqueue_dequeue_round_trip() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();
        wrapper.set_format(&yu12_640()).unwrap();

        wrapper.enqueue_buffer(11).unwrap();
        assert_eq!(wrapper.locked_buffers(), 1);
        wrapper.stream_on().unwrap();
        let frame = wrapper.dequeue_buffer().unwrap();
        assert_eq!(frame.handle, 11);
        assert_eq!(frame.index, 0);
        assert!(frame.bytes_used > 0);
        assert_eq!(wrapper.locked_buffers(), 0);
    }

    #[test]
    fn stream_off_unlocks_all_buffers() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();
        wrapper.set_format(&yu12_640()).unwrap();
        wrapper.enqueue_buffer(3).unwrap();
        wrapper.stream_on().unwrap();

        wrapper.stream_off().unwrap();
        assert_eq!(wrapper.locked_buffers(), 0);
        assert!(!device.is_streaming());
    }

    #[test]
    fn enumeration_reports_advertised_modes() {
        let device = FakeDevice::with_default_formats();
        let wrapper = fake_wrapper(&device);
        wrapper.connect().unwrap();

        let formats = wrapper.formats().unwrap();
        assert!(formats.contains(&ioctl::pix::V4L2_PIX_FMT_YUV420));
        assert!(formats.contains(&ioctl::pix::V4L2_PIX_FMT_JPEG));

        let sizes = wrapper
            .frame_sizes(ioctl::pix::V4L2_PIX_FMT_YUV420)
            .unwrap();
        assert!(sizes.contains(&(640, 480)));

        let (min, max) = wrapper
            .frame_duration_range(ioctl::pix::V4L2_PIX_FMT_YUV420, (640, 480))
            .unwrap();
        assert_eq!(min, 1_000_000_000 / 30);
        assert_eq!(max, 1_000_000_000 / 15);
    }
}
