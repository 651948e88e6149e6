//! Backend seam between the wrapper and the kernel.
//!
//! Every ioctl the wrapper issues goes through [`V4l2Backend`], so tests can
//! substitute a scripted driver (see [`crate::fake`]) without a video node.

use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;

use nix::errno::Errno;

use crate::ioctl::{
    self, v4l2_buffer, v4l2_control, v4l2_fmtdesc, v4l2_format, v4l2_frmivalenum, v4l2_frmsizeenum,
    v4l2_query_ext_ctrl, v4l2_queryctrl, v4l2_querymenu, v4l2_requestbuffers,
};

/// The ioctl surface of one video-capture node.
pub trait V4l2Backend: Send {
    fn query_ext_ctrl(&mut self, query: &mut v4l2_query_ext_ctrl) -> Result<(), Errno>;
    fn query_ctrl(&mut self, query: &mut v4l2_queryctrl) -> Result<(), Errno>;
    fn query_menu(&mut self, query: &mut v4l2_querymenu) -> Result<(), Errno>;
    fn get_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno>;
    fn set_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno>;
    fn set_format(&mut self, format: &mut v4l2_format) -> Result<(), Errno>;
    fn request_buffers(&mut self, req: &mut v4l2_requestbuffers) -> Result<(), Errno>;
    fn query_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno>;
    fn queue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno>;
    fn dequeue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno>;
    fn stream_on(&mut self, buf_type: u32) -> Result<(), Errno>;
    fn stream_off(&mut self, buf_type: u32) -> Result<(), Errno>;
    fn enum_format(&mut self, desc: &mut v4l2_fmtdesc) -> Result<(), Errno>;
    fn enum_frame_sizes(&mut self, query: &mut v4l2_frmsizeenum) -> Result<(), Errno>;
    fn enum_frame_intervals(&mut self, query: &mut v4l2_frmivalenum) -> Result<(), Errno>;
}

/// Real backend over an open file descriptor.
pub struct KernelBackend {
    fd: OwnedFd,
}

impl KernelBackend {
    /// Open `path` read-write. The standard library retries EINTR.
    pub fn open(path: &Path) -> Result<Self, Errno> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| Errno::from_raw(err.raw_os_error().unwrap_or(libc::EIO)))?;
        Ok(Self { fd: file.into() })
    }
}

/// Retry the ioctl while the kernel reports EINTR.
macro_rules! retried {
    ($self:ident, $ioctl:ident, $arg:expr) => {
        loop {
            match unsafe { ioctl::$ioctl($self.fd.as_raw_fd(), $arg) } {
                Ok(_) => break Ok(()),
                Err(Errno::EINTR) => continue,
                Err(err) => break Err(err),
            }
        }
    };
}

impl V4l2Backend for KernelBackend {
    fn query_ext_ctrl(&mut self, query: &mut v4l2_query_ext_ctrl) -> Result<(), Errno> {
        retried!(self, vidioc_query_ext_ctrl, query)
    }

    fn query_ctrl(&mut self, query: &mut v4l2_queryctrl) -> Result<(), Errno> {
        retried!(self, vidioc_queryctrl, query)
    }

    fn query_menu(&mut self, query: &mut v4l2_querymenu) -> Result<(), Errno> {
        retried!(self, vidioc_querymenu, query)
    }

    fn get_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno> {
        retried!(self, vidioc_g_ctrl, ctrl)
    }

    fn set_ctrl(&mut self, ctrl: &mut v4l2_control) -> Result<(), Errno> {
        retried!(self, vidioc_s_ctrl, ctrl)
    }

    fn set_format(&mut self, format: &mut v4l2_format) -> Result<(), Errno> {
        retried!(self, vidioc_s_fmt, format)
    }

    fn request_buffers(&mut self, req: &mut v4l2_requestbuffers) -> Result<(), Errno> {
        retried!(self, vidioc_reqbufs, req)
    }

    fn query_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        retried!(self, vidioc_querybuf, buffer)
    }

    fn queue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        retried!(self, vidioc_qbuf, buffer)
    }

    fn dequeue_buffer(&mut self, buffer: &mut v4l2_buffer) -> Result<(), Errno> {
        retried!(self, vidioc_dqbuf, buffer)
    }

    fn stream_on(&mut self, buf_type: u32) -> Result<(), Errno> {
        let arg = buf_type as libc::c_int;
        loop {
            match unsafe { ioctl::vidioc_streamon(self.fd.as_raw_fd(), &arg) } {
                Ok(_) => break Ok(()),
                Err(Errno::EINTR) => continue,
                Err(err) => break Err(err),
            }
        }
    }

    fn stream_off(&mut self, buf_type: u32) -> Result<(), Errno> {
        let arg = buf_type as libc::c_int;
        loop {
            match unsafe { ioctl::vidioc_streamoff(self.fd.as_raw_fd(), &arg) } {
                Ok(_) => break Ok(()),
                Err(Errno::EINTR) => continue,
                Err(err) => break Err(err),
            }
        }
    }

    fn enum_format(&mut self, desc: &mut v4l2_fmtdesc) -> Result<(), Errno> {
        retried!(self, vidioc_enum_fmt, desc)
    }

    fn enum_frame_sizes(&mut self, query: &mut v4l2_frmsizeenum) -> Result<(), Errno> {
        retried!(self, vidioc_enum_framesizes, query)
    }

    fn enum_frame_intervals(&mut self, query: &mut v4l2_frmivalenum) -> Result<(), Errno> {
        retried!(self, vidioc_enum_frameintervals, query)
    }
}
