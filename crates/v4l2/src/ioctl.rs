//! V4L2 ABI: `#[repr(C)]` parameter structs, VIDIOC request definitions,
//! and the constants this HAL speaks.
//!
//! Layouts follow `linux/videodev2.h`. Only the video-capture subset the
//! wrapper uses is declared.

#![allow(non_camel_case_types)]

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_MEMORY_USERPTR: u32 = 2;

pub const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
pub const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
pub const V4L2_CTRL_TYPE_MENU: u32 = 3;
pub const V4L2_CTRL_TYPE_BUTTON: u32 = 4;
pub const V4L2_CTRL_TYPE_INTEGER64: u32 = 5;
pub const V4L2_CTRL_TYPE_CTRL_CLASS: u32 = 6;
pub const V4L2_CTRL_TYPE_STRING: u32 = 7;
pub const V4L2_CTRL_TYPE_BITMASK: u32 = 8;
pub const V4L2_CTRL_TYPE_INTEGER_MENU: u32 = 9;

pub const V4L2_CTRL_FLAG_NEXT_CTRL: u32 = 0x8000_0000;
pub const V4L2_CTRL_FLAG_NEXT_COMPOUND: u32 = 0x4000_0000;

pub const V4L2_FRMSIZE_TYPE_DISCRETE: u32 = 1;
pub const V4L2_FRMSIZE_TYPE_CONTINUOUS: u32 = 2;
pub const V4L2_FRMSIZE_TYPE_STEPWISE: u32 = 3;

pub const V4L2_FRMIVAL_TYPE_DISCRETE: u32 = 1;
pub const V4L2_FRMIVAL_TYPE_CONTINUOUS: u32 = 2;
pub const V4L2_FRMIVAL_TYPE_STEPWISE: u32 = 3;

/// Pixel formats the HAL negotiates.
pub mod pix {
    pub const V4L2_PIX_FMT_YUV420: u32 = u32::from_le_bytes(*b"YU12");
    pub const V4L2_PIX_FMT_YUYV: u32 = u32::from_le_bytes(*b"YUYV");
    pub const V4L2_PIX_FMT_JPEG: u32 = u32::from_le_bytes(*b"JPEG");
    pub const V4L2_PIX_FMT_MJPEG: u32 = u32::from_le_bytes(*b"MJPG");
}

/// User-class and camera-class control ids.
pub mod cid {
    const USER_BASE: u32 = 0x0098_0900;
    const CAMERA_BASE: u32 = 0x009a_0900;

    pub const V4L2_CID_AUTO_WHITE_BALANCE: u32 = USER_BASE + 12;
    pub const V4L2_CID_POWER_LINE_FREQUENCY: u32 = USER_BASE + 24;
    pub const V4L2_CID_COLORFX: u32 = USER_BASE + 31;
    pub const V4L2_CID_AUTO_N_PRESET_WHITE_BALANCE: u32 = USER_BASE + 32;

    pub const V4L2_CID_EXPOSURE_AUTO: u32 = CAMERA_BASE + 1;
    pub const V4L2_CID_IMAGE_STABILIZATION: u32 = CAMERA_BASE + 22;
    pub const V4L2_CID_SCENE_MODE: u32 = CAMERA_BASE + 37;
}

/// Menu values for the camera-class controls above.
pub mod menu {
    pub const V4L2_EXPOSURE_AUTO: i32 = 0;
    pub const V4L2_EXPOSURE_MANUAL: i32 = 1;

    pub const V4L2_POWER_LINE_FREQUENCY_DISABLED: i32 = 0;
    pub const V4L2_POWER_LINE_FREQUENCY_50HZ: i32 = 1;
    pub const V4L2_POWER_LINE_FREQUENCY_60HZ: i32 = 2;
    pub const V4L2_POWER_LINE_FREQUENCY_AUTO: i32 = 3;

    pub const V4L2_WHITE_BALANCE_MANUAL: i32 = 0;
    pub const V4L2_WHITE_BALANCE_AUTO: i32 = 1;
    pub const V4L2_WHITE_BALANCE_INCANDESCENT: i32 = 2;
    pub const V4L2_WHITE_BALANCE_FLUORESCENT: i32 = 3;
    pub const V4L2_WHITE_BALANCE_DAYLIGHT: i32 = 6;
    pub const V4L2_WHITE_BALANCE_CLOUDY: i32 = 8;
    pub const V4L2_WHITE_BALANCE_SHADE: i32 = 9;

    pub const V4L2_SCENE_MODE_NONE: i32 = 0;
    pub const V4L2_SCENE_MODE_BEACH_SNOW: i32 = 2;
    pub const V4L2_SCENE_MODE_CANDLE_LIGHT: i32 = 3;
    pub const V4L2_SCENE_MODE_FIREWORKS: i32 = 6;
    pub const V4L2_SCENE_MODE_LANDSCAPE: i32 = 7;
    pub const V4L2_SCENE_MODE_NIGHT: i32 = 8;
    pub const V4L2_SCENE_MODE_PARTY_INDOOR: i32 = 9;
    pub const V4L2_SCENE_MODE_SPORTS: i32 = 11;
    pub const V4L2_SCENE_MODE_SUNSET: i32 = 12;

    pub const V4L2_COLORFX_NONE: i32 = 0;
    pub const V4L2_COLORFX_BW: i32 = 1;
    pub const V4L2_COLORFX_SEPIA: i32 = 2;
    pub const V4L2_COLORFX_NEGATIVE: i32 = 3;
    pub const V4L2_COLORFX_AQUA: i32 = 10;
    pub const V4L2_COLORFX_SOLARIZATION: i32 = 13;
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_pix_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub r#priv: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

#[repr(C)]
pub union v4l2_format_union {
    pub pix: v4l2_pix_format,
    pub raw_data: [u8; 200],
    // Force pointer alignment like the kernel union (it embeds v4l2_window).
    pub _align: [usize; 0],
}

#[repr(C)]
pub struct v4l2_format {
    pub r#type: u32,
    pub fmt: v4l2_format_union,
}

impl v4l2_format {
    pub fn zeroed(buf_type: u32) -> Self {
        let mut fmt: Self = unsafe { std::mem::zeroed() };
        fmt.r#type = buf_type;
        fmt
    }

    pub fn pix(&self) -> v4l2_pix_format {
        unsafe { self.fmt.pix }
    }

    pub fn pix_mut(&mut self) -> &mut v4l2_pix_format {
        unsafe { &mut self.fmt.pix }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub r#type: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_timecode {
    pub r#type: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
pub union v4l2_buffer_m {
    pub offset: u32,
    pub userptr: libc::c_ulong,
    pub planes: *mut libc::c_void,
    pub fd: i32,
}

#[repr(C)]
pub struct v4l2_buffer {
    pub index: u32,
    pub r#type: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: libc::timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_m,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

impl v4l2_buffer {
    pub fn zeroed(buf_type: u32) -> Self {
        let mut buf: Self = unsafe { std::mem::zeroed() };
        buf.r#type = buf_type;
        buf
    }

    pub fn userptr(&self) -> libc::c_ulong {
        unsafe { self.m.userptr }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_control {
    pub id: u32,
    pub value: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_queryctrl {
    pub id: u32,
    pub r#type: u32,
    pub name: [u8; 32],
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
    pub reserved: [u32; 2],
}

impl v4l2_queryctrl {
    pub fn zeroed(id: u32) -> Self {
        let mut q: Self = unsafe { std::mem::zeroed() };
        q.id = id;
        q
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_query_ext_ctrl {
    pub id: u32,
    pub r#type: u32,
    pub name: [u8; 32],
    pub minimum: i64,
    pub maximum: i64,
    pub step: u64,
    pub default_value: i64,
    pub flags: u32,
    pub elem_size: u32,
    pub elems: u32,
    pub nr_of_dims: u32,
    pub dims: [u32; 4],
    pub reserved: [u32; 32],
}

impl v4l2_query_ext_ctrl {
    pub fn zeroed(id: u32) -> Self {
        let mut q: Self = unsafe { std::mem::zeroed() };
        q.id = id;
        q
    }
}

#[repr(C)]
pub union v4l2_querymenu_u {
    pub name: [u8; 32],
    pub value: i64,
}

#[repr(C, packed)]
pub struct v4l2_querymenu {
    pub id: u32,
    pub index: u32,
    pub u: v4l2_querymenu_u,
    pub reserved: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_fmtdesc {
    pub index: u32,
    pub r#type: u32,
    pub flags: u32,
    pub description: [u8; 32],
    pub pixelformat: u32,
    pub mbus_code: u32,
    pub reserved: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_frmsize_discrete {
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_frmsize_stepwise {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

#[repr(C)]
pub union v4l2_frmsize_u {
    pub discrete: v4l2_frmsize_discrete,
    pub stepwise: v4l2_frmsize_stepwise,
}

#[repr(C)]
pub struct v4l2_frmsizeenum {
    pub index: u32,
    pub pixel_format: u32,
    pub r#type: u32,
    pub u: v4l2_frmsize_u,
    pub reserved: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct v4l2_fract {
    pub numerator: u32,
    pub denominator: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_frmival_stepwise {
    pub min: v4l2_fract,
    pub max: v4l2_fract,
    pub step: v4l2_fract,
}

#[repr(C)]
pub union v4l2_frmival_u {
    pub discrete: v4l2_fract,
    pub stepwise: v4l2_frmival_stepwise,
}

#[repr(C)]
pub struct v4l2_frmivalenum {
    pub index: u32,
    pub pixel_format: u32,
    pub width: u32,
    pub height: u32,
    pub r#type: u32,
    pub u: v4l2_frmival_u,
    pub reserved: [u32; 2],
}

nix::ioctl_readwrite!(vidioc_enum_fmt, b'V', 2, v4l2_fmtdesc);
nix::ioctl_readwrite!(vidioc_s_fmt, b'V', 5, v4l2_format);
nix::ioctl_readwrite!(vidioc_reqbufs, b'V', 8, v4l2_requestbuffers);
nix::ioctl_readwrite!(vidioc_querybuf, b'V', 9, v4l2_buffer);
nix::ioctl_readwrite!(vidioc_qbuf, b'V', 15, v4l2_buffer);
nix::ioctl_readwrite!(vidioc_dqbuf, b'V', 17, v4l2_buffer);
nix::ioctl_write_ptr!(vidioc_streamon, b'V', 18, libc::c_int);
nix::ioctl_write_ptr!(vidioc_streamoff, b'V', 19, libc::c_int);
nix::ioctl_readwrite!(vidioc_g_ctrl, b'V', 27, v4l2_control);
nix::ioctl_readwrite!(vidioc_s_ctrl, b'V', 28, v4l2_control);
nix::ioctl_readwrite!(vidioc_queryctrl, b'V', 36, v4l2_queryctrl);
nix::ioctl_readwrite!(vidioc_querymenu, b'V', 37, v4l2_querymenu);
nix::ioctl_readwrite!(vidioc_enum_framesizes, b'V', 74, v4l2_frmsizeenum);
nix::ioctl_readwrite!(vidioc_enum_frameintervals, b'V', 75, v4l2_frmivalenum);
nix::ioctl_readwrite!(vidioc_query_ext_ctrl, b'V', 103, v4l2_query_ext_ctrl);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_union_round_trips_pix() {
        let mut fmt = v4l2_format::zeroed(V4L2_BUF_TYPE_VIDEO_CAPTURE);
        fmt.pix_mut().width = 640;
        fmt.pix_mut().height = 480;
        fmt.pix_mut().pixelformat = pix::V4L2_PIX_FMT_YUV420;
        let pix = fmt.pix();
        assert_eq!((pix.width, pix.height), (640, 480));
        assert_eq!(pix.pixelformat, pix::V4L2_PIX_FMT_YUV420);
    }

    #[test]
    fn zeroed_buffer_carries_type() {
        let buf = v4l2_buffer::zeroed(V4L2_BUF_TYPE_VIDEO_CAPTURE);
        assert_eq!(buf.r#type, V4L2_BUF_TYPE_VIDEO_CAPTURE);
        assert_eq!(buf.index, 0);
        assert_eq!(buf.userptr(), 0);
    }
}
