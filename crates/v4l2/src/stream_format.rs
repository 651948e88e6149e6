//! Negotiated stream format and the HAL↔V4L2 pixel-format map.

use std::fmt;

use iris_core::prelude::FourCc;

use crate::ioctl::{self, pix, v4l2_format};

/// Pixel formats in the HAL's taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalFormat {
    /// Flexible YCbCr 4:2:0.
    Ycbcr420,
    /// Opaque blob (JPEG).
    Blob,
}

impl HalFormat {
    /// Map a V4L2 pixel format into the HAL taxonomy; unrecognized formats
    /// are discarded by callers.
    pub fn from_v4l2(pixelformat: u32) -> Option<Self> {
        match pixelformat {
            pix::V4L2_PIX_FMT_YUV420 => Some(HalFormat::Ycbcr420),
            pix::V4L2_PIX_FMT_JPEG | pix::V4L2_PIX_FMT_MJPEG => Some(HalFormat::Blob),
            _ => None,
        }
    }

    /// Preferred V4L2 encoding of this HAL format.
    pub fn to_v4l2(self) -> u32 {
        match self {
            HalFormat::Ycbcr420 => pix::V4L2_PIX_FMT_YUV420,
            HalFormat::Blob => pix::V4L2_PIX_FMT_JPEG,
        }
    }

    /// Numeric code used in metadata entries.
    pub fn code(self) -> i32 {
        match self {
            HalFormat::Ycbcr420 => 0x23,
            HalFormat::Blob => 0x21,
        }
    }
}

impl fmt::Display for HalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalFormat::Ycbcr420 => write!(f, "YCbCr_420_888"),
            HalFormat::Blob => write!(f, "BLOB"),
        }
    }
}

/// The format a capture stream negotiates with the driver.
///
/// Equality ignores driver-filled layout fields (`bytes_per_line`,
/// `min_buffer_size`): two formats match when type, pixel format, and
/// geometry match, which is the idempotence test for `S_FMT`.
#[derive(Debug, Clone, Copy)]
pub struct StreamFormat {
    pub buf_type: u32,
    pub fourcc: FourCc,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    pub min_buffer_size: u32,
}

impl StreamFormat {
    /// Describe a capture format to request from the driver.
    pub fn new(fourcc: FourCc, width: u32, height: u32) -> Self {
        Self {
            buf_type: ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE,
            fourcc,
            width,
            height,
            bytes_per_line: 0,
            min_buffer_size: 0,
        }
    }

    /// Capture format in the HAL taxonomy.
    pub fn hal(hal: HalFormat, width: u32, height: u32) -> Self {
        Self::new(FourCc::from(hal.to_v4l2()), width, height)
    }

    /// Fill an `S_FMT` request from this description.
    pub fn fill_request(&self, out: &mut v4l2_format) {
        out.r#type = self.buf_type;
        let pix = out.pix_mut();
        pix.width = self.width;
        pix.height = self.height;
        pix.pixelformat = self.fourcc.to_u32();
    }

    /// Read back what the driver actually programmed.
    pub fn from_device(format: &v4l2_format) -> Self {
        let pix = format.pix();
        Self {
            buf_type: format.r#type,
            fourcc: FourCc::from(pix.pixelformat),
            width: pix.width,
            height: pix.height,
            bytes_per_line: pix.bytesperline,
            min_buffer_size: pix.sizeimage,
        }
    }
}

impl PartialEq for StreamFormat {
    fn eq(&self, other: &Self) -> bool {
        self.buf_type == other.buf_type
            && self.fourcc == other.fourcc
            && self.width == other.width
            && self.height == other.height
    }
}

impl Eq for StreamFormat {}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{}", self.fourcc, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_layout_fields() {
        let mut a = StreamFormat::new(FourCc::new(*b"YU12"), 640, 480);
        let b = StreamFormat::new(FourCc::new(*b"YU12"), 640, 480);
        a.bytes_per_line = 960;
        a.min_buffer_size = 460_800;
        assert_eq!(a, b);
    }

    #[test]
    fn equality_detects_driver_coercion() {
        let requested = StreamFormat::new(FourCc::new(*b"YU12"), 640, 480);
        let mut coerced = v4l2_format::zeroed(ioctl::V4L2_BUF_TYPE_VIDEO_CAPTURE);
        requested.fill_request(&mut coerced);
        coerced.pix_mut().width = 320;
        assert_ne!(requested, StreamFormat::from_device(&coerced));
    }

    #[test]
    fn hal_mapping_covers_required_formats() {
        assert_eq!(
            HalFormat::from_v4l2(pix::V4L2_PIX_FMT_YUV420),
            Some(HalFormat::Ycbcr420)
        );
        assert_eq!(
            HalFormat::from_v4l2(pix::V4L2_PIX_FMT_MJPEG),
            Some(HalFormat::Blob)
        );
        assert_eq!(HalFormat::from_v4l2(pix::V4L2_PIX_FMT_YUYV), None);
    }
}
