//! Configured output surfaces.

use std::io::Write;

use iris_v4l2::stream_format::HalFormat;

/// Buffer usage bits communicated back to the allocator.
pub const USAGE_SW_READ_OFTEN: u32 = 1 << 0;
pub const USAGE_SW_WRITE_OFTEN: u32 = 1 << 1;

/// Direction of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Output,
    Input,
}

/// Color description of the stream payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSpace {
    Unknown,
    Jfif,
}

/// What the framework asks for in `configure_streams`.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Framework cookie identifying the stream across reconfigurations.
    pub id: u64,
    pub stream_type: StreamType,
    pub width: u32,
    pub height: u32,
    pub format: HalFormat,
    /// Clockwise output rotation in degrees; only 0 is accepted.
    pub rotation: u32,
    pub data_space: DataSpace,
}

impl StreamConfig {
    pub fn output(id: u64, width: u32, height: u32, format: HalFormat) -> Self {
        Self {
            id,
            stream_type: StreamType::Output,
            width,
            height,
            format,
            rotation: 0,
            data_space: DataSpace::Unknown,
        }
    }
}

/// A configured stream owned by the camera.
#[derive(Debug, Clone)]
pub struct Stream {
    id: u64,
    stream_type: StreamType,
    width: u32,
    height: u32,
    format: HalFormat,
    rotation: u32,
    data_space: DataSpace,
    usage: u32,
    max_buffers: u32,
    /// Set while a configuration pass decides this stream survives.
    pub(crate) reuse: bool,
}

impl Stream {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            id: config.id,
            stream_type: config.stream_type,
            width: config.width,
            height: config.height,
            format: config.format,
            rotation: config.rotation,
            data_space: config.data_space,
            usage: 0,
            max_buffers: 0,
            reuse: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> HalFormat {
        self.format
    }

    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    pub fn data_space(&self) -> DataSpace {
        self.data_space
    }

    pub fn usage(&self) -> u32 {
        self.usage
    }

    pub fn max_buffers(&self) -> u32 {
        self.max_buffers
    }

    pub fn is_output(&self) -> bool {
        self.stream_type == StreamType::Output
    }

    pub fn is_input(&self) -> bool {
        self.stream_type == StreamType::Input
    }

    pub(crate) fn set_usage(&mut self, usage: u32) {
        self.usage = usage;
    }

    pub(crate) fn set_max_buffers(&mut self, max_buffers: u32) {
        self.max_buffers = max_buffers;
    }

    pub(crate) fn set_data_space(&mut self, data_space: DataSpace) {
        self.data_space = data_space;
    }

    /// Validate that a reconfiguration request matches this stream's
    /// immutable parameters.
    pub fn is_valid_reuse(&self, config: &StreamConfig) -> bool {
        self.id == config.id
            && self.stream_type == config.stream_type
            && self.format == config.format
            && self.width == config.width
            && self.height == config.height
    }

    pub fn dump(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Stream {}: {:?}", self.id, self.stream_type)?;
        writeln!(out, "  Size: {}x{}", self.width, self.height)?;
        writeln!(out, "  Format: {}", self.format)?;
        writeln!(out, "  Usage: {:#x}", self.usage)?;
        writeln!(out, "  Rotation: {}", self.rotation)?;
        writeln!(out, "  Dataspace: {:?}", self.data_space)?;
        writeln!(out, "  Max buffers: {}", self.max_buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_requires_matching_parameters() {
        let config = StreamConfig::output(1, 640, 480, HalFormat::Ycbcr420);
        let stream = Stream::new(&config);
        assert!(stream.is_valid_reuse(&config));

        let mut other = config.clone();
        other.width = 1280;
        assert!(!stream.is_valid_reuse(&other));

        let mut other = config.clone();
        other.format = HalFormat::Blob;
        assert!(!stream.is_valid_reuse(&other));

        let mut other = config;
        other.id = 2;
        assert!(!stream.is_valid_reuse(&other));
    }

    #[test]
    fn dump_is_writable() {
        let stream = Stream::new(&StreamConfig::output(3, 320, 240, HalFormat::Blob));
        let mut out = Vec::new();
        stream.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("320x240"));
        assert!(text.contains("BLOB"));
    }
}
