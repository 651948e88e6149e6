//! The per-camera device state machine.
//!
//! One `Camera` sits behind the framework's device-operations table:
//! `open` connects the V4L2 device, `initialize` installs callbacks and
//! starts the pipeline workers, `configure_streams` negotiates the output
//! set, `process_capture_request` feeds the pipeline, `close` tears it all
//! down. State transitions: CLOSED → OPENED → CONFIGURED ⇄ STREAMING →
//! CLOSED.

use std::io::Write;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use iris_core::prelude::{Error, MetadataBlock, Result};
use iris_core::tags;
use iris_metadata::registry::Metadata;
use iris_v4l2::stream_format::StreamFormat;
use iris_v4l2::wrapper::V4l2Wrapper;

use crate::callbacks::CameraEvents;
use crate::config::hal_tunables;
use crate::factory::build_metadata;
use crate::request::{CaptureRequest, FrameNumber};
use crate::stream::{DataSpace, Stream, StreamConfig, StreamType, USAGE_SW_WRITE_OFTEN};
use crate::templates::{TEMPLATE_COUNT, TemplateKind, build_template};
use crate::worker::{Pipeline, complete_with_error};

/// `device_version` reported through the info table.
pub const DEVICE_API_VERSION_3_4: u32 = (3 << 8) | 4;
/// Flat cost: an open V4L2 node owns the whole capture path.
pub const RESOURCE_COST: u32 = 100;

/// Answers the framework's `get_camera_info` query.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub device_version: u32,
    pub facing: u8,
    pub orientation: i32,
    pub resource_cost: u32,
    pub conflicting_devices: Vec<u32>,
    pub static_characteristics: Arc<MetadataBlock>,
}

struct DeviceState {
    busy: bool,
    settings_set: bool,
    last_frame_number: Option<FrameNumber>,
    streams: Vec<Stream>,
    pipeline: Option<Pipeline>,
}

struct StaticCache {
    characteristics: Option<Arc<MetadataBlock>>,
    templates: [Option<Arc<MetadataBlock>>; TEMPLATE_COUNT as usize],
}

/// One physical camera.
pub struct Camera {
    id: u32,
    device: Arc<V4l2Wrapper>,
    metadata: OnceLock<Arc<Metadata>>,
    state: Mutex<DeviceState>,
    static_info: Mutex<StaticCache>,
}

impl Camera {
    pub fn new(id: u32, device: Arc<V4l2Wrapper>) -> Self {
        Self {
            id,
            device,
            metadata: OnceLock::new(),
            state: Mutex::new(DeviceState {
                busy: false,
                settings_set: false,
                last_frame_number: None,
                streams: Vec::new(),
                pipeline: None,
            }),
            static_info: Mutex::new(StaticCache {
                characteristics: None,
                templates: [const { None }; TEMPLATE_COUNT as usize],
            }),
        }
    }

    /// A camera over a kernel video node.
    pub fn v4l2(id: u32, path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(id, Arc::new(V4l2Wrapper::new(path)))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// The metadata registry, built on first use. Components query the
    /// device for capabilities, so a temporary connection is made when the
    /// camera is not open.
    fn metadata(&self) -> Result<Arc<Metadata>> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata.clone());
        }
        let was_connected = self.device.is_connected();
        if !was_connected {
            self.device.connect()?;
        }
        let built = build_metadata(self.device.clone());
        if !was_connected {
            self.device.disconnect();
        }
        let metadata = Arc::new(built?);
        let _ = self.metadata.set(metadata.clone());
        Ok(self.metadata.get().cloned().unwrap_or(metadata))
    }

    /// CLOSED → OPENED.
    pub fn open(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.busy {
            error!(camera = self.id, "camera device already opened");
            return Err(Error::Busy(format!("camera {} is already open", self.id)));
        }
        self.device.connect()?;
        if let Err(err) = self.metadata() {
            self.device.disconnect();
            return Err(err);
        }
        state.busy = true;
        debug!(camera = self.id, "opened");
        Ok(())
    }

    /// Install the callback table and start the pipeline workers.
    ///
    /// Idempotent per open session; calling again replaces the callbacks.
    pub fn initialize(&self, callbacks: Arc<dyn CameraEvents>) -> Result<()> {
        let metadata = self.metadata()?;
        let mut state = self.state.lock();
        if !state.busy {
            return Err(Error::InvalidArgument(format!(
                "camera {} is not open",
                self.id
            )));
        }
        if let Some(mut pipeline) = state.pipeline.take() {
            pipeline.stop(&self.device);
        }
        state.pipeline = Some(Pipeline::spawn(
            self.device.clone(),
            metadata,
            callbacks,
            hal_tunables().queue_depth,
        ));
        drop(state);

        // Per-device init: pre-populate the supported templates.
        for id in 1..TEMPLATE_COUNT {
            let _ = self.construct_default_request_settings(id)?;
        }
        Ok(())
    }

    /// Static characteristics, built once and shared read-only.
    fn characteristics(&self) -> Result<Arc<MetadataBlock>> {
        let mut cache = self.static_info.lock();
        if let Some(characteristics) = &cache.characteristics {
            return Ok(characteristics.clone());
        }
        let metadata = self.metadata()?;
        let mut block = MetadataBlock::new();
        metadata.fill_static(&mut block)?;
        let shared = Arc::new(block);
        cache.characteristics = Some(shared.clone());
        Ok(shared)
    }

    /// Info-table entry for this camera.
    pub fn get_info(&self) -> Result<CameraInfo> {
        let characteristics = self.characteristics()?;
        let facing = characteristics
            .one::<u8>(tags::LENS_FACING)?
            .ok_or_else(|| Error::NoDevice("static metadata is missing lens facing".into()))?;
        let orientation = characteristics
            .one::<i32>(tags::SENSOR_ORIENTATION)?
            .ok_or_else(|| Error::NoDevice("static metadata is missing orientation".into()))?;
        Ok(CameraInfo {
            device_version: DEVICE_API_VERSION_3_4,
            facing,
            orientation,
            resource_cost: RESOURCE_COST,
            conflicting_devices: Vec::new(),
            static_characteristics: characteristics,
        })
    }

    /// Default request settings for a template id; `None` for ids this HAL
    /// does not offer.
    pub fn construct_default_request_settings(
        &self,
        template_id: i32,
    ) -> Result<Option<Arc<MetadataBlock>>> {
        let Some(kind) = TemplateKind::from_id(template_id) else {
            warn!(camera = self.id, template_id, "invalid template request type");
            return Ok(None);
        };
        if !kind.is_supported() {
            return Ok(None);
        }

        let characteristics = self.characteristics()?;
        let metadata = self.metadata()?;
        let mut cache = self.static_info.lock();
        let slot = &mut cache.templates[template_id as usize];
        if let Some(template) = slot {
            return Ok(Some(template.clone()));
        }
        let built = Arc::new(build_template(&metadata, &characteristics, kind)?);
        *slot = Some(built.clone());
        Ok(Some(built))
    }

    /// OPENED/CONFIGURED → CONFIGURED. Failure preserves the previously
    /// active stream set.
    pub fn configure_streams(&self, configs: &[StreamConfig]) -> Result<()> {
        let mut state = self.state.lock();
        // New settings are required after every configuration change.
        state.settings_set = false;

        if !state.busy {
            return Err(Error::InvalidArgument(format!(
                "camera {} is not open",
                self.id
            )));
        }
        if configs.is_empty() {
            return Err(Error::InvalidArgument(
                "empty stream configuration array".into(),
            ));
        }
        if configs.iter().any(|c| c.stream_type != StreamType::Output) {
            return Err(Error::InvalidArgument(
                "input streams are not supported".into(),
            ));
        }

        // This hardware streams one configuration at a time, so every
        // stream must agree on format and geometry.
        let first = &configs[0];
        for config in &configs[1..] {
            if config.format != first.format
                || config.width != first.width
                || config.height != first.height
            {
                error!(
                    camera = self.id,
                    "one stream configuration at a time: {} {}x{} vs {} {}x{}",
                    first.format,
                    first.width,
                    first.height,
                    config.format,
                    config.width,
                    config.height
                );
                return Err(Error::InvalidArgument(
                    "all streams must share one format and size".into(),
                ));
            }
        }
        for config in configs {
            if config.rotation != 0 {
                return Err(Error::InvalidArgument(format!(
                    "rotation {} not supported",
                    config.rotation
                )));
            }
        }

        // Build the replacement set, reusing streams whose parameters
        // match; nothing is committed until the device accepts the format.
        let mut new_streams = Vec::with_capacity(configs.len());
        for config in configs {
            match state.streams.iter().find(|s| s.id() == config.id) {
                Some(existing) => {
                    if !existing.is_valid_reuse(config) {
                        return Err(Error::InvalidArgument(format!(
                            "mismatched parameters in reused stream {}",
                            config.id
                        )));
                    }
                    let mut stream = existing.clone();
                    stream.reuse = true;
                    new_streams.push(stream);
                }
                None => new_streams.push(Stream::new(config)),
            }
        }

        if let Some(pipeline) = &state.pipeline {
            pipeline.stop_stream(&self.device);
        }
        let format = StreamFormat::hal(first.format, first.width, first.height);
        let max_buffers = self.device.set_format(&format)?;
        if max_buffers < 1 {
            return Err(Error::NoDevice(format!(
                "format setup produced an invalid buffer maximum {max_buffers}"
            )));
        }

        for stream in &mut new_streams {
            stream.set_usage(USAGE_SW_WRITE_OFTEN);
            stream.set_max_buffers(max_buffers);
            // Regardless of what was asked, output data is JFIF.
            stream.set_data_space(DataSpace::Jfif);
        }
        state.streams = new_streams;
        debug!(camera = self.id, streams = state.streams.len(), "configured");
        Ok(())
    }

    /// Accept one capture request; completion is asynchronous.
    pub fn process_capture_request(&self, mut request: CaptureRequest) -> Result<()> {
        let metadata = self.metadata()?;
        let (submit, callbacks) = {
            let mut state = self.state.lock();
            if !state.busy {
                return Err(Error::InvalidArgument(format!(
                    "camera {} is not open",
                    self.id
                )));
            }
            if state.pipeline.is_none() {
                return Err(Error::InvalidArgument(format!(
                    "camera {} is not initialized",
                    self.id
                )));
            }
            if state.streams.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "camera {} has no configured streams",
                    self.id
                )));
            }
            if let Some(last) = state.last_frame_number
                && request.frame_number <= last
            {
                return Err(Error::InvalidArgument(format!(
                    "frame number {} does not advance past {last}",
                    request.frame_number
                )));
            }
            // Empty settings mean "reuse the last valid settings", which
            // requires such settings to exist.
            if request.settings.is_empty() && !state.settings_set {
                error!(
                    camera = self.id,
                    frame = request.frame_number,
                    "empty settings without a previously set request"
                );
                return Err(Error::InvalidArgument(
                    "empty settings with no previous request".into(),
                ));
            }
            if request.input_buffer.is_some() {
                return Err(Error::InvalidArgument(
                    "reprocessing input buffers are not supported".into(),
                ));
            }
            if request.output_buffers.is_empty() {
                return Err(Error::InvalidArgument(
                    "request has no output buffers".into(),
                ));
            }
            if !metadata.is_valid_request(&request.settings) {
                return Err(Error::InvalidArgument("invalid request settings".into()));
            }

            // A request with valid settings has now been provided.
            state.settings_set = true;
            state.last_frame_number = Some(request.frame_number);
            let Some(pipeline) = state.pipeline.as_ref() else {
                return Err(Error::InvalidArgument(format!(
                    "camera {} is not initialized",
                    self.id
                )));
            };
            (pipeline.submitter(), pipeline.callbacks())
        };

        // Fence waits happen outside the device state lock; a stuck
        // producer must not wedge unrelated device calls.
        let timeout = Duration::from_millis(hal_tunables().fence_timeout_ms);
        for buffer in &mut request.output_buffers {
            match buffer.preprocess(timeout) {
                Ok(()) => {}
                Err(Error::Timeout(_)) => {
                    // The request was acknowledged, so it completes with
                    // an error rather than bouncing back to the caller.
                    warn!(
                        camera = self.id,
                        frame = request.frame_number,
                        "acquire fence timed out"
                    );
                    complete_with_error(&callbacks, request);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }

        match submit.send(request) {
            iris_core::queue::SendOutcome::Ok => Ok(()),
            // Rejected before acknowledgement completes: no callbacks owed.
            iris_core::queue::SendOutcome::Full(_) | iris_core::queue::SendOutcome::Closed(_) => {
                Err(Error::NoDevice("capture pipeline is shut down".into()))
            }
        }
    }

    /// Any state → CLOSED.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.busy {
            error!(camera = self.id, "camera device not open");
            return Err(Error::InvalidArgument(format!(
                "camera {} is not open",
                self.id
            )));
        }
        if let Some(mut pipeline) = state.pipeline.take() {
            pipeline.stop(&self.device);
        }
        self.device.disconnect();
        state.busy = false;
        state.settings_set = false;
        state.streams.clear();
        debug!(camera = self.id, "closed");
        Ok(())
    }

    /// Unimplemented at this layer.
    pub fn flush(&self) -> Result<()> {
        Err(Error::NotSupported("flush is not implemented".into()))
    }

    /// Write id, busy flag, and stream dump to `out`.
    pub fn dump(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let state = self.state.lock();
        writeln!(out, "Camera ID: {} (Busy: {})", self.id, state.busy)?;
        writeln!(out, "Number of streams: {}", state.streams.len())?;
        for stream in &state.streams {
            stream.dump(out)?;
        }
        Ok(())
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        // Best-effort teardown if the framework forgot to close.
        let mut state = self.state.lock();
        if let Some(mut pipeline) = state.pipeline.take() {
            pipeline.stop(&self.device);
        }
        if state.busy {
            self.device.disconnect();
            state.busy = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CaptureResult, NotifyMessage};
    use crate::request::{SignaledFence, StreamBuffer};
    use crate::stream::StreamType;
    use iris_core::tags::values;
    use iris_v4l2::fake::FakeDevice;
    use iris_v4l2::stream_format::HalFormat;

    struct NullEvents;

    impl CameraEvents for NullEvents {
        fn notify(&self, _message: NotifyMessage) {}
        fn process_capture_result(&self, _result: CaptureResult) {}
    }

    fn fake_camera() -> (FakeDevice, Camera) {
        let device = FakeDevice::with_default_formats();
        let camera = Camera::new(0, Arc::new(device.wrapper()));
        (device, camera)
    }

    fn yuv_stream(id: u64) -> StreamConfig {
        StreamConfig::output(id, 640, 480, HalFormat::Ycbcr420)
    }

    fn request_with_settings(camera: &Camera, frame: FrameNumber) -> CaptureRequest {
        let settings = camera
            .construct_default_request_settings(1)
            .unwrap()
            .unwrap();
        CaptureRequest::new(frame, (*settings).clone()).with_output(
            StreamBuffer::new(1, 100 + frame as u64)
                .with_acquire_fence(Box::new(SignaledFence)),
        )
    }

    #[test]
    fn open_twice_reports_busy() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        assert!(matches!(camera.open(), Err(Error::Busy(_))));
        camera.close().unwrap();
        camera.open().unwrap();
        camera.close().unwrap();
    }

    #[test]
    fn close_requires_an_open_device() {
        let (_device, camera) = fake_camera();
        assert!(matches!(camera.close(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn info_reports_external_facing() {
        let (_device, camera) = fake_camera();
        let info = camera.get_info().unwrap();
        assert_eq!(info.device_version, DEVICE_API_VERSION_3_4);
        assert_eq!(info.facing, values::LENS_FACING_EXTERNAL);
        assert_eq!(info.orientation, 0);
        assert_eq!(info.resource_cost, RESOURCE_COST);
        assert!(info.conflicting_devices.is_empty());
    }

    #[test]
    fn unsupported_template_ids_return_none() {
        let (_device, camera) = fake_camera();
        assert!(camera.construct_default_request_settings(0).unwrap().is_none());
        assert!(
            camera
                .construct_default_request_settings(TEMPLATE_COUNT)
                .unwrap()
                .is_none()
        );
        for kind in [TemplateKind::ZeroShutterLag, TemplateKind::Manual] {
            assert!(
                camera
                    .construct_default_request_settings(kind.id())
                    .unwrap()
                    .is_none()
            );
        }
    }

    #[test]
    fn templates_carry_intent_and_fps_range() {
        let (_device, camera) = fake_camera();
        let preview = camera.construct_default_request_settings(1).unwrap().unwrap();
        assert_eq!(
            preview.one::<u8>(tags::CONTROL_CAPTURE_INTENT).unwrap(),
            Some(values::CAPTURE_INTENT_PREVIEW)
        );
        // Flat selection: [30, 30] beats [15, 30] for preview.
        assert_eq!(
            preview
                .array::<i32, 2>(tags::CONTROL_AE_TARGET_FPS_RANGE)
                .unwrap(),
            Some([30, 30])
        );
        assert_eq!(
            preview.one::<u8>(tags::CONTROL_AE_MODE).unwrap(),
            Some(values::AE_MODE_ON)
        );
        assert_eq!(preview.one::<u8>(tags::JPEG_QUALITY).unwrap(), Some(80));

        let still = camera.construct_default_request_settings(2).unwrap().unwrap();
        assert_eq!(
            still
                .array::<i32, 2>(tags::CONTROL_AE_TARGET_FPS_RANGE)
                .unwrap(),
            Some([15, 30])
        );
    }

    #[test]
    fn mismatched_stream_sizes_preserve_the_previous_set() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        camera.initialize(Arc::new(NullEvents)).unwrap();
        camera.configure_streams(&[yuv_stream(1)]).unwrap();

        // Two streams differing in width are rejected wholesale.
        let mut narrow = yuv_stream(2);
        narrow.width = 320;
        let err = camera
            .configure_streams(&[yuv_stream(3), narrow])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let mut dump = Vec::new();
        camera.dump(&mut dump).unwrap();
        let text = String::from_utf8(dump).unwrap();
        assert!(text.contains("Number of streams: 1"));
        assert!(text.contains("Stream 1"));
        camera.close().unwrap();
    }

    #[test]
    fn input_streams_and_rotation_are_rejected() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();

        let mut input = yuv_stream(1);
        input.stream_type = StreamType::Input;
        assert!(matches!(
            camera.configure_streams(&[input]),
            Err(Error::InvalidArgument(_))
        ));

        let mut rotated = yuv_stream(1);
        rotated.rotation = 90;
        assert!(matches!(
            camera.configure_streams(&[rotated]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            camera.configure_streams(&[]),
            Err(Error::InvalidArgument(_))
        ));
        camera.close().unwrap();
    }

    #[test]
    fn stream_reuse_must_match_parameters() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        camera.initialize(Arc::new(NullEvents)).unwrap();
        camera.configure_streams(&[yuv_stream(1)]).unwrap();

        // Same id, different geometry: not a valid reuse.
        let mut changed = StreamConfig::output(1, 1280, 720, HalFormat::Ycbcr420);
        changed.rotation = 0;
        assert!(matches!(
            camera.configure_streams(&[changed]),
            Err(Error::InvalidArgument(_))
        ));
        camera.close().unwrap();
    }

    #[test]
    fn empty_settings_require_a_previous_request() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        camera.initialize(Arc::new(NullEvents)).unwrap();
        camera.configure_streams(&[yuv_stream(1)]).unwrap();

        let empty = CaptureRequest::new(1, MetadataBlock::new())
            .with_output(StreamBuffer::new(1, 10));
        assert!(matches!(
            camera.process_capture_request(empty),
            Err(Error::InvalidArgument(_))
        ));

        camera
            .process_capture_request(request_with_settings(&camera, 2))
            .unwrap();
        // The latch is set; empty settings now reuse the previous ones.
        let empty = CaptureRequest::new(3, MetadataBlock::new())
            .with_output(StreamBuffer::new(1, 11));
        camera.process_capture_request(empty).unwrap();

        // Reconfiguration invalidates the latch.
        camera.configure_streams(&[yuv_stream(1)]).unwrap();
        let empty = CaptureRequest::new(4, MetadataBlock::new())
            .with_output(StreamBuffer::new(1, 12));
        assert!(matches!(
            camera.process_capture_request(empty),
            Err(Error::InvalidArgument(_))
        ));
        camera.close().unwrap();
    }

    #[test]
    fn frame_numbers_must_increase() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        camera.initialize(Arc::new(NullEvents)).unwrap();
        camera.configure_streams(&[yuv_stream(1)]).unwrap();

        camera
            .process_capture_request(request_with_settings(&camera, 5))
            .unwrap();
        assert!(matches!(
            camera.process_capture_request(request_with_settings(&camera, 5)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            camera.process_capture_request(request_with_settings(&camera, 4)),
            Err(Error::InvalidArgument(_))
        ));
        camera.close().unwrap();
    }

    #[test]
    fn requests_reject_input_buffers_and_unsupported_values() {
        let (_device, camera) = fake_camera();
        camera.open().unwrap();
        camera.initialize(Arc::new(NullEvents)).unwrap();
        camera.configure_streams(&[yuv_stream(1)]).unwrap();

        let mut with_input = request_with_settings(&camera, 1);
        with_input.input_buffer = Some(StreamBuffer::new(1, 99));
        assert!(matches!(
            camera.process_capture_request(with_input),
            Err(Error::InvalidArgument(_))
        ));

        let mut no_buffers = request_with_settings(&camera, 1);
        no_buffers.output_buffers.clear();
        assert!(matches!(
            camera.process_capture_request(no_buffers),
            Err(Error::InvalidArgument(_))
        ));

        let mut bad_settings = request_with_settings(&camera, 1);
        bad_settings
            .settings
            .set_one(tags::EDGE_MODE, 99u8);
        assert!(matches!(
            camera.process_capture_request(bad_settings),
            Err(Error::InvalidArgument(_))
        ));
        camera.close().unwrap();
    }

    #[test]
    fn flush_is_unimplemented() {
        let (_device, camera) = fake_camera();
        assert!(matches!(camera.flush(), Err(Error::NotSupported(_))));
    }
}
