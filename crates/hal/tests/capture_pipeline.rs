//! End-to-end capture pipeline tests against the scripted V4L2 driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use iris_hal::prelude::*;
use iris_hal::v4l2::fake::FakeDevice;

/// Records every notify and result, and lets tests wait for completion.
#[derive(Default)]
struct RecordingEvents {
    state: Mutex<Recorded>,
    delivered: Condvar,
}

#[derive(Default)]
struct Recorded {
    shutters: Vec<(FrameNumber, i64)>,
    errors: Vec<(FrameNumber, ErrorCode)>,
    results: Vec<CaptureResult>,
}

impl RecordingEvents {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until `count` results have arrived or the deadline passes.
    fn wait_for_results(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.results.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero()
                || self.delivered.wait_for(&mut state, remaining).timed_out()
            {
                return state.results.len() >= count;
            }
        }
        true
    }
}

impl CameraEvents for RecordingEvents {
    fn notify(&self, message: NotifyMessage) {
        let mut state = self.state.lock();
        match message {
            NotifyMessage::Shutter {
                frame_number,
                timestamp,
            } => state.shutters.push((frame_number, timestamp)),
            NotifyMessage::Error { frame_number, code } => {
                state.errors.push((frame_number, code))
            }
        }
    }

    fn process_capture_result(&self, result: CaptureResult) {
        let mut state = self.state.lock();
        state.results.push(result);
        self.delivered.notify_all();
    }
}

fn open_camera() -> (FakeDevice, Camera, Arc<RecordingEvents>) {
    let device = FakeDevice::with_default_formats();
    let camera = Camera::new(0, Arc::new(device.wrapper()));
    camera.open().unwrap();
    let events = RecordingEvents::new();
    camera.initialize(events.clone()).unwrap();
    camera
        .configure_streams(&[StreamConfig::output(1, 640, 480, HalFormat::Ycbcr420)])
        .unwrap();
    (device, camera, events)
}

fn preview_request(camera: &Camera, frame: FrameNumber) -> CaptureRequest {
    let settings = camera
        .construct_default_request_settings(TemplateKind::Preview.id())
        .unwrap()
        .unwrap();
    CaptureRequest::new(frame, (*settings).clone()).with_output(
        StreamBuffer::new(1, 1_000 + frame as u64).with_acquire_fence(Box::new(SignaledFence)),
    )
}

#[test]
fn capture_happy_path_delivers_shutter_and_result() {
    let (device, camera, events) = open_camera();

    camera
        .process_capture_request(preview_request(&camera, 1))
        .unwrap();
    assert!(events.wait_for_results(1, Duration::from_secs(5)));

    let state = events.state.lock();
    assert!(state.errors.is_empty());
    assert_eq!(state.shutters.len(), 1);
    assert_eq!(state.results.len(), 1);

    let (shutter_frame, shutter_timestamp) = state.shutters[0];
    assert_eq!(shutter_frame, 1);
    assert!(shutter_timestamp > 0);

    let result = &state.results[0];
    assert_eq!(result.frame_number, 1);
    assert!(result.input_buffer.is_none());
    assert_eq!(result.output_buffers.len(), 1);
    assert_eq!(result.output_buffers[0].status, BufferStatus::Ok);
    // The shutter timestamp is the settings' sensor timestamp.
    assert_eq!(
        result
            .settings
            .one::<i64>(iris_hal::core::tags::SENSOR_TIMESTAMP)
            .unwrap(),
        Some(shutter_timestamp)
    );
    drop(state);

    assert!(device.is_streaming());
    camera.close().unwrap();
    assert!(!device.is_streaming());
}

#[test]
fn every_request_completes_exactly_once_in_order() {
    let (_device, camera, events) = open_camera();

    for frame in 1..=4 {
        camera
            .process_capture_request(preview_request(&camera, frame))
            .unwrap();
    }
    assert!(events.wait_for_results(4, Duration::from_secs(5)));

    let state = events.state.lock();
    assert!(state.errors.is_empty());
    assert_eq!(state.results.len(), 4);
    assert_eq!(state.shutters.len(), 4);

    // Frame numbers are delivered monotonically and shutter timestamps
    // strictly increase.
    let frames: Vec<FrameNumber> = state.results.iter().map(|r| r.frame_number).collect();
    assert_eq!(frames, vec![1, 2, 3, 4]);
    for pair in state.shutters.windows(2) {
        assert!(pair[0].0 < pair[1].0);
        assert!(pair[0].1 < pair[1].1);
    }
    drop(state);

    camera.close().unwrap();
}

#[test]
fn fence_timeout_fails_the_request_not_the_device() {
    let (_device, camera, events) = open_camera();

    // First request carries valid settings so the latch is set, then a
    // stuck fence forces a per-request failure.
    let settings = camera
        .construct_default_request_settings(TemplateKind::Preview.id())
        .unwrap()
        .unwrap();
    let stuck = CaptureRequest::new(1, (*settings).clone())
        .with_output(StreamBuffer::new(1, 7).with_acquire_fence(Box::new(StuckFence)));
    camera.process_capture_request(stuck).unwrap();
    assert!(events.wait_for_results(1, Duration::from_secs(5)));

    {
        let state = events.state.lock();
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0], (1, ErrorCode::ErrorRequest));
        assert!(state.shutters.is_empty());
        let result = &state.results[0];
        assert_eq!(result.frame_number, 1);
        assert_eq!(result.output_buffers[0].status, BufferStatus::Error);
        assert!(result.output_buffers[0].acquire_fence.is_none());
        assert!(result.output_buffers[0].release_fence.is_none());
    }

    // The camera keeps working afterwards.
    camera
        .process_capture_request(preview_request(&camera, 2))
        .unwrap();
    assert!(events.wait_for_results(2, Duration::from_secs(5)));
    {
        let state = events.state.lock();
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.results[1].frame_number, 2);
        assert_eq!(state.results[1].output_buffers[0].status, BufferStatus::Ok);
    }
    camera.close().unwrap();
}

#[test]
fn no_buffers_leak_across_a_session() {
    let (device, camera, events) = open_camera();

    for frame in 1..=3 {
        camera
            .process_capture_request(preview_request(&camera, frame))
            .unwrap();
    }
    assert!(events.wait_for_results(3, Duration::from_secs(5)));
    camera.close().unwrap();

    // Stream-off and disconnect return every gralloc lock.
    assert_eq!(device.counters().queue_buffer, 3);
    assert_eq!(device.counters().dequeue_buffer, 3);
}

#[test]
fn reconfiguration_switches_formats() {
    let (device, camera, events) = open_camera();

    camera
        .process_capture_request(preview_request(&camera, 1))
        .unwrap();
    assert!(events.wait_for_results(1, Duration::from_secs(5)));

    // Same format and size: the device keeps its negotiated format.
    camera
        .configure_streams(&[StreamConfig::output(1, 640, 480, HalFormat::Ycbcr420)])
        .unwrap();
    assert_eq!(device.counters().set_format, 1);

    // A new geometry renegotiates.
    camera
        .configure_streams(&[StreamConfig::output(9, 1280, 720, HalFormat::Ycbcr420)])
        .unwrap();
    assert_eq!(device.counters().set_format, 2);
    camera.close().unwrap();
}
