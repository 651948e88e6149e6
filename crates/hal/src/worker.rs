//! Asynchronous capture workers.
//!
//! Two cooperating threads per camera: the enqueuer feeds accepted
//! requests to the device and turns the stream on; the dequeuer collects
//! filled buffers, assembles result metadata, and completes requests
//! through the framework callbacks. Requests travel waiting → in-flight →
//! completed strictly in FIFO order, and the in-flight queue holds at most
//! one request (V4L2 streams one buffer at a time here).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use iris_core::queue::{BoundedRx, BoundedTx, RecvOutcome, SendOutcome, bounded};
use iris_core::tags;
use iris_metadata::registry::Metadata;
use iris_v4l2::wrapper::V4l2Wrapper;

use crate::callbacks::{CameraEvents, CaptureResult, ErrorCode, NotifyMessage};
use crate::request::{BufferStatus, CaptureRequest};

/// How long workers park before re-checking the shutdown flag.
const WORKER_PARK: Duration = Duration::from_millis(50);

pub(crate) struct Pipeline {
    waiting_tx: BoundedTx<CaptureRequest>,
    waiting_rx: BoundedRx<CaptureRequest>,
    in_flight_rx: BoundedRx<CaptureRequest>,
    stream_started: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    callbacks: Arc<dyn CameraEvents>,
    enqueuer: Option<JoinHandle<()>>,
    dequeuer: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub(crate) fn spawn(
        device: Arc<V4l2Wrapper>,
        metadata: Arc<Metadata>,
        callbacks: Arc<dyn CameraEvents>,
        queue_depth: usize,
    ) -> Self {
        let (waiting_tx, waiting_rx) = bounded::<CaptureRequest>(queue_depth);
        let (in_flight_tx, in_flight_rx) = bounded::<CaptureRequest>(1);
        let stream_started = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let enqueuer = {
            let device = device.clone();
            let callbacks = callbacks.clone();
            let waiting_rx = waiting_rx.clone();
            let stream_started = stream_started.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("iris-enqueue".into())
                .spawn(move || {
                    while !shutdown.load(Ordering::Acquire) {
                        match waiting_rx.recv_timeout(WORKER_PARK) {
                            RecvOutcome::Data(request) => enqueue_one(
                                &device,
                                &callbacks,
                                &in_flight_tx,
                                &stream_started,
                                request,
                            ),
                            RecvOutcome::Empty => {}
                            RecvOutcome::Closed => break,
                        }
                    }
                    debug!("enqueue worker exiting");
                })
                .expect("failed to spawn enqueue worker")
        };

        let dequeuer = {
            let callbacks = callbacks.clone();
            let in_flight_rx = in_flight_rx.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("iris-dequeue".into())
                .spawn(move || {
                    while !shutdown.load(Ordering::Acquire) {
                        match in_flight_rx.recv_timeout(WORKER_PARK) {
                            RecvOutcome::Data(request) => {
                                complete_capture(&device, &metadata, &callbacks, request)
                            }
                            RecvOutcome::Empty => {}
                            RecvOutcome::Closed => break,
                        }
                    }
                    debug!("dequeue worker exiting");
                })
                .expect("failed to spawn dequeue worker")
        };

        Self {
            waiting_tx,
            waiting_rx,
            in_flight_rx,
            stream_started,
            shutdown,
            callbacks,
            enqueuer: Some(enqueuer),
            dequeuer: Some(dequeuer),
        }
    }

    /// Callback channel shared with the camera for request-level errors.
    pub(crate) fn callbacks(&self) -> Arc<dyn CameraEvents> {
        self.callbacks.clone()
    }

    /// A cheap handle for submitting outside the device state lock.
    pub(crate) fn submitter(&self) -> BoundedTx<CaptureRequest> {
        self.waiting_tx.clone()
    }

    /// Turn the stream off ahead of a reconfiguration.
    pub(crate) fn stop_stream(&self, device: &V4l2Wrapper) {
        if self.stream_started.swap(false, Ordering::AcqRel) {
            if let Err(err) = device.stream_off() {
                error!(%err, "failed to stop stream");
            }
        }
    }

    /// Stop both workers and fail whatever is still queued.
    pub(crate) fn stop(&mut self, device: &V4l2Wrapper) {
        self.shutdown.store(true, Ordering::Release);
        self.waiting_tx.close();
        self.in_flight_rx.close();
        if let Some(handle) = self.enqueuer.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.dequeuer.take() {
            let _ = handle.join();
        }
        // No cancellation mid-request: anything left behind still owes the
        // framework its single result callback.
        loop {
            match self.waiting_rx.try_recv() {
                RecvOutcome::Data(request) => complete_with_error(&self.callbacks, request),
                _ => break,
            }
        }
        loop {
            match self.in_flight_rx.try_recv() {
                RecvOutcome::Data(request) => complete_with_error(&self.callbacks, request),
                _ => break,
            }
        }
        self.stop_stream(device);
    }
}

fn enqueue_one(
    device: &V4l2Wrapper,
    callbacks: &Arc<dyn CameraEvents>,
    in_flight_tx: &BoundedTx<CaptureRequest>,
    stream_started: &AtomicBool,
    request: CaptureRequest,
) {
    // Single V4L2 stream: only the first output buffer reaches the device;
    // the rest ride along in the result.
    let handle = request.output_buffers[0].buffer;
    if let Err(err) = device.enqueue_buffer(handle) {
        error!(frame = request.frame_number, %err, "device failed to enqueue buffer");
        complete_with_error(callbacks, request);
        return;
    }

    if !stream_started.load(Ordering::Acquire) {
        if let Err(err) = device.stream_on() {
            error!(frame = request.frame_number, %err, "device failed to turn on stream");
            complete_with_error(callbacks, request);
            return;
        }
        stream_started.store(true, Ordering::Release);
    }

    // Blocks while a previous request is still in flight, preserving the
    // one-at-a-time device invariant and FIFO completion order.
    match in_flight_tx.send(request) {
        SendOutcome::Ok => {}
        SendOutcome::Full(request) | SendOutcome::Closed(request) => {
            debug!(
                frame = request.frame_number,
                "in-flight queue closed during submit"
            );
            complete_with_error(callbacks, request);
        }
    }
}

fn complete_capture(
    device: &V4l2Wrapper,
    metadata: &Metadata,
    callbacks: &Arc<dyn CameraEvents>,
    mut request: CaptureRequest,
) {
    let frame = match device.dequeue_buffer() {
        Ok(frame) => frame,
        Err(err) => {
            error!(frame = request.frame_number, %err, "device failed to dequeue buffer");
            complete_with_error(callbacks, request);
            return;
        }
    };
    debug!(
        frame = request.frame_number,
        bytes = frame.bytes_used,
        sequence = frame.sequence,
        "buffer filled"
    );

    // Frame-specific result fields are appended onto the request settings.
    if let Err(err) = metadata.fill_result(&mut request.settings) {
        error!(frame = request.frame_number, %err, "failed to fill result metadata");
        complete_with_error(callbacks, request);
        return;
    }
    let timestamp = match request.settings.one::<i64>(tags::SENSOR_TIMESTAMP) {
        Ok(Some(timestamp)) => timestamp,
        _ => {
            error!(
                frame = request.frame_number,
                "result is missing required sensor timestamp"
            );
            complete_with_error(callbacks, request);
            return;
        }
    };

    callbacks.notify(NotifyMessage::Shutter {
        frame_number: request.frame_number,
        timestamp,
    });
    send_result(callbacks, request, BufferStatus::Ok);
}

/// Fail one request: an error notify, then its single result callback with
/// errored buffers.
pub(crate) fn complete_with_error(callbacks: &Arc<dyn CameraEvents>, request: CaptureRequest) {
    callbacks.notify(NotifyMessage::Error {
        frame_number: request.frame_number,
        code: ErrorCode::ErrorRequest,
    });
    send_result(callbacks, request, BufferStatus::Error);
}

fn send_result(
    callbacks: &Arc<dyn CameraEvents>,
    mut request: CaptureRequest,
    status: BufferStatus,
) {
    for buffer in &mut request.output_buffers {
        buffer.status = status;
        buffer.acquire_fence = None;
        buffer.release_fence = None;
    }
    let settings = Arc::new(std::mem::take(&mut request.settings));
    callbacks.process_capture_result(CaptureResult {
        frame_number: request.frame_number,
        settings,
        output_buffers: request.output_buffers,
        input_buffer: request.input_buffer,
    });
}
