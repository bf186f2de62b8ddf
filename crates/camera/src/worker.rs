//! Background capture thread for a single device.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::bounded;
use image::imageops;

use crate::backend::CameraBackend;
use crate::types::{CameraError, Frame, StreamRequest};

const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Where workers publish frames. Shared with the owning [`crate::FrameSource`].
#[derive(Clone, Default)]
pub(crate) struct FrameSlot {
    latest: Arc<Mutex<Option<Frame>>>,
    sequence: Arc<AtomicU64>,
}

impl FrameSlot {
    pub(crate) fn publish(&self, image: image::RgbaImage) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(Frame {
                image: Arc::new(image),
                sequence,
            });
        }
    }

    pub(crate) fn current(&self) -> Option<Frame> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }
}

/// Owns one open device stream on its own thread.
///
/// The stream is opened, read, and dropped on that thread; [`CaptureWorker::stop`]
/// returns only after the device has been released.
pub(crate) struct CaptureWorker {
    device_index: u32,
    resolution: (u32, u32),
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// Opens `device_index` and starts publishing frames into `slot`.
    ///
    /// Blocks until the device either streams or fails to open.
    pub(crate) fn spawn(
        backend: Arc<dyn CameraBackend>,
        device_index: u32,
        request: StreamRequest,
        slot: FrameSlot,
    ) -> Result<Self, CameraError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (opened_tx, opened_rx) = bounded(1);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(format!("camera-{device_index}"))
            .spawn(move || {
                let mut stream = match backend.open(device_index, &request) {
                    Ok(stream) => {
                        let _ = opened_tx.send(Ok(stream.resolution()));
                        stream
                    }
                    Err(err) => {
                        let _ = opened_tx.send(Err(err));
                        return;
                    }
                };

                let mut failing = false;
                while !thread_stop.load(Ordering::Acquire) {
                    match stream.next_frame() {
                        Ok(mut image) => {
                            if request.mirror {
                                imageops::flip_horizontal_in_place(&mut image);
                            }
                            if thread_stop.load(Ordering::Acquire) {
                                break;
                            }
                            slot.publish(image);
                            failing = false;
                        }
                        Err(err) => {
                            if !failing {
                                tracing::warn!(device = device_index, error = %err, "camera frame read failed");
                                failing = true;
                            }
                            thread::sleep(RETRY_DELAY);
                        }
                    }
                }
                drop(stream);
                tracing::debug!(device = device_index, "camera worker released device");
            })
            .map_err(|err| CameraError::OpenFailed(format!("failed to spawn capture thread: {err}")))?;

        let mut worker = Self {
            device_index,
            resolution: (0, 0),
            stop,
            handle: Some(handle),
        };

        match opened_rx.recv() {
            Ok(Ok(resolution)) => {
                worker.resolution = resolution;
                tracing::info!(
                    device = device_index,
                    width = resolution.0,
                    height = resolution.1,
                    "camera streaming"
                );
                Ok(worker)
            }
            Ok(Err(err)) => {
                worker.join();
                Err(err)
            }
            Err(_) => {
                worker.join();
                Err(CameraError::OpenFailed(
                    "capture thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    pub(crate) fn device_index(&self) -> u32 {
        self.device_index
    }

    pub(crate) fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Signals the thread and waits for it to release the device.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(device = self.device_index, "camera worker panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
