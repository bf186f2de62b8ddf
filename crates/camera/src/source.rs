use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use crate::backend::CameraBackend;
use crate::types::{CameraError, Facing, Frame, StreamRequest};
use crate::worker::{CaptureWorker, FrameSlot};

/// Device selection and stream settings for a [`FrameSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    pub front_device: u32,
    pub back_device: u32,
    /// `request.mirror` applies to the user-facing camera only.
    pub request: StreamRequest,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            front_device: 0,
            back_device: 1,
            request: StreamRequest::default(),
        }
    }
}

impl SourceConfig {
    pub fn device_for(&self, facing: Facing) -> u32 {
        match facing {
            Facing::User => self.front_device,
            Facing::Environment => self.back_device,
        }
    }

    fn request_for(&self, facing: Facing) -> StreamRequest {
        StreamRequest {
            mirror: self.request.mirror && facing == Facing::User,
            ..self.request
        }
    }
}

/// Result of [`FrameSource::switch_facing`].
#[derive(Debug)]
pub enum SwitchRequest {
    Started(SwitchHandle),
    /// Another switch was already in flight; this request was dropped.
    Ignored,
}

impl SwitchRequest {
    pub fn is_started(&self) -> bool {
        matches!(self, SwitchRequest::Started(_))
    }
}

/// Completion of an in-flight facing switch. Dropping it does not cancel the switch.
#[derive(Debug)]
pub struct SwitchHandle {
    receiver: Receiver<Result<Facing, CameraError>>,
}

impl SwitchHandle {
    /// Blocks until the switch finishes.
    pub fn wait(self) -> Result<Facing, CameraError> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(CameraError::OpenFailed(
                "facing switch ended without reporting".to_string(),
            ))
        })
    }

    pub fn try_result(&self) -> Option<Result<Facing, CameraError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CameraError::OpenFailed(
                "facing switch ended without reporting".to_string(),
            ))),
        }
    }
}

struct Shared {
    backend: Arc<dyn CameraBackend>,
    config: SourceConfig,
    worker: Mutex<Option<CaptureWorker>>,
    slot: FrameSlot,
    facing: Mutex<Facing>,
    switching: AtomicBool,
    generation: AtomicU64,
    shutdown: AtomicBool,
}

impl Shared {
    fn take_worker(&self) -> Option<CaptureWorker> {
        self.worker.lock().ok().and_then(|mut worker| worker.take())
    }

    /// Opens `facing`'s device and installs its worker, unless the source shut down meanwhile.
    fn acquire(&self, facing: Facing) -> Result<(), CameraError> {
        let device = self.config.device_for(facing);
        let worker = CaptureWorker::spawn(
            Arc::clone(&self.backend),
            device,
            self.config.request_for(facing),
            self.slot.clone(),
        )?;

        let mut slot = self
            .worker
            .lock()
            .map_err(|_| CameraError::OpenFailed("camera state poisoned".to_string()))?;
        if self.shutdown.load(Ordering::Acquire) {
            drop(slot);
            drop(worker);
            return Ok(());
        }
        *slot = Some(worker);
        Ok(())
    }

    fn set_facing(&self, facing: Facing) {
        if let Ok(mut current) = self.facing.lock() {
            *current = facing;
        }
    }

    fn facing(&self) -> Facing {
        self.facing
            .lock()
            .map(|facing| *facing)
            .unwrap_or(Facing::User)
    }
}

/// The single live camera feeding the renderer.
///
/// At most one device is open at a time. A facing switch stops and joins the
/// current worker before the next device is requested.
pub struct FrameSource {
    shared: Arc<Shared>,
}

impl FrameSource {
    /// Opens the device for `facing`, blocking until it streams or fails.
    ///
    /// A failed acquisition is logged and leaves the source without frames.
    pub fn start(backend: Arc<dyn CameraBackend>, config: SourceConfig, facing: Facing) -> Self {
        let source = Self {
            shared: Arc::new(Shared {
                backend,
                config,
                worker: Mutex::new(None),
                slot: FrameSlot::default(),
                facing: Mutex::new(facing),
                switching: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
            }),
        };

        if let Err(err) = source.shared.acquire(facing) {
            tracing::error!(%facing, error = %err, "camera acquisition failed");
        }
        source
    }

    /// The last frame delivered by the active device, if any.
    pub fn current_frame(&self) -> Option<Frame> {
        self.shared.slot.current()
    }

    pub fn facing(&self) -> Facing {
        self.shared.facing()
    }

    pub fn is_switching(&self) -> bool {
        self.shared.switching.load(Ordering::Acquire)
    }

    /// Number of completed facing switches, successful or not.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Resolution reported by the active device.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.shared
            .worker
            .lock()
            .ok()
            .and_then(|worker| worker.as_ref().map(CaptureWorker::resolution))
    }

    /// Toggles between the user- and environment-facing cameras in the background.
    pub fn switch_facing(&self) -> SwitchRequest {
        if self
            .shared
            .switching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("facing switch already in flight; request dropped");
            return SwitchRequest::Ignored;
        }

        let (done_tx, done_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("camera-switch".to_string())
            .spawn(move || {
                let result = run_switch(&shared);
                shared.generation.fetch_add(1, Ordering::AcqRel);
                shared.switching.store(false, Ordering::Release);
                let _ = done_tx.send(result);
            });

        match spawned {
            Ok(_) => SwitchRequest::Started(SwitchHandle { receiver: done_rx }),
            Err(err) => {
                tracing::error!(error = %err, "failed to spawn facing switch");
                self.shared.switching.store(false, Ordering::Release);
                SwitchRequest::Ignored
            }
        }
    }
}

fn run_switch(shared: &Shared) -> Result<Facing, CameraError> {
    let target = shared.facing().toggled();

    if let Some(mut previous) = shared.take_worker() {
        tracing::debug!(device = previous.device_index(), "stopping camera before switch");
        previous.stop();
    }
    shared.slot.clear();
    shared.set_facing(target);

    match shared.acquire(target) {
        Ok(()) => {
            tracing::info!(facing = %target, "camera facing switched");
            Ok(target)
        }
        Err(err) => {
            tracing::error!(facing = %target, error = %err, "camera acquisition failed");
            shared.slot.clear();
            Err(err)
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(mut worker) = self.shared.take_worker() {
            worker.stop();
        }
    }
}
