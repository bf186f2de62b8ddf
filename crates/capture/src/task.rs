use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use crate::error::CaptureError;

/// Where capture work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// On the caller's thread, finished before the task is returned.
    Inline,
    /// On a worker thread, polled without blocking.
    #[default]
    Threaded,
}

/// A unit of capture work that the state machine polls each tick.
pub(crate) enum Task<T> {
    Ready(Option<T>),
    Threaded { receiver: Receiver<T> },
}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn spawn<F>(dispatch: Dispatch, name: &str, work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        match dispatch {
            Dispatch::Inline => Task::Ready(Some(work())),
            Dispatch::Threaded => {
                let (sender, receiver) = bounded(1);
                let spawned = thread::Builder::new()
                    .name(format!("capture-{name}"))
                    .spawn(move || {
                        let _ = sender.send(work());
                    });
                if let Err(err) = spawned {
                    tracing::warn!(task = name, error = %err, "failed to spawn capture worker");
                }
                Task::Threaded { receiver }
            }
        }
    }

    /// `Ok(None)` while the work is still running.
    pub(crate) fn poll(&mut self) -> Result<Option<T>, CaptureError> {
        match self {
            Task::Ready(value) => value.take().map(Some).ok_or(CaptureError::WorkerDisconnected),
            Task::Threaded { receiver } => match receiver.try_recv() {
                Ok(value) => Ok(Some(value)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(CaptureError::WorkerDisconnected),
            },
        }
    }
}
