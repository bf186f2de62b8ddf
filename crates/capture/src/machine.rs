use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::artifact::{
    decode_artifact, encode_jpeg, epoch_millis, CaptureArtifact, ExportOutcome, ShareMetadata,
    DEFAULT_JPEG_QUALITY,
};
use crate::error::{CaptureError, ShareError};
use crate::platform::ExportPlatform;
use crate::task::{Dispatch, Task};

pub const FLASH_PEAK_OPACITY: f32 = 0.8;
pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(150);

/// What happens when sharing is unavailable, declined, or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Download,
    Preview,
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Download => f.write_str("download"),
            FallbackPolicy::Preview => f.write_str("preview"),
        }
    }
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "download" => Ok(FallbackPolicy::Download),
            "preview" => Ok(FallbackPolicy::Preview),
            other => Err(format!(
                "unknown fallback '{other}'; expected download or preview"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub quality: u8,
    pub fallback: FallbackPolicy,
    pub flash: Duration,
    pub metadata: ShareMetadata,
    pub dispatch: Dispatch,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            fallback: FallbackPolicy::default(),
            flash: DEFAULT_FLASH_DURATION,
            metadata: ShareMetadata::default(),
            dispatch: Dispatch::Threaded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Started,
    /// A capture was already in progress.
    Ignored,
}

/// Observable state of the capture flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Encoding,
    Sharing,
    Downloading,
    PreviewOpen,
    Aborted,
}

/// Screen flash shown when a capture fires.
#[derive(Debug, Clone, Copy)]
pub struct FlashCue {
    started: Instant,
    duration: Duration,
}

impl FlashCue {
    pub fn new(started: Instant, duration: Duration) -> Self {
        Self { started, duration }
    }

    /// Fades linearly from [`FLASH_PEAK_OPACITY`] to zero.
    pub fn opacity(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let remaining = 1.0 - (elapsed.as_secs_f32() / self.duration.as_secs_f32());
        FLASH_PEAK_OPACITY * remaining.clamp(0.0, 1.0)
    }

    pub fn finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }
}

enum Phase {
    Idle,
    Encoding(Task<Result<CaptureArtifact, CaptureError>>),
    Sharing {
        artifact: Arc<CaptureArtifact>,
        task: Task<Result<(), ShareError>>,
    },
    Downloading(Task<Result<std::path::PathBuf, CaptureError>>),
    Decoding(Task<Result<RgbaImage, CaptureError>>),
    PreviewOpen(RgbaImage),
    Aborted(CaptureError),
}

enum Step {
    Advance(Phase),
    Wait(Phase),
    Done(ExportOutcome),
}

/// Turns a capture request into exactly one [`ExportOutcome`].
///
/// Flow: snapshot and flash, encode, then share if the platform can, else the
/// configured fallback. Triggers are ignored until the previous capture has
/// resolved, including while a preview is open.
pub struct CaptureMachine {
    platform: Arc<dyn ExportPlatform>,
    settings: CaptureSettings,
    phase: Phase,
    flash: Option<FlashCue>,
}

impl CaptureMachine {
    pub fn new(platform: Arc<dyn ExportPlatform>, settings: CaptureSettings) -> Self {
        Self {
            platform,
            settings,
            phase: Phase::Idle,
            flash: None,
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn state(&self) -> CaptureState {
        match self.phase {
            Phase::Idle => CaptureState::Idle,
            Phase::Encoding(_) => CaptureState::Encoding,
            Phase::Sharing { .. } => CaptureState::Sharing,
            Phase::Downloading(_) => CaptureState::Downloading,
            Phase::Decoding(_) | Phase::PreviewOpen(_) => CaptureState::PreviewOpen,
            Phase::Aborted(_) => CaptureState::Aborted,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Starts a capture. `snapshot` renders the current frame and reads it back
    /// synchronously, so the artifact shows what was on screen at the trigger.
    pub fn trigger<F, E>(&mut self, now: Instant, snapshot: F) -> Trigger
    where
        F: FnOnce() -> Result<RgbaImage, E>,
        E: fmt::Display,
    {
        if !self.is_idle() {
            tracing::debug!(state = ?self.state(), "capture already in progress; trigger ignored");
            return Trigger::Ignored;
        }

        self.flash = Some(FlashCue::new(now, self.settings.flash));

        let image = match snapshot() {
            Ok(image) => image,
            Err(err) => {
                self.phase = Phase::Aborted(CaptureError::Snapshot(err.to_string()));
                return Trigger::Started;
            }
        };

        let quality = self.settings.quality;
        let stamp = epoch_millis();
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            quality,
            "encoding capture"
        );
        self.phase = Phase::Encoding(Task::spawn(self.settings.dispatch, "encode", move || {
            encode_jpeg(&image, quality, stamp)
        }));
        Trigger::Started
    }

    /// Advances finished asynchronous steps. Returns the outcome once the
    /// capture reaches a terminal state.
    pub fn poll(&mut self) -> Option<ExportOutcome> {
        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Idle);
            match self.step(phase) {
                Step::Advance(next) => self.phase = next,
                Step::Wait(phase) => {
                    self.phase = phase;
                    return None;
                }
                Step::Done(outcome) => {
                    match &outcome {
                        ExportOutcome::Aborted(err) => {
                            tracing::error!(error = %err, "capture aborted")
                        }
                        ExportOutcome::Downloaded(path) => {
                            tracing::info!(path = %path.display(), "capture saved")
                        }
                        other => tracing::info!(outcome = other.label(), "capture finished"),
                    }
                    return Some(outcome);
                }
            }
        }
    }

    /// The decoded capture while the preview overlay is open.
    pub fn preview(&self) -> Option<&RgbaImage> {
        match &self.phase {
            Phase::PreviewOpen(image) => Some(image),
            _ => None,
        }
    }

    pub fn dismiss_preview(&mut self) -> Option<ExportOutcome> {
        if !matches!(self.phase, Phase::PreviewOpen(_)) {
            return None;
        }
        self.phase = Phase::Idle;
        tracing::info!(outcome = "preview", "capture finished");
        Some(ExportOutcome::PreviewShown)
    }

    /// Flash overlay opacity at `now`; zero when no flash is running.
    pub fn flash_opacity(&mut self, now: Instant) -> f32 {
        match self.flash {
            Some(cue) if cue.finished(now) => {
                self.flash = None;
                0.0
            }
            Some(cue) => cue.opacity(now),
            None => 0.0,
        }
    }

    fn step(&self, phase: Phase) -> Step {
        match phase {
            Phase::Idle => Step::Wait(Phase::Idle),
            Phase::PreviewOpen(image) => Step::Wait(Phase::PreviewOpen(image)),
            Phase::Aborted(err) => Step::Done(ExportOutcome::Aborted(err)),
            Phase::Encoding(mut task) => match flatten(task.poll()) {
                Ok(None) => Step::Wait(Phase::Encoding(task)),
                Ok(Some(artifact)) => Step::Advance(self.export(Arc::new(artifact))),
                Err(err) => Step::Done(ExportOutcome::Aborted(err)),
            },
            Phase::Sharing { artifact, mut task } => match task.poll() {
                Ok(None) => Step::Wait(Phase::Sharing { artifact, task }),
                Ok(Some(Ok(()))) => Step::Done(ExportOutcome::Shared),
                Ok(Some(Err(ShareError::Cancelled))) => {
                    tracing::info!("share cancelled; using fallback");
                    Step::Advance(self.fallback(artifact))
                }
                Ok(Some(Err(err))) => {
                    tracing::warn!(error = %err, "share failed; using fallback");
                    Step::Advance(self.fallback(artifact))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "share failed; using fallback");
                    Step::Advance(self.fallback(artifact))
                }
            },
            Phase::Downloading(mut task) => match flatten(task.poll()) {
                Ok(None) => Step::Wait(Phase::Downloading(task)),
                Ok(Some(path)) => Step::Done(ExportOutcome::Downloaded(path)),
                Err(err) => Step::Done(ExportOutcome::Aborted(err)),
            },
            Phase::Decoding(mut task) => match flatten(task.poll()) {
                Ok(None) => Step::Wait(Phase::Decoding(task)),
                Ok(Some(image)) => Step::Advance(Phase::PreviewOpen(image)),
                Err(err) => Step::Done(ExportOutcome::Aborted(err)),
            },
        }
    }

    fn export(&self, artifact: Arc<CaptureArtifact>) -> Phase {
        if !self.platform.can_share(&artifact) {
            return self.fallback(artifact);
        }

        let platform = Arc::clone(&self.platform);
        let metadata = self.settings.metadata.clone();
        let shared = Arc::clone(&artifact);
        let task = Task::spawn(self.settings.dispatch, "share", move || {
            platform.share(&shared, &metadata)
        });
        Phase::Sharing { artifact, task }
    }

    fn fallback(&self, artifact: Arc<CaptureArtifact>) -> Phase {
        match self.settings.fallback {
            FallbackPolicy::Download => {
                let platform = Arc::clone(&self.platform);
                Phase::Downloading(Task::spawn(self.settings.dispatch, "download", move || {
                    platform.download(&artifact)
                }))
            }
            FallbackPolicy::Preview => Phase::Decoding(Task::spawn(
                self.settings.dispatch,
                "decode",
                move || decode_artifact(&artifact),
            )),
        }
    }
}

fn flatten<T>(polled: Result<Option<Result<T, CaptureError>>, CaptureError>) -> Result<Option<T>, CaptureError> {
    match polled {
        Ok(Some(result)) => result.map(Some),
        Ok(None) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_fades_from_peak_to_zero() {
        let start = Instant::now();
        let cue = FlashCue::new(start, Duration::from_millis(150));
        assert_eq!(cue.opacity(start), FLASH_PEAK_OPACITY);
        let halfway = cue.opacity(start + Duration::from_millis(75));
        assert!((halfway - 0.4).abs() < 1e-3);
        assert_eq!(cue.opacity(start + Duration::from_millis(400)), 0.0);
        assert!(cue.finished(start + Duration::from_millis(150)));
    }

    #[test]
    fn fallback_policy_parses() {
        assert_eq!("Preview".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Preview));
        assert_eq!("download".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Download));
        assert!("email".parse::<FallbackPolicy>().is_err());
        assert_eq!(FallbackPolicy::default().to_string(), "download");
    }
}
