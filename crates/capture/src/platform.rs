use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

use crate::artifact::{CaptureArtifact, ShareMetadata};
use crate::error::{CaptureError, ShareError};

/// The export boundary: native sharing and file downloads.
pub trait ExportPlatform: Send + Sync + 'static {
    /// Whether [`ExportPlatform::share`] can accept this artifact.
    fn can_share(&self, artifact: &CaptureArtifact) -> bool;

    /// Hands the artifact to the platform share target. Blocks until the user
    /// finishes or cancels.
    fn share(&self, artifact: &CaptureArtifact, metadata: &ShareMetadata) -> Result<(), ShareError>;

    /// Saves the artifact under its suggested name and returns the final path.
    fn download(&self, artifact: &CaptureArtifact) -> Result<PathBuf, CaptureError>;
}

/// Staged share files older than this are removed before the next share.
pub const SHARE_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Attempts at `convex_cam_<ms>-<n>.jpg` before a download gives up.
const MAX_NAME_ATTEMPTS: u32 = 100;

const SHARE_PREFIX: &str = "convex_cam_";

/// Desktop export: an optional external share command plus a download directory.
///
/// The share command is a program followed by its arguments. `{file}`,
/// `{title}` and `{text}` are substituted in every argument; a non-zero exit
/// status counts as the user declining. The file passed as `{file}` is left in
/// the share directory after the command exits, since share targets often
/// read it later from a detached process.
#[derive(Debug, Clone)]
pub struct DesktopPlatform {
    share_command: Vec<String>,
    download_dir: PathBuf,
    share_dir: PathBuf,
}

impl DesktopPlatform {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            share_command: Vec::new(),
            download_dir: download_dir.into(),
            share_dir: env::temp_dir().join("convexcam-share"),
        }
    }

    pub fn with_share_command(mut self, command: Vec<String>) -> Self {
        self.share_command = command;
        self
    }

    pub fn with_share_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.share_dir = dir.into();
        self
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn share_dir(&self) -> &Path {
        &self.share_dir
    }

    /// Writes the artifact into the share directory and keeps it there.
    fn stage_for_share(&self, artifact: &CaptureArtifact) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.share_dir)?;
        prune_staged(&self.share_dir, SHARE_RETENTION);

        let mut staged = tempfile::Builder::new()
            .prefix(SHARE_PREFIX)
            .suffix(".jpg")
            .tempfile_in(&self.share_dir)?;
        staged.write_all(&artifact.bytes)?;
        staged.as_file().sync_all()?;
        staged.into_temp_path().keep().map_err(|err| err.error)
    }
}

impl ExportPlatform for DesktopPlatform {
    fn can_share(&self, artifact: &CaptureArtifact) -> bool {
        !self.share_command.is_empty() && !artifact.bytes.is_empty()
    }

    fn share(&self, artifact: &CaptureArtifact, metadata: &ShareMetadata) -> Result<(), ShareError> {
        let (program, args) = self
            .share_command
            .split_first()
            .ok_or_else(|| ShareError::Failed("no share command configured".to_string()))?;

        let staged = self
            .stage_for_share(artifact)
            .map_err(|err| ShareError::Failed(format!("failed to stage capture: {err}")))?;

        let file = staged.to_string_lossy().into_owned();
        let args = expand_placeholders(args, &file, metadata);
        tracing::debug!(program, ?args, "running share command");

        let status = Command::new(program)
            .args(&args)
            .status()
            .map_err(|err| ShareError::Failed(format!("failed to run '{program}': {err}")))?;

        if status.success() {
            Ok(())
        } else {
            tracing::debug!(%status, "share command declined");
            Err(ShareError::Cancelled)
        }
    }

    fn download(&self, artifact: &CaptureArtifact) -> Result<PathBuf, CaptureError> {
        let dir = &self.download_dir;
        fs::create_dir_all(dir).map_err(|source| CaptureError::Download {
            path: dir.clone(),
            source,
        })?;

        let first_target = dir.join(&artifact.suggested_file_name);
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|source| {
            CaptureError::Download {
                path: dir.clone(),
                source,
            }
        })?;
        staged
            .write_all(&artifact.bytes)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|source| CaptureError::Download {
                path: first_target.clone(),
                source,
            })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let target = dir.join(numbered_file_name(&artifact.suggested_file_name, attempt));
            match staged.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %target.display(), "capture name taken; trying next");
                    staged = err.file;
                }
                Err(err) => {
                    return Err(CaptureError::Download {
                        path: target,
                        source: err.error,
                    })
                }
            }
        }

        Err(CaptureError::Download {
            path: first_target,
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free file name after {MAX_NAME_ATTEMPTS} attempts"),
            ),
        })
    }
}

/// `convex_cam_5.jpg` for attempt 0, `convex_cam_5-2.jpg` for attempt 2.
fn numbered_file_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{stem}-{attempt}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{attempt}"),
    }
}

/// Removes staged share files older than `retention`. Best effort.
fn prune_staged(dir: &Path, retention: Duration) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let now = SystemTime::now();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_staged = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(SHARE_PREFIX));
        let expired = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if is_staged && expired {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove staged share file");
            }
        }
    }
}

/// Substitutes `{file}`, `{title}` and `{text}` in each argument.
pub fn expand_placeholders(args: &[String], file: &str, metadata: &ShareMetadata) -> Vec<String> {
    args.iter()
        .map(|arg| {
            arg.replace("{file}", file)
                .replace("{title}", &metadata.title)
                .replace("{text}", &metadata.text)
        })
        .collect()
}
