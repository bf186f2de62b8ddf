use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use camconfig::CamConfig;
use camera::{FrameSource, NokhwaBackend};
use capture::{CaptureMachine, DesktopPlatform, Dispatch};
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn run(paths: &AppPaths, explicit_config: Option<&Path>, args: RunArgs) -> Result<()> {
    let (config_path, mut config) = load_config(paths, explicit_config)?;
    apply_run_overrides(&mut config, &args);
    config
        .validate()
        .context("invalid settings after applying command-line overrides")?;

    let download_dir = download_dir(paths, &config);
    tracing::debug!(
        config = %config_path.display(),
        downloads = %download_dir.display(),
        facing = %config.camera.facing,
        "resolved convexcam settings"
    );

    let platform = DesktopPlatform::new(download_dir)
        .with_share_dir(paths.share_dir())
        .with_share_command(config.capture.share_command.clone());
    let capture = CaptureMachine::new(
        Arc::new(platform),
        config.capture_settings(Dispatch::Threaded),
    );
    let source = FrameSource::start(
        Arc::new(NokhwaBackend),
        config.source_config(),
        config.camera.facing,
    );

    let renderer_config = RendererConfig {
        window_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        params: config.lens_parameters(),
        shape: config.lens_shape(),
        step: config.lens.step,
    };
    tracing::info!(
        curvature = config.lens.curvature,
        zoom = config.lens.zoom,
        facing = %config.camera.facing,
        "starting convexcam"
    );
    Renderer::new(renderer_config, source, capture).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the explicit config file if one was given, otherwise the one in the
/// config directory. Only the default location may be missing.
pub fn load_config(paths: &AppPaths, explicit: Option<&Path>) -> Result<(PathBuf, CamConfig)> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => paths.config_file(),
    };
    let config = CamConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    Ok((path, config))
}

pub fn apply_run_overrides(config: &mut CamConfig, args: &RunArgs) {
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(facing) = args.facing {
        config.camera.facing = facing;
    }
    if let Some(curvature) = args.curvature {
        config.lens.curvature = curvature;
    }
    if let Some(zoom) = args.zoom {
        config.lens.zoom = zoom;
    }
    if let Some(radius) = args.radius {
        config.lens.radius = radius;
    }
    if let Some(fallback) = args.fallback {
        config.capture.fallback = fallback;
    }
    if let Some(dir) = &args.download_dir {
        config.capture.download_dir = Some(dir.clone());
    }
    if !args.share_command.is_empty() {
        config.capture.share_command = args.share_command.clone();
    }
}

pub fn download_dir(paths: &AppPaths, config: &CamConfig) -> PathBuf {
    config
        .capture
        .download_dir
        .clone()
        .unwrap_or_else(|| paths.download_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera::Facing;
    use capture::FallbackPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn temp_paths(temp: &TempDir) -> AppPaths {
        AppPaths::from_raw(
            temp.path().join("config"),
            temp.path().join("cache"),
            temp.path().join("downloads"),
        )
    }

    #[test]
    fn missing_default_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let paths = temp_paths(&temp);
        let (path, config) = load_config(&paths, None).unwrap();
        assert_eq!(path, paths.config_file());
        assert_eq!(config, CamConfig::default());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = temp_paths(&temp);
        let missing = temp.path().join("nope.toml");
        assert!(load_config(&paths, Some(&missing)).is_err());
    }

    #[test]
    fn explicit_config_is_parsed() {
        let temp = TempDir::new().unwrap();
        let paths = temp_paths(&temp);
        let file = temp.path().join("custom.toml");
        fs::write(&file, "[lens]\ncurvature = 0.8\n").unwrap();

        let (_, config) = load_config(&paths, Some(&file)).unwrap();
        assert_eq!(config.lens.curvature, 0.8);
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = CamConfig::default();
        let args = RunArgs {
            size: Some((640, 480)),
            facing: Some(Facing::Environment),
            curvature: Some(0.25),
            fallback: Some(FallbackPolicy::Preview),
            share_command: vec!["xdg-open".into(), "{file}".into()],
            ..RunArgs::default()
        };
        apply_run_overrides(&mut config, &args);

        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert_eq!(config.camera.facing, Facing::Environment);
        assert_eq!(config.lens.curvature, 0.25);
        assert_eq!(config.lens.zoom, CamConfig::default().lens.zoom);
        assert_eq!(config.capture.fallback, FallbackPolicy::Preview);
        assert_eq!(config.capture.share_command, vec!["xdg-open", "{file}"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_override_fails_validation() {
        let mut config = CamConfig::default();
        let args = RunArgs {
            curvature: Some(1.5),
            ..RunArgs::default()
        };
        apply_run_overrides(&mut config, &args);
        assert!(config.validate().is_err());
    }

    #[test]
    fn configured_download_dir_wins() {
        let temp = TempDir::new().unwrap();
        let paths = temp_paths(&temp);
        let mut config = CamConfig::default();
        assert_eq!(download_dir(&paths, &config), temp.path().join("downloads"));

        config.capture.download_dir = Some(PathBuf::from("/srv/shots"));
        assert_eq!(download_dir(&paths, &config), PathBuf::from("/srv/shots"));
    }
}
