use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use camconfig::CamConfig;
use capture::{encode_jpeg, epoch_millis};

use crate::cli::RenderArgs;

/// Distorts a still image on the CPU and writes it as a JPEG.
pub fn render_still(config: &CamConfig, args: &RenderArgs) -> Result<PathBuf> {
    let mut config = config.clone();
    apply_render_overrides(&mut config, args);
    config
        .validate()
        .context("invalid lens settings for still render")?;

    let input = image::open(&args.input)
        .with_context(|| format!("failed to read image {}", args.input.display()))?
        .into_rgba8();
    let (width, height) = args.size.unwrap_or_else(|| input.dimensions());

    let rendered = lens::render_image(
        &input,
        config.lens_parameters(),
        config.lens_shape(),
        width,
        height,
    );
    let artifact = encode_jpeg(&rendered, config.capture.quality, epoch_millis())
        .context("failed to encode still render")?;

    write_output(&args.output, &artifact.bytes)?;
    tracing::debug!(
        input = %args.input.display(),
        output = %args.output.display(),
        width,
        height,
        bytes = artifact.bytes.len(),
        "still render written"
    );
    Ok(args.output.clone())
}

fn apply_render_overrides(config: &mut CamConfig, args: &RenderArgs) {
    if let Some(curvature) = args.curvature {
        config.lens.curvature = curvature;
    }
    if let Some(zoom) = args.zoom {
        config.lens.zoom = zoom;
    }
    if let Some(radius) = args.radius {
        config.lens.radius = radius;
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
