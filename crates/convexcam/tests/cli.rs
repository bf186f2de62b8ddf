use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn convexcam(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_convexcam"))
        .env("CONVEXCAM_CONFIG_DIR", config_dir)
        .env("CONVEXCAM_DOWNLOAD_DIR", config_dir.join("downloads"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run convexcam")
}

#[test]
fn config_where_reports_resolved_paths() {
    let root = TempDir::new().unwrap();
    let output = convexcam(root.path(), &["config", "where"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("convexcam.toml"));
    assert!(stdout.contains("missing, using defaults"));
    assert!(stdout.contains(&root.path().join("downloads").display().to_string()));
}

#[test]
fn config_show_prints_file_values() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("convexcam.toml"),
        "[lens]\ncurvature = 0.75\n\n[capture]\nfallback = \"preview\"\n",
    )
    .unwrap();

    let output = convexcam(root.path(), &["config", "show"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("curvature = 0.75"));
    assert!(stdout.contains("fallback = \"preview\""));
    assert!(stdout.contains("[window]"));
}

#[test]
fn invalid_config_fails() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("convexcam.toml"), "[lens]\nzoom = -2.0\n").unwrap();

    let output = convexcam(root.path(), &["config", "show"]);
    assert!(!output.status.success());
}

#[test]
fn render_writes_a_jpeg_of_the_requested_size() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("input.png");
    RgbaImage::from_pixel(40, 30, Rgba([128, 128, 128, 255]))
        .save(&input)
        .unwrap();
    let output_path = root.path().join("still.jpg");

    let output = convexcam(
        root.path(),
        &[
            "render",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output_path.to_str().unwrap(),
            "--size",
            "120x90",
            "--curvature",
            "0.8",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bytes = fs::read(&output_path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (120, 90));
}

#[test]
fn render_with_missing_input_fails() {
    let root = TempDir::new().unwrap();
    let output = convexcam(
        root.path(),
        &[
            "render",
            "--input",
            root.path().join("absent.png").to_str().unwrap(),
            "--output",
            root.path().join("out.jpg").to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(!root.path().join("out.jpg").exists());
}
