use std::path::PathBuf;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::CaptureError;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// An encoded capture, alive for one export attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub suggested_file_name: String,
    pub width: u32,
    pub height: u32,
}

/// Terminal result of one capture.
#[derive(Debug)]
pub enum ExportOutcome {
    Shared,
    Downloaded(PathBuf),
    PreviewShown,
    Aborted(CaptureError),
}

impl ExportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ExportOutcome::Shared => "shared",
            ExportOutcome::Downloaded(_) => "downloaded",
            ExportOutcome::PreviewShown => "preview",
            ExportOutcome::Aborted(_) => "aborted",
        }
    }
}

/// Title and text handed to the share target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareMetadata {
    pub title: String,
    pub text: String,
}

impl Default for ShareMetadata {
    fn default() -> Self {
        Self {
            title: "Convex Cam".to_string(),
            text: "Shot through a convex mirror".to_string(),
        }
    }
}

/// `convex_cam_<epoch-ms>.jpg`
pub fn suggested_file_name(epoch_millis: i64) -> String {
    format!("convex_cam_{epoch_millis}.jpg")
}

pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// JPEG-encodes a rendered frame. Alpha is dropped first since JPEG has none.
pub fn encode_jpeg(
    image: &RgbaImage,
    quality: u8,
    epoch_millis: i64,
) -> Result<CaptureArtifact, CaptureError> {
    let (width, height) = image.dimensions();
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();

    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)))
        .map_err(CaptureError::Encode)?;

    Ok(CaptureArtifact {
        bytes,
        mime_type: JPEG_MIME_TYPE,
        suggested_file_name: suggested_file_name(epoch_millis),
        width,
        height,
    })
}

pub fn decode_artifact(artifact: &CaptureArtifact) -> Result<RgbaImage, CaptureError> {
    image::load_from_memory_with_format(&artifact.bytes, ImageFormat::Jpeg)
        .map(DynamicImage::into_rgba8)
        .map_err(CaptureError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn file_name_pattern() {
        assert_eq!(
            suggested_file_name(1_700_000_000_123),
            "convex_cam_1700000000123.jpg"
        );
    }

    #[test]
    fn encoded_capture_decodes_to_render_dimensions() {
        let image = RgbaImage::from_pixel(37, 21, Rgba([200, 40, 90, 255]));
        let artifact = encode_jpeg(&image, DEFAULT_JPEG_QUALITY, 42).unwrap();
        assert_eq!(artifact.mime_type, "image/jpeg");
        assert_eq!((artifact.width, artifact.height), (37, 21));
        assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8]);

        let decoded = decode_artifact(&artifact).unwrap();
        assert_eq!(decoded.dimensions(), (37, 21));
        let pixel = decoded.get_pixel(18, 10);
        assert!((pixel[0] as i32 - 200).abs() < 8);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let artifact = CaptureArtifact {
            bytes: vec![1, 2, 3],
            mime_type: JPEG_MIME_TYPE,
            suggested_file_name: suggested_file_name(0),
            width: 1,
            height: 1,
        };
        assert!(matches!(
            decode_artifact(&artifact),
            Err(CaptureError::Decode(_))
        ));
    }
}
