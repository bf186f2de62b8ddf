use image::{DynamicImage, RgbImage, RgbaImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType, Resolution as NokhwaResolution,
};
use nokhwa::Camera;

use crate::types::{CameraError, StreamRequest};

/// Opens camera devices. Shared between the adapter and its workers.
pub trait CameraBackend: Send + Sync + 'static {
    /// Acquires the device and starts streaming. Dropping the returned stream
    /// releases the device.
    fn open(
        &self,
        device_index: u32,
        request: &StreamRequest,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A running device stream, owned by exactly one capture worker.
///
/// Streams never cross threads: the worker that opens one also drops it.
pub trait CameraStream {
    fn resolution(&self) -> (u32, u32);

    /// Blocks until the next frame is available.
    fn next_frame(&mut self) -> Result<RgbaImage, CameraError>;
}

/// `nokhwa`-backed devices (V4L2, AVFoundation, or Media Foundation).
#[derive(Debug, Clone, Copy, Default)]
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    fn open(
        &self,
        device_index: u32,
        request: &StreamRequest,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        let index = CameraIndex::Index(device_index);
        let mut camera = open_with_fallback(&index, request)?;
        camera
            .open_stream()
            .map_err(|err| CameraError::StreamFailed(err.to_string()))?;
        let resolution = camera.resolution();
        tracing::debug!(
            device = device_index,
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "camera stream opened"
        );
        Ok(Box::new(NokhwaStream { camera }))
    }
}

/// Tries NV12, then MJPEG, then whatever the device offers at its highest resolution.
fn open_with_fallback(index: &CameraIndex, request: &StreamRequest) -> Result<Camera, CameraError> {
    let resolution = NokhwaResolution::new(request.width, request.height);
    let attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::NV12,
            request.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::MJPEG,
            request.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = None;
    for requested in attempts {
        match Camera::new(index.clone(), requested) {
            Ok(camera) => return Ok(camera),
            Err(err) => last_error = Some(err.to_string()),
        }
    }

    let message = last_error.unwrap_or_else(|| "no format attempts were made".to_string());
    Err(classify_open_error(message))
}

fn classify_open_error(message: String) -> CameraError {
    let lowered = message.to_lowercase();
    if ["permission", "denied", "authorization", "access"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        CameraError::PermissionDenied
    } else {
        CameraError::OpenFailed(message)
    }
}

struct NokhwaStream {
    camera: Camera,
}

impl CameraStream for NokhwaStream {
    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn next_frame(&mut self) -> Result<RgbaImage, CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| CameraError::StreamFailed(err.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|err| CameraError::StreamFailed(err.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        // Go through raw bytes so nokhwa's `image` version never leaks into ours.
        let rgb = RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            CameraError::StreamFailed(format!("decoded frame does not fill {width}x{height}"))
        })?;
        Ok(DynamicImage::ImageRgb8(rgb).into_rgba8())
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            tracing::warn!(error = %err, "failed to stop camera stream cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_messages_are_classified() {
        assert_eq!(
            classify_open_error("Access denied by user".to_string()),
            CameraError::PermissionDenied
        );
        assert_eq!(
            classify_open_error("device busy".to_string()),
            CameraError::OpenFailed("device busy".to_string())
        );
    }
}
