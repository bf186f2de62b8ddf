use camera::Frame;

use super::pipeline::Pipelines;
use super::texture::SampledTexture;

/// What a tick has to do to bring the camera texture up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameUpload {
    /// Same frame as last tick.
    Keep,
    /// New frame, same size: write in place.
    Write,
    /// New frame at a new size: replace the texture and its bind group.
    Recreate,
    /// The source lost its device: fall back to the black placeholder.
    Clear,
}

pub(crate) fn plan_upload(
    uploaded: Option<u64>,
    texture_size: (u32, u32),
    frame: Option<(u64, (u32, u32))>,
) -> FrameUpload {
    match (uploaded, frame) {
        (None, None) => FrameUpload::Keep,
        (Some(_), None) => FrameUpload::Clear,
        (Some(last), Some((sequence, _))) if last == sequence => FrameUpload::Keep,
        (_, Some((_, size))) if size != texture_size => FrameUpload::Recreate,
        (_, Some(_)) => FrameUpload::Write,
    }
}

/// The camera texture sampled by the lens pass. Uploads only when the frame
/// sequence number changes.
pub(crate) struct FrameTexture {
    texture: SampledTexture,
    bind_group: wgpu::BindGroup,
    uploaded: Option<u64>,
}

impl FrameTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, pipelines: &Pipelines) -> Self {
        let texture = SampledTexture::placeholder(device, queue, "camera placeholder");
        let bind_group = pipelines.camera_bind_group(device, &texture);
        Self {
            texture,
            bind_group,
            uploaded: None,
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipelines: &Pipelines,
        frame: Option<&Frame>,
    ) -> FrameUpload {
        let action = plan_upload(
            self.uploaded,
            self.texture.size,
            frame.map(|frame| (frame.sequence, frame.dimensions())),
        );

        match (action, frame) {
            (FrameUpload::Write, Some(frame)) => {
                self.texture.write(queue, &frame.image);
                self.uploaded = Some(frame.sequence);
            }
            (FrameUpload::Recreate, Some(frame)) => {
                tracing::debug!(
                    width = frame.image.width(),
                    height = frame.image.height(),
                    "camera resolution changed; recreating texture"
                );
                self.replace(
                    device,
                    pipelines,
                    SampledTexture::from_image(device, queue, "camera frame", &frame.image),
                );
                self.uploaded = Some(frame.sequence);
            }
            (FrameUpload::Clear, _) => {
                self.replace(
                    device,
                    pipelines,
                    SampledTexture::placeholder(device, queue, "camera placeholder"),
                );
                self.uploaded = None;
            }
            _ => {}
        }
        action
    }

    fn replace(&mut self, device: &wgpu::Device, pipelines: &Pipelines, texture: SampledTexture) {
        self.texture.texture.destroy();
        self.bind_group = pipelines.camera_bind_group(device, &texture);
        self.texture = texture;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_sequence_skips_upload() {
        assert_eq!(
            plan_upload(Some(4), (640, 480), Some((4, (640, 480)))),
            FrameUpload::Keep
        );
        assert_eq!(plan_upload(None, (1, 1), None), FrameUpload::Keep);
    }

    #[test]
    fn new_frame_at_same_size_writes_in_place() {
        assert_eq!(
            plan_upload(Some(4), (640, 480), Some((5, (640, 480)))),
            FrameUpload::Write
        );
    }

    #[test]
    fn first_frame_replaces_the_placeholder() {
        assert_eq!(
            plan_upload(None, (1, 1), Some((0, (640, 480)))),
            FrameUpload::Recreate
        );
        assert_eq!(
            plan_upload(Some(9), (640, 480), Some((10, (1280, 720)))),
            FrameUpload::Recreate
        );
    }

    #[test]
    fn lost_device_clears_to_placeholder() {
        assert_eq!(plan_upload(Some(3), (640, 480), None), FrameUpload::Clear);
    }
}
