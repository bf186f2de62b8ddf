use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camera::{
    CameraBackend, CameraError, CameraStream, Facing, FrameSource, SourceConfig, StreamRequest,
    SwitchRequest,
};
use image::{Rgba, RgbaImage};

/// Counts open device handles; device 9 always refuses to open.
#[derive(Default)]
struct CountingBackend {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    opens: AtomicUsize,
}

struct CountingStream {
    device: u32,
    active: Arc<AtomicUsize>,
}

impl CameraBackend for CountingBackend {
    fn open(
        &self,
        device_index: u32,
        _request: &StreamRequest,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        thread::sleep(Duration::from_millis(30));
        if device_index == 9 {
            return Err(CameraError::DeviceNotFound(device_index));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(CountingStream {
            device: device_index,
            active: Arc::clone(&self.active),
        }))
    }
}

impl CameraStream for CountingStream {
    fn resolution(&self) -> (u32, u32) {
        (4, 4)
    }

    fn next_frame(&mut self) -> Result<RgbaImage, CameraError> {
        thread::sleep(Duration::from_millis(2));
        let shade = (self.device * 40) as u8;
        Ok(RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255])))
    }
}

impl Drop for CountingStream {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn wait_for_frame(source: &FrameSource) -> Option<camera::Frame> {
    for _ in 0..500 {
        if let Some(frame) = source.current_frame() {
            return Some(frame);
        }
        thread::sleep(Duration::from_millis(2));
    }
    None
}

#[test]
fn rapid_toggles_keep_exactly_one_device_open() {
    let backend = Arc::new(CountingBackend::default());
    let config = SourceConfig {
        front_device: 1,
        back_device: 2,
        request: StreamRequest::default(),
    };
    let source = FrameSource::start(backend.clone(), config, Facing::User);
    let first = wait_for_frame(&source).expect("front camera frame");
    assert_eq!(first.image.get_pixel(0, 0)[0], 40);

    let started = source.switch_facing();
    let ignored = source.switch_facing();
    assert!(source.is_switching());
    assert!(matches!(ignored, SwitchRequest::Ignored));

    let SwitchRequest::Started(handle) = started else {
        panic!("first toggle should start a switch");
    };
    assert_eq!(handle.wait(), Ok(Facing::Environment));

    assert_eq!(source.facing(), Facing::Environment);
    assert_eq!(source.generation(), 1);
    assert!(!source.is_switching());
    assert_eq!(backend.active.load(Ordering::SeqCst), 1);
    assert_eq!(backend.peak.load(Ordering::SeqCst), 1);
    assert_eq!(backend.opens.load(Ordering::SeqCst), 2);

    let frame = wait_for_frame(&source).expect("back camera frame");
    assert_eq!(frame.image.get_pixel(0, 0)[0], 80);

    drop(source);
    assert_eq!(backend.active.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_switch_leaves_no_active_source() {
    let backend = Arc::new(CountingBackend::default());
    let config = SourceConfig {
        front_device: 1,
        back_device: 9,
        request: StreamRequest::default(),
    };
    let source = FrameSource::start(backend.clone(), config, Facing::User);
    assert!(wait_for_frame(&source).is_some());

    let SwitchRequest::Started(handle) = source.switch_facing() else {
        panic!("switch should start");
    };
    assert_eq!(handle.wait(), Err(CameraError::DeviceNotFound(9)));

    assert!(source.current_frame().is_none());
    assert_eq!(source.resolution(), None);
    assert_eq!(backend.active.load(Ordering::SeqCst), 0);

    // The next toggle goes back to the working camera.
    let SwitchRequest::Started(handle) = source.switch_facing() else {
        panic!("switch should start");
    };
    assert_eq!(handle.wait(), Ok(Facing::User));
    assert!(wait_for_frame(&source).is_some());
    assert_eq!(source.generation(), 2);
}

#[test]
fn failed_start_keeps_running_without_frames() {
    let backend = Arc::new(CountingBackend::default());
    let config = SourceConfig {
        front_device: 9,
        back_device: 9,
        request: StreamRequest::default(),
    };
    let source = FrameSource::start(backend, config, Facing::User);
    thread::sleep(Duration::from_millis(10));
    assert!(source.current_frame().is_none());
    assert_eq!(source.facing(), Facing::User);
}
