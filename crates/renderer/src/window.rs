use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use camera::{FrameSource, SwitchHandle, SwitchRequest};
use capture::{CaptureMachine, Trigger};
use lens::LensShape;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::controls::{action_for_key, escape_response, Action, Controls, EscapeResponse};
use crate::gpu::{GpuState, Scene};
use crate::types::RendererConfig;

/// Whether the event loop should keep running after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Everything one tick of the render loop reads or writes.
///
/// `gpu` is declared before `window` so the surface is dropped first.
pub(crate) struct PipelineState {
    gpu: GpuState,
    window: Arc<Window>,
    controls: Controls,
    shape: LensShape,
    base_title: String,
    source: FrameSource,
    capture: CaptureMachine,
    pending_resize: Option<PhysicalSize<u32>>,
    pending_switch: Option<SwitchHandle>,
}

impl PipelineState {
    pub(crate) fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        source: FrameSource,
        capture: CaptureMachine,
    ) -> Result<Self> {
        let gpu = GpuState::new(window.as_ref(), window.inner_size())?;
        let state = Self {
            gpu,
            window,
            controls: Controls::new(config.params, config.step),
            shape: config.shape,
            base_title: config.title.clone(),
            source,
            capture,
            pending_resize: None,
            pending_switch: None,
        };
        state.refresh_title();
        Ok(state)
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Records the latest size; only the last one before a frame is applied.
    pub(crate) fn queue_resize(&mut self, size: PhysicalSize<u32>) {
        self.pending_resize = Some(size);
    }

    pub(crate) fn recover_surface(&mut self) {
        self.gpu.recover_surface();
    }

    pub(crate) fn handle_action(&mut self, action: Action) -> Flow {
        match action {
            Action::Capture => self.capture_frame(),
            Action::ToggleFacing => self.toggle_facing(),
            Action::Dismiss => match escape_response(self.capture.state()) {
                EscapeResponse::ClosePreview => {
                    if self.capture.dismiss_preview().is_none() {
                        debug!("preview still decoding; escape ignored");
                    }
                }
                EscapeResponse::Quit => return Flow::Exit,
            },
            lens_action => {
                if self.controls.apply(lens_action) {
                    self.refresh_title();
                }
            }
        }
        Flow::Continue
    }

    /// A click anywhere closes the preview modal.
    pub(crate) fn handle_click(&mut self) {
        self.capture.dismiss_preview();
    }

    /// One frame: resize, upload, render, present, then advance background
    /// work.
    pub(crate) fn tick(&mut self) -> Result<(), wgpu::SurfaceError> {
        if let Some(size) = self.pending_resize.take() {
            self.gpu.resize(size);
        }

        let frame = self.source.current_frame();
        let flash_opacity = self.capture.flash_opacity(Instant::now());
        let scene = Scene {
            params: self.controls.params(),
            shape: self.shape,
            frame: frame.as_ref(),
            flash_opacity,
            preview: self.capture.preview(),
        };
        let rendered = self.gpu.render(&scene);

        self.capture.poll();
        self.poll_switch();
        rendered
    }

    fn capture_frame(&mut self) {
        let frame = self.source.current_frame();
        let scene = Scene {
            params: self.controls.params(),
            shape: self.shape,
            frame: frame.as_ref(),
            flash_opacity: 0.0,
            preview: None,
        };
        let gpu = &mut self.gpu;
        if self.capture.trigger(Instant::now(), || gpu.snapshot(&scene)) == Trigger::Ignored {
            info!("capture already in progress");
        }
    }

    fn toggle_facing(&mut self) {
        match self.source.switch_facing() {
            SwitchRequest::Started(handle) => {
                info!(to = %self.source.facing().toggled(), "switching camera");
                self.pending_switch = Some(handle);
            }
            SwitchRequest::Ignored => info!("camera switch already in progress"),
        }
    }

    fn poll_switch(&mut self) {
        let Some(result) = self.pending_switch.as_ref().and_then(SwitchHandle::try_result) else {
            return;
        };
        self.pending_switch = None;
        match result {
            Ok(facing) => info!(%facing, "camera switched"),
            Err(err) => warn!(error = %err, "camera switch left no active device"),
        }
    }

    fn refresh_title(&self) {
        self.window.set_title(&self.controls.title(&self.base_title));
    }
}

/// Opens the window and runs the render loop until the user quits.
pub(crate) fn run(config: RendererConfig, source: FrameSource, capture: CaptureMachine) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.window_size.0, config.window_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create camera window: {err}"))?;
    let window = Arc::new(window);

    let mut state = PipelineState::new(window, &config, source, capture)
        .map_err(|err| anyhow!("failed to initialise window renderer: {err:#}"))?;
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed && !event.repeat {
                            if let Some(action) = action_for_key(&event.logical_key) {
                                if state.handle_action(action) == Flow::Exit {
                                    elwt.exit();
                                }
                            }
                        }
                    }
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        state.handle_click();
                    }
                    WindowEvent::Resized(new_size) => {
                        state.queue_resize(new_size);
                    }
                    WindowEvent::RedrawRequested => match state.tick() {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.recover_surface();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!("surface error: {other:?}; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
