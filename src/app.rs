//! Interactive window: winit event loop, camera controls and technique toggles.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::camera::Camera;
use crate::config::{RenderConfig, RendererSettings};
use crate::error::RendererError;
use crate::gpu::GpuContext;
use crate::input::{InputState, LookSource};
use crate::renderer::Renderer;
use crate::scene::Scene;

const TITLE_REFRESH: Duration = Duration::from_millis(250);

/// Window and startup options for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Models to load; empty means the caller supplies the scene.
    pub model_paths: Vec<PathBuf>,
    pub camera_position: Vec3,
    pub camera_yaw: f32,
    pub camera_pitch: f32,
    pub render: RenderConfig,
    pub settings: RendererSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            width: 1600,
            height: 900,
            model_paths: Vec::new(),
            camera_position: Vec3::new(4.0, 1.5, -2.0),
            camera_yaw: -195.0,
            camera_pitch: -15.0,
            render: RenderConfig::default(),
            settings: RendererSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn models(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.model_paths = paths.into_iter().collect();
        self
    }

    pub fn camera(mut self, position: Vec3, yaw: f32, pitch: f32) -> Self {
        self.camera_position = position;
        self.camera_yaw = yaw;
        self.camera_pitch = pitch;
        self
    }

    pub fn render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn settings(mut self, settings: RendererSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Opens a window and renders `scene` until it is closed or Escape is pressed.
pub fn run(config: AppConfig, scene: Scene) -> Result<(), RendererError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LumenApp::Pending {
        config,
        scene: Some(scene),
    };
    event_loop.run_app(&mut app)?;

    match app {
        LumenApp::Failed(error) => Err(error),
        _ => Ok(()),
    }
}

enum LumenApp {
    Pending {
        config: AppConfig,
        scene: Option<Scene>,
    },
    Running(Box<Running>),
    Failed(RendererError),
    Closed,
}

struct Running {
    title: String,
    window: Arc<Window>,
    renderer: Renderer,
    camera: Camera,
    config: RenderConfig,
    input: InputState,
    last_frame: Instant,
    last_title: Instant,
}

impl LumenApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        scene: &Scene,
    ) -> Result<Running, RendererError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone())?;
        let renderer = Renderer::new(gpu, scene, config.settings.clone())?;
        log::info!("toggles: {}", config.render.summary());

        Ok(Running {
            title: config.title.clone(),
            window,
            renderer,
            camera: Camera::new(config.camera_position, config.camera_yaw, config.camera_pitch),
            config: config.render,
            input: InputState::new(),
            last_frame: Instant::now(),
            last_title: Instant::now(),
        })
    }
}

impl ApplicationHandler for LumenApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let LumenApp::Pending { config, scene } = self else {
            return;
        };
        let Some(scene) = scene.take() else {
            return;
        };
        *self = match Self::start(event_loop, config, &scene) {
            Ok(running) => LumenApp::Running(Box::new(running)),
            Err(error) => {
                log::error!("startup failed: {error}");
                event_loop.exit();
                LumenApp::Failed(error)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let LumenApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.renderer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                if app.input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }
                if let Err(error) = app.frame() {
                    log::error!("frame failed: {error}");
                    event_loop.exit();
                    return;
                }
                app.window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let LumenApp::Running(app) = self {
            app.input.handle_device_event(&event);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        match std::mem::replace(self, LumenApp::Closed) {
            LumenApp::Running(app) => app.renderer.shutdown(),
            other => *self = other,
        }
    }
}

impl Running {
    fn frame(&mut self) -> Result<(), RendererError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.input.capture_changed() {
            self.apply_capture();
        }
        self.input.apply_to_camera(&mut self.camera, dt);
        if self.input.apply_to_config(&mut self.config) {
            log::info!("toggles: {}", self.config.summary());
        }
        let nudge = self.input.light_nudge(dt);
        if nudge != Vec3::ZERO {
            let position = self.renderer.point_light().position + nudge;
            self.renderer.set_point_light_position(position);
        }

        self.renderer.render_frame(&self.camera, &self.config)?;

        if now.duration_since(self.last_title) >= TITLE_REFRESH {
            self.last_title = now;
            let p = self.camera.position;
            self.window.set_title(&format!(
                "{} | {} | pos ({:.2}, {:.2}, {:.2}) yaw {:.1} pitch {:.1} | {:.0} fps",
                self.title,
                self.config.summary(),
                p.x,
                p.y,
                p.z,
                self.camera.yaw(),
                self.camera.pitch(),
                if dt > 0.0 { 1.0 / dt } else { 0.0 },
            ));
        }

        self.input.begin_frame();
        Ok(())
    }

    /// Confines the cursor, or locks it where confining is unsupported. A
    /// locked cursor reports no positions, so look switches to device motion.
    fn apply_capture(&mut self) {
        let captured = self.input.captured();
        let grab = if captured {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .map(|()| LookSource::Cursor)
                .or_else(|_| {
                    self.window
                        .set_cursor_grab(CursorGrabMode::Locked)
                        .map(|()| LookSource::Device)
                })
        } else {
            self.window
                .set_cursor_grab(CursorGrabMode::None)
                .map(|()| LookSource::Cursor)
        };
        match grab {
            Ok(source) => self.input.set_look_source(source),
            Err(error) => log::warn!("cursor grab unavailable: {error}"),
        }
        self.window.set_cursor_visible(!captured);
    }
}
