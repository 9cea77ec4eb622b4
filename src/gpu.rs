//! Core GPU context and device management.
//!
//! [`GpuContext`] holds the wgpu device, queue and output configuration, and
//! is passed by reference to every pass. It is created either for a winit
//! window ([`GpuContext::new`]) or without one ([`GpuContext::headless`]), in
//! which case frames are rendered into an off-screen texture that can be read
//! back.
//!
//! The output format is display-referred: the composite pass writes final
//! values and no sRGB conversion is applied on store, so a non-sRGB surface
//! format is preferred.
//!
//! # Example
//!
//! ```no_run
//! use lumen::GpuContext;
//!
//! let gpu = GpuContext::headless(64, 64)?;
//! assert_eq!(gpu.width(), 64);
//! # Ok::<(), lumen::RendererError>(())
//! ```

use std::sync::Arc;

use winit::window::Window;

use crate::error::RendererError;

/// Format of the off-screen output when there is no window.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Core GPU context holding wgpu resources.
pub struct GpuContext {
    /// Window surface, or `None` when headless.
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Output format and size. Also describes the headless texture.
    pub config: wgpu::SurfaceConfiguration,
    offscreen: Option<wgpu::Texture>,
}

/// The texture a frame is composited into.
pub enum FrameOutput {
    Surface(wgpu::SurfaceTexture),
    Offscreen(wgpu::Texture),
}

impl FrameOutput {
    pub fn view(&self) -> wgpu::TextureView {
        let texture = match self {
            FrameOutput::Surface(frame) => &frame.texture,
            FrameOutput::Offscreen(texture) => texture,
        };
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn present(self) {
        if let FrameOutput::Surface(frame) = self {
            frame.present();
        }
    }
}

impl GpuContext {
    /// Creates a context presenting to `window`.
    pub fn new(window: Arc<Window>) -> Result<Self, RendererError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        let (device, queue) = request_device(&adapter)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RendererError::SurfaceConfig)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface configured: {:?} {}x{}",
            config.format,
            config.width,
            config.height
        );

        Ok(Self {
            surface: Some(surface),
            device,
            queue,
            config,
            offscreen: None,
        })
    }

    /// Creates a context that renders into an off-screen texture.
    pub fn headless(width: u32, height: u32) -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let (device, queue) = request_device(&adapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: HEADLESS_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let offscreen = create_offscreen(&device, &config);

        Ok(Self {
            surface: None,
            device,
            queue,
            config,
            offscreen: Some(offscreen),
        })
    }

    pub fn is_headless(&self) -> bool {
        self.surface.is_none()
    }

    /// Resize the output to new dimensions.
    ///
    /// Ignores zero-sized dimensions, which occur while a window is minimized.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }

    /// Re-applies the current configuration, as needed after a lost surface.
    pub fn reconfigure(&mut self) {
        match &self.surface {
            Some(surface) => surface.configure(&self.device, &self.config),
            None => self.offscreen = Some(create_offscreen(&self.device, &self.config)),
        }
    }

    /// Acquires the texture the next frame is composited into.
    pub fn acquire(&self) -> Result<FrameOutput, wgpu::SurfaceError> {
        match (&self.surface, &self.offscreen) {
            (Some(surface), _) => surface.get_current_texture().map(FrameOutput::Surface),
            (None, Some(texture)) => Ok(FrameOutput::Offscreen(texture.clone())),
            (None, None) => Err(wgpu::SurfaceError::Lost),
        }
    }

    /// The off-screen output texture of a headless context.
    pub fn offscreen(&self) -> Option<&wgpu::Texture> {
        self.offscreen.as_ref()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current output width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current output height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}

fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RendererError> {
    let info = adapter.get_info();
    log::info!("using adapter {} ({:?})", info.name, info.backend);

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("Lumen Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }))?;
    Ok((device, queue))
}

fn create_offscreen(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Output"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
