//! Frame orchestration: owns the GPU resources and the pass graph, and turns
//! a camera plus a [`RenderConfig`] into one presented frame.
//!
//! # Example
//!
//! ```no_run
//! use lumen::{Camera, GpuContext, RenderConfig, Renderer, RendererSettings, Scene};
//!
//! let gpu = GpuContext::headless(320, 240)?;
//! let mut renderer = Renderer::new(gpu, &Scene::primitives(), RendererSettings::default())?;
//! let camera = Camera::default();
//! let frame = renderer.render_frame(&camera, &RenderConfig::default())?;
//! assert!(frame.plan().is_some());
//! let capture = renderer.read_output()?;
//! assert_eq!(capture.rgba.len(), 320 * 240 * 4);
//! # Ok::<(), lumen::RendererError>(())
//! ```

use glam::Vec3;

use crate::camera::Camera;
use crate::config::{RenderConfig, RendererSettings};
use crate::error::RendererError;
use crate::gpu::GpuContext;
use crate::light::{DirectionalLight, PointLight};
use crate::passes::{
    AmbientOcclusionPass, BloomPass, CompositePass, DirectionalShadowPass, FrameBindings,
    FrameInputs, FrameTargets, FrameUniforms, GeometryPass, GpuScene, LightingPass,
    PassResources, PointShadowPass,
};
use crate::render_graph::{FrameContext, FramePlan, RenderGraph};
use crate::scene::Scene;

/// Outcome of one [`Renderer::render_frame`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameResult {
    /// The frame was recorded, submitted and presented.
    Rendered(FramePlan),
    /// The output was unavailable (lost, outdated or timed out) and the frame
    /// was dropped without recording anything.
    Skipped,
}

impl FrameResult {
    pub fn plan(&self) -> Option<&FramePlan> {
        match self {
            FrameResult::Rendered(plan) => Some(plan),
            FrameResult::Skipped => None,
        }
    }
}

/// Tightly packed RGBA8 pixels read back from a headless frame.
#[derive(Clone, Debug)]
pub struct FrameCapture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl FrameCapture {
    /// RGBA at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let texel = self.rgba.get(i..i + 4)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }

    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
    }
}

/// Runs an error scope around `f` and converts a captured validation error.
fn scoped<T>(
    gpu: &GpuContext,
    f: impl FnOnce() -> T,
    on_error: impl FnOnce(String) -> RendererError,
) -> Result<T, RendererError> {
    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(gpu.device.pop_error_scope()) {
        Some(error) => Err(on_error(error.to_string())),
        None => Ok(value),
    }
}

/// The multi-pass renderer.
///
/// Every resource is created in [`new`](Self::new) and lives until
/// [`shutdown`](Self::shutdown). [`resize`](Self::resize) reallocates the
/// screen-sized targets before the next frame records.
pub struct Renderer {
    gpu: GpuContext,
    settings: RendererSettings,
    scene: GpuScene,
    sun: DirectionalLight,
    point: PointLight,
    targets: FrameTargets,
    bindings: FrameBindings,
    graph: RenderGraph,
    frame_index: u64,
}

impl Renderer {
    pub fn new(
        gpu: GpuContext,
        scene: &Scene,
        settings: RendererSettings,
    ) -> Result<Self, RendererError> {
        settings.validate()?;
        if scene.is_empty() {
            log::warn!("scene has no geometry; frames will show only the clear color");
        }

        let targets = scoped(
            &gpu,
            || FrameTargets::new(&gpu, &settings),
            |message| RendererError::Target {
                label: "frame targets".into(),
                message,
            },
        )?;

        let (gpu_scene, bindings, nodes) = scoped(
            &gpu,
            || {
                let resources = PassResources::new(&gpu);
                let gpu_scene = GpuScene::upload(&gpu, &resources, scene);
                let bindings = FrameBindings::new(&gpu, &resources);
                let nodes = (
                    DirectionalShadowPass::new(&gpu, &resources),
                    PointShadowPass::new(&gpu, &resources),
                    GeometryPass::new(&gpu, &resources),
                    AmbientOcclusionPass::new(&gpu, &resources, &settings),
                    LightingPass::new(&gpu, &resources),
                    BloomPass::new(&gpu, &resources, settings.bloom_iterations),
                    CompositePass::new(&gpu, settings.bloom_iterations),
                );
                (gpu_scene, bindings, nodes)
            },
            |message| RendererError::Shader {
                label: "pass pipelines".into(),
                message,
            },
        )?;

        let (directional, point, geometry, occlusion, lighting, bloom, composite) = nodes;
        let graph = RenderGraph::builder()
            .node(directional)
            .node(point)
            .node(geometry)
            .node(occlusion)
            .node(lighting)
            .node(bloom)
            .node(composite)
            .build()?;

        log::info!(
            "renderer ready: {} passes, {} draws, {}x{} {:?}",
            graph.len(),
            gpu_scene.draw_count(),
            gpu.width(),
            gpu.height(),
            gpu.format()
        );

        Ok(Self {
            gpu,
            settings,
            scene: gpu_scene,
            sun: scene.directional.clone(),
            point: scene.point.clone(),
            targets,
            bindings,
            graph,
            frame_index: 0,
        })
    }

    /// Records, submits and presents one frame.
    ///
    /// `config` is read once; every pass of the frame sees the same copy.
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        config: &RenderConfig,
    ) -> Result<FrameResult, RendererError> {
        let config = *config;
        let output = match self.gpu.acquire() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return Ok(FrameResult::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                return Ok(FrameResult::Skipped);
            }
            Err(error) => {
                log::error!("surface error: {error}");
                return Ok(FrameResult::Skipped);
            }
        };

        let uniforms = FrameUniforms::new(&FrameInputs {
            camera,
            sun: &self.sun,
            point: &self.point,
            config: &config,
            settings: &self.settings,
            width: self.gpu.width(),
            height: self.gpu.height(),
        });
        self.bindings.write(&self.gpu, &uniforms, &self.sun, &self.point);

        let view = output.view();
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let plan = {
            let mut ctx = FrameContext {
                gpu: &self.gpu,
                encoder: &mut encoder,
                config: &config,
                settings: &self.settings,
                scene: &self.scene,
                targets: &self.targets,
                frame: &self.bindings,
                output: &view,
            };
            self.graph.execute(&mut ctx)?
        };

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if self.frame_index == 0 {
            log::info!("first frame: {plan}");
        } else {
            log::debug!("frame {}: {plan}", self.frame_index);
        }
        self.frame_index += 1;
        Ok(FrameResult::Rendered(plan))
    }

    /// Resizes the output and every screen-sized target.
    ///
    /// Zero dimensions (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        let reallocated = self.targets.resize(&self.gpu, width, height);
        log::info!("resized to {width}x{height}, {reallocated} targets reallocated");
    }

    pub fn point_light(&self) -> &PointLight {
        &self.point
    }

    pub fn directional_light(&self) -> &DirectionalLight {
        &self.sun
    }

    /// Moves the point light and its emissive marker.
    pub fn set_point_light_position(&mut self, position: Vec3) {
        self.point.position = position;
        self.scene
            .set_marker_transform(&self.gpu, self.point.marker_transform());
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Copies the last headless frame back to the CPU.
    pub fn read_output(&self) -> Result<FrameCapture, RendererError> {
        let texture = self
            .gpu
            .offscreen()
            .ok_or_else(|| RendererError::Readback("renderer is not headless".into()))?;
        let (width, height) = (self.gpu.width(), self.gpu.height());

        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Readback"),
            size: u64::from(padded * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.gpu
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RendererError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| RendererError::Readback(e.to_string()))?
            .map_err(|e| RendererError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut rgba = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize).take(height as usize) {
            rgba.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        buffer.unmap();

        Ok(FrameCapture {
            width,
            height,
            rgba,
        })
    }

    /// Waits for submitted work and releases every GPU resource.
    pub fn shutdown(self) {
        if let Err(error) = self.gpu.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("device poll during shutdown failed: {error}");
        }
        log::info!("renderer shut down after {} frames", self.frame_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> FrameCapture {
        FrameCapture {
            width: 2,
            height: 2,
            rgba: (0..16).collect(),
        }
    }

    #[test]
    fn pixels_are_row_major() {
        let capture = capture();
        assert_eq!(capture.pixel(0, 0), Some([0, 1, 2, 3]));
        assert_eq!(capture.pixel(1, 0), Some([4, 5, 6, 7]));
        assert_eq!(capture.pixel(0, 1), Some([8, 9, 10, 11]));
    }

    #[test]
    fn out_of_range_pixels_are_none() {
        let capture = capture();
        assert_eq!(capture.pixel(2, 0), None);
        assert_eq!(capture.pixel(0, 2), None);
        assert_eq!(capture.pixel(u32::MAX, u32::MAX), None);

        let short = FrameCapture {
            rgba: vec![0; 8],
            ..capture
        };
        assert_eq!(short.pixel(1, 1), None);
    }

    #[test]
    fn capture_converts_to_image() {
        let image = capture().to_image().expect("sized buffer");
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [12, 13, 14, 15]);
    }
}
