//! Bloom: stencil-masked extraction of the emissive marker, then a separable
//! Gaussian blur ping-ponged between two targets.

use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::render_graph::{FrameContext, PassId, RenderNode};

use super::EMISSIVE_STENCIL_REF;
use super::common::{self, HDR_FORMAT, PassResources, PipelineDesc, SCENE_DEPTH_FORMAT};
use super::uniforms::BlurUniforms;

/// Where a blur iteration reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurSource {
    Bright,
    PingPong(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub horizontal: bool,
    pub source: BlurSource,
    /// Ping-pong buffer written by this step.
    pub target: usize,
}

/// The read/write order of the blur iterations.
///
/// Iteration `i` blurs horizontally when `i` is even and writes buffer
/// `i % 2`. The first iteration reads the bright-pass target, every later one
/// reads the buffer the previous iteration wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlurSchedule {
    steps: Vec<BlurStep>,
}

impl BlurSchedule {
    pub fn new(iterations: u32) -> Self {
        let steps = (0..iterations as usize)
            .map(|i| BlurStep {
                horizontal: i % 2 == 0,
                source: if i == 0 {
                    BlurSource::Bright
                } else {
                    BlurSource::PingPong((i - 1) % 2)
                },
                target: i % 2,
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[BlurStep] {
        &self.steps
    }

    /// Buffer holding the finished blur, or `None` for zero iterations.
    pub fn output(&self) -> Option<usize> {
        self.steps.last().map(|s| s.target)
    }
}

/// Stencil-equal test that never writes depth or stencil.
fn extraction_state() -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Equal,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

pub struct BloomPass {
    extract: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    blur_layout: wgpu::BindGroupLayout,
    horizontal: wgpu::Buffer,
    vertical: wgpu::Buffer,
    sampler: wgpu::Sampler,
    schedule: BlurSchedule,
}

impl BloomPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources, iterations: u32) -> Self {
        let targets = [common::color_target(HDR_FORMAT)];

        let emissive_shader =
            common::shader(gpu, "Bloom Extract Shader", common::shaders::EMISSIVE);
        let extract = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Bloom Extract Pipeline",
                shader: &emissive_shader,
                vertex_entry: "vs_surface",
                fragment_entry: Some("fs_emissive"),
                buffers: &[Vertex3d::LAYOUT],
                bind_group_layouts: &[&resources.frame_layout, &resources.object_layout],
                targets: &targets,
                depth_stencil: Some(extraction_state()),
            },
        );

        let blur_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Blur Layout"),
                entries: &[
                    common::uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    common::texture_entry(
                        1,
                        wgpu::TextureSampleType::Float { filterable: true },
                        wgpu::TextureViewDimension::D2,
                    ),
                    common::sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                ],
            });

        let blur_shader = common::shader(gpu, "Bloom Blur Shader", common::shaders::BLOOM_BLUR);
        let blur = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Bloom Blur Pipeline",
                shader: &blur_shader,
                vertex_entry: "vs_fullscreen",
                fragment_entry: Some("fs_blur"),
                buffers: &[],
                bind_group_layouts: &[&blur_layout],
                targets: &targets,
                depth_stencil: None,
            },
        );

        let direction = |label, dir: [f32; 4]| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::bytes_of(&BlurUniforms { direction: dir }),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        };

        Self {
            extract,
            blur,
            blur_layout,
            horizontal: direction("Bloom Horizontal", [1.0, 0.0, 0.0, 0.0]),
            vertical: direction("Bloom Vertical", [0.0, 1.0, 0.0, 0.0]),
            sampler: resources.linear_clamp.clone(),
            schedule: BlurSchedule::new(iterations),
        }
    }

    pub fn schedule(&self) -> &BlurSchedule {
        &self.schedule
    }

    fn extract(&self, ctx: &mut FrameContext<'_>) {
        let targets = ctx.targets;
        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Bloom Extract Pass"),
            color_attachments: &[common::clear_attachment(
                targets.bright.view(0),
                wgpu::Color::BLACK,
            )],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.scene_depth.view(0),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.extract);
        pass.set_stencil_reference(EMISSIVE_STENCIL_REF);
        pass.set_bind_group(0, &ctx.frame.frame.bind_group, &[]);
        ctx.scene.draw_emissive(&mut pass, 1);
    }
}

impl RenderNode for BloomPass {
    fn id(&self) -> PassId {
        PassId::Bloom
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        self.extract(ctx);

        let targets = ctx.targets;
        for step in self.schedule.steps() {
            let source = match step.source {
                BlurSource::Bright => targets.bright.view(0),
                BlurSource::PingPong(i) => targets.pingpong[i].view(0),
            };
            let direction = if step.horizontal {
                &self.horizontal
            } else {
                &self.vertical
            };
            let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Bloom Blur Inputs"),
                layout: &self.blur_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: direction.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

            let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bloom Blur Pass"),
                color_attachments: &[common::clear_attachment(
                    targets.pingpong[step.target].view(0),
                    wgpu::Color::BLACK,
                )],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.blur);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_reads_bright_then_alternates() {
        let schedule = BlurSchedule::new(4);
        let steps = schedule.steps();
        assert_eq!(steps[0].source, BlurSource::Bright);
        for pair in steps.windows(2) {
            assert_eq!(pair[1].source, BlurSource::PingPong(pair[0].target));
            assert_ne!(pair[0].horizontal, pair[1].horizontal);
            assert_ne!(pair[0].target, pair[1].target);
        }
    }

    #[test]
    fn no_step_reads_what_it_writes() {
        for n in 1..=12 {
            for step in BlurSchedule::new(n).steps() {
                assert_ne!(step.source, BlurSource::PingPong(step.target));
            }
        }
    }

    #[test]
    fn output_parity_follows_iteration_count() {
        assert_eq!(BlurSchedule::new(10).output(), Some(1));
        assert_eq!(BlurSchedule::new(9).output(), Some(0));
        assert_eq!(BlurSchedule::new(1).output(), Some(0));
        assert_eq!(BlurSchedule::new(0).output(), None);
    }
}
