use crate::gpu::GpuContext;
use crate::render_graph::{FrameContext, PassId, RenderNode};

use super::bloom::BlurSchedule;
use super::common::{self, PipelineDesc};
use super::uniforms::CompositeUniforms;

/// Adds the blurred bloom to the lit image, or shows one G-buffer attachment
/// instead, and writes the result to the frame output.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    bloom_output: usize,
}

impl CompositePass {
    pub fn new(gpu: &GpuContext, bloom_iterations: u32) -> Self {
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Bind Group Layout"),
                entries: &[
                    common::uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    common::unfiltered_entry(1),
                    common::unfiltered_entry(2),
                    common::unfiltered_entry(3),
                ],
            });

        let uniforms = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = common::shader(gpu, "Composite Shader", common::shaders::COMPOSITE);
        let pipeline = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Composite Pipeline",
                shader: &shader,
                vertex_entry: "vs_fullscreen",
                fragment_entry: Some("fs_composite"),
                buffers: &[],
                bind_group_layouts: &[&layout],
                targets: &[common::color_target(gpu.format())],
                depth_stencil: None,
            },
        );

        Self {
            pipeline,
            layout,
            uniforms,
            bloom_output: BlurSchedule::new(bloom_iterations).output().unwrap_or(0),
        }
    }
}

impl RenderNode for CompositePass {
    fn id(&self) -> PassId {
        PassId::Composite
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let targets = ctx.targets;
        let config = ctx.config;
        let channel = config.gbuffer_view.attachment();

        let mode = CompositeUniforms {
            mode: [
                config.bloom as u32,
                config.gbuffer_view.code(),
                0,
                0,
            ],
        };
        ctx.gpu
            .queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&mode));

        // Unused inputs are bound to the lit image; the mode selects them out.
        let lit = targets.lit.view(0);
        let bloom = if config.bloom {
            targets.pingpong[self.bloom_output].view(0)
        } else {
            lit
        };
        let debug = channel.map_or(lit, |i| targets.gbuffer.view(i));

        let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Inputs"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(lit),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(bloom),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(debug),
                },
            ],
        });

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[common::clear_attachment(ctx.output, wgpu::Color::BLACK)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
