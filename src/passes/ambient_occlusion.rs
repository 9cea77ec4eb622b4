//! Screen-space ambient occlusion from the G-buffer.
//!
//! The sample kernel and rotation noise are generated once from
//! [`RendererSettings::ssao_seed`](crate::RendererSettings::ssao_seed) and
//! never change; the pass is a pure function of the current G-buffer.

use wgpu::util::DeviceExt;

use crate::config::{RendererSettings, SSAO_NOISE_SIZE};
use crate::gpu::GpuContext;
use crate::render_graph::{FrameContext, PassId, RenderNode};
use crate::ssao::SsaoKernel;

use super::common::{self, OCCLUSION_FORMAT, PassResources, PipelineDesc};
use super::uniforms::SsaoUniforms;

pub struct AmbientOcclusionPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    noise: wgpu::TextureView,
}

impl AmbientOcclusionPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources, settings: &RendererSettings) -> Self {
        let kernel = SsaoKernel::generate(settings.ssao_kernel_size, settings.ssao_seed);
        log::debug!(
            "ssao kernel: {} samples, radius {}, bias {}",
            kernel.samples.len(),
            settings.ssao_radius,
            settings.ssao_bias
        );

        let uniforms = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("SSAO Kernel"),
                contents: bytemuck::bytes_of(&SsaoUniforms::new(
                    &kernel,
                    settings,
                    SSAO_NOISE_SIZE,
                )),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let noise_texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some("SSAO Noise"),
                size: wgpu::Extent3d {
                    width: SSAO_NOISE_SIZE,
                    height: SSAO_NOISE_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba32Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&kernel.packed_noise()),
        );
        let noise = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SSAO Bind Group Layout"),
                entries: &[
                    common::uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    common::unfiltered_entry(1),
                    common::unfiltered_entry(2),
                    common::unfiltered_entry(3),
                ],
            });

        let shader = common::shader(gpu, "SSAO Shader", common::shaders::SSAO);
        let pipeline = common::pipeline(
            gpu,
            PipelineDesc {
                label: "SSAO Pipeline",
                shader: &shader,
                vertex_entry: "vs_fullscreen",
                fragment_entry: Some("fs_ssao"),
                buffers: &[],
                bind_group_layouts: &[&resources.frame_layout, &layout],
                targets: &[common::color_target(OCCLUSION_FORMAT)],
                depth_stencil: None,
            },
        );

        Self {
            pipeline,
            layout,
            uniforms,
            noise,
        }
    }
}

impl RenderNode for AmbientOcclusionPass {
    fn id(&self) -> PassId {
        PassId::AmbientOcclusion
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let gbuffer = &ctx.targets.gbuffer;
        let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Inputs"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(gbuffer.view(1)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(gbuffer.view(2)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&self.noise),
                },
            ],
        });

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Ambient Occlusion Pass"),
            color_attachments: &[common::clear_attachment(
                ctx.targets.occlusion.view(0),
                wgpu::Color::WHITE,
            )],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.frame.frame.bind_group, &[]);
        pass.set_bind_group(1, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
