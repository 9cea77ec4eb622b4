//! Lit color from shadow maps, occlusion and either the G-buffer or the
//! scene meshes, followed by the emissive draw that tags the stencil.
//!
//! Stencil contract: after this pass, stencil value
//! [`EMISSIVE_STENCIL_REF`](super::EMISSIVE_STENCIL_REF) marks exactly the
//! visible emissive fragments of this frame and every other pixel is 0.
//! [`BloomPass`](super::BloomPass) relies on it.

use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::render_graph::{FrameContext, PassId, RenderNode};

use super::EMISSIVE_STENCIL_REF;
use super::targets::GBUFFER_ATTACHMENTS;
use super::common::{self, HDR_FORMAT, PassResources, PipelineDesc, SCENE_DEPTH_FORMAT};

pub struct LightingPass {
    forward: wgpu::RenderPipeline,
    deferred: wgpu::RenderPipeline,
    emissive: wgpu::RenderPipeline,
    forward_layout: wgpu::BindGroupLayout,
    deferred_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
    fallback_occlusion: wgpu::TextureView,
}

fn shadow_entries() -> [wgpu::BindGroupLayoutEntry; 4] {
    [
        common::texture_entry(0, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2),
        common::texture_entry(1, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::Cube),
        common::sampler_entry(2, wgpu::SamplerBindingType::Comparison),
        common::unfiltered_entry(3),
    ]
}

/// Depth test plus an unconditional stencil write of the emissive tag.
fn emissive_tag_state() -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Replace,
    };
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: 0xFF,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

impl LightingPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources) -> Self {
        let device = &gpu.device;

        let forward_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Forward Lighting Inputs Layout"),
            entries: &shadow_entries(),
        });

        let mut deferred_entries = shadow_entries().to_vec();
        let gbuffer_bindings = 4..4 + GBUFFER_ATTACHMENTS.len() as u32;
        deferred_entries.extend(gbuffer_bindings.map(common::unfiltered_entry));
        let deferred_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Deferred Lighting Inputs Layout"),
            entries: &deferred_entries,
        });

        let targets = [common::color_target(HDR_FORMAT)];

        let forward_shader =
            common::shader(gpu, "Forward Lighting Shader", common::shaders::LIGHTING_FORWARD);
        let forward = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Forward Lighting Pipeline",
                shader: &forward_shader,
                vertex_entry: "vs_surface",
                fragment_entry: Some("fs_forward"),
                buffers: &[Vertex3d::LAYOUT],
                bind_group_layouts: &[
                    &resources.frame_layout,
                    &resources.object_layout,
                    &forward_layout,
                ],
                targets: &targets,
                depth_stencil: Some(common::scene_depth(true, wgpu::CompareFunction::Less)),
            },
        );

        let deferred_shader =
            common::shader(gpu, "Deferred Lighting Shader", common::shaders::LIGHTING_DEFERRED);
        let deferred = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Deferred Lighting Pipeline",
                shader: &deferred_shader,
                vertex_entry: "vs_fullscreen",
                fragment_entry: Some("fs_deferred"),
                buffers: &[],
                bind_group_layouts: &[&resources.frame_layout, &deferred_layout],
                targets: &targets,
                depth_stencil: Some(common::scene_depth(false, wgpu::CompareFunction::Always)),
            },
        );

        let emissive_shader = common::shader(gpu, "Emissive Shader", common::shaders::EMISSIVE);
        let emissive = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Emissive Tag Pipeline",
                shader: &emissive_shader,
                vertex_entry: "vs_surface",
                fragment_entry: Some("fs_emissive"),
                buffers: &[Vertex3d::LAYOUT],
                bind_group_layouts: &[&resources.frame_layout, &resources.object_layout],
                targets: &targets,
                depth_stencil: Some(emissive_tag_state()),
            },
        );

        Self {
            forward,
            deferred,
            emissive,
            forward_layout,
            deferred_layout,
            shadow_sampler: resources.shadow_sampler.clone(),
            fallback_occlusion: resources.white.view.clone(),
        }
    }
}

impl RenderNode for LightingPass {
    fn id(&self) -> PassId {
        PassId::Lighting
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let targets = ctx.targets;
        let deferred = ctx.config.deferred_shading;
        let occlusion = if ctx.config.ssao {
            targets.occlusion.view(0)
        } else {
            &self.fallback_occlusion
        };

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(targets.directional_shadow.view(0)),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(targets.point_shadow.view(0)),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(occlusion),
            },
        ];
        if deferred {
            entries.extend(targets.gbuffer.attachments().iter().zip(4..).map(|(a, binding)| {
                wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(&a.view),
                }
            }));
        }
        let inputs = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Inputs"),
            layout: if deferred {
                &self.deferred_layout
            } else {
                &self.forward_layout
            },
            entries: &entries,
        });

        // Deferred shading keeps the geometry pass depth so the emissive
        // draw is occluded correctly; forward shading produces its own.
        let depth_load = if deferred {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(1.0)
        };
        let [r, g, b] = ctx.settings.clear_color.map(f64::from);

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Pass"),
            color_attachments: &[common::clear_attachment(
                targets.lit.view(0),
                wgpu::Color { r, g, b, a: 1.0 },
            )],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.scene_depth.view(0),
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &ctx.frame.frame.bind_group, &[]);
        if deferred {
            pass.set_pipeline(&self.deferred);
            pass.set_bind_group(1, &inputs, &[]);
            pass.draw(0..3, 0..1);
        } else {
            pass.set_pipeline(&self.forward);
            pass.set_bind_group(2, &inputs, &[]);
            ctx.scene.draw_surfaces(&mut pass, 1);
        }

        pass.set_pipeline(&self.emissive);
        pass.set_stencil_reference(EMISSIVE_STENCIL_REF);
        ctx.scene.draw_emissive(&mut pass, 1);
    }
}
