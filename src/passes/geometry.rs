use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::render_graph::{FrameContext, PassId, RenderNode};

use super::common::{self, PassResources, PipelineDesc};
use super::targets::GBUFFER_ATTACHMENTS;

/// Writes diffuse, normal, position, ambient and specular attributes for every
/// non-emissive mesh, and the scene depth the lighting pass tests against.
pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
}

impl GeometryPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources) -> Self {
        let shader = common::shader(gpu, "G-Buffer Shader", common::shaders::GBUFFER);
        let targets = GBUFFER_ATTACHMENTS.map(|a| common::color_target(a.format));
        let pipeline = common::pipeline(
            gpu,
            PipelineDesc {
                label: "G-Buffer Pipeline",
                shader: &shader,
                vertex_entry: "vs_surface",
                fragment_entry: Some("fs_gbuffer"),
                buffers: &[Vertex3d::LAYOUT],
                bind_group_layouts: &[&resources.frame_layout, &resources.object_layout],
                targets: &targets,
                depth_stencil: Some(common::scene_depth(true, wgpu::CompareFunction::Less)),
            },
        );
        Self { pipeline }
    }
}

impl RenderNode for GeometryPass {
    fn id(&self) -> PassId {
        PassId::Geometry
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let gbuffer = &ctx.targets.gbuffer;
        let attachments: Vec<_> = gbuffer
            .attachments()
            .iter()
            .map(|a| common::clear_attachment(&a.view, wgpu::Color::TRANSPARENT))
            .collect();

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: ctx.targets.scene_depth.view(0),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
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
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.frame.frame.bind_group, &[]);
        ctx.scene.draw_surfaces(&mut pass, 1);
    }
}
