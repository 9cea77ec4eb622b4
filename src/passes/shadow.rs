//! Depth-only shadow passes for the directional and point lights.
//!
//! Both run every frame regardless of the shadow toggles; the toggles only
//! decide whether lighting consults the maps.

use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::render_graph::{FrameContext, PassId, RenderNode};

use super::common::{self, PassResources, PipelineDesc, SHADOW_FORMAT};

fn shadow_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: SHADOW_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

/// Orthographic depth map seen from the directional light.
pub struct DirectionalShadowPass {
    pipeline: wgpu::RenderPipeline,
}

impl DirectionalShadowPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources) -> Self {
        let shader = common::shader(gpu, "Shadow Shader", common::shaders::SHADOW);
        let pipeline = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Directional Shadow Pipeline",
                shader: &shader,
                vertex_entry: "vs_shadow",
                fragment_entry: None,
                buffers: &[Vertex3d::POSITION_LAYOUT],
                bind_group_layouts: &[&resources.face_layout, &resources.object_layout],
                targets: &[],
                depth_stencil: Some(shadow_depth_state()),
            },
        );
        Self { pipeline }
    }
}

impl RenderNode for DirectionalShadowPass {
    fn id(&self) -> PassId {
        PassId::DirectionalShadow
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Directional Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(depth_attachment(
                ctx.targets.directional_shadow.view(0),
            )),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.frame.directional_face.bind_group, &[]);
        ctx.scene.draw_surfaces(&mut pass, 1);
    }
}

/// Six-face depth cube around the point light, storing distance over far.
pub struct PointShadowPass {
    pipeline: wgpu::RenderPipeline,
}

impl PointShadowPass {
    pub fn new(gpu: &GpuContext, resources: &PassResources) -> Self {
        let shader = common::shader(gpu, "Point Shadow Shader", common::shaders::SHADOW);
        let pipeline = common::pipeline(
            gpu,
            PipelineDesc {
                label: "Point Shadow Pipeline",
                shader: &shader,
                vertex_entry: "vs_shadow",
                fragment_entry: Some("fs_point_shadow"),
                buffers: &[Vertex3d::POSITION_LAYOUT],
                bind_group_layouts: &[&resources.face_layout, &resources.object_layout],
                targets: &[],
                depth_stencil: Some(shadow_depth_state()),
            },
        );
        Self { pipeline }
    }
}

impl RenderNode for PointShadowPass {
    fn id(&self) -> PassId {
        PassId::PointShadow
    }

    fn execute(&self, ctx: &mut FrameContext<'_>) {
        let cube = ctx.targets.point_shadow.attachment(0);
        for (face, binding) in cube.layer_views.iter().zip(&ctx.frame.point_faces) {
            let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Shadow Face Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(face)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &binding.bind_group, &[]);
            ctx.scene.draw_surfaces(&mut pass, 1);
        }
    }
}
