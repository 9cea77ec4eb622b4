//! The GPU passes that make up a frame, and the resources they share.
//!
//! Every pass implements [`RenderNode`](crate::render_graph::RenderNode) and
//! is registered with the [`RenderGraph`](crate::render_graph::RenderGraph)
//! in canonical order by the [`Renderer`](crate::Renderer). Bind groups that
//! reference frame targets are created inside `execute`, so a resize never
//! leaves a pass holding views of released textures.

mod ambient_occlusion;
mod bindings;
mod bloom;
mod common;
mod composite;
mod draw;
mod geometry;
mod lighting;
mod shadow;
mod targets;
mod uniforms;

pub use ambient_occlusion::AmbientOcclusionPass;
pub use bindings::{FrameBindings, UniformBinding};
pub use bloom::{BloomPass, BlurSchedule, BlurSource, BlurStep};
pub use common::{HDR_FORMAT, OCCLUSION_FORMAT, PassResources, SCENE_DEPTH_FORMAT, SHADOW_FORMAT};
pub use composite::CompositePass;
pub use draw::GpuScene;
pub use geometry::GeometryPass;
pub use lighting::LightingPass;
pub use shadow::{DirectionalShadowPass, PointShadowPass};
pub use targets::{FrameTargets, GBUFFER_ATTACHMENTS, TargetDesc};
pub use uniforms::{
    BlurUniforms, CompositeUniforms, FrameInputs, FrameUniforms, ObjectUniforms,
    ShadowFaceUniforms, SsaoUniforms,
};

/// Stencil value the lighting pass writes under every visible emissive
/// fragment, and the value bloom extraction tests for.
pub const EMISSIVE_STENCIL_REF: u32 = 1;
