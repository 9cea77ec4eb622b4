//! Pass identities, the resources they exchange, and the node trait.

use std::fmt;

use crate::config::{GBufferChannel, RenderConfig};
use crate::render_graph::FrameContext;

/// Identity of a stage in the frame pipeline.
///
/// The dependency and resource tables below are the single description of
/// the pipeline's shape. The graph validates node ordering against them and
/// plans each frame from them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    DirectionalShadow,
    PointShadow,
    Geometry,
    AmbientOcclusion,
    Lighting,
    Bloom,
    Composite,
}

/// A resource one pass writes and later passes read within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    DirectionalShadowMap,
    PointShadowCube,
    GBuffer,
    /// Depth of the scene, shared by the geometry and lighting passes.
    SceneDepth,
    Occlusion,
    LitColor,
    /// Stencil value 1 marks emissive fragments drawn this frame.
    EmissiveStencil,
    BloomBlur,
    Screen,
}

impl PassId {
    /// Canonical execution order.
    pub const ALL: [PassId; 7] = [
        PassId::DirectionalShadow,
        PassId::PointShadow,
        PassId::Geometry,
        PassId::AmbientOcclusion,
        PassId::Lighting,
        PassId::Bloom,
        PassId::Composite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassId::DirectionalShadow => "directional shadow",
            PassId::PointShadow => "point shadow",
            PassId::Geometry => "geometry",
            PassId::AmbientOcclusion => "ambient occlusion",
            PassId::Lighting => "lighting",
            PassId::Bloom => "bloom",
            PassId::Composite => "composite",
        }
    }

    /// Passes that must be registered before this one.
    pub fn dependencies(self) -> &'static [PassId] {
        match self {
            PassId::DirectionalShadow | PassId::PointShadow | PassId::Geometry => &[],
            PassId::AmbientOcclusion => &[PassId::Geometry],
            PassId::Lighting => &[
                PassId::DirectionalShadow,
                PassId::PointShadow,
                PassId::Geometry,
                PassId::AmbientOcclusion,
            ],
            PassId::Bloom => &[PassId::Lighting],
            PassId::Composite => &[PassId::Lighting, PassId::Bloom],
        }
    }

    /// Whether the pass runs this frame. Shadows, lighting and composite
    /// always run.
    pub fn is_active(self, config: &RenderConfig) -> bool {
        match self {
            PassId::Geometry => config.needs_geometry_pass(),
            PassId::AmbientOcclusion => config.ssao,
            PassId::Bloom => config.bloom,
            _ => true,
        }
    }

    pub fn reads(self, config: &RenderConfig) -> Vec<Slot> {
        match self {
            PassId::DirectionalShadow | PassId::PointShadow | PassId::Geometry => Vec::new(),
            PassId::AmbientOcclusion => vec![Slot::GBuffer],
            PassId::Lighting => {
                let mut reads = vec![Slot::DirectionalShadowMap, Slot::PointShadowCube];
                if config.deferred_shading {
                    reads.extend([Slot::GBuffer, Slot::SceneDepth]);
                }
                if config.ssao {
                    reads.push(Slot::Occlusion);
                }
                reads
            }
            PassId::Bloom => vec![Slot::EmissiveStencil],
            PassId::Composite => {
                let mut reads = vec![Slot::LitColor];
                if config.bloom {
                    reads.push(Slot::BloomBlur);
                }
                if config.gbuffer_view != GBufferChannel::Final {
                    reads.push(Slot::GBuffer);
                }
                reads
            }
        }
    }

    pub fn writes(self, _config: &RenderConfig) -> Vec<Slot> {
        match self {
            PassId::DirectionalShadow => vec![Slot::DirectionalShadowMap],
            PassId::PointShadow => vec![Slot::PointShadowCube],
            PassId::Geometry => vec![Slot::GBuffer, Slot::SceneDepth],
            PassId::AmbientOcclusion => vec![Slot::Occlusion],
            PassId::Lighting => vec![Slot::LitColor, Slot::SceneDepth, Slot::EmissiveStencil],
            PassId::Bloom => vec![Slot::BloomBlur],
            PassId::Composite => vec![Slot::Screen],
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage the render graph can execute.
///
/// Implementors provide their identity and the commands they record. The
/// remaining methods describe the node's place in the pipeline and default
/// to the tables on [`PassId`].
///
/// # Example
///
/// ```ignore
/// struct Clear;
///
/// impl RenderNode for Clear {
///     fn id(&self) -> PassId {
///         PassId::Composite
///     }
///
///     fn execute(&self, ctx: &mut FrameContext) {
///         ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
///             color_attachments: &[Some(wgpu::RenderPassColorAttachment {
///                 view: ctx.output,
///                 // ...
///             })],
///             // ...
///         });
///     }
/// }
/// ```
pub trait RenderNode {
    fn id(&self) -> PassId;

    fn dependencies(&self) -> &'static [PassId] {
        self.id().dependencies()
    }

    fn is_active(&self, config: &RenderConfig) -> bool {
        self.id().is_active(config)
    }

    fn reads(&self, config: &RenderConfig) -> Vec<Slot> {
        self.id().reads(config)
    }

    fn writes(&self, config: &RenderConfig) -> Vec<Slot> {
        self.id().writes(config)
    }

    /// Records this pass's commands into the frame's encoder.
    fn execute(&self, ctx: &mut FrameContext<'_>);
}
