//! The frame graph and its builder.

use std::collections::HashSet;
use std::fmt;

use crate::config::RenderConfig;
use crate::render_graph::{FrameContext, PassId, RenderNode, Slot};

/// A graph that cannot produce a valid frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("pass '{pass}' depends on '{dependency}', which is not registered before it")]
    DependencyOrder { pass: PassId, dependency: PassId },
    #[error("pass '{0}' is registered more than once")]
    DuplicatePass(PassId),
    #[error("pass '{pass}' reads {slot:?}, which no earlier pass writes this frame")]
    MissingInput { pass: PassId, slot: Slot },
}

/// Builder for [`RenderGraph`].
///
/// Nodes execute in the order they are added. [`build`](Self::build) checks
/// that each node's dependencies were added before it, so a graph that builds
/// runs its passes in a dependency-respecting order.
///
/// # Example
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(DirectionalShadowPass::new(&gpu, &resources))
///     .node(PointShadowPass::new(&gpu, &resources))
///     .node(GeometryPass::new(&gpu, &resources))
///     // ...
///     .build()?;
/// ```
pub struct RenderGraphBuilder {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    pub fn build(self) -> Result<RenderGraph, PipelineError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            let id = node.id();
            if let Some(dependency) = node.dependencies().iter().find(|d| !seen.contains(*d)) {
                return Err(PipelineError::DependencyOrder {
                    pass: id,
                    dependency: *dependency,
                });
            }
            if !seen.insert(id) {
                return Err(PipelineError::DuplicatePass(id));
            }
        }
        Ok(RenderGraph { nodes: self.nodes })
    }
}

impl Default for RenderGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The passes chosen for one frame, in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePlan {
    passes: Vec<PassId>,
}

impl FramePlan {
    pub fn passes(&self) -> &[PassId] {
        &self.passes
    }

    pub fn contains(&self, pass: PassId) -> bool {
        self.passes.contains(&pass)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl fmt::Display for FramePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pass) in self.passes.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{pass}")?;
        }
        Ok(())
    }
}

/// A validated sequence of frame passes.
///
/// Building the graph fixes the order. Each frame, [`plan`](Self::plan)
/// selects the active passes for the current [`RenderConfig`] and checks that
/// every resource a pass reads was written earlier in the same frame.
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraph {
    pub fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn plan(&self, config: &RenderConfig) -> Result<FramePlan, PipelineError> {
        let mut written = HashSet::new();
        let mut passes = Vec::new();
        for node in self.nodes.iter().filter(|n| n.is_active(config)) {
            let id = node.id();
            if let Some(slot) = node.reads(config).into_iter().find(|s| !written.contains(s)) {
                return Err(PipelineError::MissingInput { pass: id, slot });
            }
            written.extend(node.writes(config));
            passes.push(id);
        }
        Ok(FramePlan { passes })
    }

    /// Plans the frame, then records every active pass in order.
    pub fn execute(&self, ctx: &mut FrameContext<'_>) -> Result<FramePlan, PipelineError> {
        let config = ctx.config;
        let plan = self.plan(config)?;
        for node in self.nodes.iter().filter(|n| n.is_active(config)) {
            log::trace!("recording {} pass", node.id());
            node.execute(ctx);
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GBufferChannel;

    struct Stub(PassId);

    impl RenderNode for Stub {
        fn id(&self) -> PassId {
            self.0
        }

        fn execute(&self, _ctx: &mut FrameContext<'_>) {}
    }

    fn full_graph() -> RenderGraph {
        PassId::ALL
            .iter()
            .fold(RenderGraph::builder(), |b, id| b.node(Stub(*id)))
            .build()
            .unwrap()
    }

    #[test]
    fn canonical_order_builds() {
        assert_eq!(full_graph().len(), PassId::ALL.len());
    }

    #[test]
    fn out_of_order_dependency_is_rejected() {
        let err = RenderGraph::builder()
            .node(Stub(PassId::Geometry))
            .node(Stub(PassId::Lighting))
            .build()
            .err();
        assert_eq!(
            err,
            Some(PipelineError::DependencyOrder {
                pass: PassId::Lighting,
                dependency: PassId::DirectionalShadow,
            })
        );

        let err = RenderGraph::builder()
            .node(Stub(PassId::AmbientOcclusion))
            .node(Stub(PassId::Geometry))
            .build()
            .err();
        assert!(matches!(err, Some(PipelineError::DependencyOrder { .. })));
    }

    #[test]
    fn duplicate_pass_is_rejected() {
        let err = RenderGraph::builder()
            .node(Stub(PassId::Geometry))
            .node(Stub(PassId::Geometry))
            .build()
            .err();
        assert_eq!(err, Some(PipelineError::DuplicatePass(PassId::Geometry)));
    }

    #[test]
    fn minimal_frame_skips_optional_passes() {
        let plan = full_graph().plan(&RenderConfig::minimal()).unwrap();
        assert_eq!(
            plan.passes(),
            &[
                PassId::DirectionalShadow,
                PassId::PointShadow,
                PassId::Lighting,
                PassId::Composite,
            ]
        );
    }

    #[test]
    fn ssao_in_forward_mode_runs_geometry_first() {
        let config = RenderConfig {
            ssao: true,
            ..RenderConfig::minimal()
        };
        let plan = full_graph().plan(&config).unwrap();
        let geometry = plan.passes().iter().position(|p| *p == PassId::Geometry);
        let ao = plan.passes().iter().position(|p| *p == PassId::AmbientOcclusion);
        assert!(geometry.unwrap() < ao.unwrap());
    }

    #[test]
    fn debug_channel_runs_geometry() {
        let config = RenderConfig {
            gbuffer_view: GBufferChannel::Normal,
            ..RenderConfig::minimal()
        };
        assert!(full_graph().plan(&config).unwrap().contains(PassId::Geometry));
    }

    #[test]
    fn missing_producer_is_reported() {
        // A graph without a geometry pass cannot shade deferred.
        let graph = RenderGraph::builder()
            .node(Stub(PassId::DirectionalShadow))
            .node(Stub(PassId::PointShadow))
            .build()
            .unwrap();
        assert!(graph.plan(&RenderConfig::default()).is_ok());

        struct Lighting;
        impl RenderNode for Lighting {
            fn id(&self) -> PassId {
                PassId::Lighting
            }
            fn dependencies(&self) -> &'static [PassId] {
                &[PassId::DirectionalShadow, PassId::PointShadow]
            }
            fn execute(&self, _ctx: &mut FrameContext<'_>) {}
        }

        let graph = RenderGraph::builder()
            .node(Stub(PassId::DirectionalShadow))
            .node(Stub(PassId::PointShadow))
            .node(Lighting)
            .build()
            .unwrap();
        assert_eq!(
            graph.plan(&RenderConfig::default()),
            Err(PipelineError::MissingInput {
                pass: PassId::Lighting,
                slot: Slot::GBuffer,
            })
        );
        assert!(graph.plan(&RenderConfig::minimal()).is_ok());
    }
}
