//! Explicit frame graph for the multi-pass renderer.
//!
//! Each stage of the frame is a [`RenderNode`] identified by a [`PassId`].
//! Nodes declare the passes they depend on and the [`Slot`]s they read and
//! write; the graph checks those declarations instead of relying on call
//! order.
//!
//! # Pipeline
//!
//! ```text
//! DirectionalShadow ─┐
//! PointShadow ───────┤
//! [Geometry] ──┬─────┤
//!              └─ [AmbientOcclusion] ─┐
//!                                     ├─▶ Lighting ─┬─▶ [Bloom] ─┐
//!                                     │             └────────────┴─▶ Composite ─▶ Screen
//! ```
//!
//! Bracketed passes are skipped when the [`RenderConfig`](crate::RenderConfig)
//! disables them. The order among executed passes never changes.
//!
//! # Validation
//!
//! - [`RenderGraphBuilder::build`] rejects a node registered before one of
//!   its dependencies, and a pass registered twice.
//! - [`RenderGraph::plan`] rejects a frame in which an active pass reads a
//!   slot that no earlier active pass wrote.
//!
//! Both checks run without a GPU.
//!
//! # Example
//!
//! ```ignore
//! let graph = RenderGraph::builder()
//!     .node(directional_shadow)
//!     .node(point_shadow)
//!     .node(geometry)
//!     .node(ambient_occlusion)
//!     .node(lighting)
//!     .node(bloom)
//!     .node(composite)
//!     .build()?;
//!
//! let plan = graph.execute(&mut ctx)?;
//! ```

mod frame;
mod graph;
mod render_node;
mod render_target;

pub use frame::FrameContext;
pub use graph::{FramePlan, PipelineError, RenderGraph, RenderGraphBuilder};
pub use render_node::{PassId, RenderNode, Slot};
pub use render_target::{Attachment, AttachmentPurpose, AttachmentSpec, RenderTarget, TargetSize};
