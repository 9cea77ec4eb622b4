//! Per-frame execution context.

use crate::config::{RenderConfig, RendererSettings};
use crate::gpu::GpuContext;
use crate::passes::{FrameBindings, FrameTargets, GpuScene};

/// Everything a pass may touch while recording a frame.
///
/// The context is rebuilt for every frame and lent to each pass in turn; no
/// pass holds on to frame resources between frames. Targets are borrowed
/// immutably: a pass writes a target only through the render pass it records.
pub struct FrameContext<'a> {
    pub gpu: &'a GpuContext,
    /// Encoder all passes append to. Submitted once after the composite pass.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Snapshot of the toggles, taken once at the start of the frame.
    pub config: &'a RenderConfig,
    pub settings: &'a RendererSettings,
    pub scene: &'a GpuScene,
    pub targets: &'a FrameTargets,
    /// Frame-wide uniforms and the shadow face bindings.
    pub frame: &'a FrameBindings,
    /// Presentation target written only by the composite pass.
    pub output: &'a wgpu::TextureView,
}
