//! # lumen
//!
//! **A real-time wgpu renderer built around an explicit frame graph.**
//!
//! Every frame runs the same fixed sequence of passes, with optional stages
//! switched on and off by a [`RenderConfig`]:
//!
//! 1. directional and point-light shadow maps
//! 2. the G-buffer, when deferred shading, SSAO or a debug view needs it
//! 3. screen-space ambient occlusion
//! 4. forward or deferred Blinn-Phong/Phong lighting, which also tags the
//!    emissive light marker in the stencil buffer
//! 5. stencil-masked bloom with a ping-pong Gaussian blur
//! 6. the composite onto the window or a headless texture
//!
//! The graph validates pass order when it is built and checks per frame that
//! no pass reads a resource nothing has written yet.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lumen::{AppConfig, Scene};
//!
//! fn main() -> Result<(), lumen::RendererError> {
//!     lumen::run(AppConfig::new().title("demo"), Scene::primitives())
//! }
//! ```
//!
//! For tests and offline rendering, build a [`Renderer`] over
//! [`GpuContext::headless`] and read frames back with
//! [`Renderer::read_output`].

mod app;
mod camera;
mod config;
mod error;
mod gpu;
mod input;
mod light;
mod material;
mod mesh;
mod model;
pub mod passes;
pub mod render_graph;
mod renderer;
mod scene;
pub mod shading;
pub mod ssao;
mod texture;

pub use app::{AppConfig, run};
pub use camera::{Camera, Movement};
pub use config::{GBufferChannel, RenderConfig, RendererSettings, SettingsError};
pub use error::{AssetError, RendererError};
pub use gpu::{FrameOutput, GpuContext, HEADLESS_FORMAT};
pub use input::{InputState, LookSource};
pub use light::{CubeFace, DirectionalLight, PointLight, bias_matrix};
pub use material::Material;
pub use mesh::{MeshData, Transform, Vertex3d};
pub use model::{ModelData, import_model, load_or_empty};
pub use render_graph::{FramePlan, PassId, PipelineError, RenderGraph, RenderNode, Slot};
pub use renderer::{FrameCapture, FrameResult, Renderer};
pub use scene::{Scene, SceneModel};
pub use texture::{TextureWrap, decode_rgba};

/// Tuning constants and their defaults.
pub mod defaults {
    pub use crate::camera::{
        DEFAULT_PITCH, DEFAULT_SENSITIVITY, DEFAULT_SPEED, DEFAULT_YAW, MAX_ZOOM, MIN_ZOOM,
        PITCH_LIMIT,
    };
    pub use crate::config::{
        DEFAULT_BLOOM_ITERATIONS, DEFAULT_POINT_SHADOW_SIZE, DEFAULT_SHADOW_BIAS,
        DEFAULT_SHADOW_MAP_SIZE, DEFAULT_SSAO_BIAS, DEFAULT_SSAO_KERNEL_SIZE, DEFAULT_SSAO_RADIUS,
        MAX_SSAO_KERNEL_SIZE, SSAO_NOISE_SIZE,
    };
    pub use crate::input::LIGHT_NUDGE_SPEED;
    pub use crate::passes::EMISSIVE_STENCIL_REF;
    pub use crate::shading::{TOON_BANDS, TOON_SPECULAR_STEP};
}

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
