//! Error types shared across the renderer.

use std::path::PathBuf;

use crate::config::SettingsError;
use crate::render_graph::PipelineError;

/// Failure to read or decode an asset from disk.
///
/// Callers that load scene content treat these as recoverable: the failure is
/// logged and an empty model or flat texture stands in for the asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown model format '{0}'")]
    UnknownFormat(String),
    #[error("failed to import OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("failed to parse STL {path}: {message}")]
    Stl { path: PathBuf, message: String },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors raised while bringing up or driving the renderer.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("surface reports no supported formats")]
    SurfaceConfig,
    #[error("shader '{label}' failed to compile: {message}")]
    Shader { label: String, message: String },
    #[error("render target '{label}' was rejected: {message}")]
    Target { label: String, message: String },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    InvalidSetting(#[from] SettingsError),
    #[error("frame readback failed: {0}")]
    Readback(String),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
