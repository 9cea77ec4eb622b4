//! Bind group layouts, samplers and pipeline boilerplate shared by passes.

use crate::gpu::GpuContext;
use crate::texture::{self, Texture};

/// Format of the shared scene depth-stencil attachment.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
/// Format of shadow maps.
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Format of the lit color, bright-pass and blur targets.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

pub(crate) mod shaders {
    pub const SHADOW: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/shadow.wgsl"),
    );
    pub const GBUFFER: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/surface.wgsl"),
        include_str!("../shaders/gbuffer.wgsl"),
    );
    pub const SSAO: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/fullscreen.wgsl"),
        include_str!("../shaders/ssao.wgsl"),
    );
    pub const LIGHTING_FORWARD: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/surface.wgsl"),
        include_str!("../shaders/lighting_common.wgsl"),
        include_str!("../shaders/lighting_forward.wgsl"),
    );
    pub const LIGHTING_DEFERRED: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/fullscreen.wgsl"),
        include_str!("../shaders/lighting_common.wgsl"),
        include_str!("../shaders/lighting_deferred.wgsl"),
    );
    pub const EMISSIVE: &str = concat!(
        include_str!("../shaders/types.wgsl"),
        include_str!("../shaders/surface.wgsl"),
        include_str!("../shaders/emissive.wgsl"),
    );
    pub const BLOOM_BLUR: &str = concat!(
        include_str!("../shaders/fullscreen.wgsl"),
        include_str!("../shaders/bloom_blur.wgsl"),
    );
    pub const COMPOSITE: &str = concat!(
        include_str!("../shaders/fullscreen.wgsl"),
        include_str!("../shaders/composite.wgsl"),
    );
}

/// Layouts and fallback resources every pass is built against.
pub struct PassResources {
    /// Group 0 of scene shaders: [`FrameUniforms`](super::FrameUniforms).
    pub frame_layout: wgpu::BindGroupLayout,
    /// Group 1 of scene shaders: object uniforms and material textures.
    pub object_layout: wgpu::BindGroupLayout,
    /// Group 0 of shadow shaders: one face's view-projection.
    pub face_layout: wgpu::BindGroupLayout,
    /// Nearest depth comparison, so visibility is 0 or 1.
    pub shadow_sampler: wgpu::Sampler,
    pub linear_clamp: wgpu::Sampler,
    /// 1×1 white texture bound where occlusion is not computed.
    pub white: Texture,
}

impl PassResources {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry(0, vertex_fragment)],
        });

        let filterable = wgpu::TextureSampleType::Float { filterable: true };
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[
                uniform_entry(0, vertex_fragment),
                texture_entry(1, filterable, wgpu::TextureViewDimension::D2),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                texture_entry(3, filterable, wgpu::TextureViewDimension::D2),
                sampler_entry(4, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let face_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Face Bind Group Layout"),
            entries: &[uniform_entry(0, vertex_fragment)],
        });

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let linear_clamp = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            frame_layout,
            object_layout,
            face_layout,
            shadow_sampler,
            linear_clamp,
            white: Texture::flat(gpu, texture::WHITE, "Occlusion Fallback"),
        }
    }
}

pub(crate) fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

/// A render target or data texture read with `textureLoad`.
pub(crate) fn unfiltered_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: false },
        wgpu::TextureViewDimension::D2,
    )
}

pub(crate) fn sampler_entry(
    binding: u32,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

pub(crate) fn shader(gpu: &GpuContext, label: &str, source: &str) -> wgpu::ShaderModule {
    gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub(crate) fn color_target(format: wgpu::TextureFormat) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Depth test against the scene depth-stencil with stencil untouched.
pub(crate) fn scene_depth(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Everything that differs between the renderer's pipelines.
pub(crate) struct PipelineDesc<'a> {
    pub label: &'a str,
    pub shader: &'a wgpu::ShaderModule,
    pub vertex_entry: &'a str,
    pub fragment_entry: Option<&'a str>,
    pub buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth_stencil: Option<wgpu::DepthStencilState>,
}

/// Triangle-list pipeline without face culling.
pub(crate) fn pipeline(gpu: &GpuContext, desc: PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let layout = gpu
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", desc.label)),
            bind_group_layouts: desc.bind_group_layouts,
            push_constant_ranges: &[],
        });

    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: desc.shader,
                entry_point: Some(desc.vertex_entry),
                buffers: desc.buffers,
                compilation_options: Default::default(),
            },
            fragment: desc.fragment_entry.map(|entry| wgpu::FragmentState {
                module: desc.shader,
                entry_point: Some(entry),
                targets: desc.targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: desc.depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

/// Color attachment cleared to `clear` and stored.
pub(crate) fn clear_attachment<'a>(
    view: &'a wgpu::TextureView,
    clear: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'a>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}
