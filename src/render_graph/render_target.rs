//! Off-screen render targets.

use crate::gpu::GpuContext;

/// How an attachment is rendered to and read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentPurpose {
    /// Rendered as a color attachment and read by later passes.
    Color,
    /// Sampled depth, such as a shadow map.
    Depth,
    /// Depth plus stencil, used only as an attachment.
    DepthStencil,
    /// Six-layer depth cube rendered one face at a time.
    DepthCube,
}

/// Format and role of one attachment in a [`RenderTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub label: &'static str,
    pub format: wgpu::TextureFormat,
    pub purpose: AttachmentPurpose,
}

impl AttachmentSpec {
    pub const fn color(label: &'static str, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            format,
            purpose: AttachmentPurpose::Color,
        }
    }

    pub const fn depth(label: &'static str, purpose: AttachmentPurpose) -> Self {
        let format = match purpose {
            AttachmentPurpose::DepthStencil => wgpu::TextureFormat::Depth24PlusStencil8,
            _ => wgpu::TextureFormat::Depth32Float,
        };
        Self {
            label,
            format,
            purpose,
        }
    }

    fn usage(&self) -> wgpu::TextureUsages {
        match self.purpose {
            AttachmentPurpose::Color => {
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
            }
            AttachmentPurpose::Depth | AttachmentPurpose::DepthCube => {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            }
            AttachmentPurpose::DepthStencil => wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    fn layers(&self) -> u32 {
        if self.purpose == AttachmentPurpose::DepthCube {
            6
        } else {
            1
        }
    }
}

/// Whether a target follows the screen or keeps a fixed resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSize {
    Screen,
    /// Square target with the given edge length.
    Fixed(u32),
}

impl TargetSize {
    /// Pixel extent for a screen of `width` by `height`, never zero.
    pub fn resolve(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            TargetSize::Screen => (width.max(1), height.max(1)),
            TargetSize::Fixed(edge) => (edge.max(1), edge.max(1)),
        }
    }
}

/// One allocated attachment.
#[derive(Debug)]
pub struct Attachment {
    pub spec: AttachmentSpec,
    pub texture: wgpu::Texture,
    /// Whole-resource view: 2D, or cube for [`AttachmentPurpose::DepthCube`].
    pub view: wgpu::TextureView,
    /// Per-layer views for rendering cube faces; empty otherwise.
    pub layer_views: Vec<wgpu::TextureView>,
}

/// A named group of same-sized attachments rendered together.
///
/// Screen-sized targets are recreated by [`resize`](Self::resize) whenever
/// the screen changes; the `generation` counter increases on every
/// reallocation so callers can tell stale views apart.
#[derive(Debug)]
pub struct RenderTarget {
    label: &'static str,
    size: TargetSize,
    width: u32,
    height: u32,
    generation: u64,
    attachments: Vec<Attachment>,
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuContext,
        label: &'static str,
        size: TargetSize,
        specs: &[AttachmentSpec],
    ) -> Self {
        let (width, height) = size.resolve(gpu.width(), gpu.height());
        Self {
            label,
            size,
            width,
            height,
            generation: 0,
            attachments: specs
                .iter()
                .map(|spec| allocate(gpu, label, spec, width, height))
                .collect(),
        }
    }

    /// Reallocates every attachment if the resolved size changed.
    ///
    /// Returns `true` when the target was recreated.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> bool {
        let (w, h) = self.size.resolve(width, height);
        if (w, h) == (self.width, self.height) {
            return false;
        }
        self.width = w;
        self.height = h;
        self.generation += 1;
        let label = self.label;
        for attachment in &mut self.attachments {
            let spec = attachment.spec;
            *attachment = allocate(gpu, label, &spec, w, h);
        }
        log::debug!("resized {label} to {w}x{h}");
        true
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn attachment(&self, index: usize) -> &Attachment {
        &self.attachments[index]
    }

    /// View of the attachment at `index`.
    pub fn view(&self, index: usize) -> &wgpu::TextureView {
        &self.attachments[index].view
    }
}

fn allocate(
    gpu: &GpuContext,
    target: &str,
    spec: &AttachmentSpec,
    width: u32,
    height: u32,
) -> Attachment {
    let layers = spec.layers();
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{target} {}", spec.label)),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: spec.format,
        usage: spec.usage(),
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(if layers == 6 {
            wgpu::TextureViewDimension::Cube
        } else {
            wgpu::TextureViewDimension::D2
        }),
        ..Default::default()
    });

    let layer_views = if layers == 6 {
        (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    Attachment {
        spec: *spec,
        texture,
        view,
        layer_views,
    }
}
