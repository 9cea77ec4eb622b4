use std::path::Path;

use image::RgbaImage;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    /// Material textures wrap mirrored.
    #[default]
    MirroredRepeat,
    ClampToEdge,
}

impl TextureWrap {
    pub fn address_mode(self) -> wgpu::AddressMode {
        match self {
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
            TextureWrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Decodes an image file into 8-bit RGBA.
pub fn decode_rgba(path: impl AsRef<Path>) -> Result<RgbaImage, AssetError> {
    Ok(image::open(path.as_ref())?.to_rgba8())
}

/// Box-filtered mip chain, level 0 first, down to 1x1.
pub fn mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base.clone()];
    let (mut w, mut h) = base.dimensions();
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        let prev = levels.last().unwrap_or(base);
        levels.push(image::imageops::resize(
            prev,
            w,
            h,
            image::imageops::FilterType::Triangle,
        ));
    }
    levels
}

/// A sampled GPU texture with its own sampler.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads an image with a full mip chain and linear filtering.
    ///
    /// Texel values are stored as-is (`Rgba8Unorm`); the renderer treats
    /// texture colors as display values.
    pub fn from_image(gpu: &GpuContext, image: &RgbaImage, wrap: TextureWrap, label: &str) -> Self {
        let levels = mip_chain(image);
        let (width, height) = image.dimensions();

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in levels.iter().enumerate() {
            let (w, h) = level.dimensions();
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                level.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode = wrap.address_mode();
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// A 1x1 texture of a single color.
    pub fn flat(gpu: &GpuContext, rgba: [u8; 4], label: &str) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        Self::from_image(gpu, &image, TextureWrap::Repeat, label)
    }

    /// Loads a texture from disk.
    pub fn from_file(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        wrap: TextureWrap,
    ) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = decode_rgba(path)?;
        log::info!(
            "loaded texture {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(gpu, &image, wrap, &path.display().to_string()))
    }
}

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
/// Tangent-space +Z, the "no perturbation" normal map texel.
pub const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_to_one() {
        let base = RgbaImage::from_pixel(8, 2, image::Rgba([10, 20, 30, 255]));
        let dims: Vec<_> = mip_chain(&base).iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn mip_chain_preserves_flat_color() {
        let base = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]));
        let last = mip_chain(&base).pop().unwrap();
        assert_eq!(last.get_pixel(0, 0).0, [200, 100, 50, 255]);
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = decode_rgba("does/not/exist.png").unwrap_err();
        assert!(matches!(err, AssetError::Image(_)));
    }

    #[test]
    fn material_wrap_is_mirrored() {
        assert_eq!(
            TextureWrap::default().address_mode(),
            wgpu::AddressMode::MirrorRepeat
        );
    }
}
