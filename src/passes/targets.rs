use crate::config::RendererSettings;
use crate::gpu::GpuContext;
use crate::render_graph::{AttachmentPurpose, AttachmentSpec, RenderTarget, TargetSize};

use super::common::{HDR_FORMAT, OCCLUSION_FORMAT};

/// G-buffer attachments in [`GBufferChannel::attachment`](crate::GBufferChannel::attachment) order.
///
/// | attachment | rgb            | a                    |
/// |------------|----------------|----------------------|
/// | diffuse    | diffuse color  | shininess / 256      |
/// | normal     | world normal   | unused               |
/// | position   | world position | linear view depth    |
/// | material   | ambient color  | specular strength    |
///
/// Four attachments keep the layout inside the default
/// `max_color_attachment_bytes_per_sample` of 32.
pub const GBUFFER_ATTACHMENTS: [AttachmentSpec; 4] = [
    AttachmentSpec::color("diffuse", wgpu::TextureFormat::Rgba8Unorm),
    AttachmentSpec::color("normal", wgpu::TextureFormat::Rgba16Float),
    AttachmentSpec::color("position", wgpu::TextureFormat::Rgba16Float),
    AttachmentSpec::color("material", wgpu::TextureFormat::Rgba8Unorm),
];

const DIRECTIONAL_SHADOW: [AttachmentSpec; 1] =
    [AttachmentSpec::depth("depth", AttachmentPurpose::Depth)];
const POINT_SHADOW: [AttachmentSpec; 1] =
    [AttachmentSpec::depth("cube", AttachmentPurpose::DepthCube)];
const SCENE_DEPTH: [AttachmentSpec; 1] =
    [AttachmentSpec::depth("depth stencil", AttachmentPurpose::DepthStencil)];
const OCCLUSION: [AttachmentSpec; 1] = [AttachmentSpec::color("occlusion", OCCLUSION_FORMAT)];
const HDR_COLOR: [AttachmentSpec; 1] = [AttachmentSpec::color("color", HDR_FORMAT)];

/// Size and attachments of one frame target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetDesc {
    pub label: &'static str,
    pub size: TargetSize,
    pub attachments: &'static [AttachmentSpec],
}

/// Every off-screen target a frame renders into.
///
/// Shadow maps keep their configured resolution. All other targets match the
/// output and are recreated together by [`resize`](Self::resize) before the
/// next frame records.
pub struct FrameTargets {
    pub directional_shadow: RenderTarget,
    pub point_shadow: RenderTarget,
    pub gbuffer: RenderTarget,
    /// Shared by the geometry, lighting and bloom passes; carries the emissive stencil.
    pub scene_depth: RenderTarget,
    pub occlusion: RenderTarget,
    pub lit: RenderTarget,
    pub bright: RenderTarget,
    pub pingpong: [RenderTarget; 2],
}

impl FrameTargets {
    pub fn descriptors(settings: &RendererSettings) -> [TargetDesc; 9] {
        let screen = |label: &'static str, attachments: &'static [AttachmentSpec]| TargetDesc {
            label,
            size: TargetSize::Screen,
            attachments,
        };
        [
            TargetDesc {
                label: "Directional Shadow",
                size: TargetSize::Fixed(settings.shadow_map_size),
                attachments: &DIRECTIONAL_SHADOW,
            },
            TargetDesc {
                label: "Point Shadow",
                size: TargetSize::Fixed(settings.point_shadow_size),
                attachments: &POINT_SHADOW,
            },
            screen("G-Buffer", &GBUFFER_ATTACHMENTS),
            screen("Scene Depth", &SCENE_DEPTH),
            screen("Occlusion", &OCCLUSION),
            screen("Lit Color", &HDR_COLOR),
            screen("Bloom Bright", &HDR_COLOR),
            screen("Bloom Ping", &HDR_COLOR),
            screen("Bloom Pong", &HDR_COLOR),
        ]
    }

    pub fn new(gpu: &GpuContext, settings: &RendererSettings) -> Self {
        let [
            directional_shadow,
            point_shadow,
            gbuffer,
            scene_depth,
            occlusion,
            lit,
            bright,
            ping,
            pong,
        ] = Self::descriptors(settings)
            .map(|desc| RenderTarget::new(gpu, desc.label, desc.size, desc.attachments));

        Self {
            directional_shadow,
            point_shadow,
            gbuffer,
            scene_depth,
            occlusion,
            lit,
            bright,
            pingpong: [ping, pong],
        }
    }

    pub fn all(&self) -> [&RenderTarget; 9] {
        [
            &self.directional_shadow,
            &self.point_shadow,
            &self.gbuffer,
            &self.scene_depth,
            &self.occlusion,
            &self.lit,
            &self.bright,
            &self.pingpong[0],
            &self.pingpong[1],
        ]
    }

    /// Recreates every screen-sized target; returns how many were reallocated.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> usize {
        let [ping, pong] = &mut self.pingpong;
        [
            &mut self.directional_shadow,
            &mut self.point_shadow,
            &mut self.gbuffer,
            &mut self.scene_depth,
            &mut self.occlusion,
            &mut self.lit,
            &mut self.bright,
            ping,
            pong,
        ]
        .into_iter()
        .filter_map(|target| target.resize(gpu, width, height).then_some(()))
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shadow_maps_have_fixed_size() {
        let settings = RendererSettings::default().shadow_map_size(2048);
        let descs = FrameTargets::descriptors(&settings);
        let fixed: Vec<_> = descs
            .iter()
            .filter(|d| d.size != TargetSize::Screen)
            .map(|d| (d.label, d.size))
            .collect();
        assert_eq!(
            fixed,
            vec![
                ("Directional Shadow", TargetSize::Fixed(2048)),
                ("Point Shadow", TargetSize::Fixed(512)),
            ]
        );
    }

    #[test]
    fn screen_targets_share_one_extent() {
        let descs = FrameTargets::descriptors(&RendererSettings::default());
        let extents: Vec<_> = descs
            .iter()
            .filter(|d| d.size == TargetSize::Screen)
            .map(|d| d.size.resolve(1280, 720))
            .collect();
        assert_eq!(extents.len(), 7);
        assert!(extents.iter().all(|e| *e == (1280, 720)));
    }

    #[test]
    fn gbuffer_fits_attachment_budget() {
        let bytes: u32 = GBUFFER_ATTACHMENTS
            .iter()
            .map(|a| a.format.target_pixel_byte_cost().unwrap_or(u32::MAX))
            .sum();
        assert!(bytes <= wgpu::Limits::default().max_color_attachment_bytes_per_sample);
    }
}
