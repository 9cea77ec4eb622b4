//! GPU uniform layouts. Field order and padding match `shaders/types.wgsl`.

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::config::{RenderConfig, RendererSettings};
use crate::light::{DirectionalLight, PointLight};
use crate::material::Material;
use crate::ssao::SsaoKernel;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    pub shadow_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sun_ambient: [f32; 4],
    pub sun_diffuse: [f32; 4],
    pub sun_specular: [f32; 4],
    pub point_position: [f32; 4],
    pub point_diffuse: [f32; 4],
    pub point_specular: [f32; 4],
    pub point_attenuation: [f32; 4],
    pub clear_color: [f32; 4],
    pub params: [f32; 4],
    pub toggles: [u32; 4],
    pub modes: [u32; 4],
}

/// Inputs gathered for one frame's [`FrameUniforms`].
pub struct FrameInputs<'a> {
    pub camera: &'a Camera,
    pub sun: &'a DirectionalLight,
    pub point: &'a PointLight,
    pub config: &'a RenderConfig,
    pub settings: &'a RendererSettings,
    pub width: u32,
    pub height: u32,
}

fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    v.extend(w).to_array()
}

impl FrameUniforms {
    pub fn new(inputs: &FrameInputs<'_>) -> Self {
        let FrameInputs {
            camera,
            sun,
            point,
            config,
            settings,
            width,
            height,
        } = *inputs;
        let aspect = width as f32 / height.max(1) as f32;
        let flag = |on: bool| on as u32;
        let channel = config.gbuffer_view.code();

        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix(aspect).to_cols_array_2d(),
            light_space: sun.light_space().to_cols_array_2d(),
            shadow_matrix: sun.shadow_matrix().to_cols_array_2d(),
            camera_pos: vec4(camera.position, 1.0),
            sun_direction: vec4(sun.direction(), 0.0),
            sun_ambient: vec4(sun.ambient, 0.0),
            sun_diffuse: vec4(sun.diffuse, 0.0),
            sun_specular: vec4(sun.specular, 0.0),
            point_position: vec4(point.position, point.far),
            point_diffuse: vec4(point.diffuse, 0.0),
            point_specular: vec4(point.specular, 0.0),
            point_attenuation: vec4(point.attenuation, 0.0),
            clear_color: vec4(Vec3::from_array(settings.clear_color), 1.0),
            params: [width as f32, height as f32, settings.shadow_bias, 0.0],
            toggles: [
                flag(config.blinn_phong),
                flag(config.directional_shadow),
                flag(config.point_shadow),
                flag(config.normal_mapping),
            ],
            modes: [
                flag(config.ssao),
                flag(config.stylized),
                flag(config.deferred_shading),
                channel,
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    /// w: shininess
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    /// has_texture, has_normal_map, emissive
    pub flags: [u32; 4],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, material: &Material, has_texture: bool, has_normal_map: bool) -> Self {
        let emissive = material.emissive.unwrap_or(Vec3::ZERO);
        let mut uniforms = Self {
            model: [[0.0; 4]; 4],
            normal_matrix: [[0.0; 4]; 4],
            ambient: vec4(material.ambient, 1.0),
            diffuse: vec4(material.diffuse, 1.0),
            specular: vec4(material.specular, material.shininess),
            emissive: vec4(emissive, 1.0),
            flags: [
                has_texture as u32,
                has_normal_map as u32,
                material.is_emissive() as u32,
                0,
            ],
        };
        uniforms.set_model(model);
        uniforms
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.model = model.to_cols_array_2d();
        self.normal_matrix = model.inverse().transpose().to_cols_array_2d();
    }
}

/// View-projection of one shadow face plus the light position and far plane.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowFaceUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_pos_far: [f32; 4],
}

impl ShadowFaceUniforms {
    pub fn new(view_proj: Mat4, light: Vec3, far: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_pos_far: vec4(light, far),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoUniforms {
    pub samples: [[f32; 4]; 64],
    pub params: [f32; 4],
    pub counts: [u32; 4],
}

impl SsaoUniforms {
    pub fn new(kernel: &SsaoKernel, settings: &RendererSettings, noise_size: u32) -> Self {
        let mut samples = [[0.0; 4]; 64];
        for (slot, sample) in samples.iter_mut().zip(kernel.packed_samples()) {
            *slot = sample;
        }
        Self {
            samples,
            params: [settings.ssao_radius, settings.ssao_bias, 0.0, 0.0],
            counts: [kernel.samples.len().min(64) as u32, noise_size, 0, 0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub direction: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniforms {
    pub mode: [u32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GBufferChannel;

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 464);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 208);
        assert_eq!(std::mem::size_of::<ShadowFaceUniforms>(), 80);
        assert_eq!(std::mem::size_of::<SsaoUniforms>(), 64 * 16 + 32);
    }

    #[test]
    fn frame_uniforms_pack_toggles() {
        let camera = Camera::new(Vec3::new(0.0, 1.0, 3.0), -90.0, 0.0);
        let config = RenderConfig {
            gbuffer_view: GBufferChannel::Position,
            ssao: true,
            ..RenderConfig::minimal()
        };
        let settings = RendererSettings::default();
        let uniforms = FrameUniforms::new(&FrameInputs {
            camera: &camera,
            sun: &DirectionalLight::default(),
            point: &PointLight::default(),
            config: &config,
            settings: &settings,
            width: 320,
            height: 240,
        });
        assert_eq!(uniforms.toggles, [1, 0, 0, 0]);
        assert_eq!(uniforms.modes, [1, 0, 0, 3]);
        assert_eq!(uniforms.params[2], settings.shadow_bias);
        assert_eq!(uniforms.point_position[3], PointLight::default().far);
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniforms = ObjectUniforms::new(model, &Material::default(), false, false);
        let normal = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!((n.x - 0.5).abs() < 1e-6 && (n.y - 1.0).abs() < 1e-6);
    }
}
