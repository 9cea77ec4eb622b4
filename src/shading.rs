//! CPU mirror of the per-fragment shading function in `lighting_common.wgsl`.
//!
//! The GPU passes evaluate this formula. It is kept here for tests and for
//! reasoning about configuration toggles without a device.

use glam::Vec3;

use crate::config::RenderConfig;
use crate::light::{DirectionalLight, PointLight};

/// Number of quantised diffuse bands in stylized mode.
pub const TOON_BANDS: f32 = 4.0;
/// Specular terms above this threshold become fully lit in stylized mode.
pub const TOON_SPECULAR_STEP: f32 = 0.5;

/// Surface attributes at one fragment, in world space.
#[derive(Clone, Copy, Debug)]
pub struct Surface {
    pub position: Vec3,
    pub normal: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

/// Per-fragment factors produced by the shadow and occlusion passes.
#[derive(Clone, Copy, Debug)]
pub struct Visibility {
    /// Ambient occlusion factor; only applied when SSAO is on.
    pub occlusion: f32,
    pub directional: f32,
    pub point: f32,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            occlusion: 1.0,
            directional: 1.0,
            point: 1.0,
        }
    }
}

/// Lit color of one fragment.
pub fn shade(
    config: &RenderConfig,
    surface: &Surface,
    eye: Vec3,
    sun: &DirectionalLight,
    point: &PointLight,
    visibility: Visibility,
) -> Vec3 {
    let n = surface.normal.normalize_or_zero();
    let v = (eye - surface.position).normalize_or_zero();

    let occlusion = if config.ssao { visibility.occlusion } else { 1.0 };
    let dir_vis = if config.directional_shadow {
        visibility.directional
    } else {
        1.0
    };
    let point_vis = if config.point_shadow { visibility.point } else { 1.0 };

    let ambient = surface.ambient * sun.ambient * occlusion;

    let (d, s) = light_terms(config, surface, n, v, sun.direction());
    let sun_light =
        (surface.diffuse * sun.diffuse * d + surface.specular * sun.specular * s) * dir_vis;

    let to_point = point.position - surface.position;
    let distance = to_point.length();
    let (d, s) = light_terms(config, surface, n, v, to_point.normalize_or_zero());
    let point_light = (surface.diffuse * point.diffuse * d + surface.specular * point.specular * s)
        * point.attenuation_at(distance)
        * point_vis;

    ambient + sun_light + point_light
}

/// Diffuse and specular factors for one light direction `l`.
fn light_terms(config: &RenderConfig, surface: &Surface, n: Vec3, v: Vec3, l: Vec3) -> (f32, f32) {
    let n_dot_l = n.dot(l).max(0.0);
    let specular = if n_dot_l <= 0.0 {
        0.0
    } else if config.blinn_phong {
        let h = (l + v).normalize_or_zero();
        n.dot(h).max(0.0).powf(surface.shininess)
    } else {
        let r = reflect(-l, n);
        v.dot(r).max(0.0).powf(surface.shininess)
    };

    if config.stylized {
        (
            (n_dot_l * TOON_BANDS).floor() / TOON_BANDS,
            if specular > TOON_SPECULAR_STEP { 1.0 } else { 0.0 },
        )
    } else {
        (n_dot_l, specular)
    }
}

/// Single specular value the G-buffer stores for a material's specular color.
pub fn specular_strength(specular: Vec3) -> f32 {
    specular.max_element().clamp(0.0, 1.0)
}

fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * n.dot(i) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_specular_survives_the_gbuffer() {
        assert_eq!(specular_strength(Vec3::splat(0.5)), 0.5);
        assert_eq!(specular_strength(Vec3::new(0.2, 0.9, 0.1)), 0.9);
        assert_eq!(specular_strength(Vec3::splat(3.0)), 1.0);
    }

    fn dark_point() -> PointLight {
        PointLight {
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            ..Default::default()
        }
    }

    fn matte(normal: Vec3) -> Surface {
        Surface {
            position: Vec3::ZERO,
            normal,
            ambient: Vec3::new(0.4, 0.5, 0.6),
            diffuse: Vec3::new(0.8, 0.2, 0.1),
            specular: Vec3::ZERO,
            shininess: 32.0,
        }
    }

    #[test]
    fn minimal_config_is_ambient_plus_lambert() {
        let sun = DirectionalLight::default();
        let surface = matte(Vec3::Y);
        let lit = shade(
            &RenderConfig::minimal(),
            &surface,
            Vec3::new(0.0, 2.0, 3.0),
            &sun,
            &dark_point(),
            Visibility::default(),
        );
        let expected = surface.ambient * sun.ambient
            + surface.diffuse * sun.diffuse * Vec3::Y.dot(sun.direction()).max(0.0);
        assert!(lit.abs_diff_eq(expected, 1e-6), "{lit} vs {expected}");
    }

    #[test]
    fn disabled_toggles_ignore_visibility() {
        let sun = DirectionalLight::default();
        let surface = matte(Vec3::Y);
        let eye = Vec3::new(0.0, 2.0, 3.0);
        let hidden = Visibility {
            occlusion: 0.0,
            directional: 0.0,
            point: 0.0,
        };
        let config = RenderConfig::minimal();
        let open = shade(&config, &surface, eye, &sun, &dark_point(), Visibility::default());
        let masked = shade(&config, &surface, eye, &sun, &dark_point(), hidden);
        assert_eq!(open, masked);

        let shadowed = RenderConfig {
            directional_shadow: true,
            ssao: true,
            ..config
        };
        let masked = shade(&shadowed, &surface, eye, &sun, &dark_point(), hidden);
        assert!(masked.length() < 1e-6);
    }

    #[test]
    fn back_facing_surface_gets_only_ambient() {
        let sun = DirectionalLight::default();
        let surface = Surface {
            specular: Vec3::ONE,
            ..matte(-sun.direction())
        };
        let lit = shade(
            &RenderConfig::minimal(),
            &surface,
            Vec3::new(0.0, 2.0, 3.0),
            &sun,
            &dark_point(),
            Visibility::default(),
        );
        assert!(lit.abs_diff_eq(surface.ambient * sun.ambient, 1e-6));
    }

    #[test]
    fn blinn_and_phong_agree_on_mirror_direction() {
        let sun = DirectionalLight::default();
        let l = sun.direction();
        let n = Vec3::Y;
        let eye = reflect(-l, n) * 3.0;
        let surface = Surface {
            specular: Vec3::ONE,
            ..matte(n)
        };
        let blinn = shade(
            &RenderConfig::minimal(),
            &surface,
            eye,
            &sun,
            &dark_point(),
            Visibility::default(),
        );
        let phong_config = RenderConfig {
            blinn_phong: false,
            ..RenderConfig::minimal()
        };
        let phong = shade(&phong_config, &surface, eye, &sun, &dark_point(), Visibility::default());
        assert!(blinn.abs_diff_eq(phong, 1e-4));
    }

    #[test]
    fn stylized_diffuse_is_banded() {
        let config = RenderConfig {
            stylized: true,
            ..RenderConfig::minimal()
        };
        let surface = matte(Vec3::Y);
        let (d, s) = light_terms(&config, &surface, Vec3::Y, Vec3::Y, Vec3::new(0.0, 0.6, 0.8));
        assert_eq!(d, 0.5);
        assert!(s == 0.0 || s == 1.0);
    }

    #[test]
    fn point_light_falls_off_with_distance() {
        let sun = DirectionalLight {
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            ..Default::default()
        };
        let surface = matte(Vec3::Y);
        let config = RenderConfig::minimal();
        let near = PointLight {
            position: Vec3::new(0.0, 1.0, 0.0),
            ..Default::default()
        };
        let far = PointLight {
            position: Vec3::new(0.0, 4.0, 0.0),
            ..Default::default()
        };
        let eye = Vec3::new(0.0, 2.0, 3.0);
        let a = shade(&config, &surface, eye, &sun, &near, Visibility::default());
        let b = shade(&config, &surface, eye, &sun, &far, Visibility::default());
        assert!(a.x > b.x && b.x > 0.0);
    }
}
