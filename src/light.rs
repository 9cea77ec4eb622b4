//! Scene lights and the matrices their shadow passes render with.
//!
//! The directional light is an orthographic "sun" aimed from `position` at a
//! fixed `target`; shading uses the direction `normalize(position - target)`.
//! Its shadow is sampled through [`DirectionalLight::shadow_matrix`], the
//! light's view-projection followed by [`bias_matrix`].
//!
//! The point light renders six 90° faces into a cube depth map. The face
//! matrices are rebuilt from the light's current position every frame.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3, Vec4};

/// Orthographic sun light.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Half-width of the square orthographic shadow frustum.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(-2.845, 2.028, -1.293),
            target: Vec3::new(0.542, -0.141, -0.422),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.7),
            specular: Vec3::splat(0.2),
            extent: 10.0,
            near: -10.0,
            far: 20.0,
        }
    }
}

impl DirectionalLight {
    /// Unit vector from the lit surface toward the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or(Vec3::Y)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        let e = self.extent;
        Mat4::orthographic_rh(-e, e, -e, e, self.near, self.far)
    }

    /// World space to light clip space, as rendered by the shadow pass.
    pub fn light_space(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World space to shadow-map `(u, v, depth)`.
    pub fn shadow_matrix(&self) -> Mat4 {
        bias_matrix() * self.light_space()
    }
}

/// Maps clip-space x/y in `[-1, 1]` to texture u/v in `[0, 1]`.
///
/// Texture v grows downward while clip y grows upward, so y is flipped. Clip
/// depth is already in `[0, 1]` and passes through.
pub fn bias_matrix() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    )
}

/// Omnidirectional light with distance attenuation and a visible marker.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Color of the marker sphere, which bloom picks up.
    pub emissive: Vec3,
    /// Constant, linear and quadratic attenuation terms.
    pub attenuation: Vec3,
    pub marker_radius: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.6, 1.6, -1.2),
            diffuse: Vec3::new(0.9, 0.75, 0.55),
            specular: Vec3::splat(0.4),
            emissive: Vec3::new(4.0, 3.2, 2.2),
            attenuation: Vec3::new(1.0, 0.09, 0.032),
            marker_radius: 0.08,
            near: 0.05,
            far: 25.0,
        }
    }
}

impl PointLight {
    pub fn attenuation_at(&self, distance: f32) -> f32 {
        let a = self.attenuation;
        1.0 / (a.x + a.y * distance + a.z * distance * distance)
    }

    /// Six face view-projections in cube order +X, -X, +Y, -Y, +Z, -Z.
    pub fn cube_faces(&self) -> [Mat4; 6] {
        CubeFace::ALL.map(|face| face.view_projection(self.position, self.near, self.far))
    }

    /// Places the unit-diameter marker sphere at the light.
    pub fn marker_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.marker_radius * 2.0),
            glam::Quat::IDENTITY,
            self.position,
        )
    }

    /// Depth value the cube shadow pass stores for `point`.
    pub fn stored_depth(&self, point: Vec3) -> f32 {
        (point - self.position).length() / self.far
    }
}

/// One face of a cube shadow map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Look direction and up vector for this face.
    pub fn basis(self) -> (Vec3, Vec3) {
        match self {
            CubeFace::PosX => (Vec3::X, Vec3::NEG_Y),
            CubeFace::NegX => (Vec3::NEG_X, Vec3::NEG_Y),
            CubeFace::PosY => (Vec3::Y, Vec3::Z),
            CubeFace::NegY => (Vec3::NEG_Y, Vec3::NEG_Z),
            CubeFace::PosZ => (Vec3::Z, Vec3::NEG_Y),
            CubeFace::NegZ => (Vec3::NEG_Z, Vec3::NEG_Y),
        }
    }

    /// The up vectors above follow the bottom-up row convention cube maps are
    /// specified in. Render targets are written top-down, so clip y is flipped
    /// to land each texel where a cube lookup expects it.
    pub fn view_projection(self, eye: Vec3, near: f32, far: f32) -> Mat4 {
        let (dir, up) = self.basis();
        let flip = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0));
        flip * Mat4::perspective_rh(FRAC_PI_2, 1.0, near, far) * Mat4::look_to_rh(eye, dir, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Face and `(u, v)` a cube-map lookup reads for `dir`, with v = 0 at the
    /// top row of the face image.
    fn cube_lookup(dir: Vec3) -> (CubeFace, f32, f32) {
        let a = dir.abs();
        let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
            if dir.x > 0.0 {
                (CubeFace::PosX, -dir.z, -dir.y, a.x)
            } else {
                (CubeFace::NegX, dir.z, -dir.y, a.x)
            }
        } else if a.y >= a.z {
            if dir.y > 0.0 {
                (CubeFace::PosY, dir.x, dir.z, a.y)
            } else {
                (CubeFace::NegY, dir.x, -dir.z, a.y)
            }
        } else if dir.z > 0.0 {
            (CubeFace::PosZ, dir.x, -dir.y, a.z)
        } else {
            (CubeFace::NegZ, -dir.x, -dir.y, a.z)
        };
        (face, 0.5 * (sc / ma + 1.0), 0.5 * (tc / ma + 1.0))
    }

    #[test]
    fn cube_faces_land_where_lookups_read() {
        let light = PointLight::default();
        let faces = light.cube_faces();
        let dirs = [
            Vec3::new(1.0, 0.3, -0.2),
            Vec3::new(-1.0, -0.4, 0.6),
            Vec3::new(0.2, 1.0, 0.5),
            Vec3::new(-0.3, -1.0, 0.1),
            Vec3::new(0.45, -0.2, 1.0),
            Vec3::new(-0.1, 0.7, -1.0),
        ];
        for dir in dirs {
            let (face, u, v) = cube_lookup(dir);
            let index = CubeFace::ALL.iter().position(|f| *f == face).unwrap();
            let clip = faces[index] * (light.position + dir * 2.0).extend(1.0);
            let ndc = clip.truncate() / clip.w;
            // Viewport mapping: x right, y down.
            let (px, py) = (0.5 * (ndc.x + 1.0), 0.5 * (1.0 - ndc.y));
            assert!((px - u).abs() < 1e-4, "{face:?} u: {px} vs {u}");
            assert!((py - v).abs() < 1e-4, "{face:?} v: {py} vs {v}");
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn faces_follow_the_light() {
        let mut light = PointLight::default();
        let before = light.cube_faces();
        light.position += Vec3::new(0.5, 0.0, 0.0);
        let after = light.cube_faces();
        assert_ne!(before, after);

        let point = light.position + Vec3::X;
        let clip = after[0] * point.extend(1.0);
        assert!((clip.x / clip.w).abs() < 1e-5 && (clip.y / clip.w).abs() < 1e-5);
    }

    #[test]
    fn bias_maps_clip_corners_to_uv_corners() {
        let bias = bias_matrix();
        let top_left = bias * Vec4::new(-1.0, 1.0, 0.25, 1.0);
        assert_eq!(top_left, Vec4::new(0.0, 0.0, 0.25, 1.0));
        let bottom_right = bias * Vec4::new(1.0, -1.0, 0.75, 1.0);
        assert_eq!(bottom_right, Vec4::new(1.0, 1.0, 0.75, 1.0));
    }

    #[test]
    fn directional_light_points_away_from_target() {
        let light = DirectionalLight::default();
        let l = light.direction();
        assert!(l.y > 0.0);
        assert!((l.length() - 1.0).abs() < 1e-6);
        // The target sits at the center of the shadow map.
        let uv = light.shadow_matrix().project_point3(light.target);
        assert!((uv.x - 0.5).abs() < 1e-5 && (uv.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn attenuation_starts_at_one() {
        let light = PointLight::default();
        assert_eq!(light.attenuation_at(0.0), 1.0);
        assert!(light.attenuation_at(5.0) < light.attenuation_at(1.0));
    }
}
