//! Screen-space ambient occlusion sampling data and a CPU evaluator.
//!
//! [`SsaoKernel`] is generated once at startup from a seeded RNG and uploaded
//! to the GPU pass unchanged. [`evaluate`] runs the same per-pixel estimate as
//! `ssao.wgsl` over a [`SoftGBuffer`], which makes the estimator checkable
//! without a device.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4Swizzles};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SSAO_NOISE_SIZE;

/// Hemisphere sample offsets plus the tiled rotation noise.
#[derive(Clone, Debug, PartialEq)]
pub struct SsaoKernel {
    /// Tangent-space offsets in the +Z hemisphere, denser near the origin.
    pub samples: Vec<Vec3>,
    /// `SSAO_NOISE_SIZE²` rotation vectors in the tangent plane (z = 0).
    pub noise: Vec<Vec3>,
}

impl SsaoKernel {
    pub fn generate(size: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let samples = (0..size)
            .map(|i| {
                let dir = Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(0.0..1.0),
                )
                .normalize_or(Vec3::Z);
                let t = i as f32 / size as f32;
                dir * rng.gen_range(0.0..1.0f32) * (0.1 + 0.9 * t * t)
            })
            .collect();

        let noise = (0..SSAO_NOISE_SIZE * SSAO_NOISE_SIZE)
            .map(|_| Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0))
            .collect();

        Self { samples, noise }
    }

    /// Noise vector tiled over the screen.
    pub fn noise_at(&self, px: u32, py: u32) -> Vec3 {
        let n = SSAO_NOISE_SIZE;
        self.noise[((py % n) * n + px % n) as usize]
    }

    /// Samples packed as `vec4` for a uniform array.
    pub fn packed_samples(&self) -> Vec<[f32; 4]> {
        self.samples.iter().map(|s| s.extend(0.0).to_array()).collect()
    }

    /// Noise packed as RGBA32F texels.
    pub fn packed_noise(&self) -> Vec<[f32; 4]> {
        self.noise.iter().map(|n| n.extend(0.0).to_array()).collect()
    }
}

/// View-space position and normal for each pixel of a viewport.
#[derive(Clone, Debug)]
pub struct SoftGBuffer {
    pub width: u32,
    pub height: u32,
    texels: Vec<Option<(Vec3, Vec3)>>,
}

/// An infinite plane `normal · p = offset`, in world space.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl SoftGBuffer {
    /// Ray-casts a set of planes from a camera, keeping the nearest hit.
    pub fn render_planes(
        planes: &[Plane],
        view: Mat4,
        proj: Mat4,
        width: u32,
        height: u32,
    ) -> Self {
        let inv = (proj * view).inverse();
        let eye = view.inverse().w_axis.xyz();
        let normal_to_view = Mat3::from_mat4(view);

        let mut texels = Vec::with_capacity((width * height) as usize);
        for py in 0..height {
            for px in 0..width {
                let ndc = Vec2::new(
                    (px as f32 + 0.5) / width as f32 * 2.0 - 1.0,
                    1.0 - (py as f32 + 0.5) / height as f32 * 2.0,
                );
                let far = inv.project_point3(ndc.extend(1.0));
                let dir = (far - eye).normalize();

                let hit = planes
                    .iter()
                    .filter_map(|plane| {
                        let denom = plane.normal.dot(dir);
                        if denom.abs() < 1e-6 {
                            return None;
                        }
                        let t = (plane.offset - plane.normal.dot(eye)) / denom;
                        (t > 0.0).then_some((t, plane.normal))
                    })
                    .min_by(|a, b| a.0.total_cmp(&b.0));

                texels.push(hit.map(|(t, n)| {
                    let world = eye + dir * t;
                    let n = if n.dot(dir) > 0.0 { -n } else { n };
                    (view.transform_point3(world), (normal_to_view * n).normalize())
                }));
            }
        }

        Self {
            width,
            height,
            texels,
        }
    }

    pub fn get(&self, px: u32, py: u32) -> Option<(Vec3, Vec3)> {
        if px >= self.width || py >= self.height {
            return None;
        }
        self.texels[(py * self.width + px) as usize]
    }
}

/// Ambient visibility in `[0, 1]` for one pixel; 1 is fully open.
pub fn evaluate(
    kernel: &SsaoKernel,
    gbuffer: &SoftGBuffer,
    proj: Mat4,
    px: u32,
    py: u32,
    radius: f32,
    bias: f32,
) -> f32 {
    let Some((frag_pos, normal)) = gbuffer.get(px, py) else {
        return 1.0;
    };

    let random = kernel.noise_at(px, py);
    let tangent = (random - normal * random.dot(normal))
        .try_normalize()
        .unwrap_or_else(|| normal.any_orthonormal_vector());
    let bitangent = normal.cross(tangent);
    let tbn = Mat3::from_cols(tangent, bitangent, normal);

    let size = Vec2::new(gbuffer.width as f32, gbuffer.height as f32);
    let mut occlusion = 0.0;
    for offset in &kernel.samples {
        let sample = frag_pos + tbn * *offset * radius;
        let clip = proj * sample.extend(1.0);
        if clip.w <= 0.0 {
            continue;
        }
        let ndc = clip.xyz() / clip.w;
        let uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
        let texel = (uv * size).floor();
        if texel.x < 0.0 || texel.y < 0.0 {
            continue;
        }
        let Some((stored, _)) = gbuffer.get(texel.x as u32, texel.y as u32) else {
            continue;
        };

        let sample_depth = stored.z;
        let range = smoothstep(0.0, 1.0, radius / (frag_pos.z - sample_depth).abs().max(1e-5));
        if sample_depth >= sample.z + bias {
            occlusion += range;
        }
    }

    1.0 - occlusion / kernel.samples.len().max(1) as f32
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_lies_in_scaled_hemisphere() {
        let kernel = SsaoKernel::generate(64, 7);
        assert_eq!(kernel.samples.len(), 64);
        for (i, s) in kernel.samples.iter().enumerate() {
            let t = i as f32 / 64.0;
            assert!(s.z >= 0.0);
            assert!(s.length() <= 0.1 + 0.9 * t * t + 1e-6);
        }
    }

    #[test]
    fn kernel_is_deterministic_per_seed() {
        assert_eq!(SsaoKernel::generate(16, 3), SsaoKernel::generate(16, 3));
        assert_ne!(SsaoKernel::generate(16, 3), SsaoKernel::generate(16, 4));
    }

    #[test]
    fn noise_tiles_in_tangent_plane() {
        let kernel = SsaoKernel::generate(8, 1);
        assert_eq!(kernel.noise.len(), 16);
        assert!(kernel.noise.iter().all(|n| n.z == 0.0));
        assert_eq!(kernel.noise_at(1, 2), kernel.noise_at(5, 6));
    }

    #[test]
    fn open_plane_is_unoccluded() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO, Vec3::NEG_Z);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 50.0);
        let floor = Plane {
            normal: Vec3::Y,
            offset: 0.0,
        };
        let gbuffer = SoftGBuffer::render_planes(&[floor], view, proj, 32, 32);
        let kernel = SsaoKernel::generate(64, 11);
        let ao = evaluate(&kernel, &gbuffer, proj, 16, 16, 0.5, 0.025);
        assert!(ao > 0.95, "ao = {ao}");
    }
}
