//! Mesh geometry on the CPU and on the GPU, plus placement transforms.
//!
//! - [`Vertex3d`] is the single vertex format every scene pipeline reads
//! - [`MeshData`] is editable CPU geometry produced by the importers and the
//!   built-in primitives
//! - [`Mesh`] is the immutable GPU upload of a [`MeshData`]
//! - [`Transform`] places a model in the world
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |
//! | tangent   | Float32x4 | 32     | 3               |
//!
//! The tangent's `w` holds the bitangent handedness (`±1`).

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::gpu::GpuContext;

/// A vertex with position, normal, texture coordinates and tangent frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex3d {
    /// Full layout for shading pipelines.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x4,
        ],
    };

    /// Position-only view of the same buffer, for depth-only passes.
    pub const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };

    /// Creates a vertex with a placeholder tangent; see [`MeshData::compute_tangents`].
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// CPU-side triangle list with a material binding.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
    /// Key into the owning model's material map.
    pub material: usize,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            material: 0,
        }
    }

    pub fn with_material(mut self, material: usize) -> Self {
        self.material = material;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), v| {
                let p = Vec3::from(v.position);
                (min.min(p), max.max(p))
            },
        )
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Replaces every normal with the area-weighted average of adjacent faces.
    pub fn recalculate_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p0 = Vec3::from(self.vertices[a].position);
            let p1 = Vec3::from(self.vertices[b].position);
            let p2 = Vec3::from(self.vertices[c].position);
            let face = (p1 - p0).cross(p2 - p0);
            for i in [a, b, c] {
                accum[i] += face;
            }
        }
        for (v, n) in self.vertices.iter_mut().zip(accum) {
            v.normal = n.normalize_or_zero().into();
        }
    }

    /// Derives per-vertex tangents from positions and UVs.
    ///
    /// Tangents are Gram-Schmidt orthogonalised against the normal; `w` is the
    /// handedness of the bitangent. Vertices with degenerate UVs get an
    /// arbitrary tangent perpendicular to the normal.
    pub fn compute_tangents(&mut self) {
        let count = self.vertices.len();
        let mut tangents = vec![Vec3::ZERO; count];
        let mut bitangents = vec![Vec3::ZERO; count];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (v0, v1, v2) = (&self.vertices[a], &self.vertices[b], &self.vertices[c]);

            let e1 = Vec3::from(v1.position) - Vec3::from(v0.position);
            let e2 = Vec3::from(v2.position) - Vec3::from(v0.position);
            let d1 = Vec2::from(v1.uv) - Vec2::from(v0.uv);
            let d2 = Vec2::from(v2.uv) - Vec2::from(v0.uv);

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let bt = (e2 * d1.x - e1 * d2.x) * r;
            for i in [a, b, c] {
                tangents[i] += t;
                bitangents[i] += bt;
            }
        }

        for (i, v) in self.vertices.iter_mut().enumerate() {
            let n = Vec3::from(v.normal).normalize_or_zero();
            let ortho = tangents[i] - n * n.dot(tangents[i]);
            let t = match ortho.try_normalize() {
                Some(t) => t,
                None if n != Vec3::ZERO => n.any_orthonormal_vector(),
                None => Vec3::X,
            };
            let w = if n.cross(t).dot(bitangents[i]) < 0.0 { -1.0 } else { 1.0 };
            v.tangent = [t.x, t.y, t.z, w];
        }
    }

    /// Uploads the geometry.
    pub fn upload(&self, gpu: &GpuContext, label: &str) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices, self.material, label)
    }

    /// A single triangle with a flat normal.
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n: [f32; 3] = (b - a).cross(c - a).normalize_or_zero().into();
        let mut mesh = Self::new(
            vec![
                Vertex3d::new(a.into(), n, [0.0, 0.0]),
                Vertex3d::new(b.into(), n, [1.0, 0.0]),
                Vertex3d::new(c.into(), n, [0.5, 1.0]),
            ],
            vec![0, 1, 2],
        );
        mesh.compute_tangents();
        mesh
    }

    /// Unit cube centered at the origin, one quad per face.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal,           u axis,            v axis
            ([ 0.0,  0.0,  1.0], [ 1.0, 0.0,  0.0], [0.0, 1.0,  0.0]),
            ([ 0.0,  0.0, -1.0], [-1.0, 0.0,  0.0], [0.0, 1.0,  0.0]),
            ([ 0.0,  1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0, 0.0, -1.0]),
            ([ 0.0, -1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0, 0.0,  1.0]),
            ([ 1.0,  0.0,  0.0], [ 0.0, 0.0, -1.0], [0.0, 1.0,  0.0]),
            ([-1.0,  0.0,  0.0], [ 0.0, 0.0,  1.0], [0.0, 1.0,  0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let base = vertices.len() as u32;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let p = n * 0.5 + u * su + v * sv;
                vertices.push(Vertex3d::new(p.into(), normal, [su + 0.5, 0.5 - sv]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        let mut mesh = Self::new(vertices, indices);
        mesh.compute_tangents();
        mesh
    }

    /// UV sphere of radius 0.5.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                vertices.push(Vertex3d::new(
                    [x * 0.5, y * 0.5, z * 0.5],
                    [x, y, z],
                    [seg as f32 / segments as f32, ring as f32 / rings as f32],
                ));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        let mut mesh = Self::new(vertices, indices);
        mesh.compute_tangents();
        mesh
    }

    /// Square on the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        let up = [0.0, 1.0, 0.0];
        let mut mesh = Self::new(
            vec![
                Vertex3d::new([-half, 0.0, -half], up, [0.0, 0.0]),
                Vertex3d::new([half, 0.0, -half], up, [1.0, 0.0]),
                Vertex3d::new([half, 0.0, half], up, [1.0, 1.0]),
                Vertex3d::new([-half, 0.0, half], up, [0.0, 1.0]),
            ],
            vec![0, 2, 1, 0, 3, 2],
        );
        mesh.compute_tangents();
        mesh
    }
}

/// Immutable GPU vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(
        gpu: &GpuContext,
        vertices: &[Vertex3d],
        indices: &[u32],
        material: usize,
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            material,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Binds the buffers and issues one indexed draw.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Position, rotation, and scale of a model in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_48_bytes() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 48);
    }

    #[test]
    fn bounds_and_center() {
        let mesh = MeshData::new(
            vec![
                Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            ],
            vec![0, 1, 2],
        );
        let (min, max) = mesh.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.center(), Vec3::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn recalculated_normals_follow_winding() {
        let mut mesh = MeshData::new(
            vec![
                Vertex3d::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
                Vertex3d::new([1.0, 0.0, 0.0], [0.0; 3], [1.0, 0.0]),
                Vertex3d::new([0.0, 1.0, 0.0], [0.0; 3], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        );
        mesh.recalculate_normals();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn tangents_are_orthonormal_to_normals() {
        for mesh in [MeshData::cube(), MeshData::sphere(16, 8), MeshData::plane(4.0)] {
            for v in &mesh.vertices {
                let n = Vec3::from(v.normal).normalize();
                let t = Vec3::new(v.tangent[0], v.tangent[1], v.tangent[2]);
                assert!((t.length() - 1.0).abs() < 1e-4);
                assert!(n.dot(t).abs() < 1e-4);
                assert!(v.tangent[3] == 1.0 || v.tangent[3] == -1.0);
            }
        }
    }

    #[test]
    fn plane_tangent_follows_u() {
        let plane = MeshData::plane(2.0);
        for v in &plane.vertices {
            assert!((Vec3::from_slice(&v.tangent[..3]) - Vec3::X).length() < 1e-5);
        }
    }

    #[test]
    fn primitives_face_outward() {
        for mesh in [MeshData::cube(), MeshData::sphere(12, 6)] {
            for tri in mesh.indices.chunks_exact(3) {
                let p: Vec<Vec3> = tri
                    .iter()
                    .map(|&i| Vec3::from(mesh.vertices[i as usize].position))
                    .collect();
                let face = (p[1] - p[0]).cross(p[2] - p[0]);
                if face.length() < 1e-8 {
                    continue; // pole triangles collapse
                }
                let centroid = (p[0] + p[1] + p[2]) / 3.0;
                assert!(face.dot(centroid) > 0.0);
            }
        }
        let plane = MeshData::plane(1.0);
        let p: Vec<Vec3> = plane.indices[..3]
            .iter()
            .map(|&i| Vec3::from(plane.vertices[i as usize].position))
            .collect();
        assert!((p[1] - p[0]).cross(p[2] - p[0]).y > 0.0);
    }

    #[test]
    fn transform_matrix_scales_then_translates() {
        let transform = Transform::new()
            .position(Vec3::new(2.05, 0.628725, -1.9))
            .uniform_scale(0.001);
        let p = transform.matrix().transform_point3(Vec3::new(1000.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.05, 0.628725, -1.9)).length() < 1e-5);
    }
}
