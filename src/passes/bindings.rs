use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;
use crate::light::{DirectionalLight, PointLight};

use super::common::PassResources;
use super::uniforms::{FrameUniforms, ShadowFaceUniforms};

/// A uniform buffer written each frame and its bind group.
pub struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    fn new<T: bytemuck::Pod>(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        initial: &T,
    ) -> Self {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(initial),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write<T: bytemuck::Pod>(&self, gpu: &GpuContext, value: &T) {
        gpu.queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// Frame-wide uniform bindings, rewritten at the start of every frame.
pub struct FrameBindings {
    pub frame: UniformBinding,
    pub directional_face: UniformBinding,
    /// One binding per cube face in [`CubeFace::ALL`](crate::light::CubeFace::ALL) order.
    pub point_faces: Vec<UniformBinding>,
}

impl FrameBindings {
    pub fn new(gpu: &GpuContext, resources: &PassResources) -> Self {
        let face = ShadowFaceUniforms::new(glam::Mat4::IDENTITY, glam::Vec3::ZERO, 1.0);
        Self {
            frame: UniformBinding::new(
                gpu,
                &resources.frame_layout,
                "Frame Uniforms",
                &<FrameUniforms as bytemuck::Zeroable>::zeroed(),
            ),
            directional_face: UniformBinding::new(
                gpu,
                &resources.face_layout,
                "Directional Shadow Face",
                &face,
            ),
            point_faces: (0..6)
                .map(|i| {
                    UniformBinding::new(
                        gpu,
                        &resources.face_layout,
                        &format!("Point Shadow Face {i}"),
                        &face,
                    )
                })
                .collect(),
        }
    }

    /// Uploads this frame's uniforms and the light matrices derived from the
    /// current light state.
    pub fn write(
        &self,
        gpu: &GpuContext,
        uniforms: &FrameUniforms,
        sun: &DirectionalLight,
        point: &PointLight,
    ) {
        self.frame.write(gpu, uniforms);
        self.directional_face.write(
            gpu,
            &ShadowFaceUniforms::new(sun.light_space(), sun.position, sun.far),
        );
        for (binding, view_proj) in self.point_faces.iter().zip(point.cube_faces()) {
            binding.write(
                gpu,
                &ShadowFaceUniforms::new(view_proj, point.position, point.far),
            );
        }
    }
}
