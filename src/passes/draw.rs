use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;
use crate::material::Material;
use crate::model::Model;
use crate::scene::Scene;
use crate::texture::{self, Texture};

use super::common::PassResources;
use super::uniforms::ObjectUniforms;

/// One mesh with its per-object uniforms and material bindings.
struct DrawItem {
    model: usize,
    mesh: usize,
    object: ObjectUniforms,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    emissive: bool,
}

/// Scene content resident on the GPU, plus the point light marker.
///
/// Emissive draws are kept apart from surface draws: shadow, geometry and
/// lit passes draw [`draw_surfaces`](Self::draw_surfaces), while the
/// emissive tag and bloom extraction draw [`draw_emissive`](Self::draw_emissive).
pub struct GpuScene {
    models: Vec<Model>,
    draws: Vec<DrawItem>,
    marker: usize,
}

impl GpuScene {
    pub fn upload(gpu: &GpuContext, resources: &PassResources, scene: &Scene) -> Self {
        let mut models: Vec<Model> = scene
            .models
            .iter()
            .map(|m| Model::upload(gpu, &m.data, m.transform.matrix()))
            .collect();
        models.push(Model::upload(
            gpu,
            &scene.marker_model(),
            scene.marker_transform(),
        ));
        let marker = models.len() - 1;

        let white = Texture::flat(gpu, texture::WHITE, "Fallback Diffuse");
        let flat_normal = Texture::flat(gpu, texture::FLAT_NORMAL, "Fallback Normal");

        let mut draws = Vec::new();
        for (model_index, model) in models.iter().enumerate() {
            for (mesh_index, mesh) in model.meshes.iter().enumerate() {
                let (material, diffuse, normal) = match model.material(mesh.material) {
                    Some(m) => (m.material.clone(), m.diffuse.as_ref(), m.normal.as_ref()),
                    None => (Material::default(), None, None),
                };
                let object = ObjectUniforms::new(
                    model.transform,
                    &material,
                    diffuse.is_some(),
                    normal.is_some(),
                );
                let label = format!("{} draw {mesh_index}", model.name);
                let buffer = gpu
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&label),
                        contents: bytemuck::bytes_of(&object),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
                let diffuse = diffuse.unwrap_or(&white);
                let normal = normal.unwrap_or(&flat_normal);
                let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&label),
                    layout: &resources.object_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&diffuse.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(&normal.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: wgpu::BindingResource::Sampler(&normal.sampler),
                        },
                    ],
                });
                draws.push(DrawItem {
                    model: model_index,
                    mesh: mesh_index,
                    object,
                    buffer,
                    bind_group,
                    emissive: material.is_emissive(),
                });
            }
        }

        log::info!(
            "scene uploaded: {} models, {} draws",
            models.len(),
            draws.len()
        );
        Self {
            models,
            draws,
            marker,
        }
    }

    /// Moves the point light marker.
    pub fn set_marker_transform(&mut self, gpu: &GpuContext, transform: Mat4) {
        let marker = self.marker;
        self.models[marker].transform = transform;
        for draw in self.draws.iter_mut().filter(|d| d.model == marker) {
            draw.object.set_model(transform);
            gpu.queue
                .write_buffer(&draw.buffer, 0, bytemuck::bytes_of(&draw.object));
        }
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn emissive_count(&self) -> usize {
        self.draws.iter().filter(|d| d.emissive).count()
    }

    /// Draws every non-emissive mesh with its object bindings at `group`.
    pub fn draw_surfaces(&self, pass: &mut wgpu::RenderPass<'_>, group: u32) {
        self.draw_where(pass, group, false);
    }

    pub fn draw_emissive(&self, pass: &mut wgpu::RenderPass<'_>, group: u32) {
        self.draw_where(pass, group, true);
    }

    fn draw_where(&self, pass: &mut wgpu::RenderPass<'_>, group: u32, emissive: bool) {
        for draw in self.draws.iter().filter(|d| d.emissive == emissive) {
            pass.set_bind_group(group, &draw.bind_group, &[]);
            self.models[draw.model].meshes[draw.mesh].draw(pass);
        }
    }
}
