use std::path::Path;

use glam::{Mat4, Vec3};

use crate::light::{DirectionalLight, PointLight};
use crate::material::Material;
use crate::mesh::{MeshData, Transform};
use crate::model::{self, ModelData};

/// A model placed in the world.
#[derive(Clone, Debug)]
pub struct SceneModel {
    pub data: ModelData,
    pub transform: Transform,
}

/// The fixed content a renderer draws: models and exactly two lights.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub models: Vec<SceneModel>,
    pub directional: DirectionalLight,
    pub point: PointLight,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, data: ModelData, transform: Transform) -> Self {
        self.models.push(SceneModel { data, transform });
        self
    }

    pub fn with_directional(mut self, light: DirectionalLight) -> Self {
        self.directional = light;
        self
    }

    pub fn with_point(mut self, light: PointLight) -> Self {
        self.point = light;
        self
    }

    /// The grey room and the figurine from `assets/indoor`.
    pub fn indoor(root: impl AsRef<Path>) -> Self {
        let dir = root.as_ref().join("indoor");
        Self::new()
            .with_model(
                model::load_or_empty(dir.join("Grey_White_Room.obj")),
                Transform::new(),
            )
            .with_model(
                model::load_or_empty(dir.join("trice.obj")),
                Transform::new()
                    .position(Vec3::new(2.05, 0.628725, -1.9))
                    .uniform_scale(0.001),
            )
    }

    /// Imports each path at the origin.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        paths.iter().fold(Self::new(), |scene, path| {
            scene.with_model(model::load_or_empty(path), Transform::new())
        })
    }

    /// A floor with a few primitives, needing no assets.
    pub fn primitives() -> Self {
        let floor =
            Material::flat(Vec3::new(0.55, 0.55, 0.6)).with_specular(Vec3::splat(0.2), 16.0);
        let wall = Material::flat(Vec3::new(0.7, 0.68, 0.62));
        let red = Material::flat(Vec3::new(0.75, 0.2, 0.15)).with_specular(Vec3::splat(0.6), 64.0);
        let blue = Material::flat(Vec3::new(0.2, 0.35, 0.8)).with_specular(Vec3::splat(0.8), 128.0);

        let mut back_wall = MeshData::plane(8.0);
        for v in &mut back_wall.vertices {
            // Stand the plane up along -Z, facing +Z.
            let [x, _, z] = v.position;
            v.position = [x, z + 4.0, -4.0];
            v.normal = [0.0, 0.0, 1.0];
        }
        back_wall.compute_tangents();

        Self::new()
            .with_model(
                ModelData::single("floor", MeshData::plane(8.0), floor),
                Transform::new(),
            )
            .with_model(ModelData::single("back wall", back_wall, wall), Transform::new())
            .with_model(
                ModelData::single("cube", MeshData::cube(), red),
                Transform::from_position(Vec3::new(0.0, 0.5, -1.5)),
            )
            .with_model(
                ModelData::single("sphere", MeshData::sphere(32, 16), blue),
                Transform::from_position(Vec3::new(1.4, 0.4, -0.6)).uniform_scale(0.8),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.models.iter().all(|m| m.data.is_empty())
    }

    /// Emissive sphere drawn at the point light.
    pub fn marker_model(&self) -> ModelData {
        ModelData::single(
            "point light marker",
            MeshData::sphere(16, 8),
            Material::emissive(self.point.emissive),
        )
    }

    pub fn marker_transform(&self) -> Mat4 {
        self.point.marker_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_not_empty() {
        let scene = Scene::primitives();
        assert_eq!(scene.models.len(), 4);
        assert!(!scene.is_empty());
    }

    #[test]
    fn missing_assets_give_empty_models() {
        let scene = Scene::indoor("/nonexistent/assets");
        assert_eq!(scene.models.len(), 2);
        assert!(scene.is_empty());
    }

    #[test]
    fn marker_follows_point_light() {
        let mut scene = Scene::primitives();
        scene.point.position = Vec3::new(1.0, 2.0, 3.0);
        let center = scene.marker_transform().transform_point3(Vec3::ZERO);
        assert_eq!(center, Vec3::new(1.0, 2.0, 3.0));
        assert!(scene.marker_model().materials[&0].is_emissive());
    }
}
