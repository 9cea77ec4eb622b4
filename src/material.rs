use std::path::PathBuf;

use glam::Vec3;

/// Phong material terms and optional texture maps.
///
/// Texture paths are resolved by the importer; loading happens when the owning
/// model is uploaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub diffuse_map: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
    /// Flat emitted color. Emissive surfaces skip lighting and are tagged for bloom.
    pub emissive: Option<Vec3>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: Vec3::splat(1.0),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(0.5),
            shininess: 32.0,
            diffuse_map: None,
            normal_map: None,
            emissive: None,
        }
    }
}

impl Material {
    /// An untextured material with the same ambient and diffuse color.
    pub fn flat(color: Vec3) -> Self {
        Self {
            name: "flat".to_string(),
            ambient: color,
            diffuse: color,
            ..Default::default()
        }
    }

    pub fn emissive(color: Vec3) -> Self {
        Self {
            name: "emissive".to_string(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            emissive: Some(color),
            ..Default::default()
        }
    }

    pub fn with_specular(mut self, specular: Vec3, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive.is_some()
    }
}
