//! Model import and upload.
//!
//! [`import_model`] reads OBJ files through `tobj` and STL files through
//! `stl_io` into a [`ModelData`]: triangulated meshes with generated normals
//! (where the file has none) and tangents, plus the material table. UVs are
//! flipped vertically so image row 0 maps to the top of the texture.
//!
//! [`Model::upload`] moves a [`ModelData`] to the GPU and loads the material
//! textures. A texture that fails to load is logged and left out; the draw
//! falls back to a flat texture.
//!
//! # Example
//!
//! ```no_run
//! use lumen::{load_or_empty, Transform};
//!
//! let room = load_or_empty("assets/indoor/Grey_White_Room.obj");
//! println!("{} meshes", room.meshes.len());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};

use crate::error::AssetError;
use crate::gpu::GpuContext;
use crate::material::Material;
use crate::mesh::{Mesh, MeshData, Vertex3d};
use crate::texture::{Texture, TextureWrap};

/// CPU-side model: meshes plus their material table.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub materials: BTreeMap<usize, Material>,
}

impl ModelData {
    /// One mesh with one material.
    pub fn single(name: impl Into<String>, mesh: MeshData, material: Material) -> Self {
        let mut materials = BTreeMap::new();
        materials.insert(0, material);
        Self {
            name: name.into(),
            meshes: vec![mesh.with_material(0)],
            materials,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.iter().all(MeshData::is_empty)
    }

    /// Material for a mesh, or the default when the key is missing.
    pub fn material_for(&self, mesh: &MeshData) -> Material {
        self.materials.get(&mesh.material).cloned().unwrap_or_default()
    }
}

/// Imports a model, choosing the importer by file extension.
pub fn import_model(path: impl AsRef<Path>) -> Result<ModelData, AssetError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "obj" => import_obj(path),
        "stl" => import_stl(path),
        _ => Err(AssetError::UnknownFormat(ext)),
    }
}

/// Imports a model, logging the importer's diagnostic and returning an empty
/// model on failure.
pub fn load_or_empty(path: impl AsRef<Path>) -> ModelData {
    let path = path.as_ref();
    match import_model(path) {
        Ok(model) => {
            log::info!(
                "imported {} ({} meshes, {} materials)",
                path.display(),
                model.meshes.len(),
                model.materials.len()
            );
            model
        }
        Err(e) => {
            log::warn!("model import failed: {e}");
            ModelData {
                name: path.display().to_string(),
                ..Default::default()
            }
        }
    }
}

fn import_obj(path: &Path) -> Result<ModelData, AssetError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, materials) = tobj::load_obj(path, &options).map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut table = BTreeMap::new();
    match materials {
        Ok(materials) => {
            for (i, m) in materials.into_iter().enumerate() {
                table.insert(i, convert_material(m, base_dir));
            }
        }
        Err(e) => log::warn!("{}: material library not loaded: {e}", path.display()),
    }
    let fallback = table.len();

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        let material = match mesh.material_id {
            Some(id) if table.contains_key(&id) => id,
            _ => {
                table.entry(fallback).or_default();
                fallback
            }
        };
        meshes.push(convert_mesh(&mesh).with_material(material));
    }

    Ok(ModelData {
        name: path.display().to_string(),
        meshes,
        materials: table,
    })
}

fn convert_mesh(mesh: &tobj::Mesh) -> MeshData {
    let count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_uvs = mesh.texcoords.len() / 2 == count;

    let vertices = (0..count)
        .map(|i| {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let normal = if has_normals {
                [
                    mesh.normals[3 * i],
                    mesh.normals[3 * i + 1],
                    mesh.normals[3 * i + 2],
                ]
            } else {
                [0.0; 3]
            };
            let uv = if has_uvs {
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0; 2]
            };
            Vertex3d::new(position, normal, uv)
        })
        .collect();

    let mut data = MeshData::new(vertices, mesh.indices.clone());
    if !has_normals {
        data.recalculate_normals();
    }
    data.compute_tangents();
    data
}

fn convert_material(m: tobj::Material, base_dir: &Path) -> Material {
    let defaults = Material::default();
    let resolve = |name: Option<String>| -> Option<PathBuf> {
        name.filter(|n| !n.is_empty())
            .map(|n| base_dir.join(n.replace('\\', "/")))
    };
    Material {
        name: m.name,
        ambient: m.ambient.map(Vec3::from).unwrap_or(defaults.ambient),
        diffuse: m.diffuse.map(Vec3::from).unwrap_or(defaults.diffuse),
        specular: m.specular.map(Vec3::from).unwrap_or(defaults.specular),
        shininess: m.shininess.unwrap_or(defaults.shininess).max(1.0),
        diffuse_map: resolve(m.diffuse_texture),
        normal_map: resolve(m.normal_texture),
        emissive: None,
    }
}

fn import_stl(path: &Path) -> Result<ModelData, AssetError> {
    let file = std::fs::File::open(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mesh = parse_stl(&mut reader).map_err(|message| AssetError::Stl {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(ModelData::single(
        path.display().to_string(),
        mesh,
        Material::default(),
    ))
}

/// Unwelds an STL so every face keeps its own flat normal.
pub fn parse_stl<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<MeshData, String> {
    let stl = stl_io::read_stl(reader).map_err(|e| e.to_string())?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    for face in &stl.faces {
        let normal: [f32; 3] = face.normal.into();
        for &index in &face.vertices {
            let position: [f32; 3] = stl.vertices[index].into();
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }
    }
    let indices = (0..vertices.len() as u32).collect();

    let mut mesh = MeshData::new(vertices, indices);
    if mesh
        .vertices
        .iter()
        .any(|v| Vec3::from(v.normal).length_squared() < 1e-6)
    {
        mesh.recalculate_normals();
    }
    mesh.compute_tangents();
    Ok(mesh)
}

/// A material with its textures resident on the GPU.
#[derive(Debug)]
pub struct GpuMaterial {
    pub material: Material,
    pub diffuse: Option<Texture>,
    pub normal: Option<Texture>,
}

/// Uploaded meshes, materials and textures with a world transform.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: BTreeMap<usize, GpuMaterial>,
    pub transform: Mat4,
}

impl Model {
    pub fn upload(gpu: &GpuContext, data: &ModelData, transform: Mat4) -> Self {
        let meshes = data
            .meshes
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(i, m)| m.upload(gpu, &format!("{} mesh {i}", data.name)))
            .collect();

        let mut materials = BTreeMap::new();
        for mesh in &data.meshes {
            if materials.contains_key(&mesh.material) {
                continue;
            }
            let material = data.material_for(mesh);
            let diffuse = load_map(gpu, material.diffuse_map.as_deref());
            let normal = load_map(gpu, material.normal_map.as_deref());
            materials.insert(
                mesh.material,
                GpuMaterial {
                    material,
                    diffuse,
                    normal,
                },
            );
        }

        Self {
            name: data.name.clone(),
            meshes,
            materials,
            transform,
        }
    }

    pub fn material(&self, key: usize) -> Option<&GpuMaterial> {
        self.materials.get(&key)
    }
}

fn load_map(gpu: &GpuContext, path: Option<&Path>) -> Option<Texture> {
    let path = path?;
    match Texture::from_file(gpu, path, TextureWrap::MirroredRepeat) {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("texture failed to load: {} ({e})", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumen-model-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents)
            .unwrap();
        path
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = import_model("scene.fbx").unwrap_err();
        assert!(matches!(err, AssetError::UnknownFormat(ext) if ext == "fbx"));
    }

    #[test]
    fn missing_file_yields_empty_model() {
        let model = load_or_empty("no/such/model.obj");
        assert!(model.is_empty());
        assert!(model.meshes.is_empty());
    }

    #[test]
    fn obj_quad_is_triangulated_with_normals_and_flipped_uvs() {
        let obj = b"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
                    vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
                    f 1/1 2/2 3/3 4/4\n";
        let path = write_temp("quad.obj", obj);
        let model = import_model(&path).unwrap();

        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.triangle_count(), 2);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Z).length() < 1e-5);
        }
        let origin = mesh
            .vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(origin.uv, [0.0, 1.0]);

        // No material library: the mesh falls back to a default entry.
        assert_eq!(model.material_for(mesh), Material::default());
    }

    #[test]
    fn obj_materials_resolve_relative_textures() {
        let mtl = concat!(
            "newmtl wall\n",
            "Ka 0.1 0.2 0.3\nKd 0.4 0.5 0.6\nKs 0.7 0.8 0.9\nNs 64\n",
            "map_Kd tex/wall.png\n",
        )
        .as_bytes();
        write_temp("room.mtl", mtl);
        let obj = b"mtllib room.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl wall\nf 1 2 3\n";
        let path = write_temp("room.obj", obj);

        let model = import_model(&path).unwrap();
        let material = model.material_for(&model.meshes[0]);
        assert_eq!(material.name, "wall");
        assert_eq!(material.ambient, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(material.shininess, 64.0);
        let map = material.diffuse_map.unwrap();
        assert!(map.ends_with("tex/wall.png"));
        assert_eq!(map.parent().unwrap().parent(), path.parent());
    }

    #[test]
    fn ascii_stl_parses_flat_faces() {
        let stl = concat!(
            "solid t\nfacet normal 0 0 1\nouter loop\n",
            "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n",
            "endloop\nendfacet\nendsolid t\n",
        )
        .as_bytes();
        let mut cursor = std::io::Cursor::new(&stl[..]);
        let mesh = parse_stl(&mut cursor).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }
}
