use mesh_structs::glam::{Vec2, Vec3};
use std::path::Path;

/// Read access to one submesh of an imported scene.
pub trait SubmeshSource {
  fn vertex_count(&self) -> usize;

  fn position(&self, index: usize) -> Vec3;

  fn normal(&self, index: usize) -> Vec3;

  /// First UV channel, `None` when the submesh has no texture coordinates.
  fn tex_coord(&self, index: usize) -> Option<Vec2>;

  /// Tangent and bitangent, `None` when the submesh has no tangent space.
  fn tangent_frame(&self, index: usize) -> Option<(Vec3, Vec3)>;

  fn face_count(&self) -> usize;

  fn face(&self, index: usize) -> &[u32];

  fn material_index(&self) -> u32;
}

/// Read access to an imported scene: its submeshes and material colors.
pub trait SceneSource {
  type Submesh: SubmeshSource;

  fn submesh_count(&self) -> usize;

  fn submesh(&self, index: usize) -> &Self::Submesh;

  fn diffuse_color(&self, material_index: u32) -> Option<Vec3>;
}

/// Post processing the importer applies while reading a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportFlags {
  pub flip_winding_order: bool,
  pub triangulate: bool,
  pub pre_transform_vertices: bool,
  pub calc_tangent_space: bool,
  pub gen_smooth_normals: bool,
}

impl Default for ImportFlags {
  fn default() -> Self {
    Self {
      flip_winding_order: true,
      triangulate: true,
      pre_transform_vertices: true,
      calc_tangent_space: true,
      gen_smooth_normals: true,
    }
  }
}

impl ImportFlags {
  pub fn none() -> Self {
    Self {
      flip_winding_order: false,
      triangulate: false,
      pre_transform_vertices: false,
      calc_tangent_space: false,
      gen_smooth_normals: false,
    }
  }
}

/// Turns a file into a scene. Errors are the importer's own diagnostic text.
pub trait SceneImporter {
  type Scene: SceneSource;

  fn import(&self, path: &Path, flags: ImportFlags) -> Result<Self::Scene, String>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedSubmesh {
  pub positions: Vec<Vec3>,
  /// Empty or one per position.
  pub normals: Vec<Vec3>,
  pub tex_coords: Option<Vec<Vec2>>,
  pub tangents: Option<Vec<(Vec3, Vec3)>>,
  pub faces: Vec<Vec<u32>>,
  pub material_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImportedMaterial {
  pub diffuse: Vec3,
}

/// Owned scene, as produced by the glTF importer or built by hand.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
  pub submeshes: Vec<ImportedSubmesh>,
  pub materials: Vec<ImportedMaterial>,
}

impl SubmeshSource for ImportedSubmesh {
  fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  fn position(&self, index: usize) -> Vec3 {
    self.positions[index]
  }

  fn normal(&self, index: usize) -> Vec3 {
    self.normals.get(index).copied().unwrap_or(Vec3::ZERO)
  }

  fn tex_coord(&self, index: usize) -> Option<Vec2> {
    self.tex_coords.as_ref().and_then(|x| x.get(index).copied())
  }

  fn tangent_frame(&self, index: usize) -> Option<(Vec3, Vec3)> {
    self.tangents.as_ref().and_then(|x| x.get(index).copied())
  }

  fn face_count(&self) -> usize {
    self.faces.len()
  }

  fn face(&self, index: usize) -> &[u32] {
    &self.faces[index]
  }

  fn material_index(&self) -> u32 {
    self.material_index
  }
}

impl SceneSource for ImportedScene {
  type Submesh = ImportedSubmesh;

  fn submesh_count(&self) -> usize {
    self.submeshes.len()
  }

  fn submesh(&self, index: usize) -> &ImportedSubmesh {
    &self.submeshes[index]
  }

  fn diffuse_color(&self, material_index: u32) -> Option<Vec3> {
    self.materials.get(material_index as usize).map(|x| x.diffuse)
  }
}
