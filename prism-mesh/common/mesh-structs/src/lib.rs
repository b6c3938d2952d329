mod layout;
mod packer;

pub use ash::vk;
pub use glam;
pub use layout::{LayoutError, VertexComponent, VertexLayout};
pub use packer::{pack, pack_vertices, PackedBuffers};

use glam::{Vec2, Vec3};

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
  pub position: Vec3,
  pub uv: Vec2,
  pub normal: Vec3,
  pub color: Vec3,
  pub tangent: Vec3,
  pub bitangent: Vec3,
}

/// One independently indexed submesh. Indices are local to the entry;
/// `vertex_base` is the number of vertices in all entries before this one.
#[derive(Default, Clone, Debug)]
pub struct MeshEntry {
  pub vertices: Vec<Vertex>,
  pub indices: Vec<u32>,
  pub material_index: u32,
  pub vertex_base: u32,
}

impl MeshEntry {
  pub fn index_count(&self) -> usize {
    self.indices.len()
  }
}

/// Axis aligned extent of ingested geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
  pub min: Vec3,
  pub max: Vec3,
  pub size: Vec3,
}

impl Default for BoundingBox {
  fn default() -> Self {
    Self { min: Vec3::splat(f32::MAX), max: Vec3::splat(-f32::MAX), size: Vec3::ZERO }
  }
}

impl BoundingBox {
  pub fn expand(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  pub fn update_size(&mut self) {
    self.size = self.max - self.min;
  }

  /// True until at least one point has been added.
  pub fn is_empty(&self) -> bool {
    self.min.x > self.max.x
  }

  pub fn scaled(&self, scale: f32) -> Self {
    Self { min: self.min * scale, max: self.max * scale, size: self.size * scale }
  }
}

#[derive(Default, Clone, Debug)]
pub struct Mesh {
  pub entries: Vec<MeshEntry>,
  pub bounds: BoundingBox,
}

impl Mesh {
  pub fn vertex_count(&self) -> usize {
    self.entries.iter().map(|x| x.vertices.len()).sum()
  }

  pub fn index_count(&self) -> usize {
    self.entries.iter().map(MeshEntry::index_count).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// All entries' indices moved into one global index space.
  pub fn merged_indices(&self) -> Vec<u32> {
    self
      .entries
      .iter()
      .flat_map(|entry| entry.indices.iter().map(move |&idx| idx + entry.vertex_base))
      .collect::<Vec<u32>>()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(vertex_count: usize, indices: Vec<u32>, vertex_base: u32) -> MeshEntry {
    MeshEntry {
      vertices: vec![Vertex::default(); vertex_count],
      indices,
      material_index: 0,
      vertex_base,
    }
  }

  #[test]
  fn merged_indices_are_offset_by_vertex_base() {
    let mesh = Mesh {
      entries: vec![
        entry(3, vec![0, 1, 2], 0),
        entry(4, vec![0, 1, 2, 2, 3, 0], 3),
        entry(3, vec![2, 1, 0], 7),
      ],
      bounds: BoundingBox::default(),
    };
    assert_eq!(mesh.vertex_count(), 10);
    assert_eq!(mesh.index_count(), 12);
    assert_eq!(mesh.merged_indices(), vec![0, 1, 2, 3, 4, 5, 5, 6, 3, 9, 8, 7]);
  }

  #[test]
  fn bounding_box_accumulates_and_scales() {
    let mut bounds = BoundingBox::default();
    assert!(bounds.is_empty());
    bounds.expand(Vec3::new(1.0, 2.0, 3.0));
    bounds.expand(Vec3::new(-1.0, 5.0, 0.0));
    bounds.update_size();
    assert!(!bounds.is_empty());
    assert_eq!(bounds.min, Vec3::new(-1.0, 2.0, 0.0));
    assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 3.0));
    assert_eq!(bounds.size, Vec3::new(2.0, 3.0, 3.0));

    let scaled = bounds.scaled(2.0);
    assert_eq!(scaled.min, Vec3::new(-2.0, 4.0, 0.0));
    assert_eq!(scaled.max, Vec3::new(2.0, 10.0, 6.0));
    assert_eq!(scaled.size, Vec3::new(4.0, 6.0, 6.0));
  }
}
