use crate::{Mesh, VertexComponent, VertexLayout};
use ash::vk;
use std::mem::size_of;

/// Flat vertex and index streams ready for upload. `scale` is the factor
/// already baked into the positions.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedBuffers {
  pub vertices: Vec<f32>,
  pub indices: Vec<u32>,
  pub stride: u32,
  pub scale: f32,
}

impl PackedBuffers {
  pub fn vertex_buffer_size(&self) -> vk::DeviceSize {
    (self.vertices.len() * size_of::<f32>()) as vk::DeviceSize
  }

  pub fn index_buffer_size(&self) -> vk::DeviceSize {
    (self.indices.len() * size_of::<u32>()) as vk::DeviceSize
  }

  pub fn index_count(&self) -> u32 {
    self.indices.len() as u32
  }

  pub fn vertex_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.vertices)
  }

  pub fn index_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.indices)
  }
}

/// Interleaves every vertex of every entry following `layout`.
///
/// Positions are multiplied by `scale`; normals get their Y component negated.
/// Everything else is copied as is and the dummy components are zero filled.
pub fn pack_vertices(layout: &VertexLayout, mesh: &Mesh, scale: f32) -> Vec<f32> {
  let mut out = Vec::with_capacity(mesh.vertex_count() * layout.floats_per_vertex());
  for vertex in mesh.entries.iter().flat_map(|x| x.vertices.iter()) {
    for component in layout.components() {
      match component {
        VertexComponent::Position => out.extend_from_slice(&(vertex.position * scale).to_array()),
        VertexComponent::Normal => {
          out.extend_from_slice(&[vertex.normal.x, -vertex.normal.y, vertex.normal.z])
        }
        VertexComponent::Uv => out.extend_from_slice(&vertex.uv.to_array()),
        VertexComponent::Color => out.extend_from_slice(&vertex.color.to_array()),
        VertexComponent::Tangent => out.extend_from_slice(&vertex.tangent.to_array()),
        VertexComponent::Bitangent => out.extend_from_slice(&vertex.bitangent.to_array()),
        VertexComponent::DummyFloat => out.push(0.0),
        VertexComponent::DummyVec4 => out.extend_from_slice(&[0.0; 4]),
      }
    }
  }
  out
}

pub fn pack(layout: &VertexLayout, mesh: &Mesh, scale: f32) -> PackedBuffers {
  PackedBuffers {
    vertices: pack_vertices(layout, mesh, scale),
    indices: mesh.merged_indices(),
    stride: layout.stride(),
    scale,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{BoundingBox, MeshEntry, Vertex};
  use glam::{Vec2, Vec3};

  fn vertex(seed: f32) -> Vertex {
    Vertex {
      position: Vec3::new(seed, seed + 1.0, seed + 2.0),
      uv: Vec2::new(seed * 0.1, seed * 0.2),
      normal: Vec3::new(0.0, 1.0, 0.0),
      color: Vec3::new(0.5, 0.25, 0.125),
      tangent: Vec3::new(1.0, 0.0, 0.0),
      bitangent: Vec3::new(0.0, 0.0, 1.0),
    }
  }

  fn two_entry_mesh() -> Mesh {
    Mesh {
      entries: vec![
        MeshEntry {
          vertices: vec![vertex(1.0), vertex(2.0), vertex(3.0)],
          indices: vec![0, 1, 2],
          material_index: 0,
          vertex_base: 0,
        },
        MeshEntry {
          vertices: vec![vertex(4.0), vertex(5.0), vertex(6.0), vertex(7.0)],
          indices: vec![0, 1, 2, 0, 2, 3],
          material_index: 1,
          vertex_base: 3,
        },
      ],
      bounds: BoundingBox::default(),
    }
  }

  #[test]
  fn applies_per_component_transforms() {
    let mesh = Mesh {
      entries: vec![MeshEntry {
        vertices: vec![vertex(1.0)],
        indices: vec![],
        material_index: 0,
        vertex_base: 0,
      }],
      bounds: BoundingBox::default(),
    };
    let layout: VertexLayout =
      "position,normal,uv,color,tangent,bitangent,dummy-float,dummy-vec4".parse().unwrap();
    let packed = pack_vertices(&layout, &mesh, 2.0);
    assert_eq!(
      packed,
      vec![
        2.0, 4.0, 6.0, // position * scale
        0.0, -1.0, 0.0, // normal with Y negated
        0.1, 0.2, // uv
        0.5, 0.25, 0.125, // color
        1.0, 0.0, 0.0, // tangent
        0.0, 0.0, 1.0, // bitangent
        0.0, // dummy float
        0.0, 0.0, 0.0, 0.0, // dummy vec4
      ]
    );
  }

  #[test]
  fn layout_order_drives_interleaving() {
    let mesh = two_entry_mesh();
    let layout: VertexLayout = "uv,position".parse().unwrap();
    let packed = pack_vertices(&layout, &mesh, 1.0);
    assert_eq!(&packed[..5], &[0.1, 0.2, 1.0, 2.0, 3.0]);
    // second vertex starts right after the first stride
    assert_eq!(&packed[5..10], &[0.2, 0.4, 2.0, 3.0, 4.0]);
  }

  #[test]
  fn stream_length_matches_vertex_count_and_stride() {
    let mesh = two_entry_mesh();
    for layout in ["position", "position,uv", "position,normal,uv,color,dummy-vec4"] {
      let layout: VertexLayout = layout.parse().unwrap();
      let packed = pack(&layout, &mesh, 1.0);
      assert_eq!(packed.vertices.len(), 7 * layout.stride() as usize / 4);
      assert_eq!(packed.vertex_buffer_size(), packed.vertices.len() as u64 * 4);
      assert_eq!(packed.vertex_bytes().len() as u64, packed.vertex_buffer_size());
    }
  }

  #[test]
  fn indices_are_merged_into_global_space() {
    let mesh = two_entry_mesh();
    let packed = pack(&"position".parse().unwrap(), &mesh, 1.0);
    assert_eq!(packed.indices, vec![0, 1, 2, 3, 4, 5, 3, 5, 6]);
    assert_eq!(packed.index_count(), 9);
    assert_eq!(packed.index_buffer_size(), 36);
    assert_eq!(packed.index_bytes().len(), 36);
  }

  #[test]
  fn empty_mesh_packs_to_empty_streams() {
    let packed = pack(&"position,normal".parse().unwrap(), &Mesh::default(), 3.0);
    assert!(packed.vertices.is_empty());
    assert!(packed.indices.is_empty());
    assert_eq!(packed.stride, 24);
    assert_eq!(packed.scale, 3.0);
  }
}
