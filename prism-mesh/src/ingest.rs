use crate::scene::{SceneSource, SubmeshSource};
use mesh_structs::glam::{Vec2, Vec3};
use mesh_structs::{BoundingBox, Mesh, MeshEntry, Vertex};

/// Builds a `Mesh` from an imported scene.
///
/// Positions get their Y axis negated, every vertex of a submesh takes the
/// submesh's diffuse color, and only three-index faces are kept. Bounds are
/// taken from the raw positions.
pub fn ingest<S: SceneSource>(scene: &S) -> Mesh {
  let mut entries = Vec::with_capacity(scene.submesh_count());
  let mut vertex_base = 0u32;
  for submesh_idx in 0..scene.submesh_count() {
    let submesh = scene.submesh(submesh_idx);
    entries.push(MeshEntry {
      vertices: Vec::with_capacity(submesh.vertex_count()),
      indices: Vec::with_capacity(submesh.face_count() * 3),
      material_index: submesh.material_index(),
      vertex_base,
    });
    vertex_base += submesh.vertex_count() as u32;
  }

  let mut bounds = BoundingBox::default();
  for (submesh_idx, entry) in entries.iter_mut().enumerate() {
    ingest_submesh(scene, scene.submesh(submesh_idx), entry, &mut bounds);
  }

  log::debug!(
    "ingested {} submeshes, {} vertices, {} indices",
    entries.len(),
    vertex_base,
    entries.iter().map(MeshEntry::index_count).sum::<usize>()
  );
  Mesh { entries, bounds }
}

fn ingest_submesh<S: SceneSource>(
  scene: &S,
  submesh: &S::Submesh,
  entry: &mut MeshEntry,
  bounds: &mut BoundingBox,
) {
  let color = scene.diffuse_color(entry.material_index).unwrap_or_else(|| {
    log::warn!("material {} not found, submesh colored black", entry.material_index);
    Vec3::ZERO
  });

  for vertex_idx in 0..submesh.vertex_count() {
    let position = submesh.position(vertex_idx);
    let (tangent, bitangent) =
      submesh.tangent_frame(vertex_idx).unwrap_or((Vec3::ZERO, Vec3::ZERO));
    entry.vertices.push(Vertex {
      position: Vec3::new(position.x, -position.y, position.z),
      uv: submesh.tex_coord(vertex_idx).unwrap_or(Vec2::ZERO),
      normal: submesh.normal(vertex_idx),
      color,
      tangent,
      bitangent,
    });
    bounds.expand(position);
  }
  bounds.update_size();

  let vertex_count = submesh.vertex_count();
  let mut dropped_faces = 0;
  for face_idx in 0..submesh.face_count() {
    match submesh.face(face_idx) {
      &[a, b, c] if [a, b, c].iter().all(|x| (*x as usize) < vertex_count) => {
        entry.indices.extend_from_slice(&[a, b, c])
      }
      _ => dropped_faces += 1,
    }
  }
  if dropped_faces > 0 {
    log::debug!(
      "dropped {dropped_faces} non-triangle or out of range faces from material {}",
      entry.material_index
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scene::{ImportedMaterial, ImportedScene, ImportedSubmesh};

  fn triangle_submesh(material_index: u32, positions: Vec<Vec3>) -> ImportedSubmesh {
    let faces =
      (0..positions.len() as u32 / 3).map(|x| vec![x * 3, x * 3 + 1, x * 3 + 2]).collect();
    ImportedSubmesh {
      normals: vec![Vec3::Y; positions.len()],
      positions,
      faces,
      material_index,
      ..Default::default()
    }
  }

  fn scene(submeshes: Vec<ImportedSubmesh>) -> ImportedScene {
    ImportedScene {
      submeshes,
      materials: vec![
        ImportedMaterial { diffuse: Vec3::new(1.0, 0.0, 0.0) },
        ImportedMaterial { diffuse: Vec3::new(0.0, 0.5, 1.0) },
      ],
    }
  }

  #[test]
  fn vertex_base_is_running_vertex_total() {
    let scene = scene(vec![
      triangle_submesh(0, vec![Vec3::ZERO; 3]),
      triangle_submesh(1, vec![Vec3::ZERO; 6]),
      triangle_submesh(0, vec![Vec3::ZERO; 3]),
    ]);
    let mesh = ingest(&scene);
    let bases = mesh.entries.iter().map(|x| x.vertex_base).collect::<Vec<_>>();
    assert_eq!(bases, vec![0, 3, 9]);
    assert_eq!(mesh.vertex_count(), 12);
    // merged index = local index + vertex base
    let merged = mesh.merged_indices();
    assert_eq!(&merged[3..9], &[3, 4, 5, 6, 7, 8]);
    assert_eq!(&merged[9..], &[9, 10, 11]);
  }

  #[test]
  fn positions_flip_y_and_normals_do_not() {
    let mut submesh = triangle_submesh(0, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::X, Vec3::Z]);
    submesh.normals = vec![Vec3::new(0.0, 1.0, 0.0); 3];
    let mesh = ingest(&scene(vec![submesh]));
    let vertex = mesh.entries[0].vertices[0];
    assert_eq!(vertex.position, Vec3::new(1.0, -2.0, 3.0));
    assert_eq!(vertex.normal, Vec3::new(0.0, 1.0, 0.0));
  }

  #[test]
  fn bounds_use_raw_positions() {
    let positions = vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 5.0, 0.0)];
    let mut submesh = triangle_submesh(0, positions);
    submesh.faces.clear();
    let mesh = ingest(&scene(vec![submesh]));
    assert_eq!(mesh.bounds.min, Vec3::new(-1.0, 2.0, 0.0));
    assert_eq!(mesh.bounds.max, Vec3::new(1.0, 5.0, 3.0));
    assert_eq!(mesh.bounds.size, Vec3::new(2.0, 3.0, 3.0));
  }

  #[test]
  fn bounds_span_all_submeshes() {
    let mesh = ingest(&scene(vec![
      triangle_submesh(0, vec![Vec3::ZERO, Vec3::ONE, Vec3::X]),
      triangle_submesh(1, vec![Vec3::splat(-2.0), Vec3::Y, Vec3::Z]),
    ]));
    assert_eq!(mesh.bounds.min, Vec3::splat(-2.0));
    assert_eq!(mesh.bounds.max, Vec3::ONE);
    assert_eq!(mesh.bounds.size, Vec3::splat(3.0));
  }

  #[test]
  fn only_triangles_are_kept() {
    let submesh = ImportedSubmesh {
      positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE, Vec3::Z],
      faces: vec![vec![0, 1, 2], vec![1, 3, 2, 4], vec![4], vec![3, 4]],
      ..Default::default()
    };
    let mesh = ingest(&scene(vec![submesh]));
    assert_eq!(mesh.entries[0].indices, vec![0, 1, 2]);
  }

  #[test]
  fn faces_with_out_of_range_indices_are_dropped() {
    let mut second = triangle_submesh(1, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    second.faces = vec![vec![0, 1, 2], vec![0, 1, u32::MAX], vec![2, 3, 1]];
    let mesh = ingest(&scene(vec![triangle_submesh(0, vec![Vec3::ZERO; 3]), second]));

    assert_eq!(mesh.entries[1].indices, vec![0, 1, 2]);
    assert_eq!(mesh.entries[1].vertex_base, 3);
    assert_eq!(mesh.merged_indices(), vec![0, 1, 2, 3, 4, 5]);
  }

  #[test]
  fn missing_attributes_default_to_zero() {
    let mesh = ingest(&scene(vec![triangle_submesh(0, vec![Vec3::ONE; 3])]));
    let vertex = mesh.entries[0].vertices[2];
    assert_eq!(vertex.uv, Vec2::ZERO);
    assert_eq!(vertex.tangent, Vec3::ZERO);
    assert_eq!(vertex.bitangent, Vec3::ZERO);
  }

  #[test]
  fn present_attributes_are_copied() {
    let mut submesh = triangle_submesh(1, vec![Vec3::ONE; 3]);
    submesh.tex_coords = Some(vec![Vec2::new(0.25, 0.75); 3]);
    submesh.tangents = Some(vec![(Vec3::X, Vec3::Z); 3]);
    let mesh = ingest(&scene(vec![submesh]));
    let vertex = mesh.entries[0].vertices[1];
    assert_eq!(vertex.uv, Vec2::new(0.25, 0.75));
    assert_eq!(vertex.tangent, Vec3::X);
    assert_eq!(vertex.bitangent, Vec3::Z);
  }

  #[test]
  fn submesh_color_comes_from_its_material() {
    let mesh = ingest(&scene(vec![
      triangle_submesh(1, vec![Vec3::ZERO; 3]),
      triangle_submesh(7, vec![Vec3::ZERO; 3]),
    ]));
    assert!(mesh.entries[0].vertices.iter().all(|x| x.color == Vec3::new(0.0, 0.5, 1.0)));
    assert_eq!(mesh.entries[0].material_index, 1);
    // unknown material
    assert!(mesh.entries[1].vertices.iter().all(|x| x.color == Vec3::ZERO));
  }

  #[test]
  fn empty_scene_gives_empty_mesh() {
    let mesh = ingest(&ImportedScene::default());
    assert!(mesh.is_empty());
    assert!(mesh.bounds.is_empty());
  }
}
