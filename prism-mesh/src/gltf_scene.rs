use crate::scene::{ImportFlags, ImportedMaterial, ImportedScene, ImportedSubmesh, SceneImporter};
use gltf::mesh::Mode;
use mesh_structs::glam::{Mat3, Mat4, Vec2, Vec3};
use std::path::Path;

/// Reads `.gltf` and `.glb` files. Every mesh primitive becomes one submesh.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
  type Scene = ImportedScene;

  fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, String> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(|e| e.to_string())?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
      .map_err(|e| format!("at reading buffers: {e}"))?;
    Ok(scene_from_document(&document, &buffers, flags))
  }
}

fn scene_from_document(
  document: &gltf::Document,
  buffers: &[gltf::buffer::Data],
  flags: ImportFlags,
) -> ImportedScene {
  let mut materials: Vec<_> = document
    .materials()
    .map(|x| {
      let base_color = x.pbr_metallic_roughness().base_color_factor();
      ImportedMaterial { diffuse: Vec3::from_slice(&base_color[..3]) }
    })
    .collect();
  let default_material = materials.len() as u32;

  let mut submeshes = vec![];
  for (mesh, transform) in mesh_instances(document, flags.pre_transform_vertices) {
    for primitive in mesh.primitives() {
      let material_index =
        primitive.material().index().map(|x| x as u32).unwrap_or(default_material);
      match read_primitive(&primitive, buffers, transform, material_index, flags) {
        Some(submesh) => submeshes.push(submesh),
        None => log::warn!(
          "skipping primitive {} of mesh {}: no positions",
          primitive.index(),
          mesh.index()
        ),
      }
    }
  }
  if submeshes.iter().any(|x| x.material_index == default_material) {
    materials.push(ImportedMaterial { diffuse: Vec3::ONE });
  }

  ImportedScene { submeshes, materials }
}

/// Meshes paired with the world transform they are drawn with. Without
/// pre-transformation every mesh is listed once, untransformed.
fn mesh_instances(document: &gltf::Document, pre_transform: bool) -> Vec<(gltf::Mesh<'_>, Mat4)> {
  let scene = document.default_scene().or_else(|| document.scenes().next());
  match scene {
    Some(scene) if pre_transform => {
      let mut instances = vec![];
      for node in scene.nodes() {
        collect_node_meshes(node, Mat4::IDENTITY, &mut instances);
      }
      instances
    }
    _ => document.meshes().map(|x| (x, Mat4::IDENTITY)).collect(),
  }
}

fn collect_node_meshes<'a>(
  node: gltf::Node<'a>,
  parent: Mat4,
  instances: &mut Vec<(gltf::Mesh<'a>, Mat4)>,
) {
  let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
  if let Some(mesh) = node.mesh() {
    instances.push((mesh, world));
  }
  for child in node.children() {
    collect_node_meshes(child, world, instances);
  }
}

fn read_primitive(
  primitive: &gltf::Primitive,
  buffers: &[gltf::buffer::Data],
  transform: Mat4,
  material_index: u32,
  flags: ImportFlags,
) -> Option<ImportedSubmesh> {
  let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|x| x.0.as_slice()));

  let mut positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from).collect();
  let indices: Vec<u32> = match reader.read_indices() {
    Some(x) => x.into_u32().collect(),
    None => (0..positions.len() as u32).collect(),
  };
  let mut faces = assemble_faces(primitive.mode(), &indices, flags.triangulate);

  let mut normals: Vec<Vec3> = match reader.read_normals() {
    Some(x) => x.map(Vec3::from).collect(),
    None if flags.gen_smooth_normals => smooth_normals(&positions, &faces),
    None => vec![],
  };
  let tex_coords: Option<Vec<Vec2>> =
    reader.read_tex_coords(0).map(|x| x.into_f32().map(Vec2::from).collect());
  let file_tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|x| x.collect());

  if transform != Mat4::IDENTITY {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    positions.iter_mut().for_each(|x| *x = transform.transform_point3(*x));
    normals.iter_mut().for_each(|x| *x = (normal_matrix * *x).normalize_or_zero());
  }

  let tangents = if !flags.calc_tangent_space {
    None
  } else if let Some(file_tangents) = file_tangents {
    let basis = Mat3::from_mat4(transform);
    Some(
      file_tangents
        .iter()
        .enumerate()
        .map(|(i, t)| {
          let tangent = (basis * Vec3::new(t[0], t[1], t[2])).normalize_or_zero();
          let normal = normals.get(i).copied().unwrap_or(Vec3::ZERO);
          (tangent, normal.cross(tangent) * t[3])
        })
        .collect(),
    )
  } else {
    tex_coords.as_ref().map(|uvs| uv_tangents(&positions, uvs, &faces))
  };

  if flags.flip_winding_order {
    faces.iter_mut().for_each(|x| x.reverse());
  }

  Some(ImportedSubmesh { positions, normals, tex_coords, tangents, faces, material_index })
}

/// Splits a primitive's index list into faces according to its topology.
pub(crate) fn assemble_faces(mode: Mode, indices: &[u32], triangulate: bool) -> Vec<Vec<u32>> {
  match mode {
    Mode::Points => indices.iter().map(|x| vec![*x]).collect(),
    Mode::Lines => indices.chunks(2).map(<[u32]>::to_vec).collect(),
    Mode::LineStrip => indices.windows(2).map(<[u32]>::to_vec).collect(),
    Mode::LineLoop => {
      let mut faces: Vec<_> = indices.windows(2).map(<[u32]>::to_vec).collect();
      if let (Some(first), Some(last)) = (indices.first(), indices.last()) {
        if indices.len() > 2 {
          faces.push(vec![*last, *first]);
        }
      }
      faces
    }
    Mode::Triangles => indices.chunks(3).map(<[u32]>::to_vec).collect(),
    Mode::TriangleStrip => indices
      .windows(3)
      .enumerate()
      .map(|(i, x)| if i % 2 == 0 { vec![x[0], x[1], x[2]] } else { vec![x[1], x[0], x[2]] })
      .collect(),
    Mode::TriangleFan if triangulate => {
      indices.windows(2).skip(1).map(|x| vec![indices[0], x[0], x[1]]).collect()
    }
    Mode::TriangleFan if indices.len() >= 3 => vec![indices.to_vec()],
    Mode::TriangleFan => vec![],
  }
}

/// Per-vertex normals from the sum of adjacent triangle normals, weighted by
/// triangle area.
pub(crate) fn smooth_normals(positions: &[Vec3], faces: &[Vec<u32>]) -> Vec<Vec3> {
  let mut normals = vec![Vec3::ZERO; positions.len()];
  for face in faces {
    let &[a, b, c] = face.as_slice() else { continue };
    let (Some(pa), Some(pb), Some(pc)) =
      (positions.get(a as usize), positions.get(b as usize), positions.get(c as usize))
    else {
      continue;
    };
    let weighted = (*pb - *pa).cross(*pc - *pa);
    for idx in [a, b, c] {
      normals[idx as usize] += weighted;
    }
  }
  normals.iter_mut().for_each(|x| *x = x.normalize_or_zero());
  normals
}

/// Tangents and bitangents along the U and V directions of the texture mapping.
pub(crate) fn uv_tangents(
  positions: &[Vec3],
  uvs: &[Vec2],
  faces: &[Vec<u32>],
) -> Vec<(Vec3, Vec3)> {
  let mut frames = vec![(Vec3::ZERO, Vec3::ZERO); positions.len()];
  for face in faces {
    let &[a, b, c] = face.as_slice() else { continue };
    let [a, b, c] = [a as usize, b as usize, c as usize];
    if [a, b, c].iter().any(|x| *x >= positions.len() || *x >= uvs.len()) {
      continue;
    }
    let (e1, e2) = (positions[b] - positions[a], positions[c] - positions[a]);
    let (d1, d2) = (uvs[b] - uvs[a], uvs[c] - uvs[a]);
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < f32::EPSILON {
      continue;
    }
    let tangent = (e1 * d2.y - e2 * d1.y) / det;
    let bitangent = (e2 * d1.x - e1 * d2.x) / det;
    for idx in [a, b, c] {
      frames[idx].0 += tangent;
      frames[idx].1 += bitangent;
    }
  }
  frames.iter().map(|(t, b)| (t.normalize_or_zero(), b.normalize_or_zero())).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scene::{SceneSource, SubmeshSource};

  // three positions (0,0,0) (1,0,0) (0,1,0) followed by u16 indices 0 1 2
  const TRIANGLE_BUFFER: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA=";

  fn write_triangle_gltf(name: &str) -> std::path::PathBuf {
    let json = format!(
      r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "translation": [0.0, 1.0, 0.0], "children": [1] }}, {{ "mesh": 0 }}],
  "meshes": [{{
    "primitives": [
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }},
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "mode": 5 }}
    ]
  }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [0.5, 0.25, 1.0, 1.0] }} }}],
  "buffers": [{{
    "byteLength": 44,
    "uri": "data:application/octet-stream;base64,{TRIANGLE_BUFFER}"
  }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ]
}}"#
    );
    let path = std::env::temp_dir().join(format!("prism-mesh-{}-{name}.gltf", std::process::id()));
    std::fs::write(&path, json).unwrap();
    path
  }

  #[test]
  fn imports_with_default_flags() {
    let path = write_triangle_gltf("default");
    let scene = GltfImporter.import(&path, ImportFlags::default()).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(scene.submesh_count(), 2);
    let submesh = scene.submesh(0);
    // node translation baked in
    assert_eq!(
      submesh.positions,
      vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 2.0, 0.0)]
    );
    assert_eq!(submesh.normals, vec![Vec3::Z; 3]);
    assert_eq!(submesh.faces, vec![vec![2, 1, 0]]);
    assert_eq!(submesh.tex_coords, None);
    assert_eq!(submesh.tangent_frame(0), None);
    assert_eq!(scene.diffuse_color(submesh.material_index()), Some(Vec3::new(0.5, 0.25, 1.0)));

    // no material on the strip primitive
    let strip = scene.submesh(1);
    assert_eq!(strip.material_index, 1);
    assert_eq!(scene.diffuse_color(1), Some(Vec3::ONE));
  }

  #[test]
  fn imports_without_post_processing() {
    let path = write_triangle_gltf("raw");
    let scene = GltfImporter.import(&path, ImportFlags::none()).unwrap();
    std::fs::remove_file(&path).ok();

    let submesh = scene.submesh(0);
    assert_eq!(submesh.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert!(submesh.normals.is_empty());
    assert_eq!(submesh.normal(0), Vec3::ZERO);
    assert_eq!(submesh.faces, vec![vec![0, 1, 2]]);
  }

  #[test]
  fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("prism-mesh-does-not-exist.gltf");
    assert!(GltfImporter.import(&path, ImportFlags::default()).is_err());
  }

  #[test]
  fn faces_follow_topology() {
    let indices = [0, 1, 2, 3, 4];
    assert_eq!(assemble_faces(Mode::Triangles, &indices, true), vec![vec![0, 1, 2], vec![3, 4]]);
    assert_eq!(
      assemble_faces(Mode::TriangleStrip, &indices, true),
      vec![vec![0, 1, 2], vec![2, 1, 3], vec![2, 3, 4]]
    );
    assert_eq!(
      assemble_faces(Mode::TriangleFan, &indices, true),
      vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 4]]
    );
    assert_eq!(assemble_faces(Mode::TriangleFan, &indices, false), vec![indices.to_vec()]);
    assert_eq!(assemble_faces(Mode::Points, &indices[..2], true), vec![vec![0], vec![1]]);
    assert_eq!(assemble_faces(Mode::Lines, &indices[..4], true), vec![vec![0, 1], vec![2, 3]]);
    assert_eq!(
      assemble_faces(Mode::LineLoop, &indices[..3], true),
      vec![vec![0, 1], vec![1, 2], vec![2, 0]]
    );
  }

  #[test]
  fn smooth_normals_weight_by_area() {
    let positions = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(0.0, 0.0, 2.0)];
    // larger triangle in the xz plane facing +y, smaller one in the xy plane facing +z
    let faces = vec![vec![0, 1, 2], vec![0, 3, 1]];
    let normals = smooth_normals(&positions, &faces);
    assert_eq!(normals[2], Vec3::Z);
    assert_eq!(normals[3], Vec3::Y);
    let shared = normals[0];
    assert!(shared.y > shared.z);
    assert!((shared.length() - 1.0).abs() < 1e-5);
  }

  #[test]
  fn uv_tangents_follow_texture_axes() {
    let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
    let uvs = [Vec2::ZERO, Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0)];
    let frames = uv_tangents(&positions, &uvs, &[vec![0, 1, 2]]);
    assert!(frames.iter().all(|x| *x == (Vec3::X, Vec3::Y)));

    let degenerate = uv_tangents(&positions, &[Vec2::ZERO; 3], &[vec![0, 1, 2]]);
    assert!(degenerate.iter().all(|x| *x == (Vec3::ZERO, Vec3::ZERO)));
  }
}
