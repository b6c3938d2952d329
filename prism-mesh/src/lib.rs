mod gltf_scene;
mod ingest;
mod scene;

use std::convert::Infallible;
use std::path::{Path, PathBuf};

pub use gltf_scene::GltfImporter;
pub use ingest::ingest;
pub use mesh_structs::*;
pub use scene::{
  ImportFlags, ImportedMaterial, ImportedScene, ImportedSubmesh, SceneImporter, SceneSource,
  SubmeshSource,
};
pub use transfer_manager::{
  create_gpu_buffer, find_memory_type, upload_mesh, BufferDevice, GpuBuffer, MeshBuffer,
  StagingError, TransferContext, TransferManager, UploadMode,
};
pub use vk_context::{ash, VkContext, VkLoaders};

#[derive(thiserror::Error, Debug)]
pub enum MeshLoadError {
  #[error("failed to import {}: {message}", path.display())]
  Import { path: PathBuf, message: String },
  #[error(transparent)]
  Layout(#[from] LayoutError),
  #[error(transparent)]
  Staging(#[from] StagingError),
}

impl From<Infallible> for MeshLoadError {
  fn from(x: Infallible) -> Self {
    match x {}
  }
}

/// Loads a scene into a `Mesh` and turns it into vertex and index buffers.
///
/// The loader keeps the most recently ingested mesh. A failed load leaves it
/// untouched.
pub struct MeshLoader<I = GltfImporter> {
  importer: I,
  mesh: Mesh,
  scale: f32,
}

impl MeshLoader<GltfImporter> {
  pub fn new() -> Self {
    Self::with_importer(GltfImporter)
  }
}

impl Default for MeshLoader<GltfImporter> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: SceneImporter> MeshLoader<I> {
  pub fn with_importer(importer: I) -> Self {
    Self { importer, mesh: Mesh::default(), scale: 1.0 }
  }

  pub fn load_mesh(&mut self, path: impl AsRef<Path>) -> Result<(), MeshLoadError> {
    self.load_mesh_with_flags(path, ImportFlags::default())
  }

  pub fn load_mesh_with_flags(
    &mut self,
    path: impl AsRef<Path>,
    flags: ImportFlags,
  ) -> Result<(), MeshLoadError> {
    let path = path.as_ref();
    let scene = self
      .importer
      .import(path, flags)
      .map_err(|message| MeshLoadError::Import { path: path.to_path_buf(), message })?;
    self.init_from_scene(&scene);
    log::info!(
      "loaded {}: {} entries, {} vertices, {} indices",
      path.display(),
      self.mesh.entries.len(),
      self.mesh.vertex_count(),
      self.mesh.index_count()
    );
    Ok(())
  }

  pub fn init_from_scene<S: SceneSource>(&mut self, scene: &S) {
    self.mesh = ingest(scene);
    self.scale = 1.0;
  }

  pub fn mesh(&self) -> &Mesh {
    &self.mesh
  }

  /// Mesh bounds at the scale of the last `create_buffers` call.
  pub fn dimensions(&self) -> BoundingBox {
    self.mesh.bounds.scaled(self.scale)
  }

  pub fn pack<L>(&self, layout: L, scale: f32) -> Result<PackedBuffers, MeshLoadError>
  where
    L: TryInto<VertexLayout>,
    L::Error: Into<MeshLoadError>,
  {
    let layout: VertexLayout = layout.try_into().map_err(Into::<MeshLoadError>::into)?;
    Ok(pack(&layout, &self.mesh, scale))
  }

  /// Packs the mesh with `layout` and uploads it. An unusable layout is
  /// reported before the device is touched.
  pub fn create_buffers<D, L>(
    &mut self,
    device: &D,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    layout: L,
    scale: f32,
    mode: UploadMode,
  ) -> Result<MeshBuffer, MeshLoadError>
  where
    D: BufferDevice + ?Sized,
    L: TryInto<VertexLayout>,
    L::Error: Into<MeshLoadError>,
  {
    let packed = self.pack(layout, scale)?;
    let mesh_buffer = upload_mesh(device, memory_properties, &packed, self.mesh.bounds, mode)?;
    self.scale = scale;
    log::info!(
      "created mesh buffers: {} vertex bytes, {} indices, stride {}",
      mesh_buffer.vertices.size,
      mesh_buffer.index_count,
      packed.stride
    );
    Ok(mesh_buffer)
  }

  /// `create_buffers` with host visible buffers and no command submission.
  pub fn create_vulkan_buffers<D, L>(
    &mut self,
    device: &D,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    layout: L,
    scale: f32,
  ) -> Result<MeshBuffer, MeshLoadError>
  where
    D: BufferDevice + ?Sized,
    L: TryInto<VertexLayout>,
    L::Error: Into<MeshLoadError>,
  {
    self.create_buffers(device, memory_properties, layout, scale, UploadMode::Direct)
  }
}
