use clap::{Parser, ValueEnum};
use prism_mesh::{ImportFlags, VertexLayout};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UploadArg {
  /// Host visible buffers, written through a mapping.
  #[default]
  Direct,
  /// Device local buffers filled by a copy on the transfer queue.
  Staging,
}

/// PCI vendor and device id of a GPU, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuId {
  pub vendor_id: u32,
  pub device_id: u32,
}

fn parse_gpu_id(s: &str) -> Result<GpuId, String> {
  let (vendor, device) = s.split_once(':').ok_or("expected VENDOR:DEVICE")?;
  let parse_hex = |x: &str| {
    u32::from_str_radix(x.trim().trim_start_matches("0x"), 16)
      .map_err(|e| format!("bad id {x}: {e}"))
  };
  Ok(GpuId { vendor_id: parse_hex(vendor)?, device_id: parse_hex(device)? })
}

/// Loads a scene and turns it into interleaved vertex and index buffers.
#[derive(Parser, Debug)]
#[command(
  name = "prism-mesh-loader",
  about = "Loads a glTF scene into GPU vertex and index buffers",
  long_about = "Loads a glTF scene, packs its vertices with the requested attribute layout \
    and uploads the vertex and index streams to a Vulkan device.\n\n\
    LAYOUT:\n\
    Comma separated attribute names or layout codes:\n\
    position (0), normal (1), color (2), uv (3), tangent (4), bitangent (5),\n\
    dummy-float (6), dummy-vec4 (7).\n\n\
    EXAMPLES:\n\
      prism-mesh-loader scene.gltf --layout position,normal,uv\n\
      prism-mesh-loader scene.glb --layout 0,1,3 --scale 0.01 --upload staging\n\
      prism-mesh-loader scene.gltf --dry-run",
  version
)]
pub struct Args {
  /// Scene file (.gltf or .glb).
  pub path: PathBuf,

  /// Vertex attributes in buffer order.
  #[arg(long, default_value = "position,normal,uv,color")]
  pub layout: VertexLayout,

  /// Uniform scale applied to positions and reported dimensions.
  #[arg(long, default_value_t = 1.0)]
  pub scale: f32,

  /// How buffers reach the device.
  #[arg(long, default_value = "direct", value_enum)]
  pub upload: UploadArg,

  /// Keep the file's triangle winding.
  #[arg(long)]
  pub no_flip_winding: bool,

  /// Keep triangle fans as polygons (they are dropped during ingestion).
  #[arg(long)]
  pub no_triangulate: bool,

  /// Ignore node transforms.
  #[arg(long)]
  pub no_pre_transform: bool,

  /// Skip tangent space calculation.
  #[arg(long)]
  pub no_tangents: bool,

  /// Do not generate normals for primitives without them.
  #[arg(long)]
  pub no_smooth_normals: bool,

  /// Preferred GPU as hex VENDOR:DEVICE, e.g. 10de:2684.
  #[arg(long, value_parser = parse_gpu_id)]
  pub gpu: Option<GpuId>,

  /// Enable the Khronos validation layer.
  #[arg(long)]
  pub validation: bool,

  /// Load and pack only. No Vulkan device is created.
  #[arg(long)]
  pub dry_run: bool,
}

impl Args {
  pub fn import_flags(&self) -> ImportFlags {
    ImportFlags {
      flip_winding_order: !self.no_flip_winding,
      triangulate: !self.no_triangulate,
      pre_transform_vertices: !self.no_pre_transform,
      calc_tangent_space: !self.no_tangents,
      gen_smooth_normals: !self.no_smooth_normals,
    }
  }

  pub fn use_staging(&self) -> bool {
    self.upload == UploadArg::Staging
  }
}
