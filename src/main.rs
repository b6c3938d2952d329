mod args;

use args::Args;
use clap::Parser;
use prism_mesh::{MeshLoader, TransferManager, VkContext, VkLoaders};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();
  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      log::error!("{e}");
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<(), String> {
  let mut loader = MeshLoader::new();
  loader.load_mesh_with_flags(&args.path, args.import_flags()).map_err(|e| e.to_string())?;

  if args.dry_run {
    let packed = loader.pack(args.layout.clone(), args.scale).map_err(|e| e.to_string())?;
    log::info!(
      "packed {} floats (stride {} bytes) and {} indices, dimensions {}",
      packed.vertices.len(),
      packed.stride,
      packed.index_count(),
      loader.mesh().bounds.scaled(args.scale).size
    );
    return Ok(());
  }

  let vk_loaders = Arc::new(VkLoaders::new(args.validation)?);
  let vk_context =
    Arc::new(VkContext::new(vk_loaders, args.gpu.map(|x| (x.vendor_id, x.device_id)))?);
  let transfer_manager = TransferManager::new(Arc::clone(&vk_context))?;

  let mesh_buffer = loader
    .create_buffers(
      transfer_manager.device(),
      transfer_manager.memory_properties(),
      args.layout.clone(),
      args.scale,
      transfer_manager.upload_mode(args.use_staging()),
    )
    .map_err(|e| e.to_string())?;
  log::info!(
    "uploaded {} + {} bytes, {} indices, dimensions {}",
    mesh_buffer.vertices.size,
    mesh_buffer.indices.size,
    mesh_buffer.index_count,
    loader.dimensions().size
  );
  mesh_buffer.destroy(transfer_manager.device());
  Ok(())
}
