mod buffer;
mod device;
mod memory;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod stager;

use std::sync::Arc;
use mesh_structs::{BoundingBox, PackedBuffers};
use vk_context::{ash, ash::vk, VkContext};

pub use buffer::{create_gpu_buffer, GpuBuffer, MeshBuffer};
pub use device::BufferDevice;
pub use memory::find_memory_type;
pub use stager::{upload_mesh, TransferContext, UploadMode};

#[derive(thiserror::Error, Debug)]
pub enum StagingError {
  #[error("no memory type in {type_bits:#b} supports {flags:?}")]
  NoMatchingMemoryType { type_bits: u32, flags: vk::MemoryPropertyFlags },
  #[error("refusing to upload an empty {0} stream")]
  EmptyStream(&'static str),
  #[error("at {at}: {source}")]
  Device { at: &'static str, source: vk::Result },
}

pub(crate) trait DeviceResultExt<T> {
  fn at(self, at: &'static str) -> Result<T, StagingError>;
}

impl<T> DeviceResultExt<T> for Result<T, vk::Result> {
  fn at(self, at: &'static str) -> Result<T, StagingError> {
    self.map_err(|source| StagingError::Device { at, source })
  }
}

/// Owns a transient command pool on the transfer queue family of a
/// `VkContext` and hands out the context the staging path records into.
pub struct TransferManager {
  cmd_pool: vk::CommandPool,
  cmd_buffer: vk::CommandBuffer,
  vk_context: Arc<VkContext>,
}

impl TransferManager {
  pub fn new(vk_context: Arc<VkContext>) -> Result<Self, String> {
    let cmd_pool = unsafe {
      vk_context
        .device
        .create_command_pool(
          &vk::CommandPoolCreateInfo::default()
            .queue_family_index(vk_context.transfer_q_idx)
            .flags(
              vk::CommandPoolCreateFlags::TRANSIENT
                | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            ),
          None,
        )
        .map_err(|e| format!("at cmd pool create: {e}"))?
    };

    let cmd_buffer = unsafe {
      vk_context.device.allocate_command_buffers(
        &vk::CommandBufferAllocateInfo::default()
          .command_pool(cmd_pool)
          .level(vk::CommandBufferLevel::PRIMARY)
          .command_buffer_count(1),
      )
    };
    let cmd_buffer = match cmd_buffer {
      Ok(buffers) => buffers[0],
      Err(e) => {
        unsafe { vk_context.device.destroy_command_pool(cmd_pool, None) };
        return Err(format!("at creating command buffer: {e}"));
      }
    };

    Ok(Self { cmd_pool, cmd_buffer, vk_context })
  }

  pub fn device(&self) -> &ash::Device {
    &self.vk_context.device
  }

  pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
    &self.vk_context.memory_properties
  }

  pub fn transfer_context(&self) -> TransferContext {
    TransferContext {
      command_buffer: self.cmd_buffer,
      queue: self.vk_context.transfer_q,
      queue_families: [self.vk_context.transfer_q_idx, self.vk_context.graphics_q_idx],
    }
  }

  pub fn upload_mode(&self, use_staging: bool) -> UploadMode {
    UploadMode::select(use_staging, Some(self.transfer_context()))
  }

  pub fn upload_mesh(
    &self,
    packed: &PackedBuffers,
    bounds: BoundingBox,
    use_staging: bool,
  ) -> Result<MeshBuffer, StagingError> {
    let mode = self.upload_mode(use_staging);
    stager::upload_mesh(self.device(), self.memory_properties(), packed, bounds, mode)
  }
}

impl Drop for TransferManager {
  fn drop(&mut self) {
    unsafe {
      self.vk_context.device.free_command_buffers(self.cmd_pool, &[self.cmd_buffer]);
      self.vk_context.device.destroy_command_pool(self.cmd_pool, None);
    }
  }
}
