use crate::memory::find_memory_type;
use crate::{BufferDevice, DeviceResultExt, StagingError};
use mesh_structs::BoundingBox;
use vk_context::ash::vk;

/// A buffer and the memory bound to it.
///
/// Not released on drop: hand it back to `destroy` before the device goes away.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "GPU buffers must be released with `destroy`"]
pub struct GpuBuffer {
  pub buffer: vk::Buffer,
  pub memory: vk::DeviceMemory,
  pub size: vk::DeviceSize,
}

impl GpuBuffer {
  pub fn destroy<D: BufferDevice + ?Sized>(self, device: &D) {
    device.destroy_buffer(self.buffer);
    device.free_memory(self.memory);
  }
}

/// Uploaded vertex and index buffers of one mesh.
#[derive(Debug)]
#[must_use = "mesh buffers must be released with `destroy`"]
pub struct MeshBuffer {
  pub vertices: GpuBuffer,
  pub indices: GpuBuffer,
  pub index_count: u32,
  /// Bounds in the same scale as the uploaded positions.
  pub bounds: BoundingBox,
}

impl MeshBuffer {
  pub fn destroy<D: BufferDevice + ?Sized>(self, device: &D) {
    self.vertices.destroy(device);
    self.indices.destroy(device);
  }
}

/// Creates a buffer of `size` bytes and binds it to fresh memory of the first
/// type that has `flags`. Nothing is leaked on failure.
///
/// The buffer is shared concurrently when `queue_families` names more than one
/// distinct family, and exclusive otherwise.
pub fn create_gpu_buffer<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  size: vk::DeviceSize,
  usage: vk::BufferUsageFlags,
  flags: vk::MemoryPropertyFlags,
  queue_families: &[u32],
) -> Result<GpuBuffer, StagingError> {
  let mut families = queue_families.to_vec();
  families.sort_unstable();
  families.dedup();

  let create_info = vk::BufferCreateInfo::default().size(size).usage(usage);
  let create_info = if families.len() > 1 {
    create_info.sharing_mode(vk::SharingMode::CONCURRENT).queue_family_indices(&families)
  } else {
    create_info.sharing_mode(vk::SharingMode::EXCLUSIVE)
  };
  let buffer = device.create_buffer(&create_info).at("creating buffer")?;

  let requirements = device.buffer_memory_requirements(buffer);
  let memory = find_memory_type(memory_properties, requirements.memory_type_bits, flags)
    .and_then(|memory_type_index| {
      device
        .allocate_memory(
          &vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index),
        )
        .at("allocating buffer memory")
    })
    .inspect_err(|_| device.destroy_buffer(buffer))?;

  if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
    device.destroy_buffer(buffer);
    device.free_memory(memory);
    return Err(StagingError::Device { at: "binding buffer memory", source: e });
  }

  Ok(GpuBuffer { buffer, memory, size })
}
