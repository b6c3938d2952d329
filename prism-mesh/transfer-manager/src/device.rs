use vk_context::{ash, ash::vk};

/// The slice of a Vulkan device that buffer uploads need.
///
/// Implemented for `ash::Device`; tests use the in-memory `MockDevice`.
pub trait BufferDevice {
  fn create_buffer(&self, info: &vk::BufferCreateInfo) -> Result<vk::Buffer, vk::Result>;

  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

  fn allocate_memory(&self, info: &vk::MemoryAllocateInfo) -> Result<vk::DeviceMemory, vk::Result>;

  fn bind_buffer_memory(
    &self,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
  ) -> Result<(), vk::Result>;

  /// Maps `memory`, copies `data` to its start and unmaps it again.
  /// The memory must be host visible and coherent.
  fn write_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> Result<(), vk::Result>;

  fn destroy_buffer(&self, buffer: vk::Buffer);

  fn free_memory(&self, memory: vk::DeviceMemory);

  fn begin_command_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    info: &vk::CommandBufferBeginInfo,
  ) -> Result<(), vk::Result>;

  fn cmd_copy_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    regions: &[vk::BufferCopy],
  );

  fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<(), vk::Result>;

  fn queue_submit(
    &self,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
  ) -> Result<(), vk::Result>;

  fn queue_wait_idle(&self, queue: vk::Queue) -> Result<(), vk::Result>;
}

impl BufferDevice for ash::Device {
  fn create_buffer(&self, info: &vk::BufferCreateInfo) -> Result<vk::Buffer, vk::Result> {
    unsafe { ash::Device::create_buffer(self, info, None) }
  }

  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
    unsafe { ash::Device::get_buffer_memory_requirements(self, buffer) }
  }

  fn allocate_memory(&self, info: &vk::MemoryAllocateInfo) -> Result<vk::DeviceMemory, vk::Result> {
    unsafe { ash::Device::allocate_memory(self, info, None) }
  }

  fn bind_buffer_memory(
    &self,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
  ) -> Result<(), vk::Result> {
    unsafe { ash::Device::bind_buffer_memory(self, buffer, memory, offset) }
  }

  fn write_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> Result<(), vk::Result> {
    unsafe {
      let mapped = ash::Device::map_memory(
        self,
        memory,
        0,
        data.len() as vk::DeviceSize,
        vk::MemoryMapFlags::empty(),
      )?;
      mapped.cast::<u8>().copy_from_nonoverlapping(data.as_ptr(), data.len());
      ash::Device::unmap_memory(self, memory);
    }
    Ok(())
  }

  fn destroy_buffer(&self, buffer: vk::Buffer) {
    unsafe { ash::Device::destroy_buffer(self, buffer, None) }
  }

  fn free_memory(&self, memory: vk::DeviceMemory) {
    unsafe { ash::Device::free_memory(self, memory, None) }
  }

  fn begin_command_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    info: &vk::CommandBufferBeginInfo,
  ) -> Result<(), vk::Result> {
    unsafe { ash::Device::begin_command_buffer(self, command_buffer, info) }
  }

  fn cmd_copy_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    regions: &[vk::BufferCopy],
  ) {
    unsafe { ash::Device::cmd_copy_buffer(self, command_buffer, src, dst, regions) }
  }

  fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<(), vk::Result> {
    unsafe { ash::Device::end_command_buffer(self, command_buffer) }
  }

  fn queue_submit(
    &self,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
  ) -> Result<(), vk::Result> {
    unsafe {
      ash::Device::queue_submit(
        self,
        queue,
        &[vk::SubmitInfo::default().command_buffers(command_buffers)],
        vk::Fence::null(),
      )
    }
  }

  fn queue_wait_idle(&self, queue: vk::Queue) -> Result<(), vk::Result> {
    unsafe { ash::Device::queue_wait_idle(self, queue) }
  }
}
