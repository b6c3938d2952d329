//! In-memory `BufferDevice` for tests.
//!
//! Memory lives in host vectors, recorded copies run on submit, and every call
//! is counted so tests can check which path an upload took.

use crate::{BufferDevice, TransferContext};
use std::cell::RefCell;
use std::collections::HashMap;
use vk_context::ash::vk::{self, Handle};

const ALIGNMENT: vk::DeviceSize = 256;

/// Builds a memory property table with one memory type per entry of `types`.
pub fn memory_properties_with(
  types: &[vk::MemoryPropertyFlags],
) -> vk::PhysicalDeviceMemoryProperties {
  let mut props = vk::PhysicalDeviceMemoryProperties {
    memory_type_count: types.len() as u32,
    memory_heap_count: 1,
    ..Default::default()
  };
  for (slot, flags) in props.memory_types.iter_mut().zip(types) {
    slot.property_flags = *flags;
    slot.heap_index = 0;
  }
  props
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockCalls {
  pub buffers_created: usize,
  pub buffers_destroyed: usize,
  pub memories_allocated: usize,
  pub memories_freed: usize,
  pub writes: usize,
  pub submits: usize,
  pub wait_idles: usize,
}

struct MockBuffer {
  size: vk::DeviceSize,
  usage: vk::BufferUsageFlags,
  sharing: (vk::SharingMode, u32),
  memory: Option<u64>,
}

struct MockMemory {
  type_index: u32,
  bytes: Vec<u8>,
}

#[derive(Default)]
struct MockState {
  next_handle: u64,
  buffers: HashMap<u64, MockBuffer>,
  memories: HashMap<u64, MockMemory>,
  recording: HashMap<u64, Vec<(vk::Buffer, vk::Buffer, vk::BufferCopy)>>,
  recorded: HashMap<u64, Vec<(vk::Buffer, vk::Buffer, vk::BufferCopy)>>,
  copies: Vec<(vk::Buffer, vk::Buffer, vk::DeviceSize)>,
  failing_submit: Option<vk::Result>,
  calls: MockCalls,
}

impl MockState {
  fn handle(&mut self) -> u64 {
    self.next_handle += 1;
    self.next_handle
  }
}

pub struct MockDevice {
  memory_properties: vk::PhysicalDeviceMemoryProperties,
  state: RefCell<MockState>,
}

impl Default for MockDevice {
  fn default() -> Self {
    Self::new()
  }
}

impl MockDevice {
  /// A device-local type followed by a host visible, coherent one.
  pub fn new() -> Self {
    Self::with_memory_types(&[
      vk::MemoryPropertyFlags::DEVICE_LOCAL,
      vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    ])
  }

  pub fn with_memory_types(types: &[vk::MemoryPropertyFlags]) -> Self {
    Self {
      memory_properties: memory_properties_with(types),
      state: RefCell::new(MockState::default()),
    }
  }

  pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
    &self.memory_properties
  }

  /// Context on a transfer family (1) separate from the graphics family (0).
  pub fn transfer_context(&self) -> TransferContext {
    TransferContext {
      command_buffer: vk::CommandBuffer::from_raw(0xc0de),
      queue: vk::Queue::from_raw(0x9e9e),
      queue_families: [1, 0],
    }
  }

  /// Makes every following `queue_submit` fail with `error` without running
  /// the recorded copies.
  pub fn fail_submits_with(&self, error: vk::Result) {
    self.state.borrow_mut().failing_submit = Some(error);
  }

  pub fn calls(&self) -> MockCalls {
    self.state.borrow().calls
  }

  /// Every executed copy as `(src, dst, size)`, in submission order.
  pub fn copies(&self) -> Vec<(vk::Buffer, vk::Buffer, vk::DeviceSize)> {
    self.state.borrow().copies.clone()
  }

  pub fn live_buffers(&self) -> usize {
    self.state.borrow().buffers.len()
  }

  pub fn live_allocations(&self) -> usize {
    self.state.borrow().memories.len()
  }

  pub fn buffer_usage(&self, buffer: vk::Buffer) -> Option<vk::BufferUsageFlags> {
    self.state.borrow().buffers.get(&buffer.as_raw()).map(|x| x.usage)
  }

  /// Sharing mode and queue family count the buffer was created with.
  pub fn buffer_sharing(&self, buffer: vk::Buffer) -> Option<(vk::SharingMode, u32)> {
    self.state.borrow().buffers.get(&buffer.as_raw()).map(|x| x.sharing)
  }

  /// Contents of the memory bound to `buffer`, cut to the buffer size.
  pub fn read_buffer(&self, buffer: vk::Buffer) -> Option<Vec<u8>> {
    let state = self.state.borrow();
    let mock_buffer = state.buffers.get(&buffer.as_raw())?;
    let memory = state.memories.get(&mock_buffer.memory?)?;
    Some(memory.bytes[..mock_buffer.size as usize].to_vec())
  }

  pub fn is_host_visible(&self, buffer: vk::Buffer) -> bool {
    let state = self.state.borrow();
    state
      .buffers
      .get(&buffer.as_raw())
      .and_then(|x| x.memory)
      .and_then(|x| state.memories.get(&x))
      .map(|x| self.type_flags(x.type_index).contains(vk::MemoryPropertyFlags::HOST_VISIBLE))
      .unwrap_or(false)
  }

  fn type_flags(&self, type_index: u32) -> vk::MemoryPropertyFlags {
    self.memory_properties.memory_types[type_index as usize].property_flags
  }

  fn all_types_mask(&self) -> u32 {
    match self.memory_properties.memory_type_count {
      count if count >= 32 => u32::MAX,
      count => (1u32 << count) - 1,
    }
  }
}

impl BufferDevice for MockDevice {
  fn create_buffer(&self, info: &vk::BufferCreateInfo) -> Result<vk::Buffer, vk::Result> {
    if info.size == 0 {
      return Err(vk::Result::ERROR_VALIDATION_FAILED_EXT);
    }
    let mut state = self.state.borrow_mut();
    let handle = state.handle();
    let sharing = (info.sharing_mode, info.queue_family_index_count);
    state
      .buffers
      .insert(handle, MockBuffer { size: info.size, usage: info.usage, sharing, memory: None });
    state.calls.buffers_created += 1;
    Ok(vk::Buffer::from_raw(handle))
  }

  fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
    let size = self.state.borrow().buffers.get(&buffer.as_raw()).map(|x| x.size).unwrap_or(0);
    vk::MemoryRequirements {
      size: size.div_ceil(ALIGNMENT) * ALIGNMENT,
      alignment: ALIGNMENT,
      memory_type_bits: self.all_types_mask(),
    }
  }

  fn allocate_memory(&self, info: &vk::MemoryAllocateInfo) -> Result<vk::DeviceMemory, vk::Result> {
    if info.memory_type_index >= self.memory_properties.memory_type_count {
      return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
    }
    let mut state = self.state.borrow_mut();
    let handle = state.handle();
    state.memories.insert(
      handle,
      MockMemory {
        type_index: info.memory_type_index,
        bytes: vec![0; info.allocation_size as usize],
      },
    );
    state.calls.memories_allocated += 1;
    Ok(vk::DeviceMemory::from_raw(handle))
  }

  fn bind_buffer_memory(
    &self,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    _offset: vk::DeviceSize,
  ) -> Result<(), vk::Result> {
    let mut state = self.state.borrow_mut();
    if !state.memories.contains_key(&memory.as_raw()) {
      return Err(vk::Result::ERROR_UNKNOWN);
    }
    let mock_buffer = state.buffers.get_mut(&buffer.as_raw()).ok_or(vk::Result::ERROR_UNKNOWN)?;
    mock_buffer.memory = Some(memory.as_raw());
    Ok(())
  }

  fn write_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> Result<(), vk::Result> {
    let mut state = self.state.borrow_mut();
    let mock_memory =
      state.memories.get_mut(&memory.as_raw()).ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
    let host_visible =
      self.type_flags(mock_memory.type_index).contains(vk::MemoryPropertyFlags::HOST_VISIBLE);
    if !host_visible || data.len() > mock_memory.bytes.len() {
      return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
    }
    mock_memory.bytes[..data.len()].copy_from_slice(data);
    state.calls.writes += 1;
    Ok(())
  }

  fn destroy_buffer(&self, buffer: vk::Buffer) {
    let mut state = self.state.borrow_mut();
    if state.buffers.remove(&buffer.as_raw()).is_some() {
      state.calls.buffers_destroyed += 1;
    }
  }

  fn free_memory(&self, memory: vk::DeviceMemory) {
    let mut state = self.state.borrow_mut();
    if state.memories.remove(&memory.as_raw()).is_some() {
      state.calls.memories_freed += 1;
    }
  }

  fn begin_command_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    _info: &vk::CommandBufferBeginInfo,
  ) -> Result<(), vk::Result> {
    let mut state = self.state.borrow_mut();
    state.recorded.remove(&command_buffer.as_raw());
    state.recording.insert(command_buffer.as_raw(), vec![]);
    Ok(())
  }

  fn cmd_copy_buffer(
    &self,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    regions: &[vk::BufferCopy],
  ) {
    let mut state = self.state.borrow_mut();
    if let Some(commands) = state.recording.get_mut(&command_buffer.as_raw()) {
      commands.extend(regions.iter().map(|region| (src, dst, *region)));
    }
  }

  fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<(), vk::Result> {
    let mut state = self.state.borrow_mut();
    let commands = state
      .recording
      .remove(&command_buffer.as_raw())
      .ok_or(vk::Result::ERROR_VALIDATION_FAILED_EXT)?;
    state.recorded.insert(command_buffer.as_raw(), commands);
    Ok(())
  }

  fn queue_submit(
    &self,
    _queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
  ) -> Result<(), vk::Result> {
    let mut state = self.state.borrow_mut();
    if let Some(error) = state.failing_submit {
      return Err(error);
    }
    for command_buffer in command_buffers {
      let commands = state
        .recorded
        .get(&command_buffer.as_raw())
        .cloned()
        .ok_or(vk::Result::ERROR_VALIDATION_FAILED_EXT)?;
      for (src, dst, region) in commands {
        let src_memory = state
          .buffers
          .get(&src.as_raw())
          .and_then(|x| x.memory)
          .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        let dst_memory = state
          .buffers
          .get(&dst.as_raw())
          .and_then(|x| x.memory)
          .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        let (src_start, dst_start, size) =
          (region.src_offset as usize, region.dst_offset as usize, region.size as usize);
        let data = state.memories[&src_memory].bytes[src_start..src_start + size].to_vec();
        state
          .memories
          .get_mut(&dst_memory)
          .ok_or(vk::Result::ERROR_DEVICE_LOST)?
          .bytes[dst_start..dst_start + size]
          .copy_from_slice(&data);
        state.copies.push((src, dst, region.size));
      }
    }
    state.calls.submits += 1;
    Ok(())
  }

  fn queue_wait_idle(&self, _queue: vk::Queue) -> Result<(), vk::Result> {
    self.state.borrow_mut().calls.wait_idles += 1;
    Ok(())
  }
}
