use crate::buffer::{create_gpu_buffer, GpuBuffer, MeshBuffer};
use crate::{BufferDevice, DeviceResultExt, StagingError};
use mesh_structs::{BoundingBox, PackedBuffers};
use vk_context::ash::vk;

const HOST_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
  vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Command buffer and queue the staging copy is recorded into and submitted on.
/// Both are owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferContext {
  pub command_buffer: vk::CommandBuffer,
  pub queue: vk::Queue,
  /// Family of `queue` followed by the family the buffers are drawn from.
  /// Device local targets are shared between them when they differ.
  pub queue_families: [u32; 2],
}

impl TransferContext {
  pub fn is_valid(&self) -> bool {
    self.command_buffer != vk::CommandBuffer::null() && self.queue != vk::Queue::null()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
  /// Host visible buffers written through a mapping. No command submission.
  Direct,
  /// Host visible staging buffers copied into device local buffers.
  Staging(TransferContext),
}

impl UploadMode {
  /// Staging only happens when it is asked for and a usable transfer context
  /// exists; everything else falls back to a direct upload.
  pub fn select(use_staging: bool, transfer: Option<TransferContext>) -> Self {
    match transfer {
      Some(context) if use_staging && context.is_valid() => UploadMode::Staging(context),
      _ => {
        if use_staging {
          log::warn!("staging requested without a transfer context, uploading directly");
        }
        UploadMode::Direct
      }
    }
  }
}

/// Uploads packed vertex and index streams and returns the buffers to render
/// from. `bounds` are the unscaled mesh bounds; the returned ones carry the
/// scale baked into `packed`.
pub fn upload_mesh<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  packed: &PackedBuffers,
  bounds: BoundingBox,
  mode: UploadMode,
) -> Result<MeshBuffer, StagingError> {
  if packed.vertices.is_empty() {
    return Err(StagingError::EmptyStream("vertex"));
  }
  if packed.indices.is_empty() {
    return Err(StagingError::EmptyStream("index"));
  }

  let (vertices, indices) = match mode {
    UploadMode::Direct => upload_direct(device, memory_properties, packed)?,
    UploadMode::Staging(transfer) => upload_staged(device, memory_properties, packed, transfer)?,
  };
  log::debug!(
    "uploaded {} vertex bytes and {} index bytes ({mode:?})",
    vertices.size,
    indices.size
  );

  Ok(MeshBuffer {
    vertices,
    indices,
    index_count: packed.index_count(),
    bounds: bounds.scaled(packed.scale),
  })
}

fn create_filled_host_buffer<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  data: &[u8],
  usage: vk::BufferUsageFlags,
) -> Result<GpuBuffer, StagingError> {
  let size = data.len() as vk::DeviceSize;
  let buffer = create_gpu_buffer(device, memory_properties, size, usage, HOST_MEMORY, &[])?;
  if let Err(e) = device.write_memory(buffer.memory, data) {
    buffer.destroy(device);
    return Err(StagingError::Device { at: "writing buffer memory", source: e });
  }
  Ok(buffer)
}

fn upload_direct<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  packed: &PackedBuffers,
) -> Result<(GpuBuffer, GpuBuffer), StagingError> {
  let vertices = create_filled_host_buffer(
    device,
    memory_properties,
    packed.vertex_bytes(),
    vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
  )?;
  let indices = match create_filled_host_buffer(
    device,
    memory_properties,
    packed.index_bytes(),
    vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
  ) {
    Ok(x) => x,
    Err(e) => {
      vertices.destroy(device);
      return Err(e);
    }
  };
  Ok((vertices, indices))
}

fn upload_staged<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  packed: &PackedBuffers,
  transfer: TransferContext,
) -> Result<(GpuBuffer, GpuBuffer), StagingError> {
  let mut stage_buffers = Vec::with_capacity(2);
  let result =
    copy_through_stage_buffers(device, memory_properties, packed, transfer, &mut stage_buffers);
  for stage_buffer in stage_buffers {
    stage_buffer.destroy(device);
  }
  result
}

fn copy_through_stage_buffers<D: BufferDevice + ?Sized>(
  device: &D,
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  packed: &PackedBuffers,
  transfer: TransferContext,
  stage_buffers: &mut Vec<GpuBuffer>,
) -> Result<(GpuBuffer, GpuBuffer), StagingError> {
  let vertex_stage = create_filled_host_buffer(
    device,
    memory_properties,
    packed.vertex_bytes(),
    vk::BufferUsageFlags::TRANSFER_SRC,
  )?;
  let vertex_src = vertex_stage.buffer;
  stage_buffers.push(vertex_stage);

  let index_stage = create_filled_host_buffer(
    device,
    memory_properties,
    packed.index_bytes(),
    vk::BufferUsageFlags::TRANSFER_SRC,
  )?;
  let index_src = index_stage.buffer;
  stage_buffers.push(index_stage);

  let vertices = create_gpu_buffer(
    device,
    memory_properties,
    packed.vertex_buffer_size(),
    vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
    vk::MemoryPropertyFlags::DEVICE_LOCAL,
    &transfer.queue_families,
  )?;
  let indices = match create_gpu_buffer(
    device,
    memory_properties,
    packed.index_buffer_size(),
    vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
    vk::MemoryPropertyFlags::DEVICE_LOCAL,
    &transfer.queue_families,
  ) {
    Ok(x) => x,
    Err(e) => {
      vertices.destroy(device);
      return Err(e);
    }
  };

  let copies = [(vertex_src, &vertices), (index_src, &indices)];
  if let Err(e) = submit_copies(device, transfer, &copies) {
    vertices.destroy(device);
    indices.destroy(device);
    return Err(e);
  }
  Ok((vertices, indices))
}

/// Records one full-range copy per pair, submits, and blocks until the queue
/// is idle.
fn submit_copies<D: BufferDevice + ?Sized>(
  device: &D,
  transfer: TransferContext,
  copies: &[(vk::Buffer, &GpuBuffer)],
) -> Result<(), StagingError> {
  device
    .begin_command_buffer(
      transfer.command_buffer,
      &vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
    )
    .at("starting copy command buffer")?;
  for (src, dst) in copies {
    device.cmd_copy_buffer(
      transfer.command_buffer,
      *src,
      dst.buffer,
      &[vk::BufferCopy { src_offset: 0, dst_offset: 0, size: dst.size }],
    );
  }
  device.end_command_buffer(transfer.command_buffer).at("ending copy command buffer")?;
  device.queue_submit(transfer.queue, &[transfer.command_buffer]).at("submitting buffer copies")?;
  device.queue_wait_idle(transfer.queue).at("waiting for transfer queue")?;
  Ok(())
}
