use crate::StagingError;
use vk_context::ash::vk;

/// Index of the first memory type allowed by `type_bits` whose property flags
/// contain every flag in `flags`.
pub fn find_memory_type(
  memory_properties: &vk::PhysicalDeviceMemoryProperties,
  type_bits: u32,
  flags: vk::MemoryPropertyFlags,
) -> Result<u32, StagingError> {
  let mut candidate_bits = type_bits;
  let memory_types =
    memory_properties.memory_types.iter().take(memory_properties.memory_type_count as usize);
  for (index, memory_type) in memory_types.enumerate() {
    if candidate_bits & 1 == 1 && memory_type.property_flags.contains(flags) {
      return Ok(index as u32);
    }
    candidate_bits >>= 1;
  }
  Err(StagingError::NoMatchingMemoryType { type_bits, flags })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mock::memory_properties_with;

  const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw()
      | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
  );

  #[test]
  fn picks_first_qualifying_type() {
    let props = memory_properties_with(&[
      vk::MemoryPropertyFlags::DEVICE_LOCAL,
      HOST,
      HOST | vk::MemoryPropertyFlags::HOST_CACHED,
    ]);
    assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(), 0);
    assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap(), 1);
    assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::HOST_CACHED).unwrap(), 2);
  }

  #[test]
  fn respects_type_bits() {
    let props = memory_properties_with(&[HOST, vk::MemoryPropertyFlags::DEVICE_LOCAL, HOST]);
    assert_eq!(find_memory_type(&props, 0b100, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap(), 2);
  }

  #[test]
  fn missing_type_is_an_error_not_index_zero() {
    let props = memory_properties_with(&[HOST, HOST]);
    let err = find_memory_type(&props, 0b11, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap_err();
    assert!(matches!(
      err,
      StagingError::NoMatchingMemoryType { type_bits: 0b11, flags }
        if flags == vk::MemoryPropertyFlags::DEVICE_LOCAL
    ));
    // allowed bit points at a type that lacks the flags
    let props = memory_properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, HOST]);
    assert!(find_memory_type(&props, 0b01, vk::MemoryPropertyFlags::HOST_VISIBLE).is_err());
  }

  #[test]
  fn bits_past_the_type_count_are_ignored() {
    let props = memory_properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
    assert!(find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL).is_err());
  }

  #[test]
  fn oversized_type_count_is_clamped_to_the_table() {
    let mut props = memory_properties_with(&[HOST]);
    props.memory_type_count = vk::MAX_MEMORY_TYPES as u32 + 1;
    let device_local = find_memory_type(&props, u32::MAX, vk::MemoryPropertyFlags::DEVICE_LOCAL);
    assert!(matches!(device_local, Err(StagingError::NoMatchingMemoryType { .. })));
    let host = find_memory_type(&props, u32::MAX, vk::MemoryPropertyFlags::HOST_VISIBLE);
    assert_eq!(host.unwrap(), 0);
  }
}
