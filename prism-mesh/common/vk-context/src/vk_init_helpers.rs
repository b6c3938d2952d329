use ash::vk;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ffi::c_char;

pub unsafe fn make_instance(
  driver: &ash::Entry,
  needed_layers: Vec<*const c_char>,
  needed_extensions: Vec<*const c_char>,
) -> Result<ash::Instance, String> {
  let app_info = vk::ApplicationInfo::default()
    .application_name(c"Prism Mesh Loader")
    .application_version(0)
    .engine_name(c"Prism Engine")
    .engine_version(0)
    .api_version(vk::API_VERSION_1_0);

  let instance_create_info = vk::InstanceCreateInfo::default()
    .application_info(&app_info)
    .enabled_extension_names(&needed_extensions[..])
    .enabled_layer_names(&needed_layers[..]);

  #[cfg(target_os = "macos")]
  let instance_create_info =
    instance_create_info.flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR);

  driver
    .create_instance(&instance_create_info, None)
    .map_err(|e| format!("at instance create: {e}"))
}

/// Graphics family with the most queues. Ties go to the lower family index.
pub fn select_g_queue(gpu_queue_props: &[vk::QueueFamilyProperties]) -> Option<u32> {
  gpu_queue_props
    .iter()
    .enumerate()
    .filter(|(_, props)| props.queue_flags.contains(vk::QueueFlags::GRAPHICS))
    .max_by_key(|(idx, props)| (props.queue_count, Reverse(*idx)))
    .map(|(idx, _)| idx as u32)
}

/// Rank of a family for copy work, `None` if it can't run transfers.
/// Graphics and compute families always accept transfer commands.
fn transfer_weight(flags: vk::QueueFlags) -> Option<u32> {
  let graphics = flags.contains(vk::QueueFlags::GRAPHICS);
  let compute = flags.contains(vk::QueueFlags::COMPUTE);
  if !(graphics || compute || flags.contains(vk::QueueFlags::TRANSFER)) {
    return None;
  }
  Some(1 + if graphics { 0 } else { 2 } + if compute { 0 } else { 1 })
}

/// Prefers a dedicated transfer family, then one without graphics, then the
/// family with more queues.
pub fn select_t_queue(gpu_queue_props: &[vk::QueueFamilyProperties]) -> Option<u32> {
  gpu_queue_props
    .iter()
    .enumerate()
    .filter_map(|(idx, props)| {
      transfer_weight(props.queue_flags).map(|weight| (idx, weight, props.queue_count))
    })
    .max_by_key(|(idx, weight, queue_count)| (*weight, *queue_count, Reverse(*idx)))
    .map(|(idx, _, _)| idx as u32)
}

pub fn select_g_t_queue_ids(gpu_queue_props: &[vk::QueueFamilyProperties]) -> Option<[u32; 2]> {
  Some([select_g_queue(gpu_queue_props)?, select_t_queue(gpu_queue_props)?])
}

/// Creates a device with one queue per requested family index. Repeated
/// families get distinct queues while the family has them, then share the last.
pub unsafe fn create_device_and_queues<const N: usize>(
  instance: &ash::Instance,
  gpu: vk::PhysicalDevice,
  needed_extensions: Vec<*const c_char>,
  features: vk::PhysicalDeviceFeatures,
  queue_indices: [u32; N],
) -> Result<(ash::Device, [vk::Queue; N]), String> {
  let gpu_queue_props = instance.get_physical_device_queue_family_properties(gpu);

  // family -> queue slot of each request
  let mut family_use = BTreeMap::<u32, u32>::new();
  let mut slots = [0u32; N];
  for (slot, family) in slots.iter_mut().zip(queue_indices) {
    let available = gpu_queue_props
      .get(family as usize)
      .map(|x| x.queue_count)
      .ok_or_else(|| format!("queue family {family} does not exist"))?;
    let used = family_use.entry(family).or_insert(0);
    *slot = (*used).min(available.saturating_sub(1));
    *used += 1;
  }

  let queue_priorities = [1.0f32; N];
  let queue_create_infos = family_use
    .iter()
    .map(|(family, used)| {
      let count = (*used).min(gpu_queue_props[*family as usize].queue_count) as usize;
      vk::DeviceQueueCreateInfo::default()
        .queue_family_index(*family)
        .queue_priorities(&queue_priorities[..count])
    })
    .collect::<Vec<_>>();
  let device_create_info = vk::DeviceCreateInfo::default()
    .queue_create_infos(&queue_create_infos)
    .enabled_extension_names(&needed_extensions)
    .enabled_features(&features);

  let device = instance
    .create_device(gpu, &device_create_info, None)
    .map_err(|e| format!("at logic device init: {e}"))?;

  let mut queues = [vk::Queue::null(); N];
  for ((queue, family), slot) in queues.iter_mut().zip(queue_indices).zip(slots) {
    *queue = device.get_device_queue(family, slot);
  }
  Ok((device, queues))
}
