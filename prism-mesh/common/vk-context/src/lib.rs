mod debug_helpers;
pub mod vk_init_helpers;

use std::sync::Arc;

pub use ash;
pub use ash::ext;
pub use ash::vk;

pub struct VkLoaders {
  pub dbg_utils: Option<(ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
  pub vk_driver: ash::Instance,
  _loader: ash::Entry,
}

impl VkLoaders {
  /// Loads Vulkan and creates a surface-less instance. `validation` turns on
  /// the Khronos validation layer and routes its messages to `log`.
  pub fn new(validation: bool) -> Result<Self, String> {
    let mut layers = vec![];
    let mut instance_extensions = vec![];
    if validation {
      layers.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
      instance_extensions.push(ext::debug_utils::NAME.as_ptr());
    }
    #[cfg(target_os = "macos")]
    instance_extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());

    unsafe {
      let loader = ash::Entry::load().map_err(|e| format!("vulkan load failed: {e}"))?;
      let vk_driver = vk_init_helpers::make_instance(&loader, layers, instance_extensions)?;

      let dbg_utils = if validation {
        let dbg_utils_driver = ext::debug_utils::Instance::new(&loader, &vk_driver);
        match dbg_utils_driver
          .create_debug_utils_messenger(&debug_helpers::make_debug_mgr_create_info(), None)
        {
          Ok(dbg_messenger) => Some((dbg_utils_driver, dbg_messenger)),
          Err(e) => {
            vk_driver.destroy_instance(None);
            return Err(format!("debug messenger init failed: {e}"));
          }
        }
      } else {
        None
      };

      Ok(Self { dbg_utils, vk_driver, _loader: loader })
    }
  }
}

impl Drop for VkLoaders {
  fn drop(&mut self) {
    unsafe {
      if let Some((dbg_utils_driver, dbg_messenger)) = self.dbg_utils.take() {
        dbg_utils_driver.destroy_debug_utils_messenger(dbg_messenger, None);
      }
      self.vk_driver.destroy_instance(None);
    }
  }
}

/// Logical device plus the queues and memory table needed for buffer uploads.
pub struct VkContext {
  pub device: ash::Device,
  pub graphics_q: vk::Queue,
  pub transfer_q: vk::Queue,
  pub gpu: vk::PhysicalDevice,
  pub gpu_name: String,
  pub graphics_q_idx: u32,
  pub transfer_q_idx: u32,
  pub memory_properties: vk::PhysicalDeviceMemoryProperties,
  pub vk_loaders: Arc<VkLoaders>,
}

impl VkContext {
  unsafe fn select_gpu(
    vk_driver: &ash::Instance,
    preferred_gpu: Option<(u32, u32)>,
  ) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceProperties, [u32; 2]), String> {
    let gpu_list =
      vk_driver.enumerate_physical_devices().map_err(|e| format!("can't get GPU list: {e}"))?;
    let gpu_infos = gpu_list
      .into_iter()
      .filter_map(|gpu| {
        let gpu_info = vk_driver.get_physical_device_properties(gpu);
        let gpu_queue_info = vk_driver.get_physical_device_queue_family_properties(gpu);
        vk_init_helpers::select_g_t_queue_ids(&gpu_queue_info)
          .map(|gpu_queue_ids| (gpu, gpu_info, gpu_queue_ids))
      })
      .collect::<Vec<_>>();

    let preferred = preferred_gpu.and_then(|(vendor_id, device_id)| {
      gpu_infos
        .iter()
        .find(|(_, info, _)| info.vendor_id == vendor_id && info.device_id == device_id)
    });
    if preferred_gpu.is_some() && preferred.is_none() {
      log::warn!("preferred GPU {preferred_gpu:x?} not found, using the first supported one");
    }
    preferred.or(gpu_infos.first()).cloned().ok_or("no supported GPU".to_string())
  }

  pub fn new(
    vk_loaders: Arc<VkLoaders>,
    preferred_gpu: Option<(u32, u32)>,
  ) -> Result<Self, String> {
    unsafe {
      let (gpu, gpu_info, queue_ids) = Self::select_gpu(&vk_loaders.vk_driver, preferred_gpu)?;
      let gpu_name = gpu_info
        .device_name_as_c_str()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_default();
      let memory_properties = vk_loaders.vk_driver.get_physical_device_memory_properties(gpu);
      let (device, queues) = vk_init_helpers::create_device_and_queues(
        &vk_loaders.vk_driver,
        gpu,
        vec![],
        vk::PhysicalDeviceFeatures::default(),
        queue_ids,
      )?;
      log::info!(
        "using GPU {gpu_name} (graphics family {}, transfer family {})",
        queue_ids[0],
        queue_ids[1]
      );
      Ok(Self {
        device,
        graphics_q: queues[0],
        transfer_q: queues[1],
        gpu,
        gpu_name,
        graphics_q_idx: queue_ids[0],
        transfer_q_idx: queue_ids[1],
        memory_properties,
        vk_loaders,
      })
    }
  }
}

impl Drop for VkContext {
  fn drop(&mut self) {
    unsafe {
      self.device.destroy_device(None);
    }
  }
}
