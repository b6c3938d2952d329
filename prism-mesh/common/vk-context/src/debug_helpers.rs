use ash::vk;
use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr};

unsafe fn lossy_c_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
  if ptr.is_null() {
    Cow::from("")
  } else {
    CStr::from_ptr(ptr).to_string_lossy()
  }
}

fn log_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
  if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
    log::Level::Error
  } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
    log::Level::Warn
  } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
    log::Level::Debug
  } else {
    log::Level::Trace
  }
}

unsafe extern "system" fn vulkan_debug_callback(
  message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
  message_type: vk::DebugUtilsMessageTypeFlagsEXT,
  p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
  _user_data: *mut c_void,
) -> vk::Bool32 {
  let callback_data = &*p_callback_data;
  log::log!(
    target: "vulkan",
    log_level(message_severity),
    "{message_type:?} [{} ({})] : {}",
    lossy_c_str(callback_data.p_message_id_name),
    callback_data.message_id_number,
    lossy_c_str(callback_data.p_message)
  );
  vk::FALSE
}

pub fn make_debug_mgr_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
  vk::DebugUtilsMessengerCreateInfoEXT::default()
    .message_severity(
      vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
    )
    .message_type(
      vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
    )
    .pfn_user_callback(Some(vulkan_debug_callback))
}
