/// Physical device selection and logical device creation
///
/// A device is suitable when it has a graphics queue family, a queue family
/// that can present to the surface, the swapchain extension, and at least
/// one surface format and present mode. Discrete GPUs win over integrated
/// ones; otherwise the first suitable device is taken.

use ash::vk;
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::{engine_debug, engine_err, engine_info};

/// Queue family indices for rendering and presentation (may be the same)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// Find graphics and present queue families
///
/// Prefers a single family that can do both; falls back to any family with
/// present support for the present side.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> bool,
) -> Option<QueueFamilies> {
    let graphics = families
        .iter()
        .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;

    if supports_present(graphics) {
        return Some(QueueFamilies {
            graphics,
            present: graphics,
        });
    }

    let present = (0..families.len() as u32).find(|&i| supports_present(i))?;
    Some(QueueFamilies { graphics, present })
}

/// Highest sample count supported by both color and depth framebuffers
pub fn max_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts =
        limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;
    for candidate in [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ] {
        if counts.contains(candidate) {
            return candidate;
        }
    }
    vk::SampleCountFlags::TYPE_1
}

/// Depth attachment format candidates, in preference order
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// First depth format the predicate accepts, in preference order
pub fn pick_depth_format(mut supported: impl FnMut(vk::Format) -> bool) -> Option<vk::Format> {
    DEPTH_FORMAT_CANDIDATES.into_iter().find(|&f| supported(f))
}

/// Query the device for a depth format usable as an optimal-tiling
/// depth/stencil attachment
pub fn find_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<vk::Format> {
    pick_depth_format(|format| unsafe {
        let properties = instance.get_physical_device_format_properties(physical_device, format);
        properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
    .ok_or_else(|| {
        Error::NoSuitableDevice("No supported depth attachment format".to_string())
    })
}

/// The chosen physical device and everything queried off it during selection
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: QueueFamilies,
    pub msaa_samples: vk::SampleCountFlags,
}

impl DeviceSelection {
    pub fn device_name(&self) -> String {
        self.properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown device".to_string())
    }
}

/// Pick a physical device that can render to the surface
pub fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<DeviceSelection> {
    unsafe {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to enumerate physical devices: {:?}", e))?;

        if physical_devices.is_empty() {
            return Err(Error::NoSuitableDevice(
                "No Vulkan-capable GPU found".to_string(),
            ));
        }

        let mut fallback: Option<DeviceSelection> = None;

        for physical_device in physical_devices {
            let Some(selection) =
                evaluate_device(instance, surface_loader, surface, physical_device)
            else {
                continue;
            };

            if selection.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                return Ok(selection);
            }
            if fallback.is_none() {
                fallback = Some(selection);
            }
        }

        fallback.ok_or_else(|| {
            Error::NoSuitableDevice(
                "No GPU with graphics+present queues and swapchain support".to_string(),
            )
        })
    }
}

/// Check one device against the suitability requirements
fn evaluate_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Option<DeviceSelection> {
    unsafe {
        let families = instance.get_physical_device_queue_family_properties(physical_device);
        let queue_families = find_queue_families(&families, |index| {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .unwrap_or(false)
        })?;

        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .ok()?;
        let has_swapchain = extensions.iter().any(|ext| {
            ext.extension_name_as_c_str()
                .map(|name| name == ash::khr::swapchain::NAME)
                .unwrap_or(false)
        });
        if !has_swapchain {
            return None;
        }

        let formats = surface_loader
            .get_physical_device_surface_formats(physical_device, surface)
            .ok()?;
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface)
            .ok()?;
        if formats.is_empty() || present_modes.is_empty() {
            return None;
        }

        let properties = instance.get_physical_device_properties(physical_device);
        let selection = DeviceSelection {
            physical_device,
            memory_properties: instance.get_physical_device_memory_properties(physical_device),
            features: instance.get_physical_device_features(physical_device),
            queue_families,
            msaa_samples: max_sample_count(&properties.limits),
            properties,
        };

        engine_debug!(
            "nebula3d::vulkan",
            "Candidate device: {} (graphics family {}, present family {}, {:?} MSAA)",
            selection.device_name(),
            selection.queue_families.graphics,
            selection.queue_families.present,
            selection.msaa_samples
        );

        Some(selection)
    }
}

/// Create the logical device with the optional features the hardware offers
///
/// Returns the device plus the graphics and present queues.
pub fn create_logical_device(
    instance: &ash::Instance,
    selection: &DeviceSelection,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    unsafe {
        let mut unique_families = vec![selection.queue_families.graphics];
        if selection.queue_families.present != selection.queue_families.graphics {
            unique_families.push(selection.queue_families.present);
        }

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        // Enable exactly the optional features present on the hardware
        let enabled_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(selection.features.sampler_anisotropy == vk::TRUE)
            .sample_rate_shading(selection.features.sample_rate_shading == vk::TRUE)
            .wide_lines(selection.features.wide_lines == vk::TRUE)
            .fill_mode_non_solid(selection.features.fill_mode_non_solid == vk::TRUE);

        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&enabled_features);

        let device = instance
            .create_device(selection.physical_device, &device_info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create logical device: {:?}", e))?;

        let graphics_queue = device.get_device_queue(selection.queue_families.graphics, 0);
        let present_queue = device.get_device_queue(selection.queue_families.present, 0);

        engine_info!(
            "nebula3d::vulkan",
            "Logical device created on {}",
            selection.device_name()
        );

        Ok((device, graphics_queue, present_queue))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
