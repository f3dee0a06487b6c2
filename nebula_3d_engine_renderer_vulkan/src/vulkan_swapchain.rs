/// Swapchain creation and rebuild
///
/// Presentation state only: the swapchain handle, its images and views, and
/// the negotiated format/extent/present mode. Synchronization objects and
/// framebuffers live with the frame ring and the renderer.

use ash::vk;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::{engine_bail, engine_debug, engine_err};

use crate::vulkan_device::QueueFamilies;

/// Hard ceiling on swapchain image count, regardless of what the surface
/// capabilities report
pub const MAX_SWAPCHAIN_IMAGES: u32 = 16;

/// Pick the surface format, preferring BGRA8 sRGB
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or(formats[0])
}

/// Pick the present mode: mailbox when available, else FIFO (always present)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Resolve the swapchain extent from the surface capabilities
///
/// Most platforms pin `current_extent` to the window size; the `u32::MAX`
/// sentinel means the surface lets us choose, clamped to its bounds.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Negotiate the image count for a present mode
///
/// Mailbox wants a spare image to cycle into (3), FIFO variants double
/// buffer (2), immediate needs only one. The result is raised to the
/// surface minimum and clamped to its maximum when one is reported.
pub fn choose_image_count(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    present_mode: vk::PresentModeKHR,
) -> u32 {
    let preferred = match present_mode {
        vk::PresentModeKHR::MAILBOX => 3,
        vk::PresentModeKHR::FIFO | vk::PresentModeKHR::FIFO_RELAXED => 2,
        vk::PresentModeKHR::IMMEDIATE => 1,
        _ => 2,
    };

    let mut count = preferred.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }
    count.min(MAX_SWAPCHAIN_IMAGES)
}

/// Image sharing setup for the negotiated queue families
///
/// A split graphics/present pair needs CONCURRENT access so the present
/// queue sees defined image contents without ownership transfers; a single
/// family keeps EXCLUSIVE.
pub fn choose_sharing(families: QueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if families.graphics == families.present {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![families.graphics, families.present],
        )
    }
}

/// Reject driver image counts above the ceiling the frame arrays assume
///
/// The driver may return more images than the requested minimum; the count
/// retrieved after creation is the one that has to honor the ceiling.
pub fn check_image_count(count: usize) -> Result<()> {
    if count as u32 > MAX_SWAPCHAIN_IMAGES {
        engine_bail!(
            "nebula3d::vulkan",
            "Swapchain returned {} images, ceiling is {}",
            count,
            MAX_SWAPCHAIN_IMAGES
        );
    }
    Ok(())
}

pub struct Swapchain {
    loader: ash::khr::swapchain::Device,
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        families: QueueFamilies,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let loader = ash::khr::swapchain::Device::new(instance, device);
        let mut swapchain = Self {
            loader,
            handle: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
        };
        swapchain.rebuild(
            device,
            physical_device,
            surface_loader,
            surface,
            families,
            width,
            height,
        )?;
        Ok(swapchain)
    }

    /// (Re)create the swapchain for the current surface state
    ///
    /// The old swapchain is handed to the driver through `old_swapchain` so
    /// in-flight presents can finish, then destroyed. The caller must wait
    /// for the device to go idle first.
    pub fn rebuild(
        &mut self,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        families: QueueFamilies,
        width: u32,
        height: u32,
    ) -> Result<()> {
        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to get surface capabilities: {:?}", e))?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to get surface formats: {:?}", e))?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to get present modes: {:?}", e))?;

            if formats.is_empty() || present_modes.is_empty() {
                engine_bail!("nebula3d::vulkan", "Surface reports no formats or present modes");
            }

            let surface_format = choose_surface_format(&formats);
            let present_mode = choose_present_mode(&present_modes);
            let extent = choose_extent(&capabilities, width, height);
            let image_count = choose_image_count(&capabilities, present_mode);
            let (sharing_mode, sharing_indices) = choose_sharing(families);

            let old_swapchain = self.handle;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(sharing_mode)
                .queue_family_indices(&sharing_indices)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let handle = self
                .loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create swapchain: {:?}", e))?;

            // Old views and swapchain are only released once the replacement
            // exists, so a failed rebuild leaves the previous chain intact
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            self.image_views.clear();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(old_swapchain, None);
            }

            self.handle = handle;
            self.format = surface_format.format;
            self.color_space = surface_format.color_space;
            self.extent = extent;
            self.present_mode = present_mode;

            self.images = self
                .loader
                .get_swapchain_images(handle)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to get swapchain images: {:?}", e))?;
            check_image_count(self.images.len())?;

            for &image in &self.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = device
                    .create_image_view(&view_info, None)
                    .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create swapchain image view: {:?}", e))?;
                self.image_views.push(view);
            }

            engine_debug!(
                "nebula3d::vulkan",
                "Swapchain: {} images, {:?} {:?}, {}x{}",
                self.images.len(),
                self.format,
                self.present_mode,
                extent.width,
                extent.height
            );

            Ok(())
        }
    }

    /// Acquire the next image, signalling the given semaphore
    pub fn acquire(&self, semaphore: vk::Semaphore) -> ash::prelude::VkResult<(u32, bool)> {
        unsafe {
            self.loader
                .acquire_next_image(self.handle, u64::MAX, semaphore, vk::Fence::null())
        }
    }

    /// Present one image on the given queue
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> ash::prelude::VkResult<bool> {
        unsafe {
            let swapchains = [self.handle];
            let image_indices = [image_index];
            let wait_semaphores = [wait_semaphore];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            self.loader.queue_present(queue, &present_info)
        }
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            self.image_views.clear();
            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
                self.handle = vk::SwapchainKHR::null();
            }
            self.images.clear();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
