/// Per-frame GPU resources and the frame-in-flight ring
///
/// One `Frame` exists per swapchain image: a command pool with one primary
/// command buffer, a fence (created signalled so the first wait passes), a
/// host-visible uniform buffer, and the descriptor set binding it. The
/// whole set is rebuilt with the swapchain. Semaphore pairs cycle on their
/// own index, decoupled from the frame index, so an acquire that never
/// reached present does not reuse a signalled semaphore.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use nebula_3d_engine::engine_err;
use nebula_3d_engine::glam::{Mat4, Vec4};
use nebula_3d_engine::nebula3d::Result;

use crate::vulkan_buffer::Buffer;

/// Per-frame uniform block (std140 layout)
///
/// Matches the `FrameUniforms` block declared at binding 0 of descriptor
/// set 0 in every vertex shader of the pipeline set.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub light_position: Vec4,
    pub view_position: Vec4,
}

impl FrameUniforms {
    /// Build the block for one frame; the camera position falls out of the
    /// inverted view matrix
    pub fn new(view: Mat4, projection: Mat4, light_position: Vec4) -> Self {
        let view_position = view.inverse().w_axis;
        Self {
            view,
            projection,
            light_position,
            view_position,
        }
    }
}

/// Advance a ring index
pub fn next_ring_index(index: usize, count: usize) -> usize {
    (index + 1) % count
}

/// Semaphores tying one acquire/submit/present cycle together
pub struct SemaphorePair {
    /// Signalled when the acquired image is ready to be rendered to
    pub image_available: vk::Semaphore,
    /// Signalled when rendering finished; present waits on it
    pub render_finished: vk::Semaphore,
}

impl SemaphorePair {
    pub fn new(device: &ash::Device) -> Result<Self> {
        unsafe {
            let info = vk::SemaphoreCreateInfo::default();
            let image_available = device
                .create_semaphore(&info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create semaphore: {:?}", e))?;
            let render_finished = match device.create_semaphore(&info, None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    device.destroy_semaphore(image_available, None);
                    return Err(engine_err!("nebula3d::vulkan", "Failed to create semaphore: {:?}", e));
                }
            };
            Ok(Self {
                image_available,
                render_finished,
            })
        }
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            self.image_available = vk::Semaphore::null();
            self.render_finished = vk::Semaphore::null();
        }
    }
}

/// Resources owned by one swapchain image's frame slot
pub struct Frame {
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub in_flight_fence: vk::Fence,
    pub uniform_buffer: Buffer,
    pub matrices_set: vk::DescriptorSet,
}

impl Frame {
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        graphics_family: u32,
        descriptor_pool: vk::DescriptorPool,
        matrices_layout: vk::DescriptorSetLayout,
    ) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(graphics_family);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create frame command pool: {:?}", e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to allocate frame command buffer: {:?}", e))?[0];

            // Signalled so the first wait on a fresh frame does not block
            let fence_info =
                vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let in_flight_fence = device
                .create_fence(&fence_info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create frame fence: {:?}", e))?;

            let uniform_buffer = Buffer::new(
                device,
                memory_properties,
                std::mem::size_of::<FrameUniforms>() as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;

            let layouts = [matrices_layout];
            let set_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(descriptor_pool)
                .set_layouts(&layouts);
            let matrices_set = device
                .allocate_descriptor_sets(&set_info)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to allocate matrices descriptor set: {:?}", e))?[0];

            let buffer_info = [vk::DescriptorBufferInfo::default()
                .buffer(uniform_buffer.buffer)
                .offset(0)
                .range(std::mem::size_of::<FrameUniforms>() as vk::DeviceSize)];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(matrices_set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info);
            device.update_descriptor_sets(&[write], &[]);

            Ok(Self {
                command_pool,
                command_buffer,
                in_flight_fence,
                uniform_buffer,
                matrices_set,
            })
        }
    }

    /// Return the matrices set to the pool and destroy everything else;
    /// frames are torn down on every swapchain rebuild, not just shutdown
    pub fn destroy(&mut self, device: &ash::Device, descriptor_pool: vk::DescriptorPool) {
        unsafe {
            if self.matrices_set != vk::DescriptorSet::null() {
                let _ = device.free_descriptor_sets(descriptor_pool, &[self.matrices_set]);
                self.matrices_set = vk::DescriptorSet::null();
            }
            device.destroy_fence(self.in_flight_fence, None);
            self.in_flight_fence = vk::Fence::null();
            device.destroy_command_pool(self.command_pool, None);
            self.command_pool = vk::CommandPool::null();
        }
        self.uniform_buffer.destroy(device);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_frame_tests.rs"]
mod tests;
