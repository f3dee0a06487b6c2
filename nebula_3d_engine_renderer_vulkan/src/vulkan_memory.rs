/// GPU memory selection and transfer primitives
///
/// Backs every upload path in the backend: memory type negotiation against
/// the device's memory heaps, one-shot command buffer submission, and the
/// fixed image layout transition table used by texture uploads.

use ash::vk;
use nebula_3d_engine::engine_err;
use nebula_3d_engine::nebula3d::{Error, Result};

/// Find the first memory type matching the requirement bitmask and the
/// requested property flags
///
/// The first superset match wins, mirroring how the memory types are
/// ordered by the driver (device-local heaps first).
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32> {
    for i in 0..memory_properties.memory_type_count {
        let allowed = type_filter & (1 << i) != 0;
        let flags = memory_properties.memory_types[i as usize].property_flags;
        if allowed && flags.contains(required) {
            return Ok(i);
        }
    }
    Err(Error::NoCompatibleMemoryType)
}

/// Number of mip levels for a full chain down to 1x1
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height) as f32).log2().floor() as u32 + 1
}

/// Access and stage masks for one image layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier masks for the transitions the upload path performs
///
/// Only the two transitions used by texture uploads are supported; anything
/// else is a programming error and is rejected.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<TransitionMasks> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => Err(Error::UnsupportedLayoutTransition(format!(
            "{:?} -> {:?}",
            old_layout, new_layout
        ))),
    }
}

/// Begin a one-shot command buffer allocated from the given pool
pub fn begin_single_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
) -> Result<vk::CommandBuffer> {
    unsafe {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to allocate transfer command buffer: {:?}", e))?[0];

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to begin transfer command buffer: {:?}", e))?;

        Ok(command_buffer)
    }
}

/// Submit a one-shot command buffer and block until the queue drains
pub fn end_single_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
) -> Result<()> {
    unsafe {
        device
            .end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to end transfer command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        device
            .queue_submit(queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to submit transfer commands: {:?}", e))?;
        device
            .queue_wait_idle(queue)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to wait for transfer queue: {:?}", e))?;

        device.free_command_buffers(command_pool, &command_buffers);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_memory_tests.rs"]
mod tests;
