/// Raw Vulkan buffer with bound device memory
///
/// Memory is allocated directly from the device with the memory type chosen
/// by [`find_memory_type`]. Host-visible buffers are written through a
/// map/copy/unmap cycle; device-local buffers are filled by staging copies.

use ash::vk;
use nebula_3d_engine::engine_err;
use nebula_3d_engine::nebula3d::Result;

use crate::vulkan_memory::{
    begin_single_time_commands, end_single_time_commands, find_memory_type,
};

pub struct Buffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

impl Buffer {
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create buffer: {:?}", e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let memory_type = match find_memory_type(
                memory_properties,
                requirements.memory_type_bits,
                properties,
            ) {
                Ok(index) => index,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let alloc_info = vk::MemoryAllocateInfo::default()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type);

            let memory = match device.allocate_memory(&alloc_info, None) {
                Ok(memory) => memory,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(engine_err!("nebula3d::vulkan", "Failed to allocate buffer memory: {:?}", e));
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
                device.free_memory(memory, None);
                device.destroy_buffer(buffer, None);
                return Err(engine_err!("nebula3d::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Self { buffer, memory, size })
        }
    }

    /// Write bytes into a host-visible buffer
    pub fn upload_bytes(&self, device: &ash::Device, bytes: &[u8]) -> Result<()> {
        unsafe {
            let mapped = device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to map buffer memory: {:?}", e))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped as *mut u8, bytes.len());
            device.unmap_memory(self.memory);
            Ok(())
        }
    }

    /// Write a slice of plain-old-data values into a host-visible buffer
    pub fn upload<T: bytemuck::Pod>(&self, device: &ash::Device, data: &[T]) -> Result<()> {
        self.upload_bytes(device, bytemuck::cast_slice(data))
    }

    /// Refill an existing device-local buffer through a staging copy; the
    /// data must fit the buffer and the GPU must be done with it
    pub fn staged_update<T: bytemuck::Pod>(
        &self,
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: vk::CommandPool,
        queue: vk::Queue,
        data: &[T],
    ) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let size = bytes.len() as vk::DeviceSize;

        let mut staging = Buffer::new(
            device,
            memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let result = staging
            .upload_bytes(device, bytes)
            .and_then(|_| copy_buffer(device, command_pool, queue, &staging, self, size));
        staging.destroy(device);
        result
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.buffer != vk::Buffer::null() {
                device.destroy_buffer(self.buffer, None);
                self.buffer = vk::Buffer::null();
            }
            if self.memory != vk::DeviceMemory::null() {
                device.free_memory(self.memory, None);
                self.memory = vk::DeviceMemory::null();
            }
        }
    }
}

/// Copy between buffers through a one-shot command buffer
pub fn copy_buffer(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    src: &Buffer,
    dst: &Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    let command_buffer = begin_single_time_commands(device, command_pool)?;
    unsafe {
        let region = vk::BufferCopy::default().size(size);
        device.cmd_copy_buffer(command_buffer, src.buffer, dst.buffer, &[region]);
    }
    end_single_time_commands(device, command_pool, queue, command_buffer)
}
