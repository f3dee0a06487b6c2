/// Sampled textures and render target attachments
///
/// Texture uploads go staging buffer -> device-local image, then the full
/// mip chain is blitted on the GPU. Formats that cannot be linearly
/// filtered for blitting reject the upload.

use ash::vk;
use nebula_3d_engine::engine_err;
use nebula_3d_engine::nebula3d::resource::TextureData;
use nebula_3d_engine::nebula3d::{Error, Result};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_memory::{
    begin_single_time_commands, end_single_time_commands, find_memory_type, mip_level_count,
    transition_masks,
};

/// Pixel format for all sampled textures
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Everything texture creation needs from the renderer
pub struct TextureUploader<'a> {
    pub device: &'a ash::Device,
    pub memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    /// Format properties of [`TEXTURE_FORMAT`], queried once at init
    pub format_properties: vk::FormatProperties,
    pub command_pool: vk::CommandPool,
    pub queue: vk::Queue,
    /// Max anisotropy to use, `None` when the feature is unavailable
    pub max_anisotropy: Option<f32>,
}

/// A sampled GPU texture with its full mip chain
pub struct Texture {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub mip_levels: u32,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

impl Texture {
    /// Upload an RGBA8 pixel buffer and generate its mip chain
    ///
    /// The caller validates `data` first. Fails with
    /// [`Error::UnsupportedBlitFormat`] when the chain needs blits the
    /// format cannot do.
    pub fn from_data(ctx: &TextureUploader, data: &TextureData) -> Result<Self> {
        let mip_levels = mip_level_count(data.width, data.height);

        if mip_levels > 1
            && !ctx
                .format_properties
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            return Err(Error::UnsupportedBlitFormat(format!(
                "{:?} cannot be linearly filtered for mipmap generation",
                TEXTURE_FORMAT
            )));
        }

        let mut staging = Buffer::new(
            ctx.device,
            ctx.memory_properties,
            data.pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let result = Self::upload_from_staging(ctx, data, &staging, mip_levels);
        staging.destroy(ctx.device);
        result
    }

    fn upload_from_staging(
        ctx: &TextureUploader,
        data: &TextureData,
        staging: &Buffer,
        mip_levels: u32,
    ) -> Result<Self> {
        staging.upload_bytes(ctx.device, &data.pixels)?;

        let (image, memory) = create_image(
            ctx.device,
            ctx.memory_properties,
            data.width,
            data.height,
            mip_levels,
            vk::SampleCountFlags::TYPE_1,
            TEXTURE_FORMAT,
            vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::SAMPLED,
        )?;

        let command_buffer = begin_single_time_commands(ctx.device, ctx.command_pool)?;

        transition_image_layout(
            ctx.device,
            command_buffer,
            image,
            mip_levels,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;

        unsafe {
            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D {
                    width: data.width,
                    height: data.height,
                    depth: 1,
                });
            ctx.device.cmd_copy_buffer_to_image(
                command_buffer,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        generate_mipmaps(
            ctx.device,
            command_buffer,
            image,
            data.width,
            data.height,
            mip_levels,
        );

        end_single_time_commands(ctx.device, ctx.command_pool, ctx.queue, command_buffer)?;

        let view = create_image_view(
            ctx.device,
            image,
            TEXTURE_FORMAT,
            vk::ImageAspectFlags::COLOR,
            mip_levels,
        )?;
        let sampler = create_sampler(ctx.device, mip_levels, ctx.max_anisotropy)?;

        Ok(Self {
            image,
            memory,
            view,
            sampler,
            mip_levels,
            width: data.width,
            height: data.height,
            name: data.name.clone(),
        })
    }

    /// The built-in 1x1 white texture bound to every empty material slot
    pub fn white_1x1(ctx: &TextureUploader) -> Result<Self> {
        let data = TextureData {
            name: "__default_white".to_string(),
            width: 1,
            height: 1,
            pixels: vec![255, 255, 255, 255],
        };
        Self::from_data(ctx, &data)
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_sampler(self.sampler, None);
            self.sampler = vk::Sampler::null();
            device.destroy_image_view(self.view, None);
            self.view = vk::ImageView::null();
            device.destroy_image(self.image, None);
            self.image = vk::Image::null();
            device.free_memory(self.memory, None);
            self.memory = vk::DeviceMemory::null();
        }
    }
}

/// A single-purpose framebuffer attachment (MSAA color or depth)
pub struct AttachmentImage {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
}

impl AttachmentImage {
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let (image, memory) = create_image(
            device,
            memory_properties,
            extent.width,
            extent.height,
            1,
            samples,
            format,
            usage,
        )?;
        let view = create_image_view(device, image, format, aspect, 1)?;
        Ok(Self { image, memory, view })
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_image_view(self.view, None);
            self.view = vk::ImageView::null();
            device.destroy_image(self.image, None);
            self.image = vk::Image::null();
            device.free_memory(self.memory, None);
            self.memory = vk::DeviceMemory::null();
        }
    }
}

fn create_image(
    device: &ash::Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    width: u32,
    height: u32,
    mip_levels: u32,
    samples: vk::SampleCountFlags,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    unsafe {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .samples(samples)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = device
            .create_image(&image_info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create image: {:?}", e))?;

        let requirements = device.get_image_memory_requirements(image);
        let memory_type = match find_memory_type(
            memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ) {
            Ok(index) => index,
            Err(e) => {
                device.destroy_image(image, None);
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = match device.allocate_memory(&alloc_info, None) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image, None);
                return Err(engine_err!("nebula3d::vulkan", "Failed to allocate image memory: {:?}", e));
            }
        };

        device
            .bind_image_memory(image, memory, 0)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to bind image memory: {:?}", e))?;

        Ok((image, memory))
    }
}

fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    mip_levels: u32,
) -> Result<vk::ImageView> {
    unsafe {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });
        device
            .create_image_view(&view_info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create image view: {:?}", e))
    }
}

fn create_sampler(
    device: &ash::Device,
    mip_levels: u32,
    max_anisotropy: Option<f32>,
) -> Result<vk::Sampler> {
    unsafe {
        let mut sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(mip_levels as f32)
            .mip_lod_bias(0.0);

        if let Some(anisotropy) = max_anisotropy {
            sampler_info = sampler_info
                .anisotropy_enable(true)
                .max_anisotropy(anisotropy);
        }

        device
            .create_sampler(&sampler_info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create sampler: {:?}", e))
    }
}

/// Transition all mip levels of an image using the fixed transition table
fn transition_image_layout(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    mip_levels: u32,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<()> {
    let masks = transition_masks(old_layout, new_layout)?;
    unsafe {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access);

        device.cmd_pipeline_barrier(
            command_buffer,
            masks.src_stage,
            masks.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
    Ok(())
}

/// Blit each mip level from the previous one, leaving the whole chain in
/// SHADER_READ_ONLY_OPTIMAL
fn generate_mipmaps(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    width: u32,
    height: u32,
    mip_levels: u32,
) {
    unsafe {
        let mut barrier = vk::ImageMemoryBarrier::default()
            .image(image)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let mut mip_width = width as i32;
        let mut mip_height = height as i32;

        for level in 1..mip_levels {
            // Previous level: TRANSFER_DST -> TRANSFER_SRC for the blit
            barrier.subresource_range.base_mip_level = level - 1;
            barrier.old_layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
            barrier.new_layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
            barrier.src_access_mask = vk::AccessFlags::TRANSFER_WRITE;
            barrier.dst_access_mask = vk::AccessFlags::TRANSFER_READ;
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );

            let next_width = (mip_width / 2).max(1);
            let next_height = (mip_height / 2).max(1);

            let blit = vk::ImageBlit {
                src_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level - 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                src_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: mip_width,
                        y: mip_height,
                        z: 1,
                    },
                ],
                dst_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                dst_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: next_width,
                        y: next_height,
                        z: 1,
                    },
                ],
            };
            device.cmd_blit_image(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );

            // Previous level is done; hand it to the fragment shader
            barrier.old_layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
            barrier.new_layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
            barrier.src_access_mask = vk::AccessFlags::TRANSFER_READ;
            barrier.dst_access_mask = vk::AccessFlags::SHADER_READ;
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );

            mip_width = next_width;
            mip_height = next_height;
        }

        // Last level was only ever a blit destination
        barrier.subresource_range.base_mip_level = mip_levels - 1;
        barrier.old_layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
        barrier.new_layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
        barrier.src_access_mask = vk::AccessFlags::TRANSFER_WRITE;
        barrier.dst_access_mask = vk::AccessFlags::SHADER_READ;
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}
