/// VulkanRenderer - Vulkan implementation of the Renderer trait
///
/// Owns the entire GPU stack: instance, device, swapchain, MSAA render
/// targets, the pipeline set, the frame-in-flight ring, and the mesh and
/// texture registries. One `render()`/`present()` pair per tick drives a
/// frame through acquire, record, submit, and present.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use winit::window::Window;

use nebula_3d_engine::glam::{Mat4, Vec2, Vec4};
use nebula_3d_engine::nebula3d::render::{
    FrameStatus, MeshId, Renderer, RendererConfig, RendererFeatures, RendererStats, ShaderSet,
    TextureId, TriangleId,
};
use nebula_3d_engine::nebula3d::resource::{MaterialData, MeshData, TextureData, Triangle2D, Vertex};
use nebula_3d_engine::nebula3d::utils::SlotAllocator;
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::{engine_bail, engine_err, engine_info, engine_warn};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_device::{self, DeviceSelection, QueueFamilies};
use crate::vulkan_frame::{next_ring_index, Frame, FrameUniforms, SemaphorePair};
use crate::vulkan_pipeline::{
    create_descriptor_pool, create_pipeline_layout, DescriptorLayouts, PipelineParams, PipelineSet,
};
use crate::vulkan_scene::{GeometryStore, SceneMesh, ScenePrimitive, TriangleStore, TwoDVertex};
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::{AttachmentImage, Texture, TextureUploader, TEXTURE_FORMAT};

/// World-space point light fed to the per-frame uniform block
const LIGHT_POSITION: Vec4 = Vec4::new(2.0, 4.0, 2.0, 1.0);

/// Offscreen attachments the render pass draws into
struct RenderTargets {
    /// Multisampled color; absent when rendering single-sampled straight
    /// into the swapchain image
    color: Option<AttachmentImage>,
    depth: AttachmentImage,
}

impl RenderTargets {
    fn destroy(&mut self, device: &ash::Device) {
        if let Some(color) = &mut self.color {
            color.destroy(device);
        }
        self.color = None;
        self.depth.destroy(device);
    }
}

/// Device-local buffers shared by every mesh, grown in powers of two and
/// refilled through staging copies when the geometry store changes
struct GeometryBuffers {
    vertex: Buffer,
    index: Buffer,
    /// Capacity in vertices, not bytes
    vertex_capacity: usize,
    index_capacity: usize,
}

impl GeometryBuffers {
    fn destroy(&mut self, device: &ash::Device) {
        self.vertex.destroy(device);
        self.index.destroy(device);
    }
}

pub struct VulkanRenderer {
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,

    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    texture_format_properties: vk::FormatProperties,
    msaa_samples: vk::SampleCountFlags,
    renderer_features: RendererFeatures,
    max_anisotropy: Option<f32>,

    device: ash::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilies,

    swapchain: Swapchain,
    depth_format: vk::Format,
    render_pass: vk::RenderPass,
    targets: RenderTargets,
    framebuffers: Vec<vk::Framebuffer>,

    descriptor_pool: vk::DescriptorPool,
    layouts: DescriptorLayouts,
    pipeline_layout: vk::PipelineLayout,
    pipelines: PipelineSet,
    shaders: ShaderSet,

    /// One slot per swapchain image, rebuilt with the swapchain; the
    /// acquired image index selects the slot
    frames: Vec<Frame>,
    semaphores: Vec<SemaphorePair>,
    frame_index: usize,
    semaphore_index: usize,

    meshes: FxHashMap<MeshId, SceneMesh>,
    mesh_ids: SlotAllocator,
    geometry: GeometryStore,
    geometry_buffers: Option<GeometryBuffers>,
    textures: FxHashMap<TextureId, Texture>,
    texture_ids: SlotAllocator,
    white_texture: Texture,

    triangles: TriangleStore,
    triangle_vertices: Vec<TwoDVertex>,
    /// One host-visible vertex buffer per frame slot, grown on demand
    triangle_buffers: Vec<Option<(Buffer, usize)>>,

    view_matrix: Mat4,
    projection_matrix: Mat4,

    window_size: (u32, u32),
    minimized: bool,
    resize_pending: bool,
    suboptimal_frame: bool,
    frame_active: bool,
    draw_calls: u32,
    destroyed: bool,
}

impl VulkanRenderer {
    /// Create the Vulkan renderer for a window
    ///
    /// `shaders` carries the precompiled SPIR-V for the pipeline set; the
    /// optional wireframe and metal pipelines are built only when their
    /// bytecode is present (and the hardware cooperates).
    pub fn new(window: &Window, config: RendererConfig, shaders: ShaderSet) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.clone()).map_err(|_| {
                Error::InitializationFailed("Application name contains a NUL byte".to_string())
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Nebula3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| Error::InitializationFailed(format!("Failed to get display handle: {}", e)))?;
            let window_handle = window
                .window_handle()
                .map_err(|e| Error::InitializationFailed(format!("Failed to get window handle: {}", e)))?;

            let mut enable_validation = config.enable_validation;
            if enable_validation {
                let layers = entry
                    .enumerate_instance_layer_properties()
                    .unwrap_or_default();
                let available = layers.iter().any(|layer| {
                    layer
                        .layer_name_as_c_str()
                        .map(|name| name == c"VK_LAYER_KHRONOS_validation")
                        .unwrap_or(false)
                });
                if !available {
                    engine_warn!(
                        "nebula3d::vulkan",
                        "VK_LAYER_KHRONOS_validation not installed, continuing without validation"
                    );
                    enable_validation = false;
                }
            }

            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        Error::InitializationFailed(format!(
                            "Failed to get required instance extensions: {:?}",
                            e
                        ))
                    })?
                    .to_vec();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let debug_utils = if enable_validation {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::vulkan_debug::vulkan_debug_callback));
                let messenger = loader
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| {
                        Error::InitializationFailed(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        ))
                    })?;
                Some((loader, messenger))
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::InitializationFailed(format!("Failed to create surface: {:?}", e)))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let selection = vulkan_device::select_physical_device(&instance, &surface_loader, surface)?;
            let (device, graphics_queue, present_queue) =
                vulkan_device::create_logical_device(&instance, &selection)?;

            let renderer_features = detect_features(&selection);
            let max_anisotropy = if renderer_features.contains(RendererFeatures::SAMPLER_ANISOTROPY)
            {
                Some(selection.properties.limits.max_sampler_anisotropy)
            } else {
                None
            };

            let size = window.inner_size();
            let window_size = (size.width, size.height);

            let swapchain = Swapchain::new(
                &instance,
                &device,
                selection.physical_device,
                &surface_loader,
                surface,
                selection.queue_families,
                window_size.0,
                window_size.1,
            )?;

            let depth_format = vulkan_device::find_depth_format(&instance, selection.physical_device)?;
            let render_pass = create_render_pass(
                &device,
                swapchain.format,
                depth_format,
                selection.msaa_samples,
            )?;
            let targets = create_render_targets(
                &device,
                &selection.memory_properties,
                swapchain.extent,
                swapchain.format,
                depth_format,
                selection.msaa_samples,
            )?;
            let framebuffers = create_framebuffers(&device, render_pass, &swapchain, &targets)?;

            let descriptor_pool = create_descriptor_pool(&device)?;
            let layouts = DescriptorLayouts::new(&device)?;
            let pipeline_layout = create_pipeline_layout(&device, &layouts)?;
            let pipelines = PipelineSet::new(
                &device,
                &shaders,
                &PipelineParams {
                    render_pass,
                    layout: pipeline_layout,
                    samples: selection.msaa_samples,
                    sample_rate_shading: renderer_features
                        .contains(RendererFeatures::SAMPLE_RATE_SHADING),
                    fill_mode_non_solid: renderer_features
                        .contains(RendererFeatures::FILL_MODE_NON_SOLID),
                },
            )?;

            let image_count = swapchain.images.len();
            let mut frames = Vec::with_capacity(image_count);
            for _ in 0..image_count {
                frames.push(Frame::new(
                    &device,
                    &selection.memory_properties,
                    selection.queue_families.graphics,
                    descriptor_pool,
                    layouts.matrices,
                )?);
            }
            let mut semaphores = Vec::with_capacity(image_count);
            for _ in 0..image_count {
                semaphores.push(SemaphorePair::new(&device)?);
            }

            let texture_format_properties =
                instance.get_physical_device_format_properties(selection.physical_device, TEXTURE_FORMAT);
            let white_texture = Texture::white_1x1(&TextureUploader {
                device: &device,
                memory_properties: &selection.memory_properties,
                format_properties: texture_format_properties,
                command_pool: frames[0].command_pool,
                queue: graphics_queue,
                max_anisotropy,
            })?;

            engine_info!(
                "nebula3d::vulkan",
                "Vulkan renderer initialized on {} ({:?} MSAA, {} swapchain images)",
                selection.device_name(),
                selection.msaa_samples,
                swapchain.images.len()
            );

            Ok(Self {
                _entry: entry,
                instance,
                debug_utils,
                surface_loader,
                surface,
                physical_device: selection.physical_device,
                memory_properties: selection.memory_properties,
                texture_format_properties,
                msaa_samples: selection.msaa_samples,
                renderer_features,
                max_anisotropy,
                device,
                graphics_queue,
                present_queue,
                queue_families: selection.queue_families,
                swapchain,
                depth_format,
                render_pass,
                targets,
                framebuffers,
                descriptor_pool,
                layouts,
                pipeline_layout,
                pipelines,
                shaders,
                frames,
                semaphores,
                frame_index: 0,
                semaphore_index: 0,
                meshes: FxHashMap::default(),
                mesh_ids: SlotAllocator::new(),
                geometry: GeometryStore::new(),
                geometry_buffers: None,
                textures: FxHashMap::default(),
                texture_ids: SlotAllocator::new(),
                white_texture,
                triangles: TriangleStore::new(),
                triangle_vertices: Vec::new(),
                triangle_buffers: (0..image_count).map(|_| None).collect(),
                view_matrix: Mat4::IDENTITY,
                projection_matrix: Mat4::IDENTITY,
                window_size,
                minimized: window_size.0 == 0 || window_size.1 == 0,
                resize_pending: false,
                suboptimal_frame: false,
                frame_active: false,
                draw_calls: 0,
                destroyed: false,
            })
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            engine_bail!("nebula3d::vulkan", "Renderer used after cleanup");
        }
        Ok(())
    }

    fn uploader(&self) -> TextureUploader<'_> {
        TextureUploader {
            device: &self.device,
            memory_properties: &self.memory_properties,
            format_properties: self.texture_format_properties,
            command_pool: self.frames[self.frame_index].command_pool,
            queue: self.graphics_queue,
            max_anisotropy: self.max_anisotropy,
        }
    }

    fn allocate_textures_set(&self) -> Result<vk::DescriptorSet> {
        unsafe {
            let layouts = [self.layouts.textures];
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.descriptor_pool)
                .set_layouts(&layouts);
            Ok(self
                .device
                .allocate_descriptor_sets(&info)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to allocate textures descriptor set: {:?}", e))?[0])
        }
    }

    /// Point the four sampler bindings of a set at the material's textures,
    /// substituting the built-in white texture for empty slots
    fn write_material_set(&self, set: vk::DescriptorSet, material: &MaterialData) {
        let image_infos: Vec<[vk::DescriptorImageInfo; 1]> = material
            .texture_slots()
            .iter()
            .map(|slot| {
                let texture = slot
                    .and_then(|id| self.textures.get(&id))
                    .unwrap_or(&self.white_texture);
                [vk::DescriptorImageInfo::default()
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .image_view(texture.view)
                    .sampler(texture.sampler)]
            })
            .collect();
        let writes: Vec<vk::WriteDescriptorSet> = image_infos
            .iter()
            .enumerate()
            .map(|(binding, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(binding as u32)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(info)
            })
            .collect();
        unsafe {
            self.device.update_descriptor_sets(&writes, &[]);
        }
    }

    /// Tear down and recreate everything tied to the surface extent
    fn rebuild_swapchain(&mut self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to wait idle before swapchain rebuild: {:?}", e))?;
            for framebuffer in self.framebuffers.drain(..) {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
        self.targets.destroy(&self.device);
        self.pipelines.destroy(&self.device);
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
            self.render_pass = vk::RenderPass::null();
        }

        let (width, height) = self.window_size;
        self.swapchain.rebuild(
            &self.device,
            self.physical_device,
            &self.surface_loader,
            self.surface,
            self.queue_families,
            width,
            height,
        )?;

        self.render_pass = create_render_pass(
            &self.device,
            self.swapchain.format,
            self.depth_format,
            self.msaa_samples,
        )?;
        self.targets = create_render_targets(
            &self.device,
            &self.memory_properties,
            self.swapchain.extent,
            self.swapchain.format,
            self.depth_format,
            self.msaa_samples,
        )?;
        self.framebuffers =
            create_framebuffers(&self.device, self.render_pass, &self.swapchain, &self.targets)?;
        self.pipelines = PipelineSet::new(
            &self.device,
            &self.shaders,
            &PipelineParams {
                render_pass: self.render_pass,
                layout: self.pipeline_layout,
                samples: self.msaa_samples,
                sample_rate_shading: self
                    .renderer_features
                    .contains(RendererFeatures::SAMPLE_RATE_SHADING),
                fill_mode_non_solid: self
                    .renderer_features
                    .contains(RendererFeatures::FILL_MODE_NON_SOLID),
            },
        )?;

        // One frame slot per image; the new chain may have a different
        // image count, so the whole ring is rebuilt
        let image_count = self.swapchain.images.len();
        for frame in &mut self.frames {
            frame.destroy(&self.device, self.descriptor_pool);
        }
        self.frames.clear();
        for _ in 0..image_count {
            self.frames.push(Frame::new(
                &self.device,
                &self.memory_properties,
                self.queue_families.graphics,
                self.descriptor_pool,
                self.layouts.matrices,
            )?);
        }

        // Semaphores may hold stale signals from acquires that never
        // reached present; start the ring over with fresh ones
        for pair in &mut self.semaphores {
            pair.destroy(&self.device);
        }
        self.semaphores.clear();
        for _ in 0..image_count {
            self.semaphores.push(SemaphorePair::new(&self.device)?);
        }

        for slot in &mut self.triangle_buffers {
            if let Some((mut buffer, _)) = slot.take() {
                buffer.destroy(&self.device);
            }
        }
        self.triangle_buffers = (0..image_count).map(|_| None).collect();

        self.frame_index = 0;
        self.semaphore_index = 0;

        engine_info!(
            "nebula3d::vulkan",
            "Swapchain rebuilt: {}x{}, {} images",
            self.swapchain.extent.width,
            self.swapchain.extent.height,
            self.swapchain.images.len()
        );
        Ok(())
    }

    /// Grow (if needed) and fill the current frame's triangle vertex buffer
    fn prepare_triangle_buffer(&mut self) -> Result<()> {
        let needed = self.triangle_vertices.len();
        if needed == 0 {
            return Ok(());
        }

        let slot = &mut self.triangle_buffers[self.frame_index];
        let needs_realloc = match slot {
            Some((_, capacity)) => *capacity < needed,
            None => true,
        };
        if needs_realloc {
            if let Some((mut buffer, _)) = slot.take() {
                buffer.destroy(&self.device);
            }
            let capacity = needed.next_power_of_two();
            let buffer = Buffer::new(
                &self.device,
                &self.memory_properties,
                (capacity * std::mem::size_of::<TwoDVertex>()) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            *slot = Some((buffer, capacity));
        }
        if let Some((buffer, _)) = &self.triangle_buffers[self.frame_index] {
            buffer.upload(&self.device, &self.triangle_vertices)?;
        }
        Ok(())
    }

    /// Mirror the geometry store into the shared device-local buffers,
    /// growing them when the streams outgrow the current capacity. Callers
    /// must have waited for the GPU first.
    fn upload_geometry(&mut self) -> Result<()> {
        let vertices = self.geometry.vertices();
        let indices = self.geometry.indices();
        if vertices.is_empty() || indices.is_empty() {
            if let Some(mut buffers) = self.geometry_buffers.take() {
                buffers.destroy(&self.device);
            }
            return Ok(());
        }

        let fits = self.geometry_buffers.as_ref().is_some_and(|buffers| {
            buffers.vertex_capacity >= vertices.len() && buffers.index_capacity >= indices.len()
        });
        if !fits {
            if let Some(mut buffers) = self.geometry_buffers.take() {
                buffers.destroy(&self.device);
            }
            let vertex_capacity = vertices.len().next_power_of_two();
            let index_capacity = indices.len().next_power_of_two();
            let mut vertex = Buffer::new(
                &self.device,
                &self.memory_properties,
                (vertex_capacity * std::mem::size_of::<Vertex>()) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )?;
            let index = Buffer::new(
                &self.device,
                &self.memory_properties,
                (index_capacity * std::mem::size_of::<u32>()) as vk::DeviceSize,
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            );
            let index = match index {
                Ok(index) => index,
                Err(e) => {
                    vertex.destroy(&self.device);
                    return Err(e);
                }
            };
            self.geometry_buffers = Some(GeometryBuffers {
                vertex,
                index,
                vertex_capacity,
                index_capacity,
            });
        }

        let command_pool = self.frames[self.frame_index].command_pool;
        if let Some(buffers) = &self.geometry_buffers {
            buffers.vertex.staged_update(
                &self.device,
                &self.memory_properties,
                command_pool,
                self.graphics_queue,
                vertices,
            )?;
            buffers.index.staged_update(
                &self.device,
                &self.memory_properties,
                command_pool,
                self.graphics_queue,
                indices,
            )?;
        }
        Ok(())
    }

    /// Reset the current frame's command pool and record the frame up to
    /// (but not including) the render pass end; `present()` closes and
    /// submits the buffer
    fn record_frame(&mut self) -> Result<()> {
        let device = &self.device;
        let frame = &self.frames[self.frame_index];
        let command_buffer = frame.command_buffer;
        let extent = self.swapchain.extent;
        let mut draw_calls = 0u32;

        unsafe {
            device
                .reset_command_pool(frame.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to reset frame command pool: {:?}", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to begin command buffer: {:?}", e))?;

            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: [0.0, 0.0, 0.0, 1.0],
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                },
            ];
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[self.frame_index])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(
                command_buffer,
                0,
                &[vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                }],
            );
            device.cmd_set_line_width(command_buffer, 1.0);

            if !self.meshes.is_empty() {
                if let Some(buffers) = &self.geometry_buffers {
                    device.cmd_bind_pipeline(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        self.pipelines.default_pipeline,
                    );
                    device.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        self.pipeline_layout,
                        0,
                        &[frame.matrices_set],
                        &[],
                    );
                    device.cmd_bind_vertex_buffers(
                        command_buffer,
                        0,
                        &[buffers.vertex.buffer],
                        &[0],
                    );
                    device.cmd_bind_index_buffer(
                        command_buffer,
                        buffers.index.buffer,
                        0,
                        vk::IndexType::UINT32,
                    );

                    // Stable draw order across frames
                    let mut ids: Vec<MeshId> = self.meshes.keys().copied().collect();
                    ids.sort_unstable();
                    for id in ids {
                        let mesh = &self.meshes[&id];
                        let Some(range) = self.geometry.range(id) else {
                            continue;
                        };
                        device.cmd_push_constants(
                            command_buffer,
                            self.pipeline_layout,
                            vk::ShaderStageFlags::VERTEX,
                            0,
                            bytemuck::bytes_of(&mesh.model_matrix),
                        );
                        for primitive in &mesh.primitives {
                            device.cmd_bind_descriptor_sets(
                                command_buffer,
                                vk::PipelineBindPoint::GRAPHICS,
                                self.pipeline_layout,
                                1,
                                &[primitive.textures_set],
                                &[],
                            );
                            device.cmd_draw_indexed(
                                command_buffer,
                                primitive.index_count,
                                1,
                                range.index_base + primitive.index_offset,
                                range.vertex_base as i32,
                                0,
                            );
                            draw_calls += 1;
                        }
                    }
                }
            }

            if !self.triangle_vertices.is_empty() {
                if let Some((buffer, _)) = &self.triangle_buffers[self.frame_index] {
                    device.cmd_bind_pipeline(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        self.pipelines.two_d,
                    );
                    device.cmd_bind_vertex_buffers(command_buffer, 0, &[buffer.buffer], &[0]);
                    device.cmd_draw(command_buffer, self.triangle_vertices.len() as u32, 1, 0, 0);
                    draw_calls += 1;
                }
            }
        }

        self.draw_calls = draw_calls;
        Ok(())
    }
}

impl Renderer for VulkanRenderer {
    fn render(&mut self) -> Result<FrameStatus> {
        self.ensure_alive()?;
        if self.minimized {
            return Ok(FrameStatus::Minimized);
        }
        if self.resize_pending {
            self.rebuild_swapchain()?;
            self.resize_pending = false;
        }

        let acquire_semaphore = self.semaphores[self.semaphore_index].image_available;
        let (image_index, suboptimal) = match self.swapchain.acquire(acquire_semaphore) {
            Ok(pair) => pair,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                // No command buffer was touched; the same frame is retried
                // after the rebuild
                self.resize_pending = true;
                return Ok(FrameStatus::ResizePending);
            }
            Err(e) => {
                return Err(engine_err!("nebula3d::vulkan", "Failed to acquire swapchain image: {:?}", e))
            }
        };
        // A suboptimal image is still rendered and presented; the rebuild
        // happens next tick
        self.suboptimal_frame = suboptimal;
        self.frame_index = image_index as usize;

        // Block until the GPU is done with this image's prior use. The
        // fence stays signalled until present() is about to resubmit it,
        // so a failure anywhere in between cannot strand the next wait
        let fence = self.frames[self.frame_index].in_flight_fence;
        unsafe {
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to wait for frame fence: {:?}", e))?;
        }

        let uniforms = FrameUniforms::new(self.view_matrix, self.projection_matrix, LIGHT_POSITION);
        self.frames[self.frame_index]
            .uniform_buffer
            .upload(&self.device, &[uniforms])?;

        if self.triangles.take_dirty() {
            self.triangle_vertices = self.triangles.build_vertices();
        }
        self.prepare_triangle_buffer()?;
        self.record_frame()?;

        self.frame_active = true;
        Ok(FrameStatus::Completed)
    }

    fn present(&mut self) -> Result<FrameStatus> {
        self.ensure_alive()?;
        if !self.frame_active {
            return Ok(if self.minimized {
                FrameStatus::Minimized
            } else {
                FrameStatus::ResizePending
            });
        }
        self.frame_active = false;

        let frame = &self.frames[self.frame_index];
        let command_buffer = frame.command_buffer;
        let fence = frame.in_flight_fence;
        let image_available = self.semaphores[self.semaphore_index].image_available;
        let render_finished = self.semaphores[self.semaphore_index].render_finished;

        // The submit always runs, even when a resize landed mid-frame: the
        // acquire semaphore is signalled and has to be consumed
        unsafe {
            self.device.cmd_end_render_pass(command_buffer);
            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to end command buffer: {:?}", e))?;

            let wait_semaphores = [image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let command_buffers = [command_buffer];
            let signal_semaphores = [render_finished];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            // The fence is only unsignalled once the submit that will
            // re-signal it is committed to
            self.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to reset frame fence: {:?}", e))?;
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to submit frame: {:?}", e))?;
        }

        // A suboptimal image is still worth presenting; only an
        // app-initiated resize skips the request
        let was_suboptimal = std::mem::take(&mut self.suboptimal_frame);
        if self.resize_pending {
            // Presenting a stale image is pointless; the swapchain is
            // rebuilt at the top of the next render()
            return Ok(FrameStatus::ResizePending);
        }

        let result = self.swapchain.present(
            self.present_queue,
            self.frame_index as u32,
            render_finished,
        );

        match result {
            Ok(false) => {
                self.frame_index = next_ring_index(self.frame_index, self.frames.len());
                self.semaphore_index = next_ring_index(self.semaphore_index, self.semaphores.len());
                if was_suboptimal {
                    self.resize_pending = true;
                    return Ok(FrameStatus::ResizePending);
                }
                Ok(FrameStatus::Completed)
            }
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.resize_pending = true;
                Ok(FrameStatus::ResizePending)
            }
            Err(e) => Err(engine_err!("nebula3d::vulkan", "Failed to present frame: {:?}", e)),
        }
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to wait idle during cleanup: {:?}", e))?;
        }

        for (_, mesh) in self.meshes.drain() {
            let sets: Vec<vk::DescriptorSet> =
                mesh.primitives.iter().map(|p| p.textures_set).collect();
            unsafe {
                let _ = self.device.free_descriptor_sets(self.descriptor_pool, &sets);
            }
        }
        self.mesh_ids.clear();
        self.geometry.clear();
        if let Some(mut buffers) = self.geometry_buffers.take() {
            buffers.destroy(&self.device);
        }

        for (_, mut texture) in self.textures.drain() {
            texture.destroy(&self.device);
        }
        self.texture_ids.clear();
        self.white_texture.destroy(&self.device);

        self.triangles.clear();
        self.triangle_vertices.clear();
        for slot in &mut self.triangle_buffers {
            if let Some((mut buffer, _)) = slot.take() {
                buffer.destroy(&self.device);
            }
        }

        for frame in &mut self.frames {
            frame.destroy(&self.device, self.descriptor_pool);
        }
        self.frames.clear();
        for pair in &mut self.semaphores {
            pair.destroy(&self.device);
        }
        self.semaphores.clear();

        self.pipelines.destroy(&self.device);
        unsafe {
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
        self.layouts.destroy(&self.device);

        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
        self.targets.destroy(&self.device);
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
        self.swapchain.destroy(&self.device);

        unsafe {
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }

        self.destroyed = true;
        engine_info!("nebula3d::vulkan", "Vulkan renderer destroyed");
        Ok(())
    }

    fn window_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.minimized = true;
        } else {
            self.minimized = false;
            self.resize_pending = true;
            self.window_size = (width, height);
        }
    }

    fn wait_idle(&self) -> Result<()> {
        self.ensure_alive()?;
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn load_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        self.ensure_alive()?;
        mesh.validate()?;
        for primitive in &mesh.primitives {
            for id in primitive.material.texture_slots().into_iter().flatten() {
                if !self.textures.contains_key(&id) {
                    return Err(Error::InvalidResource(format!(
                        "mesh '{}' references texture {} which is not loaded",
                        mesh.name, id
                    )));
                }
            }
        }

        let mut primitives = Vec::with_capacity(mesh.primitives.len());
        for primitive in &mesh.primitives {
            let set = match self.allocate_textures_set() {
                Ok(set) => set,
                Err(e) => {
                    let sets: Vec<vk::DescriptorSet> =
                        primitives.iter().map(|p: &ScenePrimitive| p.textures_set).collect();
                    unsafe {
                        let _ = self.device.free_descriptor_sets(self.descriptor_pool, &sets);
                    }
                    return Err(e);
                }
            };
            self.write_material_set(set, &primitive.material);
            primitives.push(ScenePrimitive {
                index_offset: primitive.index_offset,
                index_count: primitive.index_count,
                material: primitive.material.clone(),
                textures_set: set,
            });
        }

        // The shared buffers are about to be rewritten; in-flight frames
        // may still be reading them
        self.wait_idle()?;
        let id = self.mesh_ids.alloc();
        self.geometry.insert(id, &mesh.vertices, &mesh.indices);
        if let Err(e) = self.upload_geometry() {
            self.geometry.remove(id);
            self.mesh_ids.free(id);
            let sets: Vec<vk::DescriptorSet> =
                primitives.iter().map(|p| p.textures_set).collect();
            unsafe {
                let _ = self.device.free_descriptor_sets(self.descriptor_pool, &sets);
            }
            return Err(e);
        }

        self.meshes.insert(
            id,
            SceneMesh {
                name: mesh.name.clone(),
                model_matrix: mesh.model_matrix,
                primitives,
                vertex_count: mesh.vertices.len() as u32,
                index_count: mesh.indices.len() as u32,
            },
        );
        engine_info!(
            "nebula3d::vulkan",
            "Mesh '{}' loaded (id {}, {} vertices, {} indices)",
            mesh.name,
            id,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(id)
    }

    fn unload_mesh(&mut self, id: MeshId) -> Result<()> {
        self.ensure_alive()?;
        let mesh = self
            .meshes
            .remove(&id)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", id)))?;

        self.wait_idle()?;
        let sets: Vec<vk::DescriptorSet> = mesh.primitives.iter().map(|p| p.textures_set).collect();
        unsafe {
            let _ = self.device.free_descriptor_sets(self.descriptor_pool, &sets);
        }
        self.geometry.remove(id);
        self.mesh_ids.free(id);
        self.upload_geometry()
    }

    fn update_mesh_matrix(&mut self, id: MeshId, matrix: Mat4) -> Result<()> {
        self.ensure_alive()?;
        let mesh = self
            .meshes
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", id)))?;
        mesh.model_matrix = matrix;
        Ok(())
    }

    fn load_texture(&mut self, texture: &TextureData) -> Result<TextureId> {
        self.ensure_alive()?;
        texture.validate()?;

        let loaded = Texture::from_data(&self.uploader(), texture)?;
        let id = self.texture_ids.alloc();
        engine_info!(
            "nebula3d::vulkan",
            "Texture '{}' loaded (id {}, {}x{}, {} mip levels)",
            texture.name,
            id,
            texture.width,
            texture.height,
            loaded.mip_levels
        );
        self.textures.insert(id, loaded);
        Ok(id)
    }

    fn unload_texture(&mut self, id: TextureId) -> Result<()> {
        self.ensure_alive()?;
        let mut texture = self
            .textures
            .remove(&id)
            .ok_or_else(|| Error::InvalidResource(format!("texture {} not loaded", id)))?;

        self.wait_idle()?;

        // Detach from every material still referencing it; the descriptor
        // rewrite falls back to the built-in white texture
        let mut rewrites: Vec<(vk::DescriptorSet, MaterialData)> = Vec::new();
        for mesh in self.meshes.values_mut() {
            for primitive in &mut mesh.primitives {
                if primitive.material.references(id) {
                    for slot in [
                        &mut primitive.material.albedo,
                        &mut primitive.material.normal_map,
                        &mut primitive.material.specular,
                        &mut primitive.material.light_map,
                    ] {
                        if *slot == Some(id) {
                            *slot = None;
                        }
                    }
                    rewrites.push((primitive.textures_set, primitive.material.clone()));
                }
            }
        }
        for (set, material) in rewrites {
            self.write_material_set(set, &material);
        }

        texture.destroy(&self.device);
        self.texture_ids.free(id);
        Ok(())
    }

    fn apply_texture_to_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()> {
        self.ensure_alive()?;
        if !self.textures.contains_key(&texture) {
            return Err(Error::InvalidResource(format!(
                "texture {} not loaded",
                texture
            )));
        }
        if !self.meshes.contains_key(&mesh) {
            return Err(Error::InvalidResource(format!("mesh {} not loaded", mesh)));
        }

        self.wait_idle()?;
        let mut rewrites: Vec<(vk::DescriptorSet, MaterialData)> = Vec::new();
        if let Some(entry) = self.meshes.get_mut(&mesh) {
            for primitive in &mut entry.primitives {
                primitive.material.albedo = Some(texture);
                rewrites.push((primitive.textures_set, primitive.material.clone()));
            }
        }
        for (set, material) in rewrites {
            self.write_material_set(set, &material);
        }
        Ok(())
    }

    fn remove_texture_from_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()> {
        self.ensure_alive()?;
        if !self.meshes.contains_key(&mesh) {
            return Err(Error::InvalidResource(format!("mesh {} not loaded", mesh)));
        }

        self.wait_idle()?;
        let mut rewrites: Vec<(vk::DescriptorSet, MaterialData)> = Vec::new();
        if let Some(entry) = self.meshes.get_mut(&mesh) {
            for primitive in &mut entry.primitives {
                if primitive.material.references(texture) {
                    for slot in [
                        &mut primitive.material.albedo,
                        &mut primitive.material.normal_map,
                        &mut primitive.material.specular,
                        &mut primitive.material.light_map,
                    ] {
                        if *slot == Some(texture) {
                            *slot = None;
                        }
                    }
                    rewrites.push((primitive.textures_set, primitive.material.clone()));
                }
            }
        }
        for (set, material) in rewrites {
            self.write_material_set(set, &material);
        }
        Ok(())
    }

    fn update_view_matrix(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    fn update_perspective_matrix(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
    }

    fn add_triangle(&mut self, triangle: &Triangle2D) -> TriangleId {
        self.triangles.add(triangle)
    }

    fn remove_triangle(&mut self, id: TriangleId) {
        self.triangles.remove(id);
    }

    fn update_triangle_color(&mut self, id: TriangleId, color: [f32; 4]) {
        self.triangles.set_color(id, color);
    }

    fn update_triangle_position(&mut self, id: TriangleId, points: [Vec2; 3]) {
        self.triangles.set_points(id, points);
    }

    fn translate_triangle(&mut self, id: TriangleId, translation: Vec2) {
        self.triangles.translate(id, translation);
    }

    fn add_triangles(&mut self, triangles: &[Triangle2D]) -> Vec<TriangleId> {
        triangles
            .iter()
            .map(|triangle| self.triangles.add(triangle))
            .collect()
    }

    fn remove_triangles(&mut self, ids: &[TriangleId]) {
        for &id in ids {
            self.triangles.remove(id);
        }
    }

    fn update_triangles_color(&mut self, ids: &[TriangleId], color: [f32; 4]) {
        for &id in ids {
            self.triangles.set_color(id, color);
        }
    }

    fn translate_triangles(&mut self, ids: &[TriangleId], translation: Vec2) {
        for &id in ids {
            self.triangles.translate(id, translation);
        }
    }

    fn features(&self) -> RendererFeatures {
        self.renderer_features
    }

    fn stats(&self) -> RendererStats {
        RendererStats {
            meshes: self.meshes.len() as u32,
            textures: self.textures.len() as u32,
            triangles: self.triangles.len() as u32,
            draw_calls: self.draw_calls,
            swapchain_images: self.swapchain.images.len() as u32,
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if !self.destroyed {
            let _ = self.cleanup();
        }
    }
}

// ============================================================================
// Render pass and framebuffers
// ============================================================================

fn detect_features(selection: &DeviceSelection) -> RendererFeatures {
    let mut features = RendererFeatures::empty();
    if selection.features.sampler_anisotropy == vk::TRUE {
        features |= RendererFeatures::SAMPLER_ANISOTROPY;
    }
    if selection.features.sample_rate_shading == vk::TRUE {
        features |= RendererFeatures::SAMPLE_RATE_SHADING;
    }
    if selection.features.wide_lines == vk::TRUE {
        features |= RendererFeatures::WIDE_LINES;
    }
    if selection.features.fill_mode_non_solid == vk::TRUE {
        features |= RendererFeatures::FILL_MODE_NON_SOLID;
    }
    features
}

/// Build the single-subpass render pass
///
/// Multisampled: [msaa color, depth, resolve-to-swapchain]. The resolve
/// attachment ends in PRESENT_SRC. Single-sampled drops the resolve and
/// the swapchain image is the color attachment itself.
fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Result<vk::RenderPass> {
    let multisampled = samples != vk::SampleCountFlags::TYPE_1;

    let mut attachments = vec![
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(if multisampled {
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            } else {
                vk::ImageLayout::PRESENT_SRC_KHR
            }),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];
    if multisampled {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        );
    }

    let color_ref = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let resolve_ref = [vk::AttachmentReference {
        attachment: 2,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_ref)
        .depth_stencil_attachment(&depth_ref);
    if multisampled {
        subpass = subpass.resolve_attachments(&resolve_ref);
    }
    let subpasses = [subpass];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )];

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe {
        device
            .create_render_pass(&info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create render pass: {:?}", e))
    }
}

fn create_render_targets(
    device: &ash::Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    extent: vk::Extent2D,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Result<RenderTargets> {
    let color = if samples != vk::SampleCountFlags::TYPE_1 {
        Some(AttachmentImage::new(
            device,
            memory_properties,
            extent,
            color_format,
            samples,
            vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            vk::ImageAspectFlags::COLOR,
        )?)
    } else {
        None
    };

    let depth = AttachmentImage::new(
        device,
        memory_properties,
        extent,
        depth_format,
        samples,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        vk::ImageAspectFlags::DEPTH,
    );
    let depth = match depth {
        Ok(depth) => depth,
        Err(e) => {
            if let Some(mut color) = color {
                color.destroy(device);
            }
            return Err(e);
        }
    };

    Ok(RenderTargets { color, depth })
}

/// One framebuffer per swapchain image, attachment order matching the
/// render pass
fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    swapchain: &Swapchain,
    targets: &RenderTargets,
) -> Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(swapchain.image_views.len());
    for &swapchain_view in &swapchain.image_views {
        let attachments: Vec<vk::ImageView> = match &targets.color {
            Some(color) => vec![color.view, targets.depth.view, swapchain_view],
            None => vec![swapchain_view, targets.depth.view],
        };
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(swapchain.extent.width)
            .height(swapchain.extent.height)
            .layers(1);
        let framebuffer = unsafe {
            device
                .create_framebuffer(&info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create framebuffer: {:?}", e))?
        };
        framebuffers.push(framebuffer);
    }
    Ok(framebuffers)
}
