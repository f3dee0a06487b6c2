/// Descriptor layouts and the named graphics pipeline set
///
/// Two descriptor set layouts are shared by every pipeline: set 0 carries
/// the per-frame matrices UBO (vertex stage), set 1 the four material
/// textures (fragment stage). The model matrix rides in a push constant.
///
/// The pipeline set is Default (base, derivatives allowed), TwoD (debug
/// overlay, no depth), Wireframe (derivative, needs non-solid fill), and
/// Metal (derivative, optional shaders).

use ash::vk;
use std::io::Cursor;

use nebula_3d_engine::nebula3d::render::{ShaderBytecode, ShaderSet};
use nebula_3d_engine::nebula3d::resource::Vertex;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::{engine_debug, engine_err};

use crate::vulkan_scene::TwoDVertex;

/// Push constant block: one model matrix, vertex stage
pub const PUSH_CONSTANT_SIZE: u32 = 64;

/// Material texture slots: albedo, normal, specular, light map
pub const MATERIAL_TEXTURE_COUNT: u32 = 4;

/// Minimum fraction of samples shaded when sample rate shading is on
pub const MIN_SAMPLE_SHADING: f32 = 0.2;

// ============================================================================
// Vertex input descriptions
// ============================================================================

pub fn mesh_vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

pub fn mesh_vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, uv) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, color) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 3,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, normal) as u32,
        },
    ]
}

pub fn two_d_vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<TwoDVertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

pub fn two_d_vertex_attributes() -> [vk::VertexInputAttributeDescription; 2] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::offset_of!(TwoDVertex, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: std::mem::offset_of!(TwoDVertex, color) as u32,
        },
    ]
}

// ============================================================================
// Descriptor layouts and pool
// ============================================================================

pub struct DescriptorLayouts {
    /// Set 0: per-frame matrices UBO at binding 0 (vertex stage)
    pub matrices: vk::DescriptorSetLayout,
    /// Set 1: four combined image samplers at bindings 0..3 (fragment stage)
    pub textures: vk::DescriptorSetLayout,
}

impl DescriptorLayouts {
    pub fn new(device: &ash::Device) -> Result<Self> {
        unsafe {
            let matrices_bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)];
            let matrices_info =
                vk::DescriptorSetLayoutCreateInfo::default().bindings(&matrices_bindings);
            let matrices = device
                .create_descriptor_set_layout(&matrices_info, None)
                .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create matrices set layout: {:?}", e))?;

            let texture_bindings: Vec<vk::DescriptorSetLayoutBinding> = (0
                ..MATERIAL_TEXTURE_COUNT)
                .map(|binding| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(binding)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .descriptor_count(1)
                        .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                })
                .collect();
            let textures_info =
                vk::DescriptorSetLayoutCreateInfo::default().bindings(&texture_bindings);
            let textures = match device.create_descriptor_set_layout(&textures_info, None) {
                Ok(layout) => layout,
                Err(e) => {
                    device.destroy_descriptor_set_layout(matrices, None);
                    return Err(engine_err!("nebula3d::vulkan", "Failed to create textures set layout: {:?}", e));
                }
            };

            Ok(Self { matrices, textures })
        }
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_descriptor_set_layout(self.matrices, None);
            self.matrices = vk::DescriptorSetLayout::null();
            device.destroy_descriptor_set_layout(self.textures, None);
            self.textures = vk::DescriptorSetLayout::null();
        }
    }
}

/// Pool for all descriptor sets; sets are freed individually when meshes
/// unload
pub fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 64,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 4096,
        },
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(1024);

    unsafe {
        device
            .create_descriptor_pool(&info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create descriptor pool: {:?}", e))
    }
}

pub fn create_pipeline_layout(
    device: &ash::Device,
    layouts: &DescriptorLayouts,
) -> Result<vk::PipelineLayout> {
    unsafe {
        let set_layouts = [layouts.matrices, layouts.textures];
        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .offset(0)
            .size(PUSH_CONSTANT_SIZE)];
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        device
            .create_pipeline_layout(&info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create pipeline layout: {:?}", e))
    }
}

// ============================================================================
// Pipeline set
// ============================================================================

/// Parameters shared by every pipeline in the set
pub struct PipelineParams {
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub samples: vk::SampleCountFlags,
    pub sample_rate_shading: bool,
    pub fill_mode_non_solid: bool,
}

pub struct PipelineSet {
    /// Base pipeline for textured meshes; derivatives branch off it
    pub default_pipeline: vk::Pipeline,
    /// Debug 2D overlay: no depth, alpha blended
    pub two_d: vk::Pipeline,
    /// Line-mode derivative; absent without non-solid fill support
    pub wireframe: Option<vk::Pipeline>,
    /// Optional stylized derivative, built only when shaders are supplied
    pub metal: Option<vk::Pipeline>,
}

impl PipelineSet {
    pub fn new(
        device: &ash::Device,
        shaders: &ShaderSet,
        params: &PipelineParams,
    ) -> Result<Self> {
        let default_pipeline = create_pipeline(
            device,
            params,
            &shaders.default,
            &PipelineVariant {
                polygon_mode: vk::PolygonMode::FILL,
                depth_test: true,
                blend: false,
                two_d_input: false,
                flags: vk::PipelineCreateFlags::ALLOW_DERIVATIVES,
                base: vk::Pipeline::null(),
            },
        )?;

        let two_d = create_pipeline(
            device,
            params,
            &shaders.two_d,
            &PipelineVariant {
                polygon_mode: vk::PolygonMode::FILL,
                depth_test: false,
                blend: true,
                two_d_input: true,
                flags: vk::PipelineCreateFlags::empty(),
                base: vk::Pipeline::null(),
            },
        )?;

        let wireframe = match &shaders.wireframe {
            Some(bytecode) if params.fill_mode_non_solid => Some(create_pipeline(
                device,
                params,
                bytecode,
                &PipelineVariant {
                    polygon_mode: vk::PolygonMode::LINE,
                    depth_test: true,
                    blend: false,
                    two_d_input: false,
                    flags: vk::PipelineCreateFlags::DERIVATIVE,
                    base: default_pipeline,
                },
            )?),
            Some(_) => {
                engine_debug!(
                    "nebula3d::vulkan",
                    "Wireframe pipeline skipped: fillModeNonSolid not supported"
                );
                None
            }
            None => None,
        };

        let metal = match &shaders.metal {
            Some(bytecode) => Some(create_pipeline(
                device,
                params,
                bytecode,
                &PipelineVariant {
                    polygon_mode: vk::PolygonMode::FILL,
                    depth_test: true,
                    blend: false,
                    two_d_input: false,
                    flags: vk::PipelineCreateFlags::DERIVATIVE,
                    base: default_pipeline,
                },
            )?),
            None => None,
        };

        Ok(Self {
            default_pipeline,
            two_d,
            wireframe,
            metal,
        })
    }

    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.default_pipeline, None);
            self.default_pipeline = vk::Pipeline::null();
            device.destroy_pipeline(self.two_d, None);
            self.two_d = vk::Pipeline::null();
            if let Some(pipeline) = self.wireframe.take() {
                device.destroy_pipeline(pipeline, None);
            }
            if let Some(pipeline) = self.metal.take() {
                device.destroy_pipeline(pipeline, None);
            }
        }
    }
}

struct PipelineVariant {
    polygon_mode: vk::PolygonMode,
    depth_test: bool,
    blend: bool,
    two_d_input: bool,
    flags: vk::PipelineCreateFlags,
    base: vk::Pipeline,
}

fn create_shader_module(device: &ash::Device, spirv: &[u8]) -> Result<vk::ShaderModule> {
    let words = ash::util::read_spv(&mut Cursor::new(spirv))
        .map_err(|e| engine_err!("nebula3d::vulkan", "Invalid SPIR-V bytecode: {}", e))?;
    unsafe {
        let info = vk::ShaderModuleCreateInfo::default().code(&words);
        device
            .create_shader_module(&info, None)
            .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create shader module: {:?}", e))
    }
}

fn create_pipeline(
    device: &ash::Device,
    params: &PipelineParams,
    bytecode: &ShaderBytecode,
    variant: &PipelineVariant,
) -> Result<vk::Pipeline> {
    unsafe {
        let vertex_module = create_shader_module(device, &bytecode.vertex)?;
        let fragment_module = match create_shader_module(device, &bytecode.fragment) {
            Ok(module) => module,
            Err(e) => {
                device.destroy_shader_module(vertex_module, None);
                return Err(e);
            }
        };

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main"),
        ];

        let mesh_bindings = [mesh_vertex_binding()];
        let mesh_attributes = mesh_vertex_attributes();
        let two_d_bindings = [two_d_vertex_binding()];
        let two_d_attributes = two_d_vertex_attributes();

        let vertex_input = if variant.two_d_input {
            vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&two_d_bindings)
                .vertex_attribute_descriptions(&two_d_attributes)
        } else {
            vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&mesh_bindings)
                .vertex_attribute_descriptions(&mesh_attributes)
        };

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(variant.polygon_mode)
            .line_width(1.0)
            .cull_mode(if variant.two_d_input {
                vk::CullModeFlags::NONE
            } else {
                vk::CullModeFlags::BACK
            })
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(params.samples)
            .sample_shading_enable(params.sample_rate_shading)
            .min_sample_shading(if params.sample_rate_shading {
                MIN_SAMPLE_SHADING
            } else {
                0.0
            });

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(variant.depth_test)
            .depth_write_enable(variant.depth_test)
            .depth_compare_op(vk::CompareOp::LESS);

        let blend_attachment = if variant.blend {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
        } else {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        };
        let blend_attachments = [blend_attachment];
        let color_blending =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [
            vk::DynamicState::VIEWPORT,
            vk::DynamicState::SCISSOR,
            vk::DynamicState::LINE_WIDTH,
        ];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut info = vk::GraphicsPipelineCreateInfo::default()
            .flags(variant.flags)
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(params.layout)
            .render_pass(params.render_pass)
            .subpass(0);

        if variant.base != vk::Pipeline::null() {
            info = info.base_pipeline_handle(variant.base).base_pipeline_index(-1);
        }

        let result = device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None);

        device.destroy_shader_module(vertex_module, None);
        device.destroy_shader_module(fragment_module, None);

        match result {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((_, e)) => Err(engine_err!("nebula3d::vulkan", "Failed to create graphics pipeline: {:?}", e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
