/*!
# Nebula 3D Engine - Vulkan Renderer Backend

Vulkan implementation of the Nebula 3D rendering engine.

This crate implements the `nebula_3d_engine` [`Renderer`] trait on top of
the Ash bindings. It owns the full GPU frame lifecycle: instance and device
setup, swapchain management with resize/minimize handling, MSAA render
targets, the named pipeline set, and mesh/texture upload through staging
buffers.

[`Renderer`]: nebula_3d_engine::nebula3d::Renderer

## Example

```ignore
use nebula_3d_engine::nebula3d::Engine;
use nebula_3d_engine::nebula3d::render::{RendererConfig, ShaderSet};
use nebula_3d_engine_renderer_vulkan::VulkanRenderer;

Engine::initialize()?;
let renderer = VulkanRenderer::new(&window, RendererConfig::default(), shaders)?;
Engine::create_renderer(renderer)?;
```
*/

mod vulkan;
mod vulkan_buffer;
mod vulkan_debug;
mod vulkan_device;
mod vulkan_frame;
mod vulkan_memory;
mod vulkan_pipeline;
mod vulkan_scene;
mod vulkan_swapchain;
mod vulkan_texture;

pub use vulkan::VulkanRenderer;
pub use vulkan_swapchain::MAX_SWAPCHAIN_IMAGES;
