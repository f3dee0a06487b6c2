/*!
# Nebula 3D Engine

Core traits and types for the Nebula 3D rendering engine.

This crate provides the backend-agnostic API for 3D rendering using
trait-based dynamic polymorphism. Backend implementations (Vulkan today,
possibly others later) live in their own crates and implement the
[`renderer::Renderer`] trait.

## Architecture

- **Renderer**: the capability surface a backend must provide — frame
  lifecycle (render/present/cleanup), mesh and texture loading, camera
  matrix updates, and debug 2D primitives
- **Engine**: process-wide singleton holding the active renderer and logger
- **resource**: CPU-side descriptions of GPU resources (vertices, meshes,
  pixel buffers, materials, debug triangles)

Backends own all GPU state; nothing in this crate touches a graphics API.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;
pub mod resource;
pub mod utils;

// Main nebula3d namespace module
pub mod nebula3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer capability surface
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Utility sub-module
    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
