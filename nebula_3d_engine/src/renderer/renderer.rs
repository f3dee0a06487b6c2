/// Renderer trait - the capability surface a rendering backend must provide

use bitflags::bitflags;
use glam::{Mat4, Vec2};

use crate::error::Result;
use crate::resource::{MeshData, TextureData, Triangle2D};

// ============================================================================
// Common types
// ============================================================================

/// Handle to a loaded mesh
pub type MeshId = u32;

/// Handle to a loaded texture
pub type TextureId = u32;

/// Handle to a debug 2D triangle
pub type TriangleId = u32;

/// Outcome of one `render()`/`present()` call.
///
/// Recoverable frame conditions are status values, not errors: the caller
/// keeps ticking and the renderer recovers on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame proceeded normally
    Completed,

    /// The surface is stale or a resize is pending; the swapchain will be
    /// rebuilt at the start of the next `render()`
    ResizePending,

    /// The window is minimized (zero extent); rendering is suspended until
    /// it reports nonzero dimensions again
    Minimized,
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Nebula3D Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Precompiled shader bytecode for one pipeline (vertex + fragment stages)
///
/// The engine never compiles shader source; the asset loader hands over raw
/// SPIR-V byte buffers read from disk.
#[derive(Debug, Clone)]
pub struct ShaderBytecode {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

/// The shader programs backing the named pipeline set
///
/// `default` and `two_d` are mandatory; `wireframe` and `metal` pipelines
/// are built only when their bytecode is supplied (and, for wireframe, when
/// the device supports non-solid fill).
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub default: ShaderBytecode,
    pub two_d: ShaderBytecode,
    pub wireframe: Option<ShaderBytecode>,
    pub metal: Option<ShaderBytecode>,
}

bitflags! {
    /// Optional device capabilities detected at initialization
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RendererFeatures: u32 {
        /// Anisotropic texture filtering
        const SAMPLER_ANISOTROPY  = 1 << 0;
        /// Per-sample shading (smoother MSAA interiors)
        const SAMPLE_RATE_SHADING = 1 << 1;
        /// Line widths other than 1.0
        const WIDE_LINES          = 1 << 2;
        /// Non-solid polygon fill modes (wireframe pipeline)
        const FILL_MODE_NON_SOLID = 1 << 3;
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Number of meshes currently loaded
    pub meshes: u32,
    /// Number of textures currently loaded
    pub textures: u32,
    /// Number of debug triangles currently batched
    pub triangles: u32,
    /// Number of draw calls recorded for the last frame
    pub draw_calls: u32,
    /// Swapchain image count
    pub swapchain_images: u32,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
///
/// One concrete backend implements this (VulkanRenderer); the trait exists
/// as the seam for future backends and for GPU-free testing.
///
/// All methods are called from a single render thread. `render()` and
/// `present()` form one frame when called back to back once per tick.
pub trait Renderer: Send {
    // ===== FRAME LIFECYCLE =====

    /// Acquire the next swapchain image and begin recording the frame.
    ///
    /// Consumes any pending resize first. Returns `ResizePending` when the
    /// surface was stale (the swapchain is rebuilt on the next call) and
    /// `Minimized` while the window has zero extent; both skip recording.
    fn render(&mut self) -> Result<FrameStatus>;

    /// Finish recording, submit to the GPU, and present the frame.
    ///
    /// A no-op returning the matching status when `render()` did not record
    /// a frame this tick.
    fn present(&mut self) -> Result<FrameStatus>;

    /// Wait for the GPU and destroy all resources.
    ///
    /// The renderer must not be used afterwards; dropping it is the only
    /// valid next step.
    fn cleanup(&mut self) -> Result<()>;

    /// Notify the renderer that the window framebuffer size changed.
    ///
    /// Zero dimensions mean the window is minimized. The notification is
    /// consumed at the top of the next `render()`.
    fn window_resized(&mut self, width: u32, height: u32);

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    // ===== MESHES =====

    /// Upload a mesh (vertices, indices, primitives with materials) and
    /// return its handle
    fn load_mesh(&mut self, mesh: &MeshData) -> Result<MeshId>;

    /// Remove a mesh and release its GPU resources
    fn unload_mesh(&mut self, id: MeshId) -> Result<()>;

    /// Replace a mesh's model matrix
    fn update_mesh_matrix(&mut self, id: MeshId, matrix: Mat4) -> Result<()>;

    // ===== TEXTURES =====

    /// Upload an RGBA8 pixel buffer (with full mip chain) and return its
    /// handle
    fn load_texture(&mut self, texture: &TextureData) -> Result<TextureId>;

    /// Destroy a texture; any material still referencing it falls back to
    /// the built-in default texture
    fn unload_texture(&mut self, id: TextureId) -> Result<()>;

    /// Bind a texture as the albedo of every material of a mesh
    fn apply_texture_to_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()>;

    /// Unbind a texture from a mesh's materials (reverting to the default
    /// texture)
    fn remove_texture_from_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()>;

    // ===== CAMERA =====

    /// Replace the view matrix used for subsequent frames
    fn update_view_matrix(&mut self, matrix: Mat4);

    /// Replace the projection matrix used for subsequent frames
    fn update_perspective_matrix(&mut self, matrix: Mat4);

    // ===== DEBUG 2D PRIMITIVES =====

    /// Add one debug triangle to the 2D batch
    fn add_triangle(&mut self, triangle: &Triangle2D) -> TriangleId;

    /// Remove one debug triangle
    fn remove_triangle(&mut self, id: TriangleId);

    /// Recolor one debug triangle
    fn update_triangle_color(&mut self, id: TriangleId, color: [f32; 4]);

    /// Reposition one debug triangle
    fn update_triangle_position(&mut self, id: TriangleId, points: [Vec2; 3]);

    /// Translate one debug triangle
    fn translate_triangle(&mut self, id: TriangleId, translation: Vec2);

    /// Add a batch of debug triangles
    fn add_triangles(&mut self, triangles: &[Triangle2D]) -> Vec<TriangleId>;

    /// Remove a batch of debug triangles
    fn remove_triangles(&mut self, ids: &[TriangleId]);

    /// Recolor a batch of debug triangles
    fn update_triangles_color(&mut self, ids: &[TriangleId], color: [f32; 4]);

    /// Translate a batch of debug triangles
    fn translate_triangles(&mut self, ids: &[TriangleId], translation: Vec2);

    // ===== INTROSPECTION =====

    /// Optional device capabilities detected at initialization
    fn features(&self) -> RendererFeatures;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;
}
