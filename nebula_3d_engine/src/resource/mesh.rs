//! Mesh data as supplied by the asset loader.
//!
//! A `MeshData` owns its vertex/index arrays plus an ordered list of
//! primitives; each primitive is one draw call (an index range and the
//! material it is shaded with). The backend packs vertex/index data into
//! shared device buffers, so offsets here are local to the mesh.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::{Error, Result};
use crate::resource::MaterialData;

/// One vertex as laid out in the vertex buffer.
///
/// Field order matches the shader input locations 0-3.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Vertex color
    pub color: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], uv: [f32; 2], color: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            color,
            normal,
        }
    }
}

/// A drawable region of a mesh: one index range shaded with one material
#[derive(Debug, Clone)]
pub struct Primitive {
    /// First index, relative to the mesh's own index array
    pub index_offset: u32,
    /// Number of indices
    pub index_count: u32,
    /// Surface description for this region
    pub material: MaterialData,
}

/// A mesh ready for upload
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Debug name (shows up in logs)
    pub name: String,
    /// Initial model matrix
    pub model_matrix: Mat4,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub primitives: Vec<Primitive>,
}

impl MeshData {
    /// Check internal consistency before upload.
    ///
    /// Every index must address a vertex and every primitive range must lie
    /// within the index array.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(Error::InvalidResource(format!(
                "mesh '{}' has no vertices",
                self.name
            )));
        }
        if self.indices.is_empty() {
            return Err(Error::InvalidResource(format!(
                "mesh '{}' has no indices",
                self.name
            )));
        }
        if self.primitives.is_empty() {
            return Err(Error::InvalidResource(format!(
                "mesh '{}' has no primitives",
                self.name
            )));
        }

        let vertex_count = self.vertices.len() as u32;
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(Error::InvalidResource(format!(
                "mesh '{}': index {} out of range ({} vertices)",
                self.name, bad, vertex_count
            )));
        }

        let index_count = self.indices.len() as u32;
        for (i, primitive) in self.primitives.iter().enumerate() {
            if primitive.index_count == 0 {
                return Err(Error::InvalidResource(format!(
                    "mesh '{}': primitive {} is empty",
                    self.name, i
                )));
            }
            let end = primitive.index_offset as u64 + primitive.index_count as u64;
            if end > index_count as u64 {
                return Err(Error::InvalidResource(format!(
                    "mesh '{}': primitive {} range [{}, {}) exceeds {} indices",
                    self.name, i, primitive.index_offset, end, index_count
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
