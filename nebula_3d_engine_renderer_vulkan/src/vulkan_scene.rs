/// CPU-side scene registries backing the GPU state
///
/// Mesh geometry is packed into one shared vertex stream and one shared
/// index stream, repacked when a mesh is removed; each mesh keeps one
/// descriptor set per primitive. The triangle store batches the debug 2D
/// overlay into a single vertex stream rebuilt when its contents change.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use nebula_3d_engine::glam::Mat4;
use nebula_3d_engine::nebula3d::render::{MeshId, TriangleId};
use nebula_3d_engine::nebula3d::resource::{MaterialData, Triangle2D, Vertex};
use nebula_3d_engine::nebula3d::utils::SlotAllocator;
use rustc_hash::FxHashMap;

/// Vertex layout of the debug 2D overlay stream
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TwoDVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// One draw range of a mesh with its material and texture bindings
pub struct ScenePrimitive {
    pub index_offset: u32,
    pub index_count: u32,
    pub material: MaterialData,
    /// Set 1 for this primitive; rewritten whenever the material's texture
    /// bindings change
    pub textures_set: vk::DescriptorSet,
}

/// A loaded mesh in the scene registry
pub struct SceneMesh {
    pub name: String,
    pub model_matrix: Mat4,
    pub primitives: Vec<ScenePrimitive>,
    pub vertex_count: u32,
    pub index_count: u32,
}

// ============================================================================
// Shared geometry store
// ============================================================================

/// Where one mesh's geometry sits inside the shared streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRange {
    pub vertex_base: u32,
    pub vertex_count: u32,
    pub index_base: u32,
    pub index_count: u32,
}

/// CPU mirror of the shared vertex/index buffers
///
/// Meshes append on insert; removal repacks the survivors (in id order) so
/// the streams stay dense and every range's base is rewritten. The renderer
/// re-uploads both device buffers after any change.
pub struct GeometryStore {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    ranges: FxHashMap<MeshId, GeometryRange>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            ranges: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, id: MeshId, vertices: &[Vertex], indices: &[u32]) {
        let range = GeometryRange {
            vertex_base: self.vertices.len() as u32,
            vertex_count: vertices.len() as u32,
            index_base: self.indices.len() as u32,
            index_count: indices.len() as u32,
        };
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.ranges.insert(id, range);
    }

    /// Remove one mesh's geometry and repack the rest; returns false for
    /// unknown ids
    pub fn remove(&mut self, id: MeshId) -> bool {
        if self.ranges.remove(&id).is_none() {
            return false;
        }

        let mut ids: Vec<MeshId> = self.ranges.keys().copied().collect();
        ids.sort_unstable();

        let mut vertices = Vec::with_capacity(self.vertices.len());
        let mut indices = Vec::with_capacity(self.indices.len());
        for id in ids {
            if let Some(range) = self.ranges.get_mut(&id) {
                let vertex_range =
                    range.vertex_base as usize..(range.vertex_base + range.vertex_count) as usize;
                let index_range =
                    range.index_base as usize..(range.index_base + range.index_count) as usize;
                range.vertex_base = vertices.len() as u32;
                range.index_base = indices.len() as u32;
                vertices.extend_from_slice(&self.vertices[vertex_range]);
                indices.extend_from_slice(&self.indices[index_range]);
            }
        }
        self.vertices = vertices;
        self.indices = indices;
        true
    }

    pub fn range(&self, id: MeshId) -> Option<GeometryRange> {
        self.ranges.get(&id).copied()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.ranges.clear();
    }
}

// ============================================================================
// Debug triangle store
// ============================================================================

/// Registry of debug 2D triangles with id recycling
///
/// Mutations mark the store dirty; the renderer rebuilds and re-uploads the
/// vertex stream on the next frame that sees the flag.
pub struct TriangleStore {
    triangles: FxHashMap<TriangleId, Triangle2D>,
    ids: SlotAllocator,
    dirty: bool,
}

impl TriangleStore {
    pub fn new() -> Self {
        Self {
            triangles: FxHashMap::default(),
            ids: SlotAllocator::new(),
            dirty: false,
        }
    }

    pub fn add(&mut self, triangle: &Triangle2D) -> TriangleId {
        let id = self.ids.alloc();
        self.triangles.insert(id, *triangle);
        self.dirty = true;
        id
    }

    /// Unknown ids are ignored
    pub fn remove(&mut self, id: TriangleId) {
        if self.triangles.remove(&id).is_some() {
            self.ids.free(id);
            self.dirty = true;
        }
    }

    pub fn set_color(&mut self, id: TriangleId, color: [f32; 4]) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.color = color;
            self.dirty = true;
        }
    }

    pub fn set_points(&mut self, id: TriangleId, points: [nebula_3d_engine::glam::Vec2; 3]) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.points = points;
            self.dirty = true;
        }
    }

    pub fn translate(&mut self, id: TriangleId, translation: nebula_3d_engine::glam::Vec2) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.translate(translation);
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
        self.ids.clear();
        self.dirty = true;
    }

    /// Read and reset the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Flatten the batch into a vertex stream, ordered by id so draw order
    /// is stable across frames
    pub fn build_vertices(&self) -> Vec<TwoDVertex> {
        let mut ids: Vec<TriangleId> = self.triangles.keys().copied().collect();
        ids.sort_unstable();

        let mut vertices = Vec::with_capacity(ids.len() * 3);
        for id in ids {
            let triangle = &self.triangles[&id];
            for point in triangle.points {
                vertices.push(TwoDVertex {
                    position: [point.x, point.y],
                    color: triangle.color,
                });
            }
        }
        vertices
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "vulkan_scene_tests.rs"]
mod tests;
