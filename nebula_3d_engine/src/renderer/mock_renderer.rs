/// Mock Renderer for unit tests (no GPU required)
///
/// Implements the full Renderer trait over CPU-side maps so registry
/// semantics (id recycling, texture attach/detach, unload behavior) and the
/// frame status state machine can be tested without a graphics device.

#[cfg(test)]
use glam::{Mat4, Vec2};
#[cfg(test)]
use rustc_hash::FxHashMap;

#[cfg(test)]
use crate::error::{Error, Result};
#[cfg(test)]
use crate::renderer::{
    FrameStatus, MeshId, Renderer, RendererFeatures, RendererStats, TextureId, TriangleId,
};
#[cfg(test)]
use crate::resource::{MaterialData, MeshData, TextureData, Triangle2D};
#[cfg(test)]
use crate::utils::SlotAllocator;

// ============================================================================
// Mock registry entries
// ============================================================================

#[cfg(test)]
#[derive(Debug)]
pub struct MockMesh {
    pub name: String,
    pub model_matrix: Mat4,
    /// One material per primitive, in primitive order
    pub materials: Vec<MaterialData>,
    pub vertex_count: u32,
    pub index_count: u32,
}

#[cfg(test)]
#[derive(Debug)]
pub struct MockTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

// ============================================================================
// Mock Renderer
// ============================================================================

#[cfg(test)]
pub struct MockRenderer {
    meshes: FxHashMap<MeshId, MockMesh>,
    textures: FxHashMap<TextureId, MockTexture>,
    triangles: FxHashMap<TriangleId, Triangle2D>,

    mesh_ids: SlotAllocator,
    texture_ids: SlotAllocator,
    triangle_ids: SlotAllocator,

    view_matrix: Mat4,
    perspective_matrix: Mat4,

    minimized: bool,
    resize_pending: bool,
    frame_active: bool,
    draw_calls: u32,
}

#[cfg(test)]
impl MockRenderer {
    pub fn new() -> Self {
        Self {
            meshes: FxHashMap::default(),
            textures: FxHashMap::default(),
            triangles: FxHashMap::default(),
            mesh_ids: SlotAllocator::new(),
            texture_ids: SlotAllocator::new(),
            triangle_ids: SlotAllocator::new(),
            view_matrix: Mat4::IDENTITY,
            perspective_matrix: Mat4::IDENTITY,
            minimized: false,
            resize_pending: false,
            frame_active: false,
            draw_calls: 0,
        }
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MockMesh> {
        self.meshes.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&MockTexture> {
        self.textures.get(&id)
    }

    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle2D> {
        self.triangles.get(&id)
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn perspective_matrix(&self) -> Mat4 {
        self.perspective_matrix
    }
}

#[cfg(test)]
impl Renderer for MockRenderer {
    fn render(&mut self) -> Result<FrameStatus> {
        if self.minimized {
            return Ok(FrameStatus::Minimized);
        }
        // A pending resize is consumed before any recording starts
        self.resize_pending = false;

        self.frame_active = true;
        self.draw_calls = self
            .meshes
            .values()
            .map(|mesh| mesh.materials.len() as u32)
            .sum::<u32>()
            + if self.triangles.is_empty() { 0 } else { 1 };
        Ok(FrameStatus::Completed)
    }

    fn present(&mut self) -> Result<FrameStatus> {
        if !self.frame_active {
            return Ok(if self.minimized {
                FrameStatus::Minimized
            } else {
                FrameStatus::ResizePending
            });
        }
        self.frame_active = false;
        Ok(FrameStatus::Completed)
    }

    fn cleanup(&mut self) -> Result<()> {
        self.meshes.clear();
        self.textures.clear();
        self.triangles.clear();
        self.mesh_ids.clear();
        self.texture_ids.clear();
        self.triangle_ids.clear();
        Ok(())
    }

    fn window_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.minimized = true;
        } else {
            self.minimized = false;
            self.resize_pending = true;
        }
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn load_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        mesh.validate()?;

        let id = self.mesh_ids.alloc();
        self.meshes.insert(
            id,
            MockMesh {
                name: mesh.name.clone(),
                model_matrix: mesh.model_matrix,
                materials: mesh
                    .primitives
                    .iter()
                    .map(|primitive| primitive.material.clone())
                    .collect(),
                vertex_count: mesh.vertices.len() as u32,
                index_count: mesh.indices.len() as u32,
            },
        );
        Ok(id)
    }

    fn unload_mesh(&mut self, id: MeshId) -> Result<()> {
        self.meshes
            .remove(&id)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", id)))?;
        self.mesh_ids.free(id);
        Ok(())
    }

    fn update_mesh_matrix(&mut self, id: MeshId, matrix: Mat4) -> Result<()> {
        let mesh = self
            .meshes
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", id)))?;
        mesh.model_matrix = matrix;
        Ok(())
    }

    fn load_texture(&mut self, texture: &TextureData) -> Result<TextureId> {
        texture.validate()?;

        let id = self.texture_ids.alloc();
        self.textures.insert(
            id,
            MockTexture {
                name: texture.name.clone(),
                width: texture.width,
                height: texture.height,
            },
        );
        Ok(id)
    }

    fn unload_texture(&mut self, id: TextureId) -> Result<()> {
        self.textures
            .remove(&id)
            .ok_or_else(|| Error::InvalidResource(format!("texture {} not loaded", id)))?;
        self.texture_ids.free(id);

        // Detach from any material still referencing it
        for mesh in self.meshes.values_mut() {
            for material in &mut mesh.materials {
                for slot in [
                    &mut material.albedo,
                    &mut material.normal_map,
                    &mut material.specular,
                    &mut material.light_map,
                ] {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_texture_to_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()> {
        if !self.textures.contains_key(&texture) {
            return Err(Error::InvalidResource(format!(
                "texture {} not loaded",
                texture
            )));
        }
        let entry = self
            .meshes
            .get_mut(&mesh)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", mesh)))?;
        for material in &mut entry.materials {
            material.albedo = Some(texture);
        }
        Ok(())
    }

    fn remove_texture_from_mesh(&mut self, texture: TextureId, mesh: MeshId) -> Result<()> {
        let entry = self
            .meshes
            .get_mut(&mesh)
            .ok_or_else(|| Error::InvalidResource(format!("mesh {} not loaded", mesh)))?;
        for material in &mut entry.materials {
            for slot in [
                &mut material.albedo,
                &mut material.normal_map,
                &mut material.specular,
                &mut material.light_map,
            ] {
                if *slot == Some(texture) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    fn update_view_matrix(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
    }

    fn update_perspective_matrix(&mut self, matrix: Mat4) {
        self.perspective_matrix = matrix;
    }

    fn add_triangle(&mut self, triangle: &Triangle2D) -> TriangleId {
        let id = self.triangle_ids.alloc();
        self.triangles.insert(id, *triangle);
        id
    }

    fn remove_triangle(&mut self, id: TriangleId) {
        if self.triangles.remove(&id).is_some() {
            self.triangle_ids.free(id);
        }
    }

    fn update_triangle_color(&mut self, id: TriangleId, color: [f32; 4]) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.color = color;
        }
    }

    fn update_triangle_position(&mut self, id: TriangleId, points: [Vec2; 3]) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.points = points;
        }
    }

    fn translate_triangle(&mut self, id: TriangleId, translation: Vec2) {
        if let Some(triangle) = self.triangles.get_mut(&id) {
            triangle.translate(translation);
        }
    }

    fn add_triangles(&mut self, triangles: &[Triangle2D]) -> Vec<TriangleId> {
        triangles
            .iter()
            .map(|triangle| self.add_triangle(triangle))
            .collect()
    }

    fn remove_triangles(&mut self, ids: &[TriangleId]) {
        for &id in ids {
            self.remove_triangle(id);
        }
    }

    fn update_triangles_color(&mut self, ids: &[TriangleId], color: [f32; 4]) {
        for &id in ids {
            self.update_triangle_color(id, color);
        }
    }

    fn translate_triangles(&mut self, ids: &[TriangleId], translation: Vec2) {
        for &id in ids {
            self.translate_triangle(id, translation);
        }
    }

    fn features(&self) -> RendererFeatures {
        RendererFeatures::all()
    }

    fn stats(&self) -> RendererStats {
        RendererStats {
            meshes: self.meshes.len() as u32,
            textures: self.textures.len() as u32,
            triangles: self.triangles.len() as u32,
            draw_calls: self.draw_calls,
            swapchain_images: 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
