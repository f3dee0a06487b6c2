//! Unit tests for engine.rs
//!
//! Singleton lifecycle tests run serially because they share the global
//! engine state.

use super::*;
use crate::renderer::{
    FrameStatus, MeshId, Renderer, RendererFeatures, RendererStats, TextureId, TriangleId,
};
use crate::resource::{MeshData, TextureData, Triangle2D};
use glam::{Mat4, Vec2};
use serial_test::serial;

// ============================================================================
// Test renderer (no GPU)
// ============================================================================

struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self) -> Result<FrameStatus> {
        Ok(FrameStatus::Completed)
    }

    fn present(&mut self) -> Result<FrameStatus> {
        Ok(FrameStatus::Completed)
    }

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    fn window_resized(&mut self, _width: u32, _height: u32) {}

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn load_mesh(&mut self, _mesh: &MeshData) -> Result<MeshId> {
        Ok(0)
    }

    fn unload_mesh(&mut self, _id: MeshId) -> Result<()> {
        Ok(())
    }

    fn update_mesh_matrix(&mut self, _id: MeshId, _matrix: Mat4) -> Result<()> {
        Ok(())
    }

    fn load_texture(&mut self, _texture: &TextureData) -> Result<TextureId> {
        Ok(0)
    }

    fn unload_texture(&mut self, _id: TextureId) -> Result<()> {
        Ok(())
    }

    fn apply_texture_to_mesh(&mut self, _texture: TextureId, _mesh: MeshId) -> Result<()> {
        Ok(())
    }

    fn remove_texture_from_mesh(&mut self, _texture: TextureId, _mesh: MeshId) -> Result<()> {
        Ok(())
    }

    fn update_view_matrix(&mut self, _matrix: Mat4) {}

    fn update_perspective_matrix(&mut self, _matrix: Mat4) {}

    fn add_triangle(&mut self, _triangle: &Triangle2D) -> TriangleId {
        0
    }

    fn remove_triangle(&mut self, _id: TriangleId) {}

    fn update_triangle_color(&mut self, _id: TriangleId, _color: [f32; 4]) {}

    fn update_triangle_position(&mut self, _id: TriangleId, _points: [Vec2; 3]) {}

    fn translate_triangle(&mut self, _id: TriangleId, _translation: Vec2) {}

    fn add_triangles(&mut self, triangles: &[Triangle2D]) -> Vec<TriangleId> {
        vec![0; triangles.len()]
    }

    fn remove_triangles(&mut self, _ids: &[TriangleId]) {}

    fn update_triangles_color(&mut self, _ids: &[TriangleId], _color: [f32; 4]) {}

    fn translate_triangles(&mut self, _ids: &[TriangleId], _translation: Vec2) {}

    fn features(&self) -> RendererFeatures {
        RendererFeatures::empty()
    }

    fn stats(&self) -> RendererStats {
        RendererStats::default()
    }
}

// ============================================================================
// Singleton lifecycle tests
// ============================================================================

#[test]
#[serial]
fn test_initialize_is_idempotent() {
    assert!(Engine::initialize().is_ok());
    assert!(Engine::initialize().is_ok());
    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_create_and_get_renderer() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();

    Engine::create_renderer(NullRenderer).unwrap();

    let renderer = Engine::renderer().unwrap();
    let mut guard = renderer.lock().unwrap();
    assert!(matches!(guard.render().unwrap(), FrameStatus::Completed));

    drop(guard);
    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_renderer_not_created_is_error() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();

    let result = Engine::renderer();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_duplicate_renderer_is_error() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();

    Engine::create_renderer(NullRenderer).unwrap();
    let result = Engine::create_renderer(NullRenderer);
    assert!(result.is_err());

    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_destroy_renderer_allows_recreation() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();

    Engine::create_renderer(NullRenderer).unwrap();
    Engine::destroy_renderer().unwrap();
    assert!(Engine::renderer().is_err());

    Engine::create_renderer(NullRenderer).unwrap();
    assert!(Engine::renderer().is_ok());

    Engine::reset_for_testing();
}

#[test]
#[serial]
fn test_shutdown_clears_renderer() {
    Engine::initialize().unwrap();
    Engine::reset_for_testing();

    Engine::create_renderer(NullRenderer).unwrap();
    Engine::shutdown();
    assert!(Engine::renderer().is_err());
}

// ============================================================================
// Logging API tests
// ============================================================================

struct CountingLogger {
    count: std::sync::Arc<std::sync::Mutex<usize>>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
#[serial]
fn test_set_logger_routes_macro_output() {
    let count = std::sync::Arc::new(std::sync::Mutex::new(0));
    Engine::set_logger(CountingLogger {
        count: count.clone(),
    });

    crate::engine_info!("nebula3d::test", "hello {}", 1);
    crate::engine_error!("nebula3d::test", "boom");

    assert_eq!(*count.lock().unwrap(), 2);

    Engine::reset_logger();
}
