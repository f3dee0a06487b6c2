use super::*;
use glam::{Mat4, Vec2, Vec3};
use crate::renderer::{FrameStatus, Renderer};
use crate::resource::{MaterialData, MeshData, Primitive, TextureData, Triangle2D, Vertex};

// ============================================================================
// Helpers
// ============================================================================

fn triangle_mesh(name: &str) -> MeshData {
    let vertices = vec![
        Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
        Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
        Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
    ];
    MeshData {
        name: name.to_string(),
        model_matrix: Mat4::IDENTITY,
        vertices,
        indices: vec![0, 1, 2],
        primitives: vec![Primitive {
            index_offset: 0,
            index_count: 3,
            material: MaterialData::default(),
        }],
    }
}

fn white_texture(name: &str) -> TextureData {
    TextureData {
        name: name.to_string(),
        width: 2,
        height: 2,
        pixels: vec![255u8; 2 * 2 * 4],
    }
}

fn debug_triangle() -> Triangle2D {
    Triangle2D::new(
        [
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.0, 0.5),
        ],
        [1.0, 0.0, 0.0, 1.0],
    )
}

// ============================================================================
// Mesh registry tests
// ============================================================================

#[test]
fn test_load_mesh_returns_sequential_ids() {
    let mut renderer = MockRenderer::new();
    assert_eq!(renderer.load_mesh(&triangle_mesh("a")).unwrap(), 0);
    assert_eq!(renderer.load_mesh(&triangle_mesh("b")).unwrap(), 1);
    assert_eq!(renderer.stats().meshes, 2);
}

#[test]
fn test_unload_mesh_recycles_id() {
    let mut renderer = MockRenderer::new();
    let a = renderer.load_mesh(&triangle_mesh("a")).unwrap();
    let _b = renderer.load_mesh(&triangle_mesh("b")).unwrap();

    renderer.unload_mesh(a).unwrap();
    let c = renderer.load_mesh(&triangle_mesh("c")).unwrap();
    assert_eq!(c, a);
    assert_eq!(renderer.mesh(c).unwrap().name, "c");
}

#[test]
fn test_unload_unknown_mesh_is_error() {
    let mut renderer = MockRenderer::new();
    assert!(renderer.unload_mesh(42).is_err());
}

#[test]
fn test_load_invalid_mesh_is_rejected() {
    let mut renderer = MockRenderer::new();
    let mut mesh = triangle_mesh("broken");
    mesh.indices[0] = 99;
    assert!(renderer.load_mesh(&mesh).is_err());
    assert_eq!(renderer.stats().meshes, 0);
}

#[test]
fn test_update_mesh_matrix() {
    let mut renderer = MockRenderer::new();
    let id = renderer.load_mesh(&triangle_mesh("a")).unwrap();

    let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    renderer.update_mesh_matrix(id, matrix).unwrap();
    assert_eq!(renderer.mesh(id).unwrap().model_matrix, matrix);

    assert!(renderer.update_mesh_matrix(99, matrix).is_err());
}

// ============================================================================
// Texture registry tests
// ============================================================================

#[test]
fn test_load_and_unload_texture() {
    let mut renderer = MockRenderer::new();
    let id = renderer.load_texture(&white_texture("white")).unwrap();
    assert_eq!(renderer.texture(id).unwrap().width, 2);

    renderer.unload_texture(id).unwrap();
    assert!(renderer.texture(id).is_none());
    assert!(renderer.unload_texture(id).is_err());
}

#[test]
fn test_load_invalid_texture_is_rejected() {
    let mut renderer = MockRenderer::new();
    let mut texture = white_texture("broken");
    texture.pixels.pop();
    assert!(renderer.load_texture(&texture).is_err());
}

#[test]
fn test_apply_texture_to_mesh() {
    let mut renderer = MockRenderer::new();
    let mesh = renderer.load_mesh(&triangle_mesh("a")).unwrap();
    let texture = renderer.load_texture(&white_texture("white")).unwrap();

    renderer.apply_texture_to_mesh(texture, mesh).unwrap();
    assert_eq!(renderer.mesh(mesh).unwrap().materials[0].albedo, Some(texture));
}

#[test]
fn test_apply_texture_requires_both_resources() {
    let mut renderer = MockRenderer::new();
    let mesh = renderer.load_mesh(&triangle_mesh("a")).unwrap();
    let texture = renderer.load_texture(&white_texture("white")).unwrap();

    assert!(renderer.apply_texture_to_mesh(99, mesh).is_err());
    assert!(renderer.apply_texture_to_mesh(texture, 99).is_err());
}

#[test]
fn test_remove_texture_from_mesh() {
    let mut renderer = MockRenderer::new();
    let mesh = renderer.load_mesh(&triangle_mesh("a")).unwrap();
    let texture = renderer.load_texture(&white_texture("white")).unwrap();

    renderer.apply_texture_to_mesh(texture, mesh).unwrap();
    renderer.remove_texture_from_mesh(texture, mesh).unwrap();
    assert_eq!(renderer.mesh(mesh).unwrap().materials[0].albedo, None);
}

#[test]
fn test_unload_texture_detaches_from_meshes() {
    let mut renderer = MockRenderer::new();
    let mesh_a = renderer.load_mesh(&triangle_mesh("a")).unwrap();
    let mesh_b = renderer.load_mesh(&triangle_mesh("b")).unwrap();
    let texture = renderer.load_texture(&white_texture("white")).unwrap();

    renderer.apply_texture_to_mesh(texture, mesh_a).unwrap();
    renderer.apply_texture_to_mesh(texture, mesh_b).unwrap();

    // Unloading must not leave dangling references behind
    renderer.unload_texture(texture).unwrap();
    assert_eq!(renderer.mesh(mesh_a).unwrap().materials[0].albedo, None);
    assert_eq!(renderer.mesh(mesh_b).unwrap().materials[0].albedo, None);
}

// ============================================================================
// Camera tests
// ============================================================================

#[test]
fn test_camera_matrices_are_stored() {
    let mut renderer = MockRenderer::new();
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);

    renderer.update_view_matrix(view);
    renderer.update_perspective_matrix(proj);

    assert_eq!(renderer.view_matrix(), view);
    assert_eq!(renderer.perspective_matrix(), proj);
}

// ============================================================================
// Debug triangle tests
// ============================================================================

#[test]
fn test_add_and_remove_triangle() {
    let mut renderer = MockRenderer::new();
    let id = renderer.add_triangle(&debug_triangle());
    assert_eq!(renderer.stats().triangles, 1);

    renderer.remove_triangle(id);
    assert_eq!(renderer.stats().triangles, 0);
    assert!(renderer.triangle(id).is_none());
}

#[test]
fn test_update_triangle_color_and_position() {
    let mut renderer = MockRenderer::new();
    let id = renderer.add_triangle(&debug_triangle());

    renderer.update_triangle_color(id, [0.0, 1.0, 0.0, 1.0]);
    assert_eq!(renderer.triangle(id).unwrap().color, [0.0, 1.0, 0.0, 1.0]);

    let points = [Vec2::ZERO, Vec2::X, Vec2::Y];
    renderer.update_triangle_position(id, points);
    assert_eq!(renderer.triangle(id).unwrap().points, points);
}

#[test]
fn test_translate_triangle() {
    let mut renderer = MockRenderer::new();
    let id = renderer.add_triangle(&debug_triangle());

    renderer.translate_triangle(id, Vec2::new(0.25, -0.25));
    let points = renderer.triangle(id).unwrap().points;
    assert_eq!(points[0], Vec2::new(-0.25, -0.75));
    assert_eq!(points[2], Vec2::new(0.25, 0.25));
}

#[test]
fn test_batched_triangle_operations() {
    let mut renderer = MockRenderer::new();
    let batch = vec![debug_triangle(); 3];
    let ids = renderer.add_triangles(&batch);
    assert_eq!(ids.len(), 3);
    assert_eq!(renderer.stats().triangles, 3);

    renderer.update_triangles_color(&ids, [0.0, 0.0, 1.0, 1.0]);
    for &id in &ids {
        assert_eq!(renderer.triangle(id).unwrap().color, [0.0, 0.0, 1.0, 1.0]);
    }

    renderer.translate_triangles(&ids[..2], Vec2::splat(1.0));
    assert_eq!(
        renderer.triangle(ids[0]).unwrap().points[0],
        Vec2::new(0.5, 0.5)
    );
    // Third triangle untouched
    assert_eq!(
        renderer.triangle(ids[2]).unwrap().points[0],
        Vec2::new(-0.5, -0.5)
    );

    renderer.remove_triangles(&ids);
    assert_eq!(renderer.stats().triangles, 0);
}

// ============================================================================
// Frame status state machine tests
// ============================================================================

#[test]
fn test_render_present_normal_cycle() {
    let mut renderer = MockRenderer::new();
    assert_eq!(renderer.render().unwrap(), FrameStatus::Completed);
    assert_eq!(renderer.present().unwrap(), FrameStatus::Completed);
}

#[test]
fn test_minimized_window_short_circuits() {
    let mut renderer = MockRenderer::new();
    renderer.window_resized(0, 0);

    // No-ops until the window is restored, across repeated cycles
    for _ in 0..3 {
        assert_eq!(renderer.render().unwrap(), FrameStatus::Minimized);
        assert_eq!(renderer.present().unwrap(), FrameStatus::Minimized);
    }

    renderer.window_resized(1280, 720);
    assert_eq!(renderer.render().unwrap(), FrameStatus::Completed);
    assert_eq!(renderer.present().unwrap(), FrameStatus::Completed);
}

#[test]
fn test_present_without_render_reports_skip() {
    let mut renderer = MockRenderer::new();
    renderer.window_resized(640, 360);
    assert_eq!(renderer.present().unwrap(), FrameStatus::ResizePending);
}

#[test]
fn test_draw_calls_counted_per_primitive() {
    let mut renderer = MockRenderer::new();
    let mut mesh = triangle_mesh("a");
    mesh.primitives.push(Primitive {
        index_offset: 0,
        index_count: 3,
        material: MaterialData::default(),
    });
    renderer.load_mesh(&mesh).unwrap();
    renderer.add_triangle(&debug_triangle());

    renderer.render().unwrap();
    // Two primitives plus one triangle batch
    assert_eq!(renderer.stats().draw_calls, 3);
}

// ============================================================================
// Cleanup tests
// ============================================================================

#[test]
fn test_cleanup_clears_registries_and_ids() {
    let mut renderer = MockRenderer::new();
    renderer.load_mesh(&triangle_mesh("a")).unwrap();
    renderer.load_texture(&white_texture("t")).unwrap();
    renderer.add_triangle(&debug_triangle());

    renderer.cleanup().unwrap();
    let stats = renderer.stats();
    assert_eq!(stats.meshes, 0);
    assert_eq!(stats.textures, 0);
    assert_eq!(stats.triangles, 0);

    // Ids restart after teardown
    assert_eq!(renderer.load_mesh(&triangle_mesh("b")).unwrap(), 0);
}
