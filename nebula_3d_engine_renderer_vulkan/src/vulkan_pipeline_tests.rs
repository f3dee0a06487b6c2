use super::*;
use nebula_3d_engine::glam::Mat4;

// ============================================================================
// Mesh vertex input tests
// ============================================================================

#[test]
fn test_mesh_vertex_binding() {
    let binding = mesh_vertex_binding();
    assert_eq!(binding.binding, 0);
    assert_eq!(binding.stride, 44);
    assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
}

#[test]
fn test_mesh_vertex_attribute_offsets() {
    let attributes = mesh_vertex_attributes();

    assert_eq!(attributes[0].offset, 0); // position
    assert_eq!(attributes[1].offset, 12); // uv
    assert_eq!(attributes[2].offset, 20); // color
    assert_eq!(attributes[3].offset, 32); // normal

    assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
    assert_eq!(attributes[1].format, vk::Format::R32G32_SFLOAT);
    assert_eq!(attributes[2].format, vk::Format::R32G32B32_SFLOAT);
    assert_eq!(attributes[3].format, vk::Format::R32G32B32_SFLOAT);
}

#[test]
fn test_mesh_vertex_attributes_cover_whole_stride() {
    let attributes = mesh_vertex_attributes();
    for window in attributes.windows(2) {
        assert!(window[0].offset < window[1].offset);
    }
    // Last attribute (vec3 normal) ends exactly at the stride
    assert_eq!(attributes[3].offset + 12, mesh_vertex_binding().stride);
}

// ============================================================================
// 2D vertex input tests
// ============================================================================

#[test]
fn test_two_d_vertex_binding() {
    let binding = two_d_vertex_binding();
    assert_eq!(binding.stride, 24);
    assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
}

#[test]
fn test_two_d_vertex_attributes() {
    let attributes = two_d_vertex_attributes();
    assert_eq!(attributes[0].offset, 0);
    assert_eq!(attributes[0].format, vk::Format::R32G32_SFLOAT);
    assert_eq!(attributes[1].offset, 8);
    assert_eq!(attributes[1].format, vk::Format::R32G32B32A32_SFLOAT);
}

// ============================================================================
// Push constant tests
// ============================================================================

#[test]
fn test_push_constant_holds_one_matrix() {
    assert_eq!(PUSH_CONSTANT_SIZE as usize, std::mem::size_of::<Mat4>());
}
