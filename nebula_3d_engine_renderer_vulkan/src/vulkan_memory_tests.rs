use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
    let mut properties = vk::PhysicalDeviceMemoryProperties::default();
    properties.memory_type_count = types.len() as u32;
    for (i, &flags) in types.iter().enumerate() {
        properties.memory_types[i].property_flags = flags;
    }
    properties
}

// ============================================================================
// Memory type selection tests
// ============================================================================

#[test]
fn test_first_superset_match_wins() {
    let properties = memory_properties(&[
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        vk::MemoryPropertyFlags::HOST_VISIBLE
            | vk::MemoryPropertyFlags::HOST_COHERENT
            | vk::MemoryPropertyFlags::HOST_CACHED,
    ]);

    let index = find_memory_type(
        &properties,
        0b111,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
    .unwrap();
    assert_eq!(index, 1);
}

#[test]
fn test_type_filter_masks_out_candidates() {
    let properties = memory_properties(&[
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    ]);

    // Only type 1 is allowed by the requirement bitmask
    let index = find_memory_type(&properties, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
    assert_eq!(index, 1);
}

#[test]
fn test_no_compatible_type_is_an_error() {
    let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

    let result = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE);
    assert!(matches!(result, Err(Error::NoCompatibleMemoryType)));
}

#[test]
fn test_superset_is_accepted() {
    // A type carrying more flags than requested still qualifies
    let properties = memory_properties(&[
        vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
    ]);

    let index = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
    assert_eq!(index, 0);
}

// ============================================================================
// Mip chain tests
// ============================================================================

#[test]
fn test_mip_level_count() {
    assert_eq!(mip_level_count(1, 1), 1);
    assert_eq!(mip_level_count(2, 2), 2);
    assert_eq!(mip_level_count(256, 256), 9);
    assert_eq!(mip_level_count(1024, 1024), 11);
}

#[test]
fn test_mip_level_count_uses_larger_dimension() {
    assert_eq!(mip_level_count(512, 64), 10);
    assert_eq!(mip_level_count(64, 512), 10);
}

#[test]
fn test_mip_level_count_non_power_of_two() {
    // floor(log2(1000)) + 1 = 10
    assert_eq!(mip_level_count(1000, 600), 10);
}

// ============================================================================
// Layout transition tests
// ============================================================================

#[test]
fn test_upload_transition() {
    let masks = transition_masks(
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    )
    .unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::empty());
    assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
}

#[test]
fn test_sample_transition() {
    let masks = transition_masks(
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    )
    .unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
    assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::TRANSFER);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
}

#[test]
fn test_unknown_transition_is_rejected() {
    let result = transition_masks(
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );
    assert!(matches!(
        result,
        Err(Error::UnsupportedLayoutTransition(_))
    ));

    // The offending pair is named in the error
    if let Err(Error::UnsupportedLayoutTransition(message)) = transition_masks(
        vk::ImageLayout::GENERAL,
        vk::ImageLayout::PRESENT_SRC_KHR,
    ) {
        assert!(message.contains("GENERAL"));
        assert!(message.contains("PRESENT_SRC_KHR"));
    }
}
