use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR { format, color_space }
}

fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
    let mut caps = vk::SurfaceCapabilitiesKHR::default();
    caps.min_image_count = min;
    caps.max_image_count = max;
    caps
}

// ============================================================================
// Surface format tests
// ============================================================================

#[test]
fn test_bgra_srgb_preferred() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    let chosen = choose_surface_format(&formats);
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn test_first_format_when_preferred_missing() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    assert_eq!(choose_surface_format(&formats).format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_srgb_format_with_wrong_color_space_rejected() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
    ];
    assert_eq!(choose_surface_format(&formats).format, vk::Format::R8G8B8A8_UNORM);
}

// ============================================================================
// Present mode tests
// ============================================================================

#[test]
fn test_mailbox_preferred() {
    let modes = [
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_fifo_fallback() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
}

// ============================================================================
// Extent tests
// ============================================================================

#[test]
fn test_current_extent_used_when_pinned() {
    let mut caps = vk::SurfaceCapabilitiesKHR::default();
    caps.current_extent = vk::Extent2D { width: 1920, height: 1080 };

    let extent = choose_extent(&caps, 640, 480);
    assert_eq!(extent.width, 1920);
    assert_eq!(extent.height, 1080);
}

#[test]
fn test_window_size_clamped_when_surface_flexible() {
    let mut caps = vk::SurfaceCapabilitiesKHR::default();
    caps.current_extent = vk::Extent2D { width: u32::MAX, height: u32::MAX };
    caps.min_image_extent = vk::Extent2D { width: 100, height: 100 };
    caps.max_image_extent = vk::Extent2D { width: 2000, height: 2000 };

    let extent = choose_extent(&caps, 4000, 50);
    assert_eq!(extent.width, 2000);
    assert_eq!(extent.height, 100);

    let extent = choose_extent(&caps, 800, 600);
    assert_eq!(extent.width, 800);
    assert_eq!(extent.height, 600);
}

// ============================================================================
// Image count tests
// ============================================================================

#[test]
fn test_image_count_per_present_mode() {
    let caps = capabilities(1, 8);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::MAILBOX), 3);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::FIFO), 2);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::FIFO_RELAXED), 2);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::IMMEDIATE), 1);
}

#[test]
fn test_image_count_raised_to_surface_minimum() {
    let caps = capabilities(4, 8);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::MAILBOX), 4);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::IMMEDIATE), 4);
}

#[test]
fn test_image_count_clamped_to_surface_maximum() {
    let caps = capabilities(1, 2);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::MAILBOX), 2);
}

#[test]
fn test_zero_maximum_means_unbounded() {
    let caps = capabilities(2, 0);
    assert_eq!(choose_image_count(&caps, vk::PresentModeKHR::MAILBOX), 3);
}

#[test]
fn test_image_count_hard_ceiling() {
    let caps = capabilities(32, 0);
    assert_eq!(
        choose_image_count(&caps, vk::PresentModeKHR::FIFO),
        MAX_SWAPCHAIN_IMAGES
    );
}

#[test]
fn test_retrieved_image_count_within_ceiling_accepted() {
    assert!(check_image_count(1).is_ok());
    assert!(check_image_count(MAX_SWAPCHAIN_IMAGES as usize).is_ok());
}

#[test]
fn test_retrieved_image_count_above_ceiling_rejected() {
    // The driver may hand back more images than the requested minimum
    assert!(check_image_count(MAX_SWAPCHAIN_IMAGES as usize + 1).is_err());
}

// ============================================================================
// Sharing mode tests
// ============================================================================

#[test]
fn test_unified_family_stays_exclusive() {
    let (mode, indices) = choose_sharing(QueueFamilies { graphics: 0, present: 0 });
    assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
    assert!(indices.is_empty());
}

#[test]
fn test_split_families_share_concurrently() {
    let (mode, indices) = choose_sharing(QueueFamilies { graphics: 0, present: 2 });
    assert_eq!(mode, vk::SharingMode::CONCURRENT);
    assert_eq!(indices, vec![0, 2]);
}
