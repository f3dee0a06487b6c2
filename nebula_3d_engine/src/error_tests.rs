//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("Instance creation failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("Instance creation failed"));
}

#[test]
fn test_no_suitable_device_display() {
    let err = Error::NoSuitableDevice("no physical device with present support".to_string());
    let display = format!("{}", err);
    assert!(display.contains("No suitable device"));
    assert!(display.contains("present support"));
}

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("mesh 42 not loaded".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("mesh 42"));
}

#[test]
fn test_no_compatible_memory_type_display() {
    let err = Error::NoCompatibleMemoryType;
    let display = format!("{}", err);
    assert!(display.contains("No compatible memory type"));
}

#[test]
fn test_unsupported_layout_transition_display() {
    let err = Error::UnsupportedLayoutTransition(
        "COLOR_ATTACHMENT_OPTIMAL -> TRANSFER_SRC_OPTIMAL".to_string(),
    );
    let display = format!("{}", err);
    assert!(display.contains("Unsupported image layout transition"));
    assert!(display.contains("COLOR_ATTACHMENT_OPTIMAL"));
}

#[test]
fn test_unsupported_blit_format_display() {
    let err = Error::UnsupportedBlitFormat("R8G8B8A8_SRGB".to_string());
    let display = format!("{}", err);
    assert!(display.contains("linear blit"));
    assert!(display.contains("R8G8B8A8_SRGB"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    // Verify Error implements std::error::Error trait
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::NoSuitableDevice("x".to_string()));
    assert!(debug.contains("NoSuitableDevice"));

    let debug = format!("{:?}", Error::NoCompatibleMemoryType);
    assert!(debug.contains("NoCompatibleMemoryType"));

    let debug = format!("{:?}", Error::UnsupportedBlitFormat("f".to_string()));
    assert!(debug.contains("UnsupportedBlitFormat"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::UnsupportedLayoutTransition("a -> b".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));

    let err3 = Error::NoCompatibleMemoryType;
    let err4 = err3.clone();
    assert_eq!(format!("{}", err3), format!("{}", err4));
}

// ============================================================================
// RESULT TYPE TESTS
// ============================================================================

#[test]
fn test_result_type_ok() {
    fn returns_ok() -> Result<i32> {
        Ok(42)
    }

    let result = returns_ok();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::NoCompatibleMemoryType)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(outer().is_err());
}

#[test]
fn test_error_message_content() {
    // Error messages must carry enough detail to diagnose the failed operation
    let err = Error::BackendError("vkCreateSwapchainKHR: ERROR_DEVICE_LOST".to_string());
    assert!(format!("{}", err).contains("ERROR_DEVICE_LOST"));

    let err = Error::InvalidResource("texture 7 referenced by material 3".to_string());
    assert!(format!("{}", err).contains("texture 7"));
}
