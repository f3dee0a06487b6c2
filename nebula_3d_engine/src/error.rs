//! Error types for the Nebula3D engine
//!
//! This module defines the error types used throughout the engine and its
//! rendering backends: initialization, per-resource load/transfer failures,
//! and backend-reported errors.
//!
//! Recoverable frame conditions (stale surface, minimized window) are NOT
//! errors — they are reported as `FrameStatus` values by the renderer.

use std::fmt;

/// Result type for Nebula3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nebula3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),

    /// No physical device satisfies the rendering requirements
    NoSuitableDevice(String),

    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown mesh/texture/material id, bad data)
    InvalidResource(String),

    /// No device memory type matches the requested filter and properties
    NoCompatibleMemoryType,

    /// Image layout transition outside the supported table
    UnsupportedLayoutTransition(String),

    /// Texture format does not support linear blitting for mipmap generation
    UnsupportedBlitFormat(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NoSuitableDevice(msg) => write!(f, "No suitable device: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::NoCompatibleMemoryType => {
                write!(f, "No compatible memory type for requested properties")
            }
            Error::UnsupportedLayoutTransition(msg) => {
                write!(f, "Unsupported image layout transition: {}", msg)
            }
            Error::UnsupportedBlitFormat(msg) => {
                write!(f, "Format does not support linear blit: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
