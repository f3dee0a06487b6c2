//! Material description.
//!
//! A material is a tuple of texture slots (albedo, normal, specular, light)
//! plus alpha handling. Slots left as `None` are backed by the renderer's
//! built-in default texture. The backend allocates one descriptor set per
//! material at mesh load and frees it at unload.

use crate::renderer::TextureId;

/// How the alpha channel is interpreted when shading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Alpha ignored, surface fully opaque
    #[default]
    Opaque,
    /// Fragments below the threshold are discarded
    Mask,
    /// Alpha blending
    Blend,
}

/// Surface description for one primitive
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub albedo: Option<TextureId>,
    pub normal_map: Option<TextureId>,
    pub specular: Option<TextureId>,
    pub light_map: Option<TextureId>,
    pub alpha_mode: AlphaMode,
    /// Cutoff used by `AlphaMode::Mask`
    pub alpha_threshold: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            albedo: None,
            normal_map: None,
            specular: None,
            light_map: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_threshold: 0.5,
        }
    }
}

impl MaterialData {
    /// The texture ids this material references, in binding order
    /// (albedo, normal, specular, light)
    pub fn texture_slots(&self) -> [Option<TextureId>; 4] {
        [self.albedo, self.normal_map, self.specular, self.light_map]
    }

    /// Whether any slot references the given texture
    pub fn references(&self, texture: TextureId) -> bool {
        self.texture_slots().iter().any(|slot| *slot == Some(texture))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
