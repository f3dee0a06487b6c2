//! Debug 2D triangle primitives.
//!
//! Flat-colored triangles drawn on top of the scene with the TwoD pipeline,
//! in normalized device coordinates. Intended for debug overlays; batched
//! CPU-side and re-uploaded only when the batch changes.

use glam::Vec2;

/// One debug triangle: three NDC points and a flat RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle2D {
    pub points: [Vec2; 3],
    pub color: [f32; 4],
}

impl Triangle2D {
    pub fn new(points: [Vec2; 3], color: [f32; 4]) -> Self {
        Self { points, color }
    }

    /// Move all three points by the same offset
    pub fn translate(&mut self, translation: Vec2) {
        for point in &mut self.points {
            *point += translation;
        }
    }
}
