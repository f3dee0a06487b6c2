//! Renderer capability surface and backend-facing types

mod renderer;
mod mock_renderer;

pub use renderer::*;

#[cfg(test)]
pub use mock_renderer::MockRenderer;
