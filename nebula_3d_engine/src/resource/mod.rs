//! CPU-side resource descriptions
//!
//! Plain data handed to the renderer by the asset-loading layer. Nothing in
//! this module owns GPU state; backends turn these descriptions into device
//! resources and hand back integer ids.

mod mesh;
mod material;
mod texture;
mod triangle;

pub use mesh::{Vertex, Primitive, MeshData};
pub use material::{AlphaMode, MaterialData};
pub use texture::TextureData;
pub use triangle::Triangle2D;
