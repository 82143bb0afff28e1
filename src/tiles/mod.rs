pub mod cache;
#[cfg(not(target_arch = "wasm32"))]
pub mod loader;
pub mod registry;
pub mod source;

// Re-exports for convenience
pub use cache::{TileCache, TileKey};
#[cfg(not(target_arch = "wasm32"))]
pub use loader::TileLoader;
pub use registry::{MapStyle, TileLayerConfig};
pub use source::{TemplateSource, TileSource};
