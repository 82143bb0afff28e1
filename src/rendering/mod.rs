pub mod backend;
pub mod scene;

pub use backend::{LayerHandle, MapBackend, MarkerHandle};
pub use scene::{SceneBackend, SceneMarker};
