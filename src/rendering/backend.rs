//! The seam between the widget and whatever actually draws the map.
//!
//! A backend owns rendered objects (the map view, tile layers, markers and
//! their popups) and hands out opaque handles for them. Leaflet implements it
//! in the browser; [`SceneBackend`](super::scene::SceneBackend) keeps a
//! retained in-memory scene for the native canvas and for tests.

use crate::{
    core::geo::LatLng, tiles::registry::TileLayerConfig, ui::popup::Popup, Result,
};
use std::time::Duration;

/// Opaque reference to an attached tile layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(pub u64);

/// Opaque reference to a rendered marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Rendering surface driven by [`MapSurface`](crate::core::map::MapSurface)
pub trait MapBackend {
    /// Create the map view inside `container`
    fn create_map(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<()>;

    /// Recenter and rezoom the view
    fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()>;

    /// Attach a tile layer built from `config`
    fn add_tile_layer(&mut self, config: &'static TileLayerConfig) -> Result<LayerHandle>;

    /// Detach a previously attached tile layer
    fn remove_tile_layer(&mut self, handle: LayerHandle) -> Result<()>;

    /// Render a marker with a bound popup
    fn add_marker(&mut self, position: LatLng, title: &str, popup: &Popup) -> Result<MarkerHandle>;

    /// Replace the content of a marker's popup in place
    fn set_popup(&mut self, handle: MarkerHandle, popup: &Popup) -> Result<()>;

    /// Detach a rendered marker
    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()>;

    /// Recalculate the view size once `delay` has elapsed
    fn schedule_invalidate_size(&mut self, delay: Duration);
}
