//! # pinmap
//!
//! An interactive map widget: basemap styles, user-placed markers with
//! reverse-geocoded popups, place search and "show my location".
//!
//! [`MapController`] owns all state and reacts to [`UiEvent`]s. Rendering goes
//! through a [`MapBackend`]: Leaflet in the browser (feature `wasm`), or the
//! retained [`SceneBackend`] drawn by the egui canvas (feature `egui`).

pub mod core;
pub mod geocoding;
pub mod geolocation;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub mod ui;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod web;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::MapConfig,
    geo::{LatLng, Point, TileCoord},
    map::{MapOptions, MapSurface},
    viewport::Viewport,
};

pub use geocoding::{GeocodeError, Geocoder, NominatimConfig, NominatimGeocoder, Place};

pub use geolocation::{GeolocationError, LocationProvider, NoGeolocation};

pub use layers::marker::{Marker, MarkerId, MarkerStore};

pub use rendering::{MapBackend, SceneBackend};

pub use tiles::registry::{MapStyle, TileLayerConfig};

pub use ui::{
    controller::{Effect, MapController, Outcome, UiEvent},
    popup::Popup,
    status::{Notice, StatusView},
};

#[cfg(all(feature = "egui", not(target_arch = "wasm32")))]
pub use ui::widget::MapView;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown map style: {0}")]
    UnknownStyle(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
