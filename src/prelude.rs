//! Prelude module for common pinmap types and traits
//!
//! This module re-exports the most commonly used types and traits for easy
//! importing with `use pinmap::prelude::*;`

pub use crate::core::{
    config::MapConfig,
    geo::{LatLng, Point, TileCoord},
    map::{MapOptions, MapSurface},
    viewport::Viewport,
};

pub use crate::geocoding::{Geocoder, NominatimConfig, NominatimGeocoder, Place};

pub use crate::geolocation::{GeolocationError, LocationProvider, NoGeolocation};

pub use crate::input::{EventManager, MapEvent};

pub use crate::layers::marker::{Marker, MarkerId, MarkerStore};

pub use crate::rendering::{MapBackend, SceneBackend};

pub use crate::tiles::{MapStyle, TemplateSource, TileCache, TileSource};

pub use crate::ui::{Effect, MapController, Notice, Outcome, StatusView, UiEvent};

#[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
pub use crate::runtime::EffectRunner;

#[cfg(all(feature = "egui", not(target_arch = "wasm32")))]
pub use crate::ui::widget::MapView;

pub use crate::{MapError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
