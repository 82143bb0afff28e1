//! Widget configuration.
//!
//! Every field has a default matching the stock page, so a partial JSON
//! document only needs the values it wants to change.

use crate::{
    core::{constants, geo::LatLng, map::MapOptions},
    geocoding::NominatimConfig,
    tiles::registry::MapStyle,
    Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// DOM id (or window title) of the map container
    pub container_id: String,
    pub default_center: LatLng,
    pub default_zoom: u8,
    /// Zoom used when focusing a search hit or the device location
    pub focus_zoom: u8,
    pub default_style: MapStyle,
    /// Delay before the one-time size recalculation
    pub invalidate_delay_ms: u64,
    pub geocoder: NominatimConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container_id: constants::DEFAULT_CONTAINER_ID.to_string(),
            default_center: LatLng::new(constants::DEFAULT_CENTER.0, constants::DEFAULT_CENTER.1),
            default_zoom: constants::DEFAULT_ZOOM,
            focus_zoom: constants::FOCUS_ZOOM,
            default_style: MapStyle::Standard,
            invalidate_delay_ms: constants::INVALIDATE_SIZE_DELAY_MS,
            geocoder: NominatimConfig::default(),
        }
    }
}

impl MapConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Surface options derived from this configuration
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            container: self.container_id.clone(),
            center: self.default_center,
            zoom: self.default_zoom,
            style: self.default_style,
            invalidate_delay: Duration::from_millis(self.invalidate_delay_ms),
        }
    }
}
