//! Forward and reverse geocoding.
//!
//! [`Geocoder`] is the client seam; [`NominatimGeocoder`] talks to the public
//! OpenStreetMap Nominatim service.

pub mod nominatim;

pub use nominatim::{NominatimConfig, NominatimGeocoder};

use crate::core::geo::LatLng;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A resolved place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub position: LatLng,
    pub display_name: String,
}

/// Why a lookup failed. Users see one generic message for all of these.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for GeocodeError {
    fn from(err: serde_json::Error) -> Self {
        GeocodeError::Decode(err.to_string())
    }
}

/// Text ↔ coordinate lookups. Single attempt each, no retry.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Geocoder {
    /// Best match for `query`, or `None` when nothing was found
    async fn forward(&self, query: &str) -> Result<Option<Place>, GeocodeError>;

    /// Human-readable description of `position`, when the provider has one
    async fn reverse(&self, position: LatLng) -> Result<Option<String>, GeocodeError>;
}
