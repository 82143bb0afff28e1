//! Fixed registry of basemap styles.
//!
//! Each [`MapStyle`] maps to one static [`TileLayerConfig`]. The set is closed:
//! the only way to name a style that does not exist is through string parsing,
//! which fails with [`MapError::UnknownStyle`].

use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Tile-source configuration for one basemap style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayerConfig {
    /// URL template, e.g. `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub url_template: &'static str,
    /// Attribution text shown while the layer is active
    pub attribution: &'static str,
    /// Highest zoom the provider serves
    pub max_zoom: u8,
    /// Subdomains substituted for `{s}`
    pub subdomains: &'static [&'static str],
}

const ABC: &[&str] = &["a", "b", "c"];
const ABCD: &[&str] = &["a", "b", "c", "d"];

static STANDARD: TileLayerConfig = TileLayerConfig {
    url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
    attribution: "© OpenStreetMap contributors",
    max_zoom: 19,
    subdomains: ABC,
};

static HUMANITARIAN: TileLayerConfig = TileLayerConfig {
    url_template: "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png",
    attribution:
        "© OpenStreetMap contributors, Tiles courtesy of Humanitarian OpenStreetMap Team",
    max_zoom: 19,
    subdomains: ABC,
};

static TOPO: TileLayerConfig = TileLayerConfig {
    url_template: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
    attribution: "© OpenStreetMap contributors, SRTM | Map style: © OpenTopoMap",
    max_zoom: 17,
    subdomains: ABC,
};

static DARK: TileLayerConfig = TileLayerConfig {
    url_template: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
    attribution: "© OpenStreetMap contributors, © CARTO",
    max_zoom: 19,
    subdomains: ABCD,
};

/// Basemap styles offered by the style selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    Standard,
    Humanitarian,
    Topo,
    Dark,
}

impl MapStyle {
    /// Every style, in selector order
    pub const ALL: [MapStyle; 4] = [
        MapStyle::Standard,
        MapStyle::Humanitarian,
        MapStyle::Topo,
        MapStyle::Dark,
    ];

    /// The tile-source configuration registered for this style
    pub fn config(self) -> &'static TileLayerConfig {
        match self {
            MapStyle::Standard => &STANDARD,
            MapStyle::Humanitarian => &HUMANITARIAN,
            MapStyle::Topo => &TOPO,
            MapStyle::Dark => &DARK,
        }
    }

    /// Key used by the style selector (`<option value=...>`)
    pub fn key(self) -> &'static str {
        match self {
            MapStyle::Standard => "standard",
            MapStyle::Humanitarian => "humanitarian",
            MapStyle::Topo => "topo",
            MapStyle::Dark => "dark",
        }
    }

    /// Human-readable name for selector labels
    pub fn label(self) -> &'static str {
        match self {
            MapStyle::Standard => "Standard",
            MapStyle::Humanitarian => "Humanitarian",
            MapStyle::Topo => "Topographic",
            MapStyle::Dark => "Dark",
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MapStyle {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        MapStyle::ALL
            .into_iter()
            .find(|style| style.key() == s.trim())
            .ok_or_else(|| MapError::UnknownStyle(s.to_string()))
    }
}
