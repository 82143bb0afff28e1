use crate::geolocation::GeolocationError;
use crate::tiles::registry::MapStyle;
use std::fmt;

/// Live values the page shows next to the map
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub marker_count: usize,
    pub zoom: u8,
    pub style: MapStyle,
    pub attribution: &'static str,
}

impl StatusView {
    pub fn marker_count_text(&self) -> String {
        self.marker_count.to_string()
    }

    pub fn zoom_text(&self) -> String {
        self.zoom.to_string()
    }
}

/// A user-visible, modal-style notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Search submitted with blank input; no request was made
    EmptySearch,
    /// The geocoder answered but found nothing
    NotFound,
    /// The search request failed for any reason
    SearchFailed,
    /// Device location could not be determined
    Geolocation(GeolocationError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::EmptySearch => f.write_str("Please enter a location to search"),
            Notice::NotFound => {
                f.write_str("Location not found. Please try a different search term.")
            }
            Notice::SearchFailed => {
                f.write_str("Error searching for location. Please try again.")
            }
            Notice::Geolocation(err) => f.write_str(&err.user_message()),
        }
    }
}
