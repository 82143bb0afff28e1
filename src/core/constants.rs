//! Widget-wide defaults derived from Leaflet conventions and the stock page.
//! Keeping them in a single place makes it easier to tweak magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Programmatic +/- zoom step for the zoom buttons.
pub const DEFAULT_ZOOM_DELTA: i32 = 1;

/// Initial map center (Jakarta, Indonesia).
pub const DEFAULT_CENTER: (f64, f64) = (-6.2088, 106.8456);

/// Initial zoom level.
pub const DEFAULT_ZOOM: u8 = 10;

/// Zoom used when focusing a search hit or the device location.
pub const FOCUS_ZOOM: u8 = 15;

/// Delay before the one-time size recalculation after the map is created.
pub const INVALIDATE_SIZE_DELAY_MS: u64 = 100;

/// DOM id of the element the map renders into.
pub const DEFAULT_CONTAINER_ID: &str = "map";

/// Label given to the marker dropped at the device location.
pub const CURRENT_LOCATION_LABEL: &str = "Your Current Location";

/// Popup heading shown while an unlabelled marker waits for its address.
pub const PENDING_ADDRESS_HEADING: &str = "Custom Marker";

/// Marker pin radius in pixels on the native canvas.
pub const MARKER_PIN_RADIUS: f32 = 7.0;
