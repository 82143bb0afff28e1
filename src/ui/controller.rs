//! The single owner of map state.
//!
//! Frontends translate widget input into [`UiEvent`]s and hand them to
//! [`MapController::handle`]. The controller mutates the surface and the
//! marker store synchronously and returns the network work it needs as
//! [`Effect`]s; whoever runs an effect feeds the result back in as another
//! event. The controller itself never awaits.

use crate::{
    core::{config::MapConfig, constants::CURRENT_LOCATION_LABEL, geo::LatLng, map::MapSurface},
    geocoding::{GeocodeError, Place},
    geolocation::GeolocationError,
    input::MapEvent,
    layers::marker::{usable_label, MarkerId, MarkerStore},
    rendering::backend::MapBackend,
    tiles::registry::MapStyle,
    ui::status::{Notice, StatusView},
    Result,
};

/// Everything the controller reacts to
#[derive(Debug)]
pub enum UiEvent {
    /// Search button clicked or Enter pressed in the search box
    SearchSubmitted(String),
    ForwardGeocoded(std::result::Result<Option<Place>, GeocodeError>),
    LocateRequested,
    Located(std::result::Result<LatLng, GeolocationError>),
    ClearRequested,
    ZoomInRequested,
    ZoomOutRequested,
    StyleSelected(MapStyle),
    MapClicked(LatLng),
    /// The user moved the view directly on the map (drag, wheel)
    ViewMoved { center: LatLng, zoom: u8 },
    /// "Remove Marker" pressed inside a popup
    RemoveMarkerRequested(MarkerId),
    ReverseGeocoded {
        marker: MarkerId,
        result: std::result::Result<Option<String>, GeocodeError>,
    },
}

/// Asynchronous work requested by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer with [`UiEvent::ForwardGeocoded`]
    ForwardGeocode { query: String },
    /// Answer with [`UiEvent::ReverseGeocoded`]
    ReverseGeocode { marker: MarkerId, position: LatLng },
    /// Answer with [`UiEvent::Located`]
    LocateDevice,
}

/// What handling one event produced
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    pub notices: Vec<Notice>,
}

impl Outcome {
    fn effect(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            notices: Vec::new(),
        }
    }

    fn notice(notice: Notice) -> Self {
        Self {
            effects: Vec::new(),
            notices: vec![notice],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.notices.is_empty()
    }
}

pub struct MapController<B: MapBackend> {
    config: MapConfig,
    surface: MapSurface<B>,
    markers: MarkerStore,
    status: StatusView,
}

impl<B: MapBackend> MapController<B> {
    /// Create the surface on `backend` using `config`'s initial view
    pub fn new(backend: B, config: MapConfig) -> Result<Self> {
        let surface = MapSurface::initialize(backend, config.map_options())?;
        let status = StatusView {
            marker_count: 0,
            zoom: surface.zoom(),
            style: surface.style(),
            attribution: surface.attribution(),
        };

        let mut controller = Self {
            config,
            surface,
            markers: MarkerStore::new(),
            status,
        };
        controller.refresh_status();
        Ok(controller)
    }

    pub fn handle(&mut self, event: UiEvent) -> Result<Outcome> {
        let outcome = self.dispatch(event);
        // Status mirrors whatever did change, even when a later step failed
        self.refresh_status();
        outcome
    }

    fn dispatch(&mut self, event: UiEvent) -> Result<Outcome> {
        match event {
            UiEvent::SearchSubmitted(text) => {
                let query = text.trim();
                if query.is_empty() {
                    return Ok(Outcome::notice(Notice::EmptySearch));
                }
                log::debug!("searching for {:?}", query);
                Ok(Outcome::effect(Effect::ForwardGeocode {
                    query: query.to_string(),
                }))
            }
            UiEvent::ForwardGeocoded(Ok(Some(place))) => {
                self.focus(place.position, place.display_name)
            }
            UiEvent::ForwardGeocoded(Ok(None)) => Ok(Outcome::notice(Notice::NotFound)),
            UiEvent::ForwardGeocoded(Err(err)) => {
                log::error!("error searching location: {}", err);
                Ok(Outcome::notice(Notice::SearchFailed))
            }
            UiEvent::LocateRequested => Ok(Outcome::effect(Effect::LocateDevice)),
            UiEvent::Located(Ok(position)) => {
                self.focus(position, CURRENT_LOCATION_LABEL.to_string())
            }
            UiEvent::Located(Err(err)) => {
                log::warn!("geolocation failed: {:?}", err);
                Ok(Outcome::notice(Notice::Geolocation(err)))
            }
            UiEvent::ClearRequested => {
                self.markers.clear(&mut self.surface)?;
                Ok(Outcome::default())
            }
            UiEvent::ZoomInRequested => {
                self.surface.zoom_in()?;
                Ok(Outcome::default())
            }
            UiEvent::ZoomOutRequested => {
                self.surface.zoom_out()?;
                Ok(Outcome::default())
            }
            UiEvent::StyleSelected(style) => {
                self.surface.set_style(style)?;
                Ok(Outcome::default())
            }
            UiEvent::MapClicked(position) => {
                self.surface.click(position);
                self.drop_marker(position, None)
            }
            UiEvent::ViewMoved { center, zoom } => {
                self.surface.sync_view(center, zoom);
                Ok(Outcome::default())
            }
            UiEvent::RemoveMarkerRequested(id) => {
                if !self.markers.remove(&mut self.surface, id)? {
                    log::debug!("remove requested for unknown marker {}", id);
                }
                Ok(Outcome::default())
            }
            UiEvent::ReverseGeocoded { marker, result } => {
                match result {
                    Ok(Some(name)) => {
                        self.markers.apply_address(&mut self.surface, marker, &name)?;
                    }
                    Ok(None) => log::debug!("no address for marker {}", marker),
                    Err(err) => log::debug!("error getting address: {}", err),
                }
                Ok(Outcome::default())
            }
        }
    }

    /// Center on `position` at the focus zoom and drop a labelled marker there
    fn focus(&mut self, position: LatLng, label: String) -> Result<Outcome> {
        self.surface.set_view(position, self.config.focus_zoom)?;
        self.drop_marker(position, Some(label))
    }

    /// Add a marker, asking for its address when it has no usable label
    fn drop_marker(&mut self, position: LatLng, label: Option<String>) -> Result<Outcome> {
        let label = usable_label(label);
        let needs_address = label.is_none();
        let marker = self.markers.add(&mut self.surface, position, label)?;
        if needs_address {
            Ok(Outcome::effect(Effect::ReverseGeocode { marker, position }))
        } else {
            Ok(Outcome::default())
        }
    }

    fn refresh_status(&mut self) {
        for event in self.surface.process_events() {
            match event {
                MapEvent::ZoomEnd { zoom } => self.status.zoom = zoom,
                MapEvent::BaseLayerChange { style } => {
                    self.status.style = style;
                    self.status.attribution = style.config().attribution;
                }
                _ => {}
            }
        }
        self.status.marker_count = self.markers.count();
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn surface(&self) -> &MapSurface<B> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut MapSurface<B> {
        &mut self.surface
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }
}
