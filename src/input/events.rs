use crate::core::geo::LatLng;
use crate::tiles::registry::MapStyle;
use std::collections::VecDeque;

/// Notifications emitted by the map surface
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Map view has changed (center or zoom)
    ViewChanged { center: LatLng, zoom: u8 },
    /// Click on the map
    Click { lat_lng: LatLng },
    /// Zoom level settled on a new value
    ZoomEnd { zoom: u8 },
    /// Tile layer for `style` was attached
    LayerAdd { style: MapStyle },
    /// Tile layer for `style` was detached
    LayerRemove { style: MapStyle },
    /// Active basemap switched
    BaseLayerChange { style: MapStyle },
}

/// Queues map events until the owner drains them
#[derive(Debug, Default)]
pub struct EventManager {
    /// Events waiting to be processed
    event_queue: VecDeque<MapEvent>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an event to the queue
    pub fn emit(&mut self, event: MapEvent) {
        self.event_queue.push_back(event);
    }

    /// Drain all queued events in emission order
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_queue.drain(..).collect()
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}
