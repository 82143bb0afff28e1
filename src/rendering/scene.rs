use super::backend::{LayerHandle, MapBackend, MarkerHandle};
use crate::{
    core::geo::LatLng, tiles::registry::TileLayerConfig, ui::popup::Popup, MapError, Result,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A marker as the scene holds it
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMarker {
    pub position: LatLng,
    pub title: String,
    pub popup: Popup,
}

/// Retained in-memory scene.
///
/// Records everything a map library would draw. The native canvas paints from
/// it, and tests inspect it to check that rendered state matches the store.
#[derive(Debug, Default)]
pub struct SceneBackend {
    container: Option<String>,
    center: LatLng,
    zoom: u8,
    tile_layers: Vec<(LayerHandle, &'static TileLayerConfig)>,
    markers: BTreeMap<MarkerHandle, SceneMarker>,
    next_handle: u64,
    invalidate_at: Option<Instant>,
    size_invalidations: usize,
    detached_markers: usize,
}

impl SceneBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Container the map was created in, if any
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Last view pushed by the surface
    pub fn view(&self) -> (LatLng, u8) {
        (self.center, self.zoom)
    }

    /// Attached tile layers, bottom to top
    pub fn tile_layers(&self) -> impl Iterator<Item = &'static TileLayerConfig> + '_ {
        self.tile_layers.iter().map(|(_, config)| *config)
    }

    pub fn tile_layer_count(&self) -> usize {
        self.tile_layers.len()
    }

    /// Attribution of the topmost tile layer
    pub fn attribution(&self) -> Option<&'static str> {
        self.tile_layers.last().map(|(_, config)| config.attribution)
    }

    /// Rendered markers in creation order
    pub fn markers(&self) -> impl Iterator<Item = (MarkerHandle, &SceneMarker)> + '_ {
        self.markers.iter().map(|(handle, marker)| (*handle, marker))
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&SceneMarker> {
        self.markers.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// How many markers have been detached over the scene's lifetime
    pub fn detached_markers(&self) -> usize {
        self.detached_markers
    }

    /// How many deferred size recalculations have run
    pub fn size_invalidations(&self) -> usize {
        self.size_invalidations
    }

    pub fn has_pending_invalidation(&self) -> bool {
        self.invalidate_at.is_some()
    }

    /// Run the deferred size recalculation if it is due. Returns `true` when
    /// the caller should re-measure its drawing area.
    pub fn poll_invalidate(&mut self, now: Instant) -> bool {
        match self.invalidate_at {
            Some(due) if now >= due => {
                self.invalidate_at = None;
                self.size_invalidations += 1;
                log::debug!("scene size invalidated");
                true
            }
            _ => false,
        }
    }
}

impl MapBackend for SceneBackend {
    fn create_map(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<()> {
        if self.container.is_some() {
            return Err(MapError::Backend(
                "map container is already initialized".to_string(),
            ));
        }
        self.container = Some(container.to_string());
        self.center = center;
        self.zoom = zoom;
        Ok(())
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()> {
        self.center = center;
        self.zoom = zoom;
        Ok(())
    }

    fn add_tile_layer(&mut self, config: &'static TileLayerConfig) -> Result<LayerHandle> {
        let handle = LayerHandle(self.next_handle());
        self.tile_layers.push((handle, config));
        Ok(handle)
    }

    fn remove_tile_layer(&mut self, handle: LayerHandle) -> Result<()> {
        let before = self.tile_layers.len();
        self.tile_layers.retain(|(h, _)| *h != handle);
        if self.tile_layers.len() == before {
            return Err(MapError::Layer(format!("unknown tile layer {:?}", handle)));
        }
        Ok(())
    }

    fn add_marker(&mut self, position: LatLng, title: &str, popup: &Popup) -> Result<MarkerHandle> {
        let handle = MarkerHandle(self.next_handle());
        self.markers.insert(
            handle,
            SceneMarker {
                position,
                title: title.to_string(),
                popup: popup.clone(),
            },
        );
        Ok(handle)
    }

    fn set_popup(&mut self, handle: MarkerHandle, popup: &Popup) -> Result<()> {
        let marker = self
            .markers
            .get_mut(&handle)
            .ok_or_else(|| MapError::Layer(format!("unknown marker {:?}", handle)))?;
        marker.popup = popup.clone();
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()> {
        self.markers
            .remove(&handle)
            .ok_or_else(|| MapError::Layer(format!("unknown marker {:?}", handle)))?;
        self.detached_markers += 1;
        Ok(())
    }

    fn schedule_invalidate_size(&mut self, delay: Duration) {
        self.invalidate_at = Some(Instant::now() + delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::marker::MarkerId;
    use crate::tiles::registry::MapStyle;

    #[test]
    fn test_create_map_once() {
        let mut scene = SceneBackend::new();
        scene.create_map("map", LatLng::new(1.0, 2.0), 4).unwrap();
        assert_eq!(scene.container(), Some("map"));
        assert_eq!(scene.view(), (LatLng::new(1.0, 2.0), 4));
        assert!(scene.create_map("map", LatLng::default(), 1).is_err());
    }

    #[test]
    fn test_tile_layers_attach_and_detach() {
        let mut scene = SceneBackend::new();
        let standard = scene.add_tile_layer(MapStyle::Standard.config()).unwrap();
        let dark = scene.add_tile_layer(MapStyle::Dark.config()).unwrap();
        assert_eq!(scene.tile_layer_count(), 2);
        assert_eq!(scene.attribution(), Some(MapStyle::Dark.config().attribution));

        scene.remove_tile_layer(dark).unwrap();
        assert_eq!(scene.attribution(), Some(MapStyle::Standard.config().attribution));
        assert!(scene.remove_tile_layer(dark).is_err());
        scene.remove_tile_layer(standard).unwrap();
        assert_eq!(scene.attribution(), None);
    }

    #[test]
    fn test_marker_lifecycle() {
        let mut scene = SceneBackend::new();
        let popup = Popup::new(MarkerId::from_raw(1), "Marker 1", LatLng::default());
        let handle = scene.add_marker(LatLng::default(), "Marker 1", &popup).unwrap();

        let renamed = Popup::new(MarkerId::from_raw(1), "Somewhere", LatLng::default());
        scene.set_popup(handle, &renamed).unwrap();
        assert_eq!(scene.marker(handle).unwrap().popup.heading, "Somewhere");

        scene.remove_marker(handle).unwrap();
        assert_eq!(scene.marker_count(), 0);
        assert_eq!(scene.detached_markers(), 1);
        assert!(scene.set_popup(handle, &renamed).is_err());
    }

    #[test]
    fn test_deferred_invalidation_runs_once() {
        let mut scene = SceneBackend::new();
        scene.schedule_invalidate_size(Duration::from_millis(100));
        let now = Instant::now();

        assert!(!scene.poll_invalidate(now));
        assert!(scene.poll_invalidate(now + Duration::from_millis(150)));
        assert!(!scene.poll_invalidate(now + Duration::from_millis(300)));
        assert_eq!(scene.size_invalidations(), 1);
    }
}
