use crate::{
    core::geo::LatLng,
    input::{EventManager, MapEvent},
    rendering::backend::{LayerHandle, MapBackend, MarkerHandle},
    tiles::registry::MapStyle,
    ui::popup::Popup,
    Result,
};
use std::time::Duration;

/// Options applied when the surface is created
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub container: String,
    pub center: LatLng,
    pub zoom: u8,
    pub style: MapStyle,
    /// Delay before the one-time size recalculation
    pub invalidate_delay: Duration,
}

impl Default for MapOptions {
    fn default() -> Self {
        use crate::core::constants::*;
        Self {
            container: DEFAULT_CONTAINER_ID.to_string(),
            center: LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            zoom: DEFAULT_ZOOM,
            style: MapStyle::Standard,
            invalidate_delay: Duration::from_millis(INVALIDATE_SIZE_DELAY_MS),
        }
    }
}

/// The map view: current center and zoom plus the single active tile layer.
///
/// Exactly one tile layer is attached at any time; [`set_style`](Self::set_style)
/// swaps it.
pub struct MapSurface<B: MapBackend> {
    backend: B,
    center: LatLng,
    zoom: u8,
    style: MapStyle,
    active_layer: LayerHandle,
    event_manager: EventManager,
}

impl<B: MapBackend> MapSurface<B> {
    /// Create the map view, attach the initial style and schedule the deferred
    /// size recalculation.
    pub fn initialize(mut backend: B, options: MapOptions) -> Result<Self> {
        let zoom = options.zoom.min(options.style.config().max_zoom);
        backend.create_map(&options.container, options.center, zoom)?;
        let active_layer = backend.add_tile_layer(options.style.config())?;
        backend.schedule_invalidate_size(options.invalidate_delay);

        let mut event_manager = EventManager::new();
        event_manager.emit(MapEvent::LayerAdd {
            style: options.style,
        });

        log::info!(
            "map initialized in #{} at {} (zoom {}, style {})",
            options.container,
            options.center,
            zoom,
            options.style
        );

        Ok(Self {
            backend,
            center: options.center,
            zoom,
            style: options.style,
            active_layer,
            event_manager,
        })
    }

    /// Recenter and rezoom. The zoom is capped at the active layer's max zoom.
    pub fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()> {
        let zoom = zoom.min(self.max_zoom());
        self.backend.set_view(center, zoom)?;
        self.record_view(center, zoom);
        Ok(())
    }

    /// Record a view change that already happened inside the backend
    /// (user drag or wheel zoom) without pushing it back down.
    pub fn sync_view(&mut self, center: LatLng, zoom: u8) {
        self.record_view(center, zoom.min(self.max_zoom()));
    }

    fn record_view(&mut self, center: LatLng, zoom: u8) {
        let zoom_changed = zoom != self.zoom;
        if center != self.center || zoom_changed {
            self.center = center;
            self.zoom = zoom;
            self.event_manager
                .emit(MapEvent::ViewChanged { center, zoom });
        }
        if zoom_changed {
            self.event_manager.emit(MapEvent::ZoomEnd { zoom });
        }
    }

    /// Change zoom by `delta`, clamped to `[0, max_zoom]`
    pub fn zoom_by(&mut self, delta: i32) -> Result<()> {
        let target = (self.zoom as i32 + delta).clamp(0, self.max_zoom() as i32) as u8;
        if target == self.zoom {
            return Ok(());
        }
        self.set_view(self.center, target)
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.zoom_by(crate::core::constants::DEFAULT_ZOOM_DELTA)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.zoom_by(-crate::core::constants::DEFAULT_ZOOM_DELTA)
    }

    /// Swap the active tile layer for the one registered for `style`.
    ///
    /// The new layer is attached before the old one is detached, so a failure
    /// on either side leaves the previous style in place.
    pub fn set_style(&mut self, style: MapStyle) -> Result<()> {
        if style == self.style {
            return Ok(());
        }

        let added = self.backend.add_tile_layer(style.config())?;
        if let Err(err) = self.backend.remove_tile_layer(self.active_layer) {
            if let Err(undo) = self.backend.remove_tile_layer(added) {
                log::warn!("failed to detach {} layer after error: {}", style, undo);
            }
            return Err(err);
        }

        let previous = self.style;
        self.active_layer = added;
        self.style = style;
        self.event_manager
            .emit(MapEvent::LayerRemove { style: previous });
        self.event_manager.emit(MapEvent::LayerAdd { style });
        self.event_manager
            .emit(MapEvent::BaseLayerChange { style });
        log::info!("map style changed to: {}", style);

        // A lower max zoom pulls the view back into range
        if self.zoom > style.config().max_zoom {
            self.set_view(self.center, style.config().max_zoom)?;
        }
        Ok(())
    }

    /// Report a click on the map at `lat_lng`
    pub fn click(&mut self, lat_lng: LatLng) {
        self.event_manager.emit(MapEvent::Click { lat_lng });
    }

    pub(crate) fn attach_marker(
        &mut self,
        position: LatLng,
        title: &str,
        popup: &Popup,
    ) -> Result<MarkerHandle> {
        self.backend.add_marker(position, title, popup)
    }

    pub(crate) fn update_popup(&mut self, handle: MarkerHandle, popup: &Popup) -> Result<()> {
        self.backend.set_popup(handle, popup)
    }

    pub(crate) fn detach_marker(&mut self, handle: MarkerHandle) -> Result<()> {
        self.backend.remove_marker(handle)
    }

    /// Drain queued notifications
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        self.event_manager.process_events()
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn style(&self) -> MapStyle {
        self.style
    }

    pub fn max_zoom(&self) -> u8 {
        self.style.config().max_zoom
    }

    /// Attribution of the active tile layer
    pub fn attribution(&self) -> &'static str {
        self.style.config().attribution
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::scene::SceneBackend;

    fn surface() -> MapSurface<SceneBackend> {
        MapSurface::initialize(SceneBackend::new(), MapOptions::default()).unwrap()
    }

    #[test]
    fn test_initialize() {
        let map = surface();
        assert_eq!(map.zoom(), 10);
        assert_eq!(map.center(), LatLng::new(-6.2088, 106.8456));
        assert_eq!(map.style(), MapStyle::Standard);
        assert_eq!(map.backend().container(), Some("map"));
        assert_eq!(map.backend().tile_layer_count(), 1);
        assert!(map.backend().has_pending_invalidation());
    }

    #[test]
    fn test_set_view() {
        let mut map = surface();
        map.process_events();

        let new_center = LatLng::new(10.0, 20.0);
        map.set_view(new_center, 15).unwrap();
        assert_eq!(map.center(), new_center);
        assert_eq!(map.zoom(), 15);
        assert_eq!(map.backend().view(), (new_center, 15));

        let events = map.process_events();
        assert!(events.contains(&MapEvent::ZoomEnd { zoom: 15 }));
    }

    #[test]
    fn test_zoom_buttons_clamp() {
        let mut map = surface();
        map.set_view(map.center(), 19).unwrap();
        map.process_events();

        map.zoom_in().unwrap();
        assert_eq!(map.zoom(), 19);
        assert!(map.process_events().is_empty());

        map.zoom_out().unwrap();
        assert_eq!(map.zoom(), 18);

        map.set_view(map.center(), 0).unwrap();
        map.zoom_out().unwrap();
        assert_eq!(map.zoom(), 0);
    }

    #[test]
    fn test_style_switch_keeps_one_layer() {
        let mut map = surface();

        map.set_style(MapStyle::Dark).unwrap();
        assert_eq!(map.backend().tile_layer_count(), 1);
        assert_eq!(map.backend().attribution(), Some(map.attribution()));
        assert_eq!(map.attribution(), "© OpenStreetMap contributors, © CARTO");

        map.set_style(MapStyle::Standard).unwrap();
        assert_eq!(map.backend().tile_layer_count(), 1);
        assert_eq!(map.backend().attribution(), Some("© OpenStreetMap contributors"));
    }

    #[test]
    fn test_topo_caps_zoom() {
        let mut map = surface();
        map.set_view(map.center(), 19).unwrap();
        map.process_events();

        map.set_style(MapStyle::Topo).unwrap();
        assert_eq!(map.zoom(), 17);
        let events = map.process_events();
        assert!(events.contains(&MapEvent::BaseLayerChange {
            style: MapStyle::Topo
        }));
        assert!(events.contains(&MapEvent::ZoomEnd { zoom: 17 }));
    }

    /// Scene backend whose next tile layer attach fails
    struct FlakyBackend {
        scene: SceneBackend,
        fail_next_attach: bool,
    }

    impl MapBackend for FlakyBackend {
        fn create_map(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<()> {
            self.scene.create_map(container, center, zoom)
        }

        fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()> {
            self.scene.set_view(center, zoom)
        }

        fn add_tile_layer(
            &mut self,
            config: &'static crate::tiles::registry::TileLayerConfig,
        ) -> Result<LayerHandle> {
            if std::mem::take(&mut self.fail_next_attach) {
                return Err(crate::MapError::Layer("tile server refused".to_string()));
            }
            self.scene.add_tile_layer(config)
        }

        fn remove_tile_layer(&mut self, handle: LayerHandle) -> Result<()> {
            self.scene.remove_tile_layer(handle)
        }

        fn add_marker(&mut self, position: LatLng, title: &str, popup: &Popup) -> Result<MarkerHandle> {
            self.scene.add_marker(position, title, popup)
        }

        fn set_popup(&mut self, handle: MarkerHandle, popup: &Popup) -> Result<()> {
            self.scene.set_popup(handle, popup)
        }

        fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()> {
            self.scene.remove_marker(handle)
        }

        fn schedule_invalidate_size(&mut self, delay: Duration) {
            self.scene.schedule_invalidate_size(delay)
        }
    }

    #[test]
    fn test_failed_style_attach_keeps_previous_layer() {
        let backend = FlakyBackend {
            scene: SceneBackend::new(),
            fail_next_attach: false,
        };
        let mut map = MapSurface::initialize(backend, MapOptions::default()).unwrap();
        map.process_events();

        map.backend_mut().fail_next_attach = true;
        assert!(map.set_style(MapStyle::Dark).is_err());
        assert_eq!(map.style(), MapStyle::Standard);
        assert_eq!(map.backend().scene.tile_layer_count(), 1);
        assert_eq!(
            map.backend().scene.attribution(),
            Some("© OpenStreetMap contributors")
        );
        assert!(map.process_events().is_empty());

        // The surface recovers on the next attempt
        map.set_style(MapStyle::Dark).unwrap();
        map.set_style(MapStyle::Topo).unwrap();
        assert_eq!(map.style(), MapStyle::Topo);
        assert_eq!(map.backend().scene.tile_layer_count(), 1);
    }

    #[test]
    fn test_sync_view_does_not_touch_backend() {
        let mut map = surface();
        map.sync_view(LatLng::new(1.0, 1.0), 12);
        assert_eq!(map.zoom(), 12);
        assert_eq!(map.backend().view().1, 10);
    }
}
