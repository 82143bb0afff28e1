use async_trait::async_trait;
use pinmap::{
    runtime::perform, Effect, GeocodeError, Geocoder, GeolocationError, LatLng, LocationProvider,
    MapConfig, MapController, MapStyle, Notice, Place, SceneBackend, UiEvent,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Integration tests for user flows driven through the controller.
/// A scripted geocoder and the in-memory scene stand in for Nominatim and
/// Leaflet.
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[derive(Default)]
    struct ScriptedGeocoder {
        places: HashMap<String, Place>,
        addresses: Vec<(LatLng, String)>,
        fail_search: bool,
        forward_calls: Mutex<Vec<String>>,
        reverse_calls: Mutex<Vec<LatLng>>,
    }

    impl ScriptedGeocoder {
        fn with_place(mut self, query: &str, position: LatLng, name: &str) -> Self {
            self.places.insert(
                query.to_string(),
                Place {
                    position,
                    display_name: name.to_string(),
                },
            );
            self
        }

        fn with_address(mut self, position: LatLng, name: &str) -> Self {
            self.addresses.push((position, name.to_string()));
            self
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn forward(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
            self.forward_calls.lock().unwrap().push(query.to_string());
            if self.fail_search {
                return Err(GeocodeError::Decode("connection reset".to_string()));
            }
            Ok(self.places.get(query).cloned())
        }

        async fn reverse(&self, position: LatLng) -> Result<Option<String>, GeocodeError> {
            self.reverse_calls.lock().unwrap().push(position);
            Ok(self
                .addresses
                .iter()
                .find(|(at, _)| *at == position)
                .map(|(_, name)| name.clone()))
        }
    }

    struct FixedLocation(Result<LatLng, GeolocationError>);

    #[async_trait]
    impl LocationProvider for FixedLocation {
        async fn current_position(&self) -> Result<LatLng, GeolocationError> {
            self.0.clone()
        }
    }

    fn controller() -> MapController<SceneBackend> {
        MapController::new(SceneBackend::new(), MapConfig::default()).unwrap()
    }

    /// Handle `event` and every event its effects answer with, to completion
    async fn drive<G: Geocoder, L: LocationProvider>(
        controller: &mut MapController<SceneBackend>,
        geocoder: &G,
        locator: &L,
        event: UiEvent,
    ) -> Vec<Notice> {
        let mut notices = Vec::new();
        let mut queue = vec![event];
        while let Some(event) = queue.pop() {
            let outcome = controller.handle(event).unwrap();
            notices.extend(outcome.notices);
            for effect in outcome.effects {
                queue.push(perform(effect, geocoder, locator).await);
            }
        }
        notices
    }

    #[tokio::test]
    async fn test_search_places_labelled_marker() {
        let monas = LatLng::new(-6.1754, 106.8272);
        let geocoder = ScriptedGeocoder::default().with_place("Monas", monas, "Monas, Jakarta, Indonesia");
        let mut controller = controller();

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Err(GeolocationError::Unsupported)),
            UiEvent::SearchSubmitted("  Monas  ".to_string()),
        )
        .await;

        assert!(notices.is_empty());
        assert_eq!(*geocoder.forward_calls.lock().unwrap(), vec!["Monas".to_string()]);
        assert_eq!(controller.surface().center(), monas);
        assert_eq!(controller.surface().zoom(), 15);
        assert_eq!(controller.status().zoom_text(), "15");
        assert_eq!(controller.status().marker_count_text(), "1");

        let marker = controller.markers().at(0).unwrap();
        assert_eq!(marker.title(), "Monas, Jakarta, Indonesia");
        // Labelled markers never ask for an address
        assert!(geocoder.reverse_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_result_changes_nothing() {
        let geocoder = ScriptedGeocoder::default();
        let mut controller = controller();
        let center = controller.surface().center();
        let zoom = controller.surface().zoom();

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Err(GeolocationError::Unsupported)),
            UiEvent::SearchSubmitted("Atlantis".to_string()),
        )
        .await;

        assert_eq!(notices, vec![Notice::NotFound]);
        assert_eq!(
            notices[0].to_string(),
            "Location not found. Please try a different search term."
        );
        assert_eq!(controller.markers().count(), 0);
        assert_eq!(controller.surface().backend().marker_count(), 0);
        assert_eq!(controller.surface().center(), center);
        assert_eq!(controller.surface().zoom(), zoom);
    }

    #[tokio::test]
    async fn test_blank_search_makes_no_request() {
        let geocoder = ScriptedGeocoder::default();
        let mut controller = controller();

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Err(GeolocationError::Unsupported)),
            UiEvent::SearchSubmitted("   ".to_string()),
        )
        .await;

        assert_eq!(notices, vec![Notice::EmptySearch]);
        assert!(geocoder.forward_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_error() {
        let geocoder = ScriptedGeocoder {
            fail_search: true,
            ..Default::default()
        };
        let mut controller = controller();

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Err(GeolocationError::Unsupported)),
            UiEvent::SearchSubmitted("Bandung".to_string()),
        )
        .await;

        assert_eq!(notices, vec![Notice::SearchFailed]);
        assert_eq!(controller.markers().count(), 0);
    }

    #[tokio::test]
    async fn test_click_resolves_address_in_place() {
        let position = LatLng::new(-6.2, 106.8);
        let geocoder = ScriptedGeocoder::default().with_address(position, "Jakarta, Indonesia");
        let mut controller = controller();

        let outcome = controller.handle(UiEvent::MapClicked(position)).unwrap();
        assert_eq!(controller.markers().count(), 1);
        let marker = controller.markers().at(0).unwrap();
        assert_eq!(marker.title(), "Marker 1");
        assert_eq!(marker.popup().heading, "Custom Marker");
        assert_eq!(
            outcome.effects,
            vec![Effect::ReverseGeocode {
                marker: marker.id(),
                position
            }]
        );

        for effect in outcome.effects {
            let answer = perform(effect, &geocoder, &FixedLocation(Err(GeolocationError::Unsupported))).await;
            controller.handle(answer).unwrap();
        }
        assert_eq!(*geocoder.reverse_calls.lock().unwrap(), vec![position]);

        let marker = controller.markers().at(0).unwrap();
        let rendered = controller.surface().backend().marker(marker.handle()).unwrap();
        assert_eq!(rendered.popup.heading, "Jakarta, Indonesia");
        assert_eq!(rendered.popup.position.lat_text(), "-6.200000");
        assert_eq!(rendered.popup.position.lng_text(), "106.800000");

        let html = rendered.popup.to_html();
        assert!(html.contains("Jakarta, Indonesia"));
        assert!(html.contains("-6.200000"));
        assert!(html.contains("106.800000"));
        // The hover title keeps its generated name
        assert_eq!(rendered.title, "Marker 1");
    }

    #[tokio::test]
    async fn test_late_address_after_removal_is_dropped() {
        let first = LatLng::new(-6.2, 106.8);
        let second = LatLng::new(-6.3, 106.9);
        let geocoder = ScriptedGeocoder::default()
            .with_address(first, "Jakarta, Indonesia")
            .with_address(second, "South Jakarta, Indonesia");
        let locator = FixedLocation(Err(GeolocationError::Unsupported));
        let mut controller = controller();

        let late_first = controller.handle(UiEvent::MapClicked(first)).unwrap().effects;
        let late_second = controller.handle(UiEvent::MapClicked(second)).unwrap().effects;
        let removed = controller.markers().at(0).unwrap().id();
        let kept = controller.markers().at(1).unwrap().id();

        controller
            .handle(UiEvent::RemoveMarkerRequested(removed))
            .unwrap();
        assert_eq!(controller.status().marker_count, 1);

        for effect in late_first.into_iter().chain(late_second) {
            let answer = perform(effect, &geocoder, &locator).await;
            controller.handle(answer).unwrap();
        }

        let scene = controller.surface().backend();
        assert_eq!(scene.marker_count(), 1);
        let (_, survivor) = scene.markers().next().unwrap();
        assert_eq!(survivor.popup.marker, kept);
        assert_eq!(survivor.popup.heading, "South Jakarta, Indonesia");

        // After a clear, nothing comes back
        let late = controller.handle(UiEvent::MapClicked(first)).unwrap().effects;
        controller.handle(UiEvent::ClearRequested).unwrap();
        for effect in late {
            let answer = perform(effect, &geocoder, &locator).await;
            controller.handle(answer).unwrap();
        }
        assert_eq!(controller.surface().backend().marker_count(), 0);
        assert_eq!(controller.status().marker_count, 0);
    }

    #[test]
    fn test_remove_action_targets_marker_after_index_shift() {
        let mut controller = controller();
        for i in 0..3 {
            controller
                .handle(UiEvent::MapClicked(LatLng::new(i as f64, i as f64)))
                .unwrap();
        }
        let ids: Vec<_> = controller.markers().iter().map(|m| m.id()).collect();
        let third_action = controller.markers().at(2).unwrap().popup().remove_action();

        controller
            .handle(UiEvent::RemoveMarkerRequested(ids[0]))
            .unwrap();
        // The third marker's popup was rendered before the shift and still
        // names the same marker
        assert_eq!(third_action, format!("removeMarkerById({})", ids[2]));
        controller
            .handle(UiEvent::RemoveMarkerRequested(ids[2]))
            .unwrap();

        let remaining: Vec<_> = controller.markers().iter().map(|m| m.id()).collect();
        assert_eq!(remaining, vec![ids[1]]);
        assert_eq!(controller.surface().backend().marker_count(), 1);
    }

    #[test]
    fn test_marker_count_arithmetic() {
        let mut controller = controller();
        let mut expected = 0usize;

        for i in 0..6 {
            controller
                .handle(UiEvent::ForwardGeocoded(Ok(Some(Place {
                    position: LatLng::new(i as f64, 100.0 + i as f64),
                    display_name: format!("Place {}", i),
                }))))
                .unwrap();
            expected += 1;
        }
        assert_eq!(controller.status().marker_count, expected);

        for id in [2, 4].map(|slot| controller.markers().at(slot).unwrap().id()) {
            controller.handle(UiEvent::RemoveMarkerRequested(id)).unwrap();
            expected -= 1;
        }
        assert_eq!(controller.status().marker_count, expected);
        assert_eq!(controller.surface().backend().marker_count(), expected);

        controller.handle(UiEvent::ClearRequested).unwrap();
        assert_eq!(controller.status().marker_count, 0);
        assert_eq!(controller.surface().backend().detached_markers(), 6);
    }

    #[test]
    fn test_style_round_trip_keeps_single_layer() {
        let mut controller = controller();

        controller
            .handle(UiEvent::StyleSelected(MapStyle::Dark))
            .unwrap();
        let scene = controller.surface().backend();
        assert_eq!(scene.tile_layer_count(), 1);
        assert_eq!(scene.attribution(), Some(MapStyle::Dark.config().attribution));

        controller
            .handle(UiEvent::StyleSelected(MapStyle::Standard))
            .unwrap();
        let scene = controller.surface().backend();
        assert_eq!(scene.tile_layer_count(), 1);
        assert_eq!(scene.attribution(), Some("© OpenStreetMap contributors"));
        assert_eq!(
            scene.tile_layers().next().map(|config| config.url_template),
            Some("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
        );
    }

    #[test]
    fn test_unknown_style_name_is_rejected() {
        let err = "satellite".parse::<MapStyle>().unwrap_err();
        assert!(err.to_string().contains("satellite"));
        assert_eq!("topo".parse::<MapStyle>().unwrap(), MapStyle::Topo);
    }

    #[tokio::test]
    async fn test_current_location_flow() {
        let geocoder = ScriptedGeocoder::default();
        let here = LatLng::new(-7.2575, 112.7521);
        let mut controller = controller();

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Ok(here)),
            UiEvent::LocateRequested,
        )
        .await;
        assert!(notices.is_empty());
        assert_eq!(controller.surface().center(), here);
        assert_eq!(controller.surface().zoom(), 15);
        assert_eq!(
            controller.markers().at(0).unwrap().title(),
            "Your Current Location"
        );

        let notices = drive(
            &mut controller,
            &geocoder,
            &FixedLocation(Err(GeolocationError::service_failed("User denied Geolocation"))),
            UiEvent::LocateRequested,
        )
        .await;
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].to_string(),
            "Error: The Geolocation service failed.\nUser denied Geolocation"
        );
        assert_eq!(controller.markers().count(), 1);
    }

    #[test]
    fn test_initial_surface_state() {
        let controller = controller();
        let scene = controller.surface().backend();

        assert_eq!(scene.container(), Some("map"));
        assert_eq!(scene.view(), (LatLng::new(-6.2088, 106.8456), 10));
        assert_eq!(scene.tile_layer_count(), 1);
        assert!(scene.has_pending_invalidation());
        assert_eq!(controller.status().zoom_text(), "10");
        assert_eq!(controller.status().marker_count_text(), "0");
    }
}
