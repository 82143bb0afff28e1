//! Browser frontend.
//!
//! Binds the page controls (`#searchInput`, `#searchBtn`, `#mapType`, ...) to
//! a [`MapController`] drawing with Leaflet. Effects run in `spawn_local`;
//! their answers re-enter the controller after the await, so the controller
//! is never borrowed across one.

pub mod console;
pub mod geolocation;
pub mod leaflet;

pub use geolocation::BrowserGeolocation;
pub use leaflet::LeafletBackend;

use crate::{
    core::config::MapConfig,
    geocoding::NominatimGeocoder,
    layers::marker::MarkerId,
    runtime::perform,
    tiles::registry::MapStyle,
    ui::{
        controller::{MapController, UiEvent},
        popup::REMOVE_ACTION,
        status::StatusView,
    },
};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Document, Event, HtmlInputElement, HtmlSelectElement, KeyboardEvent, Window};

/// Global holding an optional JSON [`MapConfig`] set by the page
const CONFIG_GLOBAL: &str = "pinmapConfig";

struct App {
    window: Window,
    document: Document,
    controller: RefCell<MapController<LeafletBackend>>,
    geocoder: NominatimGeocoder,
    locator: BrowserGeolocation,
}

impl App {
    /// Handle `event` now, or right after the current handler when the
    /// controller is busy (Leaflet fires some events synchronously from
    /// inside `setView`).
    fn dispatch(self: &Rc<Self>, event: UiEvent) {
        let outcome = match self.controller.try_borrow_mut() {
            Ok(mut controller) => {
                let outcome = controller.handle(event);
                self.render_status(controller.status());
                outcome
            }
            Err(_) => {
                let app = Rc::clone(self);
                wasm_bindgen_futures::spawn_local(async move { app.dispatch(event) });
                return;
            }
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("map update failed: {}", err);
                return;
            }
        };

        for notice in outcome.notices {
            if let Err(err) = self.window.alert_with_message(&notice.to_string()) {
                log::warn!("alert failed: {:?}", err);
            }
        }
        for effect in outcome.effects {
            let app = Rc::clone(self);
            wasm_bindgen_futures::spawn_local(async move {
                let event = perform(effect, &app.geocoder, &app.locator).await;
                app.dispatch(event);
            });
        }
    }

    fn render_status(&self, status: &StatusView) {
        if let Some(element) = self.document.get_element_by_id("markerCount") {
            element.set_text_content(Some(&status.marker_count_text()));
        }
        if let Some(element) = self.document.get_element_by_id("zoomLevel") {
            element.set_text_content(Some(&status.zoom_text()));
        }
    }

    fn search_text(&self) -> String {
        self.document
            .get_element_by_id("searchInput")
            .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
            .unwrap_or_default()
    }

    fn listen<F>(self: &Rc<Self>, id: &str, kind: &str, mut handler: F) -> Result<(), JsValue>
    where
        F: FnMut(&Rc<Self>, Event) + 'static,
    {
        let element = self
            .document
            .get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))?;
        let app = Rc::clone(self);
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| handler(&app, event));
        element.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        // Listeners live as long as the page
        closure.forget();
        Ok(())
    }

    fn bind_controls(self: &Rc<Self>) -> Result<(), JsValue> {
        self.listen("searchBtn", "click", |app, _| {
            app.dispatch(UiEvent::SearchSubmitted(app.search_text()))
        })?;
        self.listen("searchInput", "keypress", |app, event| {
            let enter = event
                .dyn_ref::<KeyboardEvent>()
                .map(|key| key.key() == "Enter")
                .unwrap_or(false);
            if enter {
                app.dispatch(UiEvent::SearchSubmitted(app.search_text()));
            }
        })?;
        self.listen("currentLocationBtn", "click", |app, _| {
            app.dispatch(UiEvent::LocateRequested)
        })?;
        self.listen("clearMarkersBtn", "click", |app, _| {
            app.dispatch(UiEvent::ClearRequested)
        })?;
        self.listen("zoomInBtn", "click", |app, _| {
            app.dispatch(UiEvent::ZoomInRequested)
        })?;
        self.listen("zoomOutBtn", "click", |app, _| {
            app.dispatch(UiEvent::ZoomOutRequested)
        })?;
        self.listen("mapType", "change", |app, event| {
            let Some(select) = event
                .target()
                .and_then(|target| target.dyn_into::<HtmlSelectElement>().ok())
            else {
                return;
            };
            match select.value().parse::<MapStyle>() {
                Ok(style) => app.dispatch(UiEvent::StyleSelected(style)),
                Err(err) => log::error!("{}", err),
            }
        })?;
        Ok(())
    }

    fn bind_map(self: &Rc<Self>) -> Result<(), JsValue> {
        let mut controller = self
            .controller
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("controller is busy"))?;
        let backend = controller.surface_mut().backend_mut();

        let app = Rc::clone(self);
        backend
            .on("click", move |event| {
                let lat_lng = js_sys::Reflect::get(&event, &"latlng".into())
                    .ok()
                    .and_then(|value| leaflet::read_lat_lng(&value));
                if let Some(lat_lng) = lat_lng {
                    app.dispatch(UiEvent::MapClicked(lat_lng));
                }
            })
            .map_err(to_js)?;

        let Some(map) = backend.leaflet().cloned() else {
            return Err(JsValue::from_str("map has not been created"));
        };
        let app = Rc::clone(self);
        backend
            .on("moveend", move |_| {
                // Read from Leaflet directly; the controller may be mid-update
                let Some((center, zoom)) = leaflet_view(&map) else {
                    return;
                };
                app.dispatch(UiEvent::ViewMoved { center, zoom });
            })
            .map_err(to_js)?;
        Ok(())
    }

    /// Expose `window.removeMarkerById(id)` for popup buttons
    fn bind_remove_action(self: &Rc<Self>) -> Result<(), JsValue> {
        let app = Rc::clone(self);
        let remove = Closure::<dyn FnMut(f64)>::new(move |id: f64| {
            if id >= 0.0 && id.fract() == 0.0 {
                app.dispatch(UiEvent::RemoveMarkerRequested(MarkerId::from_raw(id as u64)));
            }
        });
        js_sys::Reflect::set(&self.window, &REMOVE_ACTION.into(), remove.as_ref())?;
        remove.forget();
        Ok(())
    }
}

/// Center and zoom as Leaflet currently shows them
fn leaflet_view(map: &leaflet::LeafletMap) -> Option<(crate::core::geo::LatLng, u8)> {
    let center = leaflet::read_lat_lng(&map.get_center())?;
    Some((center, map.get_zoom().round().clamp(0.0, u8::MAX as f64) as u8))
}

fn to_js(err: crate::MapError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn load_config(window: &Window) -> MapConfig {
    let raw = js_sys::Reflect::get(window, &CONFIG_GLOBAL.into())
        .ok()
        .and_then(|value| value.as_string());
    match raw.map(|json| MapConfig::from_json_str(&json)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            log::warn!("ignoring invalid {}: {}", CONFIG_GLOBAL, err);
            MapConfig::default()
        }
        None => MapConfig::default(),
    }
}

/// Page entry point
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console::init(log::LevelFilter::Info);

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config = load_config(&window);
    let geocoder = NominatimGeocoder::new(config.geocoder.clone())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let controller = MapController::new(LeafletBackend::new(), config).map_err(to_js)?;

    let app = Rc::new(App {
        window,
        document,
        controller: RefCell::new(controller),
        geocoder,
        locator: BrowserGeolocation,
    });

    app.bind_map()?;
    app.bind_controls()?;
    app.bind_remove_action()?;
    if let Ok(controller) = app.controller.try_borrow() {
        app.render_status(controller.status());
    }

    log::info!("map application initialized");
    Ok(())
}
