//! Leaflet bindings and the browser [`MapBackend`].

use crate::{
    core::geo::LatLng,
    prelude::HashMap,
    rendering::backend::{LayerHandle, MapBackend, MarkerHandle},
    tiles::registry::TileLayerConfig,
    ui::popup::Popup,
    MapError, Result,
};
use js_sys::{Array, Object, Reflect};
use std::time::Duration;
use wasm_bindgen::{prelude::*, JsCast};

#[wasm_bindgen]
extern "C" {
    #[derive(Debug, Clone)]
    pub type LeafletMap;

    #[wasm_bindgen(js_namespace = L, js_name = map)]
    fn new_map(container: &str, options: &JsValue) -> LeafletMap;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LeafletMap, center: &JsValue, zoom: u8) -> LeafletMap;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &LeafletMap) -> f64;

    #[wasm_bindgen(method, js_name = getCenter)]
    pub fn get_center(this: &LeafletMap) -> JsValue;

    #[wasm_bindgen(method, js_name = removeLayer)]
    fn remove_layer(this: &LeafletMap, layer: &JsValue) -> LeafletMap;

    #[wasm_bindgen(method, js_name = invalidateSize)]
    fn invalidate_size(this: &LeafletMap) -> LeafletMap;

    #[wasm_bindgen(method, js_name = on)]
    fn on(this: &LeafletMap, kind: &str, handler: &js_sys::Function) -> LeafletMap;

    #[derive(Debug, Clone)]
    type LeafletTileLayer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    fn new_tile_layer(url_template: &str, options: &JsValue) -> LeafletTileLayer;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_layer_to(this: &LeafletTileLayer, map: &LeafletMap) -> LeafletTileLayer;

    #[derive(Debug, Clone)]
    type LeafletMarker;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    fn new_marker(lat_lng: &JsValue, options: &JsValue) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_marker_to(this: &LeafletMarker, map: &LeafletMap) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &LeafletMarker, html: &str) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = setPopupContent)]
    fn set_popup_content(this: &LeafletMarker, html: &str) -> LeafletMarker;
}

fn lat_lng_value(lat_lng: LatLng) -> JsValue {
    Array::of2(&lat_lng.lat.into(), &lat_lng.lng.into()).into()
}

/// Read a Leaflet `LatLng` object (`{lat, lng}`)
pub fn read_lat_lng(value: &JsValue) -> Option<LatLng> {
    let lat = Reflect::get(value, &"lat".into()).ok()?.as_f64()?;
    let lng = Reflect::get(value, &"lng".into()).ok()?.as_f64()?;
    Some(LatLng::new(lat, lng))
}

fn options(entries: &[(&str, JsValue)]) -> Result<JsValue> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &(*key).into(), value).map_err(js_error)?;
    }
    Ok(object.into())
}

pub(crate) fn js_error(value: JsValue) -> MapError {
    MapError::Backend(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

/// Draws the map with Leaflet (`window.L`)
#[derive(Default)]
pub struct LeafletBackend {
    map: Option<LeafletMap>,
    tile_layers: HashMap<LayerHandle, LeafletTileLayer>,
    markers: HashMap<MarkerHandle, LeafletMarker>,
    next_handle: u64,
    listeners: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl LeafletBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> Result<&LeafletMap> {
        self.map
            .as_ref()
            .ok_or_else(|| MapError::Backend("map has not been created".to_string()))
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// The underlying Leaflet map
    pub fn leaflet(&self) -> Option<&LeafletMap> {
        self.map.as_ref()
    }

    /// Subscribe to a Leaflet map event (`"click"`, `"zoomend"`, `"moveend"`)
    pub fn on<F>(&mut self, kind: &str, handler: F) -> Result<()>
    where
        F: FnMut(JsValue) + 'static,
    {
        let closure = Closure::<dyn FnMut(JsValue)>::new(handler);
        self.map()?.on(kind, closure.as_ref().unchecked_ref());
        self.listeners.push(closure);
        Ok(())
    }
}

impl MapBackend for LeafletBackend {
    fn create_map(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<()> {
        if self.map.is_some() {
            return Err(MapError::Backend(
                "map container is already initialized".to_string(),
            ));
        }
        let map = new_map(container, &options(&[])?);
        map.set_view(&lat_lng_value(center), zoom);
        self.map = Some(map);
        Ok(())
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()> {
        self.map()?.set_view(&lat_lng_value(center), zoom);
        Ok(())
    }

    fn add_tile_layer(&mut self, config: &'static TileLayerConfig) -> Result<LayerHandle> {
        let subdomains: Array = config.subdomains.iter().map(|s| JsValue::from_str(s)).collect();
        let layer = new_tile_layer(
            config.url_template,
            &options(&[
                ("attribution", config.attribution.into()),
                ("maxZoom", config.max_zoom.into()),
                ("subdomains", subdomains.into()),
            ])?,
        );
        layer.add_layer_to(self.map()?);

        let handle = LayerHandle(self.next_handle());
        self.tile_layers.insert(handle, layer);
        Ok(handle)
    }

    fn remove_tile_layer(&mut self, handle: LayerHandle) -> Result<()> {
        let layer = self
            .tile_layers
            .remove(&handle)
            .ok_or_else(|| MapError::Layer(format!("unknown tile layer {:?}", handle)))?;
        self.map()?.remove_layer(&layer);
        Ok(())
    }

    fn add_marker(&mut self, position: LatLng, title: &str, popup: &Popup) -> Result<MarkerHandle> {
        let marker = new_marker(&lat_lng_value(position), &options(&[("title", title.into())])?);
        marker.add_marker_to(self.map()?);
        marker.bind_popup(&popup.to_html());

        let handle = MarkerHandle(self.next_handle());
        self.markers.insert(handle, marker);
        Ok(handle)
    }

    fn set_popup(&mut self, handle: MarkerHandle, popup: &Popup) -> Result<()> {
        let marker = self
            .markers
            .get(&handle)
            .ok_or_else(|| MapError::Layer(format!("unknown marker {:?}", handle)))?;
        marker.set_popup_content(&popup.to_html());
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()> {
        let marker = self
            .markers
            .remove(&handle)
            .ok_or_else(|| MapError::Layer(format!("unknown marker {:?}", handle)))?;
        self.map()?.remove_layer(&marker);
        Ok(())
    }

    fn schedule_invalidate_size(&mut self, delay: Duration) {
        let (Some(window), Some(map)) = (web_sys::window(), self.map.clone()) else {
            return;
        };
        let callback = Closure::once_into_js(move || {
            map.invalidate_size();
        });
        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay.as_millis() as i32,
        ) {
            log::warn!("could not schedule size invalidation: {:?}", err);
        }
    }
}
