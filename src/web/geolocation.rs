//! `navigator.geolocation` as a [`LocationProvider`].

use crate::{
    core::geo::LatLng,
    geolocation::{GeolocationError, LocationProvider},
};
use async_trait::async_trait;
use futures::channel::oneshot;
use js_sys::Reflect;
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{prelude::*, JsCast};

type Reply = Rc<RefCell<Option<oneshot::Sender<Result<LatLng, GeolocationError>>>>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserGeolocation;

fn read_position(position: &JsValue) -> Option<LatLng> {
    let coords = Reflect::get(position, &"coords".into()).ok()?;
    let lat = Reflect::get(&coords, &"latitude".into()).ok()?.as_f64()?;
    let lng = Reflect::get(&coords, &"longitude".into()).ok()?.as_f64()?;
    Some(LatLng::new(lat, lng))
}

fn read_message(error: &JsValue) -> String {
    Reflect::get(error, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_default()
}

/// `navigator.geolocation`, or `None` when the browser has no such API.
/// The web-sys getter hands back `undefined` instead of failing.
fn navigator_geolocation() -> Option<web_sys::Geolocation> {
    let geolocation = web_sys::window()?.navigator().geolocation().ok()?;
    if geolocation.is_undefined() || geolocation.is_null() {
        return None;
    }
    Some(geolocation)
}

fn answer(reply: &Reply, result: Result<LatLng, GeolocationError>) {
    if let Some(tx) = reply.borrow_mut().take() {
        let _ = tx.send(result);
    }
}

#[async_trait(?Send)]
impl LocationProvider for BrowserGeolocation {
    async fn current_position(&self) -> Result<LatLng, GeolocationError> {
        let geolocation = navigator_geolocation().ok_or(GeolocationError::Unsupported)?;

        let (tx, rx) = oneshot::channel();
        let reply: Reply = Rc::new(RefCell::new(Some(tx)));

        let on_success = {
            let reply = Rc::clone(&reply);
            Closure::once_into_js(move |position: JsValue| {
                let result = read_position(&position)
                    .ok_or_else(|| GeolocationError::service_failed("malformed position"));
                answer(&reply, result);
            })
        };
        let on_error = {
            let reply = Rc::clone(&reply);
            Closure::once_into_js(move |error: JsValue| {
                answer(&reply, Err(GeolocationError::service_failed(read_message(&error))));
            })
        };

        geolocation
            .get_current_position_with_error_callback(
                on_success.unchecked_ref(),
                Some(on_error.unchecked_ref()),
            )
            .map_err(|err| GeolocationError::service_failed(read_message(&err)))?;

        let position = rx
            .await
            .map_err(|_| GeolocationError::service_failed(""))??;
        log::info!("current location found: {}", position);
        Ok(position)
    }
}
