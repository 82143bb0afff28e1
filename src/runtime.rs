//! Effect execution.
//!
//! [`perform`] turns one [`Effect`] into the [`UiEvent`] that answers it and
//! works on any executor. Native frontends use [`EffectRunner`], which spawns
//! effects on tokio and hands results back to the UI thread over a
//! crossbeam channel; the browser frontend awaits `perform` inside
//! `spawn_local`.

use crate::{
    geocoding::Geocoder,
    geolocation::LocationProvider,
    ui::controller::{Effect, UiEvent},
};

/// Run `effect` against the given services and build the answering event
pub async fn perform<G, L>(effect: Effect, geocoder: &G, locator: &L) -> UiEvent
where
    G: Geocoder + ?Sized,
    L: LocationProvider + ?Sized,
{
    match effect {
        Effect::ForwardGeocode { query } => UiEvent::ForwardGeocoded(geocoder.forward(&query).await),
        Effect::ReverseGeocode { marker, position } => UiEvent::ReverseGeocoded {
            marker,
            result: geocoder.reverse(position).await,
        },
        Effect::LocateDevice => UiEvent::Located(locator.current_position().await),
    }
}

#[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
pub use tokio_impl::EffectRunner;

#[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
mod tokio_impl {
    use super::*;
    use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    type Waker = Arc<dyn Fn() + Send + Sync>;

    /// Spawns effects on a tokio runtime and queues their answers for the
    /// UI thread.
    pub struct EffectRunner {
        handle: Handle,
        geocoder: Arc<dyn Geocoder + Send + Sync>,
        locator: Arc<dyn LocationProvider + Send + Sync>,
        tx: Sender<UiEvent>,
        rx: Receiver<UiEvent>,
        waker: Option<Waker>,
    }

    impl EffectRunner {
        pub fn new(
            handle: Handle,
            geocoder: Arc<dyn Geocoder + Send + Sync>,
            locator: Arc<dyn LocationProvider + Send + Sync>,
        ) -> Self {
            let (tx, rx) = crossbeam_channel::unbounded();
            Self {
                handle,
                geocoder,
                locator,
                tx,
                rx,
                waker: None,
            }
        }

        /// Call `waker` after each answer is queued (e.g. to request a repaint)
        pub fn with_waker<F>(mut self, waker: F) -> Self
        where
            F: Fn() + Send + Sync + 'static,
        {
            self.waker = Some(Arc::new(waker));
            self
        }

        pub fn dispatch<I>(&self, effects: I)
        where
            I: IntoIterator<Item = Effect>,
        {
            for effect in effects {
                log::debug!("dispatching {:?}", effect);
                let geocoder = Arc::clone(&self.geocoder);
                let locator = Arc::clone(&self.locator);
                let tx = self.tx.clone();
                let waker = self.waker.clone();

                self.handle.spawn(async move {
                    let event = perform(effect, &*geocoder, &*locator).await;
                    if tx.send(event).is_err() {
                        log::debug!("effect answered after the runner was dropped");
                        return;
                    }
                    if let Some(waker) = waker {
                        waker();
                    }
                });
            }
        }

        /// Answers that have arrived so far, without blocking
        pub fn drain(&self) -> Vec<UiEvent> {
            self.rx.try_iter().collect()
        }

        /// Wait up to `timeout` for the next answer
        pub fn recv_timeout(&self, timeout: Duration) -> Option<UiEvent> {
            match self.rx.recv_timeout(timeout) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
            }
        }
    }
}
