pub mod controller;
pub mod popup;
pub mod status;

#[cfg(all(feature = "egui", not(target_arch = "wasm32")))]
pub mod widget;

pub use controller::{Effect, MapController, Outcome, UiEvent};
pub use popup::Popup;
pub use status::{Notice, StatusView};
