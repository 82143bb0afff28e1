pub mod events;

pub use events::{EventManager, MapEvent};
