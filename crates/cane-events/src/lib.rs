//! Smart Cane Event Model
//!
//! Shared foundation for every other crate in the workspace:
//! - Immutable hazard [`Event`] records with validated severity
//! - Structured (JSON) round-trip for logging and fixtures
//! - In-process [`EventBus`] connecting classifiers to consumers

mod bus;
mod error;
mod event;

pub use bus::{EventBus, Subscriber};
pub use error::{BusError, EventError};
pub use event::{Direction, Event, EventBuilder, EventSource, Severity};

/// Topic names used by the safety loop
pub mod topics {
    /// Events produced by the vision classifier
    pub const CAMERA_EVENTS: &str = "camera.events";
    /// Events produced by the distance classifier
    pub const CANE_EVENTS: &str = "cane.events";
    /// Every event at `mid` severity or above, regardless of source
    pub const DANGER_EVENTS: &str = "danger.events";
}
