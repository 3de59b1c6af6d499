//! Event bus and event types
//!
//! Components emit [`DocEvent`]s; consumers (CLI progress display, loggers,
//! external observers) subscribe through the [`EventBus`].

mod bus;
mod types;

pub use bus::{EventBus, create_event_bus};
pub use types::{DocEvent, QueueStatus};
