//! Invalidation events for the timeline
//!
//! - `TimelineEvent`: emitted after a plan write is confirmed
//! - `EventBus`: broadcast channel distributing events to listeners

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{EventEmitter, TimelineEvent};
