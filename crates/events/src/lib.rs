//! Taskdeck event bus.
//!
//! - [`EventBus`] is an in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] is the envelope published after each task mutation.
//! - [`event_types`] names the events the API publishes.

pub mod bus;

pub use bus::{event_types, EventBus, PlatformEvent, TASK_ENTITY_TYPE};
