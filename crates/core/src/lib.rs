//! Taskdeck domain core.
//!
//! Pure, synchronous domain logic with zero internal deps so it can be
//! used by the API layer, background services, and tests alike.

pub mod analytics;
pub mod bulk;
pub mod error;
pub mod history;
pub mod shortcuts;
pub mod task;
pub mod types;
