pub mod analytics;
pub mod shortcuts;
pub mod tasks;
