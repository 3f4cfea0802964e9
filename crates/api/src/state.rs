use std::sync::Arc;

use taskdeck_core::bulk::BulkEngine;
use taskdeck_core::shortcuts::ShortcutRegistry;
use taskdeck_events::EventBus;

use crate::config::ServerConfig;
use crate::store::TaskStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// In-memory task store.
    pub store: Arc<TaskStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing task events.
    pub event_bus: Arc<EventBus>,
    /// Keyboard shortcut bindings, built once at startup.
    pub shortcuts: Arc<ShortcutRegistry>,
    /// Bulk engine configured from `config.bulk`.
    pub bulk: BulkEngine,
}

impl AppState {
    /// Build state with an empty store and a fresh event bus.
    pub fn new(config: ServerConfig, shortcuts: ShortcutRegistry) -> Self {
        let bulk = BulkEngine::new(config.bulk);
        Self {
            store: Arc::new(TaskStore::new()),
            config: Arc::new(config),
            event_bus: Arc::new(EventBus::default()),
            shortcuts: Arc::new(shortcuts),
            bulk,
        }
    }
}
