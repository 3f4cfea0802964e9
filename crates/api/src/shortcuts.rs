//! Default keyboard bindings for the task views.

use taskdeck_core::error::CoreError;
use taskdeck_core::shortcuts::{ShortcutRegistry, GLOBAL_SCOPE};

/// Scope for bindings active while a task list has focus.
pub const TASK_LIST_SCOPE: &str = "task_list";

/// `(id, combo, scope, description)` for every built-in binding.
const DEFAULT_BINDINGS: &[(&str, &str, &str, &str)] = &[
    ("palette.open", "ctrl+k", GLOBAL_SCOPE, "Open command palette"),
    ("task.new", "n", GLOBAL_SCOPE, "Create a task"),
    ("search.focus", "/", GLOBAL_SCOPE, "Focus search"),
    ("selection.clear", "escape", GLOBAL_SCOPE, "Clear selection"),
    ("selection.all", "ctrl+a", TASK_LIST_SCOPE, "Select all tasks"),
    ("bulk.archive", "shift+a", TASK_LIST_SCOPE, "Archive selected tasks"),
    ("bulk.delete", "shift+delete", TASK_LIST_SCOPE, "Delete selected tasks"),
    ("bulk.status", "shift+s", TASK_LIST_SCOPE, "Change status of selected tasks"),
    ("bulk.priority", "shift+p", TASK_LIST_SCOPE, "Change priority of selected tasks"),
];

/// Build the registry of built-in bindings.
///
/// Fails if two defaults collide, which surfaces at startup.
pub fn default_registry() -> Result<ShortcutRegistry, CoreError> {
    let mut registry = ShortcutRegistry::new();
    for (id, combo, scope, description) in DEFAULT_BINDINGS {
        registry.register(*id, combo, *scope, *description)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use taskdeck_core::shortcuts::KeyCombo;

    use super::*;

    #[test]
    fn defaults_register_without_conflicts() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), DEFAULT_BINDINGS.len());
    }

    #[test]
    fn escape_resolves_globally_from_task_list() {
        let registry = default_registry().unwrap();
        let combo = KeyCombo::parse("Esc").unwrap();
        let shortcut = registry.resolve(&combo, TASK_LIST_SCOPE).unwrap();
        assert_eq!(shortcut.id, "selection.clear");
    }
}
