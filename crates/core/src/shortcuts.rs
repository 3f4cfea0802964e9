//! Keyboard shortcut registry with conflict detection.
//!
//! The registry is an explicit object owned by the application root and
//! handed to the features that register bindings. A combo may be bound once
//! per scope; bindings in [`GLOBAL_SCOPE`] apply everywhere unless a scoped
//! binding shadows them.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Scope whose bindings are active in every view.
pub const GLOBAL_SCOPE: &str = "global";

// ---------------------------------------------------------------------------
// Key combos
// ---------------------------------------------------------------------------

/// A normalized key combination such as `ctrl+shift+k`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct KeyCombo {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub key: String,
}

impl KeyCombo {
    /// Parse a `+`-separated combo. Modifier aliases (`control`, `option`,
    /// `cmd`, `command`, `super`) are accepted; order does not matter.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let mut combo = KeyCombo {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            key: String::new(),
        };

        for part in input.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Invalid key combo '{input}': empty segment"
                )));
            }
            let lower = part.to_lowercase();
            match lower.as_str() {
                "ctrl" | "control" => combo.ctrl = true,
                "alt" | "option" => combo.alt = true,
                "shift" => combo.shift = true,
                "meta" | "cmd" | "command" | "super" => combo.meta = true,
                _ if !combo.key.is_empty() => {
                    return Err(CoreError::Validation(format!(
                        "Invalid key combo '{input}': more than one non-modifier key"
                    )));
                }
                _ => combo.key = normalize_key(&lower),
            }
        }

        if combo.key.is_empty() {
            return Err(CoreError::Validation(format!(
                "Invalid key combo '{input}': missing key"
            )));
        }
        Ok(combo)
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

fn normalize_key(key: &str) -> String {
    match key {
        "esc" => "escape".to_string(),
        "return" => "enter".to_string(),
        "del" => "delete".to_string(),
        "spacebar" => "space".to_string(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (on, name) in [
            (self.ctrl, "ctrl"),
            (self.alt, "alt"),
            (self.shift, "shift"),
            (self.meta, "meta"),
        ] {
            if on {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

impl FromStr for KeyCombo {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.to_string()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A registered binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortcut {
    pub id: String,
    pub combo: KeyCombo,
    pub scope: String,
    pub description: String,
}

/// Shortcut bindings keyed by id, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    shortcuts: IndexMap<String, Shortcut>,
}

impl ShortcutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// Fails with [`CoreError::Conflict`] when the id is taken or the combo
    /// is already bound in the same scope.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        combo: &str,
        scope: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&Shortcut, CoreError> {
        let id = id.into();
        let scope = scope.into();
        let combo = KeyCombo::parse(combo)?;

        if self.shortcuts.contains_key(&id) {
            return Err(CoreError::Conflict(format!(
                "Shortcut '{id}' is already registered"
            )));
        }
        if let Some(existing) = self
            .shortcuts
            .values()
            .find(|s| s.scope == scope && s.combo == combo)
        {
            return Err(CoreError::Conflict(format!(
                "'{combo}' is already bound to '{}' in scope '{scope}'",
                existing.id
            )));
        }

        let entry = self.shortcuts.entry(id.clone()).or_insert(Shortcut {
            id,
            combo,
            scope,
            description: description.into(),
        });
        Ok(&*entry)
    }

    /// Remove a binding by id.
    pub fn unregister(&mut self, id: &str) -> Option<Shortcut> {
        self.shortcuts.shift_remove(id)
    }

    /// Find the binding `combo` triggers in `scope`, preferring a scoped
    /// binding over a global one.
    pub fn resolve(&self, combo: &KeyCombo, scope: &str) -> Option<&Shortcut> {
        let mut global = None;
        for shortcut in self.shortcuts.values().filter(|s| &s.combo == combo) {
            if shortcut.scope == scope {
                return Some(shortcut);
            }
            if global.is_none() && shortcut.scope == GLOBAL_SCOPE {
                global = Some(shortcut);
            }
        }
        global
    }

    /// Every binding of `combo`, across all scopes.
    pub fn conflicts(&self, combo: &KeyCombo) -> Vec<&Shortcut> {
        self.shortcuts
            .values()
            .filter(|s| &s.combo == combo)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shortcut> {
        self.shortcuts.values()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
