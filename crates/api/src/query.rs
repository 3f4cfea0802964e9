//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for list endpoints that hide archived rows by default.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeArchivedParams {
    #[serde(default)]
    pub include_archived: bool,
}
