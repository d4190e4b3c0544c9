//! Website domain model.

use serde::{Deserialize, Serialize};

/// A website registered on the backend as a scraping target.
///
/// Immutable snapshot fetched from the backend; the client caches the list
/// as-is, in backend order, and never edits individual entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    /// Backend-assigned identifier
    pub id: i64,
    /// Display name
    pub name: String,
}
