//! Host storage collaborator.
//!
//! The client persists one small snapshot of its state (login session plus
//! the cached remote collections) to whatever storage the host offers. The
//! [`StateStore`] trait abstracts that host; [`JsonFileStore`] is the
//! native implementation, writing a single pretty-printed JSON document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::session::Session;
use crate::template::Template;
use crate::website::Website;

/// The persisted state snapshot.
///
/// A plain key/value snapshot with no schema versioning. Field names are
/// camelCase on disk to match the historical storage layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websites: Option<Vec<Website>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<Template>>,
}

impl StoredState {
    /// Builds a snapshot from the live session and caches.
    pub fn capture(
        session: &Session,
        websites: Option<Vec<Website>>,
        templates: Option<Vec<Template>>,
    ) -> Self {
        Self {
            is_logged_in: session.is_logged_in,
            token: session.token.clone(),
            user_id: session.user_id,
            websites,
            templates,
        }
    }

    /// Extracts the session part of the snapshot.
    pub fn session(&self) -> Session {
        Session {
            is_logged_in: self.is_logged_in,
            token: self.token.clone(),
            user_id: self.user_id,
        }
    }
}

/// An abstract store for the persisted state snapshot.
///
/// Decouples the client core from the specific host storage mechanism
/// (a file on native hosts, extension-local storage in a browser host).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the snapshot, or `None` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<StoredState>>;

    /// Replaces the persisted snapshot.
    async fn save(&self, state: &StoredState) -> Result<()>;

    /// Removes the persisted snapshot entirely.
    async fn clear(&self) -> Result<()>;
}

/// File-backed [`StateStore`] writing one JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store persisting to the given file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a store at the default location (~/.config/scrapekit/state.json).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            crate::error::ScrapeKitError::storage("could not determine home directory")
        })?;
        Ok(Self::new(
            home.join(".config").join("scrapekit").join("state.json"),
        ))
    }

    /// Returns the path the snapshot is persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Option<StoredState>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let state: StoredState = serde_json::from_str(&json)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &StoredState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
