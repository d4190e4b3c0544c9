//! Scrape backend trait.
//!
//! Defines the interface to the remote scraping backend. The application
//! layer depends on this trait only; the HTTP implementation lives in
//! `scrapekit-client`, and tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::scrape::{ScrapeRequest, ScrapeResult};
use crate::template::Template;
use crate::website::Website;

/// Body of a successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
}

/// An abstract client for the remote scraping backend.
///
/// Every method maps to one endpoint of the backend's HTTP contract.
/// Methods taking a `token` are bearer-authenticated; implementations must
/// attach it verbatim and never invent one. Errors distinguish a rejected
/// response (`Auth`/`Fetch`) from a request that could not be completed at
/// all (`Network`).
#[async_trait]
pub trait ScrapeBackend: Send + Sync {
    /// Exchanges credentials for a bearer token (`POST /login`).
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    /// Lists the websites available as scraping targets (`GET /websites`).
    async fn websites(&self, token: &str) -> Result<Vec<Website>>;

    /// Lists the user's saved templates (`GET /templates`).
    async fn templates(&self, token: &str) -> Result<Vec<Template>>;

    /// Persists a template draft (`POST /templates/create`).
    ///
    /// Returns the created template with its backend-assigned id.
    async fn create_template(&self, token: &str, template: &Template) -> Result<Template>;

    /// Deletes a persisted template (`DELETE /templates/{id}`).
    async fn delete_template(&self, token: &str, template_id: i64) -> Result<()>;

    /// Runs a preview scrape (`POST /scrape`).
    async fn scrape(&self, token: &str, request: &ScrapeRequest) -> Result<ScrapeResult>;
}
