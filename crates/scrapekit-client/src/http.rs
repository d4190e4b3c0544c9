//! HttpBackend - reqwest implementation of the scraping backend contract.
//!
//! Every method maps to one endpoint of the backend's HTTP/JSON contract.
//! Authenticated endpoints carry the bearer token verbatim; error bodies
//! are expected to carry a `{message}` field which is surfaced to the user.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use scrapekit_core::backend::{LoginResponse, ScrapeBackend};
use scrapekit_core::error::{Result, ScrapeKitError};
use scrapekit_core::scrape::{ScrapeRequest, ScrapeResult};
use scrapekit_core::template::Template;
use scrapekit_core::website::Website;

use crate::config::BackendConfig;

/// HTTP client for the remote scraping backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpBackend {
    /// Creates a backend client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                ScrapeKitError::network(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a backend client against an explicit base URL with the
    /// default configuration.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = BackendConfig {
            base_url: base_url.into(),
            ..BackendConfig::default()
        };
        Self::new(&config)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decodes a 2xx response body, mapping decode failures to a network
    /// error so callers see one failure kind for an unusable response.
    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        response.json().await.map_err(|err| {
            ScrapeKitError::network(format!("failed to decode backend response: {err}"))
        })
    }
}

#[async_trait]
impl ScrapeBackend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        tracing::debug!("POST /login");
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| "Login failed. Please try again.".to_string());
            return Err(ScrapeKitError::auth(message));
        }

        Self::decode(response).await
    }

    async fn websites(&self, token: &str) -> Result<Vec<Website>> {
        tracing::debug!("GET /websites");
        let response = self
            .client
            .get(self.url("/websites"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        Self::decode(response).await
    }

    async fn templates(&self, token: &str) -> Result<Vec<Template>> {
        tracing::debug!("GET /templates");
        let response = self
            .client
            .get(self.url("/templates"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        Self::decode(response).await
    }

    async fn create_template(&self, token: &str, template: &Template) -> Result<Template> {
        tracing::debug!("POST /templates/create");
        let response = self
            .client
            .post(self.url("/templates/create"))
            .header("Authorization", format!("Bearer {}", token))
            .json(template)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        Self::decode(response).await
    }

    async fn delete_template(&self, token: &str, template_id: i64) -> Result<()> {
        tracing::debug!("DELETE /templates/{template_id}");
        let response = self
            .client
            .delete(self.url(&format!("/templates/{template_id}")))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        Ok(())
    }

    async fn scrape(&self, token: &str, request: &ScrapeRequest) -> Result<ScrapeResult> {
        tracing::debug!(links = request.links.len(), "POST /scrape");
        let response = self
            .client
            .post(self.url("/scrape"))
            .header("Authorization", format!("Bearer {}", token))
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        Self::decode(response).await
    }
}

/// Maps a reqwest transport failure to a network error.
fn map_transport_error(err: reqwest::Error) -> ScrapeKitError {
    let detail = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "could not connect to the backend"
    } else {
        "request failed"
    };
    ScrapeKitError::network(format!("{detail}: {err}"))
}

/// Turns a non-2xx response into a fetch error carrying the server message.
async fn reject(response: Response) -> ScrapeKitError {
    let status = response.status();
    let message = error_message(response)
        .await
        .unwrap_or_else(|| default_status_message(status));
    ScrapeKitError::fetch(status.as_u16(), message)
}

/// Extracts the server-supplied message from an error body, if any.
async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.unwrap_or_default();
    parse_error_message(&body)
}

fn parse_error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return Some(parsed.message);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("request rejected")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_prefers_message_field() {
        assert_eq!(
            parse_error_message(r#"{"message": "Invalid credentials"}"#),
            Some("Invalid credentials".to_string())
        );
    }

    #[test]
    fn test_parse_error_message_falls_back_to_raw_body() {
        assert_eq!(
            parse_error_message("database unavailable"),
            Some("database unavailable".to_string())
        );
        assert_eq!(parse_error_message("   "), None);
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let backend = HttpBackend::with_base_url("http://localhost:8080/").unwrap();
        assert_eq!(backend.url("/scrape"), "http://localhost:8080/scrape");
    }
}
