//! Scrape request and response wire shapes.

use serde::{Deserialize, Serialize};

use crate::template::{ElementLocators, ScrapingType};

/// Body of a preview scrape request (`POST /scrape`).
///
/// Built from a validated draft; `links` is already parsed and locators
/// already trimmed by the time this struct exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRequest {
    pub links: Vec<String>,
    pub elements: ElementLocators,
    pub is_xpath: bool,
    #[serde(rename = "type")]
    pub scraping_type: ScrapingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
}

/// The backend's answer to a scrape request.
///
/// Treated as a display-only artifact: the client renders it verbatim and
/// only inspects the top-level `status` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapeResult(pub serde_json::Value);

impl ScrapeResult {
    /// Returns the top-level `status` field, when present.
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(serde_json::Value::as_str)
    }

    /// Whether the backend reported the scrape as successful.
    pub fn is_success(&self) -> bool {
        self.status() == Some("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scrape_request_wire_shape() {
        let request = ScrapeRequest {
            links: vec!["http://x.com".to_string(), "http://y.com".to_string()],
            elements: ElementLocators {
                title: "//h1".to_string(),
                price: "//span".to_string(),
                description: "//p".to_string(),
            },
            is_xpath: true,
            scraping_type: ScrapingType::Shallow,
            wrapper: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "links": ["http://x.com", "http://y.com"],
                "elements": {
                    "title": "//h1",
                    "price": "//span",
                    "description": "//p",
                },
                "is_xpath": true,
                "type": "shallow",
            })
        );
    }

    #[test]
    fn test_scrape_request_carries_wrapper_when_set() {
        let request = ScrapeRequest {
            links: vec!["http://x.com".to_string()],
            elements: ElementLocators::default(),
            is_xpath: false,
            scraping_type: ScrapingType::Detailed,
            wrapper: Some("div.product".to_string()),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["wrapper"], "div.product");
        assert_eq!(value["type"], "detailed");
    }

    #[test]
    fn test_scrape_result_status() {
        let ok = ScrapeResult(json!({"status": "success", "data": [{"url": "http://x.com"}]}));
        assert!(ok.is_success());

        let failed = ScrapeResult(json!({"status": "error"}));
        assert!(!failed.is_success());

        let opaque = ScrapeResult(json!([1, 2, 3]));
        assert_eq!(opaque.status(), None);
        assert!(!opaque.is_success());
    }
}
