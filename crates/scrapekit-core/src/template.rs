//! Template domain models.
//!
//! A template bundles the locators and target links needed to extract a
//! set of product fields from one or more pages. While being authored it
//! is a [`TemplateDraft`]: fully mutable, no identity. Once the backend
//! persists it, it becomes a [`Template`] with a backend-assigned id;
//! persisted templates are never mutated in place, edits re-submit a new
//! draft.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side extraction depth.
///
/// Opaque to the client beyond its wire value; the backend decides what
/// "detailed" and "shallow" mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapingType {
    #[default]
    Detailed,
    Shallow,
}

/// The extraction fields a template knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorField {
    Title,
    Price,
    Description,
}

impl fmt::Display for LocatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Price => write!(f, "price"),
            Self::Description => write!(f, "description"),
        }
    }
}

/// One locator string per extraction field.
///
/// Locators are opaque to the client (XPath or any other selector syntax
/// the backend supports); the only validation applied is non-emptiness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementLocators {
    pub title: String,
    pub price: String,
    pub description: String,
}

impl ElementLocators {
    /// Returns the locator for a field.
    pub fn get(&self, field: LocatorField) -> &str {
        match field {
            LocatorField::Title => &self.title,
            LocatorField::Price => &self.price,
            LocatorField::Description => &self.description,
        }
    }

    /// Replaces the locator for a field.
    pub fn set(&mut self, field: LocatorField, value: impl Into<String>) {
        let value = value.into();
        match field {
            LocatorField::Title => self.title = value,
            LocatorField::Price => self.price = value,
            LocatorField::Description => self.description = value,
        }
    }

    /// Returns the first field whose locator is empty after trimming.
    pub fn first_empty(&self) -> Option<LocatorField> {
        [
            LocatorField::Title,
            LocatorField::Price,
            LocatorField::Description,
        ]
        .into_iter()
        .find(|field| self.get(*field).trim().is_empty())
    }

    /// Returns a copy with every locator trimmed of surrounding whitespace.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            price: self.price.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

/// The `settings` block of a persisted template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Target URLs, in authoring order
    pub links: Vec<String>,
    /// Locator per extraction field
    pub elements: ElementLocators,
    /// Whether the locators are XPath expressions
    pub is_xpath: bool,
}

/// A reusable extraction template as the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Backend-assigned identifier; absent until the template is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub website_id: i64,
    pub user_id: i64,
    pub name: String,
    pub scraping_type: ScrapingType,
    pub settings: TemplateSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
    /// RFC 3339 timestamp stamped by the client at save time
    pub created_at: String,
}

/// An unpersisted template being authored.
///
/// Field values arrive verbatim from UI inputs: `links` is the raw
/// comma-separated string, locators are untrimmed. Normalization happens
/// when a request payload is built from the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    /// Selected website id; must be a positive identifier to save
    pub website_id: Option<i64>,
    /// Raw comma-separated target URLs
    pub links: String,
    pub elements: ElementLocators,
    pub wrapper: Option<String>,
    pub scraping_type: ScrapingType,
}

impl TemplateDraft {
    /// Parses the raw links field into the list a request payload carries.
    pub fn parsed_links(&self) -> Vec<String> {
        parse_links(&self.links)
    }
}

/// Splits a comma-separated links string into individual URLs.
///
/// Each segment is trimmed of surrounding whitespace and empty segments
/// are dropped, so an input of only commas and whitespace parses to an
/// empty list.
pub fn parse_links(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}
