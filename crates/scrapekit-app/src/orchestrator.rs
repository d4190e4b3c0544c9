//! Template orchestrator.
//!
//! Owns the in-progress template: the draft being authored, the phase of
//! the authoring state machine, and the preview returned by the last
//! scrape. It drives the request/response cycle for both "scrape now"
//! (preview) and "save template" (persist), reading the session token from
//! the session manager and never writing the shared caches itself.
//!
//! Phases move as
//! `Idle -> Editing -> Submitting -> {PreviewReady | Idle | Error}`;
//! any edit returns to `Editing`, discarding a shown preview or a pending
//! error, and supersedes an in-flight request (the late response is
//! discarded by a sequence-number check).

use std::sync::Arc;

use tokio::sync::RwLock;

use scrapekit_core::backend::ScrapeBackend;
use scrapekit_core::error::{Result, ScrapeKitError};
use scrapekit_core::scrape::{ScrapeRequest, ScrapeResult};
use scrapekit_core::template::{
    LocatorField, ScrapingType, Template, TemplateDraft, TemplateSettings,
};

use crate::session_manager::SessionManager;

/// Phase of the template authoring state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No draft in progress
    #[default]
    Idle,
    /// Draft fields are being edited
    Editing,
    /// A scrape or save request is in flight
    Submitting,
    /// A scrape preview is available for the current draft
    PreviewReady,
    /// The last operation failed; the draft is retained
    Error,
}

#[derive(Debug, Default)]
struct Inner {
    phase: Phase,
    draft: TemplateDraft,
    preview: Option<ScrapeResult>,
    last_error: Option<ScrapeKitError>,
    /// Bumped by every edit and every submission; a response is applied
    /// only when the sequence it was issued under is still current.
    seq: u64,
}

impl Inner {
    fn begin_edit(&mut self) {
        self.preview = None;
        self.last_error = None;
        self.seq += 1;
        self.phase = Phase::Editing;
    }

    fn fail(&mut self, err: ScrapeKitError) {
        self.last_error = Some(err);
        self.phase = Phase::Error;
    }
}

/// Drives authoring and execution of one template at a time.
pub struct TemplateOrchestrator {
    inner: RwLock<Inner>,
    session: Arc<SessionManager>,
    backend: Arc<dyn ScrapeBackend>,
    /// Whether locators are sent as XPath expressions (client configuration)
    use_xpath: bool,
}

impl TemplateOrchestrator {
    /// Creates an orchestrator in the `Idle` phase.
    pub fn new(
        session: Arc<SessionManager>,
        backend: Arc<dyn ScrapeBackend>,
        use_xpath: bool,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            session,
            backend,
            use_xpath,
        }
    }

    /// Starts a new empty draft. `Idle -> Editing`.
    ///
    /// The scraping type defaults to `Detailed`; everything else is empty.
    pub async fn new_template(&self) {
        let mut inner = self.inner.write().await;
        inner.draft = TemplateDraft::default();
        inner.begin_edit();
    }

    /// Abandons the draft and returns to `Idle`.
    pub async fn cancel(&self) {
        let mut inner = self.inner.write().await;
        *inner = Inner {
            seq: inner.seq + 1,
            ..Inner::default()
        };
    }

    pub async fn set_name(&self, name: impl Into<String>) {
        self.edit(|draft| draft.name = name.into()).await;
    }

    pub async fn set_website(&self, website_id: Option<i64>) {
        self.edit(|draft| draft.website_id = website_id).await;
    }

    /// Replaces the raw comma-separated links string.
    pub async fn set_links(&self, links: impl Into<String>) {
        self.edit(|draft| draft.links = links.into()).await;
    }

    pub async fn set_locator(&self, field: LocatorField, value: impl Into<String>) {
        self.edit(|draft| draft.elements.set(field, value.into()))
            .await;
    }

    pub async fn set_wrapper(&self, wrapper: Option<String>) {
        self.edit(|draft| draft.wrapper = wrapper).await;
    }

    pub async fn set_scraping_type(&self, scraping_type: ScrapingType) {
        self.edit(|draft| draft.scraping_type = scraping_type).await;
    }

    /// Current phase of the state machine.
    pub async fn phase(&self) -> Phase {
        self.inner.read().await.phase
    }

    /// Snapshot of the draft being authored.
    pub async fn draft(&self) -> TemplateDraft {
        self.inner.read().await.draft.clone()
    }

    /// The preview from the last successful scrape, while one is shown.
    pub async fn preview(&self) -> Option<ScrapeResult> {
        self.inner.read().await.preview.clone()
    }

    /// The error that moved the machine into the `Error` phase, if any.
    pub async fn last_error(&self) -> Option<ScrapeKitError> {
        self.inner.read().await.last_error.clone()
    }

    /// Runs a preview scrape for the current draft.
    ///
    /// Validation happens before any network call: a missing token, an
    /// empty parsed link list, or an empty locator rejects immediately and
    /// moves the machine to `Error`. On a valid draft the request is
    /// issued; success stores the parsed response as the preview
    /// (`PreviewReady`), failure moves to `Error` with a message
    /// distinguishing a backend rejection from a transport failure. A
    /// response superseded by a newer edit or submission is discarded.
    pub async fn send_scrape_request(&self) -> Result<()> {
        let token = self.session.token().await;

        let (request, token, seq) = {
            let mut inner = self.inner.write().await;
            if inner.phase == Phase::Idle {
                return Err(ScrapeKitError::validation("no template draft in progress"));
            }

            let (request, token) = match self.build_scrape_request(&inner.draft, token) {
                Ok(built) => built,
                Err(err) => {
                    inner.fail(err.clone());
                    return Err(err);
                }
            };

            inner.seq += 1;
            inner.phase = Phase::Submitting;
            (request, token, inner.seq)
        };

        let outcome = self.backend.scrape(&token, &request).await;

        let mut inner = self.inner.write().await;
        if inner.seq != seq || inner.phase != Phase::Submitting {
            tracing::debug!("discarding superseded scrape response");
            return Ok(());
        }

        match outcome {
            Ok(result) => {
                inner.preview = Some(result);
                inner.phase = Phase::PreviewReady;
                Ok(())
            }
            Err(err) => {
                inner.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Persists the current draft as a template.
    ///
    /// Applies the same validation as a scrape plus the website-selection
    /// check (the id must be a positive identifier) and requires a user id
    /// in the session. Success clears the draft, returns to `Idle`, and
    /// yields the created template; the caller is responsible for
    /// re-fetching the template list with `force_refresh = true`. Failure
    /// retains the draft unchanged so the user can retry. `Ok(None)` means
    /// the response arrived after a newer edit superseded the request and
    /// was discarded.
    pub async fn save_template(&self) -> Result<Option<Template>> {
        let session = self.session.session().await;

        let (template, token, seq) = {
            let mut inner = self.inner.write().await;
            if inner.phase == Phase::Idle {
                return Err(ScrapeKitError::validation("no template draft in progress"));
            }

            let (template, token) = match self.build_template(&inner.draft, &session) {
                Ok(built) => built,
                Err(err) => {
                    inner.fail(err.clone());
                    return Err(err);
                }
            };

            inner.seq += 1;
            inner.phase = Phase::Submitting;
            (template, token, inner.seq)
        };

        let outcome = self.backend.create_template(&token, &template).await;

        let mut inner = self.inner.write().await;
        if inner.seq != seq || inner.phase != Phase::Submitting {
            tracing::debug!("discarding superseded save response");
            return Ok(None);
        }

        match outcome {
            Ok(created) => {
                tracing::debug!(id = ?created.id, "template saved");
                inner.draft = TemplateDraft::default();
                inner.preview = None;
                inner.last_error = None;
                inner.phase = Phase::Idle;
                Ok(Some(created))
            }
            Err(err) => {
                // Draft deliberately untouched: the user keeps their input
                inner.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Applies one edit to the draft; any edit returns to `Editing`.
    async fn edit(&self, apply: impl FnOnce(&mut TemplateDraft)) {
        let mut inner = self.inner.write().await;
        apply(&mut inner.draft);
        inner.begin_edit();
    }

    /// Validates the draft for a scrape and builds the request payload.
    fn build_scrape_request(
        &self,
        draft: &TemplateDraft,
        token: Option<String>,
    ) -> Result<(ScrapeRequest, String)> {
        let token =
            token.ok_or_else(|| ScrapeKitError::validation("not logged in: no session token"))?;

        let links = draft.parsed_links();
        if links.is_empty() {
            return Err(ScrapeKitError::validation(
                "at least one target link is required",
            ));
        }

        if let Some(field) = draft.elements.first_empty() {
            return Err(ScrapeKitError::validation(format!(
                "the {field} locator is empty"
            )));
        }

        let request = ScrapeRequest {
            links,
            elements: draft.elements.trimmed(),
            is_xpath: self.use_xpath,
            scraping_type: draft.scraping_type,
            wrapper: draft.wrapper.clone(),
        };
        Ok((request, token))
    }

    /// Validates the draft for persistence and builds the create payload.
    fn build_template(
        &self,
        draft: &TemplateDraft,
        session: &scrapekit_core::session::Session,
    ) -> Result<(Template, String)> {
        // Scrape validation first, so both submission paths reject alike
        let (request, token) = self.build_scrape_request(draft, session.token.clone())?;

        let website_id = match draft.website_id {
            Some(id) if id > 0 => id,
            _ => {
                return Err(ScrapeKitError::validation(
                    "a website must be selected before saving",
                ));
            }
        };

        let user_id = session
            .user_id
            .ok_or_else(|| ScrapeKitError::validation("no user id in session"))?;

        let template = Template {
            id: None,
            website_id,
            user_id,
            name: draft.name.clone(),
            scraping_type: draft.scraping_type,
            settings: TemplateSettings {
                links: request.links,
                elements: request.elements,
                is_xpath: self.use_xpath,
            },
            wrapper: draft.wrapper.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        Ok((template, token))
    }
}
