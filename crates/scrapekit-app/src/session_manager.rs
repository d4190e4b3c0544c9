//! Session manager.
//!
//! Owns the authentication state and the local cache of the backend's two
//! remote collections (websites and templates), reconciling "cache
//! present" vs "must fetch" on every entry point. All writes to the
//! session and the caches go through this type; the orchestrator and the
//! UI only read.

use std::sync::Arc;

use tokio::sync::RwLock;

use scrapekit_core::backend::ScrapeBackend;
use scrapekit_core::error::{Result, ScrapeKitError};
use scrapekit_core::session::Session;
use scrapekit_core::store::{StateStore, StoredState};
use scrapekit_core::template::Template;
use scrapekit_core::website::Website;

/// Manages the login session and the cached remote collections.
///
/// `SessionManager` is responsible for:
/// - Restoring persisted state on startup
/// - Logging in and out against the backend
/// - Serving the websites and templates lists, fetching lazily
/// - Deleting templates and keeping the cache consistent
///
/// Side effects are confined to the [`StateStore`] and [`ScrapeBackend`]
/// collaborators; the manager never touches the UI.
pub struct SessionManager {
    session: RwLock<Session>,
    websites: RwLock<Option<Vec<Website>>>,
    templates: RwLock<Option<Vec<Template>>>,
    store: Arc<dyn StateStore>,
    backend: Arc<dyn ScrapeBackend>,
}

impl SessionManager {
    /// Creates a manager with the given collaborators, logged out.
    pub fn new(store: Arc<dyn StateStore>, backend: Arc<dyn ScrapeBackend>) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            websites: RwLock::new(None),
            templates: RwLock::new(None),
            store,
            backend,
        }
    }

    /// Restores persisted state on startup.
    ///
    /// If the snapshot carries a token the session is marked logged in and
    /// any cached collections are rehydrated; no network call is made to
    /// validate the token, validity is discovered lazily by the first
    /// backend call that needs it. When the snapshot has no websites cache
    /// a fetch is attempted, and a failure there only logs a warning: the
    /// restore itself still succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read.
    pub async fn restore(&self) -> Result<()> {
        let Some(state) = self.store.load().await? else {
            tracing::debug!("no persisted state to restore");
            return Ok(());
        };

        if !state.is_logged_in || state.token.is_none() {
            return Ok(());
        }

        *self.session.write().await = state.session();
        *self.websites.write().await = state.websites.clone();
        *self.templates.write().await = state.templates;
        tracing::debug!("restored persisted session");

        if state.websites.is_none() {
            if let Err(err) = self.websites(false).await {
                tracing::warn!("could not fetch websites after restore: {err}");
            }
        }

        Ok(())
    }

    /// Logs in against the backend.
    ///
    /// On success the session is replaced, persisted, and the websites
    /// cache is refreshed (a refresh failure is logged, not fatal, since
    /// the login already succeeded). On failure nothing changes: the session
    /// keeps whatever state it had.
    ///
    /// # Errors
    ///
    /// `Auth` with the server-supplied message when the backend rejects
    /// the credentials, `Network` when the request could not be completed.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self.backend.login(email, password).await?;

        let session = Session::logged_in(response.token, response.user_id);
        *self.session.write().await = session.clone();
        tracing::debug!(user_id = response.user_id, "logged in");

        self.persist_best_effort().await;

        if let Err(err) = self.websites(true).await {
            tracing::warn!("could not refresh websites after login: {err}");
        }

        Ok(session)
    }

    /// Logs out, clearing the in-memory session, both caches, and the
    /// persisted snapshot (so a restart cannot silently re-login with a
    /// stale token).
    pub async fn logout(&self) -> Result<()> {
        self.session.write().await.reset();
        *self.websites.write().await = None;
        *self.templates.write().await = None;
        self.store.clear().await?;
        tracing::debug!("logged out");
        Ok(())
    }

    /// Returns the websites list.
    ///
    /// Serves the cached list when one exists and `force_refresh` is
    /// false; otherwise fetches from the backend, replaces the cache, and
    /// mirrors it into the persisted snapshot. A failed fetch leaves the
    /// cache untouched.
    pub async fn websites(&self, force_refresh: bool) -> Result<Vec<Website>> {
        if !force_refresh {
            if let Some(cached) = self.websites.read().await.clone() {
                return Ok(cached);
            }
        }

        let token = self.require_token().await?;
        let fetched = match self.backend.websites(&token).await {
            Ok(list) => list,
            Err(err) => {
                self.note_rejection(&err).await;
                return Err(err);
            }
        };

        *self.websites.write().await = Some(fetched.clone());
        self.persist_best_effort().await;
        Ok(fetched)
    }

    /// Returns the templates list; symmetric to [`websites`](Self::websites).
    pub async fn templates(&self, force_refresh: bool) -> Result<Vec<Template>> {
        if !force_refresh {
            if let Some(cached) = self.templates.read().await.clone() {
                return Ok(cached);
            }
        }

        let token = self.require_token().await?;
        let fetched = match self.backend.templates(&token).await {
            Ok(list) => list,
            Err(err) => {
                self.note_rejection(&err).await;
                return Err(err);
            }
        };

        *self.templates.write().await = Some(fetched.clone());
        self.persist_best_effort().await;
        Ok(fetched)
    }

    /// Deletes a persisted template.
    ///
    /// On success the first cached entry with a matching id is removed;
    /// deleting an id that is not in the cache is not an error. The cache
    /// is untouched when the backend call fails.
    pub async fn delete_template(&self, template_id: i64) -> Result<()> {
        let token = self.require_token().await?;

        if let Err(err) = self.backend.delete_template(&token, template_id).await {
            self.note_rejection(&err).await;
            return Err(err);
        }

        let mut cache = self.templates.write().await;
        if let Some(list) = cache.as_mut() {
            if let Some(position) = list.iter().position(|t| t.id == Some(template_id)) {
                list.remove(position);
            }
        }
        drop(cache);

        self.persist_best_effort().await;
        tracing::debug!(template_id, "deleted template");
        Ok(())
    }

    /// Returns a snapshot of the current session.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Returns the bearer token, if logged in.
    pub async fn token(&self) -> Option<String> {
        self.session.read().await.token.clone()
    }

    async fn require_token(&self) -> Result<String> {
        let session = self.session.read().await;
        session.require_token().map(str::to_owned)
    }

    /// Drops the session when the backend rejected the token.
    ///
    /// A 401 means the token is no longer valid; keeping it would make
    /// every later call fail the same way, so the session is reset and the
    /// persisted snapshot cleared, forcing a fresh login.
    async fn note_rejection(&self, err: &ScrapeKitError) {
        if !err.is_unauthenticated() {
            return;
        }

        tracing::warn!("backend rejected the session token, logging out");
        self.session.write().await.reset();
        *self.websites.write().await = None;
        *self.templates.write().await = None;
        if let Err(err) = self.store.clear().await {
            tracing::warn!("could not clear persisted state: {err}");
        }
    }

    /// Mirrors the current state into the persisted snapshot.
    ///
    /// Storage failures are logged rather than propagated: the in-memory
    /// state is already correct and the snapshot is only a startup
    /// convenience.
    async fn persist_best_effort(&self) {
        let state = StoredState::capture(
            &*self.session.read().await,
            self.websites.read().await.clone(),
            self.templates.read().await.clone(),
        );

        if let Err(err) = self.store.save(&state).await {
            tracing::warn!("could not persist state snapshot: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use scrapekit_core::backend::LoginResponse;
    use scrapekit_core::scrape::{ScrapeRequest, ScrapeResult};
    use scrapekit_core::template::{ElementLocators, ScrapingType, TemplateSettings};

    // Mock backend recording calls and tokens, with programmable responses
    struct MockBackend {
        login_response: Mutex<Result<LoginResponse>>,
        websites_response: Mutex<Result<Vec<Website>>>,
        templates_response: Mutex<Result<Vec<Template>>>,
        delete_response: Mutex<Result<()>>,
        websites_calls: AtomicUsize,
        templates_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        tokens_seen: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                login_response: Mutex::new(Ok(LoginResponse {
                    token: "T1".to_string(),
                    user_id: 7,
                })),
                websites_response: Mutex::new(Ok(Vec::new())),
                templates_response: Mutex::new(Ok(Vec::new())),
                delete_response: Mutex::new(Ok(())),
                websites_calls: AtomicUsize::new(0),
                templates_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }

        fn set_websites(&self, response: Result<Vec<Website>>) {
            *self.websites_response.lock().unwrap() = response;
        }

        fn set_templates(&self, response: Result<Vec<Template>>) {
            *self.templates_response.lock().unwrap() = response;
        }

        fn set_login(&self, response: Result<LoginResponse>) {
            *self.login_response.lock().unwrap() = response;
        }

        fn record_token(&self, token: &str) {
            self.tokens_seen.lock().unwrap().push(token.to_string());
        }
    }

    #[async_trait::async_trait]
    impl ScrapeBackend for MockBackend {
        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse> {
            self.login_response.lock().unwrap().clone()
        }

        async fn websites(&self, token: &str) -> Result<Vec<Website>> {
            self.websites_calls.fetch_add(1, Ordering::SeqCst);
            self.record_token(token);
            self.websites_response.lock().unwrap().clone()
        }

        async fn templates(&self, token: &str) -> Result<Vec<Template>> {
            self.templates_calls.fetch_add(1, Ordering::SeqCst);
            self.record_token(token);
            self.templates_response.lock().unwrap().clone()
        }

        async fn create_template(&self, _token: &str, _template: &Template) -> Result<Template> {
            unreachable!("session manager never creates templates")
        }

        async fn delete_template(&self, token: &str, _template_id: i64) -> Result<()> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.record_token(token);
            self.delete_response.lock().unwrap().clone()
        }

        async fn scrape(&self, _token: &str, _request: &ScrapeRequest) -> Result<ScrapeResult> {
            unreachable!("session manager never scrapes")
        }
    }

    // Mock store over an in-memory snapshot
    #[derive(Default)]
    struct MockStore {
        state: Mutex<Option<StoredState>>,
    }

    #[async_trait::async_trait]
    impl StateStore for MockStore {
        async fn load(&self) -> Result<Option<StoredState>> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save(&self, state: &StoredState) -> Result<()> {
            *self.state.lock().unwrap() = Some(state.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            *self.state.lock().unwrap() = None;
            Ok(())
        }
    }

    fn sample_website(id: i64) -> Website {
        Website {
            id,
            name: format!("Website {id}"),
        }
    }

    fn sample_template(id: i64) -> Template {
        Template {
            id: Some(id),
            website_id: 1,
            user_id: 7,
            name: format!("Template {id}"),
            scraping_type: ScrapingType::Detailed,
            settings: TemplateSettings {
                links: vec!["http://x.com".to_string()],
                elements: ElementLocators {
                    title: "//h1".to_string(),
                    price: "//span".to_string(),
                    description: "//p".to_string(),
                },
                is_xpath: true,
            },
            wrapper: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn manager_with(backend: Arc<MockBackend>) -> (SessionManager, Arc<MockStore>) {
        let store = Arc::new(MockStore::default());
        let manager = SessionManager::new(store.clone(), backend);
        (manager, store)
    }

    #[tokio::test]
    async fn test_login_sets_session_and_persists() {
        let backend = Arc::new(MockBackend::new());
        let (manager, store) = manager_with(backend.clone());

        let session = manager.login("a@b.com", "x").await.unwrap();

        assert!(session.is_logged_in);
        assert_eq!(session.token.as_deref(), Some("T1"));
        assert_eq!(session.user_id, Some(7));

        let persisted = store.state.lock().unwrap().clone().unwrap();
        assert!(persisted.is_logged_in);
        assert_eq!(persisted.token.as_deref(), Some("T1"));
        assert_eq!(persisted.user_id, Some(7));
    }

    #[tokio::test]
    async fn test_login_refreshes_websites_with_new_token() {
        let backend = Arc::new(MockBackend::new());
        backend.set_websites(Ok(vec![sample_website(1)]));
        let (manager, _store) = manager_with(backend.clone());

        manager.login("a@b.com", "x").await.unwrap();

        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.tokens_seen.lock().unwrap().as_slice(), ["T1"]);

        // Warm cache: no further network call
        let cached = manager.websites(false).await.unwrap();
        assert_eq!(cached, vec![sample_website(1)]);
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_untouched() {
        let backend = Arc::new(MockBackend::new());
        backend.set_login(Err(ScrapeKitError::auth("Invalid credentials")));
        let (manager, store) = manager_with(backend.clone());

        let err = manager.login("a@b.com", "wrong").await.unwrap_err();
        assert!(err.is_auth());

        assert_eq!(manager.session().await, Session::default());
        assert!(store.state.lock().unwrap().is_none());
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let backend = Arc::new(MockBackend::new());
        backend.set_websites(Ok(vec![sample_website(1)]));
        let (manager, _store) = manager_with(backend.clone());

        manager.login("a@b.com", "x").await.unwrap();
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 1);

        manager.websites(true).await.unwrap();
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_websites_without_login_is_validation_error() {
        let backend = Arc::new(MockBackend::new());
        let (manager, _store) = manager_with(backend.clone());

        let err = manager.websites(false).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let backend = Arc::new(MockBackend::new());
        backend.set_websites(Ok(vec![sample_website(1)]));
        let (manager, _store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        backend.set_websites(Err(ScrapeKitError::fetch(500, "boom")));
        let err = manager.websites(true).await.unwrap_err();
        assert!(err.is_fetch());

        // The previously fetched list still serves from cache
        let cached = manager.websites(false).await.unwrap();
        assert_eq!(cached, vec![sample_website(1)]);
    }

    #[tokio::test]
    async fn test_delete_template_removes_cached_entry() {
        let backend = Arc::new(MockBackend::new());
        backend.set_templates(Ok(vec![sample_template(1), sample_template(3)]));
        let (manager, _store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        manager.templates(false).await.unwrap();
        manager.delete_template(3).await.unwrap();

        let remaining = manager.templates(false).await.unwrap();
        assert_eq!(remaining, vec![sample_template(1)]);
        // Served from cache, not re-fetched after the delete
        assert_eq!(backend.templates_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_template_leaves_cache_unchanged() {
        let backend = Arc::new(MockBackend::new());
        backend.set_templates(Ok(vec![sample_template(1)]));
        let (manager, _store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        manager.templates(false).await.unwrap();
        manager.delete_template(99).await.unwrap();

        let remaining = manager.templates(false).await.unwrap();
        assert_eq!(remaining, vec![sample_template(1)]);
    }

    #[tokio::test]
    async fn test_delete_sends_bearer_token() {
        let backend = Arc::new(MockBackend::new());
        let (manager, _store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        manager.delete_template(3).await.unwrap();

        let tokens = backend.tokens_seen.lock().unwrap();
        assert!(tokens.iter().all(|t| t == "T1"));
        assert_eq!(backend.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_rehydrates_session_and_caches() {
        let backend = Arc::new(MockBackend::new());
        let store = Arc::new(MockStore::default());
        *store.state.lock().unwrap() = Some(StoredState {
            is_logged_in: true,
            token: Some("T1".to_string()),
            user_id: Some(7),
            websites: Some(vec![sample_website(1)]),
            templates: None,
        });

        let manager = SessionManager::new(store, backend.clone());
        manager.restore().await.unwrap();

        let session = manager.session().await;
        assert!(session.is_logged_in);
        assert_eq!(session.token.as_deref(), Some("T1"));

        // Cached websites came from the snapshot, not the network
        let websites = manager.websites(false).await.unwrap();
        assert_eq!(websites, vec![sample_website(1)]);
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restore_fetches_websites_when_snapshot_has_none() {
        let backend = Arc::new(MockBackend::new());
        backend.set_websites(Ok(vec![sample_website(2)]));
        let store = Arc::new(MockStore::default());
        *store.state.lock().unwrap() = Some(StoredState {
            is_logged_in: true,
            token: Some("T1".to_string()),
            user_id: Some(7),
            websites: None,
            templates: None,
        });

        let manager = SessionManager::new(store, backend.clone());
        manager.restore().await.unwrap();

        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            manager.websites(false).await.unwrap(),
            vec![sample_website(2)]
        );
    }

    #[tokio::test]
    async fn test_restore_with_empty_store_stays_logged_out() {
        let backend = Arc::new(MockBackend::new());
        let (manager, _store) = manager_with(backend.clone());

        manager.restore().await.unwrap();

        assert_eq!(manager.session().await, Session::default());
        assert_eq!(backend.websites_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_and_storage() {
        let backend = Arc::new(MockBackend::new());
        let (manager, store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        manager.logout().await.unwrap();

        assert_eq!(manager.session().await, Session::default());
        assert!(store.state.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_rejection_resets_session() {
        let backend = Arc::new(MockBackend::new());
        let (manager, store) = manager_with(backend.clone());
        manager.login("a@b.com", "x").await.unwrap();

        backend.set_templates(Err(ScrapeKitError::fetch(401, "token expired")));
        let err = manager.templates(true).await.unwrap_err();
        assert!(err.is_unauthenticated());

        assert_eq!(manager.session().await, Session::default());
        assert!(store.state.lock().unwrap().is_none());
    }
}
