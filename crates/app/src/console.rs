//! The console state object and every user-level operation.
//!
//! Failures are reported twice: as the returned error and as a toast on the
//! event bus. An expired session only produces the re-authentication toast
//! published by [`SessionStore::expire`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aimg_client::{ClientError, ConsoleApi, Transport};
use aimg_core::backend_config::BackendConfig;
use aimg_core::catalog::{ResourceCatalog, ServerHealth};
use aimg_core::history::HistoryEntry;
use aimg_core::request::{build, GenerationForm, GenerationMode};
use aimg_core::result::GenerationResult;
use aimg_core::session::{Credentials, Session};
use aimg_core::types::EntryId;
use aimg_core::workflow::{parse_workflow, workflow_prefix, ActionResponse, WorkflowIndex};
use aimg_events::{ConsoleEvent, EventBus, ToastLevel};
use aimg_store::{FileStore, LocalStore};
use chrono::Utc;

use crate::config::ConsoleConfig;
use crate::error::{AuthError, ConsoleError, ConsoleResult};
use crate::history::HistoryStore;
use crate::loading::LoadingTracker;
use crate::resources::ResourceCache;
use crate::session::SessionStore;
use crate::settings::SettingsStore;

/// A completed, successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Correlation number of the submission within this console.
    pub request: u64,
    pub result: GenerationResult,
    pub entry: HistoryEntry,
}

/// A history entry loaded back into a form.
#[derive(Debug, Clone)]
pub struct Replay {
    pub mode: GenerationMode,
    pub form: GenerationForm,
    /// The original result, for display; it is not re-requested.
    pub result: GenerationResult,
}

pub struct Console {
    config: ConsoleConfig,
    bus: Arc<EventBus>,
    session: Arc<SessionStore>,
    api: ConsoleApi,
    resources: ResourceCache,
    history: HistoryStore,
    settings: SettingsStore,
    loading: LoadingTracker,
    next_request: AtomicU64,
}

impl Console {
    /// Open a console persisting to `config.data_dir`.
    pub fn open(config: ConsoleConfig) -> ConsoleResult<Self> {
        let store = FileStore::open(&config.data_dir)?;
        Self::new(config, Arc::new(store))
    }

    /// Build a console over any store. The history is loaded here.
    pub fn new(config: ConsoleConfig, store: Arc<dyn LocalStore>) -> ConsoleResult<Self> {
        let bus = Arc::new(EventBus::default());
        let session = Arc::new(SessionStore::new(store.clone(), bus.clone()));
        let transport = Transport::new(&config.base_url, config.request_timeout, session.clone())?;

        Ok(Self {
            api: ConsoleApi::new(transport),
            resources: ResourceCache::new(),
            history: HistoryStore::load(store.clone()),
            settings: SettingsStore::new(store),
            loading: LoadingTracker::new(bus.clone(), config.progress_interval),
            next_request: AtomicU64::new(1),
            session,
            bus,
            config,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn session(&self) -> Option<Session> {
        self.session.current()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    /// Restore the persisted session and, when there is one, load the
    /// resource catalog.
    pub async fn start(&self) -> Option<Session> {
        let session = self.session.restore()?;
        // Failure is already reported as a toast.
        let _ = self.refresh_resources().await;
        Some(session)
    }

    // ---- session ----

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = Credentials::new(username, password);
        let result = self.authenticate(&credentials, false).await;
        self.report_auth(&result, "Login successful", "Login failed");
        result
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Session, AuthError> {
        let result = match Credentials::for_registration(username, password, confirm_password) {
            Ok(credentials) => self.authenticate(&credentials, true).await,
            Err(e) => Err(e.into()),
        };
        self.report_auth(&result, "Registration successful", "Registration failed");
        result
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        register: bool,
    ) -> Result<Session, AuthError> {
        let reply = if register {
            self.api.register(credentials).await?
        } else {
            self.api.login(credentials).await?
        };

        let fallback = if register { "Registration failed" } else { "Login failed" };
        let error = reply.response.error.clone();
        let session = match reply.response.into_session(&credentials.username) {
            Some(session) if reply.accepted => session,
            _ => {
                let message = error.unwrap_or_else(|| fallback.to_string());
                tracing::info!(username = %credentials.username, %message, "Authentication refused");
                return Err(AuthError::Rejected(message));
            }
        };

        self.session.establish(session.clone())?;
        // Failure is already reported as a toast.
        let _ = self.refresh_resources().await;
        Ok(session)
    }

    fn report_auth(&self, result: &Result<Session, AuthError>, success: &str, failure: &str) {
        match result {
            Ok(_) => self.bus.toast(ToastLevel::Success, success),
            Err(AuthError::Validation(e)) => self.bus.toast(ToastLevel::Warning, e.to_string()),
            Err(AuthError::Rejected(message)) => self.bus.toast(ToastLevel::Error, message.clone()),
            Err(AuthError::Transport(e)) => {
                tracing::error!(error = %e, "Authentication request failed");
                self.bus.toast(
                    ToastLevel::Error,
                    format!("{failure}: network error, please try again"),
                );
            }
            Err(AuthError::Store(e)) => {
                tracing::error!(error = %e, "Could not persist session");
                self.bus
                    .toast(ToastLevel::Error, format!("{failure}: could not save session"));
            }
        }
    }

    pub fn logout(&self) {
        self.session.logout();
        self.bus.toast(ToastLevel::Info, "Logged out");
    }

    // ---- resources ----

    /// Fetch `/api/status` and replace the cached catalog.
    pub async fn refresh_resources(&self) -> ConsoleResult<ResourceCatalog> {
        let result = self.fetch_resources().await;
        self.report_failure("Failed to load server status", &result);
        result
    }

    async fn fetch_resources(&self) -> ConsoleResult<ResourceCatalog> {
        self.require_session()?;
        let status = expect_session(self.api.status().await?)?;
        tracing::info!(
            servers = status.servers.len(),
            models = status.models.len(),
            loras = status.loras.len(),
            "Resource catalog refreshed"
        );
        self.resources.replace(status);
        self.bus.publish(ConsoleEvent::CatalogRefreshed);
        Ok(self.resources.catalog())
    }

    pub fn catalog(&self) -> ResourceCatalog {
        self.resources.catalog()
    }

    pub fn servers(&self) -> Vec<ServerHealth> {
        self.resources.servers()
    }

    // ---- generation ----

    /// Validate, submit and record one generation.
    ///
    /// Validation failures never reach the network. Submissions are not
    /// serialized: each call tracks its own loading guard and completions
    /// append to the history in arrival order.
    pub async fn generate(
        &self,
        mode: GenerationMode,
        form: &GenerationForm,
    ) -> ConsoleResult<GenerationOutcome> {
        let result = self.submit(mode, form).await;
        self.report_failure("Generation failed", &result);
        result
    }

    async fn submit(
        &self,
        mode: GenerationMode,
        form: &GenerationForm,
    ) -> ConsoleResult<GenerationOutcome> {
        let request = build(mode, form)?;
        self.require_session()?;

        let id = self.next_request.fetch_add(1, Ordering::SeqCst);
        let guard = self.loading.start(id);
        tracing::info!(request = id, %mode, "Submitting generation");

        let result = expect_session(self.api.generate(&request).await?)?;
        if !result.success {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Generation failed".to_string());
            tracing::warn!(request = id, %message, "Backend reported failure");
            return Err(ConsoleError::Backend(message));
        }

        guard.complete();
        let entry = self
            .history
            .append(request.params(), result.clone(), Utc::now());
        tracing::info!(request = id, images = result.images.len(), entry = entry.id, "Generation completed");

        self.bus.publish(ConsoleEvent::GenerationCompleted {
            request: id,
            mode,
            images: result.images.clone(),
        });
        self.bus.publish(ConsoleEvent::HistoryChanged {
            len: self.history.len(),
        });
        self.bus.toast(ToastLevel::Success, "Image generated successfully");

        Ok(GenerationOutcome {
            request: id,
            result,
            entry,
        })
    }

    /// Download every image of `result` into `dir` as
    /// `generated_image_{n}.png`.
    pub async fn download_images(
        &self,
        result: &GenerationResult,
        dir: &Path,
    ) -> ConsoleResult<Vec<PathBuf>> {
        let outcome = self.fetch_images(result, dir).await;
        match &outcome {
            Ok(paths) if !paths.is_empty() => self
                .bus
                .toast(ToastLevel::Success, format!("Downloaded {} image(s)", paths.len())),
            Ok(_) => self.bus.toast(ToastLevel::Info, "No images to download"),
            Err(_) => self.report_failure("Download failed", &outcome),
        }
        outcome
    }

    async fn fetch_images(&self, result: &GenerationResult, dir: &Path) -> ConsoleResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let mut written = Vec::with_capacity(result.images.len());
        for (url, name) in result.images.iter().zip(result.download_file_names()) {
            let bytes = self.api.fetch_image(url).await?;
            let path = dir.join(name);
            tokio::fs::write(&path, &bytes).await?;
            tracing::debug!(%url, path = %path.display(), bytes = bytes.len(), "Downloaded image");
            written.push(path);
        }
        Ok(written)
    }

    // ---- history ----

    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.list()
    }

    /// Load a history entry into a fresh form of its mode.
    pub fn replay(&self, id: EntryId) -> ConsoleResult<Replay> {
        let entry = self
            .history
            .find_by_id(id)
            .ok_or(ConsoleError::HistoryEntryNotFound(id))?;
        let mut form = self.settings.new_form();
        form.fill(&entry.params);
        self.bus.toast(ToastLevel::Info, "Parameters loaded from history");
        Ok(Replay {
            mode: entry.mode(),
            form,
            result: entry.result,
        })
    }

    // ---- configuration ----

    pub async fn load_backend_config(&self) -> ConsoleResult<BackendConfig> {
        let result = self.fetch_backend_config().await;
        self.report_failure("Failed to load configuration", &result);
        result
    }

    async fn fetch_backend_config(&self) -> ConsoleResult<BackendConfig> {
        self.require_session()?;
        expect_session(self.api.get_config().await?)
    }

    /// Drop blank server rows, validate and save the configuration.
    pub async fn save_backend_config(&self, mut config: BackendConfig) -> ConsoleResult<ActionResponse> {
        config.normalize();
        let result = match config.validate() {
            Ok(()) => self.send_backend_config(&config).await,
            Err(e) => Err(e.into()),
        };
        self.report_action("Configuration saved", "Failed to save configuration", &result);
        result
    }

    async fn send_backend_config(&self, config: &BackendConfig) -> ConsoleResult<ActionResponse> {
        self.require_session()?;
        require_action(expect_session(self.api.save_config(config).await?)?)
    }

    // ---- workflows ----

    pub async fn list_workflows(&self) -> ConsoleResult<WorkflowIndex> {
        let result: ConsoleResult<WorkflowIndex> = async {
            self.require_session()?;
            expect_session(self.api.list_workflows().await?)
        }
        .await;
        self.report_failure("Failed to load workflows", &result);
        result
    }

    pub async fn get_workflow(&self, prefix: &str) -> ConsoleResult<serde_json::Value> {
        let result: ConsoleResult<serde_json::Value> = async {
            self.require_session()?;
            expect_session(self.api.get_workflow(prefix).await?)
        }
        .await;
        self.report_failure("Failed to load workflow", &result);
        result
    }

    pub async fn delete_workflow(&self, prefix: &str) -> ConsoleResult<ActionResponse> {
        let result: ConsoleResult<ActionResponse> = async {
            self.require_session()?;
            require_action(expect_session(self.api.delete_workflow(prefix).await?)?)
        }
        .await;
        self.report_action("Workflow deleted", "Failed to delete workflow", &result);
        result
    }

    /// Validate workflow JSON typed into the editor and save it.
    pub async fn save_workflow(&self, text: &str) -> ConsoleResult<ActionResponse> {
        let result: ConsoleResult<ActionResponse> = async {
            let workflow = parse_workflow(text)?;
            self.require_session()?;
            let prefix = workflow_prefix(&workflow)?;
            tracing::info!(prefix, "Saving workflow");
            require_action(expect_session(self.api.save_workflow(&workflow).await?)?)
        }
        .await;
        self.report_action("Workflow saved", "Failed to save workflow", &result);
        result
    }

    // ---- private helpers ----

    fn require_session(&self) -> ConsoleResult<()> {
        if self.session.is_logged_in() {
            Ok(())
        } else {
            Err(ConsoleError::NotLoggedIn)
        }
    }

    fn report_action(&self, success: &str, failure: &str, result: &ConsoleResult<ActionResponse>) {
        match result {
            Ok(action) => self
                .bus
                .toast(ToastLevel::Success, action.message.as_deref().unwrap_or(success)),
            Err(_) => self.report_failure(failure, result),
        }
    }

    /// Publish the toast matching a failed operation. Success is left to
    /// the caller.
    fn report_failure<T>(&self, context: &str, result: &ConsoleResult<T>) {
        let Err(error) = result else {
            return;
        };
        match error {
            ConsoleError::SessionExpired => {}
            ConsoleError::Core(e) => self.bus.toast(ToastLevel::Warning, e.to_string()),
            ConsoleError::Backend(message) => self.bus.toast(ToastLevel::Error, message.clone()),
            ConsoleError::Client(ClientError::Backend { message, .. }) => {
                self.bus.toast(ToastLevel::Error, format!("{context}: {message}"))
            }
            ConsoleError::Client(e) => {
                tracing::error!(error = %e, "{context}");
                self.bus.toast(
                    ToastLevel::Error,
                    format!("{context}: network error, please try again"),
                );
            }
            ConsoleError::NotLoggedIn => self.bus.toast(ToastLevel::Warning, "Please log in first"),
            other => {
                tracing::error!(error = %other, "{context}");
                self.bus.toast(ToastLevel::Error, format!("{context}: {other}"));
            }
        }
    }
}

/// Map the transport's "session rejected" signal to an error.
fn expect_session<T>(value: Option<T>) -> ConsoleResult<T> {
    value.ok_or(ConsoleError::SessionExpired)
}

fn require_action(action: ActionResponse) -> ConsoleResult<ActionResponse> {
    if action.success {
        Ok(action)
    } else {
        Err(ConsoleError::Backend(
            action.reason().unwrap_or("Operation failed").to_string(),
        ))
    }
}
