use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use connect_core::{ConnectClient, ConnectError};
use thiserror::Error;
use time::OffsetDateTime;

use crate::checklist::decode_checklist;
use crate::config::DEFAULT_FOLDER_NAME;
use crate::context::WorkspaceContext;
use crate::host::ChecklistHost;
use crate::token_provider::{AuthError, TokenSource};

use super::debounce::Debouncer;
use super::paths::sanitize_filename;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Remote(#[from] ConnectError),
    #[error("project folder has no id")]
    MissingFolderId,
}

impl SyncError {
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, SyncError::Remote(err) if err.is_auth_rejection())
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub folder_name: String,
    pub debounce: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            debounce: Duration::from_secs(1),
        }
    }
}

/// Observable part of the controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub on: bool,
    pub last_push: Option<OffsetDateTime>,
    pub folder_id: Option<String>,
    pub file_id: Option<String>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The folder holds no document for this path yet.
    NoRemoteFile,
    Replaced { items: usize },
    /// The remote document was not a checklist and was left alone.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub file_id: Option<String>,
    pub items: usize,
}

struct RemoteLocation {
    folder_id: String,
    file_id: Option<String>,
}

/// Keeps a host checklist in sync with one JSON document in the project's
/// checklist folder.
///
/// Clones share the same state. Remote operations of one controller never
/// overlap: pulls, manual pushes and debounced pushes queue on a single
/// async lock.
pub struct SyncController<T, H> {
    inner: Arc<Inner<T, H>>,
}

struct Inner<T, H> {
    client: ConnectClient,
    tokens: T,
    host: H,
    context: WorkspaceContext,
    folder_name: String,
    state: Mutex<SyncState>,
    debouncer: Debouncer,
    remote: tokio::sync::Mutex<()>,
}

impl<T, H> Clone for SyncController<T, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, H> SyncController<T, H>
where
    T: TokenSource + 'static,
    H: ChecklistHost + 'static,
{
    pub fn new(
        client: ConnectClient,
        tokens: T,
        host: H,
        context: WorkspaceContext,
        settings: SyncSettings,
    ) -> Self {
        let filename = sanitize_filename(&context.path);
        Self {
            inner: Arc::new(Inner {
                client,
                tokens,
                host,
                context,
                folder_name: settings.folder_name,
                state: Mutex::new(SyncState {
                    on: false,
                    last_push: None,
                    folder_id: None,
                    file_id: None,
                    filename,
                }),
                debouncer: Debouncer::new(settings.debounce),
                remote: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn is_on(&self) -> bool {
        self.state().on
    }

    pub fn snapshot(&self) -> SyncState {
        self.state().clone()
    }

    pub fn is_push_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn context(&self) -> &WorkspaceContext {
        &self.inner.context
    }

    /// Enables sync: checks that a token can be obtained, pulls the remote
    /// document and then arms a push of the resulting list.
    ///
    /// A missing token leaves the controller off. A failed pull is reported
    /// and returned, but the controller stays on and no push is armed until
    /// the next local change.
    pub async fn turn_on(&self) -> Result<(), SyncError> {
        if self.is_on() {
            return Ok(());
        }
        if let Err(err) = self.inner.tokens.access_token().await {
            tracing::warn!(%err, "project sync not enabled");
            self.report(&format!("Sync unavailable: {err}"));
            return Err(err.into());
        }
        let filename = {
            let mut state = self.state();
            state.on = true;
            state.filename.clone()
        };
        tracing::info!(
            project = %self.inner.context.project_id,
            %filename,
            "project sync enabled"
        );

        self.pull_now().await?;
        self.schedule_push();
        Ok(())
    }

    /// Disables sync and drops a push that is still waiting for its quiet
    /// period. Requests already in flight run to completion; call
    /// [`SyncController::flush`] first to keep the pending push.
    pub fn turn_off(&self) {
        let was_on = std::mem::replace(&mut self.state().on, false);
        let dropped_push = self.inner.debouncer.cancel();
        if was_on {
            tracing::info!(dropped_push, "project sync disabled");
        }
    }

    /// Arms (or re-arms) the debounced push. No-op while off.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_push(&self) {
        if !self.is_on() {
            return;
        }
        let controller = self.clone();
        self.inner.debouncer.schedule(async move {
            // push_now reports its own failure
            let _ = controller.push_now().await;
        });
    }

    /// Sends a push still waiting for its quiet period right away and waits
    /// for debounced pushes that are already running.
    pub async fn flush(&self) {
        if self.inner.debouncer.cancel() {
            // push_now reports its own failure
            let _ = self.push_now().await;
        }
        self.inner.debouncer.wait_fired().await;
    }

    pub async fn pull_now(&self) -> Result<PullOutcome, SyncError> {
        let result = self.pull().await;
        if let Err(err) = &result {
            self.report_failure("Pull failed", err);
        }
        result
    }

    pub async fn push_now(&self) -> Result<PushOutcome, SyncError> {
        let result = self.push().await;
        if let Err(err) = &result {
            self.report_failure("Push failed", err);
        }
        result
    }

    async fn pull(&self) -> Result<PullOutcome, SyncError> {
        let token = self.inner.tokens.access_token().await?;
        let _remote = self.inner.remote.lock().await;
        let location = self.init_if_needed(&token).await?;
        let Some(file_id) = location.file_id else {
            self.report("No remote checklist yet (it is created on the first push).");
            return Ok(PullOutcome::NoRemoteFile);
        };

        self.report("Loading remote checklist...");
        let document = self
            .inner
            .client
            .download_json_by_id(&self.inner.context.project_id, &token, &file_id)
            .await?;
        match decode_checklist(document) {
            Ok(items) => {
                let count = items.len();
                self.inner.host.replace_items(items);
                self.report(&format!("Loaded {count} items from the project."));
                Ok(PullOutcome::Replaced { items: count })
            }
            Err(err) => {
                tracing::debug!(%err, %file_id, "ignoring remote checklist");
                Ok(PullOutcome::Ignored)
            }
        }
    }

    async fn push(&self) -> Result<PushOutcome, SyncError> {
        let token = self.inner.tokens.access_token().await?;
        let _remote = self.inner.remote.lock().await;
        let location = self.init_if_needed(&token).await?;
        self.report(if location.file_id.is_some() {
            "Saving new version..."
        } else {
            "Uploading first version..."
        });

        let items = self.inner.host.items();
        let filename = self.state().filename.clone();
        let uploaded = self
            .inner
            .client
            .upload_json(
                &self.inner.context.project_id,
                &location.folder_id,
                &token,
                &filename,
                &items,
            )
            .await?;

        let file_id = {
            let mut state = self.state();
            if let Some(id) = uploaded.id.filter(|id| !id.is_empty()) {
                state.file_id = Some(id);
            }
            state.last_push = Some(OffsetDateTime::now_utc());
            state.file_id.clone()
        };
        tracing::info!(items = items.len(), file_id = ?file_id, "pushed checklist");
        self.report("Saved to the project.");
        Ok(PushOutcome {
            file_id,
            items: items.len(),
        })
    }

    /// Resolves the checklist folder and the document in it once per
    /// controller. Nothing is cached until both lookups succeed, so a failed
    /// lookup is retried by the next operation.
    async fn init_if_needed(&self, token: &str) -> Result<RemoteLocation, SyncError> {
        let (cached, filename) = {
            let state = self.state();
            let cached = state.folder_id.clone().map(|folder_id| RemoteLocation {
                folder_id,
                file_id: state.file_id.clone(),
            });
            (cached, state.filename.clone())
        };
        if let Some(location) = cached {
            return Ok(location);
        }

        let project_id = &self.inner.context.project_id;
        self.report("Checking project folder...");
        let folder = self
            .inner
            .client
            .ensure_folder(project_id, token, &self.inner.folder_name)
            .await?;
        let folder_id = folder
            .id
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::MissingFolderId)?;

        self.report("Looking for an existing checklist...");
        let files = self
            .inner
            .client
            .list_files(project_id, token, &folder_id)
            .await?;
        let found = files
            .into_iter()
            .find(|file| file.name == filename)
            .and_then(|file| file.id);

        let mut state = self.state();
        state.folder_id = Some(folder_id.clone());
        if state.file_id.is_none() {
            state.file_id = found;
        }
        tracing::debug!(%folder_id, file_id = ?state.file_id, "resolved remote location");
        Ok(RemoteLocation {
            folder_id,
            file_id: state.file_id.clone(),
        })
    }

    fn report(&self, message: &str) {
        self.inner.host.status(message);
    }

    fn report_failure(&self, action: &str, err: &SyncError) {
        tracing::warn!(%err, "{action}");
        if err.is_auth_rejection() {
            self.report(&format!("{action}: {err} (access token rejected)"));
        } else {
            self.report(&format!("{action}: {err}"));
        }
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
