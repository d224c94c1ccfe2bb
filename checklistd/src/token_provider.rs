use std::future::Future;

use thiserror::Error;

use crate::storage::{StorageError, TokenStorage};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token accessor is not available")]
    Unavailable,
    #[error("no access token received")]
    EmptyToken,
    #[error("token storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("token lookup did not finish: {0}")]
    Lookup(#[from] tokio::task::JoinError),
}

/// Supplies bearer tokens for remote calls. Asked once per operation, so
/// implementations may refresh between calls.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> impl Future<Output = Result<String, AuthError>> + Send;
}

/// A missing accessor is a host without workspace auth.
impl<T: TokenSource> TokenSource for Option<T> {
    async fn access_token(&self) -> Result<String, AuthError> {
        match self {
            Some(source) => source.access_token().await,
            None => Err(AuthError::Unavailable),
        }
    }
}

#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_tuple("StaticToken").field(&"[REDACTED]").finish()
    }
}

impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        non_empty(self.0.clone())
    }
}

/// The keyring call blocks on the secret service, so it runs on the
/// blocking pool.
impl TokenSource for TokenStorage {
    async fn access_token(&self) -> Result<String, AuthError> {
        let storage = self.clone();
        match tokio::task::spawn_blocking(move || storage.get_token()).await? {
            Ok(token) => non_empty(token),
            Err(StorageError::TokenNotFound) => Err(AuthError::EmptyToken),
            Err(err) => Err(err.into()),
        }
    }
}

/// Token source picked at startup: `CHECKLIST_TOKEN` when set, the keyring
/// otherwise.
pub enum TokenProvider {
    Static(StaticToken),
    Keyring(TokenStorage),
}

impl TokenProvider {
    pub fn from_env() -> Result<Self, AuthError> {
        match std::env::var("CHECKLIST_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Ok(Self::Static(StaticToken::new(token))),
            _ => Ok(Self::Keyring(TokenStorage::new()?)),
        }
    }
}

impl TokenSource for TokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        match self {
            TokenProvider::Static(token) => token.access_token().await,
            TokenProvider::Keyring(storage) => storage.access_token().await,
        }
    }
}

fn non_empty(token: String) -> Result<String, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        Err(AuthError::EmptyToken)
    } else {
        Ok(token.to_string())
    }
}
