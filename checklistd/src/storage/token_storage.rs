use std::sync::Arc;

use keyring::Entry;
use thiserror::Error;

const SERVICE_NAME: &str = "com.tc-checklist";
const TOKEN_KEY: &str = "connect_access_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
    #[error("token not found")]
    TokenNotFound,
}

/// Access token kept in the OS keyring. Clones share one entry.
#[derive(Clone)]
pub struct TokenStorage {
    entry: Arc<Entry>,
}

impl TokenStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            entry: Arc::new(Entry::new(SERVICE_NAME, TOKEN_KEY)?),
        })
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<String, StorageError> {
        match self.entry.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(StorageError::TokenNotFound),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }

    pub fn delete_token(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }
}
