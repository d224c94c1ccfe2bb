use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::checklist::Checklist;
use crate::context::WorkspaceContext;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode checklist: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key of the locally persisted list for one project path.
pub fn storage_key(context: &WorkspaceContext) -> String {
    format!("tc_checklist::{}::{}", context.project_id, context.path)
}

/// Local copy of one checklist, stored as a JSON file named after the
/// SHA-256 of its storage key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    file: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: &Path, context: &WorkspaceContext) -> Self {
        let digest = Sha256::digest(storage_key(context).as_bytes());
        Self {
            file: data_dir.join(format!("{digest:x}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Missing or unreadable files yield an empty list.
    pub fn load(&self) -> Checklist {
        match std::fs::read(&self.file) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(file = %self.file.display(), %err, "discarding unreadable local checklist");
                Checklist::new()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Checklist::new(),
            Err(err) => {
                tracing::warn!(file = %self.file.display(), %err, "failed to read local checklist");
                Checklist::new()
            }
        }
    }

    pub fn save(&self, items: &Checklist) -> Result<(), StoreError> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let partial = self.file.with_extension("json.partial");
        std::fs::write(&partial, serde_json::to_vec(items)?)?;
        std::fs::rename(partial, &self.file)?;
        Ok(())
    }
}
