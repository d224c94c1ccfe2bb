mod local_store;
mod token_storage;

pub use local_store::{LocalStore, StoreError, storage_key};
pub use token_storage::{StorageError, TokenStorage};
