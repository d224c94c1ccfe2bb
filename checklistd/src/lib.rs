pub mod checklist;
pub mod config;
pub mod context;
pub mod host;
pub mod session;
pub mod storage;
pub mod sync;
pub mod token_provider;
