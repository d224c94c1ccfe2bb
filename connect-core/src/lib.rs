mod client;

pub use client::{ConnectClient, ConnectError, DEFAULT_BASE_URL, FileEntry, Folder, UploadedFile};
