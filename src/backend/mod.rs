//! Hosted backend client module

pub mod auth;
pub mod client;
pub mod error;
pub mod models;

use async_trait::async_trait;
use bytes::Bytes;

pub use auth::SignUpOutcome;
pub use client::{BackendClient, ENTRIES_TABLE, FILES_BUCKET};
pub use error::BackendError;
pub use models::*;

/// Backend operations the attachment workflow depends on
#[async_trait]
pub trait JournalBackend: Send + Sync {
    /// The signed-in user
    async fn current_user(&self) -> Result<User, BackendError>;

    /// Owner of an entry, or `None` if it does not exist for the caller
    async fn entry_owner(&self, entry_id: &str) -> Result<Option<String>, BackendError>;

    /// Objects directly inside a storage folder
    async fn list_objects(&self, folder: &str) -> Result<Vec<StorageObject>, BackendError>;

    async fn upload_object(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError>;

    async fn remove_objects(&self, paths: &[String]) -> Result<(), BackendError>;

    /// Time-limited download URL for an object
    async fn create_signed_url(&self, path: &str, expires_in: u64) -> Result<String, BackendError>;
}

#[async_trait]
impl JournalBackend for BackendClient {
    async fn current_user(&self) -> Result<User, BackendError> {
        self.get_user().await
    }

    async fn entry_owner(&self, entry_id: &str) -> Result<Option<String>, BackendError> {
        self.fetch_entry_owner(entry_id).await
    }

    async fn list_objects(&self, folder: &str) -> Result<Vec<StorageObject>, BackendError> {
        self.storage_list(folder).await
    }

    async fn upload_object(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.storage_upload(path, data, content_type).await
    }

    async fn remove_objects(&self, paths: &[String]) -> Result<(), BackendError> {
        self.storage_remove(paths).await
    }

    async fn create_signed_url(&self, path: &str, expires_in: u64) -> Result<String, BackendError> {
        self.storage_sign(path, expires_in).await
    }
}
