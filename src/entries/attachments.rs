//! PDF attachments
//!
//! Each entry holds at most one PDF, stored at
//! `{owner_id}/{entry_id}/{sanitized filename}` in the files bucket. Uploading
//! a new file removes whatever the entry folder held before.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::draft::{attachment_path, entry_folder};
use crate::backend::{BackendError, EntryFile, JournalBackend, User};
use crate::utils::sanitize_filename;

/// Largest accepted attachment (2 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 2 * 1024 * 1024;

/// Lifetime of generated download links, in seconds
pub const SIGNED_URL_TTL: u64 = 3600;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Only PDF files are allowed")]
    NotPdf,

    #[error("File is too large (max 2MB)")]
    TooLarge,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Entry not found or unauthorized")]
    EntryNotFound,

    #[error("No file to delete")]
    NoFile,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Whether `data` starts with the PDF file signature
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_SIGNATURE)
}

/// Manages the attachment of journal entries
pub struct AttachmentManager<'a, B: JournalBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: JournalBackend + ?Sized> AttachmentManager<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Upload `data` as the attachment of an entry, replacing any existing one
    pub async fn upload(
        &self,
        entry_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<EntryFile, AttachmentError> {
        let user = self.current_user().await?;

        if !is_pdf(&data) {
            return Err(AttachmentError::NotPdf);
        }

        if data.len() > MAX_ATTACHMENT_SIZE {
            return Err(AttachmentError::TooLarge);
        }

        let file_name = sanitize_filename(filename)
            .into_result()
            .map_err(AttachmentError::InvalidFilename)?;
        if file_name != filename {
            debug!("Sanitized filename {:?} to {:?}", filename, file_name);
        }

        self.ensure_owner(&user, entry_id).await?;

        let folder = entry_folder(&user.id, entry_id);
        let existing = self.existing_paths(&folder).await?;
        if !existing.is_empty() {
            debug!("Replacing {} existing file(s) in {}", existing.len(), folder);
            self.backend.remove_objects(&existing).await?;
        }

        let path = attachment_path(&user.id, entry_id, &file_name);
        self.backend
            .upload_object(&path, data, PDF_CONTENT_TYPE)
            .await
            .map_err(|e| AttachmentError::UploadFailed(e.user_message()))?;
        info!("Uploaded {}", path);

        let file_url = self.backend.create_signed_url(&path, SIGNED_URL_TTL).await?;

        Ok(EntryFile {
            file_name,
            file_url,
        })
    }

    /// Remove the attachment of an entry
    pub async fn remove(&self, entry_id: &str) -> Result<(), AttachmentError> {
        let user = self.current_user().await?;
        self.ensure_owner(&user, entry_id).await?;

        let folder = entry_folder(&user.id, entry_id);
        let existing = self.existing_paths(&folder).await?;
        if existing.is_empty() {
            return Err(AttachmentError::NoFile);
        }

        self.backend.remove_objects(&existing).await?;
        info!("Removed {} file(s) from {}", existing.len(), folder);
        Ok(())
    }

    /// Signed download link for the attachment of an entry
    ///
    /// Returns `None` when the entry has no attachment, or when the storage
    /// service fails to list or sign it.
    pub async fn signed_url(&self, entry_id: &str) -> Result<Option<EntryFile>, AttachmentError> {
        let user = self.current_user().await?;
        self.ensure_owner(&user, entry_id).await?;

        let folder = entry_folder(&user.id, entry_id);
        let objects = match self.backend.list_objects(&folder).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Failed to list files in {}: {}", folder, e);
                return Ok(None);
            }
        };

        let Some(first) = objects.into_iter().next() else {
            return Ok(None);
        };

        let path = attachment_path(&user.id, entry_id, &first.name);
        match self.backend.create_signed_url(&path, SIGNED_URL_TTL).await {
            Ok(file_url) => Ok(Some(EntryFile {
                file_name: first.name,
                file_url,
            })),
            Err(e) => {
                warn!("Failed to create signed URL for {}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn current_user(&self) -> Result<User, AttachmentError> {
        self.backend.current_user().await.map_err(|e| {
            debug!("No current user: {}", e);
            AttachmentError::Unauthorized
        })
    }

    async fn ensure_owner(&self, user: &User, entry_id: &str) -> Result<(), AttachmentError> {
        match self.backend.entry_owner(entry_id).await {
            Ok(Some(owner)) if owner == user.id => Ok(()),
            Ok(_) => Err(AttachmentError::EntryNotFound),
            Err(e) => {
                debug!("Ownership check for {} failed: {}", entry_id, e);
                Err(AttachmentError::EntryNotFound)
            }
        }
    }

    async fn existing_paths(&self, folder: &str) -> Result<Vec<String>, AttachmentError> {
        let objects = self.backend.list_objects(folder).await?;
        Ok(objects
            .into_iter()
            .map(|o| format!("{}/{}", folder, o.name))
            .collect())
    }
}
