//! Entry drafts, attachments and export

pub mod attachments;
pub mod draft;
pub mod export;

use tracing::{debug, warn};

pub use attachments::{AttachmentError, AttachmentManager};
pub use draft::{EntryDraft, EntryError};

use crate::backend::{BackendClient, BackendError};

/// Delete an entry together with its attachment
///
/// A failure to remove the attachment is logged and does not stop the entry
/// itself from being deleted.
pub async fn delete_entry(client: &BackendClient, entry_id: &str) -> Result<(), BackendError> {
    match AttachmentManager::new(client).remove(entry_id).await {
        Ok(()) => debug!("Removed attachment of {}", entry_id),
        Err(AttachmentError::NoFile) => {}
        Err(e) => warn!("Could not remove attachment of {}: {}", entry_id, e),
    }

    client.delete_entry(entry_id).await
}
