//! Entry input validation and display helpers

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntryError {
    #[error("Title and content are required")]
    MissingFields,
}

/// Validated title and content for creating or updating an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
}

impl EntryDraft {
    /// Validate user input; both fields must contain non-whitespace text
    pub fn new(title: &str, content: &str) -> Result<Self, EntryError> {
        let title = title.trim();
        let content = content.trim_end();

        if title.is_empty() || content.trim().is_empty() {
            return Err(EntryError::MissingFields);
        }

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

/// Storage folder holding the attachment of an entry
pub fn entry_folder(owner_id: &str, entry_id: &str) -> String {
    format!("{}/{}", owner_id, entry_id)
}

/// Full storage path of an attachment
///
/// `filename` must already be sanitized; the sanitizer guarantees it holds no
/// separators or traversal sequences.
pub fn attachment_path(owner_id: &str, entry_id: &str, filename: &str) -> String {
    format!("{}/{}", entry_folder(owner_id, entry_id), filename)
}

/// Format a timestamp the way entries are listed, e.g. `4 March 2024, 10:15`
pub fn display_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%-d %B %Y, %H:%M").to_string()
}

/// First line of the content, shortened to `max_chars`
pub fn preview(content: &str, max_chars: usize) -> String {
    let line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();

    if line.chars().count() <= max_chars {
        return line.to_string();
    }

    let cut: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
