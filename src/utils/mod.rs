//! Utility functions

mod sanitize;

pub use sanitize::{file_extension, file_stem, sanitize_filename, SanitizeResult, MAX_FILENAME_LENGTH};
