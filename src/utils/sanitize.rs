//! Filename sanitization utilities
//!
//! Uploaded attachments are stored under `{owner}/{entry}/{filename}`, and the
//! same name is used when an attachment is exported to disk. The filename
//! therefore has to be a single safe path component on both Windows and Unix.

use serde::Serialize;

/// Windows device names that cannot be used as a file stem (case-insensitive)
const WINDOWS_RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Maximum filename length in characters
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Outcome of sanitizing a filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeResult {
    /// Best-effort cleaned filename (may still be invalid)
    pub filename: String,
    /// Whether `filename` is safe to use
    pub is_valid: bool,
    /// Reason for rejection, set exactly when `is_valid` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether `filename` differs from the trimmed input
    pub was_modified: bool,
}

impl SanitizeResult {
    fn valid(filename: String, was_modified: bool) -> Self {
        Self {
            filename,
            is_valid: true,
            error: None,
            was_modified,
        }
    }

    fn invalid(filename: String, error: impl Into<String>, was_modified: bool) -> Self {
        Self {
            filename,
            is_valid: false,
            error: Some(error.into()),
            was_modified,
        }
    }

    /// Convert into the accepted filename or the rejection reason
    pub fn into_result(self) -> Result<String, String> {
        match self.error {
            None => Ok(self.filename),
            Some(error) => Err(error),
        }
    }
}

/// Whitespace stripped from both ends of a filename before sanitizing
///
/// This is the set browsers trim with `String.prototype.trim`: Unicode
/// whitespace plus the byte-order mark, but not NEXT LINE (U+0085).
fn is_edge_whitespace(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{0085}')
}

/// Characters allowed in a sanitized filename: `[a-zA-Z0-9_\-.]`
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Collapse every run of `target` into a single occurrence
fn collapse_runs(input: &str, target: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous = None;
    for c in input.chars() {
        if c == target && previous == Some(target) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

/// Sanitize a filename for use as a storage key and a filesystem entry
///
/// Characters outside `[a-zA-Z0-9_\-.]` are replaced with `_`, runs of dots
/// and underscores are collapsed, and edge whitespace and dots are removed.
/// The cleaned name is then rejected if it is empty, a Windows device name,
/// longer than [`MAX_FILENAME_LENGTH`], or has no stem before its extension.
///
/// This never fails; rejections are reported through [`SanitizeResult`].
///
/// # Examples
///
/// ```
/// use journal::utils::sanitize_filename;
///
/// let result = sanitize_filename("My Report (Final).pdf");
/// assert!(result.is_valid);
/// assert_eq!(result.filename, "My_Report_Final_.pdf");
/// assert!(result.was_modified);
///
/// let result = sanitize_filename("con.pdf");
/// assert!(!result.is_valid);
/// ```
pub fn sanitize_filename(filename: &str) -> SanitizeResult {
    let trimmed = filename.trim_matches(is_edge_whitespace);
    if trimmed.is_empty() {
        return SanitizeResult::invalid(String::new(), "Filename cannot be empty", false);
    }

    // Substitution has to happen before collapsing so that dots separated only
    // by replaced characters cannot form a traversal sequence afterwards.
    let substituted: String = trimmed
        .trim_matches('.')
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();
    let sanitized = collapse_runs(&collapse_runs(&substituted, '.'), '_');

    if sanitized.is_empty() {
        return SanitizeResult::invalid(
            String::new(),
            "Filename contains only invalid characters",
            true,
        );
    }

    let was_modified = sanitized != trimmed;

    let stem = sanitized
        .split('.')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if WINDOWS_RESERVED_NAMES.contains(&stem.as_str()) {
        let error = format!("Filename \"{stem}\" is reserved by Windows");
        return SanitizeResult::invalid(sanitized, error, was_modified);
    }

    if sanitized.chars().count() > MAX_FILENAME_LENGTH {
        let error = format!("Filename exceeds maximum length of {MAX_FILENAME_LENGTH} characters");
        return SanitizeResult::invalid(sanitized, error, was_modified);
    }

    if !sanitized.chars().all(is_allowed) {
        return SanitizeResult::invalid(
            sanitized,
            "Sanitized filename still contains invalid characters",
            true,
        );
    }

    if sanitized.starts_with('.') {
        return SanitizeResult::invalid(
            sanitized,
            "Filename must have characters before the extension",
            was_modified,
        );
    }

    SanitizeResult::valid(sanitized, was_modified)
}

/// Extension of `name` including the leading dot, or `""` if there is none
///
/// A dot at position 0 marks a hidden file, not an extension.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}

/// `name` without the part returned by [`file_extension`]
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_charset(name: &str) {
        assert!(
            name.chars().all(is_allowed),
            "{name:?} contains characters outside the whitelist"
        );
    }

    #[test]
    fn test_accepts_valid_name_unchanged() {
        let result = sanitize_filename("document-2024_v1.pdf");
        assert_eq!(
            result,
            SanitizeResult {
                filename: "document-2024_v1.pdf".to_string(),
                is_valid: true,
                error: None,
                was_modified: false,
            }
        );
    }

    #[test]
    fn test_replaces_spaces_and_punctuation() {
        let result = sanitize_filename("My Report (Final).pdf");
        assert!(result.is_valid);
        assert_eq!(result.filename, "My_Report_Final_.pdf");
        assert!(result.was_modified);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_directory_traversal_collapsed() {
        let result = sanitize_filename("../../etc/passwd.pdf");
        assert!(result.is_valid);
        assert_eq!(result.filename, "_._etc_passwd.pdf");
        assert!(!result.filename.contains(".."));
        assert!(!result.filename.contains('/'));
        assert!(result.was_modified);
    }

    #[test]
    fn test_windows_separators_replaced() {
        let result = sanitize_filename("..\\..\\windows\\system32\\config.pdf");
        assert!(result.is_valid);
        assert!(!result.filename.contains(".."));
        assert!(!result.filename.contains('\\'));
    }

    #[test]
    fn test_empty_and_whitespace_rejected() {
        for input in ["", "   ", "\t\n"] {
            let result = sanitize_filename(input);
            assert!(!result.is_valid);
            assert_eq!(result.filename, "");
            assert_eq!(result.error.as_deref(), Some("Filename cannot be empty"));
            assert!(!result.was_modified);
        }
    }

    #[test]
    fn test_only_dots_rejected_as_invalid_characters() {
        let result = sanitize_filename("....");
        assert!(!result.is_valid);
        assert_eq!(
            result.error.as_deref(),
            Some("Filename contains only invalid characters")
        );
        assert!(result.was_modified);
    }

    #[test]
    fn test_reserved_names_case_insensitive() {
        for input in ["con.pdf", "CON.pdf", "Con.txt", "nul", "Lpt9.pdf", "COM1.backup.pdf"] {
            let result = sanitize_filename(input);
            assert!(!result.is_valid, "{input} should be rejected");
            let error = result.error.unwrap();
            assert!(error.contains("reserved"), "unexpected error: {error}");
        }
    }

    #[test]
    fn test_reserved_error_names_token() {
        let result = sanitize_filename("aux.pdf");
        assert_eq!(
            result.error.as_deref(),
            Some("Filename \"AUX\" is reserved by Windows")
        );
        assert_eq!(result.filename, "aux.pdf");
        assert!(!result.was_modified);
    }

    #[test]
    fn test_reserved_substring_not_rejected() {
        let result = sanitize_filename("MYCON.pdf");
        assert!(result.is_valid);
        let result = sanitize_filename("COM10.pdf");
        assert!(result.is_valid);
    }

    #[test]
    fn test_length_boundary() {
        let at_limit = format!("{}.pdf", "a".repeat(MAX_FILENAME_LENGTH - 4));
        assert_eq!(at_limit.len(), 255);
        let result = sanitize_filename(&at_limit);
        assert!(result.is_valid);
        assert!(!result.was_modified);

        let over_limit = format!("{}.pdf", "a".repeat(MAX_FILENAME_LENGTH - 3));
        assert_eq!(over_limit.len(), 256);
        let result = sanitize_filename(&over_limit);
        assert!(!result.is_valid);
        assert_eq!(
            result.error.as_deref(),
            Some("Filename exceeds maximum length of 255 characters")
        );
    }

    #[test]
    fn test_edge_dots_and_whitespace_stripped() {
        let result = sanitize_filename("  .hidden.pdf.  ");
        assert!(result.is_valid);
        assert_eq!(result.filename, "hidden.pdf");
        assert!(result.was_modified);
    }

    #[test]
    fn test_surrounding_whitespace_alone_is_not_a_modification() {
        let result = sanitize_filename("  notes.pdf ");
        assert!(result.is_valid);
        assert_eq!(result.filename, "notes.pdf");
        assert!(!result.was_modified);
    }

    #[test]
    fn test_byte_order_mark_is_trimmed() {
        let result = sanitize_filename("\u{FEFF}");
        assert!(!result.is_valid);
        assert_eq!(result.error.as_deref(), Some("Filename cannot be empty"));
        assert!(!result.was_modified);

        let result = sanitize_filename("\u{FEFF}notes.pdf");
        assert_eq!(result.filename, "notes.pdf");
        assert!(!result.was_modified);
    }

    #[test]
    fn test_next_line_is_replaced_not_trimmed() {
        let result = sanitize_filename("\u{0085}notes.pdf\u{0085}");
        assert!(result.is_valid);
        assert_eq!(result.filename, "_notes.pdf_");
        assert!(result.was_modified);
    }

    #[test]
    fn test_underscore_runs_collapsed() {
        let result = sanitize_filename("a   b___c.pdf");
        assert_eq!(result.filename, "a_b_c.pdf");
    }

    #[test]
    fn test_unicode_replaced() {
        let result = sanitize_filename("résumé 日本語.pdf");
        assert!(result.is_valid);
        assert_eq!(result.filename, "r_sum_.pdf");
        assert_charset(&result.filename);
    }

    #[test]
    fn test_control_characters_replaced() {
        let result = sanitize_filename("bad\0name\u{7}.pdf");
        assert!(result.is_valid);
        assert_eq!(result.filename, "bad_name_.pdf");
    }

    #[test]
    fn test_output_charset_for_assorted_inputs() {
        let inputs = [
            "a/b\\c:d*e?f\"g<h>i|j.pdf",
            "..",
            ". .pdf",
            "~$temp.pdf",
            "tab\tname.pdf",
            "emoji 😀.pdf",
            "%2e%2e%2fetc.pdf",
        ];
        for input in inputs {
            let result = sanitize_filename(input);
            if !result.filename.is_empty() {
                assert_charset(&result.filename);
                assert!(!result.filename.contains(".."));
            }
            assert_eq!(result.is_valid, result.error.is_none());
        }
    }

    #[test]
    fn test_idempotent_on_valid_output() {
        for input in ["My Report (Final).pdf", "../../etc/passwd.pdf", "plain.pdf", "x"] {
            let first = sanitize_filename(input);
            assert!(first.is_valid);
            let second = sanitize_filename(&first.filename);
            assert_eq!(second.filename, first.filename);
            assert!(second.is_valid);
            assert!(!second.was_modified);
        }
    }

    fn is_reserved_stem(name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or_default().to_ascii_uppercase();
        WINDOWS_RESERVED_NAMES.contains(&stem.as_str())
    }

    proptest! {
        #[test]
        fn test_any_input_yields_safe_output(input in any::<String>()) {
            let result = sanitize_filename(&input);
            prop_assert!(result.filename.chars().all(is_allowed));
            prop_assert!(!result.filename.contains(".."));
            prop_assert_eq!(result.is_valid, result.error.is_none());
        }

        #[test]
        fn test_path_like_input_yields_safe_output(input in "[a-zA-Z0-9 ./\\\\:_-]{0,64}") {
            let result = sanitize_filename(&input);
            prop_assert!(result.filename.chars().all(is_allowed));
            prop_assert!(!result.filename.contains(".."));
            prop_assert!(!result.filename.starts_with('.'));
            prop_assert_eq!(result.is_valid, result.error.is_none());
        }

        #[test]
        fn test_valid_output_is_stable(input in any::<String>()) {
            let first = sanitize_filename(&input);
            if first.is_valid {
                let second = sanitize_filename(&first.filename);
                prop_assert_eq!(&second.filename, &first.filename);
                prop_assert!(second.is_valid);
                prop_assert!(!second.was_modified);
            }
        }

        #[test]
        fn test_whitelisted_input_is_only_shortened(input in "[a-zA-Z0-9_.-]{1,64}") {
            let result = sanitize_filename(&input);
            prop_assert!(result.filename.len() <= input.len());
            prop_assert!(!result.filename.contains("__"));
            prop_assert_eq!(result.is_valid, result.error.is_none());
            if !result.filename.is_empty() && !is_reserved_stem(&result.filename) {
                prop_assert!(result.is_valid);
                prop_assert_eq!(result.was_modified, result.filename != input);
            }
        }
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            sanitize_filename("ok.pdf").into_result(),
            Ok("ok.pdf".to_string())
        );
        assert_eq!(
            sanitize_filename("").into_result(),
            Err("Filename cannot be empty".to_string())
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sanitize_filename("PRN")).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["wasModified"], false);
        assert!(json["error"].as_str().unwrap().contains("reserved"));

        let json = serde_json::to_value(sanitize_filename("ok.pdf")).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.pdf"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension(".hidden"), "");
        assert_eq!(file_extension("trailing."), ".");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("report.pdf"), "report");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
