//! Backend API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Journal entry row from the `entries` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Row inserted when creating an entry
#[derive(Debug, Clone, Serialize)]
pub struct NewEntry<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Columns changed when updating an entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryUpdate<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

/// Only the owner column, used for ownership checks
#[derive(Debug, Clone, Deserialize)]
pub struct EntryOwner {
    pub user_id: String,
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Email/password credentials
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token grant response from the auth service
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Signup response
///
/// With email confirmation enabled the auth service returns the bare user
/// instead of a token grant.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(User),
}

/// Stored login session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    /// Build a session from a token grant, resolving the absolute expiry
    pub fn from_token(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(token.expires_in));

        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }

    /// Whether the access token is expired or about to expire
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + chrono::Duration::seconds(30)
    }
}

/// Object listed in a storage folder
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageObject {
    pub name: String,
    /// Folders in a listing have no id
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for listing a storage folder
#[derive(Debug, Clone, Serialize)]
pub struct ListObjectsRequest<'a> {
    pub prefix: &'a str,
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SortBy {
    pub column: &'static str,
    pub order: &'static str,
}

/// Body for removing storage objects
#[derive(Debug, Clone, Serialize)]
pub struct RemoveObjectsRequest<'a> {
    pub prefixes: &'a [String],
}

/// Body for signing an object URL
#[derive(Debug, Clone, Serialize)]
pub struct SignUrlRequest {
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUrlResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

/// File attached to an entry, with a temporary download link
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFile {
    pub file_name: String,
    pub file_url: String,
}

/// Error body returned by the backend services
///
/// The auth, table and storage services each use different field names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub msg: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message in the body
    pub fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_row() {
        let json = r#"{
            "id": "0b6f3c1e-6a8e-4f5e-9a57-2d6f0e2c9a11",
            "user_id": "user-1",
            "title": "Monday",
            "content": "Rain all day.",
            "created_at": "2024-03-04T10:15:30.123456+00:00"
        }"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.title, "Monday");
        assert_eq!(entry.user_id, "user-1");
        assert_eq!(entry.created_at.format("%Y-%m-%d").to_string(), "2024-03-04");
    }

    #[test]
    fn test_signup_response_with_session() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "expires_at": 1700000000,
            "token_type": "bearer",
            "user": {"id": "user-1", "email": "a@b.c"}
        }"#;
        match serde_json::from_str::<SignUpResponse>(json).unwrap() {
            SignUpResponse::Session(token) => {
                let session = Session::from_token(token);
                assert_eq!(session.expires_at.timestamp(), 1700000000);
                assert_eq!(session.user.id, "user-1");
            }
            SignUpResponse::User(_) => panic!("expected a session"),
        }
    }

    #[test]
    fn test_signup_response_pending_confirmation() {
        let json = r#"{"id": "user-2", "email": "new@b.c", "confirmation_sent_at": "2024-01-01T00:00:00Z"}"#;
        match serde_json::from_str::<SignUpResponse>(json).unwrap() {
            SignUpResponse::User(user) => assert_eq!(user.email.as_deref(), Some("new@b.c")),
            SignUpResponse::Session(_) => panic!("expected a bare user"),
        }
    }

    #[test]
    fn test_session_expiry_from_expires_in() {
        let token = TokenResponse {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_in: 3600,
            expires_at: None,
            user: User {
                id: "u".into(),
                email: None,
                created_at: None,
            },
        };
        let session = Session::from_token(token);
        assert!(!session.is_expired());

        let mut stale = session.clone();
        stale.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(stale.is_expired());
    }

    #[test]
    fn test_error_body_prefers_description() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"statusCode": "404", "error": "not_found", "message": "Object not found"}"#)
                .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Object not found"));
    }

    #[test]
    fn test_entry_file_serializes_camel_case() {
        let file = EntryFile {
            file_name: "a.pdf".into(),
            file_url: "https://x/y".into(),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["fileName"], "a.pdf");
        assert_eq!(json["fileUrl"], "https://x/y");
    }
}
