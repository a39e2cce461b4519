//! Backend HTTP client
//!
//! Talks to the three services of the hosted backend: auth (`/auth/v1`), the
//! REST table interface (`/rest/v1`) and object storage (`/storage/v1`).

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::auth::auth_headers;
use super::error::BackendError;
use super::models::*;

/// Table holding journal entries
pub const ENTRIES_TABLE: &str = "entries";

/// Storage bucket holding entry attachments
pub const FILES_BUCKET: &str = "entry-files";

/// Page size used when listing a storage folder
const LIST_LIMIT: u32 = 100;

/// HTTP client for the hosted backend
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl BackendClient {
    /// Create an anonymous client
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let http_client = Client::builder()
            .user_agent(concat!("journal/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            anon_key: anon_key.to_string(),
            access_token: None,
            http_client,
        })
    }

    /// Act on behalf of the user owning `access_token`
    pub fn with_access_token(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with the project and user headers attached
    pub(super) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let headers = auth_headers(&self.anon_key, self.access_token.as_deref())?;
        Ok(self.http_client.request(method, self.url(path)).headers(headers))
    }

    /// Send a request, turning non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        debug!("Backend returned {}: {}", status, String::from_utf8_lossy(&body));
        Err(BackendError::from_response(status, &body))
    }

    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub(super) async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.send(request).await?;
        Ok(())
    }

    // Entries table. Row-level security restricts every query to the caller's
    // own rows, so a row owned by someone else looks exactly like a missing one.

    /// Get all entries, newest first
    pub async fn list_entries(&self) -> Result<Vec<Entry>, BackendError> {
        debug!("Fetching entries");

        let entries: Vec<Entry> = self
            .send_json(
                self.request(Method::GET, &table_path(ENTRIES_TABLE))?
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
            )
            .await?;

        debug!("Found {} entries", entries.len());
        Ok(entries)
    }

    /// Get a single entry
    pub async fn get_entry(&self, id: &str) -> Result<Entry, BackendError> {
        debug!("Fetching entry {}", id);

        let rows: Vec<Entry> = self
            .send_json(
                self.request(Method::GET, &table_path(ENTRIES_TABLE))?
                    .query(&[("select", "*".to_string()), ("id", eq(id))]),
            )
            .await?;

        rows.into_iter().next().ok_or(BackendError::NotFound("Entry"))
    }

    /// Get the owner of an entry, or `None` if the caller cannot see it
    pub async fn fetch_entry_owner(&self, id: &str) -> Result<Option<String>, BackendError> {
        let rows: Vec<EntryOwner> = self
            .send_json(
                self.request(Method::GET, &table_path(ENTRIES_TABLE))?
                    .query(&[("select", "user_id".to_string()), ("id", eq(id))]),
            )
            .await?;

        Ok(rows.into_iter().next().map(|row| row.user_id))
    }

    /// Insert an entry and return the stored row
    pub async fn create_entry(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Entry, BackendError> {
        debug!("Creating entry {:?}", title);

        let row = NewEntry {
            user_id,
            title,
            content,
            created_at: chrono::Utc::now(),
        };

        let rows: Vec<Entry> = self
            .send_json(
                self.request(Method::POST, &table_path(ENTRIES_TABLE))?
                    .header("Prefer", "return=representation")
                    .json(&[row]),
            )
            .await?;

        rows.into_iter().next().ok_or(BackendError::NotFound("Entry"))
    }

    /// Update the title and content of an entry
    pub async fn update_entry(
        &self,
        id: &str,
        title: &str,
        content: &str,
    ) -> Result<Entry, BackendError> {
        debug!("Updating entry {}", id);

        let rows: Vec<Entry> = self
            .send_json(
                self.request(Method::PATCH, &table_path(ENTRIES_TABLE))?
                    .query(&[("id", eq(id))])
                    .header("Prefer", "return=representation")
                    .json(&EntryUpdate { title, content }),
            )
            .await?;

        rows.into_iter().next().ok_or(BackendError::NotFound("Entry"))
    }

    /// Delete an entry
    pub async fn delete_entry(&self, id: &str) -> Result<(), BackendError> {
        debug!("Deleting entry {}", id);

        self.send_empty(
            self.request(Method::DELETE, &table_path(ENTRIES_TABLE))?
                .query(&[("id", eq(id))]),
        )
        .await
    }

    // Storage

    /// List the objects directly inside `folder`
    pub async fn storage_list(&self, folder: &str) -> Result<Vec<StorageObject>, BackendError> {
        debug!("Listing storage folder {}", folder);

        let body = ListObjectsRequest {
            prefix: folder,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let objects: Vec<StorageObject> = self
            .send_json(
                self.request(Method::POST, &format!("/storage/v1/object/list/{}", FILES_BUCKET))?
                    .json(&body),
            )
            .await?;

        // Sub-folders are listed without an id
        Ok(objects.into_iter().filter(|o| o.id.is_some()).collect())
    }

    /// Upload an object, replacing any object at the same path
    pub async fn storage_upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError> {
        debug!("Uploading {} bytes to {}", data.len(), path);

        self.send_empty(
            self.request(Method::POST, &object_path(FILES_BUCKET, path))?
                .header(CONTENT_TYPE, content_type)
                .header("x-upsert", "true")
                .body(data),
        )
        .await
    }

    /// Remove objects by their full paths
    pub async fn storage_remove(&self, paths: &[String]) -> Result<(), BackendError> {
        debug!("Removing {} object(s)", paths.len());

        self.send_empty(
            self.request(Method::DELETE, &format!("/storage/v1/object/{}", FILES_BUCKET))?
                .json(&RemoveObjectsRequest { prefixes: paths }),
        )
        .await
    }

    /// Create a time-limited download URL for an object
    pub async fn storage_sign(&self, path: &str, expires_in: u64) -> Result<String, BackendError> {
        debug!("Signing {} for {}s", path, expires_in);

        let response: SignUrlResponse = self
            .send_json(
                self.request(
                    Method::POST,
                    &format!("/storage/v1/object/sign/{}/{}", FILES_BUCKET, encode_path(path)),
                )?
                .json(&SignUrlRequest { expires_in }),
            )
            .await?;

        Ok(resolve_signed_url(&self.base_url, &response.signed_url))
    }

    /// Start downloading a signed URL
    ///
    /// Signed URLs carry their own capability token, so no auth headers are sent.
    pub async fn download(&self, signed_url: &str) -> Result<Response, BackendError> {
        debug!("Downloading {}", signed_url);
        self.send(self.http_client.get(signed_url).header(ACCEPT, "application/pdf"))
            .await
    }
}

fn table_path(table: &str) -> String {
    format!("/rest/v1/{}", table)
}

fn object_path(bucket: &str, path: &str) -> String {
    format!("/storage/v1/object/{}/{}", bucket, encode_path(path))
}

/// Equality filter in the table query syntax
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Percent-encode each segment of a slash-separated storage path
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Storage returns signed URLs relative to `/storage/v1`
fn resolve_signed_url(base_url: &str, signed_url: &str) -> String {
    if signed_url.starts_with("http://") || signed_url.starts_with("https://") {
        return signed_url.to_string();
    }
    let signed_url = signed_url.trim_start_matches('/');
    format!("{}/storage/v1/{}", base_url, signed_url)
}
