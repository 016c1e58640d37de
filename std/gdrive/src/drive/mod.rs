//! Remote directory client for Google Drive and Google Sheets.
//!
//! The server only ever talks to the remote service through [`DriveApi`] and
//! [`SheetsApi`]. [`GoogleClient`] is the HTTP implementation; tests swap in
//! in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod google;
#[cfg(test)]
pub(crate) mod fake;

pub use google::GoogleClient;

/// MIME type Drive assigns to folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by Google-native document types (Docs, Sheets, Slides, ...).
pub const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps";

/// Errors returned by the remote directory client.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A spreadsheet range could not be placed in a request URL.
    #[error("invalid request url: {0}")]
    Url(String),
}

/// File metadata as returned by the Drive v3 API.
///
/// Every field is optional because callers choose which fields to request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Byte size, encoded by Drive as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
}

impl RemoteFile {
    /// Parsed byte size, if the service reported one.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed.unwrap_or(false)
    }
}

/// One page of a `files.list` call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Arguments for `files.list`.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Drive query language expression (`q`).
    pub query: String,
    pub fields: String,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub order_by: Option<String>,
}

/// Metadata for a file or folder being created.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Content uploaded alongside a create or update.
#[derive(Clone)]
pub struct Media {
    pub mime_type: String,
    pub body: Vec<u8>,
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .field("len", &self.body.len())
            .finish()
    }
}

/// Drive v3 file operations used by the server.
#[async_trait]
pub trait DriveApi: fmt::Debug + Send + Sync {
    /// `files.get` returning the requested metadata fields.
    async fn get(&self, file_id: &str, fields: &str) -> Result<RemoteFile, DriveError>;

    /// `files.list`.
    async fn list(&self, query: &ListQuery) -> Result<FileList, DriveError>;

    /// `files.create`, with an optional media upload.
    async fn create(
        &self,
        metadata: &NewFile,
        media: Option<Media>,
        fields: &str,
    ) -> Result<RemoteFile, DriveError>;

    /// `files.update` replacing the file content.
    async fn update(&self, file_id: &str, media: Media, fields: &str)
    -> Result<RemoteFile, DriveError>;

    /// Raw content of a non-native file (`alt=media`).
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;

    /// Google-native file converted to `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError>;
}

/// A block of cell values (`ValueRange` in Sheets v4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// Identity of one sheet (tab) inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

/// Result of `values.update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_cells: Option<u64>,
}

/// Sheets v4 value operations used by the server.
#[async_trait]
pub trait SheetsApi: fmt::Debug + Send + Sync {
    async fn values_get(&self, spreadsheet_id: &str, range: &str)
    -> Result<ValueRange, DriveError>;

    async fn values_batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, DriveError>;

    /// Writes `values` at `range` with `valueInputOption=RAW`.
    async fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<serde_json::Value>>,
    ) -> Result<UpdateValuesResponse, DriveError>;

    async fn sheet_properties(&self, spreadsheet_id: &str)
    -> Result<Vec<SheetProperties>, DriveError>;
}

/// Quote a literal for embedding in a Drive query expression.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
