//! HTTP implementation of the Drive v3 and Sheets v4 surfaces.

use crate::drive::{
    DriveApi, DriveError, FileList, ListQuery, Media, NewFile, RemoteFile, SheetProperties,
    SheetsApi, UpdateValuesResponse, ValueRange,
};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, Url,
    header::CONTENT_TYPE,
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3/";
const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/";

const BOUNDARY_PREFIX: &str = "mcp_gdrive_part_boundary";

/// Google API client authenticated with a bearer access token.
#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    token: String,
    drive_base: Url,
    upload_base: Url,
    sheets_base: Url,
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("drive_base", &self.drive_base.as_str())
            .field("sheets_base", &self.sheets_base.as_str())
            .finish_non_exhaustive()
    }
}

/// Error body shape shared by Google APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

impl GoogleClient {
    /// Create a client for the public Google endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_http(Client::new(), token)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_http(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            drive_base: parse_base(DRIVE_BASE),
            upload_base: parse_base(UPLOAD_BASE),
            sheets_base: parse_base(SHEETS_BASE),
        }
    }

    fn files_url(&self, base: &Url, segments: &[&str]) -> Result<Url, DriveError> {
        let mut url = base.join("files").map_err(|e| DriveError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DriveError::Url(base.to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<Url, DriveError> {
        let mut url = self
            .sheets_base
            .join("spreadsheets")
            .map_err(|e| DriveError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DriveError::Url(self.sheets_base.to_string()))?
            .push(spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DriveError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(DriveError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DriveError> {
        let bytes = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>, DriveError> {
        Ok(self.send(request).await?.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DriveApi for GoogleClient {
    async fn get(&self, file_id: &str, fields: &str) -> Result<RemoteFile, DriveError> {
        let url = self.files_url(&self.drive_base, &[file_id])?;
        debug!(file_id, fields, "drive files.get");
        self.send_json(self.http.get(url).query(&[("fields", fields)]))
            .await
    }

    async fn list(&self, query: &ListQuery) -> Result<FileList, DriveError> {
        let url = self.files_url(&self.drive_base, &[])?;
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.query.clone()),
            ("fields", query.fields.clone()),
        ];
        if let Some(size) = query.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }
        if let Some(order) = &query.order_by {
            params.push(("orderBy", order.clone()));
        }
        debug!(q = %query.query, "drive files.list");
        self.send_json(self.http.get(url).query(&params)).await
    }

    async fn create(
        &self,
        metadata: &NewFile,
        media: Option<Media>,
        fields: &str,
    ) -> Result<RemoteFile, DriveError> {
        debug!(name = %metadata.name, mime_type = %metadata.mime_type, "drive files.create");
        let Some(media) = media else {
            let url = self.files_url(&self.drive_base, &[])?;
            let request = self
                .http
                .post(url)
                .query(&[("fields", fields)])
                .json(metadata);
            return self.send_json(request).await;
        };

        let url = self.files_url(&self.upload_base, &[])?;
        let (boundary, body) = multipart_related(&serde_json::to_vec(metadata)?, &media);
        let request = self
            .http
            .post(url)
            .query(&[("uploadType", "multipart"), ("fields", fields)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        self.send_json(request).await
    }

    async fn update(
        &self,
        file_id: &str,
        media: Media,
        fields: &str,
    ) -> Result<RemoteFile, DriveError> {
        let url = self.files_url(&self.upload_base, &[file_id])?;
        debug!(file_id, bytes = media.body.len(), "drive files.update");
        let request = self
            .http
            .patch(url)
            .query(&[("uploadType", "media"), ("fields", fields)])
            .header(CONTENT_TYPE, media.mime_type)
            .body(media.body);
        self.send_json(request).await
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let url = self.files_url(&self.drive_base, &[file_id])?;
        self.send_bytes(self.http.get(url).query(&[("alt", "media")]))
            .await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        let url = self.files_url(&self.drive_base, &[file_id, "export"])?;
        self.send_bytes(self.http.get(url).query(&[("mimeType", mime_type)]))
            .await
    }
}

#[async_trait]
impl SheetsApi for GoogleClient {
    async fn values_get(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange, DriveError> {
        let url = self.spreadsheet_url(spreadsheet_id, &["values", range])?;
        self.send_json(self.http.get(url)).await
    }

    async fn values_batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, DriveError> {
        let url = self.spreadsheet_url(spreadsheet_id, &["values:batchGet"])?;
        let params: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        let response: BatchGetResponse = self.send_json(self.http.get(url).query(&params)).await?;
        Ok(response.value_ranges)
    }

    async fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<serde_json::Value>>,
    ) -> Result<UpdateValuesResponse, DriveError> {
        let url = self.spreadsheet_url(spreadsheet_id, &["values", range])?;
        let body = ValueRange {
            range: range.to_string(),
            values,
        };
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send_json(request).await
    }

    async fn sheet_properties(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, DriveError> {
        let url = self.spreadsheet_url(spreadsheet_id, &[])?;
        let meta: SpreadsheetMeta = self
            .send_json(self.http.get(url).query(&[("fields", "sheets.properties")]))
            .await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }
}

/// Base URLs are compile-time constants with a trailing slash.
fn parse_base(base: &'static str) -> Url {
    match Url::parse(base) {
        Ok(url) => url,
        Err(e) => unreachable!("invalid built-in base url {base}: {e}"),
    }
}

/// First boundary candidate that occurs in none of `parts`.
fn pick_boundary(parts: &[&[u8]]) -> String {
    let mut boundary = BOUNDARY_PREFIX.to_string();
    let mut attempt = 0u32;
    while parts.iter().any(|part| contains(part, boundary.as_bytes())) {
        attempt += 1;
        boundary = format!("{BOUNDARY_PREFIX}_{attempt}");
    }
    boundary
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Build a `multipart/related` body: JSON metadata part followed by the media part.
///
/// Returns the boundary alongside the body; the caller sends it in `Content-Type`.
fn multipart_related(metadata: &[u8], media: &Media) -> (String, Vec<u8>) {
    let boundary = pick_boundary(&[metadata, &media.body]);
    let mut body = Vec::with_capacity(metadata.len() + media.body.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.mime_type).as_bytes());
    body.extend_from_slice(&media.body);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (boundary, body)
}
