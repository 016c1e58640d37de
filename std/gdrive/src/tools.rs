//! Tool implementations for the Drive MCP server.

use crate::GDriveServer;
use crate::cache::DiskCache;
use crate::config::Config;
use crate::drive::{
    DriveApi, GOOGLE_APPS_PREFIX, GoogleClient, ListQuery, Media, NewFile, RemoteFile, SheetsApi,
    escape_query,
};
use crate::error::ToolError;
use crate::folder::FolderManager;
use crate::sheet;
use crate::validate::{bytes_to_mb, validate_content_size};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use rmcp::{
    handler::server::wrapper::Parameters,
    schemars::{self, JsonSchema},
    tool, tool_router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_MIME_TYPE: &str = "text/plain";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
/// Range read when neither ranges nor a sheet id are given.
const DEFAULT_SHEET_RANGE: &str = "A:ZZ";

/// Parameters for searching Drive.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Text to look for in file names. Empty lists every file.
    pub query: String,
    /// Token for the next page of results.
    pub page_token: Option<String>,
    /// Number of results per page (max 100).
    pub page_size: Option<u32>,
}

/// Parameters for reading a file.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileParams {
    /// ID of the file to read.
    pub file_id: String,
}

/// Parameters for updating one spreadsheet cell.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellParams {
    /// ID of the spreadsheet (must be in the MCP folder).
    pub file_id: String,
    /// Cell in A1 notation, e.g. "Sheet1!A1".
    pub range: String,
    /// New cell value.
    pub value: String,
}

/// Parameters for reading spreadsheet values.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadSheetParams {
    /// ID of the spreadsheet.
    pub spreadsheet_id: String,
    /// A1 ranges to read, e.g. ["Sheet1!A1:B10"].
    pub ranges: Option<Vec<String>>,
    /// Numeric ID of a single sheet to read whole.
    pub sheet_id: Option<i64>,
}

/// Parameters for creating a file in the MCP folder.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileParams {
    /// Name of the file to create.
    pub name: String,
    /// Content to write to the file.
    pub content: String,
    /// MIME type of the file (defaults to text/plain).
    pub mime_type: Option<String>,
}

/// Parameters for overwriting a file in the MCP folder.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileParams {
    /// ID of the file to write to (must be in the MCP folder).
    pub file_id: String,
    /// Content that replaces the existing content.
    pub content: String,
}

/// Parameters for listing the MCP folder.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListMcpFilesParams {
    /// Token for the next page of results.
    pub page_token: Option<String>,
    /// Number of results per page (max 100).
    pub page_size: Option<u32>,
}

#[tool_router]
impl GDriveServer {
    /// Create a server over explicit client and folder handles.
    pub fn new(
        drive: Arc<dyn DriveApi>,
        sheets: Arc<dyn SheetsApi>,
        folders: Arc<FolderManager>,
    ) -> Self {
        Self {
            drive,
            sheets,
            folders,
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server talking to the Google APIs.
    pub fn from_config(config: Config) -> Self {
        let client = Arc::new(GoogleClient::new(config.access_token));
        let folders = FolderManager::new(
            client.clone(),
            DiskCache::new(config.cache_file),
            config.folder_name,
        );
        Self::new(client.clone(), client, Arc::new(folders))
    }

    /// Search Drive by file name.
    #[tool(description = "Search for files in Google Drive by name")]
    async fn gdrive_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<String, String> {
        self.search(params)
            .await
            .map_err(|e| e.report("Error searching files"))
    }

    /// Read a file, exporting Google-native documents to text.
    #[tool(
        description = "Read the contents of a file from Google Drive. Google Docs, Sheets and Slides are exported to text"
    )]
    async fn gdrive_read_file(
        &self,
        Parameters(params): Parameters<ReadFileParams>,
    ) -> Result<String, String> {
        self.read_file(&params.file_id)
            .await
            .map_err(|e| e.report("Error reading file"))
    }

    /// Update a single cell of a spreadsheet in the MCP folder.
    #[tool(description = "Update a cell value in a Google Spreadsheet located in the MCP folder")]
    async fn gsheets_update_cell(
        &self,
        Parameters(params): Parameters<UpdateCellParams>,
    ) -> Result<String, String> {
        self.update_cell(params)
            .await
            .map_err(|e| e.report("Error updating cell"))
    }

    /// Read values from a spreadsheet.
    #[tool(
        description = "Read data from a Google Spreadsheet with flexible options for ranges and formatting"
    )]
    async fn gsheets_read(
        &self,
        Parameters(params): Parameters<ReadSheetParams>,
    ) -> Result<String, String> {
        self.read_sheet(params)
            .await
            .map_err(|e| e.report("Error reading spreadsheet"))
    }

    /// Create a file in the MCP folder.
    #[tool(description = "Create a new file in the MCP dedicated folder with content under 100MB")]
    async fn gdrive_create_file(
        &self,
        Parameters(params): Parameters<CreateFileParams>,
    ) -> Result<String, String> {
        self.create_file(params)
            .await
            .map_err(|e| e.report("Error creating file"))
    }

    /// Replace the content of a file in the MCP folder.
    #[tool(
        description = "Write content to an existing file in the MCP folder (replaces existing content)"
    )]
    async fn gdrive_write_file(
        &self,
        Parameters(params): Parameters<WriteFileParams>,
    ) -> Result<String, String> {
        self.write_file(params)
            .await
            .map_err(|e| e.report("Error writing to file"))
    }

    /// List files in the MCP folder, newest first.
    #[tool(description = "List files in the MCP dedicated folder")]
    async fn gdrive_list_mcp_files(
        &self,
        Parameters(params): Parameters<ListMcpFilesParams>,
    ) -> Result<String, String> {
        self.list_mcp_files(params)
            .await
            .map_err(|e| e.report("Error listing MCP files"))
    }
}

impl GDriveServer {
    async fn search(&self, params: SearchParams) -> Result<String, ToolError> {
        let query = build_search_query(&params.query);
        let list = self
            .drive
            .list(&ListQuery {
                query,
                fields: "nextPageToken, files(id, name, mimeType, modifiedTime, size)".into(),
                page_size: Some(page_size(params.page_size)),
                page_token: params.page_token,
                order_by: Some("modifiedTime desc".into()),
            })
            .await?;

        let rows = list
            .files
            .iter()
            .map(|f| format!("{} {} ({})", text(&f.id), text(&f.name), text(&f.mime_type)))
            .collect::<Vec<_>>()
            .join("\n");
        let mut out = format!("Found {} files:\n{rows}", list.files.len());
        push_page_hint(&mut out, list.next_page_token.as_deref());
        Ok(out)
    }

    async fn read_file(&self, file_id: &str) -> Result<String, ToolError> {
        let file = self.drive.get(file_id, "name,mimeType").await?;
        let mime_type = file.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE);

        let content = if mime_type.starts_with(GOOGLE_APPS_PREFIX) {
            let export_as = export_mime_type(mime_type);
            let bytes = self.drive.export(file_id, export_as).await?;
            decode_content(export_as, bytes)
        } else {
            let bytes = self.drive.download(file_id).await?;
            decode_content(mime_type, bytes)
        };
        Ok(format!("Contents of {}:\n\n{content}", text(&file.name)))
    }

    async fn update_cell(&self, params: UpdateCellParams) -> Result<String, ToolError> {
        self.ensure_managed(&params.file_id).await?;
        self.sheets
            .values_update(
                &params.file_id,
                &params.range,
                vec![vec![serde_json::Value::String(params.value.clone())]],
            )
            .await?;
        Ok(format!(
            "Updated cell {} to value: {}",
            params.range, params.value
        ))
    }

    async fn read_sheet(&self, params: ReadSheetParams) -> Result<String, ToolError> {
        let ranges = match (params.ranges, params.sheet_id) {
            (Some(ranges), _) if !ranges.is_empty() => {
                self.sheets
                    .values_batch_get(&params.spreadsheet_id, &ranges)
                    .await?
            }
            (_, Some(sheet_id)) => {
                let sheets = self.sheets.sheet_properties(&params.spreadsheet_id).await?;
                let sheet = sheets
                    .into_iter()
                    .find(|s| s.sheet_id == sheet_id)
                    .ok_or(ToolError::SheetNotFound(sheet_id))?;
                let range = sheet::whole_sheet_range(&sheet.title);
                vec![
                    self.sheets
                        .values_get(&params.spreadsheet_id, &range)
                        .await?,
                ]
            }
            _ => vec![
                self.sheets
                    .values_get(&params.spreadsheet_id, DEFAULT_SHEET_RANGE)
                    .await?,
            ],
        };
        serde_json::to_string_pretty(&sheet::annotate(ranges))
            .map_err(|e| ToolError::Drive(e.into()))
    }

    async fn create_file(&self, params: CreateFileParams) -> Result<String, ToolError> {
        let size = validate_content_size(&params.content);
        if !size.valid {
            return Err(ToolError::SizeExceeded(size.size_in_mb));
        }

        let folder_id = self.folders.resolve_folder_id().await?;
        let mime_type = params
            .mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.into());
        let metadata = NewFile {
            name: params.name,
            mime_type: mime_type.clone(),
            parents: vec![folder_id],
        };
        let media = Media {
            mime_type,
            body: params.content.into_bytes(),
        };
        let file = self
            .drive
            .create(&metadata, Some(media), "id, name, size, mimeType, createdTime")
            .await?;

        Ok(format!(
            "File created successfully in MCP folder:\n\
             File ID: {}\n\
             Name: {}\n\
             Size: {}MB\n\
             MIME Type: {}\n\
             Created: {}",
            text(&file.id),
            text(&file.name),
            reported_mb(&file, size.size_in_mb),
            text(&file.mime_type),
            timestamp(file.created_time),
        ))
    }

    async fn write_file(&self, params: WriteFileParams) -> Result<String, ToolError> {
        let size = validate_content_size(&params.content);
        if !size.valid {
            return Err(ToolError::SizeExceeded(size.size_in_mb));
        }
        self.ensure_managed(&params.file_id).await?;

        let current = self.drive.get(&params.file_id, "name, mimeType").await?;
        let media = Media {
            mime_type: current
                .mime_type
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.into()),
            body: params.content.into_bytes(),
        };
        let file = self
            .drive
            .update(
                &params.file_id,
                media,
                "id, name, size, mimeType, modifiedTime",
            )
            .await?;

        Ok(format!(
            "File updated successfully:\n\
             File ID: {}\n\
             Name: {}\n\
             Size: {}MB\n\
             MIME Type: {}\n\
             Modified: {}",
            text(&file.id),
            text(&file.name),
            reported_mb(&file, size.size_in_mb),
            text(&file.mime_type),
            timestamp(file.modified_time),
        ))
    }

    async fn list_mcp_files(&self, params: ListMcpFilesParams) -> Result<String, ToolError> {
        let folder_id = self.folders.resolve_folder_id().await?;
        let list = self
            .drive
            .list(&ListQuery {
                query: format!("'{}' in parents and trashed=false", escape_query(&folder_id)),
                fields: "nextPageToken, files(id, name, mimeType, size, createdTime, modifiedTime)"
                    .into(),
                page_size: Some(page_size(params.page_size)),
                page_token: params.page_token,
                order_by: Some("modifiedTime desc".into()),
            })
            .await?;

        if list.files.is_empty() {
            return Ok("No files found in MCP folder.".into());
        }

        let rows = list
            .files
            .iter()
            .map(|f| {
                let size = f
                    .size_bytes()
                    .map(|b| bytes_to_mb(b).to_string())
                    .unwrap_or_else(|| "Unknown".into());
                format!(
                    "{} | {} | {} | {size}MB | Modified: {}",
                    text(&f.id),
                    text(&f.name),
                    text(&f.mime_type),
                    timestamp(f.modified_time),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let mut out = format!(
            "Found {} files in MCP folder:\n\nID | Name | MIME Type | Size | Modified\n{}\n{rows}",
            list.files.len(),
            "-".repeat(80),
        );
        push_page_hint(&mut out, list.next_page_token.as_deref());
        Ok(out)
    }

    /// Refuse to touch files outside the managed folder.
    async fn ensure_managed(&self, file_id: &str) -> Result<(), ToolError> {
        if self.folders.validate_membership(file_id).await {
            return Ok(());
        }
        warn!(file_id, "refusing to modify file outside the managed folder");
        Err(ToolError::MembershipDenied(file_id.into()))
    }
}

/// Drive query for a name search. Mentioning "sheet" also matches spreadsheets.
fn build_search_query(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return "trashed = false".into();
    }
    let mut conditions = vec![format!("name contains '{}'", escape_query(input))];
    if input.to_lowercase().contains("sheet") {
        conditions.push(format!("mimeType = '{SPREADSHEET_MIME_TYPE}'"));
    }
    format!("({}) and trashed = false", conditions.join(" or "))
}

fn page_size(requested: Option<u32>) -> u32 {
    requested
        .filter(|&n| n != 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

fn push_page_hint(out: &mut String, token: Option<&str>) {
    if let Some(token) = token {
        out.push_str(&format!(
            "\n\nMore results available. Use pageToken: {token}"
        ));
    }
}

/// Target format when exporting a Google-native document.
fn export_mime_type(mime_type: &str) -> &'static str {
    match mime_type {
        "application/vnd.google-apps.document" => "text/markdown",
        "application/vnd.google-apps.spreadsheet" => "text/csv",
        "application/vnd.google-apps.presentation" => "text/plain",
        "application/vnd.google-apps.drawing" => "image/png",
        _ => "text/plain",
    }
}

/// Text types verbatim, anything else base64.
fn decode_content(mime_type: &str, bytes: Vec<u8>) -> String {
    if mime_type.starts_with("text/") || mime_type == "application/json" {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        BASE64_STANDARD.encode(bytes)
    }
}

fn reported_mb(file: &RemoteFile, fallback: f64) -> f64 {
    file.size_bytes().map(bytes_to_mb).unwrap_or(fallback)
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("unknown")
}

fn timestamp(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "unknown".into())
}
