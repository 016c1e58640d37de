//! In-memory Drive and Sheets doubles that record every call.

use crate::drive::{
    DriveApi, DriveError, FOLDER_MIME_TYPE, FileList, ListQuery, Media, NewFile, RemoteFile,
    SheetProperties, SheetsApi, UpdateValuesResponse, ValueRange,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Get(String),
    List(String),
    Create(String),
    Update(String),
    Download(String),
    Export(String, String),
}

#[derive(Debug, Default)]
struct DriveState {
    files: HashMap<String, RemoteFile>,
    contents: HashMap<String, Vec<u8>>,
    calls: Vec<Call>,
    next_id: u32,
    fail_get: bool,
    fail_list: bool,
    drop_created_ids: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FakeDrive {
    state: Mutex<DriveState>,
}

fn not_found(id: &str) -> DriveError {
    DriveError::Api {
        status: 404,
        message: format!("File not found: {id}."),
    }
}

fn unavailable() -> DriveError {
    DriveError::Api {
        status: 503,
        message: "Backend Error".into(),
    }
}

/// Pull the literal out of `<key>'<literal>'` in a Drive query.
fn quoted_after<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    let start = query.find(key)? + key.len();
    let rest = &query[start..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

impl FakeDrive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, file: RemoteFile) {
        let id = file.id.clone().unwrap();
        self.state.lock().unwrap().files.insert(id, file);
    }

    pub(crate) fn insert_folder(&self, id: &str, name: &str) {
        self.insert(RemoteFile {
            id: Some(id.into()),
            name: Some(name.into()),
            mime_type: Some(FOLDER_MIME_TYPE.into()),
            trashed: Some(false),
            ..Default::default()
        });
    }

    pub(crate) fn insert_text(&self, id: &str, name: &str, parent: &str, content: &str) {
        self.insert(RemoteFile {
            id: Some(id.into()),
            name: Some(name.into()),
            mime_type: Some("text/plain".into()),
            size: Some(content.len().to_string()),
            parents: vec![parent.into()],
            trashed: Some(false),
            ..Default::default()
        });
        self.state
            .lock()
            .unwrap()
            .contents
            .insert(id.into(), content.as_bytes().to_vec());
    }

    pub(crate) fn file(&self, id: &str) -> Option<RemoteFile> {
        self.state.lock().unwrap().files.get(id).cloned()
    }

    pub(crate) fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().contents.get(id).cloned()
    }

    pub(crate) fn folders_named(&self, name: &str) -> Vec<RemoteFile> {
        self.state
            .lock()
            .unwrap()
            .files
            .values()
            .filter(|f| f.is_folder() && f.name.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    pub(crate) fn fail_get(&self, fail: bool) {
        self.state.lock().unwrap().fail_get = fail;
    }

    pub(crate) fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub(crate) fn drop_created_ids(&self, drop: bool) {
        self.state.lock().unwrap().drop_created_ids = drop;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn matches(file: &RemoteFile, query: &str) -> bool {
        if query.contains("trashed=false") || query.contains("trashed = false") {
            if file.is_trashed() {
                return false;
            }
        }
        if query.contains(&format!("mimeType='{FOLDER_MIME_TYPE}'")) && !file.is_folder() {
            return false;
        }
        if let Some(parent) = query.strip_prefix('\'').and_then(|q| q.split('\'').next()) {
            if query.contains("in parents") && !file.parents.iter().any(|p| p == parent) {
                return false;
            }
        }
        if let Some(name) = quoted_after(query, "name='") {
            if file.name.as_deref() != Some(name) {
                return false;
            }
        }
        if let Some(needle) = quoted_after(query, "name contains '") {
            let name = file.name.as_deref().unwrap_or_default();
            if !name.contains(needle) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn get(&self, file_id: &str, _fields: &str) -> Result<RemoteFile, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get(file_id.into()));
        if state.fail_get {
            return Err(unavailable());
        }
        state.files.get(file_id).cloned().ok_or_else(|| not_found(file_id))
    }

    async fn list(&self, query: &ListQuery) -> Result<FileList, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List(query.query.clone()));
        if state.fail_list {
            return Err(unavailable());
        }
        let mut files: Vec<RemoteFile> = state
            .files
            .values()
            .filter(|f| Self::matches(f, &query.query))
            .cloned()
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        let page_size = query.page_size.unwrap_or(100) as usize;
        let next_page_token = (files.len() > page_size).then(|| "next-page".to_string());
        files.truncate(page_size);
        Ok(FileList {
            files,
            next_page_token,
        })
    }

    async fn create(
        &self,
        metadata: &NewFile,
        media: Option<Media>,
        _fields: &str,
    ) -> Result<RemoteFile, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(metadata.name.clone()));
        state.next_id += 1;
        let id = format!("id-{}", state.next_id);
        let size = media.as_ref().map(|m| m.body.len().to_string());
        let file = RemoteFile {
            id: Some(id.clone()),
            name: Some(metadata.name.clone()),
            mime_type: Some(metadata.mime_type.clone()),
            size,
            created_time: Some(chrono::Utc::now()),
            modified_time: Some(chrono::Utc::now()),
            parents: metadata.parents.clone(),
            trashed: Some(false),
        };
        state.files.insert(id.clone(), file.clone());
        if let Some(media) = media {
            state.contents.insert(id, media.body);
        }
        if state.drop_created_ids {
            return Ok(RemoteFile {
                id: None,
                ..file
            });
        }
        Ok(file)
    }

    async fn update(
        &self,
        file_id: &str,
        media: Media,
        _fields: &str,
    ) -> Result<RemoteFile, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(file_id.into()));
        let Some(file) = state.files.get_mut(file_id) else {
            return Err(not_found(file_id));
        };
        file.size = Some(media.body.len().to_string());
        file.modified_time = Some(chrono::Utc::now());
        let file = file.clone();
        state.contents.insert(file_id.into(), media.body);
        Ok(file)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Download(file_id.into()));
        state.contents.get(file_id).cloned().ok_or_else(|| not_found(file_id))
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Export(file_id.into(), mime_type.into()));
        state.contents.get(file_id).cloned().ok_or_else(|| not_found(file_id))
    }
}

#[derive(Debug, Default)]
struct SheetsState {
    sheets: HashMap<String, Vec<SheetProperties>>,
    ranges: HashMap<(String, String), ValueRange>,
    updates: Vec<(String, String, Vec<Vec<serde_json::Value>>)>,
    requested: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeSheets {
    state: Mutex<SheetsState>,
}

impl FakeSheets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_sheet(&self, spreadsheet_id: &str, sheet_id: i64, title: &str) {
        self.state
            .lock()
            .unwrap()
            .sheets
            .entry(spreadsheet_id.into())
            .or_default()
            .push(SheetProperties {
                sheet_id,
                title: title.into(),
            });
    }

    /// Register the values returned for `range`; `reported` is the A1 range echoed back.
    pub(crate) fn set_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        reported: &str,
        values: Vec<Vec<serde_json::Value>>,
    ) {
        self.state.lock().unwrap().ranges.insert(
            (spreadsheet_id.into(), range.into()),
            ValueRange {
                range: reported.into(),
                values,
            },
        );
    }

    pub(crate) fn updates(&self) -> Vec<(String, String, Vec<Vec<serde_json::Value>>)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.state.lock().unwrap().requested.clone()
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn values_get(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<ValueRange, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.requested.push(range.into());
        state
            .ranges
            .get(&(spreadsheet_id.into(), range.into()))
            .cloned()
            .ok_or_else(|| not_found(spreadsheet_id))
    }

    async fn values_batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, DriveError> {
        let mut out = Vec::with_capacity(ranges.len());
        for range in ranges {
            out.push(self.values_get(spreadsheet_id, range).await?);
        }
        Ok(out)
    }

    async fn values_update(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<serde_json::Value>>,
    ) -> Result<UpdateValuesResponse, DriveError> {
        let cells = values.iter().map(|row| row.len() as u64).sum();
        self.state
            .lock()
            .unwrap()
            .updates
            .push((spreadsheet_id.into(), range.into(), values));
        Ok(UpdateValuesResponse {
            updated_range: Some(range.into()),
            updated_cells: Some(cells),
        })
    }

    async fn sheet_properties(
        &self,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, DriveError> {
        self.state
            .lock()
            .unwrap()
            .sheets
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| not_found(spreadsheet_id))
    }
}
