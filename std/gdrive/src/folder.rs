//! Lifecycle of the managed ("sandbox") folder.
//!
//! The folder id is resolved lazily, in order:
//! 1. the in-process cell, set at most once per [`FolderManager`]
//! 2. the [`DiskCache`], trusted only after a live lookup confirms it
//! 3. a remote search by folder name
//! 4. creating the folder
//!
//! Steps 2 and 3 report their outcome as a [`Step`]; a remote failure there is
//! a miss, not an error. Only step 4 can fail the resolution.

use crate::cache::DiskCache;
use crate::drive::{DriveApi, DriveError, FOLDER_MIME_TYPE, ListQuery, NewFile, escape_query};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Folder created in the user's Drive when none exists.
pub const DEFAULT_FOLDER_NAME: &str = "MCP-Files";

/// Errors that end a resolution.
#[derive(Error, Debug)]
pub enum FolderError {
    /// The create call succeeded but returned no id.
    #[error("Failed to create MCP folder")]
    Creation,
    /// The create call itself failed.
    #[error("Failed to create MCP folder: {0}")]
    Remote(#[from] DriveError),
}

/// Why a resolution step produced no id.
#[derive(Debug)]
pub enum Miss {
    /// Nothing cached, or the search returned no folder.
    Empty,
    /// The cached id names something that is not a folder.
    NotAFolder(String),
    /// The cached id names a trashed folder.
    Trashed(String),
    /// The remote call failed.
    Remote(DriveError),
    /// The disk cache could not be read.
    Unreadable(std::io::Error),
}

/// Outcome of one resolution step.
#[derive(Debug)]
pub enum Step {
    Found(String),
    Miss(Miss),
}

/// Where a resolved id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Memory,
    DiskCache,
    Search,
    Created,
}

/// Owns the managed folder id for one server instance.
#[derive(Debug)]
pub struct FolderManager {
    drive: Arc<dyn DriveApi>,
    disk: DiskCache,
    folder_name: String,
    resolved: OnceLock<String>,
}

impl FolderManager {
    pub fn new(drive: Arc<dyn DriveApi>, disk: DiskCache, folder_name: impl Into<String>) -> Self {
        Self {
            drive,
            disk,
            folder_name: folder_name.into(),
            resolved: OnceLock::new(),
        }
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// The managed folder id, discovering or creating it on first use.
    pub async fn resolve_folder_id(&self) -> Result<String, FolderError> {
        self.resolve().await.map(|(id, _)| id)
    }

    /// Like [`resolve_folder_id`](Self::resolve_folder_id), also reporting the source.
    pub async fn resolve(&self) -> Result<(String, Source), FolderError> {
        if let Some(id) = self.resolved.get() {
            return Ok((id.clone(), Source::Memory));
        }

        match self.verify_cached().await {
            Step::Found(id) => return Ok((self.adopt(id), Source::DiskCache)),
            Step::Miss(miss) => debug!(?miss, "cached folder id not usable"),
        }

        match self.search().await {
            Step::Found(id) => {
                let id = self.adopt(id);
                self.persist(&id).await;
                return Ok((id, Source::Search));
            }
            Step::Miss(miss) => debug!(?miss, "no existing folder found"),
        }

        let id = self.create().await?;
        info!(folder = %self.folder_name, id = %id, "created managed folder");
        let id = self.adopt(id);
        self.persist(&id).await;
        Ok((id, Source::Created))
    }

    /// Check the disk-cached id against the remote service.
    pub(crate) async fn verify_cached(&self) -> Step {
        let id = match self.disk.load().await {
            Ok(Some(id)) => id,
            Ok(None) => return Step::Miss(Miss::Empty),
            Err(e) => {
                warn!(path = %self.disk.path().display(), error = %e, "failed to read folder id cache");
                return Step::Miss(Miss::Unreadable(e));
            }
        };
        match self.drive.get(&id, "id,name,mimeType,trashed").await {
            Ok(file) if !file.is_folder() => Step::Miss(Miss::NotAFolder(id)),
            Ok(file) if file.is_trashed() => Step::Miss(Miss::Trashed(id)),
            Ok(_) => Step::Found(id),
            Err(e) => Step::Miss(Miss::Remote(e)),
        }
    }

    /// Look for an existing, untrashed folder with the managed name.
    pub(crate) async fn search(&self) -> Step {
        let query = ListQuery {
            query: format!(
                "name='{}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false",
                escape_query(&self.folder_name)
            ),
            fields: "files(id, name)".into(),
            page_size: Some(1),
            ..Default::default()
        };
        match self.drive.list(&query).await {
            Ok(list) => match list.files.into_iter().find_map(|f| f.id) {
                Some(id) => Step::Found(id),
                None => Step::Miss(Miss::Empty),
            },
            Err(e) => {
                warn!(error = %e, "failed to search for managed folder");
                Step::Miss(Miss::Remote(e))
            }
        }
    }

    async fn create(&self) -> Result<String, FolderError> {
        let metadata = NewFile {
            name: self.folder_name.clone(),
            mime_type: FOLDER_MIME_TYPE.into(),
            parents: Vec::new(),
        };
        let file = self.drive.create(&metadata, None, "id").await?;
        file.id.filter(|id| !id.is_empty()).ok_or(FolderError::Creation)
    }

    /// Set the in-process id; a concurrent winner's value takes precedence.
    fn adopt(&self, id: String) -> String {
        self.resolved.get_or_init(|| id).clone()
    }

    async fn persist(&self, id: &str) {
        if let Err(e) = self.disk.store(id).await {
            warn!(path = %self.disk.path().display(), error = %e, "failed to cache folder id");
        }
    }

    /// Whether `file_id` sits directly inside the managed folder.
    ///
    /// Fails closed: any error while resolving or looking up yields `false`.
    pub async fn validate_membership(&self, file_id: &str) -> bool {
        let folder_id = match self.resolve_folder_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "cannot resolve managed folder for membership check");
                return false;
            }
        };
        match self.drive.get(file_id, "parents").await {
            Ok(file) => file.parents.iter().any(|p| *p == folder_id),
            Err(e) => {
                debug!(file_id, error = %e, "membership lookup failed");
                false
            }
        }
    }
}
