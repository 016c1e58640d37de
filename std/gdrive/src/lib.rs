//! MCP server exposing Google Drive and Sheets tools to an agent.
//!
//! Every file the agent creates lands in a single managed folder, and content
//! writes are only accepted for files inside that folder. Implements 7 tools:
//! search, read, create, write and list for Drive, read and cell update for
//! Sheets.

use crate::drive::{DriveApi, SheetsApi};
use crate::folder::FolderManager;
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::Arc;
pub mod cache;
pub mod config;
pub mod drive;
pub mod error;
pub mod folder;
mod sheet;
pub mod tools;
pub mod validate;

pub use config::Config;

/// MCP Drive server confined to one managed folder.
#[derive(Debug, Clone)]
pub struct GDriveServer {
    pub(crate) drive: Arc<dyn DriveApi>,
    pub(crate) sheets: Arc<dyn SheetsApi>,
    pub(crate) folders: Arc<FolderManager>,
    pub(crate) tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for GDriveServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-gdrive".into(),
                title: Some("Google Drive MCP Server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(format!(
                "Google Drive and Sheets tools. New files are created in the '{}' folder, \
                 and only files in that folder can be overwritten.",
                self.folders.folder_name()
            )),
        }
    }
}
