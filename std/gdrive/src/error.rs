use crate::drive::DriveError;
use crate::folder::FolderError;
use thiserror::Error;

/// Failures a tool handler reports back to the caller.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("File content too large ({0}MB). Maximum allowed size is 100MB.")]
    SizeExceeded(f64),

    #[error(
        "File {0} is not in the MCP folder or does not exist. Only files in the MCP folder can be modified."
    )]
    MembershipDenied(String),

    #[error("Sheet ID {0} not found")]
    SheetNotFound(i64),

    #[error(transparent)]
    Folder(#[from] FolderError),

    #[error(transparent)]
    Drive(#[from] DriveError),
}

impl ToolError {
    /// Render the envelope text, prefixing remote failures with `context`.
    pub fn report(&self, context: &str) -> String {
        match self {
            ToolError::SizeExceeded(_) | ToolError::MembershipDenied(_) => format!("Error: {self}"),
            _ => format!("{context}: {self}"),
        }
    }
}
