//! Runtime settings for the server.

use std::path::PathBuf;

/// Settings gathered from the command line and environment.
#[derive(Clone)]
pub struct Config {
    /// OAuth bearer token for the Drive and Sheets APIs.
    pub access_token: String,
    /// Name of the managed folder in the user's Drive.
    pub folder_name: String,
    /// Where the managed folder id is persisted between runs.
    pub cache_file: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<redacted>")
            .field("folder_name", &self.folder_name)
            .field("cache_file", &self.cache_file)
            .finish()
    }
}
