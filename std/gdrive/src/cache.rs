//! Durable copy of the managed folder id.
//!
//! A plain text file holding nothing but the id. It is a latency shortcut only:
//! deleting it at any time is safe, the folder is re-discovered remotely.

use std::io;
use std::path::{Path, PathBuf};

/// File name used under the user's home directory.
pub const DEFAULT_CACHE_FILE: &str = ".mcp-gdrive-folder-id";

/// Single-value on-disk cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    path: PathBuf,
}

impl DiskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.mcp-gdrive-folder-id`, or the temp dir when no home is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(DEFAULT_CACHE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached id. A missing or blank file is `Ok(None)`.
    pub async fn load(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let id = raw.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Overwrite the cached id. Last writer wins.
    pub async fn store(&self, id: &str) -> io::Result<()> {
        tokio::fs::write(&self.path, id).await
    }
}

impl Default for DiskCache {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::DiskCache;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("folder-id"));
        assert_eq!(cache.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stores_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder-id");
        std::fs::write(&path, "  abc123\n").unwrap();
        let cache = DiskCache::new(&path);
        assert_eq!(cache.load().await.unwrap().as_deref(), Some("abc123"));

        cache.store("def456").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "def456");
    }

    #[tokio::test]
    async fn blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder-id");
        std::fs::write(&path, " \n").unwrap();
        assert_eq!(DiskCache::new(&path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unwritable_location_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("missing").join("folder-id"));
        assert!(cache.store("abc").await.is_err());
    }
}
