//! Durable storage for the plugin's authentication token.

use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored token, or `None` when the file is missing or blank.
    pub async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    warn!(path = %self.path.display(), "Token file is empty.");
                    Ok(None)
                } else {
                    info!("Loaded authentication token.");
                    Ok(Some(token.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "No authentication token found.");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persists `token`, replacing any previous one.
    ///
    /// The token is written to a sibling temporary file and renamed into
    /// place, so readers see either the old or the new token in full.
    pub async fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, token).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), "Authentication token stored.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_creates_directories_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("secrets/nested/token.txt"));
        store.store("abc123").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc123"));

        // A second store over an existing directory overwrites the token.
        store.store("def456").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("def456"));
        assert!(!dir.path().join("secrets/nested/token.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_blank_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(TokenStore::new(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "tok\n").unwrap();
        assert_eq!(
            TokenStore::new(path).load().await.unwrap().as_deref(),
            Some("tok")
        );
    }
}
