//! The worker's persisted identity (`{"worker_id": "..."}`).

use std::path::{Path, PathBuf};

use cfa_core::types::UNKNOWN_WORKER_ID;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ClientFile {
    worker_id: String,
}

/// Local file remembering the id the dispatch service issued.
#[derive(Debug, Clone)]
pub struct IdentityFile {
    path: PathBuf,
}

impl IdentityFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored worker id, or the sentinel `N/A` when the file is
    /// missing, unreadable or malformed.
    pub async fn load(&self) -> String {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Client file unreadable");
                } else {
                    tracing::info!(path = %self.path.display(), "No client file, requesting a new worker id");
                }
                return UNKNOWN_WORKER_ID.to_string();
            }
        };

        match serde_json::from_slice::<ClientFile>(&raw) {
            Ok(file) if !file.worker_id.is_empty() => file.worker_id,
            Ok(_) => UNKNOWN_WORKER_ID.to_string(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Client file is malformed, requesting a new worker id",
                );
                UNKNOWN_WORKER_ID.to_string()
            }
        }
    }

    /// Persist `worker_id`, replacing any previous content.
    pub async fn save(&self, worker_id: &str) -> std::io::Result<()> {
        let body = serde_json::to_vec(&ClientFile {
            worker_id: worker_id.to_string(),
        })?;
        tokio::fs::write(&self.path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityFile::new(dir.path().join("client.json"));
        assert_eq!(identity.load().await, "N/A");
    }

    #[tokio::test]
    async fn malformed_file_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, b"[1, 2").unwrap();
        assert_eq!(IdentityFile::new(&path).load().await, "N/A");
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityFile::new(dir.path().join("client.json"));
        identity.save("worker_9").await.unwrap();
        assert_eq!(identity.load().await, "worker_9");

        let raw = std::fs::read_to_string(identity.path()).unwrap();
        assert_eq!(raw, r#"{"worker_id":"worker_9"}"#);
    }
}
