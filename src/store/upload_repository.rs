use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, error};
use uuid::Uuid;

use crate::config::MAX_UPLOAD_BYTES;
use crate::errors::AppError;

/// Stores uploaded documents on disk, one file per upload, named by its id.
#[derive(Debug, Clone)]
pub struct UploadRepository {
    dir: PathBuf,
}

impl UploadRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn init(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            error!("Failed to create upload dir {}: {e}", self.dir.display());
            AppError::Storage(e)
        })
    }

    /// Resolves an id to its path. Anything that is not a UUID cannot name a
    /// stored upload, which also keeps ids from escaping the upload dir.
    fn path_for(&self, file_id: &str) -> Result<PathBuf, AppError> {
        let id = Uuid::parse_str(file_id).map_err(|_| AppError::FileNotFound {
            file_id: file_id.to_string(),
        })?;
        Ok(self.dir.join(id.to_string()))
    }

    pub async fn save(&self, bytes: &[u8]) -> Result<String, AppError> {
        let file_id = Uuid::new_v4().to_string();
        let path = self.dir.join(&file_id);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("Failed to write upload {file_id}: {e}");
            AppError::Storage(e)
        })?;
        debug!("Stored upload {file_id} ({} bytes)", bytes.len());
        Ok(file_id)
    }

    /// Loads a stored upload, rejecting files above the upload limit.
    pub async fn load(&self, file_id: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(file_id)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::FileNotFound { file_id: file_id.to_string() });
            }
            Err(e) => return Err(AppError::Storage(e)),
        };

        let max = MAX_UPLOAD_BYTES as u64;
        if metadata.len() > max {
            return Err(AppError::FileTooLarge { size: metadata.len(), max });
        }

        tokio::fs::read(&path).await.map_err(|e| AppError::FileRead { message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo_in(dir: &tempfile::TempDir) -> UploadRepository {
        let repo = UploadRepository::new(dir.path().join("uploads"));
        repo.init().await.unwrap_or_else(|e| panic!("init failed: {e}"));
        repo
    }

    #[tokio::test]
    async fn saved_upload_can_be_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir).await;

        let id = repo.save(b"quarterly report").await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(repo.load(&id).await.unwrap(), b"quarterly report");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir).await;

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(repo.load(&missing).await, Err(AppError::FileNotFound { .. })));
        assert!(matches!(
            repo.load("../../etc/passwd").await,
            Err(AppError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_in(&dir).await;

        let id = repo.save(&vec![b'a'; MAX_UPLOAD_BYTES + 1]).await.unwrap();
        assert!(matches!(repo.load(&id).await, Err(AppError::FileTooLarge { .. })));
    }
}
