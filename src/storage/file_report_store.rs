use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::fs;

use crate::error_handling::types::StoreError;
use crate::storage::report_store::ReportStore;

/// Filesystem-backed report store.
///
/// Artifacts land under `<base>/reports/<key>`; writes go through a
/// temporary file and an atomic rename so a crashed write never leaves a
/// half-written PDF behind.
pub struct FileReportStore {
    reports_dir: PathBuf,
}

impl FileReportStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StoreError> {
        let reports_dir = base_path.as_ref().join("reports");
        std::fs::create_dir_all(&reports_dir).map_err(|e| {
            error!(
                "Failed to create reports dir {}: {}",
                reports_dir.display(),
                e
            );
            StoreError::Io(e)
        })?;
        info!("FileReportStore initialized at {}", reports_dir.display());
        Ok(Self { reports_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.reports_dir.join(key)
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = self.path_for(&format!("{}.tmp", key));
        fs::write(&tmp, bytes).await.map_err(|e| {
            error!("Failed to write {}: {}", tmp.display(), e);
            StoreError::Io(e)
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            error!("Failed to rename {} to {}: {}", tmp.display(), path.display(), e);
            StoreError::Io(e)
        })?;
        debug!("Stored {} byte(s) at {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("Read {} byte(s) from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(StoreError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::report_store::artifact_key;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path()).unwrap();
        let key = artifact_key(Uuid::new_v4());
        store.put(&key, b"%PDF-1.5 fake").await.unwrap();
        let got = store.get(&key).await.unwrap();
        assert_eq!(got, b"%PDF-1.5 fake");
    }

    #[tokio::test]
    async fn test_put_overwrites_deterministically() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path()).unwrap();
        let key = artifact_key(Uuid::new_v4());
        store.put(&key, b"first").await.unwrap();
        store.put(&key, b"second").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("nope.pdf").await,
            Err(StoreError::NotFound)
        ));
    }
}
