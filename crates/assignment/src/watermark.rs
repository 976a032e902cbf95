//! File-backed watermark store

use crate::context::WatermarkStore;
use crate::error::{Error, Result};
use crate::types::Watermark;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stores the watermark as a small JSON document
///
/// ```json
/// { "last_run": "2025-04-15T23:45:31Z", "saved_at": "2025-04-15T23:47:02Z" }
/// ```
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full record, `None` if the file does not exist
    pub fn load(&self) -> Result<Option<Watermark>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No watermark at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };

        let watermark: Watermark =
            serde_json::from_str(&content).map_err(|source| Error::PersistenceFormat {
                path: self.path.clone(),
                source,
            })?;

        log::debug!(
            "Loaded watermark {} from {}",
            watermark.last_run_timestamp.to_rfc3339(),
            self.path.display()
        );
        Ok(Some(watermark))
    }

    /// Remove the watermark file; returns whether one existed
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::persistence(&self.path, e)),
        }
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn read(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load()?.map(|w| w.last_run_timestamp))
    }

    fn write(&self, timestamp: DateTime<Utc>) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|e| Error::persistence(dir, e))?;
        }

        let record = Watermark {
            last_run_timestamp: timestamp,
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record).map_err(|source| {
            Error::PersistenceFormat {
                path: self.path.clone(),
                source,
            }
        })?;

        // Write-then-rename so a crash never leaves a truncated record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| Error::persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::persistence(&self.path, e))?;

        log::info!(
            "Saved watermark {} to {}",
            timestamp.to_rfc3339(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use tempfile::TempDir;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("last_run.json"));
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("state").join("last_run.json"));
        let cutoff = ts("2025-04-15T23:45:31Z");

        store.write(cutoff).unwrap();
        assert_eq!(store.read().unwrap(), Some(cutoff));

        let record = store.load().unwrap().unwrap();
        assert!(record.updated_at >= cutoff);
    }

    #[test]
    fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("last_run.json"));
        store.write(ts("2025-01-01T00:00:00Z")).unwrap();
        store.write(ts("2025-02-01T00:00:00Z")).unwrap();
        assert_eq!(store.read().unwrap(), Some(ts("2025-02-01T00:00:00Z")));
    }

    #[test]
    fn test_reads_legacy_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_run.json");
        fs::write(
            &path,
            r#"{"last_run": "2025-04-15T23:45:31.123456Z", "saved_at": "2025-04-15T23:45:31.200000Z"}"#,
        )
        .unwrap();

        let store = FileWatermarkStore::new(&path);
        let read = store.read().unwrap().unwrap();
        assert_eq!(read.timestamp(), ts("2025-04-15T23:45:31Z").timestamp());
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_run.json");
        fs::write(&path, "not json").unwrap();

        let err = FileWatermarkStore::new(&path).read().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Persistence);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("last_run.json"));
        assert!(!store.clear().unwrap());
        store.write(Utc::now()).unwrap();
        assert!(store.clear().unwrap());
        assert_eq!(store.read().unwrap(), None);
    }
}
