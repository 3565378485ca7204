//! JSON file storage - the File Store
//!
//! All submissions live in a single JSON array. Each append loads the array,
//! pushes the record and writes the whole document back through a temporary
//! file and a rename, so a crash mid-write leaves the previous array intact.
//! The read-modify-write runs under an exclusive lock so concurrent appends
//! from the same process cannot overwrite each other.
//!
//! A file that no longer parses is moved aside to `<name>.corrupt-<timestamp>`
//! before a new array is started. If it cannot be moved the append fails and
//! the file is left untouched.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::submission::SubmissionRecord;
use crate::{Error, Result};

enum Contents {
    Entries(Vec<Value>),
    Corrupt(serde_json::Error),
}

#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and return the collection's new length
    pub async fn append(&self, record: &SubmissionRecord) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut submissions = match self.read_unlocked().await? {
            Contents::Entries(values) => values,
            Contents::Corrupt(e) => {
                let aside = self.quarantine().await?;
                tracing::warn!(
                    "Fallback file {} is not a JSON array ({}), moved to {}",
                    self.path.display(),
                    e,
                    aside.display()
                );
                Vec::new()
            }
        };
        submissions.push(serde_json::to_value(record)?);

        let contents = serde_json::to_string_pretty(&submissions)?;
        self.replace_contents(contents).await?;

        Ok(submissions.len())
    }

    /// Read every stored submission. A missing file is an empty collection;
    /// a file that does not parse is an error.
    pub async fn load(&self) -> Result<Vec<SubmissionRecord>> {
        let _guard = self.write_lock.lock().await;
        let values = match self.read_unlocked().await? {
            Contents::Entries(values) => values,
            Contents::Corrupt(e) => return Err(Error::Json(e)),
        };
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            records.push(serde_json::from_value(value)?);
        }
        Ok(records)
    }

    // Entries stay raw JSON so one malformed historical entry never blocks
    // new appends.
    async fn read_unlocked(&self) -> Result<Contents> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) if data.trim().is_empty() => Ok(Contents::Entries(Vec::new())),
            Ok(data) => match serde_json::from_str::<Vec<Value>>(&data) {
                Ok(values) => Ok(Contents::Entries(values)),
                Err(e) => Ok(Contents::Corrupt(e)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Contents::Entries(Vec::new())),
            Err(e) => Err(e.into()),
        }
    }

    async fn quarantine(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let aside = self.sibling(&format!(".corrupt-{}", stamp));
        tokio::fs::rename(&self.path, &aside).await?;
        Ok(aside)
    }

    async fn replace_contents(&self, contents: String) -> Result<()> {
        let tmp = self.sibling(".tmp");
        tokio::fs::write(&tmp, contents).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("form-submissions.json"));
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{FormType, RawSubmission, RequestContext};
    use serde_json::json;

    fn record(email: &str) -> SubmissionRecord {
        let raw = RawSubmission::from_json(&json!({"form_type": "popup", "email": email}));
        SubmissionRecord::from_raw(raw, RequestContext::default()).unwrap()
    }

    #[tokio::test]
    async fn test_append_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("form-submissions.json"));

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.append(&record("a@x.com")).await.unwrap(), 1);
        assert_eq!(store.append(&record("b@x.com")).await.unwrap(), 2);

        let stored = store.load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].email.as_deref(), Some("a@x.com"));
        assert_eq!(stored[1].form_type, FormType::Popup);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("no-such-dir").join("form-submissions.json"));
        assert!(store.append(&record("a@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form-submissions.json");
        let truncated = r#"[{"form_type":"enquiry","email":"a@x.com"},{"form_type":"popup","email":"b@x"#;
        std::fs::write(&path, truncated).unwrap();

        let store = FileStore::new(&path);
        assert!(store.load().await.is_err());
        assert_eq!(store.append(&record("c@x.com")).await.unwrap(), 1);

        let stored = store.load().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].email.as_deref(), Some("c@x.com"));

        let siblings: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let aside: Vec<&String> = siblings
            .iter()
            .filter(|name| name.starts_with("form-submissions.json.corrupt-"))
            .collect();
        assert_eq!(aside.len(), 1, "siblings: {:?}", siblings);
        assert_eq!(std::fs::read_to_string(dir.path().join(aside[0])).unwrap(), truncated);
        assert!(!siblings.iter().any(|name| name.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn test_append_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("form-submissions.json"));
        store.append(&record("a@x.com")).await.unwrap();
        store.append(&record("b@x.com")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("form-submissions.json")]);
    }

    // Without the write lock two appends can read the same array and the
    // second write drops the first record.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("form-submissions.json"));

        let mut handles = Vec::new();
        for i in 0..25 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&record(&format!("lead{}@x.com", i))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 25);
    }
}
