use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Hard cap on stored reference photos per user.
pub const MAX_REFS: usize = 3;

/// Persisted per-user state. `refs` keeps upload order; `awaiting_refs`
/// is true while the user is expected to keep sending reference photos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub refs: Vec<String>,
    #[serde(default)]
    pub awaiting_refs: bool,
}

/// Owns the full user-id → record mapping and its JSON document on disk.
/// The document is read once at startup and rewritten wholesale after
/// every mutation; last writer wins. All record I/O goes through here.
pub struct RecordStore {
    path: PathBuf,
    records: HashMap<String, UserRecord>,
}

impl RecordStore {
    /// Loads the record document. A missing or unparseable document is
    /// treated as an empty mapping, never as a startup failure.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, UserRecord>>(&raw) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        "Record document at {} is not valid JSON ({err}); starting empty",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(
                    "Failed to read record document at {}: {err}; starting empty",
                    path.display()
                );
                HashMap::new()
            }
        };

        if !records.is_empty() {
            info!(
                "Loaded {} user record(s) from {}",
                records.len(),
                path.display()
            );
        }

        RecordStore { path, records }
    }

    /// Rewrites the full document. Write failures are logged and
    /// swallowed so a bad disk never breaks a user-facing flow.
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    warn!("Failed to create {}: {err}", parent.display());
                    return;
                }
            }
        }

        let serialized = match serde_json::to_string_pretty(&self.records) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Failed to serialize record document: {err}");
                return;
            }
        };

        if let Err(err) = fs::write(&self.path, serialized) {
            warn!(
                "Failed to write record document to {}: {err}",
                self.path.display()
            );
        }
    }

    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.records.get(user_id).cloned()
    }

    /// Returns the record for `user_id`, creating and persisting the
    /// default one on first contact.
    pub fn ensure(&mut self, user_id: &str) -> UserRecord {
        if let Some(record) = self.records.get(user_id) {
            return record.clone();
        }
        self.records
            .insert(user_id.to_string(), UserRecord::default());
        self.save();
        UserRecord::default()
    }

    /// Replaces the record for `user_id` and rewrites the document.
    pub fn update(&mut self, user_id: &str, record: UserRecord) {
        self.records.insert(user_id.to_string(), record);
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_yields_empty_mapping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RecordStore::load(dir.path().join("records.json"));
        assert!(store.get("42").is_none());
    }

    #[test]
    fn corrupted_document_yields_empty_mapping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("records.json");
        fs::write(&path, "{ not json at all").expect("write");

        let store = RecordStore::load(&path);
        assert!(store.get("42").is_none());
    }

    #[test]
    fn ensure_creates_and_persists_default_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("records.json");

        let mut store = RecordStore::load(&path);
        let record = store.ensure("100500");
        assert_eq!(record, UserRecord::default());
        assert!(path.exists());

        let reloaded = RecordStore::load(&path);
        assert_eq!(reloaded.get("100500"), Some(UserRecord::default()));
    }

    #[test]
    fn update_survives_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("records.json");

        let mut store = RecordStore::load(&path);
        store.update(
            "7",
            UserRecord {
                refs: vec!["a.jpg".to_string(), "b.jpg".to_string()],
                awaiting_refs: true,
            },
        );

        let reloaded = RecordStore::load(&path);
        let record = reloaded.get("7").expect("record");
        assert_eq!(record.refs, vec!["a.jpg", "b.jpg"]);
        assert!(record.awaiting_refs);
    }

    #[test]
    fn document_is_pretty_printed_json_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("records.json");

        let mut store = RecordStore::load(&path);
        store.update("1", UserRecord::default());

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains('\n'));
        assert!(raw.trim_start().starts_with('{'));
    }
}
