use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::session::SessionScratch;
use crate::store::records::RecordStore;

/// Shared handles injected into every handler via `dptree::deps`.
///
/// `records` is the persisted store; `sessions` holds the ephemeral
/// per-user scratch keyed by the same string user id the record
/// document uses. Handlers take the locks only for short, non-awaiting
/// critical sections.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<Mutex<RecordStore>>,
    pub sessions: Arc<Mutex<HashMap<String, SessionScratch>>>,
}

impl AppState {
    pub fn new(records: RecordStore) -> Self {
        AppState {
            records: Arc::new(Mutex::new(records)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Snapshot of a user's scratch, defaulting to empty.
    pub fn scratch(&self, user_id: &str) -> SessionScratch {
        self.sessions
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_prompt_text(&self, user_id: &str, text: String) {
        self.sessions
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .prompt_text = Some(text);
    }

    pub fn set_style_path(&self, user_id: &str, path: std::path::PathBuf) {
        self.sessions
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .style_path = Some(path);
    }

    /// Drops the scratch after a successful generation.
    pub fn clear_scratch(&self, user_id: &str) {
        self.sessions.lock().remove(user_id);
    }
}
