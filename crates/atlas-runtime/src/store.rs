//! Resumable session snapshots.
//!
//! A snapshot is written after every applied chunk. Resuming a session
//! replays the generator stream; chunks at or below the snapshot's
//! `last_chunk_index` come back from the engine as replays and are skipped.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use atlas_core::{GovernorState, SynthesisParagraph};

use crate::session::GuideSegment;
use crate::RuntimeError;

/// Everything needed to pick a session back up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub attempt: u32,
    pub state: GovernorState,
    pub segments: Vec<GuideSegment>,
    pub paragraphs: Vec<SynthesisParagraph>,
}

impl SessionSnapshot {
    pub fn new(attempt: u32) -> Self {
        Self {
            attempt,
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String, RuntimeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// In-memory snapshot store keyed by session id. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    snapshots: Arc<RwLock<HashMap<String, SessionSnapshot>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, session_id: &str, snapshot: SessionSnapshot) {
        self.snapshots.write().insert(session_id.to_string(), snapshot);
    }

    pub fn load(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.snapshots.read().get(session_id).cloned()
    }

    pub fn load_required(&self, session_id: &str) -> Result<SessionSnapshot, RuntimeError> {
        self.load(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.snapshots.write().remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.snapshots.read().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_snapshots() {
        let store = StateStore::new();
        let other = store.clone();

        let mut snapshot = SessionSnapshot::new(1);
        snapshot.state.current_word_count = 420;
        store.save("s1", snapshot);

        assert_eq!(other.load("s1").unwrap().state.current_word_count, 420);
        assert!(other.remove("s1").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_session_is_an_error() {
        let store = StateStore::new();
        assert!(matches!(
            store.load_required("nope"),
            Err(RuntimeError::SessionNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_snapshot_survives_json() {
        let mut snapshot = SessionSnapshot::new(2);
        snapshot.state.last_chunk_index = Some(7);
        snapshot.segments.push(GuideSegment {
            section_index: 1,
            text: "Body".to_string(),
        });

        let restored = SessionSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }
}
