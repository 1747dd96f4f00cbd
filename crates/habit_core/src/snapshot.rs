use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::habit::Habit;
use crate::record::RecordStore;

/// The complete serializable state: all habits plus all records.
///
/// Habit order is display order. The blob shape is
/// `{"habits": [...], "records": {month: {habit: {day: mark}}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub records: RecordStore,
    /// Fields the UI collaborator bundles into the blob (view preferences
    /// and the like). Preserved verbatim, never interpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    pub fn with_state(habits: Vec<Habit>, records: RecordStore) -> Self {
        Self {
            habits,
            records,
            extra: Map::new(),
        }
    }

    /// Decode a persisted blob. An absent, empty, or unreadable blob yields
    /// the empty snapshot, never an error.
    pub fn from_blob(blob: Option<&str>) -> Self {
        let Some(raw) = blob else {
            return Self::default();
        };
        match serde_json::from_str::<Snapshot>(raw) {
            Ok(mut snapshot) => {
                snapshot.records.normalize();
                snapshot
            }
            Err(err) => {
                debug!(%err, "discarding unreadable snapshot blob");
                Self::default()
            }
        }
    }

    /// Encode the snapshot for the persistence boundary.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
