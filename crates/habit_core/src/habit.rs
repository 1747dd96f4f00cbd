use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a habit.
///
/// Engine-created habits get a fresh uuid; habits rebuilt from a CSV import
/// keep whatever opaque token the file carried.
pub type HabitId = String;

/// A user-defined recurring activity tracked per day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
}

impl Habit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }

    pub fn with_id(id: impl Into<HabitId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
