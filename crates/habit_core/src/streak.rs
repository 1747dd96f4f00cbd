use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::date_for;
use crate::record::{Mark, RecordStore};

/// Trailing entries considered when deciding whether a habit is broken.
const RECENT_WINDOW: usize = 7;

/// Cross-month streak digest for a single habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HabitSummary {
    /// Consecutive `Done` marks since the most recent `Missed`.
    pub current_streak: u32,
    /// The last `RECENT_WINDOW` entries contain a `Missed` and no `Done`.
    pub is_broken: bool,
}

/// Chronological streak analysis over every month in the store.
///
/// A single recent miss does not zero the streak as long as a recent `Done`
/// offsets it within the trailing window; only a window with misses and no
/// completions reports the habit as broken, which forces the streak to 0.
pub fn habit_summary(habit_id: &str, records: &RecordStore) -> HabitSummary {
    let mut entries: Vec<(NaiveDate, Mark)> = Vec::new();
    for (month_key, month) in records.months() {
        let Some(days) = month.get(habit_id) else {
            continue;
        };
        for (&day, &mark) in days {
            // Entries whose stored day does not exist in their month are
            // skipped; date_for never rolls them into the following month.
            if let Some(date) = date_for(month_key, day) {
                entries.push((date, mark));
            }
        }
    }
    entries.sort_by_key(|&(date, _)| date);

    let start = entries
        .iter()
        .rposition(|&(_, mark)| mark == Mark::Missed)
        .map_or(0, |index| index + 1);
    let mut current_streak = entries[start..]
        .iter()
        .filter(|&&(_, mark)| mark == Mark::Done)
        .count() as u32;

    let recent = &entries[entries.len().saturating_sub(RECENT_WINDOW)..];
    let is_broken = recent.iter().any(|&(_, mark)| mark == Mark::Missed)
        && !recent.iter().any(|&(_, mark)| mark == Mark::Done);
    if is_broken {
        current_streak = 0;
    }

    HabitSummary {
        current_streak,
        is_broken,
    }
}
