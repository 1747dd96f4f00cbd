use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::calendar::month_key;
use crate::csv::{self, ImportError, ImportOutcome};
use crate::habit::{Habit, HabitId};
use crate::record::{CompletionRate, Mark};
use crate::snapshot::Snapshot;
use crate::streak::{self, HabitSummary};

/// Session-scoped owner of the tracker state.
///
/// There is exactly one logical writer (the interactive user, serialized
/// through the UI event queue), so every mutation goes through `&mut self`.
/// Mutations addressing an unknown habit id are inert rather than errors.
pub struct HabitTracker {
    snapshot: Snapshot,
    auto_marked: Option<NaiveDate>,
}

impl HabitTracker {
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::default())
    }

    /// Restore a session from the persisted blob; an absent or unreadable
    /// blob starts an empty session.
    pub fn from_blob(blob: Option<&str>) -> Self {
        Self::with_snapshot(Snapshot::from_blob(blob))
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            auto_marked: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn habits(&self) -> &[Habit] {
        &self.snapshot.habits
    }

    pub fn to_blob(&self) -> Result<String> {
        self.snapshot.to_blob()
    }

    /// Append a new habit. A name that trims to empty is ignored.
    pub fn add_habit(&mut self, name: &str) -> Option<&Habit> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        let habit = Habit::new(trimmed);
        info!(habit_id = %habit.id, "habit added");
        self.snapshot.habits.push(habit);
        self.auto_marked = None;
        self.snapshot.habits.last()
    }

    /// Rename a habit in place. Empty names and unknown ids are ignored.
    pub fn rename_habit(&mut self, id: &str, new_name: &str) {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Some(habit) = self.snapshot.habits.iter_mut().find(|habit| habit.id == id) {
            habit.name = trimmed.to_string();
        }
    }

    /// Remove a habit and every record it has in any month. Records must
    /// never outlive their habit.
    pub fn remove_habit(&mut self, id: &str) {
        let before = self.snapshot.habits.len();
        self.snapshot.habits.retain(|habit| habit.id != id);
        self.snapshot.records.remove_habit(id);
        if self.snapshot.habits.len() < before {
            info!(habit_id = %id, "habit removed");
        }
    }

    /// Advance one cell through Unset -> Done -> Missed -> Unset.
    pub fn cycle_mark(&mut self, habit_id: &str, month_key: &str, day: u32) -> Mark {
        self.snapshot.records.cycle_mark(habit_id, month_key, day)
    }

    /// Set or clear one cell directly, bypassing the cycle.
    pub fn set_mark(&mut self, habit_id: &str, month_key: &str, day: u32, mark: Mark) {
        self.snapshot.records.set_mark(habit_id, month_key, day, mark);
    }

    pub fn mark(&self, habit_id: &str, month_key: &str, day: u32) -> Mark {
        self.snapshot.records.mark(habit_id, month_key, day)
    }

    /// Drop every mark in one month, leaving other months untouched. The
    /// caller confirms with the user first.
    pub fn clear_month(&mut self, month_key: &str) {
        self.snapshot.records.clear_month(month_key);
        info!(%month_key, "month cleared");
    }

    pub fn completion_rate(&self, habit_id: &str, month_key: &str) -> CompletionRate {
        self.snapshot.records.completion_rate(habit_id, month_key)
    }

    pub fn habit_summary(&self, habit_id: &str) -> HabitSummary {
        streak::habit_summary(habit_id, &self.snapshot.records)
    }

    pub fn export_csv(&self) -> String {
        csv::export_csv(&self.snapshot)
    }

    /// Parse CSV text into a replacement snapshot without applying it.
    /// Import discards the current state, so the caller must confirm with
    /// the user and then call [`HabitTracker::replace_snapshot`].
    pub fn import_csv(&self, text: &str) -> Result<ImportOutcome, ImportError> {
        csv::import_csv(text)
    }

    /// Replace the whole session state, e.g. with a confirmed import result.
    pub fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.auto_marked = None;
    }

    /// Default today's unset entries to `Done` for every habit.
    ///
    /// The caller invokes this when the displayed month is the real current
    /// month. Runs once per session day (re-armed when the habit set
    /// changes); existing `Done` or `Missed` marks are never overridden, so
    /// re-running is a no-op either way. Returns how many entries were set.
    pub fn auto_mark_today(&mut self, today: NaiveDate) -> usize {
        if self.auto_marked == Some(today) {
            return 0;
        }
        self.auto_marked = Some(today);

        let key = month_key(today.year(), today.month0());
        let day = today.day();
        let ids: Vec<HabitId> = self
            .snapshot
            .habits
            .iter()
            .map(|habit| habit.id.clone())
            .collect();
        let mut marked = 0usize;
        for id in ids {
            if self.snapshot.records.mark(&id, &key, day) == Mark::Unset {
                self.snapshot.records.set_mark(&id, &key, day, Mark::Done);
                marked += 1;
            }
        }
        if marked > 0 {
            debug!(marked, %key, day, "auto-marked today's entries");
        }
        marked
    }
}

impl Default for HabitTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(names: &[&str]) -> HabitTracker {
        let mut tracker = HabitTracker::new();
        for name in names {
            tracker.add_habit(name);
        }
        tracker
    }

    #[test]
    fn blank_names_are_ignored_on_add_and_rename() {
        let mut tracker = HabitTracker::new();
        assert!(tracker.add_habit("   ").is_none());
        assert!(tracker.habits().is_empty());

        tracker.add_habit("  Read  ");
        assert_eq!(tracker.habits()[0].name, "Read");

        let id = tracker.habits()[0].id.clone();
        tracker.rename_habit(&id, "  ");
        assert_eq!(tracker.habits()[0].name, "Read");
        tracker.rename_habit(&id, " Read books ");
        assert_eq!(tracker.habits()[0].name, "Read books");
    }

    #[test]
    fn renaming_keeps_id_and_position() {
        let mut tracker = tracker_with(&["Read", "Run"]);
        let id = tracker.habits()[0].id.clone();
        tracker.rename_habit(&id, "Read daily");
        assert_eq!(tracker.habits()[0].id, id);
        assert_eq!(tracker.habits()[0].name, "Read daily");
        assert_eq!(tracker.habits()[1].name, "Run");
    }

    #[test]
    fn mutating_an_unknown_habit_creates_nothing() {
        let mut tracker = tracker_with(&["Read"]);
        tracker.rename_habit("missing", "X");
        tracker.remove_habit("missing");
        assert_eq!(tracker.habits().len(), 1);
        assert_eq!(tracker.habits()[0].name, "Read");
    }

    #[test]
    fn removing_a_habit_cascades_into_records() {
        let mut tracker = tracker_with(&["Read", "Run"]);
        let read = tracker.habits()[0].id.clone();
        let run = tracker.habits()[1].id.clone();
        tracker.set_mark(&read, "2025-03", 5, Mark::Done);
        tracker.set_mark(&read, "2025-04", 2, Mark::Missed);
        tracker.set_mark(&run, "2025-03", 5, Mark::Done);

        tracker.remove_habit(&read);
        assert_eq!(tracker.habits().len(), 1);
        assert_eq!(tracker.mark(&read, "2025-03", 5), Mark::Unset);
        assert_eq!(tracker.mark(&read, "2025-04", 2), Mark::Unset);
        assert_eq!(tracker.mark(&run, "2025-03", 5), Mark::Done);
    }

    #[test]
    fn auto_mark_fills_only_unset_entries() {
        let mut tracker = tracker_with(&["Read", "Run", "Rest"]);
        let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let read = tracker.habits()[0].id.clone();
        let run = tracker.habits()[1].id.clone();
        tracker.set_mark(&read, "2025-03", 5, Mark::Missed);
        tracker.set_mark(&run, "2025-03", 5, Mark::Done);

        assert_eq!(tracker.auto_mark_today(today), 1);
        assert_eq!(tracker.mark(&read, "2025-03", 5), Mark::Missed);
        assert_eq!(tracker.mark(&run, "2025-03", 5), Mark::Done);
        let rest = tracker.habits()[2].id.clone();
        assert_eq!(tracker.mark(&rest, "2025-03", 5), Mark::Done);
    }

    #[test]
    fn auto_mark_runs_once_per_day_and_rearms_on_new_habits() {
        let mut tracker = tracker_with(&["Read"]);
        let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(tracker.auto_mark_today(today), 1);
        assert_eq!(tracker.auto_mark_today(today), 0);

        tracker.add_habit("Run");
        assert_eq!(tracker.auto_mark_today(today), 1);

        let next_day = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        assert_eq!(tracker.auto_mark_today(next_day), 2);
    }

    #[test]
    fn auto_mark_lands_in_the_month_of_the_given_date() {
        let mut tracker = tracker_with(&["Read"]);
        let id = tracker.habits()[0].id.clone();
        let today = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        tracker.auto_mark_today(today);
        assert_eq!(tracker.mark(&id, "2025-12", 31), Mark::Done);
    }
}
