use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// Canonical `YYYY-MM` string identifying a calendar month.
pub type MonthKey = String;

/// Marks for one habit within one month, keyed by 1-based day number.
pub type DayMarks = BTreeMap<u32, Mark>;

/// All habit marks within one month.
pub type MonthRecords = BTreeMap<HabitId, DayMarks>;

/// Completion status of one habit on one day.
///
/// `Unset` is the absence of an entry; it is never stored in the record
/// maps and never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Done,
    Missed,
    Unset,
}

impl Mark {
    /// Successor in the interactive cycle: Unset -> Done -> Missed -> Unset.
    pub fn next(self) -> Mark {
        match self {
            Mark::Unset => Mark::Done,
            Mark::Done => Mark::Missed,
            Mark::Missed => Mark::Unset,
        }
    }

    pub fn is_set(self) -> bool {
        !matches!(self, Mark::Unset)
    }
}

/// Monthly completion tally for one habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionRate {
    pub done: u32,
    pub missed: u32,
    pub total_marked: u32,
    pub pct: u32,
}

/// Sparse per-month, per-habit, per-day completion marks.
///
/// Absence of a key at any level reads as `Unset`; a day entry exists only
/// while its mark is `Done` or `Missed`. Emptied inner maps are pruned so
/// the store never accumulates hollow keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RecordStore {
    months: BTreeMap<MonthKey, MonthRecords>,
}

impl RecordStore {
    /// Current mark for a cell, `Unset` when no entry exists.
    pub fn mark(&self, habit_id: &str, month_key: &str, day: u32) -> Mark {
        self.months
            .get(month_key)
            .and_then(|month| month.get(habit_id))
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(Mark::Unset)
    }

    /// Set or clear a single cell directly, bypassing the cycle.
    /// Writing `Unset` deletes the entry, which makes clearing idempotent.
    pub fn set_mark(&mut self, habit_id: &str, month_key: &str, day: u32, mark: Mark) {
        if !mark.is_set() {
            let Some(month) = self.months.get_mut(month_key) else {
                return;
            };
            if let Some(days) = month.get_mut(habit_id) {
                days.remove(&day);
                if days.is_empty() {
                    month.remove(habit_id);
                }
            }
            if month.is_empty() {
                self.months.remove(month_key);
            }
            return;
        }
        self.months
            .entry(month_key.to_string())
            .or_default()
            .entry(habit_id.to_string())
            .or_default()
            .insert(day, mark);
    }

    /// Advance a cell one step through the cycle and return the new mark.
    pub fn cycle_mark(&mut self, habit_id: &str, month_key: &str, day: u32) -> Mark {
        let next = self.mark(habit_id, month_key, day).next();
        self.set_mark(habit_id, month_key, day, next);
        next
    }

    /// Drop every entry for one month; other months are untouched.
    pub fn clear_month(&mut self, month_key: &str) {
        self.months.remove(month_key);
    }

    /// Drop every entry for one habit across all months.
    pub fn remove_habit(&mut self, habit_id: &str) {
        for month in self.months.values_mut() {
            month.remove(habit_id);
        }
        self.months.retain(|_, month| !month.is_empty());
    }

    /// Monthly done/missed tally with a rounded completion percentage.
    pub fn completion_rate(&self, habit_id: &str, month_key: &str) -> CompletionRate {
        let mut done = 0u32;
        let mut missed = 0u32;
        if let Some(days) = self
            .months
            .get(month_key)
            .and_then(|month| month.get(habit_id))
        {
            for mark in days.values() {
                match mark {
                    Mark::Done => done += 1,
                    Mark::Missed => missed += 1,
                    Mark::Unset => {}
                }
            }
        }
        let total_marked = done + missed;
        let pct = if total_marked > 0 {
            ((done as f64 / total_marked as f64) * 100.0).round() as u32
        } else {
            0
        };
        CompletionRate {
            done,
            missed,
            total_marked,
            pct,
        }
    }

    /// Months in ascending key order, which for `YYYY-MM` keys is
    /// chronological order.
    pub fn months(&self) -> impl Iterator<Item = (&MonthKey, &MonthRecords)> {
        self.months.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Re-establish the sparse invariant on data that arrived from outside:
    /// explicit `Unset` marks and hollow maps are removed.
    pub(crate) fn normalize(&mut self) {
        for month in self.months.values_mut() {
            for days in month.values_mut() {
                days.retain(|_, mark| mark.is_set());
            }
            month.retain(|_, days| !days.is_empty());
        }
        self.months.retain(|_, month| !month.is_empty());
    }
}
