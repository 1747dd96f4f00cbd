use thiserror::Error;
use tracing::{debug, info};

use crate::calendar::is_month_key;
use crate::habit::Habit;
use crate::record::{Mark, RecordStore};
use crate::snapshot::Snapshot;

/// Fixed five-column header; import only requires the column count.
pub const CSV_HEADER: &str = "Habit ID,Habit Name,Month,Day,Status";

/// Structural failures that abort an import outright. Row-level problems
/// are tolerated and reported as a count instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("malformed CSV: {0}")]
    Format(String),
    #[error("no valid rows found in CSV")]
    NoValidRows,
}

/// Result of a successful import. The snapshot is a wholesale replacement
/// for the current state; the caller confirms before applying it.
#[derive(Debug)]
pub struct ImportOutcome {
    pub snapshot: Snapshot,
    pub valid_rows: usize,
    pub invalid_rows: usize,
}

/// Flatten a snapshot into the five-column text format. One row per marked
/// day: habits in display order, then months and days in ascending order,
/// so re-exporting the same snapshot is byte-stable.
pub fn export_csv(snapshot: &Snapshot) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    let mut rows = 0usize;
    for habit in &snapshot.habits {
        for (month_key, month) in snapshot.records.months() {
            let Some(days) = month.get(&habit.id) else {
                continue;
            };
            for (&day, &mark) in days {
                let Some(status) = status_token(mark) else {
                    continue;
                };
                out.push_str(&format!(
                    "{},{},{},{},{}\n",
                    habit.id,
                    quote_field(&habit.name),
                    month_key,
                    day,
                    status
                ));
                rows += 1;
            }
        }
    }
    debug!(rows, "exported records to CSV");
    out
}

/// Rebuild a fresh snapshot from CSV text.
///
/// Rows failing validation are skipped and counted; habits are deduplicated
/// by id with the first-seen name winning.
pub fn import_csv(text: &str) -> Result<ImportOutcome, ImportError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 2 {
        return Err(ImportError::Format(
            "expected a header row and at least one data row".to_string(),
        ));
    }
    if split_row(lines[0]).len() < 5 {
        return Err(ImportError::Format(
            "header must have at least 5 columns".to_string(),
        ));
    }

    let mut habits: Vec<Habit> = Vec::new();
    let mut records = RecordStore::default();
    let mut valid_rows = 0usize;
    let mut invalid_rows = 0usize;

    for line in &lines[1..] {
        let fields = split_row(line);
        if fields.len() < 5 || fields.iter().take(5).any(|field| field.is_empty()) {
            invalid_rows += 1;
            continue;
        }
        let mark = match fields[4].as_str() {
            "done" => Mark::Done,
            "missed" => Mark::Missed,
            _ => {
                invalid_rows += 1;
                continue;
            }
        };
        if !is_month_key(&fields[2]) {
            invalid_rows += 1;
            continue;
        }
        let day: u32 = match fields[3].parse() {
            Ok(day) if (1..=31).contains(&day) => day,
            _ => {
                invalid_rows += 1;
                continue;
            }
        };

        let id = fields[0].as_str();
        if !habits.iter().any(|habit| habit.id == id) {
            habits.push(Habit::with_id(id, fields[1].as_str()));
        }
        records.set_mark(id, &fields[2], day, mark);
        valid_rows += 1;
    }

    if valid_rows == 0 {
        return Err(ImportError::NoValidRows);
    }

    info!(valid_rows, invalid_rows, "imported records from CSV");
    Ok(ImportOutcome {
        snapshot: Snapshot::with_state(habits, records),
        valid_rows,
        invalid_rows,
    })
}

fn status_token(mark: Mark) -> Option<&'static str> {
    match mark {
        Mark::Done => Some("done"),
        Mark::Missed => Some("missed"),
        Mark::Unset => None,
    }
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Split one comma-delimited line into fields, honouring double-quote
/// quoting with quotes escaped by doubling.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            }
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_days_are_counted_invalid() {
        let text = "Habit ID,Habit Name,Month,Day,Status\nh1,Read,2025-03,5,done\nh1,Read,2025-03,40,done";
        let outcome = import_csv(text).unwrap();
        assert_eq!(outcome.valid_rows, 1);
        assert_eq!(outcome.invalid_rows, 1);
        assert_eq!(outcome.snapshot.habits.len(), 1);
        assert_eq!(outcome.snapshot.habits[0].name, "Read");
        assert_eq!(outcome.snapshot.records.mark("h1", "2025-03", 5), Mark::Done);
        assert_eq!(
            outcome.snapshot.records.mark("h1", "2025-03", 40),
            Mark::Unset
        );
    }

    #[test]
    fn export_then_import_preserves_names_and_marks() {
        let mut records = RecordStore::default();
        records.set_mark("a", "2025-03", 5, Mark::Done);
        records.set_mark("a", "2025-04", 1, Mark::Missed);
        records.set_mark("b", "2025-03", 2, Mark::Done);
        let snapshot = Snapshot::with_state(
            vec![
                Habit::with_id("a", "Read, daily"),
                Habit::with_id("b", "Say \"hi\""),
            ],
            records,
        );

        let outcome = import_csv(&export_csv(&snapshot)).unwrap();
        assert_eq!(outcome.valid_rows, 3);
        assert_eq!(outcome.invalid_rows, 0);
        assert_eq!(outcome.snapshot.habits[0].name, "Read, daily");
        assert_eq!(outcome.snapshot.habits[1].name, "Say \"hi\"");
        assert_eq!(outcome.snapshot.records, snapshot.records);
    }

    #[test]
    fn export_is_deterministic() {
        let mut records = RecordStore::default();
        records.set_mark("a", "2025-04", 9, Mark::Done);
        records.set_mark("a", "2025-03", 5, Mark::Done);
        let snapshot = Snapshot::with_state(vec![Habit::with_id("a", "Read")], records);
        let first = export_csv(&snapshot);
        assert_eq!(first, export_csv(&snapshot));
        assert!(first.find("2025-03").unwrap() < first.find("2025-04").unwrap());
    }

    #[test]
    fn a_file_without_data_rows_is_malformed() {
        assert!(matches!(
            import_csv("Habit ID,Habit Name,Month,Day,Status"),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(import_csv(""), Err(ImportError::Format(_))));
    }

    #[test]
    fn a_short_header_is_malformed() {
        assert!(matches!(
            import_csv("id,name,month\nh1,Read,2025-03"),
            Err(ImportError::Format(_))
        ));
    }

    #[test]
    fn a_file_where_every_row_fails_is_rejected() {
        let text = "Habit ID,Habit Name,Month,Day,Status\nh1,Read,2025-03,5,sometimes\nh1,,2025-03,6,done";
        assert!(matches!(import_csv(text), Err(ImportError::NoValidRows)));
    }

    #[test]
    fn first_seen_habit_name_wins() {
        let text =
            "Habit ID,Habit Name,Month,Day,Status\nh1,Read,2025-03,5,done\nh1,Reading,2025-03,6,missed";
        let outcome = import_csv(text).unwrap();
        assert_eq!(outcome.snapshot.habits.len(), 1);
        assert_eq!(outcome.snapshot.habits[0].name, "Read");
        assert_eq!(outcome.valid_rows, 2);
    }

    #[test]
    fn malformed_month_keys_are_counted_invalid() {
        let text = "Habit ID,Habit Name,Month,Day,Status\nh1,Read,2025-3,5,done\nh1,Read,2025-03,5,done";
        let outcome = import_csv(text).unwrap();
        assert_eq!(outcome.valid_rows, 1);
        assert_eq!(outcome.invalid_rows, 1);
    }

    #[test]
    fn quoted_fields_keep_commas_and_doubled_quotes() {
        assert_eq!(
            split_row(r#"h1,"Read, then ""rest""",2025-03,5,done"#),
            vec!["h1", "Read, then \"rest\"", "2025-03", "5", "done"]
        );
    }
}
