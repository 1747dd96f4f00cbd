use chrono::NaiveDate;

/// Gregorian leap year rule: divisible by 4, not by 100 unless by 400.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of calendar days in the given month. `month0` is zero-indexed.
pub fn days_in_month(year: i32, month0: u32) -> u32 {
    match month0 {
        1 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        3 | 5 | 8 | 10 => 30,
        _ => 31,
    }
}

/// Canonical `YYYY-MM` key for a month. `month0` is zero-indexed.
pub fn month_key(year: i32, month0: u32) -> String {
    format!("{:04}-{:02}", year, month0 + 1)
}

/// Shift a `(year, month0)` pair by `delta` months, carrying overflow and
/// underflow into the year.
pub fn add_months(year: i32, month0: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + month0 as i32 + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32)
}

/// Whether `value` has the `YYYY-MM` shape: four digits, a dash, two digits.
pub fn is_month_key(value: &str) -> bool {
    let Some((year, month)) = value.split_once('-') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.chars().all(|ch| ch.is_ascii_digit())
        && month.chars().all(|ch| ch.is_ascii_digit())
}

/// Split a month key back into its `(year, month0)` pair.
pub fn parse_month_key(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    Some((year, month.checked_sub(1)?))
}

/// Reconstruct the calendar date for a stored `(month key, day)` entry.
///
/// Days that do not exist in their month (e.g. day 30 in February) return
/// `None` rather than rolling over into the following month, so such
/// entries are skipped instead of shifting silently in time.
pub fn date_for(month_key: &str, day: u32) -> Option<NaiveDate> {
    let (year, month0) = parse_month_key(month_key)?;
    NaiveDate::from_ymd_opt(year, month0 + 1, day)
}
