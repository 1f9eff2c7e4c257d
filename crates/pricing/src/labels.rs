//! Month labels for a price grid.
//!
//! Cell `i` (0-based) is labelled with the anchor date advanced by
//! `count + 1 - i` months, so the first cell carries the furthest month and the
//! last cell the nearest. Deployed clients pair labels and cells positionally;
//! the ordering must not change.

use chrono::{Days, Months, NaiveDate};

/// Label used when the anchor is missing or unparsable.
pub const NOT_AVAILABLE: &str = "N/A";

const LABEL_FORMAT: &str = "%m/%y";

/// Longer numeric fields are treated as unparsable.
const MAX_FIELD_DIGITS: usize = 9;

/// Parse an `M/d/yyyy` anchor the way deployed clients read it.
///
/// Zero padding is optional and anything after the year is ignored
/// ("1/15/2025 12:00" is January 15th). An out-of-range month or day rolls
/// over: "2/30/2025" is March 2nd, "13/1/2025" is January 1st 2026.
pub fn parse_anchor(raw: &str) -> Option<NaiveDate> {
    let (month, rest) = leading_number(raw.trim_start())?;
    let (day, rest) = leading_number(rest.strip_prefix('/')?)?;
    let (year, _) = leading_number(rest.strip_prefix('/')?)?;
    roll_over(year, month, day)
}

/// The leading run of ASCII digits as a number, plus the text after it.
fn leading_number(s: &str) -> Option<(i64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 || end > MAX_FIELD_DIGITS {
        return None;
    }
    let n = s[..end].parse().ok()?;
    Some((n, &s[end..]))
}

/// January 1st of `year`, advanced by `month - 1` months and `day - 1` days.
fn roll_over(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month - 1)?;
    let first = NaiveDate::from_ymd_opt(
        i32::try_from(months.div_euclid(12)).ok()?,
        u32::try_from(months.rem_euclid(12) + 1).ok()?,
        1,
    )?;
    match u64::try_from(day - 1) {
        Ok(days) => first.checked_add_days(Days::new(days)),
        // Day 0 is the last day of the previous month.
        Err(_) => first.checked_sub_days(Days::new(1)),
    }
}

/// `count` display labels (`MM/yy`) for an anchor date.
///
/// A missing or unparsable anchor yields `count` copies of [`NOT_AVAILABLE`].
pub fn labels(anchor: Option<&str>, count: usize) -> Vec<String> {
    let Some(date) = anchor.and_then(parse_anchor) else {
        if let Some(raw) = anchor.filter(|a| !a.trim().is_empty()) {
            tracing::debug!(anchor = raw, "unparsable anchor date");
        }
        return vec![NOT_AVAILABLE.to_string(); count];
    };

    (0..count)
        .map(|i| {
            u32::try_from(count - i + 1)
                .ok()
                .and_then(|months| date.checked_add_months(Months::new(months)))
                .map(|d| d.format(LABEL_FORMAT).to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        })
        .collect()
}
