// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Datelike, NaiveDate};

/// Layouts the store uses for full dates. `%B` also accepts abbreviations.
const FULL_DATE_FORMATS: [&str; 5] = ["%d %B, %Y", "%B %d, %Y", "%Y-%m-%d", "%d %B %Y", "%B %d %Y"];

/// Parse the store's free-text release date.
///
/// Year-only dates resolve to December 31st, month and year to the 1st of the
/// month. Placeholders such as "Coming soon" yield `None`.
pub fn parse(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // Before the full layouts: "%B %d %Y" would read "March 2023" as day 20 of year 23
    let month_year = format!("1 {}", text.replace(',', ""));
    if let Ok(date) = NaiveDate::parse_from_str(&month_year, "%d %B %Y") {
        return Some(date);
    }

    if let Some(date) = FULL_DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .find(|date| date.year() >= 1000)
    {
        return Some(date);
    }

    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }

    None
}

/// UTC calendar date of a Unix timestamp
pub fn from_timestamp(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// Render as `YYYY-MM-DD`, or as UTC midnight when `with_time` is set
pub fn render(date: NaiveDate, with_time: bool) -> String {
    if with_time {
        format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}
