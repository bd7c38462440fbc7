//! Heuristic normalization of free-text dates, times and party sizes.
//!
//! Guests say "tomorrow", "next friday" or "7pm"; the reservation API wants
//! `YYYY-MM-DD` and `HH:MM:SS`. These functions never fail: input they
//! cannot make sense of resolves to a default (tomorrow, 19:00:00).

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use regex::Regex;

/// Time used when nothing usable can be read from the text.
pub const DEFAULT_TIME: &str = "19:00:00";

// =============================================================================
// Compiled patterns
// =============================================================================

const MONTHS: &str =
    "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

struct DatePatterns {
    iso: Regex,
    month_first: Regex,
    day_first: Regex,
    slashed: Regex,
    ordinal_day: Regex,
    weekday: Regex,
}

static DATE_PATTERNS: LazyLock<DatePatterns> = LazyLock::new(|| DatePatterns {
    iso: Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("Invalid date regex"),
    month_first: Regex::new(&format!(
        r"\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?"
    ))
    .expect("Invalid date regex"),
    day_first: Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b\.?(?:,?\s+(\d{{4}}))?"
    ))
    .expect("Invalid date regex"),
    slashed: Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b").expect("Invalid date regex"),
    ordinal_day: Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("Invalid date regex"),
    weekday: Regex::new(r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("Invalid date regex"),
});

struct TimePatterns {
    meridiem: Regex,
    clock: Regex,
    number: Regex,
}

static TIME_PATTERNS: LazyLock<TimePatterns> = LazyLock::new(|| TimePatterns {
    meridiem: Regex::new(r"\b(\d{1,2})(?:[:.](\d{2}))?\s*([ap])\.?m\b").expect("Invalid time regex"),
    clock: Regex::new(r"(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?").expect("Invalid time regex"),
    number: Regex::new(r"\d+").expect("Invalid time regex"),
});

// =============================================================================
// Dates
// =============================================================================

/// Normalize a date phrase relative to the local calendar date.
pub fn normalize_date(text: &str) -> String {
    normalize_date_on(text, Local::now().date_naive())
}

/// Normalize a date phrase relative to `today`, returning `YYYY-MM-DD`.
///
/// Relative phrases are checked first, in priority order, by
/// case-insensitive substring match: `today`, `tomorrow`,
/// `weekend`/`saturday`, `sunday`, then `next` combined with `friday` or
/// `week`. Anything else goes through [`parse_fuzzy_date`]. A parsed date
/// that falls before `today` because its month/day already passed this year
/// is moved to next year. Unparseable text yields tomorrow.
pub fn normalize_date_on(text: &str, today: NaiveDate) -> String {
    let tomorrow = today + Duration::days(1);
    let lower = text.to_lowercase();

    let resolved = if lower.contains("today") {
        Some(today)
    } else if lower.contains("tomorrow") {
        Some(tomorrow)
    } else if lower.contains("weekend") || lower.contains("saturday") {
        Some(next_weekday(today, 5))
    } else if lower.contains("sunday") {
        Some(next_weekday(today, 6))
    } else if lower.contains("next") && lower.contains("friday") {
        Some(next_weekday(today, 4))
    } else if lower.contains("next") && lower.contains("week") {
        Some(today + Duration::days(7))
    } else {
        None
    };

    let date = match resolved {
        Some(date) => date,
        None => match parse_fuzzy_date(&lower, today).and_then(|d| roll_forward(d, today)) {
            Some(date) => date,
            None => {
                tracing::warn!(input = %text, "Could not parse date, defaulting to tomorrow");
                tomorrow
            }
        },
    };

    date.format("%Y-%m-%d").to_string()
}

/// Days until the next `target` weekday (Monday = 0), strictly after today.
fn next_weekday(today: NaiveDate, target: i64) -> NaiveDate {
    let current = i64::from(today.weekday().num_days_from_monday());
    let mut days_ahead = target - current;
    if days_ahead <= 0 {
        days_ahead += 7;
    }
    today + Duration::days(days_ahead)
}

/// Move a past date whose month/day precedes today's into next year.
///
/// Returns `None` when the shifted date does not exist (29 February).
fn roll_forward(date: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    if date >= today {
        return Some(date);
    }
    let earlier_in_year = date.month() < today.month()
        || (date.month() == today.month() && date.day() < today.day());
    if earlier_in_year {
        date.with_year(today.year() + 1)
    } else {
        Some(date)
    }
}

/// Best-effort absolute date parse over lower-cased text.
///
/// Understands ISO dates, "march 20th", "20 march 2025", "3/20" (month
/// first), a bare ordinal ("the 20th", this month) and a bare weekday
/// (the next such day, today included). Missing years default to the year
/// of `today`.
pub fn parse_fuzzy_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let p = &*DATE_PATTERNS;

    if let Some(caps) = p.iso.captures(&lower) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.month_first.captures(&lower) {
        let month = month_number(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = year_or(caps.get(3).map(|m| m.as_str()), today)?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.day_first.captures(&lower) {
        let day = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = year_or(caps.get(3).map(|m| m.as_str()), today)?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.slashed.captures(&lower) {
        let month = caps[1].parse().ok()?;
        let day = caps[2].parse().ok()?;
        let year = year_or(caps.get(3).map(|m| m.as_str()), today)?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.ordinal_day.captures(&lower) {
        let day = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(today.year(), today.month(), day);
    }

    if let Some(caps) = p.weekday.captures(&lower) {
        let target = weekday_index(&caps[1])?;
        let current = i64::from(today.weekday().num_days_from_monday());
        let days_ahead = (target - current).rem_euclid(7);
        return Some(today + Duration::days(days_ahead));
    }

    None
}

fn year_or(year: Option<&str>, today: NaiveDate) -> Option<i32> {
    match year {
        Some(y) if y.len() == 2 => y.parse::<i32>().ok().map(|y| 2000 + y),
        Some(y) => y.parse().ok(),
        None => Some(today.year()),
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_index(name: &str) -> Option<i64> {
    let index = match name {
        "monday" => 0,
        "tuesday" => 1,
        "wednesday" => 2,
        "thursday" => 3,
        "friday" => 4,
        "saturday" => 5,
        "sunday" => 6,
        _ => return None,
    };
    Some(index)
}

// =============================================================================
// Times
// =============================================================================

/// Normalize a time phrase to `HH:MM:SS`.
///
/// - Text with `am`/`pm` is read as a 12-hour clock ("7pm", "7:30 pm").
/// - Otherwise text with a colon is read as a 24-hour clock and zero-padded
///   ("18:30" -> "18:30:00", "9:5" -> "09:05:00").
/// - Otherwise the first integer is taken as the hour, plus 12 when it is
///   below 12 and the text mentions dinner ("dinner at 7" -> "19:00:00").
///
/// Anything that does not yield a valid clock time is [`DEFAULT_TIME`].
pub fn normalize_time(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let p = &*TIME_PATTERNS;

    let parsed = if lower.contains("am") || lower.contains("pm") {
        p.meridiem.captures(&lower).and_then(|caps| {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            if hour == 0 || hour > 12 {
                return None;
            }
            let hour = match (&caps[3], hour) {
                ("a", 12) => 0,
                ("a", h) => h,
                ("p", 12) => 12,
                (_, h) => h + 12,
            };
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
    } else if lower.contains(':') {
        p.clock.captures(&lower).and_then(|caps| {
            let hour = caps[1].parse().ok()?;
            let minute = caps[2].parse().ok()?;
            let second = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
            NaiveTime::from_hms_opt(hour, minute, second)
        })
    } else {
        p.number.find(&lower).and_then(|m| {
            let mut hour: u32 = m.as_str().parse().ok()?;
            if hour < 12 && lower.contains("dinner") {
                hour += 12;
            }
            NaiveTime::from_hms_opt(hour, 0, 0)
        })
    };

    match parsed {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => {
            tracing::debug!(input = %text, "Could not parse time, using {}", DEFAULT_TIME);
            DEFAULT_TIME.to_string()
        }
    }
}

// =============================================================================
// Party size
// =============================================================================

/// Read a party size from text such as "4", "4 people" or "party of 6".
///
/// Takes the first integer in the text. Returns `None` when there is no
/// integer or it is zero.
pub fn parse_party_size(text: &str) -> Option<u32> {
    TIME_PATTERNS
        .number
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}
