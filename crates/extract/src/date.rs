//! Date phrase resolution
//!
//! Accepts relative expressions ("today", "tomorrow", "next Tuesday",
//! "next week", bare weekday names) and absolute expressions (month-day in
//! several orders, optional year, ordinal suffixes, ISO dates, m/d forms).
//!
//! Roll-forward rules: a past month-day with no year rolls to next year; a
//! weekday at or before today's weekday rolls to next week, so "next Monday"
//! said on a Monday means seven days out, never today.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A resolved calendar date plus its human-readable rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    /// e.g. "October 14, 2025"
    pub display: String,
}

impl ResolvedDate {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            display: date.format("%B %d, %Y").to_string(),
            date,
        }
    }

    /// Normalized form used on the wire, e.g. "2025-10-14"
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// What a message said about dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSignal {
    /// A date phrase was found and resolved
    Resolved(ResolvedDate),
    /// Something date-like was found but could not be resolved
    Unparseable(String),
    /// The message contains no date phrase
    NotSpecified,
}

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:st|nd|rd|th)\b").unwrap());

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}))?\b").unwrap());

static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec)\.?\s+(\d{1,2})(?:\s*,?\s*(\d{4}))?\b",
    )
    .unwrap()
});

static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec)\.?(?:\s*,?\s*(\d{4}))?\b",
    )
    .unwrap()
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(today|tomorrow|next\s+week|(?:next\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
    )
    .unwrap()
});

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let day = match name.to_lowercase().as_str() {
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Next occurrence of `target`, strictly after `today`
fn upcoming_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let today_idx = today.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut ahead = target_idx - today_idx;
    if ahead <= 0 {
        ahead += 7;
    }
    today + Days::new(ahead as u64)
}

/// A month-day with no year rolls forward past `today`
fn roll_forward(today: NaiveDate, month: u32, day: u32, year: Option<i32>) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(this_year)
    }
}

/// Resolve a phrase that is expected to be a date expression.
///
/// Returns `None` when the phrase is not recognizable as a date.
pub fn resolve_phrase(phrase: &str, today: NaiveDate) -> Option<ResolvedDate> {
    let cleaned = ORDINAL_SUFFIX.replace_all(phrase.trim(), "$1");
    let lower = cleaned.to_lowercase();
    let lower = lower.trim();

    if lower.is_empty() {
        return None;
    }

    if lower == "today" {
        return Some(ResolvedDate::new(today));
    }
    if lower == "tomorrow" {
        return Some(ResolvedDate::new(today + Days::new(1)));
    }
    if lower.contains("next week") {
        return Some(ResolvedDate::new(today + Days::new(7)));
    }
    if let Some(day_name) = lower.strip_prefix("next ") {
        let target = weekday_from_name(day_name.trim())?;
        return Some(ResolvedDate::new(upcoming_weekday(today, target)));
    }
    if let Some(target) = weekday_from_name(lower) {
        return Some(ResolvedDate::new(upcoming_weekday(today, target)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(lower, "%Y-%m-%d") {
        return Some(ResolvedDate::new(date));
    }

    if let Some(caps) = MONTH_DAY.captures(lower) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        return roll_forward(today, month, day, year).map(ResolvedDate::new);
    }

    if let Some(caps) = DAY_MONTH.captures(lower) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        return roll_forward(today, month, day, year).map(ResolvedDate::new);
    }

    if let Some(caps) = SLASH_DATE.captures(lower) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: Option<i32> = caps.get(3).and_then(|y| y.as_str().parse().ok());
        // Month-first order takes priority; fall back to day-first
        let (month, day) = if (1..=12).contains(&first) {
            (first, second)
        } else if (1..=12).contains(&second) {
            (second, first)
        } else {
            return None;
        };
        return roll_forward(today, month, day, year).map(ResolvedDate::new);
    }

    None
}

/// Scan a whole user message for a date expression.
pub fn scan_message(text: &str, today: NaiveDate) -> DateSignal {
    let cleaned = ORDINAL_SUFFIX.replace_all(text, "$1");

    // A message that is nothing but a date phrase resolves directly
    if let Some(resolved) = resolve_phrase(&cleaned, today) {
        return DateSignal::Resolved(resolved);
    }

    for re in [&*RELATIVE, &*ISO_DATE, &*MONTH_DAY, &*DAY_MONTH, &*SLASH_DATE] {
        if let Some(m) = re.find(&cleaned) {
            let phrase = m.as_str();
            return match resolve_phrase(phrase, today) {
                Some(resolved) => DateSignal::Resolved(resolved),
                None => DateSignal::Unparseable(phrase.to_string()),
            };
        }
    }

    DateSignal::NotSpecified
}
