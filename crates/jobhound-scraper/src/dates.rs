//! Posting-date parsing: relative phrases and ISO attributes.

use chrono::{DateTime, Days, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*(second|sec|minute|min|hour|hr|day|week|wk|month|mo|year|yr)s?\b")
        .expect("static regex is valid")
});

/// Convert text like "3 days ago", "Reposted 1 week ago" or "30+ days ago"
/// into a date relative to `today`.
pub fn parse_relative(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();
    if ["just now", "moments ago", "today", "few seconds"]
        .iter()
        .any(|p| lowered.contains(p))
    {
        return Some(today);
    }
    if lowered.contains("yesterday") {
        return today.checked_sub_days(Days::new(1));
    }

    let caps = RELATIVE.captures(&lowered)?;
    let amount: u32 = caps[1].parse().ok()?;
    match &caps[2] {
        "second" | "sec" | "minute" | "min" | "hour" | "hr" => Some(today),
        "day" => today.checked_sub_days(Days::new(u64::from(amount))),
        "week" | "wk" => today.checked_sub_days(Days::new(u64::from(amount) * 7)),
        "month" | "mo" => today.checked_sub_months(Months::new(amount)),
        "year" | "yr" => today.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => None,
    }
}

/// Parse a `datetime` attribute: a plain date or an RFC 3339 timestamp.
pub fn parse_iso(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Prefer the machine-readable attribute, fall back to the visible text.
pub fn parse_posted(attribute: Option<&str>, text: Option<&str>, today: NaiveDate) -> Option<NaiveDate> {
    attribute
        .and_then(parse_iso)
        .or_else(|| text.and_then(|t| parse_relative(t, today)))
}
