//! Date resolution for scraped listings.
//!
//! Sources publish dates as ISO 8601 timestamps, RFC 2822 feed dates,
//! "March 7, 2025", "Mar 5" (no year) or "2 days ago". Structured formats are
//! always tried before the free-text heuristics, and a date without a year
//! always takes the processing year.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

/// First day of the aggregation effort; the default start of every window.
pub fn epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

lazy_static! {
    static ref MONTH_DAY_YEAR: Regex = Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4}))?"
    )
    .expect("month-day pattern");
    static ref DAY_MONTH_YEAR: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\s+(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+(\d{4})\b"
    )
    .expect("day-month pattern");
    static ref RELATIVE: Regex = Regex::new(
        r"(?i)\b(\d+|an?|one)\s+(second|sec|minute|min|hour|hr|day|week|month|year)s?\s+ago\b"
    )
    .expect("relative pattern");
    static ref ISO_DATE: Regex = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso pattern");
}

/// Inclusive `[from, to]` calendar range an ingestion run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::Config(format!(
                "window start {} is after its end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// From the epoch start up to and including `today`.
    pub fn until(today: NaiveDate) -> Self {
        let from = epoch_start().min(today);
        Self { from, to: today }
    }

    /// Inclusive on both ends; a missing date is never in range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        in_range(date, self.from, self.to)
    }

    /// Every calendar day of the window, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    /// `YYYY-MM` keys for every month the window touches.
    pub fn months(&self) -> Vec<String> {
        let mut months = Vec::new();
        let mut current = self.from.with_day(1).unwrap_or(self.from);
        while current <= self.to {
            months.push(current.format("%Y-%m").to_string());
            match current.checked_add_months(Months::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }
        months
    }
}

/// Inclusive containment check shared by every extractor.
pub fn in_range(date: Option<NaiveDate>, from: NaiveDate, to: NaiveDate) -> bool {
    match date {
        Some(d) => from <= d && d <= to,
        None => false,
    }
}

/// Parses heterogeneous date strings relative to a fixed processing day.
#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    today: NaiveDate,
}

impl DateResolver {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Returns `None` for anything it cannot read; never panics.
    pub fn resolve(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        parse_structured(text)
            .or_else(|| self.parse_relative(text))
            .or_else(|| self.parse_month_day(text))
            .or_else(|| parse_day_month(text))
            .or_else(|| parse_embedded_iso(text))
    }

    fn parse_relative(&self, text: &str) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        match lower.as_str() {
            "today" | "just now" => return Some(self.today),
            "yesterday" => return self.today.pred_opt(),
            _ => {}
        }

        let caps = RELATIVE.captures(&lower)?;
        let amount: u32 = match &caps[1] {
            "a" | "an" | "one" => 1,
            n => n.parse().ok()?,
        };
        match &caps[2] {
            "second" | "sec" | "minute" | "min" | "hour" | "hr" => Some(self.today),
            "day" => self.today.checked_sub_signed(Duration::days(amount as i64)),
            "week" => self.today.checked_sub_signed(Duration::weeks(amount as i64)),
            "month" => self.today.checked_sub_months(Months::new(amount)),
            "year" => self.today.checked_sub_months(Months::new(amount.checked_mul(12)?)),
            _ => None,
        }
    }

    fn parse_month_day(&self, text: &str) -> Option<NaiveDate> {
        let caps = MONTH_DAY_YEAR.captures(text)?;
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => y.as_str().parse().ok()?,
            None => self.today.year(),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

fn parse_structured(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(d);
        }
    }
    None
}

fn parse_day_month(text: &str) -> Option<NaiveDate> {
    let caps = DAY_MONTH_YEAR.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_embedded_iso(text: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> DateResolver {
        DateResolver::new(date(2025, 3, 10))
    }

    #[test]
    fn test_resolves_iso_timestamps() {
        let r = resolver();
        assert_eq!(r.resolve("2025-01-05T10:30:00Z"), Some(date(2025, 1, 5)));
        assert_eq!(r.resolve("2025-01-05T23:30:00-05:00"), Some(date(2025, 1, 5)));
        assert_eq!(r.resolve("2025-01-05T10:30:00.123"), Some(date(2025, 1, 5)));
        assert_eq!(r.resolve("2024-06-01"), Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_resolves_rfc2822() {
        let r = resolver();
        assert_eq!(r.resolve("Wed, 05 Feb 2025 14:00:00 GMT"), Some(date(2025, 2, 5)));
        assert_eq!(r.resolve("Sun, 2 Mar 2025 08:15:00 +0000"), Some(date(2025, 3, 2)));
    }

    #[test]
    fn test_resolves_long_form() {
        let r = resolver();
        assert_eq!(r.resolve("March 7, 2025"), Some(date(2025, 3, 7)));
        assert_eq!(r.resolve("Sept 30, 2024"), Some(date(2024, 9, 30)));
        assert_eq!(r.resolve("7 March 2025"), Some(date(2025, 3, 7)));
        assert_eq!(
            r.resolve("March 7, 2025Mar 7, 2025 | Article: 6 minute read"),
            Some(date(2025, 3, 7))
        );
    }

    #[test]
    fn test_missing_year_takes_processing_year() {
        let r = resolver();
        assert_eq!(r.resolve("Mar 5"), Some(date(2025, 3, 5)));
        assert_eq!(r.resolve("Dec 24"), Some(date(2025, 12, 24)));

        let next_year = DateResolver::new(date(2026, 1, 2));
        assert_eq!(next_year.resolve("Mar 5"), Some(date(2026, 3, 5)));
    }

    #[test]
    fn test_resolves_relative_phrases() {
        let r = resolver();
        assert_eq!(r.resolve("2 days ago"), Some(date(2025, 3, 8)));
        assert_eq!(r.resolve("a week ago"), Some(date(2025, 3, 3)));
        assert_eq!(r.resolve("5 hours ago"), Some(date(2025, 3, 10)));
        assert_eq!(r.resolve("1 month ago"), Some(date(2025, 2, 10)));
        assert_eq!(r.resolve("Yesterday"), Some(date(2025, 3, 9)));
        assert_eq!(r.resolve("today"), Some(date(2025, 3, 10)));
    }

    #[test]
    fn test_unparseable_yields_none() {
        let r = resolver();
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve("   "), None);
        assert_eq!(r.resolve("not a date"), None);
        assert_eq!(r.resolve("February 30, 2025"), None);
        assert_eq!(r.resolve("Read more"), None);
    }

    #[test]
    fn test_in_range_is_inclusive() {
        let from = date(2025, 1, 1);
        let to = date(2025, 1, 31);
        assert!(in_range(Some(from), from, to));
        assert!(in_range(Some(to), from, to));
        assert!(in_range(Some(date(2025, 1, 5)), from, to));
        assert!(!in_range(Some(date(2024, 6, 1)), from, to));
        assert!(!in_range(Some(date(2025, 2, 1)), from, to));
        assert!(!in_range(None, from, to));
    }

    #[test]
    fn test_window_days_and_months() {
        let window = DateWindow::new(date(2025, 1, 30), date(2025, 3, 2)).unwrap();
        assert_eq!(window.days().count(), 32);
        assert_eq!(window.days().next(), Some(date(2025, 1, 30)));
        assert_eq!(window.months(), vec!["2025-01", "2025-02", "2025-03"]);

        assert!(DateWindow::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());

        let default = DateWindow::until(date(2025, 3, 10));
        assert_eq!(default.from, date(2025, 1, 1));
        assert_eq!(default.to, date(2025, 3, 10));
    }
}
