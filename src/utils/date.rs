// src/utils/date.rs

//! Indonesian publish-date parsing.
//!
//! News sites render dates like "Senin, 05 Mei 2025 10:30 WIB" or
//! "Kamis, 16 Mei 2024 | 17:35". Everything is normalized to a
//! timezone-naive instant; missing time components default to midnight.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// "DD <month-name> YYYY [HH:MM[:SS]]" with arbitrary decoration, compiled
/// once; sits on the per-article extraction path.
fn named_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)(\d{1,2})\s+([[:alpha:]]+)\s+(\d{4})(?:\D{0,5}(\d{1,2})[:.](\d{2})(?:[:.](\d{2}))?)?",
            )
            .ok()
        })
        .as_ref()
}

fn numeric_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})(?:\D{0,5}(\d{1,2})[:.](\d{2}))?").ok()
        })
        .as_ref()
}

/// Map an Indonesian or English month name (full or three-letter) to 1..=12.
fn month_number(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    let full = match token.as_str() {
        "januari" | "january" => Some(1),
        "februari" | "february" => Some(2),
        "maret" | "march" => Some(3),
        "april" => Some(4),
        "mei" | "may" => Some(5),
        "juni" | "june" => Some(6),
        "juli" | "july" => Some(7),
        "agustus" | "august" => Some(8),
        "september" => Some(9),
        "oktober" | "october" => Some(10),
        "november" => Some(11),
        "desember" | "december" => Some(12),
        _ => None,
    };
    if full.is_some() {
        return full;
    }

    match token.get(..3)? {
        "jan" => Some(1),
        "feb" | "peb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "mei" | "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "agu" | "aug" => Some(8),
        "sep" => Some(9),
        "okt" | "oct" => Some(10),
        "nov" | "nop" => Some(11),
        "des" | "dec" => Some(12),
        _ => None,
    }
}

/// Parse a site-rendered date string into a naive instant.
///
/// Accepts "DD <month-name> YYYY [HH:MM[:SS]]" with arbitrary day-name and
/// timezone-label decoration, and "DD/MM/YYYY [HH:MM]" as a fallback.
/// Returns `None` when no date can be recognized.
pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    if let Some(caps) = named_pattern()?.captures(raw) {
        if let Some(month) = month_number(caps.get(2)?.as_str()) {
            let day: u32 = caps.get(1)?.as_str().parse().ok()?;
            let year: i32 = caps.get(3)?.as_str().parse().ok()?;
            let hour: u32 = caps.get(4).map_or(Some(0), |m| m.as_str().parse().ok())?;
            let minute: u32 = caps.get(5).map_or(Some(0), |m| m.as_str().parse().ok())?;
            let second: u32 = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;
            return NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second);
        }
    }

    if let Some(caps) = numeric_pattern()?.captures(raw) {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        let hour: u32 = caps.get(4).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let minute: u32 = caps.get(5).map_or(Some(0), |m| m.as_str().parse().ok())?;
        return NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0);
    }

    None
}
