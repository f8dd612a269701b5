//! Date parsing for recognized document text.
//!
//! Documents in one dossier mix ISO dates, European `DD/MM/YYYY`, airline
//! `28/Dec/2025`, Ethiopian-issued `22 AUG 95` and raw MRZ `YYMMDD`. Every
//! extractor funnels date strings through [`parse_flexible_date`].

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static DMY_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})$").unwrap());

static YMD_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})$").unwrap());

static DMY_SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2})$").unwrap());

/// `15 JAN 2025`, `15 JANUARY 2025`, `28/Dec/2025`.
static DAY_MONTHNAME_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[\s/\-]+([A-Za-z]{3,9})[\s/\-,]+(\d{4})$").unwrap()
});

/// `22 AUG 95` — short year, common on Ethiopian passports.
static DAY_MONTHNAME_SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[\s/\-]+([A-Za-z]{3,9})[\s/\-]+(\d{2})$").unwrap());

/// `JAN 15, 2025`.
static MONTHNAME_DAY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{3,9})[\s/\-]+(\d{1,2}),?\s+(\d{4})$").unwrap());

static COMPACT_YMD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap());

static COMPACT_SHORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})(\d{2})$").unwrap());

/// Month name (English or French, full or abbreviated) to month number.
fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_uppercase().chars().take(4).collect();
    let n = match prefix.as_str() {
        s if s.starts_with("JAN") => 1,
        s if s.starts_with("FEV") || s.starts_with("FEB") => 2,
        s if s.starts_with("MAR") => 3,
        s if s.starts_with("AVR") || s.starts_with("APR") => 4,
        s if s.starts_with("MAI") || s.starts_with("MAY") => 5,
        "JUIN" => 6,
        s if s.starts_with("JUN") => 6,
        "JUIL" => 7,
        s if s.starts_with("JUL") => 7,
        s if s.starts_with("AOU") || s.starts_with("AUG") => 8,
        s if s.starts_with("SEP") => 9,
        s if s.starts_with("OCT") => 10,
        s if s.starts_with("NOV") => 11,
        s if s.starts_with("DEC") => 12,
        _ => return None,
    };
    Some(n)
}

/// Two-digit years on travel documents: `00–40` are 2000s (expiry dates run
/// ahead of today), `41–99` are 1900s (birth dates).
fn expand_short_year(yy: i32) -> i32 {
    if yy <= 40 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Parse a recognized date string in any of the formats that occur on the
/// supported documents. Returns `None` for anything unparsable — callers
/// treat a missing date as an absent field, never as an error.
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(c) = ISO_DATE.captures(trimmed) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Some(c) = DMY_NUMERIC.captures(trimmed) {
        return ymd(&c[3], &c[2], &c[1]);
    }
    if let Some(c) = YMD_NUMERIC.captures(trimmed) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Some(c) = DAY_MONTHNAME_YEAR.captures(trimmed) {
        let month = month_number(&c[2])?;
        let year: i32 = c[3].parse().ok()?;
        let day: u32 = c[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = DAY_MONTHNAME_SHORT_YEAR.captures(trimmed) {
        let month = month_number(&c[2])?;
        let year = expand_short_year(c[3].parse().ok()?);
        let day: u32 = c[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = MONTHNAME_DAY_YEAR.captures(trimmed) {
        let month = month_number(&c[1])?;
        let year: i32 = c[3].parse().ok()?;
        let day: u32 = c[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = DMY_SHORT_YEAR.captures(trimmed) {
        let year = expand_short_year(c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, c[2].parse().ok()?, c[1].parse().ok()?);
    }
    if let Some(c) = COMPACT_YMD.captures(trimmed) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Some(c) = COMPACT_SHORT.captures(trimmed) {
        let year = expand_short_year(c[1].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, c[2].parse().ok()?, c[3].parse().ok()?);
    }

    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}
