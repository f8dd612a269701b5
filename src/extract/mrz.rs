//! ICAO 9303 machine-readable zone: TD3 parsing and check digits.
//!
//! A TD3 MRZ is two 44-character lines. Line 1 carries the document-type
//! code, issuing state and name (`SURNAME<<GIVEN<NAMES`, `<` as filler).
//! Line 2 carries document number, nationality, birth date, sex, expiry
//! date and personal number, each protected by a check digit, plus a
//! composite digit over the data-bearing spans of the line.
//!
//! Check digits: map digits to their value, `A`–`Z` to 10–35, filler `<`
//! to 0; multiply by the repeating weights `7, 3, 1` aligned to the start
//! of the field; sum; take modulo 10.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TD3_LINE_LEN: usize = 44;

/// Numeric value of one MRZ character.
fn char_value(c: char) -> u32 {
    match c {
        '0'..='9' => c as u32 - '0' as u32,
        'A'..='Z' => c as u32 - 'A' as u32 + 10,
        _ => 0,
    }
}

/// ICAO 9303 check digit of a field.
pub fn check_digit(field: &str) -> u32 {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    field
        .chars()
        .enumerate()
        .map(|(i, c)| char_value(c.to_ascii_uppercase()) * WEIGHTS[i % 3])
        .sum::<u32>()
        % 10
}

/// Whether `digit` is a valid printed check digit for `field`. The filler
/// `<` stands for 0 in optional fields.
fn digit_matches(field: &str, digit: char) -> bool {
    let expected = match digit {
        '0'..='9' => digit as u32 - '0' as u32,
        '<' => 0,
        _ => return false,
    };
    check_digit(field) == expected
}

/// Per-field check digit outcomes of a TD3 line 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrzChecksums {
    pub document_number: bool,
    pub birth_date: bool,
    pub expiry_date: bool,
    pub personal_number: bool,
    pub composite: bool,
}

impl MrzChecksums {
    pub fn all_valid(&self) -> bool {
        self.document_number
            && self.birth_date
            && self.expiry_date
            && self.personal_number
            && self.composite
    }
}

/// A parsed TD3 machine-readable zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Td3 {
    pub line1: String,
    pub line2: String,
    pub document_type: char,
    pub document_subtype: char,
    pub issuing_state: String,
    pub surname: String,
    pub given_names: String,
    pub document_number: String,
    pub nationality: String,
    /// Raw `YYMMDD` as printed; century resolution happens later.
    pub birth_date_raw: String,
    pub sex: char,
    pub expiry_date_raw: String,
    pub personal_number: String,
}

impl Td3 {
    /// Parse two normalized 44-character lines. Returns `None` when either
    /// line has the wrong length or line 1 does not start with a known
    /// document-type character.
    pub fn parse(line1: &str, line2: &str) -> Option<Td3> {
        if line1.len() != TD3_LINE_LEN || line2.len() != TD3_LINE_LEN {
            return None;
        }
        if !line1.is_ascii() || !line2.is_ascii() {
            return None;
        }

        let mut c1 = line1.chars();
        let document_type = c1.next()?;
        let document_subtype = c1.next()?;
        if !matches!(document_type, 'P' | 'D' | 'S' | 'O' | 'L' | 'U' | 'A') {
            return None;
        }

        let issuing_state = line1[2..5].trim_end_matches('<').to_string();
        let name_field = &line1[5..TD3_LINE_LEN];
        let (surname, given_names) = match name_field.split_once("<<") {
            Some((s, g)) => (unfill(s), unfill(g)),
            None => (unfill(name_field), String::new()),
        };

        Some(Td3 {
            line1: line1.to_string(),
            line2: line2.to_string(),
            document_type,
            document_subtype,
            issuing_state,
            surname,
            given_names,
            document_number: line2[0..9].trim_end_matches('<').to_string(),
            nationality: line2[10..13].trim_end_matches('<').to_string(),
            birth_date_raw: line2[13..19].to_string(),
            sex: line2.as_bytes()[20] as char,
            expiry_date_raw: line2[21..27].to_string(),
            personal_number: line2[28..42].trim_end_matches('<').to_string(),
        })
    }

    /// Verify every check digit in line 2, including the composite digit
    /// over positions 1–10, 14–20 and 22–43.
    pub fn verify_checksums(&self) -> MrzChecksums {
        let l2 = &self.line2;
        let digit_at = |i: usize| l2.as_bytes()[i] as char;

        let composite_input =
            format!("{}{}{}", &l2[0..10], &l2[13..20], &l2[21..43]);

        MrzChecksums {
            document_number: digit_matches(&l2[0..9], digit_at(9)),
            birth_date: digit_matches(&l2[13..19], digit_at(19)),
            expiry_date: digit_matches(&l2[21..27], digit_at(27)),
            personal_number: digit_matches(&l2[28..42], digit_at(42)),
            composite: digit_matches(&composite_input, digit_at(43)),
        }
    }
}

/// Replace filler with spaces and trim.
fn unfill(field: &str) -> String {
    field.replace('<', " ").trim().to_string()
}

/// Which century window applies to a `YYMMDD` MRZ date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MrzDateKind {
    /// Always in the past.
    Birth,
    /// May run up to ~15 years ahead of today.
    Expiry,
}

/// Resolve a raw `YYMMDD` MRZ date against the validation clock.
pub fn mrz_date(raw: &str, kind: MrzDateKind, today: NaiveDate) -> Option<NaiveDate> {
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let day: u32 = raw[4..6].parse().ok()?;

    let current_year = today.year();
    let current_yy = current_year % 100;

    let year = match kind {
        MrzDateKind::Birth => {
            let mut y = if yy > current_yy { 1900 + yy } else { 2000 + yy };
            if y > current_year {
                y -= 100;
            }
            y
        }
        MrzDateKind::Expiry => {
            let y = 2000 + yy;
            if y > current_year + 15 {
                1900 + yy
            } else {
                y
            }
        }
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

// ── MRZ line recovery from recognized text ──────────────────────────────

/// Characters OCR commonly substitutes for the `<` filler.
fn repair_filler(c: char) -> char {
    match c {
        '|' | '/' | '\\' | '[' | ']' | '{' | '}' => '<',
        other => other,
    }
}

/// Line-2 shape, used by the collapsed-text fallback when line breaks were
/// lost in recognition.
static LINE2_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z0-9<]{9}[0-9<][A-Z<]{3}[0-9]{6}[0-9][MFX<][0-9]{6}[0-9][A-Z0-9<]{14}[0-9<][0-9]")
        .unwrap()
});

static LINE1_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[PDSOLUA][A-Z<][A-Z]{3}[A-Z<]{39}").unwrap());

/// Locate the two TD3 lines inside raw recognized text.
///
/// First pass treats each input line separately: uppercase, drop spaces,
/// repair filler confusions, and accept runs of MRZ characters around the
/// nominal 44. Second pass collapses all whitespace and searches for the
/// positional line patterns, for recognizers that merged the lines.
pub fn find_mrz_lines(text: &str) -> Option<(String, String)> {
    let mut candidates = Vec::new();
    for raw_line in text.lines() {
        let cleaned: String = raw_line
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| repair_filler(c.to_ascii_uppercase()))
            .collect();
        let len = cleaned.chars().count();
        if (40..=48).contains(&len)
            && cleaned.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '<')
            && cleaned.contains('<')
        {
            candidates.push(cleaned);
        }
    }

    let first = candidates.iter().position(|l| {
        let mut chars = l.chars();
        matches!(chars.next(), Some('P' | 'D' | 'S' | 'O' | 'L' | 'U' | 'A')) && l.contains("<<")
    });
    if let Some(i) = first {
        if let Some(line2) = candidates.get(i + 1) {
            return Some((pad_line(&candidates[i]), pad_line(line2)));
        }
    }

    // Fallback: recognizer lost the line structure.
    let collapsed: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| repair_filler(c.to_ascii_uppercase()))
        .collect();
    let l1 = LINE1_PATTERN.find(&collapsed)?;
    let l2 = LINE2_PATTERN.find(&collapsed[l1.end()..])?;
    Some((
        pad_line(l1.as_str()),
        pad_line(l2.as_str()),
    ))
}

/// Force a candidate line to exactly 44 characters: strip non-MRZ
/// characters, truncate overruns, pad underruns with filler.
fn pad_line(line: &str) -> String {
    let mut out: String = line
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '<')
        .take(TD3_LINE_LEN)
        .collect();
    while out.len() < TD3_LINE_LEN {
        out.push('<');
    }
    out
}
