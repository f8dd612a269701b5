//! Hotel reservation extraction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{confidence, ExtractedField, ExtractionContext};
use crate::text::{normalize_name, parse_flexible_date};

/// Fields recognized from a hotel reservation or booking confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelFields {
    pub guest_name: ExtractedField<String>,
    pub hotel_name: ExtractedField<String>,
    pub hotel_address: ExtractedField<String>,
    pub hotel_city: ExtractedField<String>,
    pub confirmation_number: ExtractedField<String>,
    pub check_in: ExtractedField<NaiveDate>,
    pub check_out: ExtractedField<NaiveDate>,
    /// Whole nights between check-in and check-out; derived, not read.
    pub nights: Option<i64>,
}

const DATE_PAT: &str =
    r"(\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4}|\d{1,2}[/\-.]\d{1,2}[/\-.]\d{4}|\d{4}-\d{2}-\d{2})";

static GUEST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:GUEST\s*NAME|GUEST|CLIENT|NOM\s*DU\s*CLIENT|RESERVED\s*FOR|BOOKED\s*BY)\s*[:.]?\s*([A-Z][A-Za-z'\- ]+)")
        .unwrap()
});

static HOTEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:HOTEL|HÔTEL|RESIDENCE|GUEST\s*HOUSE)\s*[:.]?\s+([A-Z][A-Za-z'\- ]+)").unwrap()
});

/// Name line ending in "HOTEL", e.g. `SOFITEL ABIDJAN HOTEL IVOIRE`.
static NAME_THEN_HOTEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][A-Za-z'\- ]+(?:HOTEL|HÔTEL)[A-Za-z'\- ]*)").unwrap());

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ADDRESS|ADRESSE|LOCATION)\s*[:.]?\s*([A-Za-z0-9'\-, ]+)").unwrap()
});

static CITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:CITY|VILLE)\s*[:.]?\s*([A-Za-z'\- ]+)").unwrap()
});

static CONFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:CONFIRMATION|BOOKING|RESERVATION)\s*(?:NO|NUMBER|N|REF(?:ERENCE)?)?\s*[°:.#]?\s*([A-Z0-9\-]{5,14})\b")
        .unwrap()
});

static CHECK_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:CHECK[\- ]?IN|ARRIVAL|ARRIVEE|DATE\s*D'ARRIVEE)\s*(?:DATE)?\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

static CHECK_OUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:CHECK[\- ]?OUT|DEPARTURE|DEPART|DATE\s*DE\s*DEPART)\s*(?:DATE)?\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

/// Guest-name captures stop at these label words when lines were merged.
const STOPWORDS: &[&str] = &[
    "CHECK", "ARRIVAL", "DEPARTURE", "ROOM", "HOTEL", "CONFIRMATION", "RESERVATION", "BOOKING",
    "DATE", "NIGHTS",
];

fn cut_at_stopwords(value: &str) -> String {
    let mut kept = Vec::new();
    for word in value.split_whitespace() {
        if STOPWORDS.contains(&word.to_uppercase().as_str()) {
            break;
        }
        kept.push(word);
    }
    kept.join(" ")
}

/// Extract hotel reservation fields from recognized text.
pub fn extract(raw_text: &str, _ctx: &ExtractionContext<'_>) -> HotelFields {
    let mut fields = HotelFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }
    let upper = raw_text.to_uppercase();

    fields.guest_name = ExtractedField::from_option(
        GUEST_NAME
            .captures(&upper)
            .map(|c| normalize_name(&cut_at_stopwords(c[1].trim())))
            .filter(|n| n.len() > 3),
        confidence::LABELED,
    );

    fields.hotel_name = ExtractedField::from_option(
        HOTEL_NAME
            .captures_iter(&upper)
            .filter_map(|c| {
                let cut = cut_at_stopwords(c[1].trim());
                (cut.len() > 2).then(|| format!("HOTEL {cut}"))
            })
            .next()
            .or_else(|| {
                NAME_THEN_HOTEL
                    .captures(&upper)
                    .map(|c| c[1].trim().to_string())
                    .filter(|n| n.len() > 8)
            }),
        confidence::CONTEXTUAL,
    );

    fields.hotel_address = ExtractedField::from_option(
        ADDRESS.captures(&upper).map(|c| c[1].trim().to_string()),
        confidence::LABELED,
    );

    fields.hotel_city = ExtractedField::from_option(
        CITY.captures(&upper)
            .map(|c| normalize_name(c[1].trim()))
            .or_else(|| {
                // Fall back to the address tail: `..., ABIDJAN`.
                fields
                    .hotel_address
                    .value
                    .as_deref()
                    .and_then(|a| a.rsplit(',').next())
                    .map(|c| normalize_name(c.trim()))
            })
            .filter(|c| !c.is_empty()),
        confidence::CONTEXTUAL,
    );

    // Label words like "RESERVATION CONFIRMATION" satisfy the pattern
    // shape; a real confirmation number carries at least one digit.
    fields.confirmation_number = ExtractedField::from_option(
        CONFIRMATION
            .captures_iter(&upper)
            .map(|c| c[1].to_string())
            .find(|v| v.chars().any(|ch| ch.is_ascii_digit())),
        confidence::LABELED,
    );

    fields.check_in = ExtractedField::from_option(
        CHECK_IN.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );
    fields.check_out = ExtractedField::from_option(
        CHECK_OUT.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );

    if let (Some(check_in), Some(check_out)) = (fields.check_in.value, fields.check_out.value) {
        fields.nights = Some((check_out - check_in).num_days());
    }

    fields
}

pub fn missing_fields(fields: &HotelFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.guest_name.is_present() {
        missing.push("guest_name");
    }
    if !fields.hotel_name.is_present() {
        missing.push("hotel_name");
    }
    if !fields.check_in.is_present() {
        missing.push("check_in");
    }
    missing
}

pub fn has_required_fields(fields: &HotelFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks; missing fields fail closed.
pub fn validate(fields: &HotelFields, ctx: &ExtractionContext<'_>) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();

    checks.insert(
        "dates_ordered".to_string(),
        matches!(
            (fields.check_in.value, fields.check_out.value),
            (Some(ci), Some(co)) if co >= ci
        ),
    );
    checks.insert(
        "city_in_destination".to_string(),
        fields
            .hotel_city
            .value
            .as_deref()
            .is_some_and(|c| ctx.reference.jurisdiction.is_destination_city(c)),
    );

    checks
}
