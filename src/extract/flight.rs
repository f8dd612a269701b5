//! Flight ticket extraction.
//!
//! E-tickets from the carriers serving the region share enough structure to
//! extract segments generically: an airline designator plus flight number,
//! IATA airport codes (usually parenthesized), and one date per segment.
//! A later segment flying the main route in reverse marks the ticket as
//! round trip.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{confidence, ExtractedField, ExtractionContext};
use crate::text::parse_flexible_date;

/// Airlines commonly seen on tickets submitted to this post.
const AIRLINES: &[(&str, &str)] = &[
    ("ET", "Ethiopian Airlines"),
    ("KQ", "Kenya Airways"),
    ("AF", "Air France"),
    ("TK", "Turkish Airlines"),
    ("EK", "Emirates"),
    ("QR", "Qatar Airways"),
    ("LH", "Lufthansa"),
    ("BA", "British Airways"),
    ("KL", "KLM"),
    ("MS", "EgyptAir"),
    ("WB", "RwandAir"),
    ("HF", "Air Cote d'Ivoire"),
    ("W3", "ASKY Airlines"),
];

/// Major hubs outside the jurisdiction that appear on connecting tickets.
const KNOWN_HUBS: &[&str] = &["CDG", "ORY", "LHR", "AMS", "FRA", "IST", "DXB", "DOH", "JFK", "CAI"];

fn airline_name(code: &str) -> Option<&'static str> {
    AIRLINES.iter().find(|(c, _)| *c == code).map(|(_, n)| *n)
}

/// One flight segment as printed on the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSegment {
    pub airline_code: String,
    pub airline_name: Option<String>,
    pub flight_number: String,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_date: Option<NaiveDate>,
}

/// Fields recognized from a flight ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightTicketFields {
    /// `SURNAME/GIVEN NAMES` airline convention, kept as printed.
    pub passenger_name: ExtractedField<String>,
    pub airline: ExtractedField<String>,
    pub flight_number: ExtractedField<String>,
    pub departure_airport: ExtractedField<String>,
    pub arrival_airport: ExtractedField<String>,
    pub departure_date: ExtractedField<NaiveDate>,
    /// Arrival of the main (inbound) flight; same day as departure unless
    /// the ticket states otherwise.
    pub arrival_date: ExtractedField<NaiveDate>,
    pub booking_reference: ExtractedField<String>,
    pub ticket_number: ExtractedField<String>,
    pub segments: Vec<FlightSegment>,
    pub is_round_trip: bool,
    pub return_flight: Option<FlightSegment>,
}

// ── Patterns ────────────────────────────────────────────────────────────

static FLIGHT_DESIGNATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9])\s?(\d{3,4})\b").unwrap());

static PAREN_AIRPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([A-Z]{3})\)").unwrap());

static BARE_AIRPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{3})\b").unwrap());

static SEGMENT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}[/\-][A-Za-z]{3}[/\-]\d{4}|\d{1,2}\s+[A-Z]{3,9}\s+\d{4}|\d{1,2}[/\-.]\d{1,2}[/\-.]\d{4})")
        .unwrap()
});

static PASSENGER_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:PASSENGER\s*NAME(?:\s*/\s*NOM\s*DU\s*PASSAGER)?|NOM\s*DU\s*PASSAGER|PASSENGER|PASSAGER)\s*:?\s*([A-Z][A-Z'\- ]*/[A-Z][A-Z'\- ]+)",
    )
    .unwrap()
});

static PASSENGER_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,}/[A-Z][A-Z ]+)\b").unwrap());

static TRAILING_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(?:MR|MRS|MS|MLLE|MME)\.?\s*$").unwrap());

static BOOKING_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:BOOKING\s*(?:REF(?:ERENCE)?|NO)|PNR|CONFIRMATION|RESERVATION|DOSSIER|REF(?:ERENCE)?)\s*[:#]?\s*([A-Z0-9]{5,8})\b",
    )
    .unwrap()
});

static TICKET_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:E-?TICKET|ETKT|TICKET|BILLET)\s*(?:NO|NUMBER)?\s*[:#]?\s*(\d{3}[\- ]?\d{10})")
        .unwrap()
});

static FLIGHT_NUMBER_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]\d{3,4}$").unwrap());

/// "ISSUE DATE" lines must not be mistaken for travel dates.
static ISSUE_DATE_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ISSUE\s*DATE|DATE\s*OF\s*ISSUE|EMISSION").unwrap());

// ── Extraction ──────────────────────────────────────────────────────────

fn extract_passenger_name(upper: &str) -> Option<String> {
    let raw = PASSENGER_LABELED
        .captures(upper)
        .or_else(|| PASSENGER_BARE.captures(upper))
        .map(|c| c[1].trim().to_string())?;
    let cleaned = TRAILING_TITLE.replace(&raw, "").trim().to_string();
    if cleaned.len() > 3 {
        Some(cleaned)
    } else {
        None
    }
}

fn known_airport(code: &str, ctx: &ExtractionContext<'_>) -> bool {
    let j = &ctx.reference.jurisdiction;
    j.is_destination_airport(code) || j.is_jurisdiction_airport(code) || KNOWN_HUBS.contains(&code)
}

/// Slice the text at each flight designator and read one segment per slice.
fn extract_segments(upper: &str, ctx: &ExtractionContext<'_>) -> Vec<FlightSegment> {
    let designators: Vec<_> = FLIGHT_DESIGNATOR
        .captures_iter(upper)
        .filter(|c| airline_name(&c[1]).is_some())
        .collect();

    let mut segments = Vec::new();
    for (i, cap) in designators.iter().enumerate() {
        let start = cap.get(0).unwrap().start();
        let end = designators
            .get(i + 1)
            .map(|next| next.get(0).unwrap().start())
            .unwrap_or(upper.len());
        let slice = &upper[start..end];

        let code = cap[1].to_string();
        let mut segment = FlightSegment {
            airline_name: airline_name(&code).map(|s| s.to_string()),
            flight_number: format!("{}{}", &code, &cap[2]),
            airline_code: code,
            departure_airport: None,
            arrival_airport: None,
            departure_date: None,
        };

        let airports: Vec<String> = PAREN_AIRPORT
            .captures_iter(slice)
            .map(|c| c[1].to_string())
            .collect();
        match airports.len() {
            0 => {
                // No parenthesized codes: fall back to known bare codes.
                let bare: Vec<String> = BARE_AIRPORT
                    .captures_iter(slice)
                    .map(|c| c[1].to_string())
                    .filter(|c| known_airport(c, ctx))
                    .collect();
                if bare.len() >= 2 {
                    segment.departure_airport = Some(bare[0].clone());
                    segment.arrival_airport = Some(bare[1].clone());
                } else if bare.len() == 1 {
                    segment.arrival_airport = Some(bare[0].clone());
                }
            }
            1 => segment.arrival_airport = Some(airports[0].clone()),
            _ => {
                segment.departure_airport = Some(airports[0].clone());
                segment.arrival_airport = Some(airports[1].clone());
            }
        }

        // First travel date in the slice, skipping issue-date lines.
        for line in slice.lines() {
            if ISSUE_DATE_CONTEXT.is_match(line) {
                continue;
            }
            if let Some(c) = SEGMENT_DATE.captures(line) {
                if let Some(date) = parse_flexible_date(&c[1]) {
                    segment.departure_date = Some(date);
                    break;
                }
            }
        }

        if segment.departure_airport.is_some() || segment.arrival_airport.is_some() {
            segments.push(segment);
        }
    }
    segments
}

/// The inbound segment: the first one arriving at a destination airport,
/// else the first segment.
fn main_segment<'a>(
    segments: &'a [FlightSegment],
    ctx: &ExtractionContext<'_>,
) -> Option<&'a FlightSegment> {
    segments
        .iter()
        .find(|s| {
            s.arrival_airport
                .as_deref()
                .is_some_and(|a| ctx.reference.jurisdiction.is_destination_airport(a))
        })
        .or_else(|| segments.first())
}

/// A later segment flying the main route in reverse.
fn find_return_flight<'a>(
    segments: &'a [FlightSegment],
    main: &FlightSegment,
) -> Option<&'a FlightSegment> {
    segments.iter().find(|s| {
        if *s == main {
            return false;
        }
        let reversed = (s.departure_airport.is_some()
            && s.departure_airport == main.arrival_airport)
            || (s.arrival_airport.is_some() && s.arrival_airport == main.departure_airport);
        let later = match (s.departure_date, main.departure_date) {
            (Some(ret), Some(out)) => ret > out,
            // Undated segments still count when the route reverses.
            _ => true,
        };
        reversed && later
    })
}

/// Extract flight ticket fields from recognized text.
pub fn extract(raw_text: &str, ctx: &ExtractionContext<'_>) -> FlightTicketFields {
    let mut fields = FlightTicketFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }
    let upper = raw_text.to_uppercase();

    fields.passenger_name =
        ExtractedField::from_option(extract_passenger_name(&upper), confidence::LABELED);

    fields.segments = extract_segments(&upper, ctx);

    if let Some(main) = main_segment(&fields.segments, ctx) {
        let main = main.clone();
        fields.airline = ExtractedField::from_option(
            main.airline_name.clone().or_else(|| Some(main.airline_code.clone())),
            confidence::CONTEXTUAL,
        );
        fields.flight_number =
            ExtractedField::found(main.flight_number.clone(), confidence::LABELED);
        fields.departure_airport =
            ExtractedField::from_option(main.departure_airport.clone(), confidence::LABELED);
        fields.arrival_airport =
            ExtractedField::from_option(main.arrival_airport.clone(), confidence::LABELED);
        fields.departure_date =
            ExtractedField::from_option(main.departure_date, confidence::LABELED);
        // Short-haul assumption: arrival the same day unless a later
        // segment date contradicts it.
        fields.arrival_date =
            ExtractedField::from_option(main.departure_date, confidence::CONTEXTUAL);

        if let Some(ret) = find_return_flight(&fields.segments, &main) {
            fields.is_round_trip = true;
            fields.return_flight = Some(ret.clone());
        }
    }

    fields.booking_reference = ExtractedField::from_option(
        BOOKING_REF
            .captures(&upper)
            .map(|c| c[1].to_string())
            .filter(|r| !FLIGHT_NUMBER_FORMAT.is_match(r)),
        confidence::LABELED,
    );
    fields.ticket_number = ExtractedField::from_option(
        TICKET_NUMBER
            .captures(&upper)
            .map(|c| c[1].replace([' ', '-'], "")),
        confidence::LABELED,
    );

    fields
}

pub fn missing_fields(fields: &FlightTicketFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.passenger_name.is_present() {
        missing.push("passenger_name");
    }
    if !fields.flight_number.is_present() {
        missing.push("flight_number");
    }
    if !fields.departure_airport.is_present() {
        missing.push("departure_airport");
    }
    if !fields.arrival_airport.is_present() {
        missing.push("arrival_airport");
    }
    if !fields.departure_date.is_present() {
        missing.push("departure_date");
    }
    missing
}

pub fn has_required_fields(fields: &FlightTicketFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks; missing fields fail closed.
pub fn validate(fields: &FlightTicketFields, ctx: &ExtractionContext<'_>) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();
    let jurisdiction = &ctx.reference.jurisdiction;

    checks.insert(
        "destination_is_abidjan".to_string(),
        fields
            .arrival_airport
            .value
            .as_deref()
            .is_some_and(|a| jurisdiction.is_destination_airport(a)),
    );
    checks.insert(
        "departure_in_jurisdiction".to_string(),
        fields
            .departure_airport
            .value
            .as_deref()
            .is_some_and(|a| jurisdiction.is_jurisdiction_airport(a)),
    );
    checks.insert(
        "date_is_future".to_string(),
        fields.departure_date.value.is_some_and(|d| d > ctx.today),
    );
    checks.insert(
        "flight_number_valid".to_string(),
        fields
            .flight_number
            .value
            .as_deref()
            .is_some_and(|f| FLIGHT_NUMBER_FORMAT.is_match(f)),
    );

    checks
}
