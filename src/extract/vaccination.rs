//! Vaccination card extraction, centered on yellow fever.
//!
//! Yellow fever is the one vaccination required for entry, so the extractor
//! hunts for it specifically — including the misspellings recognition
//! engines produce on stamped, handwritten cards (`YELL0W`, `FAVER`,
//! `FIEVRE JUNE`). Since 2016 the certificate is valid for life; the only
//! time gate left is the ten-day efficacy delay after injection.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{confidence, ExtractedField, ExtractionContext};
use crate::text::{normalize_name, parse_flexible_date};

/// Days after injection before a yellow fever vaccination becomes valid.
pub const EFFICACY_DELAY_DAYS: i64 = 10;

/// Fields recognized from an international vaccination certificate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaccinationFields {
    pub holder_name: ExtractedField<String>,
    pub yellow_fever_date: ExtractedField<NaiveDate>,
    /// Explicit printed expiry; absent on lifetime certificates.
    pub expiry_date: ExtractedField<NaiveDate>,
    pub certificate_number: ExtractedField<String>,
    pub vaccination_center: ExtractedField<String>,
    pub batch_number: ExtractedField<String>,
}

const DATE_PAT: &str =
    r"(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{1,2}\s+[A-Za-z]{3,9}\s+\d{2,4}|\d{4}-\d{2}-\d{2})";

/// Yellow fever mentions, including frequent recognition errors.
static YELLOW_FEVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Y[E3]L{1,2}[O0]W\s*F[E3A][VA]?[E3]?R|FI[E3]VR[E3]?\s*JA?UN[E3]?|A?N?T?I?[\- ]?AMAR[I1]L|STAMARIL|YF[\- ]?VAX|17D",
    )
    .unwrap()
});

static HOLDER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:NAME|NOM|HOLDER|TITULAIRE)\s*(?:/\s*(?:NOM|NAME))?\s*[:.]\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

static CERTIFICATE_NO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:CERTIFICATE|CERTIFICAT|ICV)\s*(?:NO|N|NUMBER)?\s*[°:.#]?\s*([A-Z0-9][A-Z0-9\-/]{4,14})\b")
        .unwrap()
});

static CENTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:CENTER|CENTRE|CLINIC|CLINIQUE|HOSPITAL|HOPITAL|VACCINATED\s*AT)\s*[:.]?\s*([A-Z][A-Za-z'\- ]+)")
        .unwrap()
});

static BATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:LOT|BATCH)\s*(?:NO|N)?\s*[°:.#]?\s*([A-Z0-9\-]{3,12})\b").unwrap()
});

static EXPIRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:VALID\s*UNTIL|EXPIRY|EXPIRES?|VALABLE\s*JUSQU'?A?U?)\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

static ANY_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DATE_PAT).unwrap());

static VACCINATION_DATE_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:DATE\s*(?:OF\s*)?VACCINATION|VACCINATION\s*DATE|VACCINATED\s*(?:ON)?|DATE\s*DE\s*VACCINATION)\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

/// Words whose presence marks a vaccination-certificate context.
const CONTEXT_MARKERS: &[&str] = &[
    "VACCIN", "IMMUNIZ", "INOCUL", "YELLOW", "JAUNE", "AMARIL", "CERTIFICATE", "CERTIFICAT",
    "INTERNATIONAL HEALTH", "WHO", "OMS",
];

fn has_vaccination_context(upper: &str) -> bool {
    CONTEXT_MARKERS.iter().filter(|m| upper.contains(*m)).count() >= 2
}

/// The date tied to the yellow fever entry, by decreasing confidence:
/// right of the mention, labeled vaccination date, any date in a clearly
/// vaccination-flavored text.
fn find_yellow_fever_date(upper: &str) -> Option<(NaiveDate, f32)> {
    if let Some(m) = YELLOW_FEVER.find(upper) {
        // Look for a date within the 40 characters after the mention.
        let rest = &upper[m.end()..];
        let window = match rest.char_indices().nth(40) {
            Some((i, _)) => &rest[..i],
            None => rest,
        };
        if let Some(c) = ANY_DATE.captures(window) {
            if let Some(date) = parse_flexible_date(&c[1]) {
                return Some((date, confidence::LABELED));
            }
        }
    }
    if let Some(c) = VACCINATION_DATE_LABELED.captures(upper) {
        if let Some(date) = parse_flexible_date(&c[1]) {
            return Some((date, confidence::CONTEXTUAL));
        }
    }
    if has_vaccination_context(upper) {
        if let Some(c) = ANY_DATE.captures(upper) {
            if let Some(date) = parse_flexible_date(&c[1]) {
                return Some((date, confidence::FALLBACK));
            }
        }
    }
    None
}

/// Extract vaccination certificate fields from recognized text.
pub fn extract(raw_text: &str, _ctx: &ExtractionContext<'_>) -> VaccinationFields {
    let mut fields = VaccinationFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }
    let upper = raw_text.to_uppercase();

    fields.holder_name = ExtractedField::from_option(
        HOLDER_NAME
            .captures(&upper)
            .map(|c| normalize_name(c[1].trim()))
            .filter(|n| n.len() > 3),
        confidence::LABELED,
    );

    if YELLOW_FEVER.is_match(&upper) || has_vaccination_context(&upper) {
        if let Some((date, conf)) = find_yellow_fever_date(&upper) {
            fields.yellow_fever_date = ExtractedField::found(date, conf);
        } else {
            tracing::debug!("yellow fever mention without an attributable date");
        }
    }

    fields.expiry_date = ExtractedField::from_option(
        EXPIRY.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );

    fields.certificate_number = ExtractedField::from_option(
        CERTIFICATE_NO
            .captures_iter(&upper)
            .map(|c| c[1].to_string())
            .find(|v| v.chars().any(|ch| ch.is_ascii_digit())),
        confidence::LABELED,
    );

    fields.vaccination_center = ExtractedField::from_option(
        CENTER.captures(&upper).map(|c| c[1].trim().to_string()).filter(|v| v.len() > 3),
        confidence::CONTEXTUAL,
    );

    fields.batch_number = ExtractedField::from_option(
        BATCH.captures(&upper).map(|c| c[1].to_string()),
        confidence::LABELED,
    );

    fields
}

pub fn missing_fields(fields: &VaccinationFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.holder_name.is_present() {
        missing.push("holder_name");
    }
    if !fields.yellow_fever_date.is_present() {
        missing.push("yellow_fever_date");
    }
    missing
}

pub fn has_required_fields(fields: &VaccinationFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks; missing fields fail closed.
pub fn validate(fields: &VaccinationFields, ctx: &ExtractionContext<'_>) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();
    let vaccination_date = fields.yellow_fever_date.value;

    checks.insert("yellow_fever_present".to_string(), vaccination_date.is_some());

    checks.insert(
        "vaccination_date_past".to_string(),
        vaccination_date.is_some_and(|d| d <= ctx.today),
    );

    // Valid when present, past the efficacy delay, and (if an expiry is
    // printed) not yet expired. No printed expiry means lifetime validity.
    let effective = vaccination_date
        .is_some_and(|d| d + Duration::days(EFFICACY_DELAY_DAYS) <= ctx.today);
    let not_expired = match fields.expiry_date.value {
        Some(expiry) => expiry >= ctx.today,
        None => true,
    };
    checks.insert("yellow_fever_valid".to_string(), effective && not_expired);

    checks.insert(
        "certificate_format_valid".to_string(),
        fields
            .certificate_number
            .value
            .as_deref()
            .is_some_and(|n| n.len() >= 6),
    );

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn ctx_at(reference: &ReferenceData, y: i32, m: u32, d: u32) -> ExtractionContext<'_> {
        ExtractionContext {
            today: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            reference,
        }
    }

    fn certificate() -> &'static str {
        "INTERNATIONAL CERTIFICATE OF VACCINATION\n\
         Name: BEKELE ABEBE TESHOME\n\
         Certificate No: ETH-0098123\n\
         Yellow Fever 15/03/2022 Batch: YF-2241\n\
         Centre: PASTEUR INSTITUTE ADDIS ABABA\n"
    }

    // ── extraction ──────────────────────────────────────────────────

    #[test]
    fn extracts_certificate_fields() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let fields = extract(certificate(), &ctx);

        assert_eq!(fields.holder_name.value.as_deref(), Some("BEKELE ABEBE TESHOME"));
        assert_eq!(
            fields.yellow_fever_date.value,
            NaiveDate::from_ymd_opt(2022, 3, 15)
        );
        assert_eq!(fields.certificate_number.value.as_deref(), Some("ETH-0098123"));
        assert_eq!(fields.batch_number.value.as_deref(), Some("YF-2241"));
        assert!(has_required_fields(&fields));
    }

    #[test]
    fn tolerates_ocr_misreads_of_yellow_fever() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        for variant in ["YELL0W FEVER", "YELOW FEVER", "FIEVRE JUNE", "ANTI-AMARIL"] {
            let text = format!("Name: BEKELE ABEBE\nVaccination Certificate\n{variant} 15/03/2022");
            let fields = extract(&text, &ctx);
            assert!(
                fields.yellow_fever_date.is_present(),
                "variant {variant} not recognized"
            );
        }
    }

    #[test]
    fn labeled_vaccination_date_fallback() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let text = "CERTIFICAT INTERNATIONAL DE VACCINATION\nName: BEKELE ABEBE\n\
                    Date of vaccination: 15/03/2022";
        let fields = extract(text, &ctx);
        assert_eq!(
            fields.yellow_fever_date.value,
            NaiveDate::from_ymd_opt(2022, 3, 15)
        );
        assert!(fields.yellow_fever_date.confidence < confidence::LABELED);
    }

    #[test]
    fn no_vaccination_context_extracts_no_date() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let fields = extract("Invoice dated 15/03/2022 for office supplies", &ctx);
        assert!(!fields.yellow_fever_date.is_present());
        assert!(!has_required_fields(&fields));
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn old_vaccination_is_valid_for_life() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let fields = extract(certificate(), &ctx);
        let checks = validate(&fields, &ctx);
        assert_eq!(checks.get("yellow_fever_present"), Some(&true));
        assert_eq!(checks.get("yellow_fever_valid"), Some(&true));
        assert_eq!(checks.get("vaccination_date_past"), Some(&true));
        assert_eq!(checks.get("certificate_format_valid"), Some(&true));
    }

    #[test]
    fn vaccination_within_efficacy_delay_not_yet_valid() {
        let reference = ReferenceData::default();
        // Vaccinated 2022-03-15; checked five days later.
        let ctx = ctx_at(&reference, 2022, 3, 20);
        let fields = extract(certificate(), &ctx);
        let checks = validate(&fields, &ctx);
        assert_eq!(checks.get("yellow_fever_present"), Some(&true));
        assert_eq!(checks.get("yellow_fever_valid"), Some(&false));
    }

    #[test]
    fn vaccination_exactly_at_delay_boundary_is_valid() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2022, 3, 25);
        let fields = extract(certificate(), &ctx);
        let checks = validate(&fields, &ctx);
        assert_eq!(checks.get("yellow_fever_valid"), Some(&true));
    }

    #[test]
    fn explicit_expiry_gates_validity() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let mut fields = extract(certificate(), &ctx);
        fields.expiry_date = ExtractedField::found(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            confidence::LABELED,
        );
        let checks = validate(&fields, &ctx);
        assert_eq!(checks.get("yellow_fever_valid"), Some(&false));
    }

    #[test]
    fn missing_vaccination_fails_closed() {
        let reference = ReferenceData::default();
        let ctx = ctx_at(&reference, 2025, 11, 10);
        let checks = validate(&VaccinationFields::default(), &ctx);
        assert_eq!(checks.get("yellow_fever_present"), Some(&false));
        assert_eq!(checks.get("yellow_fever_valid"), Some(&false));
        assert_eq!(checks.get("certificate_format_valid"), Some(&false));
    }
}
