//! Passport extraction: machine-readable zone plus visual zone.
//!
//! The MRZ is authoritative when present — its fields carry check digits —
//! and the visual zone (VIZ) fills gaps and cross-checks what the MRZ
//! claims. Disagreements between the two zones are recorded; they matter to
//! the fraud assessment because a tampered visual zone over an intact MRZ
//! is a classic alteration pattern.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::mrz::{self, MrzChecksums, MrzDateKind, Td3};
use super::{confidence, ExtractedField, ExtractionContext};
use crate::reference::PassportType;
use crate::text::{normalize_name, parse_flexible_date, similarity};

/// Fields recognized from a passport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassportFields {
    pub passport_number: ExtractedField<String>,
    pub surname: ExtractedField<String>,
    pub given_names: ExtractedField<String>,
    /// ICAO alpha-3 nationality code.
    pub nationality: ExtractedField<String>,
    pub date_of_birth: ExtractedField<NaiveDate>,
    pub expiry_date: ExtractedField<NaiveDate>,
    pub issue_date: ExtractedField<NaiveDate>,
    pub place_of_birth: ExtractedField<String>,
    pub sex: ExtractedField<String>,
    pub personal_number: ExtractedField<String>,
    pub issuing_state: ExtractedField<String>,
    pub passport_type: Option<PassportType>,
    pub passport_type_confidence: f32,
    pub mrz: Option<MrzSummary>,
}

/// What the machine-readable zone contained and how it verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrzSummary {
    pub line1: String,
    pub line2: String,
    pub checksums: MrzChecksums,
    /// VIZ fields that disagree with the MRZ (field name + both values).
    pub viz_discrepancies: Vec<String>,
}

impl PassportFields {
    /// `SURNAME GIVEN NAMES`, normalized, for cross-document comparison.
    pub fn full_name(&self) -> Option<String> {
        let surname = self.surname.value.as_deref().unwrap_or("");
        let given = self.given_names.value.as_deref().unwrap_or("");
        let full = normalize_name(&format!("{surname} {given}"));
        if full.is_empty() {
            None
        } else {
            Some(full)
        }
    }
}

// ── Visual zone patterns ────────────────────────────────────────────────

/// `15 JAN 2025`, `22 AUG 95`, `15/01/2025`, `2025-01-15`.
const DATE_PAT: &str =
    r"(\d{1,2}\s+[A-Z]{3,9}\s+\d{2,4}|\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{4}-\d{2}-\d{2})";

static VIZ_SURNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:SURNAME|NOM DE FAMILLE|FAMILY\s*NAME|NOM)\s*[:.]?\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

static VIZ_GIVEN_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:GIVEN\s*NAMES?|PRENOMS?|FIRST\s*NAME)\s*[:.]?\s*([A-Z][A-Z'\- ]+)").unwrap()
});

static VIZ_DATE_OF_BIRTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:DATE\s*OF\s*BIRTH|DATE\s*DE\s*NAISSANCE|BIRTH\s*DATE|DOB)\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

static VIZ_EXPIRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:DATE\s*OF\s*EXPIRY|EXPIRY\s*DATE|EXPIRES|EXPIRATION|VALID\s*UNTIL)\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

static VIZ_ISSUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:DATE\s*OF\s*ISSUE|ISSUE\s*DATE|DATE\s*DE\s*DELIVRANCE)\s*[:.]?\s*{DATE_PAT}"
    ))
    .unwrap()
});

static VIZ_PASSPORT_NO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:PASSPORT|PASSEPORT)\s*(?:NO|NUMBER|N)?\s*[°O:.]?\s*([A-Z]{1,2}\d{6,9})")
        .unwrap()
});

/// Bare two-letter-prefix number, the regional issuing convention.
static BARE_PASSPORT_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2}\d{7})\b").unwrap());

static VIZ_NATIONALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:NATIONALITY|NATIONALITE)\s*[:.]?\s*([A-Z]{3,20})").unwrap());

static VIZ_SEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:SEX|SEXE)\s*[:.]?\s*(M|F|MALE|FEMALE)\b").unwrap());

static VIZ_PLACE_OF_BIRTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:PLACE\s*OF\s*BIRTH|LIEU\s*DE\s*NAISSANCE)\s*[:.]?\s*([A-Z][A-Z', \-]+)")
        .unwrap()
});

static PASSPORT_NUMBER_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}\d{6,9}$").unwrap());

/// Words that end a free-running name capture when the recognizer merged
/// label and value lines.
const NAME_STOPWORDS: &[&str] = &[
    "DATE", "DOB", "BIRTH", "SEX", "GENDER", "NATIONALITY", "NATIONALITE", "PASSPORT",
    "PASSEPORT", "ISSUE", "EXPIRY", "PLACE", "AUTHORITY", "GIVEN", "PRENOM",
];

fn cut_at_stopwords(value: &str) -> String {
    let mut kept = Vec::new();
    for word in value.split_whitespace() {
        if NAME_STOPWORDS.contains(&word) {
            break;
        }
        kept.push(word);
    }
    kept.join(" ")
}

fn capture_name(re: &Regex, text: &str) -> Option<String> {
    let m = re.captures(text)?;
    let cleaned = cut_at_stopwords(m[1].trim());
    let name = normalize_name(&cleaned);
    if name.len() > 1 {
        Some(name)
    } else {
        None
    }
}

fn capture_date(re: &Regex, text: &str) -> Option<NaiveDate> {
    let m = re.captures(text)?;
    parse_flexible_date(&m[1])
}

// ── Extraction ──────────────────────────────────────────────────────────

/// Fields read from the visual zone only.
#[derive(Default)]
struct VizFields {
    surname: Option<String>,
    given_names: Option<String>,
    passport_number: Option<String>,
    nationality: Option<String>,
    date_of_birth: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    place_of_birth: Option<String>,
    sex: Option<String>,
}

fn extract_viz(text: &str) -> VizFields {
    let upper = text.to_uppercase();
    VizFields {
        surname: capture_name(&VIZ_SURNAME, &upper),
        given_names: capture_name(&VIZ_GIVEN_NAMES, &upper),
        passport_number: VIZ_PASSPORT_NO
            .captures(&upper)
            .map(|c| c[1].to_string())
            .or_else(|| BARE_PASSPORT_NO.captures(&upper).map(|c| c[1].to_string())),
        nationality: VIZ_NATIONALITY.captures(&upper).map(|c| c[1].trim().to_string()),
        date_of_birth: capture_date(&VIZ_DATE_OF_BIRTH, &upper),
        expiry_date: capture_date(&VIZ_EXPIRY, &upper),
        issue_date: capture_date(&VIZ_ISSUE, &upper),
        place_of_birth: capture_name(&VIZ_PLACE_OF_BIRTH, &upper),
        sex: VIZ_SEX.captures(&upper).map(|c| c[1][..1].to_string()),
    }
}

/// Keyword fallback for the passport category when the MRZ is absent or
/// its type code is ambiguous.
fn type_from_keywords(upper: &str) -> Option<(PassportType, f32)> {
    const LAISSEZ_PASSER: &[&str] =
        &["LAISSEZ-PASSER", "LAISSEZ PASSER", "TRAVEL DOCUMENT", "TITRE DE VOYAGE", "UNITED NATIONS"];
    const DIPLOMATIC: &[&str] = &["DIPLOMATIC", "DIPLOMATIQUE", "DIPLOMAT"];
    const SERVICE: &[&str] = &["SERVICE", "OFFICIEL", "OFFICIAL", "MISSION"];

    if LAISSEZ_PASSER.iter().any(|k| upper.contains(k)) {
        return Some((PassportType::LaissezPasser, 0.90));
    }
    if DIPLOMATIC.iter().any(|k| upper.contains(k)) {
        return Some((PassportType::Diplomatic, 0.85));
    }
    if SERVICE.iter().any(|k| upper.contains(k)) {
        return Some((PassportType::Service, 0.80));
    }
    None
}

/// Record VIZ fields that contradict the MRZ.
fn viz_discrepancies(td3: &Td3, viz: &VizFields, mrz_dob: Option<NaiveDate>, mrz_expiry: Option<NaiveDate>) -> Vec<String> {
    let mut out = Vec::new();

    let mut check_text = |field: &str, mrz_value: &str, viz_value: &Option<String>, threshold: f32| {
        if let Some(viz_value) = viz_value {
            if !mrz_value.is_empty() && similarity(mrz_value, viz_value) < threshold {
                out.push(format!("{field}: mrz '{mrz_value}' vs viz '{viz_value}'"));
            }
        }
    };

    check_text("surname", &td3.surname, &viz.surname, 0.85);
    check_text("given_names", &td3.given_names, &viz.given_names, 0.80);
    check_text("passport_number", &td3.document_number, &viz.passport_number, 1.0);
    check_text("sex", &td3.sex.to_string(), &viz.sex, 1.0);

    let mut check_date = |field: &str, mrz_value: Option<NaiveDate>, viz_value: Option<NaiveDate>| {
        if let (Some(m), Some(v)) = (mrz_value, viz_value) {
            if m != v {
                out.push(format!("{field}: mrz '{m}' vs viz '{v}'"));
            }
        }
    };

    check_date("date_of_birth", mrz_dob, viz.date_of_birth);
    check_date("expiry_date", mrz_expiry, viz.expiry_date);

    out
}

/// Extract passport fields from recognized text. MRZ wins over VIZ; VIZ
/// fills what the MRZ does not carry (issue date, place of birth).
pub fn extract(raw_text: &str, ctx: &ExtractionContext<'_>) -> PassportFields {
    let mut fields = PassportFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }

    let upper = raw_text.to_uppercase();
    let viz = extract_viz(raw_text);

    let td3 = mrz::find_mrz_lines(raw_text)
        .and_then(|(l1, l2)| Td3::parse(&l1, &l2));

    if let Some(td3) = &td3 {
        let checksums = td3.verify_checksums();
        if !checksums.all_valid() {
            tracing::warn!(
                document_number = %td3.document_number,
                ?checksums,
                "MRZ check digit verification failed"
            );
        }
        let conf = if checksums.all_valid() {
            confidence::MRZ_VERIFIED
        } else {
            confidence::MRZ_UNVERIFIED
        };

        let dob = mrz::mrz_date(&td3.birth_date_raw, MrzDateKind::Birth, ctx.today);
        let expiry = mrz::mrz_date(&td3.expiry_date_raw, MrzDateKind::Expiry, ctx.today);

        fields.passport_number = ExtractedField::from_option(
            Some(td3.document_number.clone()).filter(|s| !s.is_empty()),
            conf,
        );
        fields.surname =
            ExtractedField::from_option(Some(td3.surname.clone()).filter(|s| !s.is_empty()), conf);
        fields.given_names = ExtractedField::from_option(
            Some(td3.given_names.clone()).filter(|s| !s.is_empty()),
            conf,
        );
        fields.nationality = ExtractedField::from_option(
            Some(td3.nationality.clone()).filter(|s| !s.is_empty()),
            conf,
        );
        fields.date_of_birth = ExtractedField::from_option(dob, conf);
        fields.expiry_date = ExtractedField::from_option(expiry, conf);
        fields.sex = ExtractedField::from_option(
            Some(td3.sex.to_string()).filter(|s| s == "M" || s == "F"),
            conf,
        );
        fields.personal_number = ExtractedField::from_option(
            Some(td3.personal_number.clone()).filter(|s| !s.is_empty()),
            conf,
        );
        fields.issuing_state = ExtractedField::from_option(
            Some(td3.issuing_state.clone()).filter(|s| !s.is_empty()),
            conf,
        );

        fields.mrz = Some(MrzSummary {
            line1: td3.line1.clone(),
            line2: td3.line2.clone(),
            checksums,
            viz_discrepancies: viz_discrepancies(td3, &viz, dob, expiry),
        });
    }

    // VIZ fills anything the MRZ left missing.
    let labeled = confidence::LABELED;
    fill_missing(&mut fields.surname, viz.surname, labeled);
    fill_missing(&mut fields.given_names, viz.given_names, labeled);
    fill_missing(&mut fields.passport_number, viz.passport_number, labeled);
    fill_missing(&mut fields.nationality, viz.nationality, labeled);
    fill_missing_date(&mut fields.date_of_birth, viz.date_of_birth, labeled);
    fill_missing_date(&mut fields.expiry_date, viz.expiry_date, labeled);
    fill_missing_date(&mut fields.issue_date, viz.issue_date, labeled);
    fill_missing(&mut fields.place_of_birth, viz.place_of_birth, labeled);
    fill_missing(&mut fields.sex, viz.sex, labeled);

    // Passport category: MRZ type code first, then keyword scan.
    if let Some(td3) = &td3 {
        let from_code = PassportType::from_mrz_code(td3.document_type, td3.document_subtype);
        if from_code != PassportType::Unknown
            && !(from_code == PassportType::Ordinary && type_from_keywords(&upper).is_some())
        {
            fields.passport_type = Some(from_code);
            fields.passport_type_confidence =
                if td3.document_subtype != '<' { 0.95 } else { 0.90 };
        }
    }
    if fields.passport_type.is_none() {
        match type_from_keywords(&upper) {
            Some((t, conf)) => {
                fields.passport_type = Some(t);
                fields.passport_type_confidence = conf;
            }
            None if fields.passport_number.is_present() => {
                fields.passport_type = Some(PassportType::Ordinary);
                fields.passport_type_confidence = 0.5;
            }
            None => {}
        }
    }

    fields
}

fn fill_missing(field: &mut ExtractedField<String>, value: Option<String>, conf: f32) {
    if !field.is_present() {
        if let Some(v) = value {
            *field = ExtractedField::found(v, conf);
        }
    }
}

fn fill_missing_date(field: &mut ExtractedField<NaiveDate>, value: Option<NaiveDate>, conf: f32) {
    if !field.is_present() {
        if let Some(v) = value {
            *field = ExtractedField::found(v, conf);
        }
    }
}

/// Required fields for a usable passport record.
pub fn missing_fields(fields: &PassportFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.passport_number.is_present() {
        missing.push("passport_number");
    }
    if !fields.surname.is_present() {
        missing.push("surname");
    }
    if !fields.given_names.is_present() {
        missing.push("given_names");
    }
    if !fields.nationality.is_present() {
        missing.push("nationality");
    }
    if !fields.date_of_birth.is_present() {
        missing.push("date_of_birth");
    }
    if !fields.expiry_date.is_present() {
        missing.push("expiry_date");
    }
    if !fields.sex.is_present() {
        missing.push("sex");
    }
    missing
}

pub fn has_required_fields(fields: &PassportFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks. All fail closed on missing fields.
///
/// `travel_date` sharpens the six-month rule when the caller already knows
/// the planned travel date; without it the deadline defaults to six months
/// from today.
pub fn validate(
    fields: &PassportFields,
    ctx: &ExtractionContext<'_>,
    travel_date: Option<NaiveDate>,
) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();

    let expiry = fields.expiry_date.value;
    checks.insert(
        "expiry_valid".to_string(),
        expiry.is_some_and(|e| e >= ctx.today),
    );

    let six_month_deadline = travel_date
        .map(|t| t + Months::new(6))
        .unwrap_or_else(|| ctx.today + Months::new(6));
    checks.insert(
        "expiry_6months".to_string(),
        expiry.is_some_and(|e| e >= six_month_deadline),
    );

    checks.insert(
        "in_jurisdiction".to_string(),
        fields
            .nationality
            .value
            .as_deref()
            .is_some_and(|n| ctx.reference.jurisdiction.covers_country(n)),
    );

    checks.insert(
        "mrz_valid".to_string(),
        fields.mrz.as_ref().is_some_and(|m| m.checksums.all_valid()),
    );

    checks.insert(
        "passport_number_format".to_string(),
        fields
            .passport_number
            .value
            .as_deref()
            .is_some_and(|n| PASSPORT_NUMBER_FORMAT.is_match(n)),
    );

    checks
}
