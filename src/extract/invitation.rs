//! Invitation letter extraction.
//!
//! Letters are free-form prose, so extraction leans on labeled lines and
//! keyword classification: who invites, who is invited, why, for which
//! dates, and which formalities (signature, stamp, notarization) the
//! letter visibly carries.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{confidence, ExtractedField, ExtractionContext};
use crate::text::{normalize_name, parse_flexible_date};

/// Purpose of the visit as stated by the inviter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitPurpose {
    Tourism,
    Business,
    Family,
    Conference,
    Medical,
    Official,
}

/// Fields recognized from an invitation letter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvitationFields {
    pub inviter_name: ExtractedField<String>,
    pub inviter_address: ExtractedField<String>,
    pub inviter_id_number: ExtractedField<String>,
    pub invitee_name: ExtractedField<String>,
    pub invitee_passport_number: ExtractedField<String>,
    pub invitee_nationality: ExtractedField<String>,
    pub purpose: Option<VisitPurpose>,
    pub visit_start: ExtractedField<NaiveDate>,
    pub visit_end: ExtractedField<NaiveDate>,
    /// Host covers accommodation.
    pub accommodation_provided: bool,
    /// Host covers expenses.
    pub financial_support: bool,
    pub signed: bool,
    pub stamped: bool,
    pub notarized: bool,
}

const DATE_PAT: &str =
    r"(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4}|\d{4}-\d{2}-\d{2})";

static INVITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:I,|JE SOUSSIGNE(?:E)?,?|INVITER|HOST|L'INVITANT)\s*[:.]?\s*(?:M\.|MME|MR|MRS|MS)?\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

static INVITEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:INVITE(?:E)?S?|GUEST|INVITEE\s*NAME|INVITING|TO\s*INVITE)\s*[:.,]?\s*(?:M\.|MME|MR|MRS|MS)?\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

static INVITER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:CNI|ID\s*(?:CARD)?|CARTE\s*(?:NATIONALE\s*)?D'IDENTITE|PASSEPORT\s*NO|RESIDENT\s*PERMIT)\s*(?:NO|N)?\s*[°:.#]?\s*([A-Z0-9][A-Z0-9\-]{4,14})\b")
        .unwrap()
});

static INVITEE_PASSPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:PASSPORT|PASSEPORT)\s*(?:NO|NUMBER|N)?\s*[°:.#]?\s*([A-Z]{1,2}\d{6,9})\b").unwrap()
});

static INVITEE_NATIONALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:NATIONALITY|NATIONALITE|DE\s*NATIONALITE)\s*[:.]?\s*([A-Z]{3,20})\b").unwrap()
});

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:RESIDING\s*AT|ADDRESS|ADRESSE|DOMICILIE(?:E)?\s*A?U?)\s*[:.]?\s*([A-Z0-9][A-Za-z0-9'\-, ]+)")
        .unwrap()
});

static VISIT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:FROM|DU|ARRIVING\s*(?:ON)?|STARTING)\s*[:.]?\s*{DATE_PAT}")).unwrap()
});

static VISIT_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:TO|AU|UNTIL|JUSQU'AU|DEPARTING\s*(?:ON)?)\s*[:.]?\s*{DATE_PAT}")).unwrap()
});

const PURPOSES: &[(VisitPurpose, &[&str])] = &[
    (VisitPurpose::Conference, &["CONFERENCE", "SEMINAR", "SEMINAIRE", "WORKSHOP", "COLLOQUE"]),
    (VisitPurpose::Business, &["BUSINESS", "AFFAIRES", "MEETING", "NEGOTIATION", "COMMERCIAL"]),
    (VisitPurpose::Medical, &["MEDICAL", "TREATMENT", "SOINS", "HOSPITAL", "HOPITAL"]),
    (VisitPurpose::Official, &["OFFICIAL MISSION", "MISSION OFFICIELLE", "DELEGATION"]),
    (VisitPurpose::Family, &["FAMILY", "FAMILLE", "FAMILIAL", "BROTHER", "SISTER", "FRERE", "SOEUR", "COUSIN", "PARENT", "WEDDING", "MARIAGE"]),
    (VisitPurpose::Tourism, &["TOURISM", "TOURISME", "VACATION", "VACANCES", "HOLIDAY"]),
];

const ACCOMMODATION_MARKERS: &[&str] = &[
    "WILL HOST", "ACCOMMODATION PROVIDED", "HEBERGEMENT ASSURE", "STAY AT MY", "CHEZ MOI",
    "WILL ACCOMMODATE", "LODGING PROVIDED", "HEBERGERAI",
];

const FINANCIAL_MARKERS: &[&str] = &[
    "EXPENSES", "FRAIS", "FINANCIAL SUPPORT", "PRISE EN CHARGE", "AT MY EXPENSE", "COSTS COVERED",
];

const SIGNED_MARKERS: &[&str] = &["SIGNATURE", "SIGNED", "SIGNE", "FAIT A"];

const STAMPED_MARKERS: &[&str] = &["STAMP", "CACHET", "SEAL", "TAMPON"];

const NOTARIZED_MARKERS: &[&str] = &["NOTAR", "LEGALIS", "CERTIFIED BY", "COMMISSAIRE"];

fn detect_purpose(upper: &str) -> Option<VisitPurpose> {
    for (purpose, keywords) in PURPOSES {
        if keywords.iter().any(|k| upper.contains(k)) {
            return Some(*purpose);
        }
    }
    None
}

/// Extract invitation letter fields from recognized text.
pub fn extract(raw_text: &str, _ctx: &ExtractionContext<'_>) -> InvitationFields {
    let mut fields = InvitationFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }
    let upper = raw_text.to_uppercase();

    fields.inviter_name = ExtractedField::from_option(
        INVITER
            .captures(&upper)
            .map(|c| normalize_name(c[1].trim()))
            .filter(|n| n.len() > 3),
        confidence::LABELED,
    );
    fields.inviter_address = ExtractedField::from_option(
        ADDRESS.captures(&upper).map(|c| c[1].trim().to_string()).filter(|a| a.len() > 5),
        confidence::CONTEXTUAL,
    );
    fields.inviter_id_number = ExtractedField::from_option(
        INVITER_ID
            .captures_iter(&upper)
            .map(|c| c[1].to_string())
            .find(|v| v.chars().any(|ch| ch.is_ascii_digit())),
        confidence::LABELED,
    );

    fields.invitee_name = ExtractedField::from_option(
        INVITEE
            .captures(&upper)
            .map(|c| normalize_name(c[1].trim()))
            .filter(|n| n.len() > 3),
        confidence::LABELED,
    );
    fields.invitee_passport_number = ExtractedField::from_option(
        INVITEE_PASSPORT.captures(&upper).map(|c| c[1].to_string()),
        confidence::LABELED,
    );
    fields.invitee_nationality = ExtractedField::from_option(
        INVITEE_NATIONALITY.captures(&upper).map(|c| c[1].trim().to_string()),
        confidence::CONTEXTUAL,
    );

    fields.purpose = detect_purpose(&upper);

    fields.visit_start = ExtractedField::from_option(
        VISIT_FROM.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );
    fields.visit_end = ExtractedField::from_option(
        VISIT_TO.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );

    fields.accommodation_provided = ACCOMMODATION_MARKERS.iter().any(|m| upper.contains(m));
    fields.financial_support = FINANCIAL_MARKERS.iter().any(|m| upper.contains(m));
    fields.signed = SIGNED_MARKERS.iter().any(|m| upper.contains(m));
    fields.stamped = STAMPED_MARKERS.iter().any(|m| upper.contains(m));
    fields.notarized = NOTARIZED_MARKERS.iter().any(|m| upper.contains(m));

    fields
}

pub fn missing_fields(fields: &InvitationFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.inviter_name.is_present() {
        missing.push("inviter_name");
    }
    if !fields.invitee_name.is_present() {
        missing.push("invitee_name");
    }
    missing
}

pub fn has_required_fields(fields: &InvitationFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks; missing fields fail closed.
pub fn validate(fields: &InvitationFields) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();

    checks.insert(
        "inviter_identified".to_string(),
        fields.inviter_name.is_present() && fields.inviter_id_number.is_present(),
    );
    checks.insert("start_date_present".to_string(), fields.visit_start.is_present());
    checks.insert("is_signed".to_string(), fields.signed);
    checks.insert(
        "dates_ordered".to_string(),
        matches!(
            (fields.visit_start.value, fields.visit_end.value),
            (Some(start), Some(end)) if end >= start
        ),
    );

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn ctx(reference: &ReferenceData) -> ExtractionContext<'_> {
        ExtractionContext {
            today: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            reference,
        }
    }

    fn letter() -> &'static str {
        "LETTRE D'INVITATION\n\
         Je soussigne, KOUASSI YAO PAUL\n\
         CNI No: CI-0482291\n\
         Adresse: Cocody Riviera, Abidjan\n\
         invite: BEKELE ABEBE TESHOME\n\
         Passport No: EP1234567\n\
         de nationalite: ETHIOPIENNE\n\
         pour une visite familiale\n\
         du: 28/12/2025 au: 10/01/2026\n\
         Hebergement assure a mon domicile, prise en charge des frais.\n\
         Fait a Abidjan, Signature: K.Y. PAUL\n\
         Legalise par le commissaire de police.\n"
    }

    // ── extraction ──────────────────────────────────────────────────

    #[test]
    fn extracts_letter_fields() {
        let reference = ReferenceData::default();
        let fields = extract(letter(), &ctx(&reference));

        assert_eq!(fields.inviter_name.value.as_deref(), Some("KOUASSI YAO PAUL"));
        assert_eq!(fields.inviter_id_number.value.as_deref(), Some("CI-0482291"));
        assert_eq!(fields.invitee_name.value.as_deref(), Some("BEKELE ABEBE TESHOME"));
        assert_eq!(fields.invitee_passport_number.value.as_deref(), Some("EP1234567"));
        assert_eq!(fields.purpose, Some(VisitPurpose::Family));
        assert_eq!(fields.visit_start.value, NaiveDate::from_ymd_opt(2025, 12, 28));
        assert_eq!(fields.visit_end.value, NaiveDate::from_ymd_opt(2026, 1, 10));
        assert!(has_required_fields(&fields));
    }

    #[test]
    fn detects_formalities_and_support() {
        let reference = ReferenceData::default();
        let fields = extract(letter(), &ctx(&reference));
        assert!(fields.accommodation_provided);
        assert!(fields.financial_support);
        assert!(fields.signed);
        assert!(fields.notarized);
    }

    #[test]
    fn plain_letter_lacks_formalities() {
        let reference = ReferenceData::default();
        let text = "invite: BEKELE ABEBE for tourism from: 28/12/2025";
        let fields = extract(text, &ctx(&reference));
        assert!(!fields.signed);
        assert!(!fields.notarized);
        assert!(!fields.accommodation_provided);
        assert_eq!(fields.purpose, Some(VisitPurpose::Tourism));
    }

    #[test]
    fn empty_input_extracts_nothing() {
        let reference = ReferenceData::default();
        let fields = extract("", &ctx(&reference));
        assert!(!has_required_fields(&fields));
    }

    // ── validation ──────────────────────────────────────────────────

    #[test]
    fn complete_letter_passes_checks() {
        let reference = ReferenceData::default();
        let fields = extract(letter(), &ctx(&reference));
        let checks = validate(&fields);
        assert_eq!(checks.get("inviter_identified"), Some(&true));
        assert_eq!(checks.get("start_date_present"), Some(&true));
        assert_eq!(checks.get("is_signed"), Some(&true));
        assert_eq!(checks.get("dates_ordered"), Some(&true));
    }

    #[test]
    fn end_before_start_fails_ordering() {
        let reference = ReferenceData::default();
        let mut fields = extract(letter(), &ctx(&reference));
        fields.visit_end = ExtractedField::found(
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            confidence::LABELED,
        );
        let checks = validate(&fields);
        assert_eq!(checks.get("dates_ordered"), Some(&false));
    }

    #[test]
    fn missing_fields_fail_closed() {
        let checks = validate(&InvitationFields::default());
        assert_eq!(checks.get("inviter_identified"), Some(&false));
        assert_eq!(checks.get("start_date_present"), Some(&false));
        assert_eq!(checks.get("is_signed"), Some(&false));
        assert_eq!(checks.get("dates_ordered"), Some(&false));
    }
}
