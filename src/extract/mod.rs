//! Per-document-type extractors.
//!
//! Each extractor turns the raw recognized text of one uploaded document
//! into a typed, confidence-scored field set and a map of document-local
//! checks (`expiry_valid`, `mrz_valid`, …). Extraction never fails: empty
//! or unrecognizable input produces `success = false` with every field
//! missing, and every downstream check fails closed on a missing field.

pub mod flight;
pub mod hotel;
pub mod invitation;
pub mod mrz;
pub mod passport;
pub mod payment;
pub mod vaccination;

pub use flight::{FlightSegment, FlightTicketFields};
pub use hotel::HotelFields;
pub use invitation::{InvitationFields, VisitPurpose};
pub use passport::PassportFields;
pub use payment::{PaymentFields, PaymentMethod};
pub use vaccination::VaccinationFields;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceData;

/// Extraction confidence attached to fields by their recognition source.
pub mod confidence {
    /// Field read from an MRZ whose check digits all verified.
    pub const MRZ_VERIFIED: f32 = 0.98;

    /// Field read from an MRZ with at least one failing check digit.
    pub const MRZ_UNVERIFIED: f32 = 0.80;

    /// Field matched by a labeled pattern ("Passport No: …").
    pub const LABELED: f32 = 0.85;

    /// Field matched by surrounding context rather than an explicit label.
    pub const CONTEXTUAL: f32 = 0.70;

    /// Last-resort positional or format-only match.
    pub const FALLBACK: f32 = 0.50;
}

/// The document types this engine extracts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    FlightTicket,
    HotelReservation,
    VaccinationCard,
    PaymentProof,
    InvitationLetter,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::Passport => "passport",
            DocumentType::FlightTicket => "flight_ticket",
            DocumentType::HotelReservation => "hotel_reservation",
            DocumentType::VaccinationCard => "vaccination_card",
            DocumentType::PaymentProof => "payment_proof",
            DocumentType::InvitationLetter => "invitation_letter",
        };
        f.write_str(name)
    }
}

/// One extracted field: the typed value, if recognizable, and the
/// confidence of the recognition. Absence is `value = None, confidence = 0`
/// — never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField<T> {
    pub value: Option<T>,
    pub confidence: f32,
}

impl<T> ExtractedField<T> {
    pub fn missing() -> Self {
        ExtractedField { value: None, confidence: 0.0 }
    }

    pub fn found(value: T, confidence: f32) -> Self {
        ExtractedField { value: Some(value), confidence }
    }

    /// Wrap an optional value, collapsing `None` to a missing field.
    pub fn from_option(value: Option<T>, confidence: f32) -> Self {
        match value {
            Some(v) => ExtractedField::found(v, confidence),
            None => ExtractedField::missing(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

impl<T> Default for ExtractedField<T> {
    fn default() -> Self {
        ExtractedField::missing()
    }
}

/// Typed field set of one extracted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentData {
    Passport(PassportFields),
    FlightTicket(FlightTicketFields),
    HotelReservation(HotelFields),
    VaccinationCard(VaccinationFields),
    PaymentProof(PaymentFields),
    InvitationLetter(InvitationFields),
}

impl DocumentData {
    /// The document holder's full name, for cross-document comparison.
    pub fn holder_name(&self) -> Option<String> {
        match self {
            DocumentData::Passport(p) => p.full_name(),
            DocumentData::FlightTicket(t) => t.passenger_name.value.clone(),
            DocumentData::HotelReservation(h) => h.guest_name.value.clone(),
            DocumentData::VaccinationCard(v) => v.holder_name.value.clone(),
            DocumentData::InvitationLetter(i) => i.invitee_name.value.clone(),
            DocumentData::PaymentProof(p) => p.payer.value.clone(),
        }
    }
}

/// One extracted document: immutable after creation, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub document_type: DocumentType,
    /// Whether the required fields for this type were recognized.
    pub success: bool,
    pub data: DocumentData,
    /// Document-local validation outcomes (`expiry_valid`, `mrz_valid`, …).
    /// A check that could not run because its inputs are missing is `false`.
    pub checks: BTreeMap<String, bool>,
}

impl ExtractedDocument {
    /// Outcome of one named check; `None` if the extractor does not produce
    /// that check for this document type.
    pub fn check(&self, name: &str) -> Option<bool> {
        self.checks.get(name).copied()
    }
}

/// One applicant's submission at one point in time, keyed by document type,
/// at most one document per type. Re-validate the whole dossier whenever
/// any document changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    documents: BTreeMap<DocumentType, ExtractedDocument>,
}

impl Dossier {
    pub fn new() -> Self {
        Dossier::default()
    }

    /// Insert a document, replacing any previous one of the same type.
    pub fn insert(&mut self, document: ExtractedDocument) {
        self.documents.insert(document.document_type, document);
    }

    pub fn get(&self, kind: DocumentType) -> Option<&ExtractedDocument> {
        self.documents.get(&kind)
    }

    pub fn contains(&self, kind: DocumentType) -> bool {
        self.documents.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentType, &ExtractedDocument)> {
        self.documents.iter()
    }

    pub fn passport(&self) -> Option<&PassportFields> {
        match self.get(DocumentType::Passport)? {
            ExtractedDocument { data: DocumentData::Passport(p), .. } => Some(p),
            _ => None,
        }
    }

    pub fn flight_ticket(&self) -> Option<&FlightTicketFields> {
        match self.get(DocumentType::FlightTicket)? {
            ExtractedDocument { data: DocumentData::FlightTicket(t), .. } => Some(t),
            _ => None,
        }
    }

    pub fn hotel(&self) -> Option<&HotelFields> {
        match self.get(DocumentType::HotelReservation)? {
            ExtractedDocument { data: DocumentData::HotelReservation(h), .. } => Some(h),
            _ => None,
        }
    }

    pub fn vaccination(&self) -> Option<&VaccinationFields> {
        match self.get(DocumentType::VaccinationCard)? {
            ExtractedDocument { data: DocumentData::VaccinationCard(v), .. } => Some(v),
            _ => None,
        }
    }

    pub fn payment(&self) -> Option<&PaymentFields> {
        match self.get(DocumentType::PaymentProof)? {
            ExtractedDocument { data: DocumentData::PaymentProof(p), .. } => Some(p),
            _ => None,
        }
    }

    pub fn invitation(&self) -> Option<&InvitationFields> {
        match self.get(DocumentType::InvitationLetter)? {
            ExtractedDocument { data: DocumentData::InvitationLetter(i), .. } => Some(i),
            _ => None,
        }
    }
}

/// Ambient inputs every extractor may need: the validation-time clock and
/// the reference tables. `today` is injected so extraction stays a pure
/// function of its inputs.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub today: NaiveDate,
    pub reference: &'a ReferenceData,
}

/// Run the extractor for `kind` on raw recognized text, then the
/// document-local checks, producing the finished [`ExtractedDocument`].
pub fn extract_document(
    kind: DocumentType,
    raw_text: &str,
    ctx: &ExtractionContext<'_>,
) -> ExtractedDocument {
    let (success, data, checks) = match kind {
        DocumentType::Passport => {
            let fields = passport::extract(raw_text, ctx);
            let checks = passport::validate(&fields, ctx, None);
            (
                passport::has_required_fields(&fields),
                DocumentData::Passport(fields),
                checks,
            )
        }
        DocumentType::FlightTicket => {
            let fields = flight::extract(raw_text, ctx);
            let checks = flight::validate(&fields, ctx);
            (
                flight::has_required_fields(&fields),
                DocumentData::FlightTicket(fields),
                checks,
            )
        }
        DocumentType::HotelReservation => {
            let fields = hotel::extract(raw_text, ctx);
            let checks = hotel::validate(&fields, ctx);
            (
                hotel::has_required_fields(&fields),
                DocumentData::HotelReservation(fields),
                checks,
            )
        }
        DocumentType::VaccinationCard => {
            let fields = vaccination::extract(raw_text, ctx);
            let checks = vaccination::validate(&fields, ctx);
            (
                vaccination::has_required_fields(&fields),
                DocumentData::VaccinationCard(fields),
                checks,
            )
        }
        DocumentType::PaymentProof => {
            let fields = payment::extract(raw_text, ctx);
            let checks = payment::validate(&fields, ctx);
            (
                payment::has_required_fields(&fields),
                DocumentData::PaymentProof(fields),
                checks,
            )
        }
        DocumentType::InvitationLetter => {
            let fields = invitation::extract(raw_text, ctx);
            let checks = invitation::validate(&fields);
            (
                invitation::has_required_fields(&fields),
                DocumentData::InvitationLetter(fields),
                checks,
            )
        }
    };

    if !success {
        tracing::debug!(document_type = %kind, "extraction incomplete: required fields missing");
    }

    ExtractedDocument { document_type: kind, success, data, checks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_has_zero_confidence() {
        let f: ExtractedField<String> = ExtractedField::missing();
        assert!(f.value.is_none());
        assert_eq!(f.confidence, 0.0);
        assert!(!f.is_present());
    }

    #[test]
    fn from_option_collapses_none() {
        let f = ExtractedField::from_option(None::<String>, 0.9);
        assert_eq!(f.confidence, 0.0);
        let g = ExtractedField::from_option(Some("X".to_string()), 0.9);
        assert_eq!(g.confidence, 0.9);
    }

    #[test]
    fn document_type_display_names_are_stable() {
        assert_eq!(DocumentType::Passport.to_string(), "passport");
        assert_eq!(DocumentType::FlightTicket.to_string(), "flight_ticket");
        assert_eq!(DocumentType::PaymentProof.to_string(), "payment_proof");
    }

    #[test]
    fn dossier_replaces_same_type() {
        let reference = ReferenceData::default();
        let ctx = ExtractionContext {
            today: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            reference: &reference,
        };
        let mut dossier = Dossier::new();
        dossier.insert(extract_document(DocumentType::HotelReservation, "", &ctx));
        dossier.insert(extract_document(DocumentType::HotelReservation, "", &ctx));
        assert_eq!(dossier.len(), 1);
    }

    #[test]
    fn empty_input_extracts_unsuccessfully_for_every_type() {
        let reference = ReferenceData::default();
        let ctx = ExtractionContext {
            today: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            reference: &reference,
        };
        for kind in [
            DocumentType::Passport,
            DocumentType::FlightTicket,
            DocumentType::HotelReservation,
            DocumentType::VaccinationCard,
            DocumentType::PaymentProof,
            DocumentType::InvitationLetter,
        ] {
            let doc = extract_document(kind, "", &ctx);
            assert!(!doc.success, "{kind} should not succeed on empty input");
            assert_eq!(doc.document_type, kind);
        }
    }
}
