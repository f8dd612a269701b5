//! Fraud indicator and anomaly detection over an extracted dossier.
//!
//! Indicators are evidenced rule violations with fixed severities:
//! tampered MRZ and expired passports are critical, vaccination and
//! payment-amount failures are errors. Anomalies are softer patterns a
//! reviewer should see. A document whose extraction failed contributes
//! nothing here — its absence of data is already reported through the
//! field-completeness map.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::cross::TravelPlan;
use super::types::{
    Anomaly, AnomalyType, FraudIndicator, FraudIndicatorType, Severity, ValidationContext,
    ValidatorConfig,
};
use crate::extract::{DocumentType, Dossier};
use crate::reference::PassportType;
use crate::rules::{self, RequirementAction};

fn evidence(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Whether a document is present and extracted well enough to accuse.
fn usable(dossier: &Dossier, kind: DocumentType) -> bool {
    dossier.get(kind).is_some_and(|d| d.success)
}

fn passport_type_fact(passport_type: PassportType) -> &'static str {
    match passport_type {
        PassportType::Ordinary => "ordinary",
        PassportType::Diplomatic => "diplomatic",
        PassportType::Service => "service",
        PassportType::Official => "official",
        PassportType::LaissezPasser => "laissez_passer",
        PassportType::Unknown => "unknown",
    }
}

/// Ask the document-requirement rules whether a verbal note is required
/// for this passport type.
fn verbal_note_required(passport_type: Option<PassportType>) -> bool {
    let mut rule_context = rules::RuleContext::new();
    if let Some(t) = passport_type {
        rule_context.insert(
            "passport_type".to_string(),
            serde_json::Value::String(passport_type_fact(t).to_string()),
        );
    }
    let plan = rules::requirement_plan(&rules::default_rules(), &rule_context);
    plan.get("verbal_note") == Some(&RequirementAction::Required)
}

/// Detect fraud indicators from the per-document checks.
pub fn fraud_indicators(
    dossier: &Dossier,
    context: &ValidationContext,
    today: NaiveDate,
) -> Vec<FraudIndicator> {
    let mut indicators = Vec::new();

    if usable(dossier, DocumentType::Passport) {
        let doc = dossier.get(DocumentType::Passport).unwrap();
        let passport = dossier.passport().unwrap();

        if doc.check("expiry_valid") == Some(false) {
            let expiry = passport
                .expiry_date
                .value
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(%expiry, "expired passport in dossier");
            indicators.push(FraudIndicator {
                indicator_type: FraudIndicatorType::ExpiredPassport,
                severity: Severity::Critical,
                description: "Passport is expired".to_string(),
                evidence: evidence(&[
                    ("expiry_date", expiry),
                    ("checked_on", today.to_string()),
                ]),
            });
        }

        // A missing MRZ is a completeness problem, not a checksum failure;
        // only an MRZ that is present and fails its digits is accusable.
        if let Some(mrz) = &passport.mrz {
            if !mrz.checksums.all_valid() {
                tracing::warn!("MRZ check digits do not verify");
                indicators.push(FraudIndicator {
                    indicator_type: FraudIndicatorType::InvalidMrzChecksum,
                    severity: Severity::Critical,
                    description: "Machine-readable zone check digits do not verify".to_string(),
                    evidence: evidence(&[
                        ("line1", mrz.line1.clone()),
                        ("line2", mrz.line2.clone()),
                    ]),
                });
            }
        }

        if verbal_note_required(passport.passport_type) && !context.verbal_note_present {
            indicators.push(FraudIndicator {
                indicator_type: FraudIndicatorType::MissingVerbalNote,
                severity: Severity::Critical,
                description: "Verbal note required for this passport type but not provided"
                    .to_string(),
                evidence: evidence(&[(
                    "passport_type",
                    format!("{:?}", passport.passport_type.unwrap()),
                )]),
            });
        }
    }

    if usable(dossier, DocumentType::VaccinationCard) {
        let doc = dossier.get(DocumentType::VaccinationCard).unwrap();
        if doc.check("yellow_fever_valid") == Some(false) {
            let date = dossier
                .vaccination()
                .and_then(|v| v.yellow_fever_date.value)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            indicators.push(FraudIndicator {
                indicator_type: FraudIndicatorType::InvalidYellowFever,
                severity: Severity::Error,
                description: "Yellow fever vaccination is invalid or not yet effective".to_string(),
                evidence: evidence(&[("vaccination_date", date)]),
            });
        }
    }

    if usable(dossier, DocumentType::PaymentProof) {
        let doc = dossier.get(DocumentType::PaymentProof).unwrap();
        if doc.check("amount_matches_expected") == Some(false) {
            let payment = dossier.payment().unwrap();
            let amount = payment
                .amount
                .value
                .map(|a| format!("{a}"))
                .unwrap_or_else(|| "unknown".to_string());
            let currency = payment.currency.value.clone().unwrap_or_default();
            indicators.push(FraudIndicator {
                indicator_type: FraudIndicatorType::IncorrectPaymentAmount,
                severity: Severity::Error,
                description: "Payment amount does not match the expected visa fee".to_string(),
                evidence: evidence(&[("amount", amount), ("currency", currency)]),
            });
        }
    }

    indicators
}

/// Detect anomalies from the reconstructed trip and document contents.
pub fn anomalies(
    dossier: &Dossier,
    plan: &TravelPlan,
    config: &ValidatorConfig,
    today: NaiveDate,
) -> Vec<Anomaly> {
    let mut found = Vec::new();

    let stay = plan.hotel_nights.or(plan.stay_days);
    if let Some(stay) = stay {
        if stay > config.long_stay_days {
            found.push(Anomaly {
                anomaly_type: AnomalyType::LongStay,
                severity: Severity::Warning,
                description: format!(
                    "Planned stay of {stay} nights exceeds the typical short-stay maximum"
                ),
                evidence: evidence(&[
                    ("stay_days", stay.to_string()),
                    ("limit_days", config.long_stay_days.to_string()),
                ]),
            });
        }
    }

    if let Some(travel) = plan.travel_date {
        let days_until = (travel - today).num_days();
        if days_until > 0 && days_until <= config.urgent_travel_days {
            found.push(Anomaly {
                anomaly_type: AnomalyType::UrgentTravel,
                severity: Severity::Warning,
                description: format!("Departure is only {days_until} day(s) away"),
                evidence: evidence(&[
                    ("travel_date", travel.to_string()),
                    ("days_until_travel", days_until.to_string()),
                ]),
            });
        }
    }

    if usable(dossier, DocumentType::FlightTicket) {
        let ticket = dossier.flight_ticket().unwrap();
        if !ticket.is_round_trip {
            found.push(Anomaly {
                anomaly_type: AnomalyType::ReturnFlightMissing,
                severity: Severity::Warning,
                description: "No return flight found on the ticket".to_string(),
                evidence: evidence(&[(
                    "segments",
                    ticket.segments.len().to_string(),
                )]),
            });
        }
    }

    if usable(dossier, DocumentType::InvitationLetter) {
        let invitation = dossier.invitation().unwrap();
        if !invitation.notarized {
            found.push(Anomaly {
                anomaly_type: AnomalyType::UnnotarizedInvitation,
                severity: Severity::Warning,
                description: "Invitation letter is not notarized".to_string(),
                evidence: BTreeMap::new(),
            });
        }
    }

    if let Some(dob) = dossier.passport().and_then(|p| p.date_of_birth.value) {
        if let Some(age) = today.years_since(dob) {
            if (age as i32) < config.adult_age_years {
                found.push(Anomaly {
                    anomaly_type: AnomalyType::MinorApplicant,
                    severity: Severity::Warning,
                    description: format!(
                        "Applicant is {age} years old; guardianship documents required"
                    ),
                    evidence: evidence(&[
                        ("date_of_birth", dob.to_string()),
                        ("age_years", age.to_string()),
                    ]),
                });
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::cross::resolve_travel_plan;
    use crate::extract::{extract_document, ExtractionContext};
    use crate::reference::ReferenceData;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
    }

    fn build_dossier(documents: &[(DocumentType, &str)]) -> Dossier {
        let reference = ReferenceData::default();
        let ctx = ExtractionContext { today: today(), reference: &reference };
        let mut dossier = Dossier::new();
        for (kind, text) in documents {
            dossier.insert(extract_document(*kind, text, &ctx));
        }
        dossier
    }

    const EXPIRED_PASSPORT: &str = "Surname: BEKELE\nGiven Names: ABEBE TESHOME\n\
        Nationality: ETH\nDate of Birth: 22/08/1995\nSex: M\n\
        Date of Expiry: 01/06/2025\nPassport No. EP1234567";

    const VALID_PASSPORT: &str = "Surname: BEKELE\nGiven Names: ABEBE TESHOME\n\
        Nationality: ETH\nDate of Birth: 22/08/1995\nSex: M\n\
        Date of Expiry: 16/09/2030\nPassport No. EP1234567";

    fn indicator_types(indicators: &[FraudIndicator]) -> Vec<FraudIndicatorType> {
        indicators.iter().map(|i| i.indicator_type).collect()
    }

    fn anomaly_types(anomalies: &[Anomaly]) -> Vec<AnomalyType> {
        anomalies.iter().map(|a| a.anomaly_type).collect()
    }

    // ── fraud indicators ────────────────────────────────────────────

    #[test]
    fn expired_passport_is_critical() {
        let dossier = build_dossier(&[(DocumentType::Passport, EXPIRED_PASSPORT)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(indicator_types(&found).contains(&FraudIndicatorType::ExpiredPassport));
        let indicator = &found[0];
        assert_eq!(indicator.severity, Severity::Critical);
        assert_eq!(indicator.evidence.get("expiry_date").unwrap(), "2025-06-01");
    }

    #[test]
    fn valid_passport_yields_no_indicators() {
        let dossier = build_dossier(&[(DocumentType::Passport, VALID_PASSPORT)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(found.is_empty(), "unexpected: {found:?}");
    }

    #[test]
    fn tampered_mrz_is_critical() {
        let text = "P<ETHBEKELE<<ABEBE<TESHOME<<<<<<<<<<<<<<<<<<\n\
                    EP12345670ETH9508222M3009163<<<<<<<<<<<<<<<6";
        let dossier = build_dossier(&[(DocumentType::Passport, text)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(indicator_types(&found).contains(&FraudIndicatorType::InvalidMrzChecksum));
    }

    #[test]
    fn missing_mrz_is_not_a_checksum_failure() {
        // Visual-zone-only passport: no MRZ to verify, no accusation.
        let dossier = build_dossier(&[(DocumentType::Passport, VALID_PASSPORT)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(!indicator_types(&found).contains(&FraudIndicatorType::InvalidMrzChecksum));
    }

    #[test]
    fn diplomatic_passport_without_verbal_note() {
        let text = format!("DIPLOMATIC PASSPORT\n{VALID_PASSPORT}");
        let dossier = build_dossier(&[(DocumentType::Passport, &text)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(indicator_types(&found).contains(&FraudIndicatorType::MissingVerbalNote));

        let with_note = ValidationContext { verbal_note_present: true, ..Default::default() };
        let found = fraud_indicators(&dossier, &with_note, today());
        assert!(!indicator_types(&found).contains(&FraudIndicatorType::MissingVerbalNote));
    }

    #[test]
    fn ineffective_vaccination_is_error() {
        let text = "INTERNATIONAL CERTIFICATE OF VACCINATION\nName: BEKELE ABEBE\n\
                    Yellow Fever 05/11/2025";
        // Five days after injection: present but not yet effective.
        let dossier = build_dossier(&[(DocumentType::VaccinationCard, text)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert_eq!(
            indicator_types(&found),
            vec![FraudIndicatorType::InvalidYellowFever]
        );
        assert_eq!(found[0].severity, Severity::Error);
    }

    #[test]
    fn wrong_payment_amount_is_error() {
        let text = "Montant: 15 000 XOF\nBeneficiaire: TRESOR PUBLIC CI\n\
                    Date: 05/11/2025\nReference: PAY-1234567";
        let dossier = build_dossier(&[(DocumentType::PaymentProof, text)]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert_eq!(
            indicator_types(&found),
            vec![FraudIndicatorType::IncorrectPaymentAmount]
        );
        assert_eq!(found[0].severity, Severity::Error);
    }

    #[test]
    fn failed_extraction_contributes_no_indicators() {
        let dossier = build_dossier(&[(DocumentType::Passport, "unreadable scan")]);
        let found = fraud_indicators(&dossier, &ValidationContext::default(), today());
        assert!(found.is_empty());
    }

    // ── anomalies ───────────────────────────────────────────────────

    #[test]
    fn long_stay_flagged_at_120_nights() {
        let hotel = "Hotel: TIAMA ABIDJAN\nGuest Name: BEKELE ABEBE TESHOME\n\
            Confirmation No: HTL-482913\nCheck-in: 28/12/2025\nCheck-out: 27/04/2026";
        let dossier = build_dossier(&[(DocumentType::HotelReservation, hotel)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(anomaly_types(&found).contains(&AnomalyType::LongStay));
    }

    #[test]
    fn ninety_night_stay_not_flagged() {
        let hotel = "Hotel: TIAMA ABIDJAN\nGuest Name: BEKELE ABEBE TESHOME\n\
            Confirmation No: HTL-482913\nCheck-in: 01/01/2026\nCheck-out: 01/04/2026";
        let dossier = build_dossier(&[(DocumentType::HotelReservation, hotel)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(!anomaly_types(&found).contains(&AnomalyType::LongStay));
    }

    #[test]
    fn urgent_travel_flagged_within_five_days() {
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 13 NOV 2025\n\
            BOOKING REF: XYZ9AB";
        let dossier = build_dossier(&[(DocumentType::FlightTicket, ticket)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(anomaly_types(&found).contains(&AnomalyType::UrgentTravel));
    }

    #[test]
    fn comfortable_lead_time_not_urgent() {
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 28/Dec/2025\n\
            BOOKING REF: XYZ9AB";
        let dossier = build_dossier(&[(DocumentType::FlightTicket, ticket)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(!anomaly_types(&found).contains(&AnomalyType::UrgentTravel));
    }

    #[test]
    fn departure_today_not_flagged_urgent() {
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 10 NOV 2025\n\
            BOOKING REF: XYZ9AB";
        let dossier = build_dossier(&[(DocumentType::FlightTicket, ticket)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(!anomaly_types(&found).contains(&AnomalyType::UrgentTravel));
    }

    #[test]
    fn one_way_ticket_flags_missing_return() {
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 28/Dec/2025\n\
            BOOKING REF: XYZ9AB";
        let dossier = build_dossier(&[(DocumentType::FlightTicket, ticket)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(anomaly_types(&found).contains(&AnomalyType::ReturnFlightMissing));
    }

    #[test]
    fn round_trip_does_not_flag_return() {
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 28/Dec/2025\n\
            ET 936 FROM: ABIDJAN (ABJ) TO: ADDIS ABABA (ADD) DATE: 15/Jan/2026\n\
            BOOKING REF: XYZ9AB";
        let dossier = build_dossier(&[(DocumentType::FlightTicket, ticket)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(!anomaly_types(&found).contains(&AnomalyType::ReturnFlightMissing));
    }

    #[test]
    fn minor_applicant_flagged() {
        let passport = "Surname: BEKELE\nGiven Names: LIYA\nNationality: ETH\n\
            Date of Birth: 22/08/2010\nSex: F\nDate of Expiry: 16/09/2030\n\
            Passport No. EP7654321";
        let dossier = build_dossier(&[(DocumentType::Passport, passport)]);
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(anomaly_types(&found).contains(&AnomalyType::MinorApplicant));
    }

    #[test]
    fn empty_dossier_has_no_anomalies() {
        let dossier = Dossier::new();
        let plan = resolve_travel_plan(&dossier);
        let found = anomalies(&dossier, &plan, &ValidatorConfig::default(), today());
        assert!(found.is_empty());
    }
}
