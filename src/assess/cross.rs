//! Cross-document checks: the same person, the same trip.
//!
//! Every check runs only when both sides of its comparison are present —
//! an absent document skips the check rather than failing it. Issues are
//! recorded in detection order.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};

use super::types::{Anomaly, AnomalyType, CrossCheckResult, Severity, ValidationContext, ValidatorConfig};
use crate::extract::{DocumentType, Dossier};
use crate::text::{names_match, normalize_for_comparison, normalize_name, similarity};

/// Trip dates as reconstructed from whichever documents carry them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TravelPlan {
    /// Outbound departure: ticket first, invitation start as fallback.
    pub travel_date: Option<NaiveDate>,
    /// Return: return flight, invitation end, hotel check-out.
    pub return_date: Option<NaiveDate>,
    /// Total planned stay in days.
    pub stay_days: Option<i64>,
    pub hotel_nights: Option<i64>,
}

/// Reconstruct the trip from the dossier.
pub fn resolve_travel_plan(dossier: &Dossier) -> TravelPlan {
    let ticket = dossier.flight_ticket();
    let invitation = dossier.invitation();
    let hotel = dossier.hotel();

    let travel_date = ticket
        .and_then(|t| t.departure_date.value)
        .or_else(|| invitation.and_then(|i| i.visit_start.value));

    let return_date = ticket
        .and_then(|t| t.return_flight.as_ref().and_then(|r| r.departure_date))
        .or_else(|| invitation.and_then(|i| i.visit_end.value))
        .or_else(|| hotel.and_then(|h| h.check_out.value));

    let hotel_nights = hotel.and_then(|h| h.nights);

    let stay_days = match (travel_date, return_date) {
        (Some(out), Some(back)) if back >= out => Some((back - out).num_days()),
        _ => hotel_nights,
    };

    TravelPlan { travel_date, return_date, stay_days, hotel_nights }
}

/// Names as found on each document, normalized, passport first.
fn collect_names(dossier: &Dossier) -> Vec<(DocumentType, String)> {
    let mut names = Vec::new();
    let order = [
        DocumentType::Passport,
        DocumentType::FlightTicket,
        DocumentType::HotelReservation,
        DocumentType::VaccinationCard,
        DocumentType::InvitationLetter,
    ];
    for kind in order {
        if let Some(doc) = dossier.get(kind) {
            if let Some(name) = doc.data.holder_name() {
                let name = normalize_name(&name);
                if !name.is_empty() {
                    names.push((kind, name));
                }
            }
        }
    }
    names
}

/// Compare the passport holder's name against every other document.
///
/// Returns `None` when fewer than two documents carry a name. Mismatches
/// become issues; a mismatch dissimilar enough also raises a
/// `NAME_MISMATCH` anomaly.
pub fn name_consistency(
    dossier: &Dossier,
    config: &ValidatorConfig,
) -> Option<(CrossCheckResult, Vec<Anomaly>)> {
    let names = collect_names(dossier);
    if names.len() < 2 {
        return None;
    }

    let (reference_kind, reference_name) = names[0].clone();
    let mut result = CrossCheckResult::clean();
    let mut anomalies = Vec::new();

    for (kind, name) in &names[1..] {
        if names_match(&reference_name, name, config.name_match_threshold) {
            continue;
        }
        result.push_issue(format!(
            "Name on {kind} ('{name}') does not match {reference_kind} ('{reference_name}')"
        ));

        let score = similarity(&reference_name, name);
        if score < config.name_anomaly_threshold {
            tracing::warn!(
                document = %kind,
                similarity = score,
                "name strongly dissimilar to reference document"
            );
            let mut evidence = BTreeMap::new();
            evidence.insert("reference_document".to_string(), reference_kind.to_string());
            evidence.insert("reference_name".to_string(), reference_name.clone());
            evidence.insert("document".to_string(), kind.to_string());
            evidence.insert("document_name".to_string(), name.clone());
            evidence.insert("similarity".to_string(), format!("{score:.2}"));
            anomalies.push(Anomaly {
                anomaly_type: AnomalyType::NameMismatch,
                severity: Severity::Warning,
                description: format!("Name on {kind} does not resemble the name on {reference_kind}"),
                evidence,
            });
        }
    }

    Some((result, anomalies))
}

/// Temporal coherence: passport validity over the trip, hotel dates
/// against flight dates, stay length against the visa product.
pub fn date_consistency(
    dossier: &Dossier,
    plan: &TravelPlan,
    context: &ValidationContext,
    config: &ValidatorConfig,
) -> CrossCheckResult {
    let mut result = CrossCheckResult::clean();

    // Passport validity around the travel date.
    if let (Some(expiry), Some(travel)) = (
        dossier.passport().and_then(|p| p.expiry_date.value),
        plan.travel_date,
    ) {
        if travel > expiry {
            result.push_issue("Passport expires before travel date");
        }
        if expiry < travel + Months::new(config.min_passport_validity_months) {
            result.push_issue("Passport validity less than 6 months from travel");
        }
    }

    // Hotel check-in against flight arrival.
    if let (Some(check_in), Some(arrival)) = (
        dossier.hotel().and_then(|h| h.check_in.value),
        dossier.flight_ticket().and_then(|t| t.arrival_date.value),
    ) {
        let gap = (check_in - arrival).num_days().abs();
        if gap > config.hotel_checkin_tolerance_days {
            result.push_issue(format!(
                "Hotel check-in ({check_in}) is {gap} days from flight arrival ({arrival})"
            ));
        }
    }

    // Check-out must not precede check-in.
    if let Some(hotel) = dossier.hotel() {
        if let (Some(check_in), Some(check_out)) = (hotel.check_in.value, hotel.check_out.value) {
            if check_out < check_in {
                result.push_issue("Hotel check-out date is before check-in date");
            }
        }
    }

    // Stay length against the visa product's ceiling.
    if let (Some(stay), Some(visa_type)) = (plan.stay_days, context.visa_type) {
        let max = visa_type.max_stay_days();
        if stay > max {
            result.push_issue(format!(
                "Planned stay of {stay} days exceeds the {max}-day limit for this visa"
            ));
        }
    }

    result
}

/// Passport number on the passport against the one quoted in the
/// invitation letter.
pub fn passport_number_consistency(dossier: &Dossier) -> Option<CrossCheckResult> {
    let passport_number = dossier.passport()?.passport_number.value.clone()?;
    let quoted = dossier.invitation()?.invitee_passport_number.value.clone()?;

    let mut result = CrossCheckResult::clean();
    if normalize_for_comparison(&passport_number) != normalize_for_comparison(&quoted) {
        result.push_issue(format!(
            "Invitation letter quotes passport number '{quoted}' but the passport reads '{passport_number}'"
        ));
    }
    Some(result)
}

/// Nationality on the passport against the invitation letter. The letter
/// usually spells a demonym ("ETHIOPIENNE"), so agreement is judged on the
/// leading three letters of the normalized values.
pub fn nationality_consistency(dossier: &Dossier) -> Option<CrossCheckResult> {
    let passport_nat = dossier.passport()?.nationality.value.clone()?;
    let invitee_nat = dossier.invitation()?.invitee_nationality.value.clone()?;

    let a = normalize_for_comparison(&passport_nat);
    let b = normalize_for_comparison(&invitee_nat);
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let mut result = CrossCheckResult::clean();
    if a[..3] != b[..3] {
        result.push_issue(format!(
            "Invitation letter gives nationality '{invitee_nat}' but the passport reads '{passport_nat}'"
        ));
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_document, ExtractionContext};
    use crate::reference::{ReferenceData, VisaType};

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

    const PASSPORT_TEXT: &str = "Surname: BEKELE\nGiven Names: ABEBE TESHOME\n\
        Nationality: ETH\nDate of Birth: 22/08/1995\nSex: M\n\
        Date of Expiry: 16/09/2030\nPassport No. EP1234567";

    const TICKET_TEXT: &str = "PASSENGER NAME BEKELE/ABEBE TESHOME MR\n\
        ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 28/Dec/2025\n\
        BOOKING REF: XYZ9AB";

    const HOTEL_TEXT: &str = "Hotel: TIAMA ABIDJAN\nGuest Name: BEKELE ABEBE TESHOME\n\
        Confirmation No: HTL-482913\nCheck-in: 28/12/2025\nCheck-out: 10/01/2026";

    // ── travel plan ─────────────────────────────────────────────────

    #[test]
    fn travel_plan_from_ticket_and_hotel() {
        let dossier = build_dossier(&[
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, HOTEL_TEXT),
        ]);
        let plan = resolve_travel_plan(&dossier);
        assert_eq!(plan.travel_date, NaiveDate::from_ymd_opt(2025, 12, 28));
        assert_eq!(plan.return_date, NaiveDate::from_ymd_opt(2026, 1, 10));
        assert_eq!(plan.stay_days, Some(13));
        assert_eq!(plan.hotel_nights, Some(13));
    }

    #[test]
    fn empty_dossier_has_empty_plan() {
        let plan = resolve_travel_plan(&Dossier::new());
        assert_eq!(plan, TravelPlan::default());
    }

    // ── name consistency ────────────────────────────────────────────

    #[test]
    fn matching_names_are_consistent() {
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, HOTEL_TEXT),
        ]);
        let (result, anomalies) = name_consistency(&dossier, &ValidatorConfig::default()).unwrap();
        assert!(result.consistent, "issues: {:?}", result.issues);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn different_name_breaks_consistency() {
        let ticket = "PASSENGER NAME SMITH/JOHN MR\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 28/Dec/2025";
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::FlightTicket, ticket),
        ]);
        let (result, anomalies) = name_consistency(&dossier, &ValidatorConfig::default()).unwrap();
        assert!(!result.consistent);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("flight_ticket"));
        // SMITH JOHN is nothing like BEKELE ABEBE TESHOME.
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::NameMismatch);
    }

    #[test]
    fn single_document_skips_name_check() {
        let dossier = build_dossier(&[(DocumentType::Passport, PASSPORT_TEXT)]);
        assert!(name_consistency(&dossier, &ValidatorConfig::default()).is_none());
    }

    // ── date consistency ────────────────────────────────────────────

    #[test]
    fn coherent_dates_pass() {
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, HOTEL_TEXT),
        ]);
        let plan = resolve_travel_plan(&dossier);
        let result = date_consistency(
            &dossier,
            &plan,
            &ValidationContext::default(),
            &ValidatorConfig::default(),
        );
        assert!(result.consistent, "issues: {:?}", result.issues);
    }

    #[test]
    fn passport_expiring_within_six_months_of_travel() {
        // Expiry 2030-09-16; travel 2030-06-01 leaves about three months.
        let ticket = "PASSENGER NAME BEKELE/ABEBE TESHOME\n\
            ET 935 FROM: ADDIS ABABA (ADD) TO: ABIDJAN (ABJ) DATE: 01 JUN 2030";
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::FlightTicket, ticket),
        ]);
        let plan = resolve_travel_plan(&dossier);
        let result = date_consistency(
            &dossier,
            &plan,
            &ValidationContext::default(),
            &ValidatorConfig::default(),
        );
        assert!(result
            .issues
            .contains(&"Passport validity less than 6 months from travel".to_string()));
    }

    #[test]
    fn hotel_checkin_far_from_arrival_flagged() {
        let hotel = "Hotel: TIAMA ABIDJAN\nGuest Name: BEKELE ABEBE TESHOME\n\
            Confirmation No: HTL-482913\nCheck-in: 05/01/2026\nCheck-out: 10/01/2026";
        let dossier = build_dossier(&[
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, hotel),
        ]);
        let plan = resolve_travel_plan(&dossier);
        let result = date_consistency(
            &dossier,
            &plan,
            &ValidationContext::default(),
            &ValidatorConfig::default(),
        );
        assert!(result.issues.iter().any(|i| i.contains("Hotel check-in")));
    }

    #[test]
    fn one_day_checkin_gap_tolerated() {
        let hotel = "Hotel: TIAMA ABIDJAN\nGuest Name: BEKELE ABEBE TESHOME\n\
            Confirmation No: HTL-482913\nCheck-in: 29/12/2025\nCheck-out: 10/01/2026";
        let dossier = build_dossier(&[
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, hotel),
        ]);
        let plan = resolve_travel_plan(&dossier);
        let result = date_consistency(
            &dossier,
            &plan,
            &ValidationContext::default(),
            &ValidatorConfig::default(),
        );
        assert!(!result.issues.iter().any(|i| i.contains("Hotel check-in")));
    }

    #[test]
    fn stay_beyond_visa_ceiling_flagged() {
        let context = ValidationContext {
            visa_type: Some(VisaType::Transit),
            ..Default::default()
        };
        let dossier = build_dossier(&[
            (DocumentType::FlightTicket, TICKET_TEXT),
            (DocumentType::HotelReservation, HOTEL_TEXT),
        ]);
        let plan = resolve_travel_plan(&dossier);
        // 13-day stay on a 7-day transit visa.
        let result =
            date_consistency(&dossier, &plan, &context, &ValidatorConfig::default());
        assert!(result.issues.iter().any(|i| i.contains("exceeds the 7-day limit")));
    }

    #[test]
    fn absent_documents_skip_checks() {
        let result = date_consistency(
            &Dossier::new(),
            &TravelPlan::default(),
            &ValidationContext::default(),
            &ValidatorConfig::default(),
        );
        assert!(result.consistent);
        assert!(result.issues.is_empty());
    }

    // ── passport number / nationality vs invitation ─────────────────

    #[test]
    fn invitation_passport_number_mismatch() {
        let invitation = "Je soussigne, KOUASSI YAO PAUL\nCNI No: CI-0482291\n\
            invite: BEKELE ABEBE TESHOME\nPassport No: EP7654321\n\
            du: 28/12/2025 au: 10/01/2026\nSignature: K.Y.P.";
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::InvitationLetter, invitation),
        ]);
        let result = passport_number_consistency(&dossier).unwrap();
        assert!(!result.consistent);
    }

    #[test]
    fn demonym_nationality_agrees_with_code() {
        let invitation = "Je soussigne, KOUASSI YAO PAUL\nCNI No: CI-0482291\n\
            invite: BEKELE ABEBE TESHOME\nPassport No: EP1234567\n\
            de nationalite: ETHIOPIENNE\ndu: 28/12/2025 au: 10/01/2026";
        let dossier = build_dossier(&[
            (DocumentType::Passport, PASSPORT_TEXT),
            (DocumentType::InvitationLetter, invitation),
        ]);
        let number = passport_number_consistency(&dossier).unwrap();
        assert!(number.consistent);
        let nationality = nationality_consistency(&dossier).unwrap();
        assert!(nationality.consistent, "issues: {:?}", nationality.issues);
    }

    #[test]
    fn missing_invitation_skips_checks() {
        let dossier = build_dossier(&[(DocumentType::Passport, PASSPORT_TEXT)]);
        assert!(passport_number_consistency(&dossier).is_none());
        assert!(nationality_consistency(&dossier).is_none());
    }
}
