//! The dossier coherence validator.
//!
//! Pure function of the dossier, the application context and the
//! validation date: field completeness, per-document checks already
//! attached to each document, cross-document checks, fraud indicators,
//! anomalies, then the deterministic risk classification. A malformed or
//! partial dossier never fails the run — the worst outcome is a CRITICAL
//! assessment flagged for manual review.

use chrono::NaiveDate;

use super::cross::{self, resolve_travel_plan};
use super::detect;
use super::risk;
use super::types::{DocumentCheck, RiskAssessment, ValidationContext, ValidatorConfig};
use crate::extract::{
    flight, hotel, invitation, passport, payment, vaccination, DocumentData, DocumentType,
    Dossier, ExtractedDocument,
};
use crate::reference::ReferenceData;

pub struct DossierValidator {
    config: ValidatorConfig,
    reference: ReferenceData,
}

fn document_check(document: &ExtractedDocument) -> DocumentCheck {
    let missing = match &document.data {
        DocumentData::Passport(f) => passport::missing_fields(f),
        DocumentData::FlightTicket(f) => flight::missing_fields(f),
        DocumentData::HotelReservation(f) => hotel::missing_fields(f),
        DocumentData::VaccinationCard(f) => vaccination::missing_fields(f),
        DocumentData::PaymentProof(f) => payment::missing_fields(f),
        DocumentData::InvitationLetter(f) => invitation::missing_fields(f),
    };
    DocumentCheck {
        has_required_fields: missing.is_empty(),
        missing_fields: missing.into_iter().map(|f| f.to_string()).collect(),
    }
}

impl DossierValidator {
    pub fn new(reference: ReferenceData) -> DossierValidator {
        DossierValidator { config: ValidatorConfig::default(), reference }
    }

    pub fn with_config(reference: ReferenceData, config: ValidatorConfig) -> DossierValidator {
        DossierValidator { config, reference }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Validate a dossier with no extra application context.
    pub fn validate(&self, dossier: &Dossier, today: NaiveDate) -> RiskAssessment {
        self.validate_with_context(dossier, &ValidationContext::default(), today)
    }

    /// Validate a dossier against the application context at `today`.
    pub fn validate_with_context(
        &self,
        dossier: &Dossier,
        context: &ValidationContext,
        today: NaiveDate,
    ) -> RiskAssessment {
        let mut assessment = RiskAssessment {
            valid: true,
            risk_level: super::types::RiskLevel::Low,
            confidence: 1.0,
            requires_manual_review: false,
            cross_validations: Default::default(),
            fraud_indicators: Vec::new(),
            anomalies: Vec::new(),
            documents_validated: Default::default(),
            recommendations: Vec::new(),
        };

        // 1. Field completeness per present document.
        for (kind, document) in dossier.iter() {
            assessment
                .documents_validated
                .insert(*kind, document_check(document));
        }

        // 2. Fraud indicators from the per-document checks.
        assessment.fraud_indicators = detect::fraud_indicators(dossier, context, today);

        // 3. Cross-document checks. Issues are also kept in detection
        //    order for the recommendation list.
        let plan = resolve_travel_plan(dossier);
        let mut ordered_issues: Vec<String> = Vec::new();

        if let Some((name_check, name_anomalies)) = cross::name_consistency(dossier, &self.config)
        {
            ordered_issues.extend(name_check.issues.iter().cloned());
            assessment
                .cross_validations
                .insert("name_consistency".to_string(), name_check);
            assessment.anomalies.extend(name_anomalies);
        }

        let has_date_bearing_document = [
            DocumentType::Passport,
            DocumentType::FlightTicket,
            DocumentType::HotelReservation,
            DocumentType::InvitationLetter,
        ]
        .iter()
        .any(|kind| dossier.contains(*kind));
        if has_date_bearing_document {
            let date_check = cross::date_consistency(dossier, &plan, context, &self.config);
            ordered_issues.extend(date_check.issues.iter().cloned());
            assessment
                .cross_validations
                .insert("date_consistency".to_string(), date_check);
        }

        if let Some(check) = cross::passport_number_consistency(dossier) {
            ordered_issues.extend(check.issues.iter().cloned());
            assessment
                .cross_validations
                .insert("passport_number_consistency".to_string(), check);
        }
        if let Some(check) = cross::nationality_consistency(dossier) {
            ordered_issues.extend(check.issues.iter().cloned());
            assessment
                .cross_validations
                .insert("nationality_consistency".to_string(), check);
        }

        // 4. Anomalies from the trip shape and document contents.
        assessment
            .anomalies
            .extend(detect::anomalies(dossier, &plan, &self.config, today));

        // 5–6. Classification and confidence.
        assessment.risk_level = risk::classify(&assessment.fraud_indicators, &assessment.anomalies);
        assessment.requires_manual_review = risk::requires_manual_review(assessment.risk_level);
        let has_critical = assessment
            .fraud_indicators
            .iter()
            .any(|i| i.severity == super::types::Severity::Critical);
        assessment.valid = !assessment.requires_manual_review && !has_critical;
        assessment.confidence = risk::confidence_score(
            &assessment.fraud_indicators,
            &assessment.anomalies,
            ordered_issues.len(),
        );

        // 7. Recommendations, in detection order, closed by the summary.
        for indicator in &assessment.fraud_indicators {
            assessment.recommendations.push(indicator.description.clone());
        }
        assessment.recommendations.extend(ordered_issues);
        for anomaly in &assessment.anomalies {
            assessment.recommendations.push(anomaly.description.clone());
        }
        assessment
            .recommendations
            .push(risk::summary_recommendation(assessment.risk_level).to_string());

        tracing::debug!(
            risk_level = ?assessment.risk_level,
            confidence = assessment.confidence,
            indicators = assessment.fraud_indicators.len(),
            anomalies = assessment.anomalies.len(),
            "dossier assessed"
        );

        assessment
    }
}
