//! Output types of the dossier risk assessment.
//!
//! Field names here are the stable contract surface consumed by the
//! surrounding application; everything serializes to plain JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::DocumentType;
use crate::reference::{EntryCount, VisaType};

/// Severity of a detected problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Error,
    Warning,
}

/// Coarse risk classification of a dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// An evidenced violation of a document-intrinsic or cross-document rule —
/// a strong signal of fraud or ineligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudIndicatorType {
    ExpiredPassport,
    InvalidMrzChecksum,
    InvalidYellowFever,
    IncorrectPaymentAmount,
    MissingVerbalNote,
}

/// A pattern worth flagging for review, not inherently fraudulent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    LongStay,
    UrgentTravel,
    ReturnFlightMissing,
    NameMismatch,
    UnnotarizedInvitation,
    MinorApplicant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudIndicator {
    #[serde(rename = "type")]
    pub indicator_type: FraudIndicatorType,
    pub severity: Severity,
    pub description: String,
    pub evidence: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub evidence: BTreeMap<String, String>,
}

/// Outcome of one cross-document check. `issues` preserves detection
/// order; `consistent` holds exactly when no issue was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckResult {
    pub consistent: bool,
    pub issues: Vec<String>,
}

impl CrossCheckResult {
    pub fn clean() -> CrossCheckResult {
        CrossCheckResult { consistent: true, issues: Vec::new() }
    }

    pub fn push_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        self.consistent = false;
    }
}

/// Per-document field completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCheck {
    pub has_required_fields: bool,
    pub missing_fields: Vec<String>,
}

/// The complete risk assessment for one dossier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub valid: bool,
    pub risk_level: RiskLevel,
    /// In `[0, 1]`; monotonically non-increasing as issues accumulate.
    pub confidence: f32,
    pub requires_manual_review: bool,
    pub cross_validations: BTreeMap<String, CrossCheckResult>,
    pub fraud_indicators: Vec<FraudIndicator>,
    pub anomalies: Vec<Anomaly>,
    pub documents_validated: BTreeMap<DocumentType, DocumentCheck>,
    pub recommendations: Vec<String>,
}

/// Named, tunable thresholds of the assessment. Defaults are the values
/// the production workflow runs with.
pub mod thresholds {
    /// Stays longer than this many days flag `LONG_STAY`.
    pub const LONG_STAY_DAYS: i64 = 90;

    /// Departures within this many days of validation flag `URGENT_TRAVEL`.
    pub const URGENT_TRAVEL_DAYS: i64 = 5;

    /// Accepted gap between hotel check-in and flight arrival.
    pub const HOTEL_CHECKIN_TOLERANCE_DAYS: i64 = 1;

    /// Passport must outlive the travel date by this many months.
    pub const MIN_PASSPORT_VALIDITY_MONTHS: u32 = 6;

    /// Word-level threshold for cross-document name matching.
    pub const NAME_MATCH_THRESHOLD: f32 = 0.85;

    /// Below this similarity a name mismatch also raises an anomaly.
    pub const NAME_ANOMALY_THRESHOLD: f32 = 0.60;

    /// Applicants younger than this are flagged for guardianship papers.
    pub const ADULT_AGE_YEARS: i32 = 18;

    /// Confidence penalty per critical fraud indicator.
    pub const CONFIDENCE_PENALTY_CRITICAL: f32 = 0.30;

    /// Confidence penalty per error-severity fraud indicator.
    pub const CONFIDENCE_PENALTY_ERROR: f32 = 0.15;

    /// Confidence penalty per anomaly.
    pub const CONFIDENCE_PENALTY_ANOMALY: f32 = 0.05;

    /// Confidence penalty per cross-check issue.
    pub const CONFIDENCE_PENALTY_ISSUE: f32 = 0.05;
}

/// Tunable knobs of the dossier validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub long_stay_days: i64,
    pub urgent_travel_days: i64,
    pub hotel_checkin_tolerance_days: i64,
    pub min_passport_validity_months: u32,
    pub name_match_threshold: f32,
    pub name_anomaly_threshold: f32,
    pub adult_age_years: i32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            long_stay_days: thresholds::LONG_STAY_DAYS,
            urgent_travel_days: thresholds::URGENT_TRAVEL_DAYS,
            hotel_checkin_tolerance_days: thresholds::HOTEL_CHECKIN_TOLERANCE_DAYS,
            min_passport_validity_months: thresholds::MIN_PASSPORT_VALIDITY_MONTHS,
            name_match_threshold: thresholds::NAME_MATCH_THRESHOLD,
            name_anomaly_threshold: thresholds::NAME_ANOMALY_THRESHOLD,
            adult_age_years: thresholds::ADULT_AGE_YEARS,
        }
    }
}

/// Application facts supplied by the surrounding workflow, not read from
/// any document: the visa product applied for and whether a verbal note
/// was submitted (verbal notes are free-form and not extracted here).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub visa_type: Option<VisaType>,
    pub entry_count: Option<EntryCount>,
    pub verbal_note_present: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn serialized_names_match_contract() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::to_string(&FraudIndicatorType::ExpiredPassport).unwrap(),
            "\"EXPIRED_PASSPORT\""
        );
        assert_eq!(
            serde_json::to_string(&AnomalyType::ReturnFlightMissing).unwrap(),
            "\"RETURN_FLIGHT_MISSING\""
        );
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn cross_check_issue_flips_consistency() {
        let mut check = CrossCheckResult::clean();
        assert!(check.consistent);
        check.push_issue("names differ");
        assert!(!check.consistent);
        assert_eq!(check.issues.len(), 1);
    }

    #[test]
    fn default_config_mirrors_thresholds() {
        let config = ValidatorConfig::default();
        assert_eq!(config.long_stay_days, thresholds::LONG_STAY_DAYS);
        assert_eq!(config.urgent_travel_days, thresholds::URGENT_TRAVEL_DAYS);
        assert_eq!(config.name_match_threshold, thresholds::NAME_MATCH_THRESHOLD);
    }
}
