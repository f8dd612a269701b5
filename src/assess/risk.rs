//! Risk classification and confidence scoring.
//!
//! The classification is a deterministic rule ladder over the indicator
//! and anomaly sets — auditable, and reproducible from the assessment
//! output alone. It is not a weighted score: one critical indicator is
//! enough to pin the dossier at CRITICAL regardless of everything else.

use super::types::{thresholds, Anomaly, FraudIndicator, RiskLevel, Severity};

fn count_severity(indicators: &[FraudIndicator], severity: Severity) -> usize {
    indicators.iter().filter(|i| i.severity == severity).count()
}

/// Classify a dossier. Rules in descending priority:
/// any critical indicator → CRITICAL; two errors, or one error plus any
/// anomaly → HIGH; one error, or two or more anomalies → MEDIUM; else LOW.
pub fn classify(indicators: &[FraudIndicator], anomalies: &[Anomaly]) -> RiskLevel {
    let critical = count_severity(indicators, Severity::Critical);
    let errors = count_severity(indicators, Severity::Error);

    if critical >= 1 {
        RiskLevel::Critical
    } else if errors >= 2 || (errors == 1 && !anomalies.is_empty()) {
        RiskLevel::High
    } else if errors == 1 || anomalies.len() >= 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// HIGH and CRITICAL dossiers go to a human.
pub fn requires_manual_review(level: RiskLevel) -> bool {
    matches!(level, RiskLevel::High | RiskLevel::Critical)
}

/// Confidence in the dossier: starts at 1.0 and only ever goes down as
/// issues accumulate.
pub fn confidence_score(
    indicators: &[FraudIndicator],
    anomalies: &[Anomaly],
    cross_check_issues: usize,
) -> f32 {
    let critical = count_severity(indicators, Severity::Critical) as f32;
    let errors = count_severity(indicators, Severity::Error) as f32;

    let score = 1.0
        - critical * thresholds::CONFIDENCE_PENALTY_CRITICAL
        - errors * thresholds::CONFIDENCE_PENALTY_ERROR
        - anomalies.len() as f32 * thresholds::CONFIDENCE_PENALTY_ANOMALY
        - cross_check_issues as f32 * thresholds::CONFIDENCE_PENALTY_ISSUE;

    score.clamp(0.0, 1.0)
}

/// The closing summary line appended to the recommendation list.
pub fn summary_recommendation(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "REJECT: Critical fraud indicators detected",
        RiskLevel::High => "MANUAL_REVIEW: High risk - require human verification",
        RiskLevel::Medium => "PROCEED_WITH_CAUTION: Additional verification recommended",
        RiskLevel::Low => "APPROVE: Low risk application",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::types::{AnomalyType, FraudIndicatorType};
    use std::collections::BTreeMap;

    fn indicator(severity: Severity) -> FraudIndicator {
        FraudIndicator {
            indicator_type: FraudIndicatorType::IncorrectPaymentAmount,
            severity,
            description: "test".to_string(),
            evidence: BTreeMap::new(),
        }
    }

    fn anomaly() -> Anomaly {
        Anomaly {
            anomaly_type: AnomalyType::LongStay,
            severity: Severity::Warning,
            description: "test".to_string(),
            evidence: BTreeMap::new(),
        }
    }

    // ── classification ladder ───────────────────────────────────────

    #[test]
    fn no_findings_is_low() {
        assert_eq!(classify(&[], &[]), RiskLevel::Low);
    }

    #[test]
    fn single_anomaly_stays_low() {
        assert_eq!(classify(&[], &[anomaly()]), RiskLevel::Low);
    }

    #[test]
    fn two_anomalies_reach_medium() {
        assert_eq!(classify(&[], &[anomaly(), anomaly()]), RiskLevel::Medium);
    }

    #[test]
    fn one_error_is_medium() {
        assert_eq!(classify(&[indicator(Severity::Error)], &[]), RiskLevel::Medium);
    }

    #[test]
    fn error_plus_anomaly_escalates_to_high() {
        assert_eq!(
            classify(&[indicator(Severity::Error)], &[anomaly()]),
            RiskLevel::High
        );
    }

    #[test]
    fn two_errors_are_high() {
        assert_eq!(
            classify(&[indicator(Severity::Error), indicator(Severity::Error)], &[]),
            RiskLevel::High
        );
    }

    #[test]
    fn any_critical_dominates() {
        assert_eq!(classify(&[indicator(Severity::Critical)], &[]), RiskLevel::Critical);
        // Even alongside everything else.
        assert_eq!(
            classify(
                &[indicator(Severity::Critical), indicator(Severity::Error)],
                &[anomaly(), anomaly()]
            ),
            RiskLevel::Critical
        );
    }

    #[test]
    fn warnings_do_not_raise_risk() {
        assert_eq!(classify(&[indicator(Severity::Warning)], &[]), RiskLevel::Low);
    }

    #[test]
    fn manual_review_for_high_and_critical() {
        assert!(!requires_manual_review(RiskLevel::Low));
        assert!(!requires_manual_review(RiskLevel::Medium));
        assert!(requires_manual_review(RiskLevel::High));
        assert!(requires_manual_review(RiskLevel::Critical));
    }

    // ── confidence ──────────────────────────────────────────────────

    #[test]
    fn clean_dossier_has_full_confidence() {
        assert_eq!(confidence_score(&[], &[], 0), 1.0);
    }

    #[test]
    fn penalties_stack() {
        let score = confidence_score(
            &[indicator(Severity::Critical), indicator(Severity::Error)],
            &[anomaly()],
            2,
        );
        // 1.0 - 0.30 - 0.15 - 0.05 - 0.10
        assert!((score - 0.40).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn confidence_clamps_at_zero() {
        let many: Vec<FraudIndicator> =
            (0..5).map(|_| indicator(Severity::Critical)).collect();
        assert_eq!(confidence_score(&many, &[], 10), 0.0);
    }

    #[test]
    fn adding_issues_never_raises_confidence() {
        let base = confidence_score(&[], &[anomaly()], 1);
        let more = confidence_score(&[], &[anomaly(), anomaly()], 1);
        assert!(more <= base);
        let even_more = confidence_score(&[indicator(Severity::Error)], &[anomaly(), anomaly()], 1);
        assert!(even_more <= more);
    }

    // ── summary line ────────────────────────────────────────────────

    #[test]
    fn summary_lines_per_level() {
        assert!(summary_recommendation(RiskLevel::Critical).starts_with("REJECT"));
        assert!(summary_recommendation(RiskLevel::High).starts_with("MANUAL_REVIEW"));
        assert!(summary_recommendation(RiskLevel::Medium).starts_with("PROCEED_WITH_CAUTION"));
        assert!(summary_recommendation(RiskLevel::Low).starts_with("APPROVE"));
    }
}
