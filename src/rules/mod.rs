//! Conditional document-requirement rules.
//!
//! A small structural-recursion evaluator over a flat context map decides,
//! per application, which supporting documents are required, optional or
//! hidden: a diplomatic passport needs a verbal note, transit visas need an
//! onward ticket, applicants residing outside their nationality need a
//! residence proof. The dossier validator consumes the resulting plan to
//! know which cross-checks even apply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Problems in a configured rule set, caught at load time rather than
/// silently mis-evaluating later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule {rule}: empty {kind} composite always evaluates trivially")]
    EmptyComposite { rule: String, kind: &'static str },

    #[error("rule {rule}: operator {op:?} on field '{field}' needs an array value")]
    NonArrayMembership { rule: String, op: Operator, field: String },
}

/// Flat evaluation context. Missing fields read as `Null` and compare as
/// such — never as an error.
pub type RuleContext = BTreeMap<String, Value>;

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT_IN")]
    NotIn,
}

/// A condition tree: composites (`all`/`any`), a two-field inequality
/// (`diff`), or a leaf comparison against a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Leaf {
        field: String,
        op: Operator,
        value: Value,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Diff {
        left: String,
        right: String,
    },
}

impl Condition {
    /// Convenience constructor for the common equality leaf.
    pub fn field_equals(field: &str, value: impl Into<Value>) -> Condition {
        Condition::Leaf {
            field: field.to_string(),
            op: Operator::Eq,
            value: value.into(),
        }
    }

    /// Convenience constructor for membership in a list of strings.
    pub fn field_in(field: &str, values: &[&str]) -> Condition {
        Condition::Leaf {
            field: field.to_string(),
            op: Operator::In,
            value: Value::Array(values.iter().map(|v| Value::String(v.to_string())).collect()),
        }
    }
}

/// Ordering across the JSON values that occur in rule contexts: numbers
/// compare numerically, strings lexically, anything else (including a
/// missing field) does not order.
fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn value_in(needle: &Value, haystack: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.contains(needle),
        single => single == needle,
    }
}

/// Evaluate a condition tree against a context.
pub fn evaluate(condition: &Condition, context: &RuleContext) -> bool {
    match condition {
        Condition::All { conditions } => conditions.iter().all(|c| evaluate(c, context)),
        Condition::Any { conditions } => conditions.iter().any(|c| evaluate(c, context)),
        Condition::Diff { left, right } => {
            context.get(left).unwrap_or(&Value::Null)
                != context.get(right).unwrap_or(&Value::Null)
        }
        Condition::Leaf { field, op, value } => {
            let actual = context.get(field).unwrap_or(&Value::Null);
            match op {
                Operator::Eq => actual == value,
                Operator::Ne => actual != value,
                Operator::Gt => matches!(compare(actual, value), Some(std::cmp::Ordering::Greater)),
                Operator::Ge => matches!(
                    compare(actual, value),
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                ),
                Operator::Lt => matches!(compare(actual, value), Some(std::cmp::Ordering::Less)),
                Operator::Le => matches!(
                    compare(actual, value),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ),
                Operator::In => value_in(actual, value),
                Operator::NotIn => !value_in(actual, value),
            }
        }
    }
}

/// What a matched rule does to its target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementAction {
    Show,
    Hide,
    Required,
    Optional,
}

/// One display rule: when `condition` holds, apply `action` to `document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRule {
    pub id: String,
    pub document: String,
    pub action: RequirementAction,
    pub condition: Condition,
    /// Shown to the applicant when the rule fires.
    pub note: Option<String>,
}

impl DisplayRule {
    fn new(
        id: &str,
        document: &str,
        action: RequirementAction,
        condition: Condition,
        note: Option<&str>,
    ) -> DisplayRule {
        DisplayRule {
            id: id.to_string(),
            document: document.to_string(),
            action,
            condition,
            note: note.map(|n| n.to_string()),
        }
    }
}

/// Passport categories on the priority workflow (free, no express option).
const PRIORITY_TYPES: &[&str] = &["diplomatic", "service", "official", "laissez_passer"];

/// The built-in rule set for this post.
pub fn default_rules() -> Vec<DisplayRule> {
    vec![
        DisplayRule::new(
            "R01",
            "verbal_note",
            RequirementAction::Required,
            Condition::field_in("passport_type", &["diplomatic", "service", "official"]),
            Some("Verbal note required for this passport type"),
        ),
        DisplayRule::new(
            "R02",
            "vaccination_card",
            RequirementAction::Required,
            Condition::field_equals("destination", "CI"),
            Some("Yellow fever vaccination certificate mandatory"),
        ),
        DisplayRule::new(
            "R03",
            "payment_proof",
            RequirementAction::Hide,
            Condition::field_in("passport_type", PRIORITY_TYPES),
            Some("Visa free of charge for this passport type"),
        ),
        DisplayRule::new(
            "R04",
            "payment_proof",
            RequirementAction::Required,
            Condition::Leaf {
                field: "passport_type".to_string(),
                op: Operator::NotIn,
                value: Value::Array(
                    PRIORITY_TYPES.iter().map(|v| Value::String(v.to_string())).collect(),
                ),
            },
            None,
        ),
        DisplayRule::new(
            "R05",
            "hotel_reservation",
            RequirementAction::Required,
            Condition::field_equals("accommodation_type", "hotel"),
            None,
        ),
        DisplayRule::new(
            "R06",
            "invitation_letter",
            RequirementAction::Required,
            Condition::field_equals("accommodation_type", "private_host"),
            Some("Host invitation letter required"),
        ),
        DisplayRule::new(
            "R07",
            "hotel_reservation",
            RequirementAction::Optional,
            Condition::field_equals("accommodation_type", "private_host"),
            None,
        ),
        DisplayRule::new(
            "R08",
            "return_ticket",
            RequirementAction::Required,
            Condition::field_equals("visa_type", "transit"),
            Some("Onward or return ticket mandatory for transit"),
        ),
        DisplayRule::new(
            "R09",
            "residence_proof",
            RequirementAction::Required,
            Condition::Diff {
                left: "nationality".to_string(),
                right: "residence_country".to_string(),
            },
            Some("Proof of residence required"),
        ),
        DisplayRule::new(
            "R10",
            "express_option",
            RequirementAction::Hide,
            Condition::field_in("passport_type", PRIORITY_TYPES),
            Some("Processing is already priority"),
        ),
        DisplayRule::new(
            "R11",
            "flight_ticket",
            RequirementAction::Optional,
            Condition::field_equals("passport_type", "laissez_passer"),
            None,
        ),
    ]
}

fn check_condition(condition: &Condition, rule: &str) -> Result<(), RuleError> {
    match condition {
        Condition::All { conditions } | Condition::Any { conditions } => {
            if conditions.is_empty() {
                let kind = if matches!(condition, Condition::All { .. }) { "all" } else { "any" };
                return Err(RuleError::EmptyComposite { rule: rule.to_string(), kind });
            }
            for sub in conditions {
                check_condition(sub, rule)?;
            }
            Ok(())
        }
        Condition::Leaf { field, op: op @ (Operator::In | Operator::NotIn), value } => {
            if !value.is_array() {
                return Err(RuleError::NonArrayMembership {
                    rule: rule.to_string(),
                    op: *op,
                    field: field.clone(),
                });
            }
            Ok(())
        }
        Condition::Leaf { .. } | Condition::Diff { .. } => Ok(()),
    }
}

/// Validate a rule set after loading it from configuration.
pub fn validate_rules(rules: &[DisplayRule]) -> Result<(), RuleError> {
    for rule in rules {
        check_condition(&rule.condition, &rule.id)?;
    }
    Ok(())
}

/// Evaluate the rule set: the resulting plan maps each document mentioned
/// by a matching rule to its action. Later rules override earlier ones for
/// the same document, so order the set from general to specific.
pub fn requirement_plan(
    rules: &[DisplayRule],
    context: &RuleContext,
) -> BTreeMap<String, RequirementAction> {
    let mut plan = BTreeMap::new();
    for rule in rules {
        if evaluate(&rule.condition, context) {
            plan.insert(rule.document.clone(), rule.action);
        }
    }
    plan
}

/// Documents the plan marks as required.
pub fn required_documents(
    rules: &[DisplayRule],
    context: &RuleContext,
) -> Vec<String> {
    requirement_plan(rules, context)
        .into_iter()
        .filter(|(_, action)| *action == RequirementAction::Required)
        .map(|(document, _)| document)
        .collect()
}
