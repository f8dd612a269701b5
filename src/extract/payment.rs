//! Payment proof extraction.
//!
//! Receipts arrive from banks, mobile money operators and the consular
//! cash desk, in two languages. Amounts tolerate spaces and commas as
//! thousands separators; the local aliases `FCFA`/`CFA` normalize to the
//! ISO code `XOF`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{confidence, ExtractedField, ExtractionContext};
use crate::text::{normalize_name, parse_flexible_date};

/// Days a payment proof stays acceptable.
pub const PAYMENT_RECENCY_DAYS: i64 = 30;

/// How the fee was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
    MobileMoney,
    Card,
    Cheque,
}

/// Fields recognized from a payment receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFields {
    pub amount: ExtractedField<f64>,
    /// ISO 4217 code; `FCFA` and `CFA` normalize to `XOF`.
    pub currency: ExtractedField<String>,
    pub payment_date: ExtractedField<NaiveDate>,
    pub reference: ExtractedField<String>,
    pub payer: ExtractedField<String>,
    pub payee: ExtractedField<String>,
    pub payment_method: Option<PaymentMethod>,
    pub bank_name: ExtractedField<String>,
}

static AMOUNT_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:MONTANT|AMOUNT|TOTAL|SOMME|PAID|PAYE|RECU)\s*(?:/\s*(?:AMOUNT|MONTANT))?\s*[:.]?\s*([0-9][0-9,. ]*)\s*(XOF|FCFA|CFA|ETB|EUR|USD)?",
    )
    .unwrap()
});

static CURRENCY_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(XOF|FCFA|CFA|ETB|EUR|USD)\s*([0-9][0-9,. ]*)").unwrap());

static AMOUNT_WITH_CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,3}[,. ]?\d{3})\s*(XOF|FCFA|CFA|ETB|EUR|USD)\b").unwrap());

static PAYMENT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:DATE|DATED|LE|DU|PAYMENT\s*DATE|DATE\s*DE\s*PAIEMENT)\s*[:.]?\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{4}-\d{2}-\d{2})")
        .unwrap()
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:REFERENCE|REF|RECEIPT|RECU|QUITTANCE|TRANSACTION|TXN|TRX)\s*(?:ID|NO|N)?\s*[°:.#]?\s*([A-Z0-9][A-Z0-9\-/]{4,19})\b")
        .unwrap()
});

static PAYER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:PAYEUR|PAYER|FROM|CLIENT|CUSTOMER|DEPOSITED\s*BY)\s*(?:/\s*(?:PAYER|PAYEUR))?\s*[:.]\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

static PAYEE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:BENEFICIAIRE|PAYEE|BENEFICIARY|TO|EN\s*FAVEUR\s*DE)\s*(?:/\s*(?:PAYEE|BENEFICIAIRE))?\s*[:.]\s*([A-Z][A-Z'\- ]+)")
        .unwrap()
});

const BANKS: &[&str] = &[
    "COMMERCIAL BANK OF ETHIOPIA", "DASHEN BANK", "AWASH BANK", "ABYSSINIA BANK",
    "UNITED BANK", "NIB BANK", "WEGAGEN BANK", "ECOBANK", "STANDARD CHARTERED",
    "BANK OF AFRICA", "SGBCI", "BICICI", "CORIS BANK",
];

const METHOD_KEYWORDS: &[(PaymentMethod, &[&str])] = &[
    (PaymentMethod::BankTransfer, &["VIREMENT", "WIRE TRANSFER", "BANK TRANSFER", "TRANSFER"]),
    (PaymentMethod::MobileMoney, &["MOBILE MONEY", "MTN MONEY", "ORANGE MONEY", "MOOV MONEY", "WAVE", "TELEBIRR", "M-PESA"]),
    (PaymentMethod::Card, &["MASTERCARD", "CARTE", "DEBIT CARD", "CREDIT CARD", "VISA CARD"]),
    (PaymentMethod::Cheque, &["CHEQUE", "CHECK NO"]),
    (PaymentMethod::Cash, &["ESPECES", "CASH", "NUMERAIRE", "CAISSE"]),
];

fn normalize_currency(raw: &str) -> String {
    match raw.trim().to_uppercase().as_str() {
        "FCFA" | "CFA" => "XOF".to_string(),
        other => other.to_string(),
    }
}

/// Parse `73,000` / `73 000` / `73000` to a number. Separators are
/// thousands markers; receipts in these currencies carry no decimals.
fn parse_amount_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn extract_amount(upper: &str) -> (Option<f64>, Option<String>) {
    if let Some(c) = AMOUNT_LABELED.captures(upper) {
        let amount = parse_amount_value(&c[1]);
        let currency = c.get(2).map(|m| normalize_currency(m.as_str()));
        if amount.is_some() {
            return (amount, currency);
        }
    }
    if let Some(c) = CURRENCY_FIRST.captures(upper) {
        if let Some(amount) = parse_amount_value(&c[2]) {
            return (Some(amount), Some(normalize_currency(&c[1])));
        }
    }
    if let Some(c) = AMOUNT_WITH_CURRENCY.captures(upper) {
        if let Some(amount) = parse_amount_value(&c[1]) {
            return (Some(amount), Some(normalize_currency(&c[2])));
        }
    }
    (None, None)
}

fn detect_method(upper: &str) -> Option<PaymentMethod> {
    for (method, keywords) in METHOD_KEYWORDS {
        if keywords.iter().any(|k| upper.contains(k)) {
            return Some(*method);
        }
    }
    None
}

/// Extract payment proof fields from recognized text.
pub fn extract(raw_text: &str, _ctx: &ExtractionContext<'_>) -> PaymentFields {
    let mut fields = PaymentFields::default();
    if raw_text.trim().is_empty() {
        return fields;
    }
    let upper = raw_text.to_uppercase();

    let (amount, currency) = extract_amount(&upper);
    fields.amount = ExtractedField::from_option(amount, confidence::LABELED);
    fields.currency = ExtractedField::from_option(currency, confidence::LABELED);

    fields.payment_date = ExtractedField::from_option(
        PAYMENT_DATE.captures(&upper).and_then(|c| parse_flexible_date(&c[1])),
        confidence::LABELED,
    );

    fields.reference = ExtractedField::from_option(
        REFERENCE
            .captures_iter(&upper)
            .map(|c| c[1].to_string())
            .find(|v| v.chars().any(|ch| ch.is_ascii_digit())),
        confidence::LABELED,
    );

    fields.payer = ExtractedField::from_option(
        PAYER
            .captures(&upper)
            .map(|c| normalize_name(c[1].trim()))
            .filter(|n| n.len() > 3),
        confidence::LABELED,
    );

    fields.payee = ExtractedField::from_option(
        PAYEE
            .captures(&upper)
            .map(|c| c[1].trim().to_string())
            .filter(|n| n.len() > 5),
        confidence::LABELED,
    );

    fields.payment_method = detect_method(&upper);

    fields.bank_name = ExtractedField::from_option(
        BANKS
            .iter()
            .find(|b| upper.contains(*b))
            .map(|b| b.to_string()),
        confidence::CONTEXTUAL,
    );

    fields
}

pub fn missing_fields(fields: &PaymentFields) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !fields.amount.is_present() {
        missing.push("amount");
    }
    if !fields.payment_date.is_present() {
        missing.push("payment_date");
    }
    if !fields.reference.is_present() {
        missing.push("reference");
    }
    missing
}

pub fn has_required_fields(fields: &PaymentFields) -> bool {
    missing_fields(fields).is_empty()
}

/// Document-local checks against the injected fee table and payee list.
pub fn validate(fields: &PaymentFields, ctx: &ExtractionContext<'_>) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();
    let reference = ctx.reference;

    let currency = fields
        .currency
        .value
        .clone()
        .unwrap_or_else(|| reference.fees.currency.clone());
    let amount_ok = fields
        .amount
        .value
        .is_some_and(|a| reference.fees.amount_matches_any(a, &currency));
    checks.insert("amount_matches_expected".to_string(), amount_ok);
    if !amount_ok {
        if let Some(amount) = fields.amount.value {
            tracing::warn!(amount, %currency, "payment amount matches no scheduled fee");
        }
    }

    checks.insert(
        "payee_is_tresor_ci".to_string(),
        fields
            .payee
            .value
            .as_deref()
            .is_some_and(|p| reference.payees.matches(p)),
    );

    checks.insert(
        "date_is_recent".to_string(),
        fields.payment_date.value.is_some_and(|d| {
            d <= ctx.today && ctx.today - d <= Duration::days(PAYMENT_RECENCY_DAYS)
        }),
    );

    checks.insert(
        "reference_format_valid".to_string(),
        fields.reference.value.as_deref().is_some_and(|r| r.len() >= 6),
    );

    checks
}
