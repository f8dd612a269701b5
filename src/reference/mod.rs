//! Reference data consumed by extractors and the dossier validator.
//!
//! Fee schedule, jurisdiction list and payee allow-list are *configuration*,
//! not computed state: they are owned by the surrounding application and
//! passed in at construction time so tests can substitute fixtures. The
//! `Default` impls carry the production values for the Abidjan consular
//! district served from Addis Ababa.

use serde::{Deserialize, Serialize};

use crate::text::normalize_for_comparison;

/// Passport categories as printed in the MRZ document-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PassportType {
    Ordinary,
    Diplomatic,
    Service,
    Official,
    /// UN / AU laissez-passer travel documents.
    LaissezPasser,
    Unknown,
}

impl PassportType {
    /// Derive the category from the MRZ document-type characters
    /// (position 1–2 of line 1). `P` alone is an ordinary passport; the
    /// second character refines it (`PD` diplomatic, `PS` service).
    pub fn from_mrz_code(doc_type: char, subtype: char) -> PassportType {
        match (doc_type, subtype) {
            ('P', 'D') => PassportType::Diplomatic,
            ('P', 'S') => PassportType::Service,
            ('P', 'O') => PassportType::Official,
            ('P', _) => PassportType::Ordinary,
            ('D', _) => PassportType::Diplomatic,
            ('S', _) => PassportType::Service,
            ('O', _) => PassportType::Official,
            ('L', _) | ('U', _) | ('A', _) => PassportType::LaissezPasser,
            _ => PassportType::Unknown,
        }
    }

    /// Whether this category travels on the priority (diplomatic) workflow:
    /// free of charge and requiring a verbal note from the sending entity.
    pub fn is_priority_workflow(self) -> bool {
        matches!(
            self,
            PassportType::Diplomatic
                | PassportType::Service
                | PassportType::Official
                | PassportType::LaissezPasser
        )
    }

    /// Verbal note requirement. Laissez-passer holders are exempt.
    pub fn requires_verbal_note(self) -> bool {
        matches!(
            self,
            PassportType::Diplomatic | PassportType::Service | PassportType::Official
        )
    }
}

/// Visa products and their maximum authorized stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisaType {
    ShortStay,
    LongStay,
    Transit,
    VeryShortStay,
}

impl VisaType {
    /// Maximum days of stay the product authorizes.
    pub fn max_stay_days(self) -> i64 {
        match self {
            VisaType::ShortStay => 90,
            VisaType::LongStay => 365,
            VisaType::Transit => 7,
            VisaType::VeryShortStay => 15,
        }
    }
}

/// Number of entries requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryCount {
    Single,
    Multiple,
}

/// Countries and airports covered by the issuing post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    /// ICAO alpha-3 codes of nationalities served by this post.
    pub countries: Vec<String>,
    /// IATA codes of destination-country airports.
    pub destination_airports: Vec<String>,
    /// IATA codes of departure airports inside the jurisdiction.
    pub jurisdiction_airports: Vec<String>,
    /// Destination cities, normalized form, for hotel-location checks.
    pub destination_cities: Vec<String>,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        JurisdictionConfig {
            countries: ["ETH", "DJI", "ERI", "KEN", "SSD", "SOM", "UGA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            destination_airports: ["ABJ", "BYK", "MJC", "SPY", "OGO", "HGO"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jurisdiction_airports: ["ADD", "JIB", "ASM", "NBO", "MBA", "EBB", "MGQ", "JUB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            destination_cities: [
                "ABIDJAN",
                "YAMOUSSOUKRO",
                "BOUAKE",
                "DALOA",
                "SAN PEDRO",
                "KORHOGO",
                "MAN",
                "GRAND BASSAM",
                "ASSINIE",
                "SASSANDRA",
                "ODIENNE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl JurisdictionConfig {
    /// Whether an ICAO alpha-3 nationality code is served by this post.
    pub fn covers_country(&self, code: &str) -> bool {
        let code = normalize_for_comparison(code);
        self.countries.iter().any(|c| *c == code)
    }

    pub fn is_destination_airport(&self, iata: &str) -> bool {
        let iata = normalize_for_comparison(iata);
        self.destination_airports.iter().any(|a| *a == iata)
    }

    pub fn is_jurisdiction_airport(&self, iata: &str) -> bool {
        let iata = normalize_for_comparison(iata);
        self.jurisdiction_airports.iter().any(|a| *a == iata)
    }

    /// Whether a free-text city name refers to a destination city.
    pub fn is_destination_city(&self, city: &str) -> bool {
        let city = normalize_for_comparison(city);
        self.destination_cities
            .iter()
            .any(|c| city.contains(&normalize_for_comparison(c)))
    }
}

/// One fee line: base fee plus the optional express surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub base: f64,
    pub express: f64,
}

/// One row of the fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRow {
    pub visa_type: VisaType,
    pub entries: EntryCount,
    pub fee: Fee,
}

/// Visa fee schedule for the paying (ordinary) workflow.
///
/// The priority (diplomatic) workflow is free across the board; the table
/// only stores the paying rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub currency: String,
    /// Accepted relative deviation when matching a paid amount, in percent.
    pub tolerance_percent: f64,
    pub rows: Vec<FeeRow>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            currency: "XOF".to_string(),
            tolerance_percent: 5.0,
            rows: vec![
                FeeRow {
                    visa_type: VisaType::ShortStay,
                    entries: EntryCount::Single,
                    fee: Fee { base: 73_000.0, express: 50_000.0 },
                },
                FeeRow {
                    visa_type: VisaType::ShortStay,
                    entries: EntryCount::Multiple,
                    fee: Fee { base: 120_000.0, express: 50_000.0 },
                },
                FeeRow {
                    visa_type: VisaType::Transit,
                    entries: EntryCount::Single,
                    fee: Fee { base: 50_000.0, express: 0.0 },
                },
                FeeRow {
                    visa_type: VisaType::VeryShortStay,
                    entries: EntryCount::Single,
                    fee: Fee { base: 50_000.0, express: 30_000.0 },
                },
            ],
        }
    }
}

impl FeeSchedule {
    /// Expected fee for an application, `None` when the category is free.
    pub fn expected_fee(
        &self,
        passport_type: PassportType,
        visa_type: VisaType,
        entries: EntryCount,
    ) -> Option<Fee> {
        if passport_type.is_priority_workflow() {
            return None;
        }
        self.rows
            .iter()
            .find(|r| r.visa_type == visa_type && r.entries == entries)
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|r| r.visa_type == VisaType::ShortStay && r.entries == EntryCount::Single)
            })
            .map(|r| r.fee)
    }

    /// Whether a paid amount matches any expected total (base, or base plus
    /// express) within the configured tolerance. Used when the exact visa
    /// product is not known at validation time.
    pub fn amount_matches_any(&self, amount: f64, currency: &str) -> bool {
        if normalize_for_comparison(currency) != self.currency {
            return false;
        }
        self.rows.iter().any(|row| {
            self.within_tolerance(amount, row.fee.base)
                || self.within_tolerance(amount, row.fee.base + row.fee.express)
        })
    }

    /// Whether a paid amount matches one specific expected fee.
    pub fn amount_matches(&self, amount: f64, expected: Fee, express: bool) -> bool {
        let target = if express { expected.base + expected.express } else { expected.base };
        self.within_tolerance(amount, target)
    }

    fn within_tolerance(&self, amount: f64, expected: f64) -> bool {
        if expected <= 0.0 {
            return false;
        }
        ((amount - expected).abs() / expected) * 100.0 <= self.tolerance_percent
    }
}

/// Payees authorized to receive visa fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayeeAllowList {
    pub names: Vec<String>,
}

impl Default for PayeeAllowList {
    fn default() -> Self {
        PayeeAllowList {
            names: [
                "TRESOR PUBLIC COTE D'IVOIRE",
                "TRESOR PUBLIC CI",
                "TRESOR CI",
                "AMBASSADE COTE D'IVOIRE",
                "AMBASSADE CI ETHIOPIE",
                "EMBASSY OF COTE D'IVOIRE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl PayeeAllowList {
    /// Fuzzy membership: a recognized payee counts when it contains, or is
    /// contained by, an allow-listed name in comparison normal form.
    pub fn matches(&self, payee: &str) -> bool {
        let candidate = normalize_for_comparison(payee);
        if candidate.is_empty() {
            return false;
        }
        self.names.iter().any(|name| {
            let name = normalize_for_comparison(name);
            candidate.contains(&name) || name.contains(&candidate)
        })
    }
}

/// Bundle of all reference tables, passed to extractors and the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    pub jurisdiction: JurisdictionConfig,
    pub fees: FeeSchedule,
    pub payees: PayeeAllowList,
}
