//! Document extraction and cross-document coherence/fraud-risk scoring
//! for visa application dossiers.
//!
//! The crate is a pure library: recognized text goes in (produced by an
//! external OCR/vision service), a typed [`extract::ExtractedDocument`]
//! comes out per upload, and [`assess::DossierValidator`] turns the full
//! document set into a [`assess::RiskAssessment`] for a human reviewer.
//! Nothing here performs I/O, reads the clock, or holds shared state —
//! callers inject the validation date and the reference tables, and may
//! extract distinct documents in parallel before the single fan-in point
//! at `validate`.

pub mod assess;
pub mod extract;
pub mod reference;
pub mod rules;
pub mod text;

pub use assess::{DossierValidator, RiskAssessment, ValidationContext, ValidatorConfig};
pub use extract::{
    extract_document, DocumentType, Dossier, ExtractedDocument, ExtractedField,
    ExtractionContext,
};
pub use reference::ReferenceData;
