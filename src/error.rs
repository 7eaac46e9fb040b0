//! Error taxonomy for the reconciliation pipeline and the intake surface.
//!
//! Only [`ValidationError`], an unresolved mismatch and an unresolved
//! [`ConflictDetail`] block submission. [`ExtractionError`] degrades to
//! "no auto-fill". Nothing here is retried automatically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::MismatchVerdict;
use crate::draft::{Field, WizardStep};

/// The OCR collaborator could not produce a usable payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Payload was not parseable at all.
    #[error("extraction payload malformed: {0}")]
    Malformed(String),

    /// Image could not be read by the OCR engine.
    #[error("receipt image unreadable: {0}")]
    Unreadable(String),

    /// OCR service unreachable or disabled.
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),
}

/// Locally detectable problem with a single field.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// What the server already has on file for a reused reference number.
///
/// Carries only what the donor needs to recognise the earlier donation.
/// Never stored in the draft beyond the reference it blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub reference_number: String,
    pub previous_amount: rust_decimal::Decimal,
    pub previous_recipient: String,
    pub previous_date: chrono::NaiveDate,
    pub previous_status: String,
}

impl std::fmt::Display for ConflictDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reference {} was already used for {} to {} on {} ({})",
            self.reference_number,
            self.previous_amount,
            self.previous_recipient,
            self.previous_date,
            self.previous_status
        )
    }
}

/// Why the draft refused an action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("amount mismatch: receipt shows {:?}, entered {:?}", .0.detected_amount, .0.entered_amount)]
    Mismatch(MismatchVerdict),

    #[error("duplicate reference: {0}")]
    Conflict(ConflictDetail),

    #[error("cannot {action} while {from:?}")]
    InvalidTransition { from: WizardStep, action: &'static str },
}

/// Outcome classes of a submission call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    /// Server-side re-validation rejected a field.
    #[error("server rejected {0}")]
    Validation(ValidationError),

    /// Reference number already used by another donation.
    #[error("duplicate reference: {0}")]
    Conflict(ConflictDetail),

    /// Network failure or timeout. The caller must re-trigger explicitly.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other response the intake endpoint is not expected to produce.
    #[error("unexpected response {status}: {body}")]
    Unexpected { status: u16, body: String },
}

/// Persistence failures on the intake side.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("reference number already recorded")]
    DuplicateReference,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}
