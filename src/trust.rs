//! Decides which reconciled draft fields the extraction may overwrite and lock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::draft::{DonationDraft, Field};
use crate::extraction::ExtractionResult;

/// Minimum overall confidence (inclusive) for an extracted value to win.
pub const LOCK_THRESHOLD: u8 = 70;

/// Fields the extraction can speak to.
pub const RECONCILED_FIELDS: [Field; 3] = [Field::ReferenceNumber, Field::ReceiptAmount, Field::DonationDate];

/// Resolved state of one reconciled field.
///
/// While `locked`, `value` is the extracted value and is authoritative.
/// Otherwise it is whatever the donor already has in the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLock {
    pub value: Option<String>,
    pub locked: bool,
}

impl FieldLock {
    pub fn unlocked(value: Option<String>) -> Self {
        Self { value, locked: false }
    }
}

/// Resolve every reconciled field against `extraction`.
///
/// Pure: the caller applies the map to the draft.
pub fn resolve(extraction: &ExtractionResult, draft: &DonationDraft) -> BTreeMap<Field, FieldLock> {
    let trusted = extraction.confidence >= LOCK_THRESHOLD;

    RECONCILED_FIELDS
        .iter()
        .map(|&field| {
            let lock = match extracted_value(extraction, field) {
                Some(value) if trusted => FieldLock {
                    value: Some(value),
                    locked: true,
                },
                _ => FieldLock::unlocked(draft.field_text(field)),
            };
            (field, lock)
        })
        .collect()
}

fn extracted_value(extraction: &ExtractionResult, field: Field) -> Option<String> {
    let value = match field {
        Field::ReferenceNumber => extraction.reference_number.clone(),
        Field::ReceiptAmount => extraction.amount.clone(),
        Field::DonationDate => extraction.date.map(|d| d.format("%Y-%m-%d").to_string()),
        _ => None,
    };
    value.filter(|v| !v.trim().is_empty())
}
