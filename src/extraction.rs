//! Canonical shape of an OCR extraction.
//!
//! The OCR collaborator's payload is loosely typed: field names vary, numbers
//! arrive as strings or JSON numbers, and "not detected" shows up as `null`,
//! `""` or a missing key. [`normalize`] folds all of that into
//! [`ExtractionResult`], where absence is always `None`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtractionError;

pub const UNKNOWN_TEMPLATE: &str = "unknown";

/// Immutable snapshot of one receipt read.
///
/// `confidence` scores the whole extraction, not individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub reference_number: Option<String>,
    pub amount: Option<String>,
    pub date: Option<NaiveDate>,
    pub confidence: u8,
    pub template: String,
    pub raw_text: String,
}

impl ExtractionResult {
    /// Result used when extraction failed: nothing to trust.
    pub fn empty() -> Self {
        Self {
            reference_number: None,
            amount: None,
            date: None,
            confidence: 0,
            template: UNKNOWN_TEMPLATE.to_string(),
            raw_text: String::new(),
        }
    }

    pub fn is_template_known(&self) -> bool {
        !self.template.eq_ignore_ascii_case(UNKNOWN_TEMPLATE)
    }
}

/// Wire shape as the collaborator sends it. Every field is optional and untyped.
#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default, alias = "refNumber", alias = "ref_number", alias = "referenceNumber")]
    reference_number: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default, alias = "donationDate", alias = "donation_date")]
    date: Option<Value>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default, alias = "channel")]
    template: Option<Value>,
    #[serde(default, alias = "rawText", alias = "raw_text")]
    text: Option<Value>,
}

/// Parse and normalize a raw collaborator payload.
///
/// Fails only when the payload is not a JSON object at all. A result with
/// confidence 0 and no fields is a normal, untrusted result.
pub fn normalize(raw: &str) -> Result<ExtractionResult, ExtractionError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    normalize_value(value)
}

pub fn normalize_value(value: Value) -> Result<ExtractionResult, ExtractionError> {
    if !value.is_object() {
        return Err(ExtractionError::Malformed(format!(
            "expected an object, got {}",
            json_kind(&value)
        )));
    }
    let raw: RawExtraction =
        serde_json::from_value(value).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let date = text_of(raw.date.as_ref()).and_then(|s| parse_receipt_date(&s));

    Ok(ExtractionResult {
        reference_number: text_of(raw.reference_number.as_ref()),
        amount: text_of(raw.amount.as_ref()),
        date,
        confidence: clamp_confidence(raw.confidence.as_ref()),
        template: text_of(raw.template.as_ref()).unwrap_or_else(|| UNKNOWN_TEMPLATE.to_string()),
        raw_text: text_of(raw.text.as_ref()).unwrap_or_default(),
    })
}

/// Dates as they appear on receipts: ISO, US slashes, or spelled-out months.
pub fn parse_receipt_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%Y/%m/%d",
        "%b %d, %Y",
        "%B %d, %Y",
        "%d %b %Y",
        "%d %B %Y",
    ];
    let trimmed = raw.trim();
    // Timestamps like "2024-03-01T10:22:00" keep only the date part.
    let candidate = trimmed.split('T').next().unwrap_or(trimmed);
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn clamp_confidence(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match score {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
