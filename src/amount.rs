//! Amount reconciliation between the donor's entered amount and the
//! amount read off the receipt.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Differences up to and including this many currency units are OCR noise.
pub const AMOUNT_TOLERANCE: Decimal = Decimal::ONE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchVerdict {
    pub has_mismatch: bool,
    pub detected_amount: Option<Decimal>,
    pub entered_amount: Option<Decimal>,
    pub resolved: bool,
}

impl MismatchVerdict {
    /// True when the mismatch still stops submission.
    pub fn is_blocking(&self) -> bool {
        self.has_mismatch && !self.resolved
    }

    /// "Proceed anyway": amounts stay as they are.
    pub fn acknowledge(&mut self) {
        if self.has_mismatch {
            self.resolved = true;
        }
    }

    /// Same comparison inputs as `other`.
    pub fn same_amounts(&self, other: &MismatchVerdict) -> bool {
        self.detected_amount == other.detected_amount && self.entered_amount == other.entered_amount
    }
}

/// Compare the detected and entered amounts.
///
/// Absent or unparseable input on either side yields no mismatch.
pub fn reconcile(detected_raw: Option<&str>, entered_raw: Option<&str>) -> MismatchVerdict {
    let detected = detected_raw.and_then(parse_amount);
    let entered = entered_raw.and_then(parse_amount);

    let has_mismatch = match (detected, entered) {
        (Some(d), Some(e)) => (d - e).abs() > AMOUNT_TOLERANCE,
        _ => false,
    };

    MismatchVerdict {
        has_mismatch,
        detected_amount: detected,
        entered_amount: entered,
        resolved: false,
    }
}

/// Parse a money string the way donors and receipts write it.
///
/// Accepts a leading currency symbol or ISO code, thousands separators and
/// surrounding whitespace: `"PHP 1,000.00"`, `"₱500"`, `"$12.34"`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let stripped = trimmed
        .trim_start_matches(|c: char| c.is_alphabetic() || "₱$€£¥".contains(c))
        .trim_start_matches('.')
        .trim();
    let cleaned: String = stripped.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn equal_amounts_with_different_formatting_do_not_mismatch() {
        let verdict = reconcile(Some("500.00"), Some("500"));
        assert!(!verdict.has_mismatch);
        assert_eq!(verdict.detected_amount, Some(dec!(500)));
        assert_eq!(verdict.entered_amount, Some(dec!(500)));
    }

    #[test]
    fn difference_of_exactly_one_unit_is_tolerated() {
        assert!(!reconcile(Some("501"), Some("500")).has_mismatch);
        assert!(!reconcile(Some("499.00"), Some("500")).has_mismatch);
    }

    #[test]
    fn difference_above_tolerance_flags() {
        assert!(reconcile(Some("501.01"), Some("500")).has_mismatch);
        assert!(reconcile(Some("1000.00"), Some("500")).has_mismatch);
    }

    #[test]
    fn missing_or_garbage_input_is_not_comparable() {
        assert!(!reconcile(None, Some("500")).has_mismatch);
        assert!(!reconcile(Some("1000"), None).has_mismatch);
        assert!(!reconcile(Some("l,OOO"), Some("500")).has_mismatch);
        assert!(!reconcile(Some("   "), Some("500")).has_mismatch);
    }

    #[test]
    fn fresh_verdict_is_never_resolved() {
        let verdict = reconcile(Some("1000"), Some("500"));
        assert!(verdict.is_blocking());
        assert!(!verdict.resolved);
    }

    #[test]
    fn acknowledge_only_applies_to_real_mismatch() {
        let mut clean = reconcile(Some("500"), Some("500"));
        clean.acknowledge();
        assert!(!clean.resolved);

        let mut flagged = reconcile(Some("1000"), Some("500"));
        flagged.acknowledge();
        assert!(flagged.resolved);
        assert!(!flagged.is_blocking());
    }

    #[test]
    fn parses_receipt_formats() {
        assert_eq!(parse_amount("PHP 1,000.00"), Some(dec!(1000.00)));
        assert_eq!(parse_amount("₱500"), Some(dec!(500)));
        assert_eq!(parse_amount("$12.34"), Some(dec!(12.34)));
        assert_eq!(parse_amount("Php. 250.50"), Some(dec!(250.50)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }
}
