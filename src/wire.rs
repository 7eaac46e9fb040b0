//! JSON bodies exchanged with the donation-intake endpoint.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::models::{Donation, DonationStatus};
use crate::error::ConflictDetail;

pub const ERROR_VALIDATION: &str = "validation";
pub const ERROR_DUPLICATE_REFERENCE: &str = "duplicate_reference";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedBody {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationBody {
    pub error: String,
    pub field: String,
    pub message: String,
}

impl ValidationBody {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            error: ERROR_VALIDATION.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictBody {
    pub error: String,
    pub conflict: ConflictDetail,
}

impl ConflictBody {
    pub fn new(conflict: ConflictDetail) -> Self {
        Self {
            error: ERROR_DUPLICATE_REFERENCE.to_string(),
            conflict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundBody {
    pub eligible: bool,
    pub days_remaining: i64,
}

/// Donation as shown in the donor-history view.
///
/// The proof object key never leaves the server; donor identity is dropped
/// for anonymous donations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationView {
    pub id: String,
    pub charity_id: String,
    pub campaign_id: Option<String>,
    pub amount: Decimal,
    pub receipt_amount: Option<Decimal>,
    pub donation_type: String,
    pub frequency: Option<String>,
    pub channel_used: String,
    pub reference_number: String,
    pub donation_date: NaiveDate,
    pub message: Option<String>,
    pub is_anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Donation> for DonationView {
    fn from(d: Donation) -> Self {
        let (donor_name, donor_email) = if d.is_anonymous {
            (None, None)
        } else {
            (d.donor_name, d.donor_email)
        };
        Self {
            id: d.id,
            charity_id: d.charity_id,
            campaign_id: d.campaign_id,
            amount: d.amount,
            receipt_amount: d.receipt_amount,
            donation_type: d.donation_type,
            frequency: d.frequency,
            channel_used: d.channel_used,
            reference_number: d.reference_number,
            donation_date: d.donation_date,
            message: d.message,
            is_anonymous: d.is_anonymous,
            donor_name,
            donor_email,
            status: d.status,
            created_at: d.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn donation(anonymous: bool) -> Donation {
        let now = Utc::now();
        Donation {
            id: "don-1".into(),
            charity_id: "red-cross".into(),
            campaign_id: None,
            amount: dec!(500),
            receipt_amount: None,
            donation_type: "one_time".into(),
            frequency: None,
            channel_used: "GCash".into(),
            reference_number: "REF-1".into(),
            donation_date: now.date_naive(),
            message: None,
            is_anonymous: anonymous,
            donor_name: Some("Ana".into()),
            donor_email: Some("ana@example.com".into()),
            proof_key: "proofs/2024/abc.png".into(),
            status: DonationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn view_never_exposes_the_proof_key() {
        let value = serde_json::to_value(DonationView::from(donation(false))).unwrap();
        assert!(value.get("proof_key").is_none());
        assert_eq!(value["donor_name"], "Ana");
        assert_eq!(value["donor_email"], "ana@example.com");
    }

    #[test]
    fn anonymous_view_drops_donor_identity() {
        let value = serde_json::to_value(DonationView::from(donation(true))).unwrap();
        assert!(value.get("donor_name").is_none());
        assert!(value.get("donor_email").is_none());
        assert_eq!(value["is_anonymous"], true);
    }
}
