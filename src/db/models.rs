use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::refund::RefundSubject;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
    Rejected,
    Refunded,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Rejected => "rejected",
            DonationStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "completed" => Ok(DonationStatus::Completed),
            "rejected" => Ok(DonationStatus::Rejected),
            "refunded" => Ok(DonationStatus::Refunded),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    pub id: String,
    pub charity_id: String,
    /// `None` for a general-fund donation.
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
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub proof_key: String,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundSubject for Donation {
    fn status(&self) -> DonationStatus {
        self.status
    }

    fn donation_date(&self) -> NaiveDate {
        self.donation_date
    }
}

/// Insert payload for the intake endpoint.
#[derive(Debug, Clone)]
pub struct NewDonation {
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
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
    pub proof_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Charity {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub charity_id: String,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
