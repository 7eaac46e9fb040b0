//! Refund eligibility for the donor-history views.
//!
//! A completed donation can be refunded for `REFUND_WINDOW_DAYS` days
//! counted from its donation date. Day 0 is the donation date itself.

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::models::DonationStatus;

pub const REFUND_WINDOW_DAYS: i64 = 7;

/// What the refund rule needs to know about a donation.
pub trait RefundSubject {
    fn status(&self) -> DonationStatus;
    fn donation_date(&self) -> NaiveDate;
}

/// Whole days left to request a refund; 0 once the window has closed or
/// the donation is not completed.
pub fn days_remaining<D: RefundSubject + ?Sized>(donation: &D, now: DateTime<Utc>) -> i64 {
    if donation.status() != DonationStatus::Completed {
        return 0;
    }
    let elapsed = (now.date_naive() - donation.donation_date()).num_days();
    // Future-dated donations get the full window, not more.
    (REFUND_WINDOW_DAYS - elapsed.max(0)).clamp(0, REFUND_WINDOW_DAYS)
}

pub fn is_refund_eligible<D: RefundSubject + ?Sized>(donation: &D, now: DateTime<Utc>) -> bool {
    days_remaining(donation, now) > 0
}
