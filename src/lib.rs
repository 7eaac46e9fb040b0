//! Donation intake with proof-of-payment reconciliation.
//!
//! The client half ([`draft`], [`trust`], [`amount`], [`client`]) drives a
//! donation from campaign choice to submission, reconciling what the donor
//! typed against what was read off their receipt. The server half
//! ([`routes`], [`db`], [`storage`]) records the donation and rejects
//! reused reference numbers.

pub mod amount;
pub mod channels;
pub mod client;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod extraction;
pub mod ocr;
pub mod refund;
pub mod routes;
pub mod storage;
pub mod trust;
pub mod wire;

use opendal::Operator;

use db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub storage: Operator,
    pub max_upload_bytes: usize,
}
