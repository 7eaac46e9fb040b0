use std::collections::HashMap;

use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson, Response},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::amount::parse_amount;
use crate::channels::ChannelRegistry;
use crate::db::models::{DonationStatus, NewDonation};
use crate::draft::{CampaignTarget, DonationType, Field, Frequency, PROOF_CONTENT_TYPES};
use crate::error::{ConflictDetail, DbError};
use crate::extraction::parse_receipt_date;
use crate::refund;
use crate::wire::{ConflictBody, CreatedBody, DonationView, RefundBody, ValidationBody};
use crate::AppState;

struct UploadedProof {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct IntakeForm {
    fields: HashMap<String, String>,
    proof: Option<UploadedProof>,
}

impl IntakeForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

fn invalid(field: Field, message: impl Into<String>) -> Response {
    let message = message.into();
    tracing::info!("Donation rejected: {} {}", field, message);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        AxumJson(ValidationBody::new(field.as_str(), message)),
    )
        .into_response()
}

fn db_failure(e: DbError) -> Response {
    tracing::error!("DB Error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
}

async fn read_form(mut multipart: Multipart) -> Result<IntakeForm, Response> {
    let mut form = IntakeForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Multipart parse error: {}", e);
                return Err(e.into_response());
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == Field::ProofImage.as_str() {
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
            form.proof = Some(UploadedProof {
                bytes: bytes.to_vec(),
                content_type,
            });
        } else {
            let value = field.text().await.map_err(IntoResponse::into_response)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

/// Validated intake, ready to store.
struct Intake {
    donation: NewDonation,
    proof: UploadedProof,
}

async fn validate(state: &AppState, form: IntakeForm) -> Result<Intake, Response> {
    let charity_id = form
        .text(Field::Charity.as_str())
        .ok_or_else(|| invalid(Field::Charity, "charity is required"))?
        .to_string();
    match crate::db::get_charity(&state.db, &charity_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(invalid(Field::Charity, "unknown charity")),
        Err(e) => return Err(db_failure(e)),
    }

    let campaign = form
        .text(Field::Campaign.as_str())
        .and_then(CampaignTarget::from_wire)
        .ok_or_else(|| invalid(Field::Campaign, "campaign is required"))?;
    let campaign_id = match campaign {
        CampaignTarget::Direct => None,
        CampaignTarget::Campaign(id) => match crate::db::get_campaign(&state.db, &id).await {
            Ok(Some(c)) if c.charity_id == charity_id && c.is_active => Some(id),
            Ok(Some(_)) => return Err(invalid(Field::Campaign, "campaign is not open for this charity")),
            Ok(None) => return Err(invalid(Field::Campaign, "unknown campaign")),
            Err(e) => return Err(db_failure(e)),
        },
    };

    let amount = form
        .text(Field::Amount.as_str())
        .and_then(parse_amount)
        .ok_or_else(|| invalid(Field::Amount, "amount is not a number"))?;
    if amount <= Decimal::ZERO {
        return Err(invalid(Field::Amount, "amount must be greater than zero"));
    }
    let receipt_amount = match form.text(Field::ReceiptAmount.as_str()) {
        Some(raw) => Some(parse_amount(raw).ok_or_else(|| invalid(Field::ReceiptAmount, "receipt amount is not a number"))?),
        None => None,
    };

    let donation_type: DonationType = form
        .text(Field::DonationType.as_str())
        .unwrap_or("one_time")
        .parse()
        .map_err(|e: String| invalid(Field::DonationType, e))?;
    let frequency = match donation_type {
        DonationType::OneTime => None,
        DonationType::Recurring => {
            let raw = form
                .text(Field::Frequency.as_str())
                .ok_or_else(|| invalid(Field::Frequency, "recurring donations need a frequency"))?;
            let frequency: Frequency = raw.parse().map_err(|e: String| invalid(Field::Frequency, e))?;
            Some(frequency.as_str().to_string())
        }
    };

    let channels = crate::db::list_channels(&state.db).await.map_err(db_failure)?;
    let registry = ChannelRegistry::new(channels);
    let channel_label = form.text(Field::Channel.as_str()).unwrap_or_default();
    let channel_used = registry
        .find_active(channel_label)
        .map(|c| c.label.clone())
        .ok_or_else(|| invalid(Field::Channel, format!("'{}' is not an active payment channel", channel_label)))?;

    let reference_number = form
        .text(Field::ReferenceNumber.as_str())
        .ok_or_else(|| invalid(Field::ReferenceNumber, "reference number is required"))?
        .to_string();

    let donation_date: NaiveDate = match form.text(Field::DonationDate.as_str()) {
        Some(raw) => parse_receipt_date(raw).ok_or_else(|| invalid(Field::DonationDate, "donation date is not a valid date"))?,
        None => Utc::now().date_naive(),
    };

    let donor_email = form.text(Field::DonorEmail.as_str()).map(str::to_string);
    if donor_email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Err(invalid(Field::DonorEmail, "email address is not valid"));
    }

    let is_anonymous = matches!(
        form.text("is_anonymous").map(str::to_lowercase).as_deref(),
        Some("true" | "1" | "on" | "yes")
    );
    let message = form.text("message").map(str::to_string);
    let donor_name = form.text("donor_name").map(str::to_string);

    let proof = match form.proof {
        Some(p) if !p.bytes.is_empty() => p,
        _ => return Err(invalid(Field::ProofImage, "attach a proof of payment")),
    };
    if !PROOF_CONTENT_TYPES.contains(&proof.content_type.as_str()) {
        return Err(invalid(Field::ProofImage, format!("unsupported file type '{}'", proof.content_type)));
    }

    Ok(Intake {
        donation: NewDonation {
            id: Uuid::new_v4().to_string(),
            charity_id,
            campaign_id,
            amount,
            receipt_amount,
            donation_type: donation_type.as_str().to_string(),
            frequency,
            channel_used,
            reference_number,
            donation_date,
            message,
            is_anonymous,
            donor_name,
            donor_email,
            proof_key: String::new(),
        },
        proof,
    })
}

/// 409 body describing the donation that already holds `reference`.
///
/// Only amount, recipient, date and status leave the server.
async fn conflict_response(state: &AppState, reference: &str) -> Response {
    let existing = match crate::db::find_donation_by_reference(&state.db, reference).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            tracing::error!("Duplicate reference reported but no donation holds {}", reference);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
        Err(e) => return db_failure(e),
    };
    let recipient = match crate::db::recipient_name(&state.db, &existing).await {
        Ok(name) => name,
        Err(e) => return db_failure(e),
    };

    tracing::warn!(reference = %reference, previous = %existing.id, "Duplicate reference number");
    let conflict = ConflictDetail {
        reference_number: existing.reference_number,
        previous_amount: existing.amount,
        previous_recipient: recipient,
        previous_date: existing.donation_date,
        previous_status: existing.status.to_string(),
    };
    (StatusCode::CONFLICT, AxumJson(ConflictBody::new(conflict))).into_response()
}

pub async fn create_donation(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    let Intake { mut donation, proof } = match validate(&state, form).await {
        Ok(intake) => intake,
        Err(resp) => return resp,
    };

    match crate::db::find_donation_by_reference(&state.db, &donation.reference_number).await {
        Ok(Some(_)) => return conflict_response(&state, &donation.reference_number).await,
        Ok(None) => {}
        Err(e) => return db_failure(e),
    }

    let now = Utc::now();
    donation.proof_key = match crate::storage::store_proof(&state.storage, proof.bytes, &proof.content_type, now).await {
        Ok(key) => key,
        Err(e) => {
            tracing::error!("Storage Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Storage Error").into_response();
        }
    };

    match crate::db::add_donation(&state.db, &donation, now).await {
        Ok(()) => {}
        // Lost a race with a concurrent submission of the same reference.
        Err(DbError::DuplicateReference) => return conflict_response(&state, &donation.reference_number).await,
        Err(e) => return db_failure(e),
    }

    tracing::info!(
        donation_id = %donation.id,
        charity_id = %donation.charity_id,
        channel = %donation.channel_used,
        "Donation recorded"
    );
    (StatusCode::CREATED, AxumJson(CreatedBody { id: donation.id })).into_response()
}

pub async fn get_donation(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let donation = match crate::db::get_donation(&state.db, &id).await {
        Ok(Some(d)) => d,
        Ok(None) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => return db_failure(e),
    };
    let recipient = match crate::db::recipient_name(&state.db, &donation).await {
        Ok(name) => name,
        Err(e) => return db_failure(e),
    };

    let now = Utc::now();
    let refund = RefundBody {
        eligible: refund::is_refund_eligible(&donation, now),
        days_remaining: refund::days_remaining(&donation, now),
    };
    AxumJson(serde_json::json!({
        "donation": DonationView::from(donation),
        "recipient": recipient,
        "refund": refund,
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    let status: DonationStatus = match req.status.parse() {
        Ok(s) => s,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    match crate::db::update_donation_status(&state.db, &id, status, Utc::now()).await {
        Ok(true) => (StatusCode::OK, AxumJson(serde_json::json!({"status": status, "id": id}))).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => db_failure(e),
    }
}
