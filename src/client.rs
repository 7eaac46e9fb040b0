//! HTTP client for the donation-intake service.
//!
//! Submissions are never retried here: the intake call is not idempotent
//! until the server has checked the reference, so a retry is always the
//! donor's explicit decision.

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};

use crate::channels::{Channel, ChannelRegistry};
use crate::config::ClientConfig;
use crate::draft::{DonationDraft, DonationId, DonationType, ExtractionOutcome, Field, ProofImage, WizardStep};
use crate::error::{DraftError, ExtractionError, SubmissionError, ValidationError};
use crate::extraction::{self, ExtractionResult};
use crate::wire::{ConflictBody, CreatedBody, ValidationBody};

#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SubmissionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("donation-intake/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_channels(&self) -> Result<ChannelRegistry, SubmissionError> {
        let resp = self
            .http
            .get(self.url("/api/channels"))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(unexpected(resp).await);
        }
        let channels: Vec<Channel> = resp.json().await.map_err(transport)?;
        Ok(ChannelRegistry::new(channels))
    }

    /// Ask the OCR collaborator to read `proof`.
    pub async fn extract(&self, proof: &ProofImage) -> Result<ExtractionResult, ExtractionError> {
        let part = proof_part(proof).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;
        let form = Form::new().part("image", part);

        let resp = self
            .http
            .post(self.url("/api/receipts/ocr"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;
        match status {
            s if s.is_success() => extraction::normalize(&body),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => Err(ExtractionError::Unreadable(body)),
            _ => Err(ExtractionError::Unavailable(format!("{}: {}", status, body))),
        }
    }

    /// Send a finalized draft. Exactly one request; no automatic retry.
    pub async fn submit(&self, draft: &DonationDraft) -> Result<DonationId, SubmissionError> {
        let form = build_form(draft)?;
        let resp = self
            .http
            .post(self.url("/api/donations"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        classify(resp).await
    }

    /// Attach `proof`, read it, and apply the reading to the draft.
    pub async fn attach_and_extract(
        &self,
        draft: &mut DonationDraft,
        proof: ProofImage,
        channels: &ChannelRegistry,
    ) -> Result<ExtractionOutcome, DraftError> {
        let ticket = draft.attach_proof(proof)?;
        let outcome = match draft.proof_image() {
            Some(image) => self.extract(image).await,
            None => Err(ExtractionError::Unreadable("proof image missing".to_string())),
        };
        Ok(draft.apply_extraction(ticket, outcome, channels))
    }

    /// Gate, send, and record the result on the draft.
    pub async fn submit_draft(&self, draft: &mut DonationDraft) -> Result<WizardStep, DraftError> {
        draft.begin_submit()?;
        let result = self.submit(draft).await;
        draft.finish_submission(result)
    }
}

fn proof_part(proof: &ProofImage) -> Result<Part, reqwest::Error> {
    Part::bytes(proof.bytes.clone())
        .file_name(proof.file_name.clone())
        .mime_str(&proof.content_type)
}

fn build_form(draft: &DonationDraft) -> Result<Form, SubmissionError> {
    let mut form = Form::new()
        .text("charity_id", draft.charity_id().unwrap_or_default().to_string())
        .text(
            "campaign_id",
            draft.campaign().map(|c| c.wire_id().to_string()).unwrap_or_default(),
        )
        .text("amount", draft.amount().unwrap_or_default().to_string())
        .text(Field::DonationType.as_str(), draft.donation_type().as_str())
        .text("channel_used", draft.channel_used().unwrap_or_default().to_string())
        .text("reference_number", draft.reference_number().unwrap_or_default().to_string())
        .text("is_anonymous", draft.is_anonymous().to_string());

    if let (DonationType::Recurring, Some(frequency)) = (draft.donation_type(), draft.frequency()) {
        form = form.text("frequency", frequency.as_str());
    }
    let optional = [
        ("receipt_amount", draft.receipt_amount()),
        ("donation_date", draft.donation_date()),
        ("message", draft.message()),
        ("donor_name", draft.donor().name.as_deref()),
        ("donor_email", draft.donor().email.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            form = form.text(name, value.to_string());
        }
    }

    if let Some(proof) = draft.proof_image() {
        let part = proof_part(proof)
            .map_err(|e| SubmissionError::Validation(ValidationError::new(Field::ProofImage, e.to_string())))?;
        form = form.part("proof", part);
    }
    Ok(form)
}

async fn classify(resp: Response) -> Result<DonationId, SubmissionError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport)?;

    if status.is_success() {
        let created: Option<CreatedBody> = serde_json::from_str(&body).ok();
        return match created {
            Some(created) => Ok(DonationId(created.id)),
            None => Err(SubmissionError::Unexpected { status: status.as_u16(), body }),
        };
    }

    let classified = match status {
        StatusCode::CONFLICT => serde_json::from_str::<ConflictBody>(&body)
            .ok()
            .map(|parsed| SubmissionError::Conflict(parsed.conflict)),
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => serde_json::from_str::<ValidationBody>(&body)
            .ok()
            .and_then(|parsed| {
                Field::from_wire(&parsed.field)
                    .map(|field| SubmissionError::Validation(ValidationError::new(field, parsed.message)))
            }),
        _ => None,
    };
    Err(classified.unwrap_or(SubmissionError::Unexpected { status: status.as_u16(), body }))
}

async fn unexpected(resp: Response) -> SubmissionError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    SubmissionError::Unexpected { status, body }
}

fn transport(err: reqwest::Error) -> SubmissionError {
    if err.is_timeout() {
        SubmissionError::Transport(format!("request timed out: {}", err))
    } else {
        SubmissionError::Transport(err.to_string())
    }
}
