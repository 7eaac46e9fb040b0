//! The donation wizard: one mutable draft, four steps, one submit gate.
//!
//! All reconciliation output converges here. Each extraction runs
//! resolve → apply locks → reconcile amounts → recompute gate, in that order,
//! and every amount edit or resolution action recomputes the gate again.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::{self, MismatchVerdict};
use crate::channels::ChannelRegistry;
use crate::error::{ConflictDetail, DraftError, ExtractionError, SubmissionError, ValidationError};
use crate::extraction::{self, ExtractionResult};
use crate::trust::{self, FieldLock};

/// Campaign id used on the wire for a general-fund donation.
pub const DIRECT_DONATION: &str = "direct";

/// Proof formats the intake endpoint stores.
pub const PROOF_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Charity,
    Campaign,
    Amount,
    DonationType,
    Frequency,
    Channel,
    ReferenceNumber,
    ReceiptAmount,
    DonationDate,
    ProofImage,
    DonorEmail,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Charity => "charity_id",
            Field::Campaign => "campaign_id",
            Field::Amount => "amount",
            Field::DonationType => "donation_type",
            Field::Frequency => "frequency",
            Field::Channel => "channel_used",
            Field::ReferenceNumber => "reference_number",
            Field::ReceiptAmount => "receipt_amount",
            Field::DonationDate => "donation_date",
            Field::ProofImage => "proof",
            Field::DonorEmail => "donor_email",
        }
    }

    /// Inverse of [`Field::as_str`], used when the server names a field.
    pub fn from_wire(name: &str) -> Option<Field> {
        [
            Field::Charity,
            Field::Campaign,
            Field::Amount,
            Field::DonationType,
            Field::Frequency,
            Field::Channel,
            Field::ReferenceNumber,
            Field::ReceiptAmount,
            Field::DonationDate,
            Field::ProofImage,
            Field::DonorEmail,
        ]
        .into_iter()
        .find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignTarget {
    Campaign(String),
    /// General fund of the charity.
    Direct,
}

impl CampaignTarget {
    pub fn wire_id(&self) -> &str {
        match self {
            CampaignTarget::Campaign(id) => id,
            CampaignTarget::Direct => DIRECT_DONATION,
        }
    }

    pub fn from_wire(id: &str) -> Option<CampaignTarget> {
        match id.trim() {
            "" => None,
            DIRECT_DONATION => Some(CampaignTarget::Direct),
            other => Some(CampaignTarget::Campaign(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    #[default]
    OneTime,
    Recurring,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::OneTime => "one_time",
            DonationType::Recurring => "recurring",
        }
    }
}

impl FromStr for DonationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "one_time" | "onetime" => Ok(DonationType::OneTime),
            "recurring" => Ok(DonationType::Recurring),
            other => Err(format!("unknown donation type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annually => "annually",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "annually" | "yearly" => Ok(Frequency::Annually),
            other => Err(format!("unknown frequency '{}'", other)),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProofImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl fmt::Debug for ProofImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationId(pub String);

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    #[default]
    SelectingCampaign,
    ChoosingAmount,
    AttachingProof,
    Submitting,
    Succeeded,
    Failed,
}

/// Sequence token for one extraction request. Only the latest one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExtractionTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Extraction applied; lists the fields it locked.
    Applied { locked: Vec<Field> },
    /// Extraction failed; every field stays editable.
    Degraded(ExtractionError),
    /// A newer request was issued, or none is pending. Nothing changed.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct DonationDraft {
    charity_id: Option<String>,
    campaign: Option<CampaignTarget>,
    amount: Option<String>,
    donation_type: DonationType,
    frequency: Option<Frequency>,
    channel_used: Option<String>,
    reference_number: Option<String>,
    receipt_amount: Option<String>,
    donation_date: Option<String>,
    proof_image: Option<ProofImage>,
    message: Option<String>,
    is_anonymous: bool,
    donor: DonorIdentity,

    step: WizardStep,
    locks: BTreeMap<Field, FieldLock>,
    extraction: Option<ExtractionResult>,
    verdict: MismatchVerdict,
    gate: bool,
    conflict: Option<ConflictDetail>,
    last_error: Option<SubmissionError>,
    donation_id: Option<DonationId>,
    issued_ticket: u64,
    pending_ticket: Option<u64>,
}

impl DonationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn charity_id(&self) -> Option<&str> {
        self.charity_id.as_deref()
    }

    pub fn campaign(&self) -> Option<&CampaignTarget> {
        self.campaign.as_ref()
    }

    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn parsed_amount(&self) -> Option<Decimal> {
        self.amount.as_deref().and_then(amount::parse_amount)
    }

    pub fn donation_type(&self) -> DonationType {
        self.donation_type
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn channel_used(&self) -> Option<&str> {
        self.channel_used.as_deref()
    }

    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    pub fn receipt_amount(&self) -> Option<&str> {
        self.receipt_amount.as_deref()
    }

    pub fn donation_date(&self) -> Option<&str> {
        self.donation_date.as_deref()
    }

    pub fn parsed_donation_date(&self) -> Option<NaiveDate> {
        self.donation_date.as_deref().and_then(extraction::parse_receipt_date)
    }

    pub fn proof_image(&self) -> Option<&ProofImage> {
        self.proof_image.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    pub fn donor(&self) -> &DonorIdentity {
        &self.donor
    }

    pub fn locks(&self) -> &BTreeMap<Field, FieldLock> {
        &self.locks
    }

    pub fn is_locked(&self, field: Field) -> bool {
        self.locks.get(&field).is_some_and(|l| l.locked)
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn verdict(&self) -> &MismatchVerdict {
        &self.verdict
    }

    /// Submit gate: proof attached and no unresolved amount mismatch.
    pub fn gate(&self) -> bool {
        self.gate
    }

    /// Previous donation that already used the current reference number.
    pub fn conflict(&self) -> Option<&ConflictDetail> {
        self.conflict.as_ref()
    }

    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    pub fn donation_id(&self) -> Option<&DonationId> {
        self.donation_id.as_ref()
    }

    pub fn extraction_pending(&self) -> bool {
        self.pending_ticket.is_some()
    }

    /// Current text of a reconciled field as the donor sees it.
    pub fn field_text(&self, field: Field) -> Option<String> {
        match field {
            Field::ReferenceNumber => self.reference_number.clone(),
            Field::ReceiptAmount => self.receipt_amount.clone(),
            Field::DonationDate => self.donation_date.clone(),
            Field::Amount => self.amount.clone(),
            _ => None,
        }
    }

    // --- SelectingCampaign ---

    pub fn select_charity(&mut self, charity_id: &str) -> Result<(), DraftError> {
        self.ensure_editable("select a charity")?;
        let next = non_empty(charity_id);
        if next != self.charity_id {
            // A campaign belongs to one charity.
            self.campaign = None;
        }
        self.charity_id = next;
        Ok(())
    }

    pub fn select_campaign(&mut self, target: CampaignTarget) -> Result<(), DraftError> {
        self.ensure_editable("select a campaign")?;
        self.campaign = Some(target);
        Ok(())
    }

    // --- ChoosingAmount ---

    pub fn set_amount(&mut self, raw: &str) -> Result<(), DraftError> {
        self.ensure_editable("change the amount")?;
        self.amount = non_empty(raw);
        self.reconcile_amounts();
        Ok(())
    }

    pub fn set_donation_type(
        &mut self,
        donation_type: DonationType,
        frequency: Option<Frequency>,
    ) -> Result<(), DraftError> {
        self.ensure_editable("change the donation type")?;
        self.donation_type = donation_type;
        self.frequency = match donation_type {
            DonationType::OneTime => None,
            DonationType::Recurring => frequency,
        };
        Ok(())
    }

    // --- AttachingProof ---

    pub fn select_channel(&mut self, channels: &ChannelRegistry, label: &str) -> Result<(), DraftError> {
        self.ensure_editable("select a channel")?;
        let channel = channels
            .find_active(label)
            .ok_or_else(|| ValidationError::new(Field::Channel, format!("'{}' is not an active payment channel", label.trim())))?;
        self.channel_used = Some(channel.label.clone());
        Ok(())
    }

    pub fn set_reference_number(&mut self, raw: &str) -> Result<(), DraftError> {
        self.ensure_editable("change the reference number")?;
        self.ensure_unlocked(Field::ReferenceNumber)?;
        self.reference_number = non_empty(raw);
        let still_conflicting = match (&self.conflict, &self.reference_number) {
            (Some(conflict), Some(reference)) => same_reference(&conflict.reference_number, reference),
            _ => false,
        };
        if !still_conflicting {
            self.conflict = None;
        }
        Ok(())
    }

    pub fn set_receipt_amount(&mut self, raw: &str) -> Result<(), DraftError> {
        self.ensure_editable("change the receipt amount")?;
        self.ensure_unlocked(Field::ReceiptAmount)?;
        self.receipt_amount = non_empty(raw);
        Ok(())
    }

    pub fn set_donation_date(&mut self, raw: &str) -> Result<(), DraftError> {
        self.ensure_editable("change the donation date")?;
        self.ensure_unlocked(Field::DonationDate)?;
        self.donation_date = non_empty(raw);
        Ok(())
    }

    pub fn set_message(&mut self, message: &str) -> Result<(), DraftError> {
        self.ensure_editable("change the message")?;
        self.message = non_empty(message);
        Ok(())
    }

    pub fn set_anonymous(&mut self, anonymous: bool) -> Result<(), DraftError> {
        self.ensure_editable("change anonymity")?;
        self.is_anonymous = anonymous;
        Ok(())
    }

    pub fn set_donor(&mut self, donor: DonorIdentity) -> Result<(), DraftError> {
        self.ensure_editable("change donor details")?;
        self.donor = DonorIdentity {
            name: donor.name.as_deref().and_then(non_empty),
            email: donor.email.as_deref().and_then(non_empty),
        };
        Ok(())
    }

    /// Attach a new receipt image and issue the token its extraction must carry.
    ///
    /// Locks and the verdict from any earlier image are dropped; field values stay.
    pub fn attach_proof(&mut self, proof: ProofImage) -> Result<ExtractionTicket, DraftError> {
        self.ensure_step(WizardStep::AttachingProof, "attach proof")?;
        if proof.bytes.is_empty() {
            return Err(ValidationError::new(Field::ProofImage, "proof image is empty").into());
        }
        if !PROOF_CONTENT_TYPES.contains(&proof.content_type.as_str()) {
            return Err(ValidationError::new(
                Field::ProofImage,
                format!("unsupported file type '{}'", proof.content_type),
            )
            .into());
        }

        self.proof_image = Some(proof);
        self.locks.clear();
        self.extraction = None;
        self.issued_ticket += 1;
        self.pending_ticket = Some(self.issued_ticket);
        self.reconcile_amounts();

        tracing::debug!(ticket = self.issued_ticket, "proof attached, extraction requested");
        Ok(ExtractionTicket(self.issued_ticket))
    }

    pub fn remove_proof(&mut self) -> Result<(), DraftError> {
        self.ensure_step(WizardStep::AttachingProof, "remove proof")?;
        self.proof_image = None;
        self.locks.clear();
        self.extraction = None;
        self.pending_ticket = None;
        self.reconcile_amounts();
        Ok(())
    }

    /// Apply the collaborator's answer for `ticket`.
    ///
    /// Answers for anything but the latest issued ticket are discarded.
    pub fn apply_extraction(
        &mut self,
        ticket: ExtractionTicket,
        outcome: Result<ExtractionResult, ExtractionError>,
        channels: &ChannelRegistry,
    ) -> ExtractionOutcome {
        if self.pending_ticket != Some(ticket.0) || self.step != WizardStep::AttachingProof {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.issued_ticket,
                "discarding stale extraction"
            );
            return ExtractionOutcome::Stale;
        }
        self.pending_ticket = None;

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("extraction failed, fields stay editable: {}", err);
                self.locks.clear();
                self.extraction = None;
                self.reconcile_amounts();
                return ExtractionOutcome::Degraded(err);
            }
        };

        let mut locks = trust::resolve(&result, self);
        // A reference the server already rejected stays with the donor.
        let rejected = match (&self.conflict, result.reference_number.as_deref()) {
            (Some(conflict), Some(read)) => same_reference(&conflict.reference_number, read),
            _ => false,
        };
        if rejected {
            tracing::info!("extracted reference was already rejected, leaving it editable");
            locks.insert(
                Field::ReferenceNumber,
                FieldLock::unlocked(self.field_text(Field::ReferenceNumber)),
            );
        }
        for (field, lock) in &locks {
            if lock.locked {
                let value = lock.value.clone();
                match field {
                    Field::ReferenceNumber => {
                        self.reference_number = value;
                        self.conflict = None;
                    }
                    Field::ReceiptAmount => self.receipt_amount = value,
                    Field::DonationDate => self.donation_date = value,
                    _ => {}
                }
            }
        }
        let locked: Vec<Field> = locks.iter().filter(|(_, l)| l.locked).map(|(f, _)| *f).collect();

        if self.channel_used.is_none() && result.is_template_known() {
            if let Some(channel) = channels.find_active(&result.template) {
                self.channel_used = Some(channel.label.clone());
            }
        }

        tracing::info!(
            confidence = result.confidence,
            template = %result.template,
            locked = ?locked,
            "extraction applied"
        );

        self.locks = locks;
        self.extraction = Some(result);
        self.reconcile_amounts();

        ExtractionOutcome::Applied { locked }
    }

    /// "Use detected amount": entered amount takes the receipt's value.
    pub fn adopt_detected_amount(&mut self) -> Result<(), DraftError> {
        self.ensure_editable("adopt the detected amount")?;
        let detected = self
            .verdict
            .detected_amount
            .ok_or_else(|| ValidationError::new(Field::Amount, "no detected amount to adopt"))?;
        self.amount = Some(detected.to_string());
        self.reconcile_amounts();
        Ok(())
    }

    /// "Proceed anyway": keep both amounts, unblock the gate.
    pub fn proceed_with_mismatch(&mut self) -> Result<(), DraftError> {
        self.ensure_editable("acknowledge the mismatch")?;
        if !self.verdict.has_mismatch {
            return Err(ValidationError::new(Field::Amount, "there is no amount mismatch to acknowledge").into());
        }
        self.verdict.acknowledge();
        tracing::info!(
            detected = ?self.verdict.detected_amount,
            entered = ?self.verdict.entered_amount,
            "donor acknowledged amount mismatch"
        );
        self.recompute_gate();
        Ok(())
    }

    // --- transitions ---

    /// "Continue": advance one step if the next step's entry guard holds.
    pub fn advance(&mut self) -> Result<WizardStep, DraftError> {
        match self.step {
            WizardStep::SelectingCampaign => {
                self.check_campaign_selected()?;
                self.step = WizardStep::ChoosingAmount;
            }
            WizardStep::ChoosingAmount => {
                self.check_amount()?;
                self.step = WizardStep::AttachingProof;
            }
            WizardStep::AttachingProof | WizardStep::Failed => self.begin_submit()?,
            WizardStep::Submitting | WizardStep::Succeeded => {
                return Err(self.invalid("continue"));
            }
        }
        Ok(self.step)
    }

    /// "Back": return to the previous step. Never allowed mid-submission.
    pub fn back(&mut self) -> Result<WizardStep, DraftError> {
        self.step = match self.step {
            WizardStep::ChoosingAmount => WizardStep::SelectingCampaign,
            WizardStep::AttachingProof => WizardStep::ChoosingAmount,
            WizardStep::Failed => WizardStep::AttachingProof,
            WizardStep::SelectingCampaign | WizardStep::Submitting | WizardStep::Succeeded => {
                return Err(self.invalid("go back"));
            }
        };
        Ok(self.step)
    }

    /// Enter `Submitting`. The caller then issues exactly one submission.
    pub fn begin_submit(&mut self) -> Result<(), DraftError> {
        if !matches!(self.step, WizardStep::AttachingProof | WizardStep::Failed) {
            return Err(self.invalid("submit"));
        }
        self.check_submittable()?;
        self.last_error = None;
        self.step = WizardStep::Submitting;
        Ok(())
    }

    /// Record the submission result and move to the matching step.
    pub fn finish_submission(
        &mut self,
        result: Result<DonationId, SubmissionError>,
    ) -> Result<WizardStep, DraftError> {
        if self.step != WizardStep::Submitting {
            return Err(self.invalid("finish a submission"));
        }

        match result {
            Ok(id) => {
                tracing::info!(donation_id = %id, "donation submitted");
                // The draft is discarded; only the identifier survives.
                *self = DonationDraft {
                    step: WizardStep::Succeeded,
                    donation_id: Some(id),
                    issued_ticket: self.issued_ticket,
                    ..DonationDraft::default()
                };
            }
            Err(SubmissionError::Conflict(conflict)) => {
                tracing::warn!(reference = %conflict.reference_number, "duplicate reference rejected");
                // An OCR lock says nothing about post-submission correctness.
                self.locks.remove(&Field::ReferenceNumber);
                self.conflict = Some(conflict.clone());
                self.last_error = Some(SubmissionError::Conflict(conflict));
                self.step = WizardStep::AttachingProof;
            }
            Err(err @ SubmissionError::Validation(_)) => {
                tracing::warn!("submission rejected: {}", err);
                self.last_error = Some(err);
                self.step = WizardStep::AttachingProof;
            }
            Err(err) => {
                tracing::error!("submission failed: {}", err);
                self.last_error = Some(err);
                self.step = WizardStep::Failed;
            }
        }
        Ok(self.step)
    }

    /// Every blocking problem, in the order the donor would fix them.
    pub fn check_submittable(&self) -> Result<(), DraftError> {
        self.check_campaign_selected()?;
        self.check_amount()?;

        if self.channel_used.is_none() {
            return Err(ValidationError::new(Field::Channel, "select the payment channel used").into());
        }
        if self.reference_number.as_deref().map_or(true, |r| r.trim().is_empty()) {
            return Err(ValidationError::new(Field::ReferenceNumber, "reference number is required").into());
        }
        if self.donation_date.is_some() && self.parsed_donation_date().is_none() {
            return Err(ValidationError::new(Field::DonationDate, "donation date is not a valid date").into());
        }
        if self.proof_image.is_none() {
            return Err(ValidationError::new(Field::ProofImage, "attach a proof of payment").into());
        }
        if self.pending_ticket.is_some() {
            return Err(ValidationError::new(Field::ProofImage, "receipt is still being read").into());
        }
        if let Some(conflict) = &self.conflict {
            return Err(DraftError::Conflict(conflict.clone()));
        }
        if self.verdict.is_blocking() {
            return Err(DraftError::Mismatch(self.verdict.clone()));
        }
        if !self.gate {
            return Err(ValidationError::new(Field::ProofImage, "proof of payment is not ready").into());
        }
        Ok(())
    }

    fn check_campaign_selected(&self) -> Result<(), DraftError> {
        if self.charity_id.is_none() {
            return Err(ValidationError::new(Field::Charity, "select a charity").into());
        }
        if self.campaign.is_none() {
            return Err(ValidationError::new(Field::Campaign, "select a campaign or donate directly").into());
        }
        Ok(())
    }

    fn check_amount(&self) -> Result<(), DraftError> {
        match self.parsed_amount() {
            Some(value) if value > Decimal::ZERO => {}
            Some(_) => return Err(ValidationError::new(Field::Amount, "amount must be greater than zero").into()),
            None => return Err(ValidationError::new(Field::Amount, "enter a valid amount").into()),
        }
        if self.donation_type == DonationType::Recurring && self.frequency.is_none() {
            return Err(ValidationError::new(Field::Frequency, "choose how often to donate").into());
        }
        Ok(())
    }

    fn reconcile_amounts(&mut self) {
        let detected = self.extraction.as_ref().and_then(|e| e.amount.as_deref());
        let mut verdict = amount::reconcile(detected, self.amount.as_deref());
        // An acknowledgement only covers the amounts it was given for.
        if self.verdict.resolved && verdict.has_mismatch && verdict.same_amounts(&self.verdict) {
            verdict.resolved = true;
        }
        self.verdict = verdict;
        self.recompute_gate();
    }

    fn recompute_gate(&mut self) {
        self.gate = self.proof_image.is_some() && !self.verdict.is_blocking();
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), DraftError> {
        match self.step {
            WizardStep::Submitting | WizardStep::Succeeded => Err(self.invalid(action)),
            _ => Ok(()),
        }
    }

    fn ensure_step(&self, step: WizardStep, action: &'static str) -> Result<(), DraftError> {
        if self.step == step {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn ensure_unlocked(&self, field: Field) -> Result<(), DraftError> {
        if self.is_locked(field) {
            return Err(ValidationError::new(field, "value was read from the receipt and is locked").into());
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DraftError {
        DraftError::InvalidTransition { from: self.step, action }
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reference numbers compare without case or surrounding space.
pub fn same_reference(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
