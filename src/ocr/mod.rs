//! Receipt OCR for `/api/receipts/ocr`.
//!
//! Tesseract is linked only with the `ocr` feature. Without it `run_ocr`
//! always errors and the endpoint answers 503; field heuristics still run
//! on text supplied by the caller.

#[cfg(feature = "ocr")]
mod real {
    use anyhow::anyhow;
    use leptess::LepTess;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub async fn run_ocr(image: Vec<u8>) -> anyhow::Result<String> {
        tokio::task::spawn_blocking(move || {
            let mut tmp = NamedTempFile::new().map_err(|e| anyhow!("tmpfile: {}", e))?;
            tmp.write_all(&image).map_err(|e| anyhow!("write tmp: {}", e))?;
            let path = tmp.path().to_string_lossy().to_string();

            let mut lt = LepTess::new(None, "eng").map_err(|e| anyhow!("tesseract init: {}", e))?;
            lt.set_image(&path).map_err(|e| anyhow!("tesseract image: {}", e))?;
            lt.get_utf8_text().map_err(|e| anyhow!("tesseract run: {}", e))
        })
        .await
        .map_err(|e| anyhow!("ocr task: {}", e))?
    }

    pub const AVAILABLE: bool = true;
}

#[cfg(not(feature = "ocr"))]
mod stub {
    use anyhow::anyhow;

    pub async fn run_ocr(_image: Vec<u8>) -> anyhow::Result<String> {
        Err(anyhow!("OCR feature not enabled; build with --features ocr and install Tesseract/Leptonica"))
    }

    pub const AVAILABLE: bool = false;
}

#[cfg(feature = "ocr")]
pub use real::{run_ocr, AVAILABLE};
#[cfg(not(feature = "ocr"))]
pub use stub::{run_ocr, AVAILABLE};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::channels::Channel;
use crate::extraction::{parse_receipt_date, UNKNOWN_TEMPLATE};

static RE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ref(?:erence)?|transaction|trans)\b\.?\s*(?:no\.?|number|id|#)?\s*[:#]?\s*([A-Z0-9][A-Z0-9 -]{4,}[A-Z0-9])")
        .expect("reference regex")
});
static RE_LABELLED_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:amount|total|sent|paid)[^0-9\n]{0,15}([0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]{2})?|[0-9]+(?:\.[0-9]{2})?)")
        .expect("labelled amount regex")
});
// amount patterns $12.34 or 12.34
static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:₱|\$|PHP\s?)?([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})|[0-9]+\.[0-9]{2})").expect("amount regex")
});
// date patterns YYYY-MM-DD, MM/DD/YYYY or "Mar 1, 2024"
static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.? \d{1,2},? \d{4})")
        .expect("date regex")
});

/// Share of the confidence score each detected field contributes.
const FIELD_WEIGHT: u8 = 30;
const TEMPLATE_WEIGHT: u8 = 10;

/// Raw extraction payload as served by `/api/receipts/ocr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptReading {
    pub reference_number: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub confidence: u8,
    pub template: String,
    pub text: String,
}

/// Pull reference, amount and date out of receipt text.
///
/// Confidence is field coverage: each detected field adds `FIELD_WEIGHT`,
/// a recognised channel adds `TEMPLATE_WEIGHT`.
pub fn read_fields(text: &str, channels: &[Channel]) -> ReceiptReading {
    let reference_number = RE_REFERENCE
        .captures(text)
        .map(|cap| cap[1].trim().to_string())
        .filter(|r| r.chars().any(|c| c.is_ascii_digit()));

    let amount = RE_LABELLED_AMOUNT
        .captures(text)
        .or_else(|| RE_AMOUNT.captures(text))
        .map(|cap| cap[1].replace(',', ""));

    let date: Option<NaiveDate> = RE_DATE
        .captures_iter(text)
        .find_map(|cap| parse_receipt_date(&cap[1].replace('.', "")));

    let lowered = text.to_lowercase();
    let template = channels
        .iter()
        .filter(|c| c.is_active)
        .find(|c| lowered.contains(&c.label.to_lowercase()))
        .map(|c| c.label.clone());

    let mut confidence = 0u8;
    for found in [reference_number.is_some(), amount.is_some(), date.is_some()] {
        if found {
            confidence += FIELD_WEIGHT;
        }
    }
    if template.is_some() {
        confidence += TEMPLATE_WEIGHT;
    }

    ReceiptReading {
        reference_number,
        amount,
        date: date.map(|d| d.format("%Y-%m-%d").to_string()),
        confidence,
        template: template.unwrap_or_else(|| UNKNOWN_TEMPLATE.to_string()),
        text: text.to_string(),
    }
}
