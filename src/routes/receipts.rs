use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};

use crate::draft::PROOF_CONTENT_TYPES;
use crate::AppState;

/// Read a receipt image and return the raw extraction payload.
///
/// A `text` part skips the OCR engine and runs only the field heuristics,
/// for callers that already recognised the text on device.
pub async fn ocr_receipt(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut image: Option<(Vec<u8>, String)> = None;
    let mut text: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name().map(str::to_string).as_deref() {
                Some("image") => {
                    let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                    match field.bytes().await {
                        Ok(bytes) => image = Some((bytes.to_vec(), content_type)),
                        Err(e) => return e.into_response(),
                    }
                }
                Some("text") => match field.text().await {
                    Ok(t) => text = Some(t),
                    Err(e) => return e.into_response(),
                },
                _ => {}
            },
            Ok(None) => break,
            Err(e) => return e.into_response(),
        }
    }

    let text = match (text, image) {
        (Some(text), _) => text,
        (None, Some((bytes, content_type))) => {
            if bytes.is_empty() || !PROOF_CONTENT_TYPES.contains(&content_type.as_str()) {
                return (StatusCode::UNPROCESSABLE_ENTITY, "Unsupported or empty image").into_response();
            }
            if !crate::ocr::AVAILABLE {
                return (StatusCode::SERVICE_UNAVAILABLE, "OCR not available").into_response();
            }
            match crate::ocr::run_ocr(bytes).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("OCR failed: {}", e);
                    return (StatusCode::UNPROCESSABLE_ENTITY, "Receipt could not be read").into_response();
                }
            }
        }
        (None, None) => return (StatusCode::BAD_REQUEST, "Missing image").into_response(),
    };

    let channels = match crate::db::list_channels(&state.db).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Channel lookup failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };

    let reading = crate::ocr::read_fields(&text, &channels);
    tracing::info!(confidence = reading.confidence, template = %reading.template, "Receipt read");
    (StatusCode::OK, AxumJson(reading)).into_response()
}
