use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use donation_intake::{db, routes};

mod common;
use common::test_state;

const BOUNDARY: &str = "intake-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"receipt\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn donation_fields<'a>(reference: &'a str, channel: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("charity_id", "red-cross"),
        ("campaign_id", "typhoon"),
        ("amount", "500"),
        ("receipt_amount", "500.00"),
        ("donation_type", "one_time"),
        ("channel_used", channel),
        ("reference_number", reference),
        ("is_anonymous", "false"),
    ]
}

#[tokio::test]
async fn health_check_responds() {
    let app = routes::router(test_state().await);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn lists_active_channels() {
    let state = test_state().await;
    db::upsert_channel(
        &state.db,
        &donation_intake::channels::Channel {
            id: "old".into(),
            channel_type: "bank".into(),
            label: "Old Bank".into(),
            is_active: false,
        },
    )
    .await
    .unwrap();
    let app = routes::router(state);

    let (status, all) = send(&app, Request::builder().uri("/api/channels").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (_, active) = send(
        &app,
        Request::builder().uri("/api/channels?active=true").body(Body::empty()).unwrap(),
    )
    .await;
    let labels: Vec<&str> = active
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels.len(), 3);
    assert!(!labels.contains(&"Old Bank"));
    assert_eq!(active[0]["type"], "bank");
}

#[tokio::test]
async fn records_a_donation_and_stores_its_proof() {
    let state = test_state().await;
    let app = routes::router(state.clone());

    let body = multipart(&donation_fields("REF-1001", "gcash"), Some(("proof", "image/png", PNG)));
    let (status, json) = send(&app, multipart_request("/api/donations", body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);

    let id = json["id"].as_str().expect("id in body");
    let stored = db::get_donation(&state.db, id).await.unwrap().expect("stored donation");
    assert_eq!(stored.reference_number, "REF-1001");
    assert_eq!(stored.channel_used, "GCash");
    assert_eq!(stored.campaign_id.as_deref(), Some("typhoon"));
    assert_eq!(stored.donation_date, Utc::now().date_naive());
    let proof = state.storage.read(&stored.proof_key).await.unwrap();
    assert_eq!(proof.to_vec(), PNG.to_vec());
}

#[tokio::test]
async fn reused_reference_returns_the_earlier_donation() {
    let app = routes::router(test_state().await);

    let first = multipart(&donation_fields("REF-2002", "GCash"), Some(("proof", "image/png", PNG)));
    let (status, _) = send(&app, multipart_request("/api/donations", first)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Same reference with different case and padding.
    let mut fields = donation_fields(" ref-2002 ", "Maya");
    fields[2] = ("amount", "750");
    let second = multipart(&fields, Some(("proof", "image/png", &b"another image"[..])));
    let (status, json) = send(&app, multipart_request("/api/donations", second)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "duplicate_reference");
    assert_eq!(json["conflict"]["reference_number"], "REF-2002");
    assert_eq!(json["conflict"]["previous_amount"], "500");
    assert_eq!(json["conflict"]["previous_recipient"], "Typhoon Relief");
    assert_eq!(json["conflict"]["previous_status"], "pending");
    assert!(json["conflict"].get("donor_email").is_none());
}

#[tokio::test]
async fn direct_donations_name_the_charity_as_recipient() {
    let app = routes::router(test_state().await);
    let mut fields = donation_fields("REF-3003", "Bank Transfer");
    fields[1] = ("campaign_id", "direct");

    let (status, _) = send(
        &app,
        multipart_request("/api/donations", multipart(&fields, Some(("proof", "application/pdf", &b"%PDF-1.4"[..])))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(
        &app,
        multipart_request("/api/donations", multipart(&fields, Some(("proof", "application/pdf", &b"%PDF-1.4"[..])))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["conflict"]["previous_recipient"], "Philippine Red Cross");
}

#[tokio::test]
async fn rejects_invalid_submissions_by_field() {
    let app = routes::router(test_state().await);

    let cases: Vec<(Vec<(&str, &str)>, Option<(&str, &str, &[u8])>, &str)> = vec![
        (donation_fields("REF-1", "PayPal"), Some(("proof", "image/png", PNG)), "channel_used"),
        (donation_fields("", "GCash"), Some(("proof", "image/png", PNG)), "reference_number"),
        (donation_fields("REF-2", "GCash"), None, "proof"),
        (donation_fields("REF-3", "GCash"), Some(("proof", "image/gif", PNG)), "proof"),
        (
            {
                let mut f = donation_fields("REF-4", "GCash");
                f[2] = ("amount", "0");
                f
            },
            Some(("proof", "image/png", PNG)),
            "amount",
        ),
        (
            {
                let mut f = donation_fields("REF-5", "GCash");
                f[4] = ("donation_type", "recurring");
                f
            },
            Some(("proof", "image/png", PNG)),
            "frequency",
        ),
        (
            {
                let mut f = donation_fields("REF-6", "GCash");
                f[1] = ("campaign_id", "missing-campaign");
                f
            },
            Some(("proof", "image/png", PNG)),
            "campaign_id",
        ),
        (
            {
                let mut f = donation_fields("REF-7", "GCash");
                f.push(("donation_date", "not a date"));
                f
            },
            Some(("proof", "image/png", PNG)),
            "donation_date",
        ),
        (
            {
                let mut f = donation_fields("REF-8", "GCash");
                f[4] = ("donation_type", "sometimes");
                f
            },
            Some(("proof", "image/png", PNG)),
            "donation_type",
        ),
    ];

    for (fields, file, expected_field) in cases {
        let (status, json) = send(&app, multipart_request("/api/donations", multipart(&fields, file))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "expected {} error", expected_field);
        assert_eq!(json["error"], "validation");
        assert_eq!(json["field"], expected_field);
    }
}

#[tokio::test]
async fn refund_window_opens_once_completed() {
    let app = routes::router(test_state().await);
    let body = multipart(&donation_fields("REF-4004", "GCash"), Some(("proof", "image/png", PNG)));
    let (_, created) = send(&app, multipart_request("/api/donations", body)).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, view) = send(
        &app,
        Request::builder().uri(format!("/api/donations/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["recipient"], "Typhoon Relief");
    assert_eq!(view["refund"]["eligible"], false);

    let update = Request::builder()
        .method("PUT")
        .uri(format!("/api/donations/{}/status", id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"status":"completed"}"#))
        .unwrap();
    let (status, _) = send(&app, update).await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(
        &app,
        Request::builder().uri(format!("/api/donations/{}", id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(view["donation"]["status"], "completed");
    assert_eq!(view["refund"]["eligible"], true);
    assert_eq!(view["refund"]["days_remaining"], 7);
}

#[tokio::test]
async fn history_view_hides_proof_key_and_anonymous_donor() {
    let app = routes::router(test_state().await);

    let mut named = donation_fields("REF-9009", "GCash");
    named.push(("donor_name", "Ana Cruz"));
    named.push(("donor_email", "ana@example.com"));
    let (_, created) = send(
        &app,
        multipart_request("/api/donations", multipart(&named, Some(("proof", "image/png", PNG)))),
    )
    .await;
    let (_, view) = send(
        &app,
        Request::builder()
            .uri(format!("/api/donations/{}", created["id"].as_str().unwrap()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(view["donation"].get("proof_key").is_none());
    assert_eq!(view["donation"]["donor_name"], "Ana Cruz");

    let mut anonymous = donation_fields("REF-9010", "GCash");
    anonymous[7] = ("is_anonymous", "true");
    anonymous.push(("donor_name", "Ana Cruz"));
    anonymous.push(("donor_email", "ana@example.com"));
    let (_, created) = send(
        &app,
        multipart_request("/api/donations", multipart(&anonymous, Some(("proof", "image/png", &b"second"[..])))),
    )
    .await;
    let (_, view) = send(
        &app,
        Request::builder()
            .uri(format!("/api/donations/{}", created["id"].as_str().unwrap()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(view["donation"]["is_anonymous"], true);
    assert!(view["donation"].get("donor_name").is_none());
    assert!(view["donation"].get("donor_email").is_none());
    assert!(view["donation"].get("proof_key").is_none());
}

#[tokio::test]
async fn unknown_donations_are_not_found() {
    let app = routes::router(test_state().await);
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/donations/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let update = Request::builder()
        .method("PUT")
        .uri("/api/donations/nope/status")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"status":"completed"}"#))
        .unwrap();
    assert_eq!(app.oneshot(update).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ocr_endpoint_reads_supplied_text() {
    let app = routes::router(test_state().await);
    let text = "GCash\nAmount PHP 1,000.00\nRef No. 1009 876 543210\nMar 1, 2024";
    let (status, json) = send(&app, multipart_request("/api/receipts/ocr", multipart(&[("text", text)], None))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reference_number"], "1009 876 543210");
    assert_eq!(json["amount"], "1000.00");
    assert_eq!(json["date"], "2024-03-01");
    assert_eq!(json["template"], "GCash");
    assert_eq!(json["confidence"], 100);
}

#[tokio::test]
async fn ocr_endpoint_rejects_unsupported_images() {
    let app = routes::router(test_state().await);
    let body = multipart(&[], Some(("image", "image/gif", &b"GIF89a"[..])));
    let (status, _) = send(&app, multipart_request("/api/receipts/ocr", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[cfg(not(feature = "ocr"))]
#[tokio::test]
async fn ocr_endpoint_reports_missing_engine() {
    let app = routes::router(test_state().await);
    let body = multipart(&[], Some(("image", "image/png", PNG)));
    let (status, _) = send(&app, multipart_request("/api/receipts/ocr", body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
