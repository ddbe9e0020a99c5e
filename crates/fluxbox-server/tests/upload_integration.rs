mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{json_body, test_config, TestApp, MB, USER_HEADER};
use fluxbox_core::config::AuthMode;
use fluxbox_server::payments::DecliningPaymentGateway;

#[tokio::test]
async fn upload_within_quota_returns_presigned_target() {
    let app = TestApp::new();
    let response = app
        .get(
            "user_a",
            "/upload?key=docs/report.pdf&contentType=application/pdf&fileSize=1024",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["key"], "docs/report.pdf");
    let url = json["url"].as_str().expect("url");
    assert!(url.contains("user_a/docs/report.pdf"), "{url}");
    assert!(url.contains("X-Expires=3600"), "{url}");
    assert!(json["expiresAt"].is_string());
}

#[tokio::test]
async fn upload_parameter_validation() {
    let app = TestApp::new();
    for (uri, message) in [
        ("/upload?fileSize=10", "Key is required"),
        ("/upload?key=a.txt", "File size is required"),
        ("/upload?key=a.txt&fileSize=abc", "Invalid file size"),
        ("/upload?key=a.txt&fileSize=-5", "Invalid file size"),
    ] {
        let response = app.get("user_a", uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], message, "{uri}");
    }

    let response = app.get("user_a", "/upload?key=../user_b/x&fileSize=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn over_quota_upload_is_forbidden_with_usage_message() {
    let app = TestApp::new();
    app.seed("user_a/big.bin", 8 * MB).await;

    let response = app
        .get("user_a", &format!("/upload?key=more.bin&fileSize={}", 3 * MB))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "quota_exceeded");
    assert_eq!(
        json["error"]["message"],
        "Storage limit exceeded. You have used 8.00 MB. Maximum allowed is 10 MB."
    );

    // The denied upload waits for a plan change.
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["relativePath"], "more.bin");
    assert_eq!(pending["pending"]["sizeBytes"], 3 * MB);
}

#[tokio::test]
async fn upload_that_exactly_fills_the_plan_is_allowed() {
    let app = TestApp::new();
    app.seed("user_a/big.bin", 8 * MB).await;
    let response = app
        .get("user_a", &format!("/upload?key=rest.bin&fileSize={}", 2 * MB))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn zero_byte_upload_at_the_limit_is_allowed() {
    let app = TestApp::new();
    app.seed("user_a/full.bin", 10 * MB).await;
    let response = app.get("user_a", "/upload?key=empty.txt&fileSize=0").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_outage_is_a_server_error() {
    let app = TestApp::new();
    app.backend.set_store_available(false);
    let response = app.get("user_a", "/upload?key=a.txt&fileSize=1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "internal_error");
}

#[tokio::test]
async fn issuer_outage_is_a_server_error() {
    let app = TestApp::new();
    app.backend.set_issuer_available(false);
    let response = app.get("user_a", "/upload?key=a.txt&fileSize=1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn in_flight_uploads_count_until_completed() {
    let app = TestApp::new();
    let first = app
        .get("user_a", &format!("/upload?key=one.bin&fileSize={}", 6 * MB))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .get("user_a", &format!("/upload?key=two.bin&fileSize={}", 6 * MB))
        .await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);

    let done = app
        .post_json("user_a", "/upload/complete", json!({ "key": "one.bin" }))
        .await;
    assert_eq!(done.status(), StatusCode::OK);
    assert_eq!(json_body(done).await["released"], true);

    let retry = app
        .get("user_a", &format!("/upload?key=two.bin&fileSize={}", 6 * MB))
        .await;
    assert_eq!(retry.status(), StatusCode::OK);
}

#[tokio::test]
async fn pending_upload_resolves_after_upgrade() {
    let app = TestApp::new();
    app.seed("user_a/old.bin", 5 * MB).await;

    let denied = app
        .get("user_a", &format!("/upload?key=video.mp4&fileSize={}", 40 * MB))
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // Still on the free plan: resolving is refused and the slot is kept.
    let still = app
        .post_json("user_a", "/upload/pending/resolve", json!({}))
        .await;
    assert_eq!(still.status(), StatusCode::FORBIDDEN);
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["phase"], "denied");

    let intent = json_body(
        app.post_json("user_a", "/payments/intents", json!({ "planId": "pro-50" }))
            .await,
    )
    .await;
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["phase"], "paying");

    let confirm = app
        .post_json(
            "user_a",
            "/payments/confirm",
            json!({ "intentId": intent["intentId"] }),
        )
        .await;
    assert_eq!(confirm.status(), StatusCode::OK);
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["phase"], "applied");

    let resolved = app
        .post_json("user_a", "/upload/pending/resolve", json!({}))
        .await;
    assert_eq!(resolved.status(), StatusCode::OK);
    let json = json_body(resolved).await;
    assert_eq!(json["key"], "video.mp4");
    assert_eq!(json["phase"], "allowed");
    assert!(json["url"].as_str().expect("url").contains("user_a/video.mp4"));

    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert!(pending["pending"].is_null());
}

#[tokio::test]
async fn resolve_without_pending_is_not_found() {
    let app = TestApp::new();
    let response = app
        .post_json("user_a", "/upload/pending/resolve", json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_discards_pending_upload() {
    let app = TestApp::new();
    app.get("user_a", &format!("/upload?key=huge.bin&fileSize={}", 11 * MB))
        .await;

    let json = json_body(app.delete("user_a", "/upload/pending").await).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["cancelled"], true);

    let json = json_body(app.delete("user_a", "/upload/pending").await).await;
    assert_eq!(json["cancelled"], false);
}

#[tokio::test]
async fn overwriting_an_existing_key_still_reserves() {
    let app = TestApp::new();
    app.seed("user_a/a.bin", MB).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let first = app
        .get("user_a", &format!("/upload?key=a.bin&fileSize={}", 9 * MB))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    // The old a.bin is still listed, but the 9 MB PUT has not landed yet.
    let second = app
        .get("user_a", &format!("/upload?key=b.bin&fileSize={}", 9 * MB))
        .await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn declined_payment_marks_pending_and_retry_pays_again() {
    let app = TestApp::with(
        test_config(AuthMode::TrustedHeader(USER_HEADER.to_string())),
        Arc::new(DecliningPaymentGateway {
            reason: "card expired".to_string(),
        }),
    );
    app.get("user_a", &format!("/upload?key=big.bin&fileSize={}", 20 * MB))
        .await;

    let intent = json_body(
        app.post_json("user_a", "/payments/intents", json!({ "planId": "pro-50" }))
            .await,
    )
    .await;
    let declined = app
        .post_json(
            "user_a",
            "/payments/confirm",
            json!({ "intentId": intent["intentId"] }),
        )
        .await;
    assert_eq!(declined.status(), StatusCode::PAYMENT_REQUIRED);
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["phase"], "payFailed");

    app.post_json("user_a", "/payments/intents", json!({ "planId": "pro-50" }))
        .await;
    let pending = json_body(app.get("user_a", "/upload/pending").await).await;
    assert_eq!(pending["pending"]["phase"], "paying");
}
