//! Integration tests for CWV ingestion and status, run over the in-memory
//! store with the production middleware stack.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    batch, body_json, get, get_auth, memory_app, metric, post_json, post_raw, token_for,
    FailingStore,
};
use vitals_core::roles::{ROLE_ADMIN, ROLE_AUTHOR, ROLE_EDITOR, ROLE_SUBSCRIBER};

const INGEST: &str = "/api/v1/cwv";

// ---------------------------------------------------------------------------
// Ingestion: accepted batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_batch_is_accepted_and_counted() {
    let (app, store) = memory_app();

    let response = post_json(app, INGEST, batch(vec![metric("LCP", 1800.0, "42")])).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["processed"], 1);

    let stored = store.samples_for_page("42").await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meta.user_agent, "Mozilla/5.0 (test)");
    assert_eq!(stored[0].meta.viewport.width, 1280);
}

#[tokio::test]
async fn text_plain_beacon_body_is_accepted() {
    let (app, store) = memory_app();
    let body = batch(vec![metric("CLS", 0.05, "7"), metric("INP", 120.0, "7")]).to_string();

    let response = post_raw(app, INGEST, "text/plain;charset=UTF-8", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["processed"], 2);
    assert_eq!(store.sample_count().await, 2);
}

#[tokio::test]
async fn values_are_rounded_to_two_decimals() {
    let (app, store) = memory_app();

    let response = post_json(app, INGEST, batch(vec![metric("LCP", 123.456, "42")])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = store.samples_for_page("42").await;
    assert_eq!(stored[0].sample.value, 123.46);
    assert_eq!(stored[0].sample.delta, 123.46);
}

#[tokio::test]
async fn numeric_page_id_is_accepted() {
    let (app, store) = memory_app();
    let mut m = metric("FCP", 900.0, "ignored");
    m["pageId"] = serde_json::json!(42);

    let response = post_json(app, INGEST, batch(vec![m])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.samples_for_page("42").await.len(), 1);
}

// ---------------------------------------------------------------------------
// Ingestion: rejected batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_metrics_array_returns_400() {
    let (app, store) = memory_app();

    let response = post_json(app, INGEST, serde_json::json!({ "metrics": [] })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "No metrics provided");
    assert_eq!(store.sample_count().await, 0);
}

#[tokio::test]
async fn missing_metrics_key_matches_empty_array_response() {
    let (app, _) = memory_app();
    let missing = body_json(post_json(app.clone(), INGEST, serde_json::json!({})).await).await;
    let empty =
        body_json(post_json(app, INGEST, serde_json::json!({ "metrics": [] })).await).await;

    assert_eq!(missing, empty);
}

#[tokio::test]
async fn null_metrics_matches_missing_metrics_response() {
    let (app, _) = memory_app();
    let missing = post_json(app.clone(), INGEST, serde_json::json!({})).await;
    let null = post_json(app, INGEST, serde_json::json!({ "metrics": null })).await;

    assert_eq!(null.status(), StatusCode::BAD_REQUEST);
    let missing = body_json(missing).await;
    let null = body_json(null).await;
    assert_eq!(null["code"], "VALIDATION_ERROR");
    assert_eq!(missing, null);
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let (app, _) = memory_app();

    let response = post_raw(app, INGEST, "application/json", "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn one_invalid_sample_rejects_the_whole_batch() {
    let (app, store) = memory_app();
    let mut bad = metric("INP", 200.0, "42");
    bad["value"] = serde_json::json!(-5.0);

    let response = post_json(app, INGEST, batch(vec![metric("LCP", 1000.0, "42"), bad])).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["message"].as_str().unwrap().starts_with("metrics[1]: "));
    assert_eq!(store.sample_count().await, 0);
}

#[tokio::test]
async fn unknown_vital_name_returns_400() {
    let (app, _) = memory_app();

    let response = post_json(app, INGEST, batch(vec![metric("FID", 10.0, "42")])).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_batch_returns_400() {
    let (app, store) = memory_app();
    let metrics = (0..101)
        .map(|i| {
            let mut m = metric("CLS", 0.01, "42");
            m["id"] = serde_json::json!(format!("cls-{i}"));
            m
        })
        .collect();

    let response = post_json(app, INGEST, batch(metrics)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.sample_count().await, 0);
}

#[tokio::test]
async fn store_failure_returns_sanitized_500() {
    let app = common::build_test_app(Arc::new(FailingStore));

    let response = post_json(app, INGEST, batch(vec![metric("LCP", 1800.0, "42")])).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    let message = json["message"].as_str().unwrap();
    assert!(!message.contains("hunter2"));
    assert!(!message.contains("postgres"));
}

// ---------------------------------------------------------------------------
// Status: authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_without_token_returns_401() {
    let (app, _) = memory_app();

    let response = get(app, "/api/v1/cwv/status/42").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn status_with_bad_token_returns_401() {
    let (app, _) = memory_app();

    let response = get_auth(app, "/api/v1/cwv/status/42", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_below_editor_returns_403() {
    for role in [ROLE_AUTHOR, ROLE_SUBSCRIBER] {
        let (app, _) = memory_app();
        let response = get_auth(app, "/api/v1/cwv/status/42", &token_for(role)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {role}");
    }
}

// ---------------------------------------------------------------------------
// Status: aggregates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_for_unknown_page_is_empty() {
    let (app, _) = memory_app();

    let response = get_auth(app, "/api/v1/cwv/status/999", &token_for(ROLE_EDITOR)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pageId"], "999");
    assert_eq!(json["sampleCount"], 0);
    assert!(json["overall"].is_null());
    assert!(json["vitals"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn status_reflects_ingested_batches() {
    let (app, _) = memory_app();

    let mut poor_inp = metric("INP", 650.0, "42");
    poor_inp["rating"] = serde_json::json!("poor");
    let response = post_json(
        app.clone(),
        INGEST,
        batch(vec![metric("LCP", 1800.0, "42"), poor_inp]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut second_lcp = metric("LCP", 2200.0, "42");
    second_lcp["id"] = serde_json::json!("v4-LCP-second");
    let response = post_json(app.clone(), INGEST, batch(vec![second_lcp])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app, "/api/v1/cwv/status/42", &token_for(ROLE_ADMIN)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["pageId"], "42");
    assert_eq!(json["sampleCount"], 3);
    assert_eq!(json["overall"], "poor");

    let lcp = &json["vitals"]["LCP"];
    assert_eq!(lcp["sampleCount"], 2);
    assert_eq!(lcp["min"], 1800.0);
    assert_eq!(lcp["max"], 2200.0);
    assert_eq!(lcp["mean"], 2000.0);
    assert_eq!(lcp["distribution"]["good"], 2);
    assert_eq!(lcp["rating"], "good");

    assert_eq!(json["vitals"]["INP"]["rating"], "poor");
}

#[tokio::test]
async fn status_store_failure_returns_500() {
    let app = common::build_test_app(Arc::new(FailingStore));

    let response = get_auth(app, "/api/v1/cwv/status/42", &token_for(ROLE_EDITOR)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
}
