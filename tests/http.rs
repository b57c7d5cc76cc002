//! REST boundary tests: the axum router over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use exportflow::engine::TransitionEngine;
use exportflow::http::router;
use exportflow::InMemoryExportStore;

fn app() -> axum::Router {
    router(TransitionEngine::new(Arc::new(InMemoryExportStore::new())))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn submit_body() -> Value {
    json!({
        "exporterId": "exp-1",
        "exporterName": "Sidamo Coop",
        "coffeeType": "Arabica",
        "quantityKg": 19200.0,
        "destinationCountry": "DE",
        "estimatedValueUsd": 96000.0,
        "actorId": "exp-1",
    })
}

/// Submit an export through the API and return its id.
async fn submitted_id(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(post("/exports", submit_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn submit_returns_created_pending_record() {
    let app = app();
    let response = app
        .oneshot(post("/exports", submit_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["exporterName"], "Sidamo Coop");
}

#[tokio::test]
async fn transition_updates_the_record_and_history() {
    let app = app();
    let id = submitted_id(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            &format!("/exports/{id}/transition"),
            json!({
                "targetStatus": "ECX_VERIFIED",
                "organization": "ECX",
                "actorId": "ecx-clerk",
                "payload": { "lotNumber": "LOT-7" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ECX_VERIFIED");
    assert_eq!(body["ecxLotNumber"], "LOT-7");

    let response = app
        .clone()
        .oneshot(get(&format!("/exports/{id}/history")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["oldStatus"], "PENDING");
    assert_eq!(entries[0]["newStatus"], "ECX_VERIFIED");
    assert_eq!(entries[0]["organization"], "ECX");
}

#[tokio::test]
async fn invalid_transition_maps_to_409() {
    let app = app();
    let id = submitted_id(&app).await;

    let response = app
        .oneshot(post(
            &format!("/exports/{id}/transition"),
            json!({
                "targetStatus": "FX_APPROVED",
                "organization": "NATIONAL_BANK",
                "actorId": "nb-1",
                "payload": { "fxApprovalId": "FX-1" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn unauthorized_organization_maps_to_403() {
    let app = app();
    let id = submitted_id(&app).await;

    let response = app
        .oneshot(post(
            &format!("/exports/{id}/transition"),
            json!({
                "targetStatus": "ECX_VERIFIED",
                "organization": "CUSTOMS",
                "actorId": "cu-1",
                "payload": { "lotNumber": "LOT-7" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn missing_payload_field_maps_to_400() {
    let app = app();
    let id = submitted_id(&app).await;

    let response = app
        .oneshot(post(
            &format!("/exports/{id}/transition"),
            json!({
                "targetStatus": "ECX_VERIFIED",
                "organization": "ECX",
                "actorId": "ecx-clerk",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_field");
}

#[tokio::test]
async fn unknown_export_maps_to_404() {
    let app = app();
    let response = app
        .oneshot(get(&format!(
            "/exports/{}/history",
            uuid::Uuid::new_v4()
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_returns_the_merged_view() {
    let app = app();
    let id = submitted_id(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            &format!("/exports/{id}/transition"),
            json!({
                "targetStatus": "ECX_VERIFIED",
                "organization": "ECX",
                "actorId": "ecx-clerk",
                "payload": { "lotNumber": "LOT-7" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/exports/{id}/summary")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["export"]["status"], "ECX_VERIFIED");
    assert_eq!(summary["history"].as_array().unwrap().len(), 1);
    assert_eq!(summary["approvals"].as_array().unwrap().len(), 1);
    assert_eq!(summary["approvals"][0]["approvalType"], "ECX_VERIFICATION");
    assert_eq!(summary["approvals"][0]["decision"], "APPROVED");
}

#[tokio::test]
async fn negative_list_limit_is_clamped_not_an_error() {
    let app = app();
    let _id = submitted_id(&app).await;

    let response = app.oneshot(get("/exports?limit=-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = app();
    let _id = submitted_id(&app).await;

    let response = app
        .clone()
        .oneshot(get("/exports?status=PENDING"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get("/exports?status=COMPLETED"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}
