// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error taxonomy tests: each variant maps to its HTTP status, and the
//! opaque variants never leak details to the client.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use vidstream::error::AppError;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_status_mapping() {
    assert_eq!(
        status_of(AppError::Validation("missing field".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::Conflict("duplicate email".to_string())),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_of(AppError::NotFound("no such channel".to_string())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::Auth("stale token".to_string())),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_of(AppError::Dependency("upload failed".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(AppError::Database("offline".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_auth_errors_carry_no_details() {
    // The refresh path reports every failure as the same opaque 401; the
    // body must not reveal which check rejected the token.
    let response = AppError::Auth("refresh token superseded by rotation".to_string()).into_response();

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], "unauthorized");
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_validation_errors_explain_themselves() {
    let response = AppError::Validation("All fields are required".to_string()).into_response();

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["details"], "All fields are required");
}
