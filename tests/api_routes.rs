//! API integration tests
//!
//! Drives the full router over in-memory stores: registration, login,
//! bearer-protected account operations and the refresh flow.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and log in, returning an access token.
async fn login(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            None,
            json!({"name": "alice", "password": "hunter2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"name": "alice", "password": "hunter2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_account_routes_require_bearer_token() {
    let app = common::test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/accounts",
            None,
            json!({"name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/accounts",
            Some("not-a-real-token"),
            json!({"name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_lifecycle_over_http() {
    let app = common::test_app();
    let token = login(&app).await;

    // Create
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/accounts",
            Some(&token),
            json!({"name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let account = body_json(response).await;
    let account_id = account["id"].as_str().unwrap().to_string();
    assert_eq!(account["balance"], "0");

    // Deposit
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accounts/{account_id}/deposits"),
            Some(&token),
            json!({"amount": "100"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["balance"], "100");

    // Nonpositive deposit is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accounts/{account_id}/deposits"),
            Some(&token),
            json!({"amount": "0"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "nonpositive_amount");

    // Withdraw
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accounts/{account_id}/withdrawals"),
            Some(&token),
            json!({"amount": "30"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["balance"], "70");

    // Get
    let response = app
        .clone()
        .oneshot(get_request(&format!("/accounts/{account_id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Convert
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/accounts/{account_id}/balances?currencies=EUR"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let converted = body_json(response).await;
    assert_eq!(converted["converted_balances"]["EUR"], "35.0");
}

#[tokio::test]
async fn test_transfer_over_http() {
    let app = common::test_app();
    let token = login(&app).await;

    let mut ids = Vec::new();
    for name in ["S", "R"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/accounts",
                Some(&token),
                json!({ "name": name }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accounts/{}/deposits", ids[0]),
            Some(&token),
            json!({"amount": "10"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/accounts/transfers",
            Some(&token),
            json!({"sender_id": ids[0], "recipient_id": ids[1], "amount": "7"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let details = body_json(response).await;
    assert_eq!(details["sender"]["balance"], "3");
    assert_eq!(details["recipient"]["balance"], "7");

    // Overdraw reports insufficient funds and moves nothing
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/accounts/transfers",
            Some(&token),
            json!({"sender_id": ids[0], "recipient_id": ids[1], "amount": "100"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "insufficient_funds");

    // Self-transfer is a duplicate-id error
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/accounts/transfers",
            Some(&token),
            json!({"sender_id": ids[0], "recipient_id": ids[0], "amount": "1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "duplicate_id");
}

#[tokio::test]
async fn test_list_accounts_over_http() {
    let app = common::test_app();
    let token = login(&app).await;

    for name in ["c", "a", "b"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/accounts",
                Some(&token),
                json!({ "name": name }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get_request(
            "/accounts?sort_by=name&page_number=1&page_size=2",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    let names: Vec<&str> = page["accounts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(page["pagination"]["total_item_count"], 3);
}

#[tokio::test]
async fn test_refresh_and_revoke_over_http() {
    let app = common::test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            None,
            json!({"name": "bob", "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"name": "bob", "password": "pw"}),
        ))
        .await
        .unwrap();
    let pair = body_json(response).await;
    let refresh_token = pair["refresh_token"].as_str().unwrap().to_string();

    // Redeem once
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            None,
            json!({"name": "bob", "refresh_token": refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    let rotated_token = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated_token, refresh_token);

    // Replay fails
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            None,
            json!({"name": "bob", "refresh_token": refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Revoke the live token
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/revoke",
            None,
            json!({"name": "bob", "refresh_token": rotated_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/refresh",
            None,
            json!({"name": "bob", "refresh_token": rotated_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_nonspecific() {
    let app = common::test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            None,
            json!({"name": "carol", "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let wrong_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"name": "carol", "password": "nope"}),
        ))
        .await
        .unwrap();
    let unknown_user = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"name": "nobody", "password": "pw"}),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_user).await;
    assert_eq!(a["error"], b["error"]);
}
