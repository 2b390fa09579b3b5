/// HTTP API tests driving the router in-process, no live server needed

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use stacking_prediction_market::{
    build_router, AppState, Entity, EntityKey, MemoryStore, SharedState,
};

// ============================================================================
// HELPERS
// ============================================================================

fn test_state() -> SharedState {
    Arc::new(AppState::new(Arc::new(MemoryStore::new())))
}

async fn request(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn connect(app: &Router, user_id: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/auth/connect",
        Some(json!({ "userId": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn create_market(app: &Router, creator: &str, question: &str) -> String {
    let now = Utc::now();
    let (status, body) = request(
        app,
        "POST",
        "/markets",
        Some(json!({
            "creatorId": creator,
            "category": "Economy",
            "question": question,
            "startAt": (now - Duration::hours(1)).to_rfc3339(),
            "endAt": (now + Duration::hours(24)).to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["market"]["id"].as_str().unwrap().to_string()
}

/// Rewind the trading window so the market reads as closed
fn close_market(state: &AppState, market_id: &str) {
    let key = EntityKey::Market(market_id.to_string());
    let read = state
        .engine
        .store()
        .read_many(std::slice::from_ref(&key))
        .unwrap();
    let mut market = match read[0].entity.clone() {
        Some(Entity::Market(m)) => m,
        _ => panic!("expected market"),
    };
    market.end_at = Utc::now() - Duration::seconds(1);
    state
        .engine
        .store()
        .commit(&[(key, read[0].version)], &[Entity::Market(market)])
        .unwrap();
}

// ============================================================================
// HEALTH & CONNECT
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = build_router(test_state());
    let (status, body) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("Online"));
}

#[tokio::test]
async fn test_connect_returns_funded_account() {
    let app = build_router(test_state());

    let body = connect(&app, "wallet-abc-123").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["account"]["userId"], "wallet-abc-123");
    assert_eq!(body["account"]["balance"], 100_000);
    assert_eq!(body["account"]["displayName"], "Trader-wallet");

    // Reconnect does not refund
    let again = connect(&app, "wallet-abc-123").await;
    assert_eq!(again["account"]["balance"], 100_000);
}

#[tokio::test]
async fn test_connect_rejects_blank_user() {
    let app = build_router(test_state());
    let (status, body) = request(
        &app,
        "POST",
        "/auth/connect",
        Some(json!({ "userId": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "validation");
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[tokio::test]
async fn test_profile_roundtrip() {
    let app = build_router(test_state());
    connect(&app, "alice").await;

    let (status, body) = request(
        &app,
        "PUT",
        "/accounts/alice/profile",
        Some(json!({ "displayName": "Alice", "bio": "macro desk" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["displayName"], "Alice");

    let (status, body) = request(&app, "GET", "/accounts/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["bio"], "macro desk");
    assert_eq!(body["account"]["photoUrl"], "");
}

#[tokio::test]
async fn test_unknown_account_is_404() {
    let app = build_router(test_state());
    let (status, body) = request(&app, "GET", "/accounts/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

// ============================================================================
// MARKET LIFECYCLE OVER HTTP
// ============================================================================

#[tokio::test]
async fn test_market_trade_resolve_claim_flow() {
    let state = test_state();
    let app = build_router(state.clone());
    connect(&app, "alice").await;
    connect(&app, "bob").await;

    let market_id = create_market(&app, "alice", "Will volume double this week?").await;

    let (status, body) = request(&app, "GET", &format!("/markets/{}", market_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["market"]["phase"], "ongoing");
    assert_eq!(body["market"]["yesPrice"], 50);
    assert_eq!(body["market"]["totalContracts"], 0);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/buy", market_id),
        Some(json!({ "userId": "bob", "side": "Yes", "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["unitPrice"], 50);
    assert_eq!(body["receipt"]["totalCost"], 200);
    assert_eq!(body["receipt"]["newBalance"], 99_800);

    close_market(&state, &market_id);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/markets/{}/resolve", market_id),
        Some(json!({ "userId": "alice", "winningSide": "Yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/claim", market_id),
        Some(json!({ "userId": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["payout"], 400);
    assert_eq!(body["receipt"]["newBalance"], 100_200);

    // Claiming twice is a conflict
    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/claim", market_id),
        Some(json!({ "userId": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "precondition");

    let (status, body) = request(&app, "GET", "/accounts/bob/positions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positions"][0]["claimed"], true);
    assert_eq!(body["positions"][0]["claimable"], 0);

    // The feed recorded the journey
    let (status, body) = request(&app, "GET", "/activity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["activity"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_market_listing_filters_by_category() {
    let app = build_router(test_state());
    connect(&app, "alice").await;
    create_market(&app, "alice", "Economy question?").await;

    let (status, body) = request(&app, "GET", "/markets?category=Economy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markets"].as_array().unwrap().len(), 1);

    let (status, body) = request(&app, "GET", "/markets?category=Politics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["markets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_trade_validation_errors() {
    let app = build_router(test_state());
    connect(&app, "alice").await;
    let market_id = create_market(&app, "alice", "Will it rain tomorrow?").await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/buy", market_id),
        Some(json!({ "userId": "alice", "side": "Yes", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = request(
        &app,
        "POST",
        "/markets/missing/buy",
        Some(json!({ "userId": "alice", "side": "Yes", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/resolve", market_id),
        Some(json!({ "userId": "alice", "winningSide": "Yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "precondition");
}

// ============================================================================
// COMMENTS OVER HTTP
// ============================================================================

#[tokio::test]
async fn test_comment_like_unlock_flow() {
    let app = build_router(test_state());
    connect(&app, "alice").await;
    connect(&app, "bob").await;
    let market_id = create_market(&app, "alice", "Will the merger clear?").await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/markets/{}/comments", market_id),
        Some(json!({ "userId": "alice", "side": "Pro", "text": "Regulators signalled approval" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/comments/{}/like", comment_id),
        Some(json!({ "userId": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["liked"], true);
    assert_eq!(body["receipt"]["likeCount"], 1);

    // Authors cannot like their own comments
    let (status, body) = request(
        &app,
        "POST",
        &format!("/comments/{}/like", comment_id),
        Some(json!({ "userId": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "precondition");

    let (status, body) = request(
        &app,
        "POST",
        &format!("/comments/{}/unlock", comment_id),
        Some(json!({ "userId": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["cost"], 100);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/markets/{}/comments?viewer=bob", market_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let view = &body["comments"][0];
    assert_eq!(view["likedByViewer"], true);
    assert_eq!(view["unlockedByViewer"], true);
    assert_eq!(view["hidden"], false);

    let (status, body) = request(&app, "GET", "/accounts/alice/comments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
}
