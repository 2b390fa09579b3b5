// HTTP request handlers for the STACKING ledger API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::error::{ErrorKind, LedgerError};
use crate::models::{
    BuyRequest, Category, ConnectRequest, CreateMarketRequest, PostCommentRequest, ResolveRequest,
    UpdateProfileRequest, UserActionRequest,
};

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn error_response(e: LedgerError) -> (StatusCode, Json<Value>) {
    let status = match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Precondition => StatusCode::CONFLICT,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "success": false,
        "error": e.to_string(),
        "kind": e.kind(),
    });
    (status, Json(body))
}

#[derive(Debug, Deserialize)]
pub struct MarketsQuery {
    pub category: Option<Category>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub viewer: Option<String>,
}

// ===== AUTH ENDPOINTS =====

pub async fn connect(
    State(state): State<SharedState>,
    Json(payload): Json<ConnectRequest>,
) -> ApiResult {
    let account = state
        .engine
        .connect(&payload.user_id)
        .map_err(error_response)?;
    state.log_activity(
        "🔗",
        "CONNECT",
        &format!("{} connected | {} tokens", account.user_id, account.balance),
    );
    Ok(Json(json!({ "success": true, "account": account })))
}

// ===== ACCOUNT ENDPOINTS =====

pub async fn get_account(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult {
    let account = state.engine.account(&id).map_err(error_response)?;
    Ok(Json(json!({ "success": true, "account": account })))
}

pub async fn update_profile(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult {
    let account = state
        .engine
        .update_profile(&id, payload)
        .map_err(error_response)?;
    state.log_activity(
        "👤",
        "PROFILE_UPDATED",
        &format!("{} is now {}", account.user_id, account.display_name),
    );
    Ok(Json(json!({ "success": true, "account": account })))
}

pub async fn get_account_comments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult {
    let comments = state
        .engine
        .comments_by_author(&id, query.viewer.as_deref())
        .map_err(error_response)?;
    Ok(Json(json!({ "success": true, "comments": comments })))
}

pub async fn get_account_positions(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult {
    let positions = state.engine.positions(&id).map_err(error_response)?;
    Ok(Json(json!({ "success": true, "positions": positions })))
}

// ===== MARKET ENDPOINTS =====

pub async fn get_markets(
    State(state): State<SharedState>,
    Query(query): Query<MarketsQuery>,
) -> ApiResult {
    let markets = state
        .engine
        .list_markets(query.category)
        .map_err(error_response)?;
    Ok(Json(json!({ "success": true, "markets": markets })))
}

pub async fn create_market(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMarketRequest>,
) -> ApiResult {
    let market = state
        .engine
        .create_market(payload)
        .map_err(error_response)?;
    state.log_activity(
        "📊",
        "MARKET_CREATED",
        &format!("{} | {}", market.id, market.question),
    );
    Ok(Json(json!({ "success": true, "market": market })))
}

pub async fn get_market(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult {
    let market = state.engine.market_view(&id).map_err(error_response)?;
    Ok(Json(json!({ "success": true, "market": market })))
}

// ===== TRADING & SETTLEMENT ENDPOINTS =====

pub async fn buy_contracts(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<BuyRequest>,
) -> ApiResult {
    let receipt = state.engine.buy(&id, payload).map_err(error_response)?;
    state.log_activity(
        "🎯",
        "TRADE",
        &format!(
            "{} bought {} {} on {} for {}",
            receipt.user_id, receipt.quantity, receipt.side, receipt.market_id, receipt.total_cost
        ),
    );
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

pub async fn resolve_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult {
    let market = state.engine.resolve(&id, payload).map_err(error_response)?;
    let winner = market
        .winning_side
        .map(|s| s.to_string())
        .unwrap_or_default();
    state.log_activity(
        "✅",
        "MARKET_RESOLVED",
        &format!("{} | {} wins", market.id, winner),
    );
    Ok(Json(json!({ "success": true, "market": market })))
}

pub async fn claim_winnings(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UserActionRequest>,
) -> ApiResult {
    let receipt = state
        .engine
        .claim(&id, &payload.user_id)
        .map_err(error_response)?;
    state.log_activity(
        "💰",
        "CLAIM",
        &format!(
            "{} collected {} on {}",
            receipt.user_id, receipt.payout, receipt.market_id
        ),
    );
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

// ===== COMMENT ENDPOINTS =====

pub async fn get_market_comments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> ApiResult {
    let comments = state
        .engine
        .comments_for_market(&id, query.viewer.as_deref())
        .map_err(error_response)?;
    Ok(Json(json!({ "success": true, "comments": comments })))
}

pub async fn post_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<PostCommentRequest>,
) -> ApiResult {
    let comment = state
        .engine
        .post_comment(&id, payload)
        .map_err(error_response)?;
    state.log_activity(
        "💬",
        "COMMENT",
        &format!("{} commented on {}", comment.author_id, comment.market_id),
    );
    Ok(Json(json!({ "success": true, "comment": comment })))
}

pub async fn toggle_like(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UserActionRequest>,
) -> ApiResult {
    let receipt = state
        .engine
        .toggle_like(&id, &payload.user_id)
        .map_err(error_response)?;
    state.log_activity(
        "❤️",
        if receipt.liked { "LIKE" } else { "UNLIKE" },
        &format!("{} on {}", payload.user_id, receipt.comment_id),
    );
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

pub async fn unlock_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UserActionRequest>,
) -> ApiResult {
    let receipt = state
        .engine
        .unlock_comment(&id, &payload.user_id)
        .map_err(error_response)?;
    state.log_activity(
        "🔓",
        "UNLOCK",
        &format!("{} unlocked {}", payload.user_id, receipt.comment_id),
    );
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

// ===== ACTIVITY & HEALTH =====

pub async fn get_activity(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "activity": state.recent_activity() }))
}

pub async fn health_check() -> &'static str {
    "STACKING Prediction Market Ledger - Online ✅"
}

// ===== ROUTER =====

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // ===== AUTHENTICATION =====
        .route("/auth/connect", post(connect))
        // ===== ACCOUNTS =====
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/profile", put(update_profile))
        .route("/accounts/:id/comments", get(get_account_comments))
        .route("/accounts/:id/positions", get(get_account_positions))
        // ===== MARKETS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/buy", post(buy_contracts))
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/markets/:id/claim", post(claim_winnings))
        .route(
            "/markets/:id/comments",
            get(get_market_comments).post(post_comment),
        )
        // ===== COMMENTS =====
        .route("/comments/:id/like", post(toggle_like))
        .route("/comments/:id/unlock", post(unlock_comment))
        // ===== ACTIVITY & HEALTH =====
        .route("/activity", get(get_activity))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // Apply CORS and state
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
