//! API Routes
//!
//! HTTP endpoint definitions. Handlers stay thin: decode the request,
//! call the engine, encode the result. Account routes sit behind the
//! bearer-token middleware; registration and the token endpoints are
//! open.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AccessTokenSigner, AuthenticationService, TokenPair};
use crate::domain::{Account, AccountPage, AccountQuery, ConvertedBalances, SortKey, TransferDetails};
use crate::error::AppError;
use crate::ledger::LedgerEngine;

use super::middleware::{auth_middleware, CurrentUser};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerEngine,
    pub auth: AuthenticationService,
    pub signer: AccessTokenSigner,
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Amount as a string for precise decimal handling
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub desc: bool,
    #[serde(default = "default_page_number")]
    pub page_number: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_number() -> u32 {
    1
}

fn default_page_size() -> u32 {
    crate::domain::query::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    /// Comma-separated currency codes; empty means all supported
    #[serde(default)]
    pub currencies: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub name: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub name: String,
    pub refresh_token: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let accounts = Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/deposits", post(deposit))
        .route("/accounts/:id/withdrawals", post(withdraw))
        .route("/accounts/transfers", post(transfer))
        .route("/accounts/:id/balances", get(convert_balances))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let open = Router::new()
        .route("/users", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/revoke", post(revoke));

    Router::new().merge(accounts).merge(open).with_state(state)
}

fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
    raw.parse()
        .map_err(|_| AppError::InvalidRequest(format!("Invalid amount: {raw}")))
}

// =========================================================================
// Account handlers
// =========================================================================

/// Create a new account
async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let account = state.ledger.create(&request.name).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Get account by ID
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    let account = state.ledger.get(id).await?;
    Ok(Json(account))
}

/// List accounts with filtering, sorting and pagination
async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<ListAccountsQuery>,
) -> Result<Json<AccountPage>, AppError> {
    let mut query = AccountQuery::new()
        .sorted_by(SortKey::parse(params.sort_by.as_deref().unwrap_or_default()))
        .descending(params.desc)
        .page(params.page_number, params.page_size);
    query.name = params.name;

    let page = state.ledger.list(query).await?;
    Ok(Json(page))
}

/// Deposit funds into an account
async fn deposit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<Account>, AppError> {
    let amount = parse_amount(&request.amount)?;
    let account = state.ledger.deposit(id, amount).await?;
    Ok(Json(account))
}

/// Withdraw funds from an account
async fn withdraw(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<Account>, AppError> {
    let amount = parse_amount(&request.amount)?;
    let account = state.ledger.withdraw(id, amount).await?;
    Ok(Json(account))
}

/// Transfer funds between two accounts
async fn transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferDetails>, AppError> {
    let amount = parse_amount(&request.amount)?;

    tracing::debug!(
        caller = %caller.name,
        sender = %request.sender_id,
        recipient = %request.recipient_id,
        "Transfer requested"
    );

    let details = state
        .ledger
        .transfer(request.sender_id, request.recipient_id, amount)
        .await?;
    Ok(Json(details))
}

/// Express an account's balance in foreign currencies
async fn convert_balances(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ConvertQuery>,
) -> Result<Json<ConvertedBalances>, AppError> {
    let currencies: Vec<String> = params
        .currencies
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let converted = state.ledger.convert_balances(id, &currencies).await?;
    Ok(Json(converted))
}

// =========================================================================
// Authentication handlers
// =========================================================================

/// Register a new user
async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.auth.register(&request.name, &request.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            name: user.name,
        }),
    ))
}

/// Log in with name and password
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.auth.login(&request.name, &request.password).await?;
    Ok(Json(pair))
}

/// Redeem a refresh token for a fresh pair
async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state
        .auth
        .refresh(&request.name, &request.refresh_token)
        .await?;
    Ok(Json(pair))
}

/// Revoke the user's current refresh token
async fn revoke(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    state
        .auth
        .revoke(&request.name, &request.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
