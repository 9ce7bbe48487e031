//! HTTP adapter (axum)

mod responses;

use axum::{extract::{Path, Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post, put}, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::dto::{
    AddStockRequest, CreateMerchantRequest, CreateOrderRequest, CreateProductRequest, CreateUserRequest, RechargeRequest, UpdatePriceRequest,
};
use crate::application::{
    AccountAction, AccountService, CatalogService, OrderService, ProductAction, RetryPolicy, SettlementReport, SettlementService,
    SettlementWindow,
};
use crate::domain::aggregates::{MerchantId, UserId};
use crate::domain::events::EventPublisher;
use crate::domain::repository::Repositories;
use crate::domain::value_objects::Currency;
use crate::EcommerceError;

pub use responses::{MerchantResponse, OrderItemResponse, OrderResponse, ProductResponse, UserResponse};

/// Application services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub settlement: Arc<SettlementService>,
}

impl AppState {
    pub fn new(repos: Repositories, publisher: Arc<dyn EventPublisher>, default_currency: Currency, retry: RetryPolicy) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(repos.users.clone(), repos.merchants.clone(), default_currency.clone())),
            catalog: Arc::new(CatalogService::new(repos.products.clone(), repos.merchants.clone(), publisher.clone(), default_currency)),
            settlement: Arc::new(SettlementService::new(repos.merchants.clone(), repos.orders.clone())),
            orders: Arc::new(OrderService::new(repos, publisher, retry)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-orders"})) }))
        .route("/api/v1/users", get(find_user).post(create_user))
        .route("/api/v1/users/:id", get(get_user))
        .route("/api/v1/users/:id/recharge", post(recharge_user))
        .route("/api/v1/users/:id/status", post(change_user_status))
        .route("/api/v1/merchants", get(find_merchant).post(create_merchant))
        .route("/api/v1/merchants/:id", get(get_merchant))
        .route("/api/v1/merchants/:id/status", post(change_merchant_status))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:sku", get(get_product))
        .route("/api/v1/products/:sku/stock", post(add_stock))
        .route("/api/v1/products/:sku/price", put(update_price))
        .route("/api/v1/products/:sku/status", post(change_product_status))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/:order_number", get(get_order))
        .route("/api/v1/settlements/:merchant_id", post(settle_merchant))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

/// Handler failure. Body: `{"error": kind, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Service(EcommerceError),
}

impl From<EcommerceError> for ApiError {
    fn from(err: EcommerceError) -> Self { Self::Service(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            Self::Service(err) => {
                let status = match &err {
                    EcommerceError::Validation(_) => StatusCode::BAD_REQUEST,
                    EcommerceError::StateConflict(_) => StatusCode::CONFLICT,
                    EcommerceError::Infrastructure(_) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
                    EcommerceError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() { tracing::error!(error = %err, "request failed"); }
                (status, err.kind().as_str(), err.to_string())
            }
        };
        (status, Json(serde_json::json!({"error": kind, "message": message}))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn found<T>(value: Option<T>, what: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::NotFound(format!("{what} not found")))
}

/// Body of the lifecycle endpoints, e.g. `{"action": "suspend"}`.
#[derive(Debug, Deserialize)] pub struct StatusChange<A> { pub action: A }

#[derive(Debug, Deserialize)] pub struct UserQuery { pub username: Option<String> }

async fn find_user(State(s): State<AppState>, Query(q): Query<UserQuery>) -> ApiResult<Json<UserResponse>> {
    let username = q.username.ok_or_else(|| EcommerceError::validation("username is required"))?;
    Ok(Json(found(s.accounts.get_user_by_username(&username).await?, "user")?.into()))
}

async fn create_user(State(s): State<AppState>, Json(r): Json<CreateUserRequest>) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    Ok((StatusCode::CREATED, Json(s.accounts.create_user(r).await?.into())))
}

async fn get_user(State(s): State<AppState>, Path(id): Path<UserId>) -> ApiResult<Json<UserResponse>> {
    Ok(Json(found(s.accounts.get_user(id).await?, "user")?.into()))
}

async fn recharge_user(State(s): State<AppState>, Path(id): Path<UserId>, Json(r): Json<RechargeRequest>) -> ApiResult<Json<UserResponse>> {
    Ok(Json(s.accounts.recharge_user(id, r).await?.into()))
}

async fn change_user_status(State(s): State<AppState>, Path(id): Path<UserId>, Json(r): Json<StatusChange<AccountAction>>) -> ApiResult<Json<UserResponse>> {
    Ok(Json(s.accounts.change_user_status(id, r.action).await?.into()))
}

#[derive(Debug, Deserialize)] pub struct MerchantQuery { pub email: Option<String> }

async fn find_merchant(State(s): State<AppState>, Query(q): Query<MerchantQuery>) -> ApiResult<Json<MerchantResponse>> {
    let email = q.email.ok_or_else(|| EcommerceError::validation("email is required"))?;
    Ok(Json(found(s.accounts.get_merchant_by_email(&email).await?, "merchant")?.into()))
}

async fn create_merchant(State(s): State<AppState>, Json(r): Json<CreateMerchantRequest>) -> ApiResult<(StatusCode, Json<MerchantResponse>)> {
    Ok((StatusCode::CREATED, Json(s.accounts.create_merchant(r).await?.into())))
}

async fn get_merchant(State(s): State<AppState>, Path(id): Path<MerchantId>) -> ApiResult<Json<MerchantResponse>> {
    Ok(Json(found(s.accounts.get_merchant(id).await?, "merchant")?.into()))
}

async fn change_merchant_status(
    State(s): State<AppState>,
    Path(id): Path<MerchantId>,
    Json(r): Json<StatusChange<AccountAction>>,
) -> ApiResult<Json<MerchantResponse>> {
    Ok(Json(s.accounts.change_merchant_status(id, r.action).await?.into()))
}

#[derive(Debug, Deserialize)] pub struct ProductQuery { pub merchant_id: Option<MerchantId> }

async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> ApiResult<Json<Vec<ProductResponse>>> {
    Ok(Json(s.catalog.list_products(q.merchant_id).await?.into_iter().map(Into::into).collect()))
}

async fn create_product(State(s): State<AppState>, Json(r): Json<CreateProductRequest>) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    Ok((StatusCode::CREATED, Json(s.catalog.create_product(r).await?.into())))
}

async fn get_product(State(s): State<AppState>, Path(sku): Path<String>) -> ApiResult<Json<ProductResponse>> {
    Ok(Json(found(s.catalog.get_product(&sku).await?, "product")?.into()))
}

async fn add_stock(State(s): State<AppState>, Path(sku): Path<String>, Json(r): Json<AddStockRequest>) -> ApiResult<Json<ProductResponse>> {
    Ok(Json(s.catalog.add_stock(&sku, r).await?.into()))
}

async fn update_price(State(s): State<AppState>, Path(sku): Path<String>, Json(r): Json<UpdatePriceRequest>) -> ApiResult<Json<ProductResponse>> {
    Ok(Json(s.catalog.update_price(&sku, r).await?.into()))
}

async fn change_product_status(
    State(s): State<AppState>,
    Path(sku): Path<String>,
    Json(r): Json<StatusChange<ProductAction>>,
) -> ApiResult<Json<ProductResponse>> {
    Ok(Json(s.catalog.change_status(&sku, r.action).await?.into()))
}

#[derive(Debug, Deserialize)] pub struct OrderQuery { pub user_id: Option<UserId>, pub merchant_id: Option<MerchantId> }

async fn list_orders(State(s): State<AppState>, Query(q): Query<OrderQuery>) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = match (q.user_id, q.merchant_id) {
        (Some(user_id), _) => s.orders.list_orders_by_user(user_id).await?,
        (None, Some(merchant_id)) => s.orders.list_orders_by_merchant(merchant_id).await?,
        (None, None) => return Err(EcommerceError::validation("user_id or merchant_id is required").into()),
    };
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

async fn create_order(State(s): State<AppState>, Json(r): Json<CreateOrderRequest>) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let order = s.orders.create_and_process_order(r).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

async fn get_order(State(s): State<AppState>, Path(order_number): Path<String>) -> ApiResult<Json<OrderResponse>> {
    let order = found(s.orders.get_order(&order_number).await?, "order")?;
    Ok(Json(OrderResponse::from(&order)))
}

#[derive(Debug, Deserialize)] pub struct SettlementRequest { pub start: DateTime<Utc>, pub end: DateTime<Utc> }

async fn settle_merchant(State(s): State<AppState>, Path(merchant_id): Path<MerchantId>, Json(r): Json<SettlementRequest>) -> ApiResult<Json<SettlementReport>> {
    let window = SettlementWindow::new(r.start, r.end)?;
    Ok(Json(s.settlement.settle_merchant(merchant_id, window).await?))
}
