//! Web server for the snipe watcher UI
//!
//! Serves the single-page UI, the JSON API it talks to, and the check trigger
//! called by cron (or the in-process interval timer).

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use mtg_common::{ScryfallCard, ScryfallClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, MarketplaceError, ReconcileError};
use crate::marketplace::{Marketplace, TokenCache};
use crate::models::{CheckSummary, NewWatchItem, Subscription, SubscriptionRequest, WatchItem};
use crate::push::PushSender;
use crate::reconcile::{run_check, ReconcileOptions};
use crate::snipes::{annotate, find_snipes, AnnotatedListing, DEFAULT_MIN_DISCOUNT};
use crate::store::StateStore;
use crate::watchlist;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub marketplace: Arc<dyn Marketplace>,
    pub push: Arc<dyn PushSender>,
    pub catalog: Arc<ScryfallClient>,
    /// Held for the whole of a pass and for every watchlist/subscription
    /// write, so passes never overlap each other or a mutation.
    pub token_cache: Arc<Mutex<TokenCache>>,
    pub cron_secret: Option<String>,
    pub vapid_public_key: Option<String>,
    pub options: ReconcileOptions,
}

impl AppState {
    /// Run one serialized check against the persisted state
    pub async fn check(&self) -> Result<CheckSummary, ReconcileError> {
        let mut cache = self.token_cache.lock().await;
        run_check(
            self.store.as_ref(),
            self.marketplace.as_ref(),
            self.push.as_ref(),
            &mut cache,
            &self.options,
        )
        .await
    }
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Error response in the same envelope
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        let err = err.into();
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Catalog(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Error::Catalog(_) | Error::Marketplace(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize)]
struct CardQuery {
    q: String,
}

#[derive(Deserialize)]
struct PrintingsQuery {
    name: String,
}

#[derive(Deserialize)]
struct ListingsQuery {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
    /// Catalog price to compare against; looked up by name when absent
    reference: Option<f64>,
    #[serde(default = "default_min_discount")]
    min_discount: f64,
    /// Only listings at least `min_discount` under the reference
    #[serde(default)]
    snipes: bool,
}

fn default_limit() -> usize {
    15
}

fn default_min_discount() -> f64 {
    DEFAULT_MIN_DISCOUNT
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingsData {
    reference: Option<f64>,
    listings: Vec<AnnotatedListing>,
}

#[derive(Deserialize)]
struct Unsubscribe {
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKey {
    public_key: String,
}

#[derive(Deserialize)]
struct TriggerQuery {
    key: Option<String>,
}

/// GET / - Serve the web UI (single HTML page)
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// GET /sw.js - Service worker that displays pushed alerts
async fn service_worker_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("../static/sw.js"),
    )
}

/// GET /api/cards/search?q={query}
async fn card_search_handler(
    State(state): State<AppState>,
    Query(params): Query<CardQuery>,
) -> ApiResult<Vec<ScryfallCard>> {
    Ok(ApiResponse::ok(state.catalog.search(&params.q).await?))
}

/// GET /api/cards/autocomplete?q={prefix}
async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<CardQuery>,
) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(state.catalog.autocomplete(&params.q).await?))
}

/// GET /api/cards/printings?name={exact name}
async fn printings_handler(
    State(state): State<AppState>,
    Query(params): Query<PrintingsQuery>,
) -> ApiResult<Vec<ScryfallCard>> {
    Ok(ApiResponse::ok(state.catalog.printings(&params.name).await?))
}

/// GET /api/listings?q={query}&limit={n}&reference={price}&snipes={bool}
async fn listings_handler(
    State(state): State<AppState>,
    Query(params): Query<ListingsQuery>,
) -> ApiResult<ListingsData> {
    let reference = match params.reference {
        Some(price) => Some(price),
        None => match state.catalog.named(&params.q).await {
            Ok(card) => card.reference_price(),
            Err(e) => {
                log::debug!("No reference price for {}: {}", params.q, e);
                None
            }
        },
    };

    let listings = {
        let mut cache = state.token_cache.lock().await;
        let token = state.marketplace.authenticate(&mut cache).await?;
        let result = state.marketplace.search(&token, &params.q, params.limit).await;
        if matches!(result, Err(MarketplaceError::Auth(_))) {
            cache.clear();
        }
        result?
    };

    let listings = match (params.snipes, reference) {
        (true, Some(reference)) => find_snipes(&listings, reference, params.min_discount),
        (true, None) => Vec::new(),
        (false, _) => annotate(listings, reference, params.min_discount),
    };

    Ok(ApiResponse::ok(ListingsData { reference, listings }))
}

/// GET /api/watchlist
async fn list_watchlist_handler(State(state): State<AppState>) -> ApiResult<Vec<WatchItem>> {
    Ok(ApiResponse::ok(watchlist::list_watch_items(state.store.as_ref())?))
}

/// POST /api/watchlist
async fn create_watch_item_handler(
    State(state): State<AppState>,
    Json(request): Json<NewWatchItem>,
) -> ApiResult<WatchItem> {
    let _guard = state.token_cache.lock().await;
    let item = watchlist::add_watch_item(state.store.as_ref(), request, Utc::now())?;
    Ok(ApiResponse::ok(item))
}

/// DELETE /api/watchlist/{id}
async fn delete_watch_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let _guard = state.token_cache.lock().await;
    if watchlist::remove_watch_item(state.store.as_ref(), &id)? {
        Ok(ApiResponse::ok(id))
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("watch item {} not found", id),
        ))
    }
}

/// POST /api/subscriptions
async fn subscribe_handler(
    State(state): State<AppState>,
    Json(request): Json<SubscriptionRequest>,
) -> ApiResult<Subscription> {
    let _guard = state.token_cache.lock().await;
    let subscription = watchlist::upsert_subscription(state.store.as_ref(), request, Utc::now())?;
    Ok(ApiResponse::ok(subscription))
}

/// DELETE /api/subscriptions
async fn unsubscribe_handler(
    State(state): State<AppState>,
    Json(request): Json<Unsubscribe>,
) -> ApiResult<bool> {
    let _guard = state.token_cache.lock().await;
    if watchlist::remove_subscription(state.store.as_ref(), &request.endpoint)? {
        Ok(ApiResponse::ok(true))
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "subscription not found"))
    }
}

/// GET /api/push/public-key
async fn public_key_handler(State(state): State<AppState>) -> ApiResult<PublicKey> {
    match &state.vapid_public_key {
        Some(key) => Ok(ApiResponse::ok(PublicKey {
            public_key: key.clone(),
        })),
        None => Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "push notifications are not configured",
        )),
    }
}

/// Secret from `?key=` or `Authorization: Bearer <secret>`
fn presented_secret<'a>(query: &'a TriggerQuery, headers: &'a HeaderMap) -> Option<&'a str> {
    query.key.as_deref().or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
    })
}

/// Byte comparison that does not stop at the first mismatch
fn secrets_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// GET|POST /api/check - run one reconciliation pass
async fn check_handler(
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
    headers: HeaderMap,
) -> Response {
    let authorized = match (&state.cron_secret, presented_secret(&query, &headers)) {
        (Some(expected), Some(presented)) => secrets_match(expected, presented),
        (None, _) => {
            log::warn!("Check trigger refused: no cron secret configured");
            false
        }
        _ => false,
    };
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    match state.check().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            log::error!("Check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Build the web server router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(index_handler))
        .route("/sw.js", get(service_worker_handler))
        .route("/api/cards/search", get(card_search_handler))
        .route("/api/cards/autocomplete", get(autocomplete_handler))
        .route("/api/cards/printings", get(printings_handler))
        .route("/api/listings", get(listings_handler))
        .route(
            "/api/watchlist",
            get(list_watchlist_handler).post(create_watch_item_handler),
        )
        .route("/api/watchlist/{id}", delete(delete_watch_item_handler))
        .route(
            "/api/subscriptions",
            delete(unsubscribe_handler).post(subscribe_handler),
        )
        .route("/api/push/public-key", get(public_key_handler))
        .route("/api/check", get(check_handler).post(check_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the web server
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
/// Stops accepting connections on Ctrl-C.
pub async fn serve(state: AppState, port: u16) -> crate::Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Web UI listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down web server");
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
