use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::domain::{BulkItemsRequest, Item};
use super::repository::{ItemRepository, RepositoryError};
use super::service::{ItemLedgerService, ItemServiceError};

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    limit: Option<usize>,
}

/// Router builder exposing the items API, with CORS answered for `allowed_origin`.
pub fn items_router<R>(service: Arc<ItemLedgerService<R>>, allowed_origin: &str) -> Router
where
    R: ItemRepository + 'static,
{
    with_cors(item_routes(service), allowed_origin)
}

/// The items API without CORS, for callers that add their own routes before [`with_cors`].
pub fn item_routes<R>(service: Arc<ItemLedgerService<R>>) -> Router
where
    R: ItemRepository + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/items/bulk", post(bulk_handler::<R>))
        .route("/api/items/preview", post(preview_handler::<R>))
        .route(
            "/api/items",
            get(list_handler::<R>).delete(delete_all_handler::<R>),
        )
        .route(
            "/api/items/:id",
            get(fetch_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route("/api/stats", get(stats_handler::<R>))
        .with_state(service)
}

/// Adds a JSON 404 fallback and wraps every route, fallback included, in the CORS middleware.
/// Must be the last step of router assembly: routes added afterwards are not covered.
pub fn with_cors(router: Router, allowed_origin: &str) -> Router {
    let origin = HeaderValue::from_str(allowed_origin).unwrap_or_else(|_| {
        warn!(allowed_origin, "origin is not a valid header value, allowing any origin");
        HeaderValue::from_static("*")
    });

    router
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(origin, cors))
}

async fn cors(State(origin): State<HeaderValue>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    apply_cors_headers(response.headers_mut(), origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

pub(crate) async fn bulk_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Json(request): Json<BulkItemsRequest>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.bulk_save(request.items) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn preview_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Json(request): Json<BulkItemsRequest>,
) -> Response
where
    R: ItemRepository + 'static,
{
    (StatusCode::OK, Json(service.preview(request.items))).into_response()
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Query(params): Query<ListParams>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.list(params.limit) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn fetch_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.fetch(id) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Path(id): Path<i64>,
    Json(item): Json<Item>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.update(id, item) {
        Ok((item, merged)) => {
            (StatusCode::OK, Json(json!({ "item": item, "merged": merged }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
    Path(id): Path<i64>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.delete(id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "deleted": id }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_all_handler<R>(
    State(service): State<Arc<ItemLedgerService<R>>>,
) -> Response
where
    R: ItemRepository + 'static,
{
    match service.delete_all() {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "all items deleted" }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<R>(State(service): State<Arc<ItemLedgerService<R>>>) -> Response
where
    R: ItemRepository + 'static,
{
    match service.global_stats() {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ItemServiceError) -> Response {
    let status = match &err {
        ItemServiceError::EmptyBatch
        | ItemServiceError::Rejected { .. }
        | ItemServiceError::Invalid(_)
        | ItemServiceError::Repository(RepositoryError::QuantityOverflow) => {
            StatusCode::BAD_REQUEST
        }
        ItemServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ItemServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %err, "item repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
