use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use server_api::{create_review, delete_review, update_review};
use shared::{
    domain::ItemWithReview,
    error::{ApiError, ErrorCode},
    protocol::{Envelope, ReviewPayload},
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::app_state::AppState;

type Rejection = (StatusCode, Json<ApiError>);

pub(crate) fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/books/:book_id/review", post(http_create_review))
        .route(
            "/books/:book_id/review/:review_id",
            put(http_update_review).delete(http_delete_review),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::InvalidReference
        | ErrorCode::EmptyBody
        | ErrorCode::MissingField
        | ErrorCode::Validation
        | ErrorCode::UnsupportedField => StatusCode::BAD_REQUEST,
    }
}

fn reject(err: ApiError) -> Rejection {
    (status_for(err.code), Json(err))
}

/// Unreadable JSON is a validation error. Size and content-type failures keep their own status.
fn malformed_body(rejection: JsonRejection) -> Rejection {
    let status = match &rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            StatusCode::BAD_REQUEST
        }
        other => other.status(),
    };
    (
        status,
        Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
    )
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, Rejection> {
    state
        .storage
        .health_check()
        .await
        .map_err(|e| reject(ApiError::new(ErrorCode::StoreFailure, e.to_string())))?;
    Ok("ok")
}

async fn http_create_review(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Json<Envelope<ItemWithReview>>, Rejection> {
    let Json(payload) = body.map_err(malformed_body)?;
    let created = create_review(&state.api, &book_id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(Envelope::success("Success", created)))
}

async fn http_update_review(
    State(state): State<Arc<AppState>>,
    Path((book_id, review_id)): Path<(String, String)>,
    body: Result<Json<ReviewPayload>, JsonRejection>,
) -> Result<Json<Envelope<ItemWithReview>>, Rejection> {
    let Json(payload) = body.map_err(malformed_body)?;
    let updated = update_review(&state.api, &book_id, &review_id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(Envelope::success("Success", updated)))
}

async fn http_delete_review(
    State(state): State<Arc<AppState>>,
    Path((book_id, review_id)): Path<(String, String)>,
) -> Result<Json<Envelope<()>>, Rejection> {
    delete_review(&state.api, &book_id, &review_id)
        .await
        .map_err(reject)?;
    Ok(Json(Envelope::acknowledged("Review deleted")))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
