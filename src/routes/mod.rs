mod health;
mod payload;
mod quiz;
mod stats;
mod words;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub use quiz::{DEFAULT_QUIZ_SIZE, MAX_QUIZ_SIZE};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/words", words::router())
        .nest("/quiz", quiz::router())
        .merge(stats::router());

    Router::new()
        .nest("/api", api)
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Path ids are positive integers; anything else names no record.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
