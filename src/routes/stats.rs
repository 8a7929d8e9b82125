use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::db::models::TagField;
use crate::response::AppError;
use crate::services::stats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(word_stats))
        .route("/categories", get(categories))
        .route("/languages", get(languages))
        .route("/dictionaries", get(dictionaries))
}

async fn word_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let storage = state.storage();
    let stats = stats::load(storage.as_ref(), Utc::now()).await?;
    Ok(Json(stats))
}

async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tag_values(&state, TagField::Category).await
}

async fn languages(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tag_values(&state, TagField::Language).await
}

async fn dictionaries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    tag_values(&state, TagField::Dictionary).await
}

async fn tag_values(state: &AppState, field: TagField) -> Result<Json<Vec<String>>, AppError> {
    let values = state.storage().distinct_values(field).await?;
    Ok(Json(values))
}
