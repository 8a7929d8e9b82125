use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::WordFilter;
use crate::response::AppError;
use crate::routes::{parse_id, payload};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words).post(create_word))
        .route(
            "/:id",
            get(get_word).put(update_word).delete(delete_word),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListWordsQuery {
    category: Option<String>,
    language: Option<String>,
    dictionary: Option<String>,
    search: Option<String>,
}

impl From<ListWordsQuery> for WordFilter {
    fn from(query: ListWordsQuery) -> Self {
        WordFilter {
            category: query.category,
            language: query.language,
            dictionary: query.dictionary,
            search: query.search,
        }
        .normalized()
    }
}

async fn list_words(
    State(state): State<AppState>,
    query: Result<Query<ListWordsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let filter = WordFilter::from(query);
    let words = state.storage().list_words(&filter).await?;
    Ok(Json(words))
}

async fn get_word(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id).ok_or_else(|| word_not_found(&raw_id))?;
    let word = state
        .storage()
        .get_word(id)
        .await?
        .ok_or_else(|| word_not_found(&raw_id))?;
    Ok(Json(word))
}

async fn create_word(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let input = payload::new_word(&body)?;
    let word = state.storage().create_word(input).await?;
    tracing::info!(word_id = word.id, language = %word.language, "word created");
    Ok((StatusCode::CREATED, Json(word)))
}

async fn update_word(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id).ok_or_else(|| word_not_found(&raw_id))?;
    let patch = payload::word_patch(&body)?;
    let word = state.storage().update_word(id, patch).await?;
    Ok(Json(word))
}

async fn delete_word(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id).ok_or_else(|| word_not_found(&raw_id))?;
    if !state.storage().delete_word(id).await? {
        return Err(word_not_found(&raw_id));
    }
    tracing::info!(word_id = id, "word deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn word_not_found(raw_id: &str) -> AppError {
    AppError::not_found(format!("Word {raw_id} not found"))
}
