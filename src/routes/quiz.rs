use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::db::models::{Word, WordFilter};
use crate::response::{AppError, FieldError};
use crate::routes::{parse_id, payload};
use crate::services::quiz;
use crate::state::AppState;

pub const DEFAULT_QUIZ_SIZE: usize = 10;
pub const MAX_QUIZ_SIZE: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/words", get(quiz_words))
        .route("/questions", get(quiz_questions))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/answers", post(create_answer))
}

#[derive(Debug, Default, Deserialize)]
struct QuizQuery {
    count: Option<String>,
    category: Option<String>,
    language: Option<String>,
}

impl QuizQuery {
    fn count(&self) -> Result<usize, AppError> {
        parse_count(self.count.as_deref())
    }

    fn filter(&self) -> WordFilter {
        WordFilter {
            category: self.category.clone(),
            language: self.language.clone(),
            ..WordFilter::default()
        }
        .normalized()
    }
}

/// Missing or blank means the default size; larger requests are capped.
fn parse_count(raw: Option<&str>) -> Result<usize, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_QUIZ_SIZE),
        Some(raw) => raw,
    };
    raw.parse::<usize>()
        .map(|count| count.min(MAX_QUIZ_SIZE))
        .map_err(|_| {
            AppError::validation(
                "Invalid quiz parameters",
                vec![FieldError::new("count", "Expected non-negative integer")],
            )
        })
}

async fn sample_words(state: &AppState, query: &QuizQuery) -> Result<Vec<Word>, AppError> {
    let count = query.count()?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let words = state
        .storage()
        .random_words(count, &query.filter())
        .await?;
    Ok(words)
}

async fn quiz_words(
    State(state): State<AppState>,
    query: Result<Query<QuizQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let words = sample_words(&state, &query).await?;
    Ok(Json(words))
}

async fn quiz_questions(
    State(state): State<AppState>,
    query: Result<Query<QuizQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let count = query.count()?;
    if count == 0 {
        return Ok(Json(Vec::<quiz::QuizQuestion>::new()));
    }

    // Decoys come from every matching word, not just the questioned ones.
    let mut pool = state.storage().list_words(&query.filter()).await?;
    let questions = {
        let mut rng = rand::rng();
        pool.shuffle(&mut rng);
        quiz::generate_questions(&pool, count, &mut rng)
    };
    Ok(Json(questions))
}

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let input = payload::new_session(&body)?;
    let session = state.storage().create_session(input).await?;
    tracing::info!(
        session_id = session.id,
        total = session.total_questions,
        correct = session.correct_answers,
        "quiz session recorded"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let not_found = || AppError::not_found(format!("Quiz session {raw_id} not found"));
    let id = parse_id(&raw_id).ok_or_else(not_found)?;
    let session = state
        .storage()
        .get_session(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(session))
}

async fn create_answer(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let input = payload::new_answer(&body)?;
    let storage = state.storage();
    let answer = quiz::record_answer(storage.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}
