pub mod config;
pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::config::{DbConfig, StorageBackend};
use crate::db::memory::MemoryStore;
use crate::db::models::{
    NewQuizAnswer, NewQuizSession, NewWord, QuizAnswer, QuizSession, TagField, Word, WordFilter,
    WordPatch,
};
use crate::db::sqlite::SqliteStore;

/// Repository over words, quiz sessions and quiz answers.
///
/// Built once at startup and shared by every request handler through
/// [`crate::state::AppState`].
#[async_trait]
pub trait Storage: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Words matching every field of `filter`, newest first.
    async fn list_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError>;

    async fn get_word(&self, id: i64) -> Result<Option<Word>, StoreError>;

    async fn create_word(&self, input: NewWord) -> Result<Word, StoreError>;

    /// Fails with [`StoreError::NotFound`] when `id` is unknown.
    async fn update_word(&self, id: i64, patch: WordPatch) -> Result<Word, StoreError>;

    /// Returns whether the word existed. Answers recorded for it go too.
    async fn delete_word(&self, id: i64) -> Result<bool, StoreError>;

    /// Bumps the review counter, and the correct counter when `correct`.
    /// Unknown ids are ignored.
    async fn record_outcome(&self, id: i64, correct: bool) -> Result<(), StoreError>;

    /// Up to `count` uniformly sampled words matching `filter`.
    async fn random_words(&self, count: usize, filter: &WordFilter)
        -> Result<Vec<Word>, StoreError>;

    async fn word_count(&self) -> Result<i64, StoreError>;

    /// Sorted distinct values of one tag column.
    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, StoreError>;

    async fn create_session(&self, input: NewQuizSession) -> Result<QuizSession, StoreError>;

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, StoreError>;

    /// Sessions completed at or after `since`, oldest first.
    async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<QuizSession>, StoreError>;

    async fn insert_answer(&self, input: NewQuizAnswer) -> Result<QuizAnswer, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("IO error: {0}")]
    Io(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn word_not_found(id: i64) -> Self {
        Self::NotFound { entity: "word", id }
    }

    pub fn session_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "quiz session",
            id,
        }
    }
}

pub async fn open_storage(config: &DbConfig) -> Result<Arc<dyn Storage>, StoreError> {
    match &config.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite { url } => {
            let store = SqliteStore::connect(url, config).await?;
            tracing::info!(%url, "using sqlite storage");
            Ok(Arc::new(store))
        }
    }
}
