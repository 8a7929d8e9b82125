use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::db::config::DbConfig;
use crate::db::models::{
    NewQuizAnswer, NewQuizSession, NewWord, QuizAnswer, QuizSession, TagField, Word, WordFilter,
    WordPatch,
};
use crate::db::schema::{schema_statements, SCHEMA_VERSION};
use crate::db::{Storage, StoreError};

const SELECT_WORDS: &str = r#"
    SELECT "id", "word", "translation", "category", "dictionary", "language",
           "added_at", "review_count", "correct_count"
    FROM "words"
    ORDER BY "added_at" DESC, "id" DESC"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, config: &DbConfig) -> Result<Self, StoreError> {
        let in_memory = is_memory_url(url);

        if let Some(path) = database_file(url) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each connection to `:memory:` opens its own database, so the pool is
        // pinned to a single connection that never expires.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", &DbConfig::memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn database_file(url: &str) -> Option<PathBuf> {
    if is_memory_url(url) {
        return None;
    }
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or("");
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten();

    if version.is_some() {
        return Ok(());
    }

    for stmt in schema_statements() {
        sqlx::query(&stmt).execute(pool).await?;
    }

    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    tracing::info!(version = SCHEMA_VERSION, "sqlite schema applied");
    Ok(())
}

impl SqliteStore {
    /// Every word matching `filter`, newest first. SQLite's `LOWER` and
    /// `LIKE` fold ASCII letters only, so matching happens here.
    async fn matching_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        let filter = filter.normalized();
        let words = sqlx::query_as::<_, Word>(SELECT_WORDS)
            .fetch_all(&self.pool)
            .await?;
        Ok(words.into_iter().filter(|word| filter.matches(word)).collect())
    }
}

#[async_trait]
impl Storage for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        self.matching_words(filter).await
    }

    async fn get_word(&self, id: i64) -> Result<Option<Word>, StoreError> {
        let word = sqlx::query_as::<_, Word>(
            r#"
            SELECT "id", "word", "translation", "category", "dictionary", "language",
                   "added_at", "review_count", "correct_count"
            FROM "words" WHERE "id" = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(word)
    }

    async fn create_word(&self, input: NewWord) -> Result<Word, StoreError> {
        let word = sqlx::query_as::<_, Word>(
            r#"
            INSERT INTO "words" (
                "word", "translation", "category", "dictionary", "language",
                "added_at", "review_count", "correct_count"
            ) VALUES (?, ?, ?, ?, ?, ?, 0, 0)
            RETURNING "id", "word", "translation", "category", "dictionary", "language",
                      "added_at", "review_count", "correct_count"
            "#,
        )
        .bind(input.word)
        .bind(input.translation)
        .bind(input.category)
        .bind(input.dictionary)
        .bind(input.language)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(word)
    }

    async fn update_word(&self, id: i64, patch: WordPatch) -> Result<Word, StoreError> {
        let word = sqlx::query_as::<_, Word>(
            r#"
            UPDATE "words" SET
                "word" = COALESCE(?, "word"),
                "translation" = COALESCE(?, "translation"),
                "category" = COALESCE(?, "category"),
                "dictionary" = COALESCE(?, "dictionary"),
                "language" = COALESCE(?, "language")
            WHERE "id" = ?
            RETURNING "id", "word", "translation", "category", "dictionary", "language",
                      "added_at", "review_count", "correct_count"
            "#,
        )
        .bind(patch.word)
        .bind(patch.translation)
        .bind(patch.category)
        .bind(patch.dictionary)
        .bind(patch.language)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        word.ok_or_else(|| StoreError::word_not_found(id))
    }

    async fn delete_word(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"DELETE FROM "quiz_answers" WHERE "word_id" = ?"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(r#"DELETE FROM "words" WHERE "id" = ?"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_outcome(&self, id: i64, correct: bool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE "words"
            SET "review_count" = "review_count" + 1,
                "correct_count" = "correct_count" + ?
            WHERE "id" = ?
            "#,
        )
        .bind(i64::from(correct))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn random_words(
        &self,
        count: usize,
        filter: &WordFilter,
    ) -> Result<Vec<Word>, StoreError> {
        let mut pool = self.matching_words(filter).await?;
        pool.shuffle(&mut rand::rng());
        pool.truncate(count);
        Ok(pool)
    }

    async fn word_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "words""#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, StoreError> {
        let column = field.column();
        let sql = format!(r#"SELECT DISTINCT "{column}" FROM "words" ORDER BY "{column}" ASC"#);
        let values: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(values)
    }

    async fn create_session(&self, input: NewQuizSession) -> Result<QuizSession, StoreError> {
        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            INSERT INTO "quiz_sessions" (
                "total_questions", "correct_answers", "completed_at", "language", "category"
            ) VALUES (?, ?, ?, ?, ?)
            RETURNING "id", "total_questions", "correct_answers", "language", "category",
                      "completed_at"
            "#,
        )
        .bind(input.total_questions)
        .bind(input.correct_answers)
        .bind(Utc::now())
        .bind(input.language)
        .bind(input.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, StoreError> {
        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            SELECT "id", "total_questions", "correct_answers", "language", "category",
                   "completed_at"
            FROM "quiz_sessions" WHERE "id" = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<QuizSession>, StoreError> {
        let sessions = sqlx::query_as::<_, QuizSession>(
            r#"
            SELECT "id", "total_questions", "correct_answers", "language", "category",
                   "completed_at"
            FROM "quiz_sessions"
            WHERE "completed_at" >= ?
            ORDER BY "completed_at" ASC, "id" ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn insert_answer(&self, input: NewQuizAnswer) -> Result<QuizAnswer, StoreError> {
        let session_exists: Option<i64> =
            sqlx::query_scalar(r#"SELECT "id" FROM "quiz_sessions" WHERE "id" = ?"#)
                .bind(input.session_id)
                .fetch_optional(&self.pool)
                .await?;
        if session_exists.is_none() {
            return Err(StoreError::session_not_found(input.session_id));
        }

        let word_exists: Option<i64> = sqlx::query_scalar(r#"SELECT "id" FROM "words" WHERE "id" = ?"#)
            .bind(input.word_id)
            .fetch_optional(&self.pool)
            .await?;
        if word_exists.is_none() {
            return Err(StoreError::word_not_found(input.word_id));
        }

        let answer = sqlx::query_as::<_, QuizAnswer>(
            r#"
            INSERT INTO "quiz_answers" ("session_id", "word_id", "is_correct", "answered_at")
            VALUES (?, ?, ?, ?)
            RETURNING "id", "session_id", "word_id", "is_correct", "answered_at"
            "#,
        )
        .bind(input.session_id)
        .bind(input.word_id)
        .bind(input.is_correct)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_word(word: &str, translation: &str, language: &str) -> NewWord {
        NewWord {
            word: word.to_string(),
            translation: translation.to_string(),
            category: "Food".to_string(),
            dictionary: "Collins".to_string(),
            language: language.to_string(),
        }
    }

    #[test]
    fn file_path_is_extracted_from_url() {
        assert_eq!(
            database_file("sqlite:./data/words.db?mode=rwc"),
            Some(PathBuf::from("./data/words.db"))
        );
        assert_eq!(database_file("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        run_migrations(store.pool()).await.unwrap();
        let version: String = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn create_and_fetch_word() {
        let store = SqliteStore::in_memory().await.unwrap();
        let created = store
            .create_word(new_word("Fromage", "Cheese", "French"))
            .await
            .unwrap();
        assert_eq!(created.review_count, 0);
        assert_eq!(created.correct_count, 0);

        let fetched = store.get_word(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.word, "Fromage");
        assert_eq!(fetched.added_at.timestamp_millis(), created.added_at.timestamp_millis());
        assert!(store.get_word(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_combine_and_ignore_case() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_word(new_word("Pain", "Bread", "french")).await.unwrap();
        store.create_word(new_word("Pan", "Bread", "Spanish")).await.unwrap();
        store.create_word(new_word("Eau", "Water", "French")).await.unwrap();

        let french = store
            .list_words(&WordFilter {
                language: Some("FRENCH".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(french.len(), 2);
        assert_eq!(french[0].word, "Eau");

        let bread_in_french = store
            .list_words(&WordFilter {
                language: Some("French".to_string()),
                search: Some("BREAD".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bread_in_french.len(), 1);
        assert_eq!(bread_in_french[0].word, "Pain");

        let literal_percent = store
            .list_words(&WordFilter {
                search: Some("%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(literal_percent.is_empty());
    }

    #[tokio::test]
    async fn accented_filters_ignore_case() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .create_word(new_word("Légume", "Vegetable", "Français"))
            .await
            .unwrap();
        store.create_word(new_word("Pan", "Bread", "Español")).await.unwrap();

        let by_search = store
            .list_words(&WordFilter {
                search: Some("LÉGUME".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].word, "Légume");

        let by_language = WordFilter {
            language: Some("FRANÇAIS".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list_words(&by_language).await.unwrap().len(), 1);

        let sampled = store.random_words(5, &by_language).await.unwrap();
        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].language, "Français");
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = SqliteStore::in_memory().await.unwrap();
        let word = store.create_word(new_word("Viande", "Meat", "French")).await.unwrap();
        store.record_outcome(word.id, true).await.unwrap();

        let updated = store
            .update_word(
                word.id,
                WordPatch {
                    category: Some("Groceries".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category, "Groceries");
        assert_eq!(updated.translation, "Meat");
        assert_eq!(updated.review_count, 1);

        let err = store.update_word(999, WordPatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn outcome_counters_increment_atomically() {
        let store = SqliteStore::in_memory().await.unwrap();
        let word = store.create_word(new_word("Noir", "Black", "French")).await.unwrap();
        store.record_outcome(word.id, true).await.unwrap();
        store.record_outcome(word.id, false).await.unwrap();
        store.record_outcome(word.id, true).await.unwrap();
        store.record_outcome(12345, true).await.unwrap();

        let word = store.get_word(word.id).await.unwrap().unwrap();
        assert_eq!(word.review_count, 3);
        assert_eq!(word.correct_count, 2);
    }

    #[tokio::test]
    async fn delete_cascades_to_answers() {
        let store = SqliteStore::in_memory().await.unwrap();
        let word = store.create_word(new_word("Jaune", "Yellow", "French")).await.unwrap();
        let session = store
            .create_session(NewQuizSession {
                total_questions: 1,
                correct_answers: 0,
                language: None,
                category: None,
            })
            .await
            .unwrap();
        store
            .insert_answer(NewQuizAnswer {
                session_id: session.id,
                word_id: word.id,
                is_correct: false,
            })
            .await
            .unwrap();

        assert!(store.delete_word(word.id).await.unwrap());
        assert!(!store.delete_word(word.id).await.unwrap());

        let remaining: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "quiz_answers""#)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn distinct_and_random_words() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_word(new_word("Hola", "Hello", "Spanish")).await.unwrap();
        store.create_word(new_word("Merci", "Thanks", "French")).await.unwrap();
        store.create_word(new_word("Gato", "Cat", "Spanish")).await.unwrap();

        let languages = store.distinct_values(TagField::Language).await.unwrap();
        assert_eq!(languages, vec!["French".to_string(), "Spanish".to_string()]);

        let spanish = store
            .random_words(
                5,
                &WordFilter {
                    language: Some("spanish".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(spanish.len(), 2);
        assert_eq!(store.random_words(1, &WordFilter::default()).await.unwrap().len(), 1);
        assert_eq!(store.word_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sessions_since_filters_by_completion_time() {
        let store = SqliteStore::in_memory().await.unwrap();
        let before = Utc::now() - chrono::Duration::seconds(1);
        let session = store
            .create_session(NewQuizSession {
                total_questions: 8,
                correct_answers: 0,
                language: Some("French".to_string()),
                category: None,
            })
            .await
            .unwrap();

        let recent = store.sessions_since(before).await.unwrap();
        assert_eq!(recent, vec![session.clone()]);

        let future = store
            .sessions_since(Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert!(future.is_empty());
        assert_eq!(store.get_session(session.id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn answer_with_unknown_word_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        let session = store
            .create_session(NewQuizSession {
                total_questions: 1,
                correct_answers: 0,
                language: None,
                category: None,
            })
            .await
            .unwrap();
        let err = store
            .insert_answer(NewQuizAnswer {
                session_id: session.id,
                word_id: 42,
                is_correct: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "word", id: 42 }));
    }
}
