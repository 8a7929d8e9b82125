use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::db::models::{
    NewQuizAnswer, NewQuizSession, NewWord, QuizAnswer, QuizSession, TagField, Word, WordFilter,
    WordPatch,
};
use crate::db::{Storage, StoreError};

#[derive(Default)]
struct Tables {
    words: BTreeMap<i64, Word>,
    sessions: BTreeMap<i64, QuizSession>,
    answers: BTreeMap<i64, QuizAnswer>,
    last_word_id: i64,
    last_session_id: i64,
    last_answer_id: i64,
}

/// Process-local storage. Every operation takes the table lock once, so a
/// counter update can never interleave with another write.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(words: &mut [Word]) {
    words.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl Storage for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_words(&self, filter: &WordFilter) -> Result<Vec<Word>, StoreError> {
        let filter = filter.normalized();
        let tables = self.tables.read();
        let mut words: Vec<Word> = tables
            .words
            .values()
            .filter(|word| filter.matches(word))
            .cloned()
            .collect();
        newest_first(&mut words);
        Ok(words)
    }

    async fn get_word(&self, id: i64) -> Result<Option<Word>, StoreError> {
        Ok(self.tables.read().words.get(&id).cloned())
    }

    async fn create_word(&self, input: NewWord) -> Result<Word, StoreError> {
        let mut tables = self.tables.write();
        tables.last_word_id += 1;
        let word = input.into_word(tables.last_word_id, Utc::now());
        tables.words.insert(word.id, word.clone());
        Ok(word)
    }

    async fn update_word(&self, id: i64, patch: WordPatch) -> Result<Word, StoreError> {
        let mut tables = self.tables.write();
        let word = tables
            .words
            .get_mut(&id)
            .ok_or_else(|| StoreError::word_not_found(id))?;
        patch.apply(word);
        Ok(word.clone())
    }

    async fn delete_word(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let existed = tables.words.remove(&id).is_some();
        if existed {
            tables.answers.retain(|_, answer| answer.word_id != id);
        }
        Ok(existed)
    }

    async fn record_outcome(&self, id: i64, correct: bool) -> Result<(), StoreError> {
        if let Some(word) = self.tables.write().words.get_mut(&id) {
            word.record_outcome(correct);
        }
        Ok(())
    }

    async fn random_words(
        &self,
        count: usize,
        filter: &WordFilter,
    ) -> Result<Vec<Word>, StoreError> {
        let filter = filter.normalized();
        let mut pool: Vec<Word> = self
            .tables
            .read()
            .words
            .values()
            .filter(|word| filter.matches(word))
            .cloned()
            .collect();
        pool.shuffle(&mut rand::rng());
        pool.truncate(count);
        Ok(pool)
    }

    async fn word_count(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().words.len() as i64)
    }

    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read();
        let values: BTreeSet<&str> = tables
            .words
            .values()
            .map(|word| field.value_of(word))
            .collect();
        Ok(values.into_iter().map(str::to_string).collect())
    }

    async fn create_session(&self, input: NewQuizSession) -> Result<QuizSession, StoreError> {
        let mut tables = self.tables.write();
        tables.last_session_id += 1;
        let session = QuizSession {
            id: tables.last_session_id,
            total_questions: input.total_questions,
            correct_answers: input.correct_answers,
            language: input.language,
            category: input.category,
            completed_at: Utc::now(),
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, StoreError> {
        Ok(self.tables.read().sessions.get(&id).cloned())
    }

    async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<QuizSession>, StoreError> {
        let mut sessions: Vec<QuizSession> = self
            .tables
            .read()
            .sessions
            .values()
            .filter(|session| session.completed_at >= since)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn insert_answer(&self, input: NewQuizAnswer) -> Result<QuizAnswer, StoreError> {
        let mut tables = self.tables.write();
        if !tables.sessions.contains_key(&input.session_id) {
            return Err(StoreError::session_not_found(input.session_id));
        }
        if !tables.words.contains_key(&input.word_id) {
            return Err(StoreError::word_not_found(input.word_id));
        }
        tables.last_answer_id += 1;
        let answer = QuizAnswer {
            id: tables.last_answer_id,
            session_id: input.session_id,
            word_id: input.word_id,
            is_correct: input.is_correct,
            answered_at: Utc::now(),
        };
        tables.answers.insert(answer.id, answer.clone());
        Ok(answer)
    }
}
