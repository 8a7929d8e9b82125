use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::db::models::{NewQuizAnswer, QuizAnswer, Word};
use crate::db::{Storage, StoreError};

pub const OPTIONS_PER_QUESTION: usize = 4;
const DECOYS_PER_QUESTION: usize = OPTIONS_PER_QUESTION - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub word: Word,
    pub question: String,
    pub options: Vec<QuizOption>,
    pub correct_answer: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }
}

/// Builds up to `count` multiple-choice questions from `words`, in input
/// order. Each question pairs the word's translation with three translations
/// drawn at random from the other words. Pools smaller than four words yield
/// nothing. Decoys are not de-duplicated, so repeated translations in the
/// pool can produce repeated option texts.
pub fn generate_questions<R>(words: &[Word], count: usize, rng: &mut R) -> Vec<QuizQuestion>
where
    R: Rng + ?Sized,
{
    if words.len() < OPTIONS_PER_QUESTION {
        return Vec::new();
    }

    words
        .iter()
        .take(count)
        .map(|word| {
            let mut others: Vec<&Word> = words.iter().filter(|w| w.id != word.id).collect();
            others.shuffle(&mut *rng);

            let mut options = Vec::with_capacity(OPTIONS_PER_QUESTION);
            options.push(QuizOption {
                text: word.translation.clone(),
                is_correct: true,
            });
            options.extend(others.iter().take(DECOYS_PER_QUESTION).map(|decoy| QuizOption {
                text: decoy.translation.clone(),
                is_correct: false,
            }));
            options.shuffle(&mut *rng);

            QuizQuestion {
                word: word.clone(),
                question: word.word.clone(),
                options,
                correct_answer: word.translation.clone(),
            }
        })
        .collect()
}

/// Persists one answer and then bumps the word's counters. The two writes
/// are independent: a failure between them leaves the answer without its
/// counter update.
pub async fn record_answer(
    storage: &dyn Storage,
    input: NewQuizAnswer,
) -> Result<QuizAnswer, StoreError> {
    if storage.get_session(input.session_id).await?.is_none() {
        return Err(StoreError::session_not_found(input.session_id));
    }
    if storage.get_word(input.word_id).await?.is_none() {
        return Err(StoreError::word_not_found(input.word_id));
    }

    let answer = storage.insert_answer(input).await?;
    storage
        .record_outcome(answer.word_id, answer.is_correct)
        .await?;

    tracing::debug!(
        session_id = answer.session_id,
        word_id = answer.word_id,
        correct = answer.is_correct,
        "quiz answer recorded"
    );
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::db::memory::MemoryStore;
    use crate::db::models::{NewQuizSession, NewWord};

    fn pool(size: usize) -> Vec<Word> {
        (1..=size as i64)
            .map(|id| Word {
                id,
                word: format!("word-{id}"),
                translation: format!("translation-{id}"),
                category: "General".to_string(),
                dictionary: "Collins".to_string(),
                language: "French".to_string(),
                added_at: Utc::now(),
                review_count: 0,
                correct_count: 0,
            })
            .collect()
    }

    #[test]
    fn single_question_has_one_correct_option() {
        let words = pool(5);
        let mut rng = StdRng::seed_from_u64(7);
        let questions = generate_questions(&words, 1, &mut rng);

        assert_eq!(questions.len(), 1);
        let question = &questions[0];
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.question, "word-1");

        let correct: Vec<&QuizOption> = question.options.iter().filter(|o| o.is_correct).collect();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].text, words[0].translation);
        assert_eq!(question.correct_answer, words[0].translation);
        assert!(question.is_correct("translation-1"));
        assert!(!question.is_correct("translation-2"));
    }

    #[test]
    fn small_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_questions(&pool(3), 10, &mut rng).is_empty());
    }

    #[test]
    fn questions_follow_input_order() {
        let words = pool(6);
        let mut rng = StdRng::seed_from_u64(3);
        let questions = generate_questions(&words, 10, &mut rng);
        let prompts: Vec<&str> = questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(
            prompts,
            vec!["word-1", "word-2", "word-3", "word-4", "word-5", "word-6"]
        );
    }

    #[test]
    fn duplicate_translations_are_not_filtered() {
        let mut words = pool(4);
        for word in &mut words {
            word.translation = "same".to_string();
        }
        let mut rng = StdRng::seed_from_u64(11);
        let questions = generate_questions(&words, 1, &mut rng);
        assert!(questions[0].options.iter().all(|o| o.text == "same"));
        assert_eq!(questions[0].options.iter().filter(|o| o.is_correct).count(), 1);
    }

    #[tokio::test]
    async fn record_answer_updates_word_counters() {
        let store = MemoryStore::new();
        let word = store
            .create_word(NewWord {
                word: "Perro".to_string(),
                translation: "Dog".to_string(),
                category: "Animals".to_string(),
                dictionary: "Oxford".to_string(),
                language: "Spanish".to_string(),
            })
            .await
            .unwrap();
        let session = store
            .create_session(NewQuizSession {
                total_questions: 2,
                correct_answers: 0,
                language: Some("Spanish".to_string()),
                category: None,
            })
            .await
            .unwrap();

        for is_correct in [true, false] {
            record_answer(
                &store,
                NewQuizAnswer {
                    session_id: session.id,
                    word_id: word.id,
                    is_correct,
                },
            )
            .await
            .unwrap();
        }

        let word = store.get_word(word.id).await.unwrap().unwrap();
        assert_eq!(word.review_count, 2);
        assert_eq!(word.correct_count, 1);
    }

    #[tokio::test]
    async fn record_answer_rejects_unknown_session() {
        let store = MemoryStore::new();
        let err = record_answer(
            &store,
            NewQuizAnswer {
                session_id: 5,
                word_id: 1,
                is_correct: true,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "quiz session", id: 5 }));
    }

    proptest! {
        #[test]
        fn every_question_is_well_formed(size in 4usize..20, count in 0usize..25, seed in any::<u64>()) {
            let words = pool(size);
            let mut rng = StdRng::seed_from_u64(seed);
            let questions = generate_questions(&words, count, &mut rng);
            prop_assert_eq!(questions.len(), count.min(size));
            for question in &questions {
                prop_assert_eq!(question.options.len(), OPTIONS_PER_QUESTION);
                let correct: Vec<_> = question.options.iter().filter(|o| o.is_correct).collect();
                prop_assert_eq!(correct.len(), 1);
                prop_assert_eq!(&correct[0].text, &question.word.translation);
                prop_assert!(question
                    .options
                    .iter()
                    .filter(|o| !o.is_correct)
                    .all(|o| o.text != question.word.translation));
            }
        }
    }
}
