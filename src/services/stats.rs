use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::models::{QuizSession, Word};
use crate::db::{Storage, StoreError};

pub const WEEK_DAYS: i64 = 7;
/// How far back session history is read when counting the streak.
pub const STREAK_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStats {
    pub total_words: i64,
    pub mastered_words: i64,
    pub overall_accuracy: i64,
    pub study_streak: i64,
    pub language_stats: Vec<LanguageStat>,
    pub weekly_progress: Vec<DailyProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStat {
    pub language: String,
    pub word_count: i64,
    pub accuracy: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: String,
    pub words_studied: i64,
}

/// `round(100 * correct / total)` with halves rounded up, 0 when `total` is 0.
pub fn percentage(correct: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (200 * correct + total) / (2 * total)
}

#[derive(Default)]
struct Tally {
    words: i64,
    correct: i64,
    reviews: i64,
}

pub fn aggregate(words: &[Word], sessions: &[QuizSession], today: NaiveDate) -> WordStats {
    let total_reviews: i64 = words.iter().map(|w| w.review_count).sum();
    let total_correct: i64 = words.iter().map(|w| w.correct_count).sum();

    let mut by_language: BTreeMap<&str, Tally> = BTreeMap::new();
    for word in words {
        let tally = by_language.entry(word.language.as_str()).or_default();
        tally.words += 1;
        tally.correct += word.correct_count;
        tally.reviews += word.review_count;
    }

    let language_stats = by_language
        .into_iter()
        .map(|(language, tally)| LanguageStat {
            language: language.to_string(),
            word_count: tally.words,
            accuracy: percentage(tally.correct, tally.reviews),
        })
        .collect();

    WordStats {
        total_words: words.len() as i64,
        mastered_words: words.iter().filter(|w| w.is_mastered()).count() as i64,
        overall_accuracy: percentage(total_correct, total_reviews),
        study_streak: study_streak(sessions, today),
        language_stats,
        weekly_progress: weekly_progress(sessions, today),
    }
}

/// Questions answered per UTC day for the week ending `today`, oldest first.
pub fn weekly_progress(sessions: &[QuizSession], today: NaiveDate) -> Vec<DailyProgress> {
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for session in sessions {
        *per_day.entry(session.completed_at.date_naive()).or_default() += session.total_questions;
    }

    (0..WEEK_DAYS)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            DailyProgress {
                date: day.format("%Y-%m-%d").to_string(),
                words_studied: per_day.get(&day).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Consecutive days with at least one session. A streak that reached
/// yesterday still counts until today is over.
pub fn study_streak(sessions: &[QuizSession], today: NaiveDate) -> i64 {
    let days: BTreeSet<NaiveDate> = sessions
        .iter()
        .map(|s| s.completed_at.date_naive())
        .collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

pub async fn load(storage: &dyn Storage, now: DateTime<Utc>) -> Result<WordStats, StoreError> {
    let today = now.date_naive();
    let window_start = today - Duration::days(STREAK_LOOKBACK_DAYS.max(WEEK_DAYS) - 1);
    let since = window_start
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);

    let words = storage.list_words(&Default::default()).await?;
    let sessions = storage.sessions_since(since).await?;

    tracing::debug!(
        words = words.len(),
        sessions = sessions.len(),
        "aggregating word stats"
    );

    Ok(aggregate(&words, &sessions, today))
}
