use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum reviews before a word can count as mastered.
pub const MASTERY_MIN_REVIEWS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub word: String,
    pub translation: String,
    pub category: String,
    pub dictionary: String,
    pub language: String,
    #[serde(with = "timestamp")]
    pub added_at: DateTime<Utc>,
    pub review_count: i64,
    pub correct_count: i64,
}

impl Word {
    /// At least three reviews with 80% or more answered correctly.
    pub fn is_mastered(&self) -> bool {
        self.review_count >= MASTERY_MIN_REVIEWS && self.correct_count * 5 >= self.review_count * 4
    }

    pub fn record_outcome(&mut self, correct: bool) {
        self.review_count += 1;
        if correct {
            self.correct_count += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub translation: String,
    pub category: String,
    pub dictionary: String,
    pub language: String,
}

impl NewWord {
    pub fn into_word(self, id: i64, added_at: DateTime<Utc>) -> Word {
        Word {
            id,
            word: self.word,
            translation: self.translation,
            category: self.category,
            dictionary: self.dictionary,
            language: self.language,
            added_at,
            review_count: 0,
            correct_count: 0,
        }
    }
}

/// Partial update of the user-editable word fields. Counters and `added_at`
/// are never touched by a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordPatch {
    pub word: Option<String>,
    pub translation: Option<String>,
    pub category: Option<String>,
    pub dictionary: Option<String>,
    pub language: Option<String>,
}

impl WordPatch {
    pub fn is_empty(&self) -> bool {
        self.word.is_none()
            && self.translation.is_none()
            && self.category.is_none()
            && self.dictionary.is_none()
            && self.language.is_none()
    }

    pub fn apply(self, target: &mut Word) {
        if let Some(value) = self.word {
            target.word = value;
        }
        if let Some(value) = self.translation {
            target.translation = value;
        }
        if let Some(value) = self.category {
            target.category = value;
        }
        if let Some(value) = self.dictionary {
            target.dictionary = value;
        }
        if let Some(value) = self.language {
            target.language = value;
        }
    }
}

/// Listing filter. Every provided field must match; empty strings are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFilter {
    pub category: Option<String>,
    pub language: Option<String>,
    pub dictionary: Option<String>,
    pub search: Option<String>,
}

impl WordFilter {
    /// Tags are trimmed and dropped when blank. The search needle is kept
    /// verbatim, so a lone space still matches multi-word entries; only an
    /// empty needle is dropped.
    pub fn normalized(&self) -> Self {
        fn keep(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            category: keep(&self.category),
            language: keep(&self.language),
            dictionary: keep(&self.dictionary),
            search: self.search.clone().filter(|v| !v.is_empty()),
        }
    }

    pub fn matches(&self, word: &Word) -> bool {
        let eq_ignore_case = |expected: &Option<String>, actual: &str| match expected {
            Some(expected) => expected.to_lowercase() == actual.to_lowercase(),
            None => true,
        };

        if !eq_ignore_case(&self.category, &word.category)
            || !eq_ignore_case(&self.language, &word.language)
            || !eq_ignore_case(&self.dictionary, &word.dictionary)
        {
            return false;
        }

        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                word.word.to_lowercase().contains(&needle)
                    || word.translation.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Category,
    Language,
    Dictionary,
}

impl TagField {
    pub fn column(self) -> &'static str {
        match self {
            TagField::Category => "category",
            TagField::Language => "language",
            TagField::Dictionary => "dictionary",
        }
    }

    pub fn value_of(self, word: &Word) -> &str {
        match self {
            TagField::Category => &word.category,
            TagField::Language => &word.language,
            TagField::Dictionary => &word.dictionary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub language: Option<String>,
    pub category: Option<String>,
    #[serde(with = "timestamp")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizSession {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub language: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub id: i64,
    pub session_id: i64,
    pub word_id: i64,
    pub is_correct: bool,
    #[serde(with = "timestamp")]
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewQuizAnswer {
    pub session_id: i64,
    pub word_id: i64,
    pub is_correct: bool,
}

/// RFC 3339 with millisecond precision, matching what clients already parse.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
