use serde_json::{Map, Value};

use crate::db::models::{NewQuizAnswer, NewQuizSession, NewWord, WordPatch};
use crate::response::{AppError, FieldError};

const REQUIRED: &str = "Required";

/// Collects field-level problems while reading a JSON object so that one
/// response can report all of them.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, key: &str, message: &str) {
        self.errors.push(FieldError::new(key, message));
    }

    fn text(&mut self, key: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(raw) if raw.trim().is_empty() => {
                self.fail(key, "Must not be empty");
                None
            }
            Value::String(raw) => Some(raw.trim().to_string()),
            _ => {
                self.fail(key, "Expected string");
                None
            }
        }
    }

    fn required_text(&mut self, key: &str) -> Option<String> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, REQUIRED);
                None
            }
            Some(value) => self.text(key, value),
        }
    }

    /// Absent means "leave unchanged"; an explicit null is rejected because
    /// every word field is mandatory.
    fn patch_text(&mut self, key: &str) -> Option<String> {
        let value = self.map.get(key)?;
        self.text(key, value)
    }

    fn nullable_text(&mut self, key: &str) -> Option<String> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(value) => self.text(key, value),
        }
    }

    fn required_count(&mut self, key: &str) -> Option<i64> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, REQUIRED);
                None
            }
            Some(Value::Number(n)) => match n.as_i64() {
                Some(v) if v >= 0 => Some(v),
                Some(_) => {
                    self.fail(key, "Must be zero or greater");
                    None
                }
                None => {
                    self.fail(key, "Expected integer");
                    None
                }
            },
            Some(_) => {
                self.fail(key, "Expected integer");
                None
            }
        }
    }

    fn required_id(&mut self, key: &str) -> Option<i64> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, REQUIRED);
                None
            }
            Some(Value::Number(n)) => match n.as_i64() {
                Some(v) if v > 0 => Some(v),
                _ => {
                    self.fail(key, "Expected positive integer");
                    None
                }
            },
            Some(_) => {
                self.fail(key, "Expected positive integer");
                None
            }
        }
    }

    fn required_bool(&mut self, key: &str) -> Option<bool> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, REQUIRED);
                None
            }
            Some(Value::Bool(v)) => Some(*v),
            Some(_) => {
                self.fail(key, "Expected boolean");
                None
            }
        }
    }

    fn finish(self, message: &str) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.into_error(message))
        }
    }

    /// Only called after a reader returned `None`, which always records a
    /// field error first.
    fn into_error(self, message: &str) -> AppError {
        AppError::validation(message, self.errors)
    }
}

fn parse_object(body: &[u8], message: &str) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::validation(
            message,
            vec![FieldError::new("body", "Expected object")],
        )),
        Err(err) => Err(AppError::validation(
            message,
            vec![FieldError::new("body", format!("Malformed JSON: {err}"))],
        )),
    }
}

pub fn new_word(body: &[u8]) -> Result<NewWord, AppError> {
    const MESSAGE: &str = "Invalid word data";
    let map = parse_object(body, MESSAGE)?;
    let mut fields = Fields::new(&map);

    let word = fields.required_text("word");
    let translation = fields.required_text("translation");
    let category = fields.required_text("category");
    let dictionary = fields.required_text("dictionary");
    let language = fields.required_text("language");

    let (Some(word), Some(translation), Some(category), Some(dictionary), Some(language)) =
        (word, translation, category, dictionary, language)
    else {
        return Err(fields.into_error(MESSAGE));
    };

    Ok(NewWord {
        word,
        translation,
        category,
        dictionary,
        language,
    })
}

pub fn word_patch(body: &[u8]) -> Result<WordPatch, AppError> {
    const MESSAGE: &str = "Invalid word data";
    let map = parse_object(body, MESSAGE)?;
    let mut fields = Fields::new(&map);

    let patch = WordPatch {
        word: fields.patch_text("word"),
        translation: fields.patch_text("translation"),
        category: fields.patch_text("category"),
        dictionary: fields.patch_text("dictionary"),
        language: fields.patch_text("language"),
    };
    fields.finish(MESSAGE)?;
    Ok(patch)
}

pub fn new_session(body: &[u8]) -> Result<NewQuizSession, AppError> {
    const MESSAGE: &str = "Invalid session data";
    let map = parse_object(body, MESSAGE)?;
    let mut fields = Fields::new(&map);

    let total_questions = fields.required_count("totalQuestions");
    let correct_answers = fields.required_count("correctAnswers");
    let language = fields.nullable_text("language");
    let category = fields.nullable_text("category");

    let (Some(total_questions), Some(correct_answers)) = (total_questions, correct_answers) else {
        return Err(fields.into_error(MESSAGE));
    };
    // the optional tags may still have failed
    fields.finish(MESSAGE)?;

    Ok(NewQuizSession {
        total_questions,
        correct_answers,
        language,
        category,
    })
}

pub fn new_answer(body: &[u8]) -> Result<NewQuizAnswer, AppError> {
    const MESSAGE: &str = "Invalid answer data";
    let map = parse_object(body, MESSAGE)?;
    let mut fields = Fields::new(&map);

    let session_id = fields.required_id("sessionId");
    let word_id = fields.required_id("wordId");
    let is_correct = fields.required_bool("isCorrect");

    let (Some(session_id), Some(word_id), Some(is_correct)) = (session_id, word_id, is_correct)
    else {
        return Err(fields.into_error(MESSAGE));
    };

    Ok(NewQuizAnswer {
        session_id,
        word_id,
        is_correct,
    })
}
