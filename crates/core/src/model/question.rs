use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a question is rejected at the catalog boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: prompt cannot be empty")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id}: needs at least 2 options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id}: option {index} is empty")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id}: correct index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question {id}: topic cannot be empty")]
    EmptyTopic { id: QuestionId },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub topic: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or topic is blank, fewer than two
    /// options are given, any option is blank, or `correct_index` does not
    /// point at an option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id;
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                len: self.options.len(),
            });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { id, index });
        }
        if self.correct_index >= self.options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                id,
                index: self.correct_index,
                len: self.options.len(),
            });
        }
        if self.topic.trim().is_empty() {
            return Err(QuestionError::EmptyTopic { id });
        }

        let explanation = self.explanation.filter(|e| !e.trim().is_empty());

        Ok(Question {
            id,
            prompt: self.prompt,
            options: self.options,
            correct_index: self.correct_index,
            topic: self.topic,
            explanation,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice quiz question.
///
/// Only constructible through `QuestionDraft::validate`, so
/// `correct_index < options.len()` always holds. Deserialization goes through
/// the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    topic: String,
    explanation: Option<String>,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Text of the correct option.
    #[must_use]
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
