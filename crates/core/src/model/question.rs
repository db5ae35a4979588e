use serde::{Deserialize, Serialize};

use crate::model::QuestionId;

/// A single question as served by the content store.
///
/// Immutable once loaded into a session: the user's choice lives in the
/// session state, never on the question itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Multiple-choice options; empty for free-entry questions.
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Copy of this question under a different id.
    ///
    /// Used when flattening units, where composite ids replace local ones.
    #[must_use]
    pub fn with_id(&self, id: QuestionId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Canonical answer field, mirroring the content store's `string | string[]`.
///
/// A list means several canonical spellings are accepted; comparison is still
/// exact and case-sensitive per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multiple(Vec<String>),
}

impl Answer {
    /// Exact, case-sensitive match of a user answer against the canonical
    /// answer(s). No trimming or case folding happens at this layer.
    #[must_use]
    pub fn matches(&self, user_answer: &str) -> bool {
        match self {
            Answer::Single(canonical) => user_answer == canonical,
            Answer::Multiple(list) => list.iter().any(|canonical| user_answer == canonical),
        }
    }

    /// Canonical rendering used in result detail rows.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Answer::Single(canonical) => canonical.clone(),
            Answer::Multiple(list) => list.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_answer_matches_exactly() {
        let answer = Answer::Single("Paris".into());
        assert!(answer.matches("Paris"));
        assert!(!answer.matches("paris"));
        assert!(!answer.matches(" Paris"));
        assert!(!answer.matches(""));
    }

    #[test]
    fn multiple_answer_matches_any_entry_exactly() {
        let answer = Answer::Multiple(vec!["H2O".into(), "water".into()]);
        assert!(answer.matches("water"));
        assert!(answer.matches("H2O"));
        assert!(!answer.matches("Water"));
    }

    #[test]
    fn answer_deserializes_from_string_or_array() {
        let single: Answer = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(single, Answer::Single("A".into()));

        let multiple: Answer = serde_json::from_str("[\"A\",\"B\"]").unwrap();
        assert_eq!(multiple, Answer::Multiple(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn question_tolerates_missing_optional_fields() {
        let question: Question =
            serde_json::from_str(r#"{"id":"q1","text":"2+2?","answer":"4"}"#).unwrap();
        assert!(question.options.is_empty());
        assert!(question.explanation.is_none());
    }
}
