use std::collections::HashSet;
use thiserror::Error;

use crate::model::{Question, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

/// Ordered, finite list of questions attached to one exam attempt.
///
/// Order is significant: it is the presentation order established by the
/// loader (fresh shuffle or reconstructed persisted order).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Build a set, enforcing id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError::DuplicateId` when two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionSetError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id.clone()) {
                return Err(QuestionSetError::DuplicateId(question.id.clone()));
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.questions.iter().any(|q| &q.id == id)
    }

    /// Ids in presentation order, the shape persisted as the order snapshot.
    #[must_use]
    pub fn ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    /// Consume the set, yielding the questions in order.
    #[must_use]
    pub fn into_inner(self) -> Vec<Question> {
        self.questions
    }
}
