//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::QuestionSetError;
use storage::repository::StorageError;

/// Errors while loading a question set from the content store.
///
/// None of these are fatal or retried: callers degrade to an empty
/// "no questions" state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("content request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("content record not found")]
    NotFound,
    #[error("record has no questions")]
    MissingQuestions,
    #[error(transparent)]
    QuestionSet(#[from] QuestionSetError),
}

/// Errors while posting a graded result to the result sink.
///
/// Fire-and-forget: a failure is logged and never blocks the submitted
/// transition or the result screen.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultSubmitError {
    #[error("result submission failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the exam session and its workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already submitted")]
    AlreadySubmitted,
    #[error("session not submitted yet")]
    NotSubmitted,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
