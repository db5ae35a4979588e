use serde::{Deserialize, Serialize};

use crate::model::{ExamId, QuestionId};

/// Per-question grading detail included in the result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    /// Empty string when the question was left unanswered.
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Payload posted to the result sink after submission.
///
/// Field names serialize camelCase to match the sink contract
/// (`examId`, `scorePercent` is carried as `score`, `timeSpent` is seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub exam_id: ExamId,
    pub exam_title: String,
    /// Percentage score, rounded half-up.
    pub score: u32,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub wrong_answers: usize,
    /// Seconds spent: initial time budget minus time left at submission.
    pub time_spent: u64,
    pub answers: Vec<QuestionOutcome>,
}
