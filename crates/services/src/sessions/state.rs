use std::collections::{HashMap, HashSet};
use std::fmt;

use exam_core::grading::{self, GradeReport};
use exam_core::model::{ExamId, ExamType, Question, QuestionId, QuestionSet};
use storage::repository::ProgressRecord;

use crate::error::SessionError;
use crate::loader::LoadedExam;

use super::progress::{SessionProgress, TimePressure};

/// Where to move the active question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Relative step; negative moves backwards.
    Delta(i64),
    /// Absolute position, clamped into range.
    Index(usize),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The full mutable record of one attempt over a question set.
///
/// Exactly one session exists per attempt; all mutation goes through the
/// methods here, and the workflow mirrors every change to storage. Once
/// submitted, answers and score are frozen; review navigation never re-grades.
pub struct ExamSession {
    exam_id: ExamId,
    title: String,
    exam_type: ExamType,
    questions: QuestionSet,
    answers: HashMap<QuestionId, String>,
    flagged: HashSet<QuestionId>,
    viewed: HashSet<QuestionId>,
    current_index: usize,
    duration_minutes: u32,
    time_left_seconds: u64,
    is_submitted: bool,
    is_review: bool,
    score: u32,
    report: Option<GradeReport>,
}

impl ExamSession {
    /// Start a brand-new attempt: full time budget, nothing answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the ordered set has no questions.
    pub fn fresh(loaded: &LoadedExam, ordered: QuestionSet) -> Result<Self, SessionError> {
        if ordered.is_empty() {
            return Err(SessionError::Empty);
        }

        let mut session = Self {
            exam_id: loaded.storage_id.clone(),
            title: loaded.title.clone(),
            exam_type: loaded.exam_type,
            questions: ordered,
            answers: HashMap::new(),
            flagged: HashSet::new(),
            viewed: HashSet::new(),
            current_index: 0,
            duration_minutes: loaded.duration_minutes,
            time_left_seconds: u64::from(loaded.duration_minutes) * 60,
            is_submitted: false,
            is_review: false,
            score: 0,
            report: None,
        };
        session.mark_current_viewed();
        Ok(session)
    }

    /// Resume an interrupted attempt from a persisted snapshot.
    ///
    /// Answers and flags are restored filtered to the current set's ids.
    /// Remaining time is restored only when the attempt was unsubmitted and
    /// had time left; a submitted attempt resumes frozen at zero.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the ordered set has no questions.
    pub fn restore(
        loaded: &LoadedExam,
        ordered: QuestionSet,
        record: &ProgressRecord,
    ) -> Result<Self, SessionError> {
        if ordered.is_empty() {
            return Err(SessionError::Empty);
        }

        let answers: HashMap<QuestionId, String> = record
            .answers
            .iter()
            .filter(|(id, _)| ordered.contains(id))
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect();
        let flagged: HashSet<QuestionId> = record
            .flagged_questions
            .iter()
            .filter(|id| ordered.contains(id))
            .cloned()
            .collect();

        let full_budget = u64::from(loaded.duration_minutes) * 60;
        let time_left_seconds = if record.is_submitted {
            0
        } else if record.time_left > 0 {
            record.time_left
        } else {
            full_budget
        };

        let report = record
            .is_submitted
            .then(|| grading::grade(ordered.questions(), &answers));

        let mut session = Self {
            exam_id: loaded.storage_id.clone(),
            title: loaded.title.clone(),
            exam_type: loaded.exam_type,
            questions: ordered,
            answers,
            flagged,
            viewed: HashSet::new(),
            current_index: 0,
            duration_minutes: loaded.duration_minutes,
            time_left_seconds,
            is_submitted: record.is_submitted,
            is_review: false,
            score: record.score,
            report,
        };
        session.mark_current_viewed();
        Ok(session)
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn exam_type(&self) -> ExamType {
        self.exam_type
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The active question. Always present: sessions cannot be entered with
    /// an empty set.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn answer_for(&self, id: &QuestionId) -> Option<&str> {
        self.answers.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, String> {
        &self.answers
    }

    #[must_use]
    pub fn is_flagged(&self, id: &QuestionId) -> bool {
        self.flagged.contains(id)
    }

    #[must_use]
    pub fn flagged(&self) -> &HashSet<QuestionId> {
        &self.flagged
    }

    #[must_use]
    pub fn viewed(&self) -> &HashSet<QuestionId> {
        &self.viewed
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Nominal time budget for this attempt, in seconds.
    #[must_use]
    pub fn initial_budget_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    #[must_use]
    pub fn time_left_seconds(&self) -> u64 {
        self.time_left_seconds
    }

    /// Seconds consumed so far: budget minus remaining.
    #[must_use]
    pub fn time_spent_seconds(&self) -> u64 {
        self.initial_budget_seconds()
            .saturating_sub(self.time_left_seconds)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    #[must_use]
    pub fn is_review(&self) -> bool {
        self.is_review
    }

    /// Correct-answer count; meaningful only after submission.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Grading detail, present once submitted (recomputed on restore).
    #[must_use]
    pub fn report(&self) -> Option<&GradeReport> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn pressure(&self) -> TimePressure {
        TimePressure::for_remaining(self.time_left_seconds)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            unanswered: self.questions.len().saturating_sub(self.answers.len()),
            flagged: self.flagged.len(),
            viewed: self.viewed.len(),
            current_index: self.current_index,
            time_left_seconds: self.time_left_seconds,
            pressure: self.pressure(),
            is_submitted: self.is_submitted,
        }
    }

    // ─── Mutators ──────────────────────────────────────────────────────────────

    /// Record or overwrite the user's answer for a question; last write wins.
    ///
    /// Ignored (returns `false`) once submitted, while in review mode, or for
    /// an id outside the question set — answer keys stay a subset of the
    /// set's ids.
    pub fn record_answer(&mut self, id: &QuestionId, value: impl Into<String>) -> bool {
        if self.is_submitted || self.is_review {
            return false;
        }
        if !self.questions.contains(id) {
            tracing::debug!(question = %id, "ignoring answer for unknown question");
            return false;
        }
        self.answers.insert(id.clone(), value.into());
        true
    }

    /// Flip membership in the flagged set. Allowed even after submission.
    ///
    /// Returns `false` for ids outside the question set.
    pub fn toggle_flag(&mut self, id: &QuestionId) -> bool {
        if !self.questions.contains(id) {
            return false;
        }
        if !self.flagged.insert(id.clone()) {
            self.flagged.remove(id);
        }
        true
    }

    /// Move the active question, clamped into `[0, len - 1]`, and mark the
    /// new position viewed. Never touches answers or score.
    pub fn navigate(&mut self, target: NavigationTarget) -> usize {
        let last = self.questions.len().saturating_sub(1);
        let next = match target {
            NavigationTarget::Index(index) => index.min(last),
            NavigationTarget::Delta(delta) => {
                let current = i64::try_from(self.current_index).unwrap_or(i64::MAX);
                let moved = current.saturating_add(delta).max(0);
                usize::try_from(moved).unwrap_or(last).min(last)
            }
        };
        self.current_index = next;
        self.mark_current_viewed();
        next
    }

    /// One countdown step: decrement remaining time, floored at zero.
    ///
    /// Reaching zero does NOT submit; the attempt stays open at a frozen
    /// 00:00 until the user submits explicitly.
    pub fn tick(&mut self) -> u64 {
        if !self.is_submitted {
            self.time_left_seconds = self.time_left_seconds.saturating_sub(1);
        }
        self.time_left_seconds
    }

    /// One-way transition to submitted: grade the attempt and freeze answers
    /// and score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a second call.
    pub fn submit(&mut self) -> Result<&GradeReport, SessionError> {
        if self.is_submitted {
            return Err(SessionError::AlreadySubmitted);
        }

        let report = grading::grade(self.questions.questions(), &self.answers);
        self.score = u32::try_from(report.correct_count).unwrap_or(u32::MAX);
        self.report = Some(report);
        self.is_submitted = true;

        self.report.as_ref().ok_or(SessionError::NotSubmitted)
    }

    /// Enter read-only review of the graded attempt.
    ///
    /// Review is strictly observational: answers become immutable regardless
    /// of any other state, and the only way out is a full retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` before submission.
    pub fn enter_review(&mut self) -> Result<(), SessionError> {
        if !self.is_submitted {
            return Err(SessionError::NotSubmitted);
        }
        self.is_review = true;
        Ok(())
    }

    /// Full snapshot in the persisted record shape.
    #[must_use]
    pub fn snapshot(&self, timestamp_ms: i64) -> ProgressRecord {
        let mut flagged_questions: Vec<QuestionId> = self.flagged.iter().cloned().collect();
        flagged_questions.sort();

        ProgressRecord {
            answers: self.answers.clone(),
            flagged_questions,
            time_left: self.time_left_seconds,
            is_submitted: self.is_submitted,
            score: self.score,
            timestamp: timestamp_ms,
            question_ids: self.questions.ids(),
        }
    }

    fn mark_current_viewed(&mut self) {
        if let Some(question) = self.questions.get(self.current_index) {
            self.viewed.insert(question.id.clone());
        }
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("exam_id", &self.exam_id)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("current_index", &self.current_index)
            .field("time_left_seconds", &self.time_left_seconds)
            .field("is_submitted", &self.is_submitted)
            .field("is_review", &self.is_review)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
