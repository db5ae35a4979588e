use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{ExamResult, QuestionId};
use storage::repository::ProgressRepository;

use crate::content_store::ContentStore;
use crate::error::{ContentError, SessionError};
use crate::loader::{QuestionSetLoader, QuestionSource, establish_order};
use crate::result_sink::ResultSink;

use super::state::{ExamSession, NavigationTarget};

/// Orchestrates one attempt: loads the question set, owns the session, and
/// mirrors every state change into the progress repository.
///
/// Persistence is best-effort: a failed snapshot write is logged and never
/// rolls back or corrupts the in-memory session.
pub struct ExamWorkflow {
    clock: Clock,
    store: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressRepository>,
    sink: Arc<dyn ResultSink>,
    source: QuestionSource,
    session: ExamSession,
}

impl std::fmt::Debug for ExamWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamWorkflow").finish_non_exhaustive()
    }
}

impl ExamWorkflow {
    /// Load the question set and resume a persisted attempt, or start fresh.
    ///
    /// A persisted record restores answers, flags, score and submitted state;
    /// the previous question order is reconstructed when it still matches the
    /// fetched content, otherwise a new shuffle happens. An unreadable record
    /// is discarded as if none existed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Content` for load failures and
    /// `SessionError::Empty` when no questions are available.
    pub async fn load_or_init(
        clock: Clock,
        store: Arc<dyn ContentStore>,
        progress: Arc<dyn ProgressRepository>,
        sink: Arc<dyn ResultSink>,
        source: QuestionSource,
    ) -> Result<Self, SessionError> {
        let session = Self::build_session(&store, &progress, &source).await?;
        let workflow = Self {
            clock,
            store,
            progress,
            sink,
            source,
            session,
        };
        workflow.persist().await;
        Ok(workflow)
    }

    async fn build_session(
        store: &Arc<dyn ContentStore>,
        progress: &Arc<dyn ProgressRepository>,
        source: &QuestionSource,
    ) -> Result<ExamSession, SessionError> {
        let loader = QuestionSetLoader::new(Arc::clone(store));
        let loaded = loader.load(source).await?;

        let existing = match progress.load_progress(&loaded.storage_id).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    exam = %loaded.storage_id,
                    error = %err,
                    "discarding unreadable progress record"
                );
                None
            }
        };

        let persisted_ids = existing.as_ref().map(|r| r.question_ids.as_slice());
        let ordered = establish_order(loaded.questions.clone(), persisted_ids, &mut rand::rng())
            .map_err(ContentError::from)?;

        match existing {
            Some(record) => ExamSession::restore(&loaded, ordered, &record),
            None => ExamSession::fresh(&loaded, ordered),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Record or overwrite an answer; persists when the session accepted it.
    pub async fn record_answer(&mut self, id: &QuestionId, value: impl Into<String> + Send) {
        if self.session.record_answer(id, value) {
            self.persist().await;
        }
    }

    /// Flip a question's flagged state.
    pub async fn toggle_flag(&mut self, id: &QuestionId) {
        if self.session.toggle_flag(id) {
            self.persist().await;
        }
    }

    /// Move the active question and return the new index.
    pub async fn navigate(&mut self, target: NavigationTarget) -> usize {
        let index = self.session.navigate(target);
        self.persist().await;
        index
    }

    /// One countdown step, driven once per second while unsubmitted.
    pub async fn tick(&mut self) -> u64 {
        let remaining = self.session.tick();
        if !self.session.is_submitted() {
            self.persist().await;
        }
        remaining
    }

    /// Grade and submit the attempt.
    ///
    /// The graded result is returned to the caller first; pushing it to the
    /// result sink is fire-and-forget, so a sink failure is logged and the
    /// submitted transition stands.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a second call.
    pub async fn submit(&mut self) -> Result<ExamResult, SessionError> {
        let report = self.session.submit()?.clone();
        let result = ExamResult {
            exam_id: self.session.exam_id().clone(),
            exam_title: self.session.title().to_string(),
            score: report.score_percent,
            total_questions: self.session.questions().len(),
            correct_answers: report.correct_count,
            wrong_answers: report.wrong_count,
            time_spent: self.session.time_spent_seconds(),
            answers: report.details,
        };

        self.persist().await;

        if let Err(err) = self.sink.submit_result(&result).await {
            tracing::warn!(exam = %result.exam_id, error = %err, "result submission failed");
        }

        Ok(result)
    }

    /// Enter read-only review of the graded attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` before submission.
    pub async fn enter_review(&mut self) -> Result<(), SessionError> {
        self.session.enter_review()?;
        self.persist().await;
        Ok(())
    }

    /// Abandon the attempt entirely: delete the persisted record and rebuild
    /// the session from scratch (fresh shuffle, full budget, empty answers).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the record cannot be deleted, and
    /// load errors from the rebuild.
    pub async fn retry(&mut self) -> Result<(), SessionError> {
        self.progress
            .delete_progress(self.session.exam_id())
            .await?;
        self.session = Self::build_session(&self.store, &self.progress, &self.source).await?;
        self.persist().await;
        Ok(())
    }

    async fn persist(&self) {
        let record = self.session.snapshot(self.clock.now().timestamp_millis());
        if let Err(err) = self
            .progress
            .save_progress(self.session.exam_id(), &record)
            .await
        {
            tracing::warn!(
                exam = %self.session.exam_id(),
                error = %err,
                "failed to persist progress snapshot"
            );
        }
    }
}
