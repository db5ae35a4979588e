use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use exam_core::model::{
    ExamId, ExamType, Question, QuestionId, QuestionSet, QuestionSetError, SubjectId, Unit, UnitId,
};

use crate::content_store::ContentStore;
use crate::error::ContentError;

/// Where a session's questions come from. Exactly one form per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionSource {
    Exam(ExamId),
    Unit {
        unit_id: UnitId,
        subject_id: SubjectId,
    },
}

impl QuestionSource {
    /// Id under which the attempt is persisted: the exam id, or the unit id
    /// for ad-hoc unit sessions.
    #[must_use]
    pub fn storage_id(&self) -> ExamId {
        match self {
            QuestionSource::Exam(id) => id.clone(),
            QuestionSource::Unit { unit_id, .. } => ExamId::new(unit_id.as_str()),
        }
    }
}

/// Everything a session needs from a completed load. Questions are still in
/// document order; presentation order is established separately.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedExam {
    pub storage_id: ExamId,
    pub title: String,
    pub exam_type: ExamType,
    pub duration_minutes: u32,
    pub questions: QuestionSet,
}

/// Obtains a finite ordered question list for either source form.
#[derive(Clone)]
pub struct QuestionSetLoader {
    store: Arc<dyn ContentStore>,
}

impl QuestionSetLoader {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Fetch and validate the question set for a source.
    ///
    /// Unit sessions run as practice with the practice default duration.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::MissingQuestions` when the record exists but
    /// contributes no questions, and propagates fetch/parse failures. Nothing
    /// is retried.
    pub async fn load(&self, source: &QuestionSource) -> Result<LoadedExam, ContentError> {
        match source {
            QuestionSource::Exam(id) => {
                let exam = self.store.get_exam(id).await?;
                if exam.questions.is_empty() {
                    return Err(ContentError::MissingQuestions);
                }
                let duration_minutes = exam.duration_minutes();
                Ok(LoadedExam {
                    storage_id: exam.id,
                    title: exam.title,
                    exam_type: exam.exam_type,
                    duration_minutes,
                    questions: QuestionSet::new(exam.questions)?,
                })
            }
            QuestionSource::Unit {
                unit_id,
                subject_id,
            } => {
                let unit = self.store.get_unit(unit_id, subject_id).await?;
                let questions = flatten_unit(&unit);
                if questions.is_empty() {
                    return Err(ContentError::MissingQuestions);
                }
                Ok(LoadedExam {
                    storage_id: source.storage_id(),
                    title: unit.title,
                    exam_type: ExamType::Practice,
                    duration_minutes: ExamType::Practice.default_duration_minutes(),
                    questions: QuestionSet::new(questions)?,
                })
            }
        }
    }
}

/// Flatten `lessons[*].exercises[*].questions[*]` in document order, giving
/// each question a composite id so reused local ids cannot collide. Lessons
/// and exercises without questions contribute nothing.
#[must_use]
pub fn flatten_unit(unit: &Unit) -> Vec<Question> {
    let mut questions = Vec::new();
    for lesson in &unit.lessons {
        for exercise in &lesson.exercises {
            for question in &exercise.questions {
                let id = QuestionId::composite(&lesson.id, &exercise.id, &question.id);
                questions.push(question.with_id(id));
            }
        }
    }
    questions
}

/// Establish the presentation order for a freshly fetched set.
///
/// With a persisted order snapshot whose ids still map 1:1 onto the fetched
/// questions, the previous order is reconstructed exactly. A length mismatch
/// or an unresolvable id means the content changed server-side, so the stale
/// order is discarded and a full reshuffle happens instead. Fresh loads (no
/// snapshot) always shuffle.
///
/// The RNG is injected so order policy stays deterministic under test.
///
/// # Errors
///
/// Returns `QuestionSetError` if the reordered questions no longer form a
/// valid set.
pub fn establish_order<R: Rng + ?Sized>(
    fetched: QuestionSet,
    persisted_ids: Option<&[QuestionId]>,
    rng: &mut R,
) -> Result<QuestionSet, QuestionSetError> {
    if let Some(ids) = persisted_ids {
        if ids.len() == fetched.len() {
            if let Some(restored) = restore_order(&fetched, ids) {
                return QuestionSet::new(restored);
            }
        }
        tracing::debug!(
            persisted = ids.len(),
            fetched = fetched.len(),
            "stale persisted question order discarded; reshuffling"
        );
    }

    let mut questions = fetched.into_inner();
    questions.shuffle(rng);
    QuestionSet::new(questions)
}

fn restore_order(fetched: &QuestionSet, persisted_ids: &[QuestionId]) -> Option<Vec<Question>> {
    let mut by_id: HashMap<QuestionId, Question> = fetched
        .questions()
        .iter()
        .map(|q| (q.id.clone(), q.clone()))
        .collect();

    let mut restored = Vec::with_capacity(persisted_ids.len());
    for id in persisted_ids {
        // remove() also rejects duplicate ids in a corrupt snapshot
        restored.push(by_id.remove(id)?);
    }
    Some(restored)
}
