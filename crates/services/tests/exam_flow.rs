use std::sync::Arc;

use async_trait::async_trait;

use exam_core::model::{
    Answer, Exam, ExamId, ExamResult, ExamType, Question, QuestionId, SubjectId, Unit, UnitId,
};
use exam_core::time::fixed_clock;
use services::content_store::FixtureContentStore;
use services::error::{ResultSubmitError, SessionError};
use services::loader::QuestionSource;
use services::result_sink::{RecordingResultSink, ResultSink};
use services::sessions::{ExamWorkflow, NavigationTarget};
use storage::repository::{
    InMemoryProgressRepository, ProgressRecord, ProgressRepository, StorageError,
};

fn question(id: &str, answer: &str) -> Question {
    Question {
        id: QuestionId::new(id),
        text: format!("Question {id}"),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        answer: Answer::Single(answer.into()),
        explanation: Some(format!("Because {answer}.")),
    }
}

fn exam_fixture() -> Exam {
    Exam {
        id: ExamId::new("midterm-1"),
        title: "Algebra midterm".into(),
        duration: Some(45),
        exam_type: ExamType::Midterm1,
        questions: vec![
            question("q1", "A"),
            question("q2", "B"),
            question("q3", "C"),
            question("q4", "D"),
        ],
    }
}

struct Harness {
    store: Arc<FixtureContentStore>,
    progress: Arc<InMemoryProgressRepository>,
    sink: Arc<RecordingResultSink>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(FixtureContentStore::new().with_exam(exam_fixture())),
            progress: Arc::new(InMemoryProgressRepository::new()),
            sink: Arc::new(RecordingResultSink::new()),
        }
    }

    async fn workflow(&self) -> ExamWorkflow {
        ExamWorkflow::load_or_init(
            fixed_clock(),
            self.store.clone(),
            self.progress.clone(),
            self.sink.clone(),
            QuestionSource::Exam(ExamId::new("midterm-1")),
        )
        .await
        .expect("load")
    }
}

#[tokio::test]
async fn fresh_attempt_starts_with_full_budget_and_initial_snapshot() {
    let harness = Harness::new();
    let workflow = harness.workflow().await;

    assert_eq!(workflow.session().time_left_seconds(), 45 * 60);
    assert!(workflow.session().answers().is_empty());

    // the initial snapshot is written before any interaction
    let record = harness
        .progress
        .load_progress(&ExamId::new("midterm-1"))
        .await
        .unwrap()
        .expect("initial snapshot");
    assert_eq!(record.question_ids.len(), 4);
    assert!(!record.is_submitted);
}

#[tokio::test]
async fn every_mutation_rewrites_the_snapshot() {
    let harness = Harness::new();
    let mut workflow = harness.workflow().await;
    let exam_id = ExamId::new("midterm-1");

    workflow.record_answer(&QuestionId::new("q1"), "A").await;
    let record = harness
        .progress
        .load_progress(&exam_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        record.answers.get(&QuestionId::new("q1")),
        Some(&"A".to_string())
    );

    workflow.toggle_flag(&QuestionId::new("q2")).await;
    let record = harness
        .progress
        .load_progress(&exam_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.flagged_questions, vec![QuestionId::new("q2")]);

    workflow.tick().await;
    let record = harness
        .progress
        .load_progress(&exam_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.time_left, 45 * 60 - 1);
}

#[tokio::test]
async fn restore_is_idempotent_across_reloads() {
    let harness = Harness::new();

    {
        let mut workflow = harness.workflow().await;
        workflow.record_answer(&QuestionId::new("q1"), "A").await;
        workflow.record_answer(&QuestionId::new("q3"), "X").await;
        workflow.toggle_flag(&QuestionId::new("q2")).await;
        for _ in 0..30 {
            workflow.tick().await;
        }
    }

    let first = harness.workflow().await;
    let second = harness.workflow().await;

    assert_eq!(first.session().answers(), second.session().answers());
    assert_eq!(first.session().flagged(), second.session().flagged());
    assert_eq!(
        first.session().time_left_seconds(),
        second.session().time_left_seconds()
    );
    assert_eq!(first.session().time_left_seconds(), 45 * 60 - 30);
    assert_eq!(
        first.session().questions().ids(),
        second.session().questions().ids()
    );
}

#[tokio::test]
async fn persisted_question_order_survives_reload() {
    let harness = Harness::new();
    let exam_id = ExamId::new("midterm-1");

    let order = {
        let workflow = harness.workflow().await;
        workflow.session().questions().ids()
    };

    let record = harness
        .progress
        .load_progress(&exam_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.question_ids, order);

    let reloaded = harness.workflow().await;
    assert_eq!(reloaded.session().questions().ids(), order);
}

#[tokio::test]
async fn submit_grades_persists_and_reaches_the_sink() {
    let harness = Harness::new();
    let mut workflow = harness.workflow().await;

    workflow.record_answer(&QuestionId::new("q1"), "A").await;
    workflow.record_answer(&QuestionId::new("q2"), "X").await;
    workflow.record_answer(&QuestionId::new("q3"), "C").await;
    for _ in 0..120 {
        workflow.tick().await;
    }

    let result = workflow.submit().await.unwrap();
    assert_eq!(result.correct_answers, 2);
    assert_eq!(result.wrong_answers, 2);
    assert_eq!(result.score, 50);
    assert_eq!(result.total_questions, 4);
    assert_eq!(result.time_spent, 120);
    assert_eq!(result.exam_title, "Algebra midterm");
    assert_eq!(result.answers.len(), 4);

    let submitted = harness.sink.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0], result);

    let record = harness
        .progress
        .load_progress(&ExamId::new("midterm-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(record.is_submitted);
    assert_eq!(record.score, 2);

    // post-submission immutability survives the workflow layer too
    workflow.record_answer(&QuestionId::new("q4"), "D").await;
    assert_eq!(workflow.session().answers().len(), 3);
    assert!(matches!(
        workflow.submit().await,
        Err(SessionError::AlreadySubmitted)
    ));
}

#[tokio::test]
async fn submitted_attempt_restores_frozen_for_review() {
    let harness = Harness::new();

    {
        let mut workflow = harness.workflow().await;
        workflow.record_answer(&QuestionId::new("q1"), "A").await;
        workflow.submit().await.unwrap();
    }

    let mut restored = harness.workflow().await;
    assert!(restored.session().is_submitted());
    assert_eq!(restored.session().time_left_seconds(), 0);
    assert_eq!(restored.session().score(), 1);
    assert!(restored.session().report().is_some());

    restored.enter_review().await.unwrap();
    restored.record_answer(&QuestionId::new("q2"), "B").await;
    assert_eq!(restored.session().answers().len(), 1);
    restored.navigate(NavigationTarget::Delta(1)).await;
}

#[tokio::test]
async fn retry_resets_to_a_first_ever_load() {
    let harness = Harness::new();
    let mut workflow = harness.workflow().await;

    workflow.record_answer(&QuestionId::new("q1"), "A").await;
    for _ in 0..60 {
        workflow.tick().await;
    }
    workflow.submit().await.unwrap();

    workflow.retry().await.unwrap();

    assert!(!workflow.session().is_submitted());
    assert!(!workflow.session().is_review());
    assert!(workflow.session().answers().is_empty());
    assert!(workflow.session().flagged().is_empty());
    assert_eq!(workflow.session().time_left_seconds(), 45 * 60);
    assert_eq!(workflow.session().score(), 0);
}

#[tokio::test]
async fn unit_source_flattens_into_a_practice_session() {
    use exam_core::model::{Exercise, ExerciseId, Lesson, LessonId};

    let unit = Unit {
        title: "Fractions".into(),
        lessons: vec![Lesson {
            id: LessonId::new("l1"),
            title: None,
            exercises: vec![Exercise {
                id: ExerciseId::new("ex1"),
                questions: vec![question("q1", "A"), question("q2", "B")],
            }],
        }],
    };
    let store = Arc::new(FixtureContentStore::new().with_unit(
        SubjectId::new("math"),
        UnitId::new("u1"),
        unit,
    ));
    let progress = Arc::new(InMemoryProgressRepository::new());
    let sink = Arc::new(RecordingResultSink::new());

    let workflow = ExamWorkflow::load_or_init(
        fixed_clock(),
        store,
        progress,
        sink,
        QuestionSource::Unit {
            unit_id: UnitId::new("u1"),
            subject_id: SubjectId::new("math"),
        },
    )
    .await
    .unwrap();

    assert_eq!(workflow.session().exam_type(), ExamType::Practice);
    assert!(workflow.session().exam_type().reveals_before_submit());
    assert_eq!(workflow.session().questions().len(), 2);
    assert!(
        workflow
            .session()
            .questions()
            .contains(&QuestionId::new("l1-ex1-q1"))
    );
}

#[tokio::test]
async fn missing_content_degrades_to_a_load_error() {
    let store = Arc::new(FixtureContentStore::new());
    let progress = Arc::new(InMemoryProgressRepository::new());
    let sink = Arc::new(RecordingResultSink::new());

    let err = ExamWorkflow::load_or_init(
        fixed_clock(),
        store,
        progress,
        sink,
        QuestionSource::Exam(ExamId::new("missing")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SessionError::Content(_)));
}

/// Repository whose stored snapshot never parses; writes still land in the
/// inner store so the recovery snapshot can be inspected.
struct CorruptSnapshotRepository {
    inner: InMemoryProgressRepository,
}

#[async_trait]
impl ProgressRepository for CorruptSnapshotRepository {
    async fn save_progress(
        &self,
        exam_id: &ExamId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        self.inner.save_progress(exam_id, record).await
    }

    async fn load_progress(
        &self,
        _exam_id: &ExamId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        Err(StorageError::Serialization(
            "expected value at line 1 column 1".into(),
        ))
    }

    async fn delete_progress(&self, exam_id: &ExamId) -> Result<(), StorageError> {
        self.inner.delete_progress(exam_id).await
    }
}

#[tokio::test]
async fn unreadable_snapshot_starts_a_fresh_attempt() {
    let store = Arc::new(FixtureContentStore::new().with_exam(exam_fixture()));
    let repo = Arc::new(CorruptSnapshotRepository {
        inner: InMemoryProgressRepository::new(),
    });

    let workflow = ExamWorkflow::load_or_init(
        fixed_clock(),
        store,
        repo.clone(),
        Arc::new(RecordingResultSink::new()),
        QuestionSource::Exam(ExamId::new("midterm-1")),
    )
    .await
    .expect("unreadable record is discarded, not fatal");

    assert_eq!(workflow.session().time_left_seconds(), 45 * 60);
    assert!(workflow.session().answers().is_empty());
    assert!(workflow.session().flagged().is_empty());
    assert!(!workflow.session().is_submitted());

    // a fresh snapshot replaces the unreadable one
    let record = repo
        .inner
        .load_progress(&ExamId::new("midterm-1"))
        .await
        .unwrap()
        .expect("recovery snapshot written");
    assert!(!record.is_submitted);
    assert_eq!(record.time_left, 45 * 60);
}

struct FailingResultSink;

#[async_trait]
impl ResultSink for FailingResultSink {
    async fn submit_result(&self, _result: &ExamResult) -> Result<(), ResultSubmitError> {
        Err(ResultSubmitError::HttpStatus(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
        ))
    }
}

#[tokio::test]
async fn sink_failure_does_not_block_submission() {
    let store = Arc::new(FixtureContentStore::new().with_exam(exam_fixture()));
    let progress = Arc::new(InMemoryProgressRepository::new());

    let mut workflow = ExamWorkflow::load_or_init(
        fixed_clock(),
        store,
        progress.clone(),
        Arc::new(FailingResultSink),
        QuestionSource::Exam(ExamId::new("midterm-1")),
    )
    .await
    .unwrap();

    workflow.record_answer(&QuestionId::new("q1"), "A").await;
    let result = workflow.submit().await.expect("submit succeeds locally");
    assert_eq!(result.correct_answers, 1);
    assert!(workflow.session().is_submitted());

    let record = progress
        .load_progress(&ExamId::new("midterm-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(record.is_submitted);
}
