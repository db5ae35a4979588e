#![forbid(unsafe_code)]

pub mod content_store;
pub mod error;
pub mod loader;
pub mod result_sink;
pub mod sessions;

pub use exam_core::Clock;

pub use content_store::{ContentStore, FixtureContentStore, HttpContentStore};
pub use error::{ContentError, ResultSubmitError, SessionError};
pub use loader::{LoadedExam, QuestionSetLoader, QuestionSource, establish_order};
pub use result_sink::{HttpResultSink, RecordingResultSink, ResultSink};
pub use sessions::{
    ExamSession, ExamWorkflow, NavigationTarget, SessionProgress, TimePressure,
};
