mod exam;
mod ids;
mod question;
mod question_set;
mod result;

pub use exam::{Exam, ExamType, Exercise, Lesson, Unit};
pub use ids::{ExamId, ExerciseId, LessonId, QuestionId, SubjectId, UnitId};
pub use question::{Answer, Question};
pub use question_set::{QuestionSet, QuestionSetError};
pub use result::{ExamResult, QuestionOutcome};
