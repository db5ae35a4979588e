use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-store identifiers are opaque, author-assigned strings, so every id
/// newtype here wraps a `String` rather than a numeric key.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }
    };
}

string_id!(
    /// Unique identifier for an Exam
    ExamId
);
string_id!(
    /// Unique identifier for a Subject
    SubjectId
);
string_id!(
    /// Unique identifier for a Unit within a subject
    UnitId
);
string_id!(
    /// Unique identifier for a Lesson within a unit
    LessonId
);
string_id!(
    /// Unique identifier for an Exercise within a lesson
    ExerciseId
);
string_id!(
    /// Unique identifier for a Question within a question set
    QuestionId
);

impl QuestionId {
    /// Composite id used when flattening a unit into one question set.
    ///
    /// The `<lesson>-<exercise>-<question>` form guarantees uniqueness across
    /// lessons and exercises that reuse local question ids.
    #[must_use]
    pub fn composite(lesson: &LessonId, exercise: &ExerciseId, question: &QuestionId) -> Self {
        Self(format!("{lesson}-{exercise}-{question}"))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
