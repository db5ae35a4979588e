use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ExamId, ExerciseId, LessonId, Question};

/// Exam categories used by the content store.
///
/// The variant only affects presentation (whether explanations may be shown
/// before submission) and the fallback duration; grading is identical across
/// all types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "15-minute")]
    Quick,
    #[serde(rename = "45-minute")]
    Standard,
    #[serde(rename = "midterm-1")]
    Midterm1,
    #[serde(rename = "final-1")]
    Final1,
    #[serde(rename = "midterm-2")]
    Midterm2,
    #[serde(rename = "final-2")]
    Final2,
    #[serde(rename = "practice")]
    Practice,
}

impl ExamType {
    /// Whether correctness and explanations may be revealed before submission.
    #[must_use]
    pub fn reveals_before_submit(self) -> bool {
        matches!(self, ExamType::Practice)
    }

    /// Fallback duration when the exam record carries none.
    #[must_use]
    pub fn default_duration_minutes(self) -> u32 {
        match self {
            ExamType::Quick => 15,
            _ => 45,
        }
    }

    /// Wire name of this type, matching the serde rename.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::Quick => "15-minute",
            ExamType::Standard => "45-minute",
            ExamType::Midterm1 => "midterm-1",
            ExamType::Final1 => "final-1",
            ExamType::Midterm2 => "midterm-2",
            ExamType::Final2 => "final-2",
            ExamType::Practice => "practice",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exam record as served by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub title: String,
    /// Nominal duration in minutes; absent for some practice exams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(rename = "type")]
    pub exam_type: ExamType,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Exam {
    /// Nominal duration in minutes, falling back to the type default.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration
            .unwrap_or_else(|| self.exam_type.default_duration_minutes())
    }
}

/// Unit record for ad-hoc practice sessions: questions are nested under
/// `lessons[].exercises[]` and get flattened by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    #[serde(default)]
    pub questions: Vec<Question>,
}
