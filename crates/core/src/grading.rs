use std::collections::HashMap;

use crate::model::{Question, QuestionId, QuestionOutcome};

/// Deterministic outcome of grading one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    /// Number of questions answered exactly right.
    pub correct_count: usize,
    /// Everything else, unanswered included.
    pub wrong_count: usize,
    /// `correct / total * 100`, rounded half-up; 0 for an empty set.
    pub score_percent: u32,
    pub details: Vec<QuestionOutcome>,
}

/// Grade an attempt against the canonical answers.
///
/// Unanswered questions grade as the empty string and count as wrong.
/// Comparison is exact and case-sensitive; looser policies (trimmed,
/// case-insensitive) belong to practice exercises, never to exam grading.
#[must_use]
pub fn grade(questions: &[Question], answers: &HashMap<QuestionId, String>) -> GradeReport {
    let total = questions.len();
    let mut details = Vec::with_capacity(total);
    let mut correct_count = 0;

    for question in questions {
        let user_answer = answers
            .get(&question.id)
            .map_or("", String::as_str);
        let is_correct = question.answer.matches(user_answer);
        if is_correct {
            correct_count += 1;
        }
        details.push(QuestionOutcome {
            question_id: question.id.clone(),
            user_answer: user_answer.to_string(),
            correct_answer: question.answer.canonical(),
            is_correct,
        });
    }

    GradeReport {
        correct_count,
        wrong_count: total - correct_count,
        score_percent: score_percent(correct_count, total),
        details,
    }
}

/// Percentage of correct answers, rounded half-up on the percentage value.
#[must_use]
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // (correct / total * 100) + 0.5, floored, in integer arithmetic.
    let percent = (correct * 200 + total) / (total * 2);
    u32::try_from(percent).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;

    fn question(id: &str, answer: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            answer: Answer::Single(answer.into()),
            explanation: None,
        }
    }

    #[test]
    fn grades_mixed_attempt_with_unanswered_question() {
        let questions = vec![
            question("q1", "A"),
            question("q2", "B"),
            question("q3", "C"),
            question("q4", "D"),
        ];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new("q1"), "A".to_string());
        answers.insert(QuestionId::new("q2"), "X".to_string());
        answers.insert(QuestionId::new("q3"), "C".to_string());

        let report = grade(&questions, &answers);

        assert_eq!(report.correct_count, 2);
        assert_eq!(report.wrong_count, 2);
        assert_eq!(report.score_percent, 50);

        let q4 = report
            .details
            .iter()
            .find(|d| d.question_id == QuestionId::new("q4"))
            .unwrap();
        assert_eq!(q4.user_answer, "");
        assert!(!q4.is_correct);
    }

    #[test]
    fn empty_question_set_scores_zero() {
        let report = grade(&[], &HashMap::new());
        assert_eq!(report.correct_count, 0);
        assert_eq!(report.wrong_count, 0);
        assert_eq!(report.score_percent, 0);
        assert!(report.details.is_empty());
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(score_percent(1, 8), 13); // 12.5 -> 13
        assert_eq!(score_percent(1, 3), 33); // 33.33 -> 33
        assert_eq!(score_percent(2, 3), 67); // 66.67 -> 67
        assert_eq!(score_percent(3, 3), 100);
    }

    #[test]
    fn grading_is_case_sensitive() {
        let questions = vec![question("q1", "Paris")];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new("q1"), "paris".to_string());

        let report = grade(&questions, &answers);
        assert_eq!(report.correct_count, 0);
    }

    #[test]
    fn multiple_canonical_answers_accept_exact_match_only() {
        let questions = vec![Question {
            id: QuestionId::new("q1"),
            text: "Chemical formula of water?".into(),
            options: Vec::new(),
            answer: Answer::Multiple(vec!["H2O".into(), "water".into()]),
            explanation: None,
        }];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new("q1"), "water".to_string());
        assert_eq!(grade(&questions, &answers).correct_count, 1);

        answers.insert(QuestionId::new("q1"), "Water".to_string());
        assert_eq!(grade(&questions, &answers).correct_count, 0);
    }

    #[test]
    fn detail_rows_follow_question_order() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let report = grade(&questions, &HashMap::new());
        let ids: Vec<_> = report
            .details
            .iter()
            .map(|d| d.question_id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["q1", "q2"]);
    }
}
