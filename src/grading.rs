// src/grading.rs
//
// Pure scoring core for quiz attempts. Handlers fetch the rows; everything
// here is a deterministic function of questions + answers.

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::question::{
        AnswerOption, QUESTION_TYPE_MULTIPLE_CHOICE, QUESTION_TYPE_SHORT_ANSWER, QuizQuestion,
    },
};

/// Applied when a quiz has no explicit passing_score.
pub const DEFAULT_PASSING_SCORE: i32 = 70;

/// A question in gradable form: the loose storage row parsed once into a
/// tagged variant so scoring never touches raw JSON.
#[derive(Debug, Clone)]
pub struct GradableQuestion {
    pub id: i64,
    pub points: i32,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone)]
pub enum QuestionKind {
    MultipleChoice { options: Vec<AnswerOption> },
    ShortAnswer { correct_answer: String },
}

impl TryFrom<&QuizQuestion> for GradableQuestion {
    type Error = AppError;

    fn try_from(row: &QuizQuestion) -> Result<Self, Self::Error> {
        let kind = match row.question_type.as_str() {
            QUESTION_TYPE_MULTIPLE_CHOICE => QuestionKind::MultipleChoice {
                // A missing options column grades like an empty option list:
                // the question can never award points.
                options: row.options.as_ref().map(|o| o.0.clone()).unwrap_or_default(),
            },
            QUESTION_TYPE_SHORT_ANSWER => QuestionKind::ShortAnswer {
                correct_answer: row.correct_answer.clone().unwrap_or_default(),
            },
            other => {
                return Err(AppError::InternalServerError(format!(
                    "Unknown question type '{}' for question {}",
                    other, row.id
                )));
            }
        };

        Ok(GradableQuestion {
            id: row.id,
            points: row.points,
            kind,
        })
    }
}

/// Outcome of grading one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeResult {
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
}

/// Short-answer comparison key: case-insensitive, ignoring surrounding
/// whitespace. No partial credit or fuzzy matching beyond that.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Points earned for a single question. A missing answer is simply wrong,
/// never an error. A multiple-choice question whose data flags no option as
/// correct awards nothing.
fn earned_points(question: &GradableQuestion, answer: Option<&str>) -> i32 {
    let Some(answer) = answer else {
        return 0;
    };

    let correct = match &question.kind {
        QuestionKind::MultipleChoice { options } => options
            .iter()
            .find(|o| o.is_correct)
            .is_some_and(|o| o.text == answer),
        QuestionKind::ShortAnswer { correct_answer } => {
            normalize_answer(answer) == normalize_answer(correct_answer)
        }
    };

    if correct { question.points } else { 0 }
}

/// Grades a full attempt.
///
/// `max_score` sums over every question in the quiz regardless of how many
/// were answered. A quiz with no questions grades to 0% rather than
/// dividing by zero.
pub fn grade(
    questions: &[GradableQuestion],
    answers: &HashMap<i64, String>,
    passing_score: Option<i32>,
) -> GradeResult {
    let max_score: i32 = questions.iter().map(|q| q.points).sum();
    let score: i32 = questions
        .iter()
        .map(|q| earned_points(q, answers.get(&q.id).map(String::as_str)))
        .sum();

    let percentage = if max_score == 0 {
        0.0
    } else {
        f64::from(score) / f64::from(max_score) * 100.0
    };

    let threshold = passing_score.unwrap_or(DEFAULT_PASSING_SCORE);
    let passed = percentage >= f64::from(threshold);

    GradeResult {
        score,
        max_score,
        percentage,
        passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multiple_choice(id: i64, points: i32, correct: &str, wrong: &[&str]) -> GradableQuestion {
        let mut options = vec![AnswerOption {
            text: correct.to_string(),
            is_correct: true,
        }];
        options.extend(wrong.iter().map(|w| AnswerOption {
            text: (*w).to_string(),
            is_correct: false,
        }));
        GradableQuestion {
            id,
            points,
            kind: QuestionKind::MultipleChoice { options },
        }
    }

    fn short_answer(id: i64, points: i32, correct: &str) -> GradableQuestion {
        GradableQuestion {
            id,
            points,
            kind: QuestionKind::ShortAnswer {
                correct_answer: correct.to_string(),
            },
        }
    }

    fn answers(pairs: &[(i64, &str)]) -> HashMap<i64, String> {
        pairs.iter().map(|(id, a)| (*id, (*a).to_string())).collect()
    }

    #[test]
    fn test_grade_all_correct() {
        // Two questions: 1pt multiple choice, 2pt short answer.
        let questions = vec![
            multiple_choice(1, 1, "Paris", &["London", "Berlin"]),
            short_answer(2, 2, "42"),
        ];
        let result = grade(&questions, &answers(&[(1, "Paris"), (2, "42")]), None);

        assert_eq!(result.score, 3);
        assert_eq!(result.max_score, 3);
        assert_eq!(result.percentage, 100.0);
        assert!(result.passed);
    }

    #[test]
    fn test_grade_partially_wrong_fails_default_threshold() {
        let questions = vec![
            multiple_choice(1, 1, "Paris", &["London", "Berlin"]),
            short_answer(2, 2, "42"),
        ];
        // Wrong option text on question 1: 2 of 3 points, 66.7% < 70%.
        let result = grade(&questions, &answers(&[(1, "London"), (2, "42")]), None);

        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 3);
        assert!((result.percentage - 66.6666).abs() < 0.01);
        assert!(!result.passed);
    }

    #[test]
    fn test_short_answer_normalization() {
        let questions = vec![short_answer(1, 1, "Paris")];

        for submitted in ["Paris ", " paris", "PARIS", "\tParis\n"] {
            let result = grade(&questions, &answers(&[(1, submitted)]), None);
            assert_eq!(result.score, 1, "'{}' should match", submitted);
        }

        let result = grade(&questions, &answers(&[(1, "Pariss")]), None);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_multiple_choice_exact_text_only() {
        let questions = vec![multiple_choice(1, 5, "Paris", &["London"])];

        // Case differences do NOT match for multiple choice.
        let result = grade(&questions, &answers(&[(1, "paris")]), None);
        assert_eq!(result.score, 0);

        // Matching a wrong option's text earns nothing.
        let result = grade(&questions, &answers(&[(1, "London")]), None);
        assert_eq!(result.score, 0);

        let result = grade(&questions, &answers(&[(1, "Paris")]), None);
        assert_eq!(result.score, 5);
    }

    #[test]
    fn test_missing_answers_count_zero_but_full_max_score() {
        let questions = vec![
            short_answer(1, 2, "a"),
            short_answer(2, 3, "b"),
            short_answer(3, 5, "c"),
        ];
        let result = grade(&questions, &answers(&[(1, "a")]), None);

        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 10);
        assert!(!result.passed);
    }

    #[test]
    fn test_no_correct_option_awards_nothing() {
        let questions = vec![GradableQuestion {
            id: 1,
            points: 4,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    AnswerOption { text: "A".to_string(), is_correct: false },
                    AnswerOption { text: "B".to_string(), is_correct: false },
                ],
            },
        }];
        let result = grade(&questions, &answers(&[(1, "A")]), None);
        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, 4);
    }

    #[test]
    fn test_empty_quiz_is_zero_percent_not_division_by_zero() {
        let result = grade(&[], &HashMap::new(), None);
        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, 0);
        assert_eq!(result.percentage, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn test_custom_passing_score_boundary() {
        let questions = vec![short_answer(1, 1, "a"), short_answer(2, 1, "b")];
        let submitted = answers(&[(1, "a")]);

        // 50% exactly meets a threshold of 50.
        let result = grade(&questions, &submitted, Some(50));
        assert!(result.passed);

        let result = grade(&questions, &submitted, Some(51));
        assert!(!result.passed);
    }

    #[test]
    fn test_unknown_question_type_rejected_at_parse() {
        let row = QuizQuestion {
            id: 9,
            quiz_id: 1,
            question_text: "?".to_string(),
            question_type: "essay".to_string(),
            options: None,
            correct_answer: None,
            points: 1,
            order_index: 0,
            created_at: None,
        };
        assert!(GradableQuestion::try_from(&row).is_err());
    }
}
