// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

pub const QUESTION_TYPE_MULTIPLE_CHOICE: &str = "multiple_choice";
pub const QUESTION_TYPE_SHORT_ANSWER: &str = "short_answer";

/// One selectable option of a multiple-choice question.
/// Stored as a JSON array in the database; `is_correct` never leaves the
/// server (see `PublicQuestion`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

/// Represents the 'quiz_questions' table in the database.
///
/// `options` is populated for multiple_choice questions, `correct_answer`
/// for short_answer questions. The column layout permits rows that violate
/// that shape; the grading boundary parses them into a tagged variant and
/// tolerates bad data by awarding no points.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// 'multiple_choice' or 'short_answer'.
    pub question_type: String,

    pub options: Option<Json<Vec<AnswerOption>>>,
    pub correct_answer: Option<String>,

    /// Weight of the question within the quiz.
    pub points: i32,

    pub order_index: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to students (excludes correctness data).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question_text: String,
    /// Option texts only, in authored order.
    pub options: Vec<String>,
    pub points: i32,
    pub order_index: i32,
}

impl From<QuizQuestion> for PublicQuestion {
    fn from(q: QuizQuestion) -> Self {
        let options = q
            .options
            .map(|opts| opts.0.into_iter().map(|o| o.text).collect())
            .unwrap_or_default();

        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            question_text: q.question_text,
            options,
            points: q.points,
            order_index: q.order_index,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_question_shape))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(custom(function = validate_question_type))]
    pub question_type: String,
    pub options: Option<Vec<AnswerOption>>,
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub points: Option<i32>,
    pub order_index: Option<i32>,
}

fn validate_question_type(question_type: &str) -> Result<(), validator::ValidationError> {
    if question_type != QUESTION_TYPE_MULTIPLE_CHOICE && question_type != QUESTION_TYPE_SHORT_ANSWER
    {
        return Err(validator::ValidationError::new("unknown_question_type"));
    }
    Ok(())
}

/// Authoring-time invariants the storage layer does not enforce:
/// a multiple_choice question carries at least two options with exactly one
/// marked correct; a short_answer question carries a non-empty answer key.
fn validate_question_shape(req: &CreateQuestionRequest) -> Result<(), validator::ValidationError> {
    match req.question_type.as_str() {
        QUESTION_TYPE_MULTIPLE_CHOICE => {
            let options = req
                .options
                .as_deref()
                .ok_or_else(|| validator::ValidationError::new("options_required"))?;
            if options.len() < 2 {
                return Err(validator::ValidationError::new("too_few_options"));
            }
            for opt in options {
                if opt.text.is_empty() || opt.text.len() > 500 {
                    return Err(validator::ValidationError::new("invalid_option_text"));
                }
            }
            if options.iter().filter(|o| o.is_correct).count() != 1 {
                return Err(validator::ValidationError::new("exactly_one_correct_option"));
            }
        }
        QUESTION_TYPE_SHORT_ANSWER => {
            let answer = req
                .correct_answer
                .as_deref()
                .ok_or_else(|| validator::ValidationError::new("correct_answer_required"))?;
            if answer.trim().is_empty() || answer.len() > 500 {
                return Err(validator::ValidationError::new("invalid_correct_answer"));
            }
        }
        _ => {} // Rejected by the field-level validator already.
    }
    Ok(())
}

/// DTO for updating a question. Fields are optional; type changes must keep
/// the payload consistent and are re-checked in the handler.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question_text: Option<String>,
    pub options: Option<Vec<AnswerOption>>,
    pub correct_answer: Option<String>,
    pub points: Option<i32>,
    pub order_index: Option<i32>,
}
