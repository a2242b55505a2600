// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,

    /// Minimum percentage required to pass. NULL means the engine default
    /// of 70 applies at grading time.
    pub passing_score: Option<i32>,

    /// How many attempts a student gets at this quiz.
    pub max_attempts: i32,

    /// Advisory countdown for the client. The server grades late
    /// submissions normally.
    pub time_limit_minutes: Option<i32>,

    pub is_published: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for an instructor creating a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i32>,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit_minutes: Option<i32>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i32>,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit_minutes: Option<i32>,
    pub is_published: Option<bool>,
}
