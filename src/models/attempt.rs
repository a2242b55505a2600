// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'quiz_attempts' table in the database.
///
/// An attempt moves through exactly two states: in-progress (created by
/// start, `submitted_at` NULL) and graded (one-time transition at
/// submission, after which the row is immutable).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,

    /// question_id -> raw student answer text.
    pub answers: Json<HashMap<i64, String>>,

    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub passed: Option<bool>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Lifecycle state derived from `submitted_at`. Submission is only legal
/// from `InProgress`; a `Graded` attempt can never be re-graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress,
    Graded,
}

impl QuizAttempt {
    pub fn state(&self) -> AttemptState {
        if self.submitted_at.is_some() {
            AttemptState::Graded
        } else {
            AttemptState::InProgress
        }
    }
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: User's answer text (selected option text or free-form answer)
    pub answers: HashMap<i64, String>,
}

/// One row of an instructor's grading view: a graded attempt joined with
/// the student's username.
#[derive(Debug, Serialize, FromRow)]
pub struct GradedAttemptEntry {
    pub attempt_id: i64,
    pub student_id: i64,
    pub username: String,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub passed: Option<bool>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_state_follows_submitted_at() {
        let mut attempt = QuizAttempt {
            id: 1,
            quiz_id: 1,
            student_id: 1,
            started_at: chrono::Utc::now(),
            submitted_at: None,
            answers: Json(HashMap::new()),
            score: None,
            max_score: None,
            passed: None,
            graded_at: None,
        };
        assert_eq!(attempt.state(), AttemptState::InProgress);

        attempt.submitted_at = Some(chrono::Utc::now());
        assert_eq!(attempt.state(), AttemptState::Graded);
    }
}
