// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'enrollments' table. The enrollment timestamp anchors all
/// time-based drip evaluation for the student.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'content_completions' table: one row per content item a
/// student has finished. Input to prerequisite-based unlock rules.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentCompletion {
    pub id: i64,
    pub content_id: i64,
    pub student_id: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
