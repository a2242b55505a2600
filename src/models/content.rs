// src/models/content.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'content_items' table: one lesson, video, assignment etc.
/// within a course. The catalog is authored by instructors and read by the
/// unlock evaluation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub course_id: i64,
    pub title: String,

    /// Free-form kind tag, e.g. 'lesson', 'video', 'assignment'.
    pub content_type: String,

    pub order_index: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for an instructor adding a content item to a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContentItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub content_type: String,
    pub order_index: Option<i32>,
}
