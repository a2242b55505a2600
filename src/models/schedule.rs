// src/models/schedule.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'content_schedule_rules' table: one drip policy per gated
/// content item. An item with no rule is available immediately.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentScheduleRule {
    pub id: i64,
    pub course_id: i64,

    /// The content item this rule gates.
    pub content_id: i64,

    /// Days after enrollment before the item unlocks.
    pub unlock_after_days: Option<i32>,

    /// Prerequisite content item that must be completed first.
    pub unlock_after_content_id: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for an instructor creating a schedule rule.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRuleRequest {
    pub content_id: i64,
    #[validate(range(min = 0, max = 3650))]
    pub unlock_after_days: Option<i32>,
    pub unlock_after_content_id: Option<i64>,
}
