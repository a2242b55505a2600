// src/handlers/course.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        content::ContentItem, course::Course, enrollment::Enrollment,
        schedule::ContentScheduleRule,
    },
    unlock,
    utils::jwt::Claims,
};

/// Lists published courses.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, instructor_id, title, description, is_published, created_at
        FROM courses
        WHERE is_published = TRUE
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(courses))
}

/// Enrolls the current student into a published course, stamping the
/// enrollment time that anchors all drip evaluation.
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT id, instructor_id, title, description, is_published, created_at FROM courses WHERE id = $1",
    )
    .bind(course_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !course.is_published {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (course_id, student_id)
        VALUES ($1, $2)
        RETURNING id, course_id, student_id, enrolled_at
        "#,
    )
    .bind(course_id)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Already enrolled in this course".to_string())
        } else {
            tracing::error!("Failed to enroll: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn fetch_enrollment(
    pool: &PgPool,
    course_id: i64,
    student_id: i64,
) -> Result<Enrollment, AppError> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT id, course_id, student_id, enrolled_at FROM enrollments WHERE course_id = $1 AND student_id = $2",
    )
    .bind(course_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Forbidden("Not enrolled in this course".to_string()))
}

/// The student-facing content list: every item of the course with its
/// current lock state and, for time-gated items, the unlock date and a
/// countdown string. Evaluated fresh on every request.
pub async fn course_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    let enrollment = fetch_enrollment(&pool, course_id, student_id).await?;

    let items = sqlx::query_as::<_, ContentItem>(
        r#"
        SELECT id, course_id, title, content_type, order_index, created_at
        FROM content_items
        WHERE course_id = $1
        ORDER BY order_index ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let rules: HashMap<i64, ContentScheduleRule> = sqlx::query_as::<_, ContentScheduleRule>(
        r#"
        SELECT id, course_id, content_id, unlock_after_days, unlock_after_content_id, created_at
        FROM content_schedule_rules
        WHERE course_id = $1
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|rule| (rule.content_id, rule))
    .collect();

    let completed: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT cc.content_id
        FROM content_completions cc
        JOIN content_items ci ON cc.content_id = ci.id
        WHERE cc.student_id = $1 AND ci.course_id = $2
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .collect();

    let access = unlock::evaluate_course_content(
        &items,
        &rules,
        enrollment.enrolled_at,
        &completed,
        chrono::Utc::now(),
    );

    Ok(Json(access))
}

/// Marks a content item as completed by the current student. The first
/// completion timestamp wins; repeat calls are no-ops.
pub async fn complete_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();
    fetch_enrollment(&pool, course_id, student_id).await?;

    let item_exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM content_items WHERE id = $1 AND course_id = $2",
    )
    .bind(content_id)
    .bind(course_id)
    .fetch_optional(&pool)
    .await?;

    if item_exists.is_none() {
        return Err(AppError::NotFound("Content item not found".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO content_completions (content_id, student_id)
        VALUES ($1, $2)
        ON CONFLICT (content_id, student_id) DO NOTHING
        "#,
    )
    .bind(content_id)
    .bind(student_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record completion: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}
