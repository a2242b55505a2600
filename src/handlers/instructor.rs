// src/handlers/instructor.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::GradedAttemptEntry,
        content::CreateContentItemRequest,
        course::{Course, CreateCourseRequest},
        question::{
            CreateQuestionRequest, QuizQuestion, UpdateQuestionRequest,
        },
        quiz::{CreateQuizRequest, Quiz, UpdateQuizRequest},
        schedule::{ContentScheduleRule, CreateScheduleRuleRequest},
    },
    utils::jwt::Claims,
};

/// Loads a course and checks the caller may author it: the owning
/// instructor, or an admin.
async fn require_course_owner(
    pool: &PgPool,
    course_id: i64,
    claims: &Claims,
) -> Result<Course, AppError> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT id, instructor_id, title, description, is_published, created_at FROM courses WHERE id = $1",
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if claims.role != "admin" && course.instructor_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "You do not own this course".to_string(),
        ));
    }

    Ok(course)
}

/// Loads a quiz and checks course ownership through its course.
async fn require_quiz_owner(
    pool: &PgPool,
    quiz_id: i64,
    claims: &Claims,
) -> Result<Quiz, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, course_id, title, passing_score, max_attempts, time_limit_minutes,
               is_published, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    require_course_owner(pool, quiz.course_id, claims).await?;

    Ok(quiz)
}

/// Creates a new course owned by the calling instructor.
pub async fn create_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (instructor_id, title, description, is_published)
        VALUES ($1, $2, $3, $4)
        RETURNING id, instructor_id, title, description, is_published, created_at
        "#,
    )
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.is_published.unwrap_or(false))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Adds a content item to an owned course.
pub async fn create_content_item(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateContentItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    require_course_owner(&pool, course_id, &claims).await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO content_items (course_id, title, content_type, order_index)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(&payload.title)
    .bind(&payload.content_type)
    .bind(payload.order_index.unwrap_or(0))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create content item: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Removes a content item (cascade removes its schedule rule and
/// completions).
pub async fn delete_content_item(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_course_owner(&pool, course_id, &claims).await?;

    let result = sqlx::query("DELETE FROM content_items WHERE id = $1 AND course_id = $2")
        .bind(content_id)
        .bind(course_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete content item: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Content item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the drip rules of an owned course.
pub async fn list_schedule_rules(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_course_owner(&pool, course_id, &claims).await?;

    let rules = sqlx::query_as::<_, ContentScheduleRule>(
        r#"
        SELECT id, course_id, content_id, unlock_after_days, unlock_after_content_id, created_at
        FROM content_schedule_rules
        WHERE course_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rules))
}

/// Creates a drip rule for a content item of an owned course. Both the
/// gated item and any prerequisite must belong to the course.
pub async fn create_schedule_rule(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateScheduleRuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.unlock_after_days.is_none() && payload.unlock_after_content_id.is_none() {
        return Err(AppError::BadRequest(
            "A schedule rule needs a day count or a prerequisite".to_string(),
        ));
    }

    require_course_owner(&pool, course_id, &claims).await?;

    for item_id in [Some(payload.content_id), payload.unlock_after_content_id]
        .into_iter()
        .flatten()
    {
        let belongs = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM content_items WHERE id = $1 AND course_id = $2",
        )
        .bind(item_id)
        .bind(course_id)
        .fetch_optional(&pool)
        .await?;

        if belongs.is_none() {
            return Err(AppError::BadRequest(format!(
                "Content item {} does not belong to course {}",
                item_id, course_id
            )));
        }
    }

    let rule = sqlx::query_as::<_, ContentScheduleRule>(
        r#"
        INSERT INTO content_schedule_rules (course_id, content_id, unlock_after_days, unlock_after_content_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, course_id, content_id, unlock_after_days, unlock_after_content_id, created_at
        "#,
    )
    .bind(course_id)
    .bind(payload.content_id)
    .bind(payload.unlock_after_days)
    .bind(payload.unlock_after_content_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Content item already has a schedule rule".to_string())
        } else {
            tracing::error!("Failed to create schedule rule: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(rule)))
}

/// Deletes a drip rule; the gated item becomes immediately available.
pub async fn delete_schedule_rule(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, rule_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_course_owner(&pool, course_id, &claims).await?;

    let result =
        sqlx::query("DELETE FROM content_schedule_rules WHERE id = $1 AND course_id = $2")
            .bind(rule_id)
            .bind(course_id)
            .execute(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete schedule rule: {:?}", e);
                AppError::from(e)
            })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Schedule rule not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a quiz in an owned course. Quizzes start unpublished.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    require_course_owner(&pool, course_id, &claims).await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (course_id, title, passing_score, max_attempts, time_limit_minutes)
        VALUES ($1, $2, $3, COALESCE($4, 3), $5)
        RETURNING id, course_id, title, passing_score, max_attempts, time_limit_minutes,
                  is_published, created_at
        "#,
    )
    .bind(course_id)
    .bind(&payload.title)
    .bind(payload.passing_score)
    .bind(payload.max_attempts)
    .bind(payload.time_limit_minutes)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates quiz settings, including publishing. Fields are optional.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    require_quiz_owner(&pool, quiz_id, &claims).await?;

    if payload.title.is_none()
        && payload.passing_score.is_none()
        && payload.max_attempts.is_none()
        && payload.time_limit_minutes.is_none()
        && payload.is_published.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(passing_score) = payload.passing_score {
        separated.push("passing_score = ");
        separated.push_bind_unseparated(passing_score);
    }

    if let Some(max_attempts) = payload.max_attempts {
        separated.push("max_attempts = ");
        separated.push_bind_unseparated(max_attempts);
    }

    if let Some(time_limit_minutes) = payload.time_limit_minutes {
        separated.push("time_limit_minutes = ");
        separated.push_bind_unseparated(time_limit_minutes);
    }

    if let Some(is_published) = payload.is_published {
        separated.push("is_published = ");
        separated.push_bind_unseparated(is_published);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(quiz_id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a quiz and, via cascade, its questions and attempts.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_quiz_owner(&pool, quiz_id, &claims).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to an owned quiz. The request validator enforces the
/// shape invariants (exactly one correct option, non-empty answer key)
/// that the storage layer doesn't.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    require_quiz_owner(&pool, quiz_id, &claims).await?;

    let options_json = payload
        .options
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    let question = sqlx::query_as::<_, QuizQuestion>(
        r#"
        INSERT INTO quiz_questions
        (quiz_id, question_text, question_type, options, correct_answer, points, order_index)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, 1), COALESCE($7, 0))
        RETURNING id, quiz_id, question_text, question_type, options, correct_answer,
                  points, order_index, created_at
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(options_json)
    .bind(&payload.correct_answer)
    .bind(payload.points)
    .bind(payload.order_index)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question. The merged row is re-validated so an edit cannot
/// break the shape invariants either.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_text, question_type, options, correct_answer,
               points, order_index, created_at
        FROM quiz_questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    require_quiz_owner(&pool, existing.quiz_id, &claims).await?;

    let merged = CreateQuestionRequest {
        question_text: payload
            .question_text
            .unwrap_or_else(|| existing.question_text.clone()),
        question_type: existing.question_type.clone(),
        options: payload
            .options
            .or_else(|| existing.options.as_ref().map(|o| o.0.clone())),
        correct_answer: payload.correct_answer.or_else(|| existing.correct_answer.clone()),
        points: Some(payload.points.unwrap_or(existing.points)),
        order_index: Some(payload.order_index.unwrap_or(existing.order_index)),
    };

    if let Err(validation_errors) = merged.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let options_json = merged
        .options
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    sqlx::query(
        r#"
        UPDATE quiz_questions
        SET question_text = $1, options = $2, correct_answer = $3, points = $4, order_index = $5
        WHERE id = $6
        "#,
    )
    .bind(&merged.question_text)
    .bind(options_json)
    .bind(&merged.correct_answer)
    .bind(merged.points)
    .bind(merged.order_index)
    .bind(question_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a question.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let existing = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_text, question_type, options, correct_answer,
               points, order_index, created_at
        FROM quiz_questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    require_quiz_owner(&pool, existing.quiz_id, &claims).await?;

    sqlx::query("DELETE FROM quiz_questions WHERE id = $1")
        .bind(question_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// The grading view: every attempt at an owned quiz joined with student
/// usernames, newest first.
pub async fn list_quiz_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_quiz_owner(&pool, quiz_id, &claims).await?;

    let attempts = sqlx::query_as::<_, GradedAttemptEntry>(
        r#"
        SELECT a.id as attempt_id, a.student_id, u.username,
               a.score, a.max_score, a.passed, a.started_at, a.submitted_at
        FROM quiz_attempts a
        JOIN users u ON a.student_id = u.id
        WHERE a.quiz_id = $1
        ORDER BY a.started_at DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quiz attempts: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(attempts))
}
