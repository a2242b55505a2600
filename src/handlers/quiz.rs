// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use sqlx::types::Json as SqlJson;

use crate::{
    error::AppError,
    grading::{self, GradableQuestion},
    models::{
        attempt::{AttemptState, QuizAttempt, SubmitAttemptRequest},
        question::{PublicQuestion, QuizQuestion},
        quiz::Quiz,
    },
    utils::jwt::Claims,
};

const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, student_id, started_at, submitted_at, answers, score, max_score, passed, graded_at";

/// Loads a quiz students are allowed to see: it must exist and be published.
async fn fetch_published_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
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

    if !quiz.is_published {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(quiz)
}

async fn fetch_quiz_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<QuizQuestion>, AppError> {
    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_text, question_type, options, correct_answer,
               points, order_index, created_at
        FROM quiz_questions
        WHERE quiz_id = $1
        ORDER BY order_index ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Returns the questions of a published quiz in authored order, with
/// correctness data stripped. The time limit rides along so the client can
/// run its countdown; the server does not enforce the deadline.
pub async fn get_quiz_questions(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_published_quiz(&pool, quiz_id).await?;
    let questions = fetch_quiz_questions(&pool, quiz_id).await?;

    let public_questions: Vec<PublicQuestion> =
        questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(serde_json::json!({
        "quiz_id": quiz.id,
        "title": quiz.title,
        "time_limit_minutes": quiz.time_limit_minutes,
        "max_attempts": quiz.max_attempts,
        "questions": public_questions,
    })))
}

/// Starts a new attempt for the current student.
///
/// Rejected with `AttemptLimitExceeded` once the student has used
/// `max_attempts` slots; the limit-th attempt itself is still allowed.
/// There is no locking across concurrent starts.
pub async fn start_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_published_quiz(&pool, quiz_id).await?;
    let student_id = claims.user_id();

    let prior_attempts = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2",
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_one(&pool)
    .await?;

    if prior_attempts >= i64::from(quiz.max_attempts) {
        return Err(AppError::AttemptLimitExceeded);
    }

    let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
        r#"
        INSERT INTO quiz_attempts (quiz_id, student_id)
        VALUES ($1, $2)
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(quiz_id)
    .bind(student_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create attempt: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(
        "Student {} started attempt {} on quiz {}",
        student_id,
        attempt.id,
        quiz_id
    );

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submits and grades an attempt.
///
/// The question set is loaded fresh at submission time, so `max_score`
/// reflects the quiz as it exists now, not as it existed at start. The
/// in-progress -> graded transition happens exactly once; a second submit
/// is rejected with `AlreadySubmitted`.
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, attempt_id)): Path<(i64, i64)>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_published_quiz(&pool, quiz_id).await?;
    let student_id = claims.user_id();

    let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
        r#"
        SELECT {ATTEMPT_COLUMNS}
        FROM quiz_attempts
        WHERE id = $1 AND quiz_id = $2 AND student_id = $3
        "#
    ))
    .bind(attempt_id)
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.state() == AttemptState::Graded {
        return Err(AppError::AlreadySubmitted);
    }

    let questions = fetch_quiz_questions(&pool, quiz_id).await?;
    let gradable: Vec<GradableQuestion> = questions
        .iter()
        .map(GradableQuestion::try_from)
        .collect::<Result<_, _>>()?;

    let result = grading::grade(&gradable, &req.answers, quiz.passing_score);

    // The submitted_at IS NULL guard closes the race against a concurrent
    // submit of the same attempt.
    let graded = sqlx::query_as::<_, QuizAttempt>(&format!(
        r#"
        UPDATE quiz_attempts
        SET answers = $1, score = $2, max_score = $3, passed = $4,
            submitted_at = NOW(), graded_at = NOW()
        WHERE id = $5 AND submitted_at IS NULL
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(SqlJson(&req.answers))
    .bind(result.score)
    .bind(result.max_score)
    .bind(result.passed)
    .bind(attempt_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to grade attempt {}: {:?}", attempt_id, e);
        AppError::from(e)
    })?
    .ok_or(AppError::AlreadySubmitted)?;

    tracing::info!(
        "Graded attempt {}: {}/{} (passed: {})",
        attempt_id,
        result.score,
        result.max_score,
        result.passed
    );

    Ok(Json(serde_json::json!({
        "attempt": graded,
        "percentage": result.percentage,
        "message": if result.passed { "Quiz passed" } else { "Quiz not passed" },
    })))
}

/// Lists the current student's attempts at a quiz, most recent first.
/// Feeds the history/best-score view and the remaining-attempts display.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
        r#"
        SELECT {ATTEMPT_COLUMNS}
        FROM quiz_attempts
        WHERE quiz_id = $1 AND student_id = $2
        ORDER BY started_at DESC
        "#
    ))
    .bind(quiz_id)
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}
