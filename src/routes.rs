// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, course, instructor, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, quizzes, instructor, admin).
/// * Applies global middleware (Trace, CORS) and rate limiting on the
///   credential endpoints.
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(30)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        // Enrollment, content listing and progress need an identity
        .merge(
            Router::new()
                .route("/{id}/enroll", post(course::enroll))
                .route("/{id}/content", get(course::course_content))
                .route(
                    "/{id}/content/{content_id}/complete",
                    post(course::complete_content),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/{id}/questions", get(quiz::get_quiz_questions))
        .route(
            "/{id}/attempts",
            post(quiz::start_attempt).get(quiz::list_my_attempts),
        )
        .route(
            "/{id}/attempts/{attempt_id}/submit",
            post(quiz::submit_attempt),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let instructor_routes = Router::new()
        .route("/courses", post(instructor::create_course))
        .route(
            "/courses/{id}/content",
            post(instructor::create_content_item),
        )
        .route(
            "/courses/{id}/content/{content_id}",
            delete(instructor::delete_content_item),
        )
        .route(
            "/courses/{id}/schedule-rules",
            get(instructor::list_schedule_rules).post(instructor::create_schedule_rule),
        )
        .route(
            "/courses/{id}/schedule-rules/{rule_id}",
            delete(instructor::delete_schedule_rule),
        )
        .route("/courses/{id}/quizzes", post(instructor::create_quiz))
        .route(
            "/quizzes/{id}",
            put(instructor::update_quiz).delete(instructor::delete_quiz),
        )
        .route("/quizzes/{id}/questions", post(instructor::create_question))
        .route(
            "/quizzes/{id}/attempts",
            get(instructor::list_quiz_attempts),
        )
        .route(
            "/questions/{id}",
            put(instructor::update_question).delete(instructor::delete_question),
        )
        // Double middleware protection: Auth first, then role check
        .layer(middleware::from_fn(instructor_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/instructor", instructor_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
