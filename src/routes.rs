// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam, results, subjects},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, identity_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, subjects, exam, results, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (backend, live sessions, result cache).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/admin", post(auth::admin_login));

    let subject_routes = Router::new().route("/", get(subjects::list_subjects));

    // Anyone may take an exam; submitting it needs a signed-in identity.
    let exam_routes = Router::new()
        .route("/start/{subject}", post(exam::start_exam))
        .route(
            "/sessions/{id}",
            get(exam::get_session).delete(exam::leave_exam),
        )
        .route("/sessions/{id}/answer", post(exam::select_option))
        .route("/sessions/{id}/review", post(exam::mark_for_review))
        .route("/sessions/{id}/goto", post(exam::go_to_question))
        .route("/sessions/{id}/next", post(exam::next_question))
        .route("/sessions/{id}/previous", post(exam::previous_question))
        .route("/sessions/{id}/submit", post(exam::submit_exam))
        .route("/sessions/{id}/submit/cancel", post(exam::cancel_submit))
        .route("/sessions/{id}/visibility", post(exam::report_visibility))
        .route("/sessions/{id}/dimensions", post(exam::report_dimensions))
        .route("/sessions/{id}/warning/dismiss", post(exam::dismiss_warning))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    let result_routes = Router::new()
        .route("/{attempt_id}", get(results::get_result))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/subjects", post(admin::create_subject))
        .route(
            "/subjects/{id}/questions/import",
            post(admin::import_questions),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/results", result_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{backend::MemoryBackend, config::Config};

    fn app() -> Router {
        let config = Config {
            database_url: String::new(),
            jwt_secret: "router_test_secret".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
        };
        create_router(AppState::new(Arc::new(MemoryBackend::new()), config))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let request = Request::get("/api/exam/sessions/00000000-0000-0000-0000-000000000000")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_on_exam_routes() {
        let request = Request::post("/api/exam/start/math")
            .header("Authorization", "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_need_a_token() {
        let request = Request::post("/api/admin/subjects")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"name":"Physics"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_login_is_disabled_without_credentials() {
        let request = Request::post("/api/auth/admin")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"username":"admin","password":"secret"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }
}
