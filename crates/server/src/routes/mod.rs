use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod attendance;
pub mod auth;
mod health;
mod sessions;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Identity
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Session registry
        .route("/generate_qr", post(sessions::generate_qr))
        .route("/qrcodes", get(sessions::list_qrcodes))
        // Attendance ledger
        .route("/attendance", post(attendance::mark_attendance))
        .route("/attendance/:course", get(attendance::get_attendance_by_course))
        .route("/attendances", get(attendance::get_all_attendances))
        // Reconciler
        .route("/confirm_attendance", post(attendance::confirm_attendance))
        .route("/absentees", get(attendance::get_absentees))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db::Database};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let db = Database::in_memory().await.unwrap();
        create_router(AppState::new(db, Config::default()))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, email: &str, role: &str) {
        let (status, _) = send(
            app,
            post(
                "/register",
                json!({ "email": email, "password": "pw123456", "role": role }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let app = test_app().await;
        register(&app, "s@school.edu", "student").await;

        let (status, body) = send(
            &app,
            post(
                "/register",
                json!({ "email": "s@school.edu", "password": "other", "role": "teacher" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already taken");
    }

    #[tokio::test]
    async fn register_defaults_to_student_role() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            post(
                "/register",
                json!({ "email": "s@school.edu", "password": "pw123456" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "student");
    }

    #[tokio::test]
    async fn login_issues_bearer_token() {
        let app = test_app().await;
        register(&app, "s@school.edu", "student").await;

        let (status, body) = send(
            &app,
            post(
                "/login",
                json!({ "email": "s@school.edu", "password": "pw123456" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        let claims = auth::verify_token(
            body["access_token"].as_str().unwrap(),
            &Config::default().auth.jwt_secret,
        )
        .unwrap();
        assert_eq!(claims.sub, "s@school.edu");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = test_app().await;
        register(&app, "s@school.edu", "student").await;

        let (status, _) = send(
            &app,
            post(
                "/login",
                json!({ "email": "s@school.edu", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn generate_qr_requires_a_known_teacher() {
        let app = test_app().await;
        register(&app, "s@school.edu", "student").await;

        let (status, _) = send(
            &app,
            post(
                "/generate_qr",
                json!({ "email": "ghost@school.edu", "course": "Math101", "qr_value": "tok1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            post(
                "/generate_qr",
                json!({ "email": "s@school.edu", "course": "Math101", "qr_value": "tok1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Only teachers can generate QR codes");
    }

    #[tokio::test]
    async fn generate_qr_rejects_duplicate_token() {
        let app = test_app().await;
        register(&app, "t@school.edu", "teacher").await;

        let qr = json!({ "email": "t@school.edu", "course": "Math101", "qr_value": "tok1" });
        let (status, _) = send(&app, post("/generate_qr", qr.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, post("/generate_qr", qr)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "QR Code already exists");
    }

    #[tokio::test]
    async fn qrcodes_list_carries_teacher_email() {
        let app = test_app().await;
        register(&app, "t@school.edu", "teacher").await;
        send(
            &app,
            post(
                "/generate_qr",
                json!({ "email": "t@school.edu", "course": "Math101", "qr_value": "tok1" }),
            ),
        )
        .await;

        let (status, body) = send(&app, get_req("/qrcodes")).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["teacher_email"], "t@school.edu");
        assert_eq!(list[0]["course"], "Math101");
    }

    #[tokio::test]
    async fn mark_attendance_rejects_non_students() {
        let app = test_app().await;
        register(&app, "t@school.edu", "teacher").await;

        let (status, _) = send(
            &app,
            post(
                "/attendance",
                json!({ "email": "t@school.edu", "course": "Math101" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn confirm_attendance_requires_both_fields() {
        let app = test_app().await;

        let (status, body) = send(
            &app,
            post("/confirm_attendance", json!({ "email": "s@school.edu" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and course are required");
    }

    #[tokio::test]
    async fn pending_then_confirm_keeps_a_single_record() {
        let app = test_app().await;
        register(&app, "s@school.edu", "student").await;

        let mark = json!({ "email": "s@school.edu", "course": "Math101" });
        let (status, _) = send(&app, post("/attendance", mark.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, post("/confirm_attendance", mark.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Attendance confirmed successfully");

        let (_, body) = send(&app, post("/confirm_attendance", mark)).await;
        assert_eq!(body["message"], "Attendance already confirmed");

        let (status, body) = send(&app, get_req("/attendance/Math101")).await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["confirmed"], true);
    }

    #[tokio::test]
    async fn absentees_end_to_end() {
        let app = test_app().await;
        register(&app, "t@school.edu", "teacher").await;
        register(&app, "present@school.edu", "student").await;
        register(&app, "absent@school.edu", "student").await;

        // No sessions yet: informational result, not a list.
        let (status, body) = send(&app, get_req("/absentees")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "No course sessions have been held yet");

        send(
            &app,
            post(
                "/generate_qr",
                json!({ "email": "t@school.edu", "course": "Math101", "qr_value": "tok1" }),
            ),
        )
        .await;
        send(
            &app,
            post(
                "/confirm_attendance",
                json!({ "email": "present@school.edu", "course": "Math101" }),
            ),
        )
        .await;

        let (status, body) = send(&app, get_req("/absentees")).await;
        assert_eq!(status, StatusCode::OK);
        let absentees = body.as_array().unwrap();
        assert_eq!(absentees.len(), 1);
        assert_eq!(absentees[0]["email"], "absent@school.edu");
        assert_eq!(absentees[0]["absences"], 1);
    }
}
