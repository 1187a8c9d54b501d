//! Integration tests for the Lumen HTTP API
//!
//! Drives the full router with `tower::ServiceExt::oneshot` against a fresh
//! in-memory SQLite database per test.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use lumen_common::{
    auth::{hash_password, scopes_for},
    config::{AppConfig, DatabaseConfig},
    db::{schema, DbPool, NewUser, Repository},
    errors::{AppError, Result as AppResult},
    mail::{LogMailer, Mailer, OutgoingEmail},
};
use lumen_gateway::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

/// Mailer that records what it was asked to send, or always fails
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Email {
                message: "mail API unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "recording"
    }
}

struct TestApp {
    router: Router,
    repo: Repository,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_mailer(Arc::new(LogMailer::new("reports@lumen.test"))).await
    }

    async fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        let mut config = AppConfig::default();
        config.database = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..DatabaseConfig::default()
        };
        config.auth.jwt_secret = Some("integration-test-secret".to_string());
        config.rate_limit.enabled = false;

        let db = DbPool::new(&config.database).await.expect("sqlite pool");
        schema::create_schema(db.write()).await.expect("schema");

        let state = AppState::new(config, db.clone(), mailer).expect("state");
        Self {
            router: create_router(state.clone()),
            repo: Repository::new(db),
            state,
        }
    }

    async fn user(&self, name: &str, admin: bool) -> (Uuid, String) {
        let user = self
            .repo
            .create_user(NewUser {
                email: format!("{}@example.com", name),
                username: name.to_string(),
                first_name: name.to_string(),
                last_name: "Tester".to_string(),
                password_hash: hash_password("password123").unwrap(),
                is_staff: admin,
                is_superuser: admin,
            })
            .await
            .unwrap();

        let token = self
            .state
            .jwt
            .generate_token(user.id, scopes_for(admin, admin))
            .unwrap();
        (user.id, token)
    }

    async fn text_analysis(&self, owner: Uuid) -> Uuid {
        let submission = self
            .repo
            .create_text_submission(owner, "It was a bright cold day in April.".to_string())
            .await
            .unwrap();
        self.repo
            .create_text_analysis(
                Uuid::new_v4(),
                submission.id,
                "human_written".to_string(),
                0.82,
                "Reads like human prose".to_string(),
                json!({ "perplexity": 38.5 }),
            )
            .await
            .unwrap()
            .id
    }

    async fn image_analysis(&self, owner: Uuid) -> Uuid {
        let submission = self
            .repo
            .create_image_submission(owner, "sunset.jpg".to_string(), "image/jpeg".to_string())
            .await
            .unwrap();
        self.repo
            .create_image_analysis(
                Uuid::new_v4(),
                submission.id,
                "ai_generated".to_string(),
                0.91,
                "Synthetic texture patterns".to_string(),
                json!({}),
            )
            .await
            .unwrap()
            .id
    }

    async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> axum::response::Response {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn json(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, path, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn test_health_envelope() {
    let app = TestApp::new().await;

    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["timestamp"].is_string());

    let (status, body) = app.json(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn test_ready_hides_database_errors() {
    let app = TestApp::new().await;
    app.state.db.primary.clone().close().await.unwrap();

    let (status, body) = app.json(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Database unavailable");
    assert_eq!(body["data"]["checks"]["database"]["status"], "down");
    assert_eq!(body["data"]["checks"]["database"]["error"], "unreachable");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/register/",
            None,
            Some(json!({
                "email": "grace@example.com",
                "username": "grace",
                "first_name": "Grace",
                "last_name": "Hopper",
                "password": "cobol-1959"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "grace");
    assert_eq!(body["data"]["is_staff"], false);
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = app
        .json(
            Method::POST,
            "/auth/register/",
            None,
            Some(json!({ "email": "grace@example.com", "username": "grace2", "password": "cobol-1959" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/login/",
            None,
            Some(json!({ "email": "grace@example.com", "password": "cobol-1959" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::GET, "/users/me/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert_eq!(body["data"]["full_name"], "Grace Hopper");

    let (status, body) = app
        .json(
            Method::POST,
            "/auth/login/",
            None,
            Some(json!({ "email": "grace@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.json(Method::GET, "/feedback/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());

    let (status, _) = app.json(Method::GET, "/feedback/", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_feedback_walkthrough() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice", false).await;
    let (_, admin_token) = app.user("root", true).await;
    let analysis = app.text_analysis(alice).await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", analysis),
            Some(&alice_token),
            Some(json!({ "rating": "thumbs_up", "comment": "great" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["analysis_type"], "text_analysis");
    assert_eq!(body["data"]["comment"], "great");
    assert!(body["data"]["resolved_at"].is_null());
    let feedback_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/reviewed/", feedback_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "reviewed");
    assert!(body["data"]["resolved_at"].is_null());

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/resolved/", feedback_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");
    let first_resolved_at = chrono::DateTime::parse_from_rfc3339(body["data"]["resolved_at"].as_str().unwrap()).unwrap();

    // Resolving again re-stamps with a time no earlier than the first
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/resolved/", feedback_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_resolved_at = chrono::DateTime::parse_from_rfc3339(body["data"]["resolved_at"].as_str().unwrap()).unwrap();
    assert!(second_resolved_at >= first_resolved_at);

    // Reviewing a resolved row leaves it resolved
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/reviewed/", feedback_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");

    let (status, body) = app
        .json(
            Method::GET,
            &format!("/feedback/analysis/{}/", analysis),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], feedback_id.as_str());
}

#[tokio::test]
async fn test_duplicate_feedback_conflicts() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.image_analysis(alice).await;
    let path = format!("/feedback/analysis/{}/submit/", analysis);

    let (status, body) = app
        .json(Method::POST, &path, Some(&token), Some(json!({ "rating": "thumbs_down" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["analysis_type"], "image_analysis");

    let (status, body) = app
        .json(Method::POST, &path, Some(&token), Some(json!({ "rating": "thumbs_up" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("already submitted"));
}

#[tokio::test]
async fn test_submit_validation() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.text_analysis(alice).await;
    let path = format!("/feedback/analysis/{}/submit/", analysis);

    let (status, _) = app
        .json(Method::POST, &path, Some(&token), Some(json!({ "rating": "meh" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::POST,
            &path,
            Some(&token),
            Some(json!({ "rating": "thumbs_up", "comment": "x".repeat(1001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            Method::POST,
            "/feedback/analysis/not-a-uuid/submit/",
            Some(&token),
            Some(json!({ "rating": "thumbs_up" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", Uuid::new_v4()),
            Some(&token),
            Some(json!({ "rating": "thumbs_up" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_rate_someone_elses_analysis() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice", false).await;
    let (_, mallory_token) = app.user("mallory", false).await;
    let analysis = app.text_analysis(alice).await;

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", analysis),
            Some(&mallory_token),
            Some(json!({ "rating": "thumbs_down" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_is_owner_only() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice", false).await;
    let (_, bob_token) = app.user("bob", false).await;
    let analysis = app.text_analysis(alice).await;

    let (_, body) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", analysis),
            Some(&alice_token),
            Some(json!({ "rating": "thumbs_up" })),
        )
        .await;
    let path = format!("/feedback/{}/delete/", body["data"]["id"].as_str().unwrap());

    let (status, _) = app.json(Method::DELETE, &path, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.json(Method::DELETE, &path, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.json(Method::DELETE, &path, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_statistics() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice", false).await;
    let (bob, bob_token) = app.user("bob", false).await;
    let (_, admin_token) = app.user("root", true).await;

    for (owner, token, rating) in [
        (alice, &alice_token, "thumbs_up"),
        (alice, &alice_token, "thumbs_down"),
        (alice, &alice_token, "thumbs_up"),
        (bob, &bob_token, "thumbs_down"),
    ] {
        let analysis = app.text_analysis(owner).await;
        let (status, _) = app
            .json(
                Method::POST,
                &format!("/feedback/analysis/{}/submit/", analysis),
                Some(token),
                Some(json!({ "rating": rating })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .json(Method::GET, "/feedback/?page=1&page_size=2", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["page_size"], 2);

    let (_, body) = app
        .json(Method::GET, "/feedback/statistics/", Some(&alice_token), None)
        .await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["thumbs_up"], 2);
    assert_eq!(body["data"]["pending"], 3);
    assert_eq!(body["data"]["satisfaction_rate"], 66.67);

    let (_, body) = app
        .json(Method::GET, "/feedback/statistics/", Some(&admin_token), None)
        .await;
    assert_eq!(body["data"]["total"], 4);
    assert_eq!(body["data"]["satisfaction_rate"], 50.0);

    let (status, body) = app
        .json(
            Method::GET,
            "/admin/feedback/?rating=thumbs_down&analysis_type=text_analysis",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["page"], 1);

    // Far past the last page: empty, not a crash
    for path in ["/feedback/?page=18446744073709551615", "/admin/feedback/?page=18446744073709551615&page_size=100"] {
        let token = if path.starts_with("/admin") { &admin_token } else { &alice_token };
        let (status, body) = app.json(Method::GET, path, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["items"].as_array().unwrap().is_empty());
        assert_eq!(body["data"]["page"], lumen_common::response::MAX_PAGE);
    }
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.text_analysis(alice).await;

    let (_, body) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", analysis),
            Some(&token),
            Some(json!({ "rating": "thumbs_up" })),
        )
        .await;
    let feedback_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.json(Method::GET, "/admin/feedback/", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/resolved/", feedback_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, admin_token) = app.user("root", true).await;
    let (status, _) = app
        .json(
            Method::POST,
            &format!("/admin/feedback/{}/reviewed/", Uuid::new_v4()),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_download() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.image_analysis(alice).await;

    let response = app
        .send(
            Method::GET,
            &format!("/reports/analysis/{}/download/", analysis),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"analysis_report_{}.pdf\"", analysis).as_str()
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_reports_are_owner_only() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice", false).await;
    let (_, mallory_token) = app.user("mallory", false).await;
    let (_, admin_token) = app.user("root", true).await;
    let analysis = app.text_analysis(alice).await;

    for token in [&mallory_token, &admin_token] {
        let (status, body) = app
            .json(
                Method::GET,
                &format!("/reports/analysis/{}/download/", analysis),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = app
            .json(
                Method::POST,
                &format!("/reports/analysis/{}/email/", analysis),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // A bad body does not get a non-owner past the ownership check
        let (status, _) = app
            .json(
                Method::POST,
                &format!("/reports/analysis/{}/email/", analysis),
                Some(token),
                Some(json!({ "recipient": "not-an-address" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/reports/analysis/{}/email/", Uuid::new_v4()),
            Some(&mallory_token),
            Some(json!({ "recipient": "not-an-address" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_email() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = TestApp::with_mailer(mailer.clone()).await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.text_analysis(alice).await;
    let path = format!("/reports/analysis/{}/email/", analysis);

    let (status, body) = app.json(Method::POST, &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipient"], "alice@example.com");

    let (status, body) = app
        .json(Method::POST, &path, Some(&token), Some(json!({ "recipient": "team@example.com" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipient"], "team@example.com");

    let (status, _) = app
        .json(Method::POST, &path, Some(&token), Some(json!({ "recipient": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].content_type, "application/pdf");
    assert!(sent[0].attachments[0].data.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_report_email_delivery_failure() {
    let mailer = Arc::new(RecordingMailer {
        fail: true,
        ..RecordingMailer::default()
    });
    let app = TestApp::with_mailer(mailer).await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.text_analysis(alice).await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/reports/analysis/{}/email/", analysis),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_deleting_user_cascades_to_feedback() {
    let app = TestApp::new().await;
    let (alice, token) = app.user("alice", false).await;
    let analysis = app.text_analysis(alice).await;

    let (_, body) = app
        .json(
            Method::POST,
            &format!("/feedback/analysis/{}/submit/", analysis),
            Some(&token),
            Some(json!({ "rating": "thumbs_up" })),
        )
        .await;
    let feedback_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    assert!(app.repo.delete_user(alice).await.unwrap());
    assert!(app.repo.find_feedback_by_id(feedback_id).await.unwrap().is_none());
}
