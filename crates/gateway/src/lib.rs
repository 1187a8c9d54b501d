//! Lumen API Gateway
//!
//! The HTTP surface of the platform:
//! - Account registration and login
//! - Feedback on analysis results and the admin review workflow
//! - PDF report download and email
//!
//! `create_router` is shared by the `gateway` binary and the integration tests.

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    error_handling::HandleErrorLayer,
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    BoxError, Router,
};
use lumen_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    errors::{AppError, Result},
    mail::Mailer,
    reports::ReportRenderer,
};
use middleware::rate_limit::{create_rate_limiter, GlobalRateLimiter};
use std::sync::Arc;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub reports: Arc<ReportRenderer>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// Assemble state from loaded configuration. Fails without a JWT secret.
    pub fn new(config: AppConfig, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret must be set".to_string(),
            })?;

        let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));
        let reports = Arc::new(ReportRenderer::new(config.reports.organization.clone()));

        let limiter = if config.rate_limit.enabled {
            Some(create_rate_limiter(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst,
            )?)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            db,
            jwt,
            reports,
            mailer,
            limiter,
        })
    }

    pub fn repository(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Accounts
        .route("/auth/register/", post(handlers::auth::register))
        .route("/auth/login/", post(handlers::auth::login))
        .route("/users/me/", get(handlers::auth::me))

        // Feedback
        .route("/feedback/", get(handlers::feedback::list_feedback))
        .route("/feedback/statistics/", get(handlers::feedback::statistics))
        .route("/feedback/{id}/delete/", delete(handlers::feedback::delete_feedback))
        .route("/feedback/analysis/{id}/", get(handlers::feedback::analysis_feedback))
        .route("/feedback/analysis/{id}/submit/", post(handlers::feedback::submit_feedback))

        // Admin review
        .route("/admin/feedback/", get(handlers::admin::list_all_feedback))
        .route("/admin/feedback/{id}/reviewed/", post(handlers::admin::mark_reviewed))
        .route("/admin/feedback/{id}/resolved/", post(handlers::admin::mark_resolved))

        // Reports
        .route("/reports/analysis/{id}/download/", get(handlers::reports::download_report))
        .route("/reports/analysis/{id}/email/", post(handlers::reports::email_report))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit::rate_limit));

    // Health endpoints are exempt from rate limiting
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(state.config.request_timeout())),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Render timeouts from the timeout layer as envelopes
async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::RequestTimeout
    } else {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
