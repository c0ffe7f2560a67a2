use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::handlers::{health_check, metrics_handler, signup, welcome, SignupState};
use crate::observability::{observability_middleware, Metrics};

/// Build the application router
pub fn create_app(context: AppContext, metrics: Arc<Metrics>) -> Router {
    let metrics_for_middleware = metrics.clone();

    let signup_state = SignupState {
        signup_service: context.signup_service,
    };

    Router::new()
        // Health and metrics endpoints
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        // Welcome page
        .route("/", get(welcome))
        .with_state(context.page)
        // Signup submissions
        .route("/signup", post(signup))
        .with_state(signup_state)
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}
