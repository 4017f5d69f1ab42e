pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::auth::JwtSecret;
use services::{checkout::CheckoutSettings, payments::PaymentProvider};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis_client: RedisClient,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentProvider>,
    pub checkout: CheckoutSettings,
}

impl AppState {
    pub fn new(
        db: PgPool,
        redis_client: RedisClient,
        config: Arc<Config>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        let checkout = CheckoutSettings {
            success_url: config.checkout_success_url(),
            cancel_url: config.checkout_cancel_url(),
            intent_ttl: chrono::Duration::minutes(config.checkout_ttl_minutes),
        };
        Self {
            db,
            redis_client,
            config,
            payments,
            checkout,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Allow the front-end origin; any localhost origin is accepted for development.
    let base = state.config.app_base_url.trim_end_matches('/').to_string();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        // Catalog
        .route("/catalog", get(routes::catalog::browse))
        .route("/cursus/{id}/quote", get(routes::catalog::quote_cursus))
        // Checkout
        .route("/cursus/{id}/buy", post(routes::checkout::buy_cursus))
        .route("/lessons/{id}/buy", post(routes::checkout::buy_lesson))
        .route("/checkout/success", get(routes::checkout::success))
        .route("/checkout/cancel", get(routes::checkout::cancel))
        // Lessons and progress
        .route("/lessons/{id}", get(routes::lessons::view_lesson))
        .route("/lessons/{id}/complete", post(routes::lessons::complete_lesson))
        .route("/lessons/{id}/validate", post(routes::lessons::validate_lesson))
        .route("/certifications", get(routes::progress::list_certifications))
        .route("/themes/{id}/completion", get(routes::progress::theme_completion))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
