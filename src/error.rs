use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// User-facing failures. Each variant carries the status and the page the
/// client should send the user back to.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Account must be activated to {0}")]
    Inactive(&'static str),

    #[error("Purchase this lesson or its cursus to {0} it")]
    NoAccess(&'static str),

    #[error("{0}")]
    AlreadyOwned(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Mark the lesson as completed before validating it")]
    NotCompleted(Uuid),

    #[error("No pending checkout found for this payment session")]
    NoPendingCheckout,

    #[error("The checkout for this payment session has expired")]
    CheckoutExpired,

    #[error("Payment has not been completed")]
    NotPaid,

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts, try again in a few minutes")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Inactive(_) | Self::NoAccess(_) => StatusCode::FORBIDDEN,
            Self::AlreadyOwned(_) | Self::NotCompleted(_) => StatusCode::CONFLICT,
            Self::NotFound(_) | Self::NoPendingCheckout => StatusCode::NOT_FOUND,
            Self::CheckoutExpired => StatusCode::GONE,
            Self::NotPaid => StatusCode::PAYMENT_REQUIRED,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Where the client should route the user after showing the error.
    pub fn redirect(&self) -> String {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials | Self::RateLimited => "/login".into(),
            Self::AlreadyOwned(_) => "/catalog".into(),
            Self::NotCompleted(lesson_id) => format!("/lessons/{lesson_id}"),
            _ => "/".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "error": message, "redirect": self.redirect() })),
        )
            .into_response()
    }
}
