use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, purchase::CheckoutSessionQuery},
    services::checkout::{CheckoutService, CheckoutStart, ConfirmOutcome},
    AppState,
};

fn start_response(start: CheckoutStart) -> (StatusCode, Json<Value>) {
    match start {
        CheckoutStart::Payment(checkout) => (StatusCode::CREATED, Json(json!(checkout))),
        CheckoutStart::Granted { cursus_id } => (
            StatusCode::OK,
            Json(json!({
                "granted": true,
                "cursus_id": cursus_id,
                "redirect": "/catalog",
            })),
        ),
    }
}

pub async fn buy_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lesson_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_active("purchase")?;
    let start = CheckoutService::start_lesson_checkout(
        &state.db,
        state.payments.as_ref(),
        &state.checkout,
        user.user_id,
        lesson_id,
    )
    .await?;
    Ok(start_response(start))
}

pub async fn buy_cursus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(cursus_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_active("purchase")?;
    let start = CheckoutService::start_cursus_checkout(
        &state.db,
        state.payments.as_ref(),
        &state.checkout,
        user.user_id,
        cursus_id,
    )
    .await?;
    Ok(start_response(start))
}

/// GET /checkout/success?session_id=: the provider's return URL.
pub async fn success(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CheckoutSessionQuery>,
) -> Result<Json<Value>, AppError> {
    let session_id = query.session_id.ok_or(AppError::NoPendingCheckout)?;
    let outcome =
        CheckoutService::confirm(&state.db, state.payments.as_ref(), user.user_id, &session_id).await?;

    let (target, recorded) = match outcome {
        ConfirmOutcome::Recorded(target) => (target, true),
        ConfirmOutcome::AlreadyOwned(target) => (target, false),
    };
    Ok(Json(json!({
        "recorded": recorded,
        "kind": target.kind(),
        "target_id": target.id(),
        "redirect": "/catalog",
    })))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CheckoutSessionQuery>,
) -> Result<Json<Value>, AppError> {
    let cancelled = match query.session_id {
        Some(session_id) => CheckoutService::cancel(&state.db, user.user_id, &session_id).await?,
        None => false,
    };
    Ok(Json(json!({ "cancelled": cancelled, "redirect": "/catalog" })))
}
