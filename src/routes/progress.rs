use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        progress::{Certification, ThemeCompletion},
    },
    services::progress::ProgressService,
    AppState,
};

pub async fn list_certifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Certification>>, AppError> {
    user.require_active("view certifications")?;
    let certifications = ProgressService::list_certifications(&state.db, user.user_id).await?;
    Ok(Json(certifications))
}

/// Completion is derived from current validations; a certification, once held, is kept.
pub async fn theme_completion(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(theme_id): Path<Uuid>,
) -> Result<Json<ThemeCompletion>, AppError> {
    user.require_active("view certifications")?;
    let complete = ProgressService::is_theme_complete(&state.db, user.user_id, theme_id).await?;
    let certified = ProgressService::list_certifications(&state.db, user.user_id)
        .await?
        .iter()
        .any(|c| c.theme_id == theme_id);
    Ok(Json(ThemeCompletion {
        theme_id,
        complete,
        certified,
    }))
}
