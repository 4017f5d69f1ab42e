use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, catalog::Lesson, progress::LessonView},
    services::{
        catalog::CatalogService,
        entitlement::EntitlementService,
        progress::{ProgressService, ValidationOutcome},
    },
    AppState,
};

/// Load the lesson and refuse users who neither bought it nor its cursus.
async fn accessible_lesson(
    state: &AppState,
    user: &AuthenticatedUser,
    lesson_id: Uuid,
    action: &'static str,
) -> Result<Lesson, AppError> {
    user.require_active(action)?;
    let lesson = CatalogService::lesson(&state.db, lesson_id)
        .await?
        .ok_or(AppError::NotFound("Lesson"))?;
    if !EntitlementService::has_lesson_access(&state.db, user.user_id, &lesson).await? {
        return Err(AppError::NoAccess(action));
    }
    Ok(lesson)
}

pub async fn view_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<LessonView>, AppError> {
    let lesson = accessible_lesson(&state, &user, lesson_id, "view").await?;
    let progress = ProgressService::progress(&state.db, user.user_id, lesson.id).await?;
    let cursus_complete =
        ProgressService::is_cursus_complete(&state.db, user.user_id, lesson.cursus_id).await?;
    Ok(Json(LessonView::new(lesson, progress, cursus_complete)))
}

pub async fn complete_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lesson = accessible_lesson(&state, &user, lesson_id, "complete").await?;
    let created = ProgressService::mark_completed(&state.db, user.user_id, lesson.id).await?;
    if created {
        tracing::info!(user_id = %user.user_id, lesson_id = %lesson.id, "Lesson completed");
    }
    Ok(Json(json!({
        "lesson_id": lesson.id,
        "completed": true,
        "redirect": format!("/lessons/{}", lesson.id),
    })))
}

pub async fn validate_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<ValidationOutcome>, AppError> {
    let lesson = accessible_lesson(&state, &user, lesson_id, "validate").await?;
    let outcome = ProgressService::validate_lesson(&state.db, user.user_id, &lesson).await?;
    Ok(Json(outcome))
}
