use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, catalog::CatalogTheme, purchase::CursusQuote},
    services::{
        catalog::CatalogService,
        entitlement::{EntitlementService, Ownership},
    },
    AppState,
};

/// Anonymous visitors see catalog prices with nothing owned.
pub async fn browse(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> Result<Json<Vec<CatalogTheme>>, AppError> {
    let ownership = match user {
        Some(user) => EntitlementService::owned_targets(&state.db, user.user_id).await?,
        None => Ownership::default(),
    };
    let catalog = CatalogService::browse(&state.db, &ownership).await?;
    Ok(Json(catalog))
}

pub async fn quote_cursus(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(cursus_id): Path<Uuid>,
) -> Result<Json<CursusQuote>, AppError> {
    let mut conn = state.db.acquire().await?;
    EntitlementService::quote_cursus(&mut *conn, user.user_id, cursus_id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Cursus"))
}
