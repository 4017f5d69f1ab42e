use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub active: bool,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT by the Axum extractor
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub is_active: bool,
}

impl AuthenticatedUser {
    /// Purchases, lesson access and validation all require an activated account.
    pub fn require_active(&self, action: &'static str) -> Result<(), AppError> {
        if self.is_active {
            Ok(())
        } else {
            Err(AppError::Inactive(action))
        }
    }
}
