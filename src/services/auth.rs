use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::Claims,
        user::{LoginResponse, User, UserProfile},
    },
    services::metrics,
};

pub struct AuthService;

impl AuthService {
    /// Check credentials and issue an access token.
    /// Inactive accounts may log in; their token says so and purchase,
    /// lesson and validation routes refuse them.
    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> Result<LoginResponse, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, username, role, is_active, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

        let Some(user) = user else {
            metrics::LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            return Err(AppError::InvalidCredentials);
        };

        let valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !valid {
            metrics::LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            return Err(AppError::InvalidCredentials);
        }

        let access_token = Self::generate_access_token(&user, jwt_secret, access_ttl)?;
        metrics::LOGINS_COUNTER.with_label_values(&["success"]).inc();
        tracing::info!(user_id = %user.id, active = user.is_active, "User logged in");

        Ok(LoginResponse {
            access_token,
            user: user.into(),
        })
    }

    pub fn generate_access_token(user: &User, secret: &str, ttl: u64) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            active: user.is_active,
            iat: now,
            exp: now + ttl as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub async fn me(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, username, role, is_active, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user.map(UserProfile::from))
    }
}
