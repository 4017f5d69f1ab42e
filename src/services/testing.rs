//! Fixtures for the database-backed service and router tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    checkout::CheckoutSettings,
    payments::{PaymentError, PaymentProvider, PaymentSession, SessionStatus},
};

/// In-memory provider: every session it reports is either paid or unpaid.
pub struct StubProvider {
    paid: bool,
    created: AtomicUsize,
    last_expires_at: Mutex<Option<DateTime<Utc>>>,
}

impl StubProvider {
    pub fn paid() -> Self {
        Self::new(true)
    }

    pub fn unpaid() -> Self {
        Self::new(false)
    }

    fn new(paid: bool) -> Self {
        Self {
            paid,
            created: AtomicUsize::new(0),
            last_expires_at: Mutex::new(None),
        }
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_expires_at(&self) -> Option<DateTime<Utc>> {
        *self.last_expires_at.lock().unwrap()
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_session(
        &self,
        _amount_minor: i64,
        _description: &str,
        _success_url: &str,
        _cancel_url: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PaymentSession, PaymentError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_expires_at.lock().unwrap() = Some(expires_at);
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        Ok(PaymentSession {
            url: format!("https://checkout.example.com/{id}"),
            id,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        Ok(SessionStatus {
            id: session_id.to_string(),
            payment_status: if self.paid { "paid" } else { "unpaid" }.to_string(),
        })
    }
}

pub fn settings() -> CheckoutSettings {
    CheckoutSettings {
        success_url: "http://localhost/checkout/success?session_id={CHECKOUT_SESSION_ID}".into(),
        cancel_url: "http://localhost/checkout/cancel".into(),
        intent_ttl: Duration::minutes(60),
    }
}

pub fn eur(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub async fn insert_user(pool: &PgPool, active: bool) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, username, is_active)
         VALUES ($1, 'x', 'testuser', $2)
         RETURNING id",
    )
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .bind(active)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Theme "Musique": two cursus priced 52.00, each with two lessons at 26.00.
pub struct Musique {
    pub theme_id: Uuid,
    pub guitar: Uuid,
    pub piano: Uuid,
    /// Guitar lessons first, then piano, in insertion order.
    pub lessons: Vec<Uuid>,
}

pub async fn seed_musique(pool: &PgPool) -> Musique {
    let mut tx = pool.begin().await.unwrap();
    let theme_id: Uuid = sqlx::query_scalar("INSERT INTO themes (name) VALUES ('Musique') RETURNING id")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

    let mut cursus = Vec::new();
    let mut lessons = Vec::new();
    for name in ["Initiation à la guitare", "Initiation au piano"] {
        let cursus_id: Uuid = sqlx::query_scalar(
            "INSERT INTO cursus (theme_id, name, price) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(theme_id)
        .bind(name)
        .bind(eur(5200))
        .fetch_one(&mut *tx)
        .await
        .unwrap();
        for title in ["Découverte de l'instrument", "Les accords et les gammes"] {
            let lesson_id: Uuid = sqlx::query_scalar(
                "INSERT INTO lessons (cursus_id, title, content, video_url, price)
                 VALUES ($1, $2, 'Lorem ipsum...', 'https://example.com/video', $3)
                 RETURNING id",
            )
            .bind(cursus_id)
            .bind(title)
            .bind(eur(2600))
            .fetch_one(&mut *tx)
            .await
            .unwrap();
            lessons.push(lesson_id);
        }
        cursus.push(cursus_id);
    }
    tx.commit().await.unwrap();

    Musique {
        theme_id,
        guitar: cursus[0],
        piano: cursus[1],
        lessons,
    }
}

/// Purchase amounts recorded for `user_id`, smallest first.
pub async fn purchase_amounts(pool: &PgPool, user_id: Uuid) -> Vec<Decimal> {
    sqlx::query_scalar("SELECT amount FROM purchases WHERE user_id = $1 ORDER BY amount")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .unwrap()
}
