use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::purchase::{CheckoutResponse, PendingCheckout, PurchaseTarget},
    services::{
        catalog::CatalogService,
        entitlement::EntitlementService,
        metrics,
        payments::{to_minor_units, PaymentProvider},
    },
};

/// Lifecycle of one checkout:
/// NONE -> SESSION_CREATED -> PAID -> RECORDED, or SESSION_CREATED -> CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    None,
    SessionCreated,
    Paid,
    Recorded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutEvent {
    SessionCreated,
    PaymentConfirmed,
    PurchaseRecorded,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid checkout transition: {event:?} in state {from:?}")]
pub struct CheckoutError {
    pub from: CheckoutState,
    pub event: CheckoutEvent,
}

impl CheckoutState {
    pub fn advance(self, event: CheckoutEvent) -> Result<CheckoutState, CheckoutError> {
        use CheckoutEvent as E;
        use CheckoutState as S;
        match (self, event) {
            (S::None, E::SessionCreated) => Ok(S::SessionCreated),
            (S::SessionCreated, E::PaymentConfirmed) => Ok(S::Paid),
            (S::SessionCreated, E::Cancelled) => Ok(S::Cancelled),
            (S::Paid, E::PurchaseRecorded) => Ok(S::Recorded),
            (from, event) => Err(CheckoutError { from, event }),
        }
    }
}

/// Clamp to the provider's accepted session lifetime (30 min to 24 h),
/// one minute inside each bound.
pub fn session_ttl(configured: Duration) -> Duration {
    configured.clamp(Duration::minutes(31), Duration::hours(24) - Duration::minutes(1))
}

/// Redirect targets and intent lifetime for new checkouts.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub success_url: String,
    pub cancel_url: String,
    pub intent_ttl: Duration,
}

/// Result of starting a checkout.
#[derive(Debug)]
pub enum CheckoutStart {
    /// The user must pay on the provider's hosted page.
    Payment(CheckoutResponse),
    /// Every lesson of the cursus was already owned: recorded at zero cost.
    Granted { cursus_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Recorded(PurchaseTarget),
    AlreadyOwned(PurchaseTarget),
}

pub struct CheckoutService;

impl CheckoutService {
    pub async fn start_lesson_checkout(
        pool: &PgPool,
        payments: &dyn PaymentProvider,
        settings: &CheckoutSettings,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<CheckoutStart, AppError> {
        let lesson = CatalogService::lesson(pool, lesson_id)
            .await?
            .ok_or(AppError::NotFound("Lesson"))?;

        let ownership = EntitlementService::owned_targets(pool, user_id).await?;
        let target = PurchaseTarget::Lesson(lesson.id);
        if let Some(reason) = ownership.purchase_blocker(target, Some(lesson.cursus_id)) {
            return Err(AppError::AlreadyOwned(reason));
        }

        let response =
            Self::open_session(pool, payments, settings, user_id, target, lesson.price, &lesson.title).await?;
        Ok(CheckoutStart::Payment(response))
    }

    pub async fn start_cursus_checkout(
        pool: &PgPool,
        payments: &dyn PaymentProvider,
        settings: &CheckoutSettings,
        user_id: Uuid,
        cursus_id: Uuid,
    ) -> Result<CheckoutStart, AppError> {
        let ownership = EntitlementService::owned_targets(pool, user_id).await?;
        let target = PurchaseTarget::Cursus(cursus_id);
        if let Some(reason) = ownership.purchase_blocker(target, None) {
            return Err(AppError::AlreadyOwned(reason));
        }

        let mut conn = pool.acquire().await?;
        let quote = EntitlementService::quote_cursus(&mut *conn, user_id, cursus_id)
            .await?
            .ok_or(AppError::NotFound("Cursus"))?;
        drop(conn);

        if quote.fully_owned() {
            // Nothing left to pay for; there is no provider session for a zero amount.
            let mut conn = pool.acquire().await?;
            record_purchase(&mut *conn, user_id, target, Decimal::ZERO, None).await?;
            metrics::PURCHASES_RECORDED_COUNTER
                .with_label_values(&[target.kind().as_str()])
                .inc();
            tracing::info!(%user_id, %cursus_id, "Cursus granted: every lesson already owned");
            return Ok(CheckoutStart::Granted { cursus_id });
        }

        let response = Self::open_session(
            pool,
            payments,
            settings,
            user_id,
            target,
            quote.adjusted_price,
            &quote.name,
        )
        .await?;
        Ok(CheckoutStart::Payment(response))
    }

    async fn open_session(
        pool: &PgPool,
        payments: &dyn PaymentProvider,
        settings: &CheckoutSettings,
        user_id: Uuid,
        target: PurchaseTarget,
        amount: Decimal,
        description: &str,
    ) -> Result<CheckoutResponse, AppError> {
        let amount_minor = to_minor_units(amount).map_err(|e| AppError::Payment(e.to_string()))?;
        // The intent and the provider session share one deadline.
        let expires_at = Utc::now() + session_ttl(settings.intent_ttl);

        let session = payments
            .create_session(
                amount_minor,
                description,
                &settings.success_url,
                &settings.cancel_url,
                expires_at,
            )
            .await
            .map_err(|e| {
                metrics::PAYMENT_ERRORS_COUNTER
                    .with_label_values(&["create_session"])
                    .inc();
                tracing::warn!(%user_id, "Payment session creation failed: {}", e);
                AppError::Payment(e.to_string())
            })?;
        CheckoutState::None
            .advance(CheckoutEvent::SessionCreated)
            .map_err(anyhow::Error::from)?;

        sqlx::query(
            "INSERT INTO pending_checkouts (session_id, user_id, kind, target_id, amount, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&session.id)
        .bind(user_id)
        .bind(target.kind().as_str())
        .bind(target.id())
        .bind(amount)
        .bind(expires_at)
        .execute(pool)
        .await?;

        metrics::CHECKOUTS_STARTED_COUNTER
            .with_label_values(&[target.kind().as_str()])
            .inc();
        tracing::info!(
            %user_id,
            kind = %target.kind(),
            target_id = %target.id(),
            session_id = %session.id,
            %amount,
            "Checkout session created"
        );

        Ok(CheckoutResponse {
            session_id: session.id,
            checkout_url: session.url,
            amount,
        })
    }

    /// Verify the payment with the provider and record the purchase once.
    /// Confirming the same session again is a no-op.
    pub async fn confirm(
        pool: &PgPool,
        payments: &dyn PaymentProvider,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<ConfirmOutcome, AppError> {
        let pending = sqlx::query_as::<_, PendingCheckout>(
            "SELECT session_id, user_id, kind, target_id, amount, expires_at, created_at
             FROM pending_checkouts
             WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        let Some(pending) = pending else {
            // A session already recorded by an earlier confirmation.
            return match recorded_target(pool, user_id, session_id).await? {
                Some(target) => Ok(ConfirmOutcome::AlreadyOwned(target)),
                None => Err(AppError::NoPendingCheckout),
            };
        };

        let target = pending.target()?;

        // A paid session is recorded even once the intent's deadline has passed.
        let status = payments.get_session(session_id).await.map_err(|e| {
            metrics::PAYMENT_ERRORS_COUNTER
                .with_label_values(&["get_session"])
                .inc();
            tracing::warn!(%user_id, %session_id, "Payment verification failed: {}", e);
            AppError::Payment(e.to_string())
        })?;
        if !status.is_paid() {
            if pending.is_expired(Utc::now()) {
                delete_pending(pool, session_id).await?;
                return Err(AppError::CheckoutExpired);
            }
            tracing::info!(%session_id, payment_status = %status.payment_status, "Payment not completed");
            return Err(AppError::NotPaid);
        }
        let state = CheckoutState::SessionCreated
            .advance(CheckoutEvent::PaymentConfirmed)
            .map_err(anyhow::Error::from)?;

        let mut tx = pool.begin().await?;
        let amount = match target {
            PurchaseTarget::Lesson(lesson_id) => {
                sqlx::query_scalar::<_, Decimal>("SELECT price FROM lessons WHERE id = $1")
                    .bind(lesson_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(AppError::NotFound("Lesson"))?
            }
            PurchaseTarget::Cursus(cursus_id) => {
                EntitlementService::quote_cursus(&mut *tx, user_id, cursus_id)
                    .await?
                    .ok_or(AppError::NotFound("Cursus"))?
                    .adjusted_price
            }
        };
        if amount != pending.amount {
            tracing::warn!(
                %session_id,
                quoted = %pending.amount,
                recomputed = %amount,
                "Price changed between checkout and confirmation"
            );
        }

        let inserted = record_purchase(&mut *tx, user_id, target, amount, Some(session_id)).await?;
        sqlx::query("DELETE FROM pending_checkouts WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        state
            .advance(CheckoutEvent::PurchaseRecorded)
            .map_err(anyhow::Error::from)?;

        if inserted {
            metrics::PURCHASES_RECORDED_COUNTER
                .with_label_values(&[target.kind().as_str()])
                .inc();
            tracing::info!(%user_id, kind = %target.kind(), target_id = %target.id(), %amount, "Purchase recorded");
            Ok(ConfirmOutcome::Recorded(target))
        } else {
            Ok(ConfirmOutcome::AlreadyOwned(target))
        }
    }

    /// Drop the user's pending intent for `session_id`. Returns whether one existed.
    pub async fn cancel(pool: &PgPool, user_id: Uuid, session_id: &str) -> anyhow::Result<bool> {
        let removed = sqlx::query("DELETE FROM pending_checkouts WHERE session_id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(pool)
            .await?
            .rows_affected()
            > 0;
        if removed {
            CheckoutState::SessionCreated.advance(CheckoutEvent::Cancelled)?;
            tracing::info!(%user_id, %session_id, "Checkout cancelled");
        }
        Ok(removed)
    }

    pub async fn count_expired(pool: &PgPool) -> anyhow::Result<i64> {
        let expired = sqlx::query_scalar("SELECT COUNT(*) FROM pending_checkouts WHERE expires_at <= NOW()")
            .fetch_one(pool)
            .await?;
        Ok(expired)
    }

    /// Delete intents whose confirmation window has passed.
    pub async fn purge_expired(pool: &PgPool) -> anyhow::Result<u64> {
        let purged = sqlx::query("DELETE FROM pending_checkouts WHERE expires_at <= NOW()")
            .execute(pool)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::info!("Purged {} expired pending checkouts", purged);
        }
        Ok(purged)
    }
}

async fn delete_pending(pool: &PgPool, session_id: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM pending_checkouts WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn recorded_target(
    pool: &PgPool,
    user_id: Uuid,
    session_id: &str,
) -> anyhow::Result<Option<PurchaseTarget>> {
    let row: Option<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
        "SELECT lesson_id, cursus_id FROM purchases
         WHERE user_id = $1 AND payment_session = $2",
    )
    .bind(user_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.and_then(|(lesson_id, cursus_id)| match (lesson_id, cursus_id) {
        (Some(id), _) => Some(PurchaseTarget::Lesson(id)),
        (None, Some(id)) => Some(PurchaseTarget::Cursus(id)),
        (None, None) => None,
    }))
}

/// Insert the purchase unless the same user already owns the same target.
/// Returns whether a row was written.
async fn record_purchase(
    conn: &mut PgConnection,
    user_id: Uuid,
    target: PurchaseTarget,
    amount: Decimal,
    session_id: Option<&str>,
) -> anyhow::Result<bool> {
    let sql = match target {
        PurchaseTarget::Lesson(_) => {
            "INSERT INTO purchases (user_id, lesson_id, amount, payment_session)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, lesson_id) WHERE lesson_id IS NOT NULL DO NOTHING"
        }
        PurchaseTarget::Cursus(_) => {
            "INSERT INTO purchases (user_id, cursus_id, amount, payment_session)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, cursus_id) WHERE cursus_id IS NOT NULL DO NOTHING"
        }
    };
    let inserted = sqlx::query(sql)
        .bind(user_id)
        .bind(target.id())
        .bind(amount)
        .bind(session_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(inserted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = CheckoutState::None
            .advance(CheckoutEvent::SessionCreated)
            .and_then(|s| s.advance(CheckoutEvent::PaymentConfirmed))
            .and_then(|s| s.advance(CheckoutEvent::PurchaseRecorded));
        assert_eq!(state, Ok(CheckoutState::Recorded));
    }

    #[test]
    fn test_cancel_only_from_session_created() {
        assert_eq!(
            CheckoutState::SessionCreated.advance(CheckoutEvent::Cancelled),
            Ok(CheckoutState::Cancelled)
        );
        assert!(CheckoutState::Paid.advance(CheckoutEvent::Cancelled).is_err());
        assert!(CheckoutState::Recorded.advance(CheckoutEvent::Cancelled).is_err());
    }

    #[test]
    fn test_cannot_record_without_payment() {
        let err = CheckoutState::SessionCreated
            .advance(CheckoutEvent::PurchaseRecorded)
            .unwrap_err();
        assert_eq!(err.from, CheckoutState::SessionCreated);
        assert_eq!(err.event, CheckoutEvent::PurchaseRecorded);
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for state in [CheckoutState::Recorded, CheckoutState::Cancelled] {
            for event in [
                CheckoutEvent::SessionCreated,
                CheckoutEvent::PaymentConfirmed,
                CheckoutEvent::PurchaseRecorded,
                CheckoutEvent::Cancelled,
            ] {
                assert!(state.advance(event).is_err());
            }
        }
    }

    #[test]
    fn test_session_ttl_stays_inside_provider_window() {
        assert_eq!(session_ttl(Duration::minutes(10)), Duration::minutes(31));
        assert_eq!(session_ttl(Duration::minutes(60)), Duration::minutes(60));
        assert_eq!(
            session_ttl(Duration::hours(48)),
            Duration::hours(23) + Duration::minutes(59)
        );
    }

    mod db {
        use super::*;
        use crate::services::testing::{eur, insert_user, purchase_amounts, seed_musique, settings, StubProvider};

        fn session_id(start: CheckoutStart) -> String {
            match start {
                CheckoutStart::Payment(checkout) => checkout.session_id,
                other => panic!("expected a payment session, got {other:?}"),
            }
        }

        async fn pending_count(pool: &PgPool) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_checkouts")
                .fetch_one(pool)
                .await
                .unwrap()
        }

        async fn expire_intents(pool: &PgPool) {
            sqlx::query("UPDATE pending_checkouts SET expires_at = NOW() - INTERVAL '1 minute'")
                .execute(pool)
                .await
                .unwrap();
        }

        async fn buy_lesson(pool: &PgPool, provider: &StubProvider, user_id: Uuid, lesson_id: Uuid) {
            let start = CheckoutService::start_lesson_checkout(pool, provider, &settings(), user_id, lesson_id)
                .await
                .unwrap();
            let outcome = CheckoutService::confirm(pool, provider, user_id, &session_id(start))
                .await
                .unwrap();
            assert_eq!(outcome, ConfirmOutcome::Recorded(PurchaseTarget::Lesson(lesson_id)));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_confirming_twice_records_one_purchase(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::paid();
            let lesson = musique.lessons[0];

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, lesson)
                .await
                .unwrap();
            let session = session_id(start);

            let first = CheckoutService::confirm(&pool, &provider, user, &session).await.unwrap();
            let second = CheckoutService::confirm(&pool, &provider, user, &session).await.unwrap();

            assert_eq!(first, ConfirmOutcome::Recorded(PurchaseTarget::Lesson(lesson)));
            assert_eq!(second, ConfirmOutcome::AlreadyOwned(PurchaseTarget::Lesson(lesson)));
            assert_eq!(purchase_amounts(&pool, user).await, vec![eur(2600)]);
            assert_eq!(pending_count(&pool).await, 0);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_cursus_checkout_deducts_owned_lessons(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::paid();

            buy_lesson(&pool, &provider, user, musique.lessons[0]).await;

            for (cursus_id, expected) in [(musique.guitar, eur(2600)), (musique.piano, eur(5200))] {
                let start =
                    CheckoutService::start_cursus_checkout(&pool, &provider, &settings(), user, cursus_id)
                        .await
                        .unwrap();
                let CheckoutStart::Payment(checkout) = start else {
                    panic!("expected a payment session");
                };
                assert_eq!(checkout.amount, expected);
                let outcome = CheckoutService::confirm(&pool, &provider, user, &checkout.session_id)
                    .await
                    .unwrap();
                assert_eq!(outcome, ConfirmOutcome::Recorded(PurchaseTarget::Cursus(cursus_id)));
            }

            assert_eq!(
                purchase_amounts(&pool, user).await,
                vec![eur(2600), eur(2600), eur(5200)]
            );

            // The guitar cursus now covers its second lesson.
            let err = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[1])
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::AlreadyOwned(_)));
            assert_eq!(provider.sessions_created(), 3);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_fully_owned_cursus_is_granted_without_payment(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::paid();

            buy_lesson(&pool, &provider, user, musique.lessons[0]).await;
            buy_lesson(&pool, &provider, user, musique.lessons[1]).await;

            let start = CheckoutService::start_cursus_checkout(&pool, &provider, &settings(), user, musique.guitar)
                .await
                .unwrap();
            assert!(matches!(start, CheckoutStart::Granted { cursus_id } if cursus_id == musique.guitar));
            assert_eq!(provider.sessions_created(), 2);
            assert_eq!(
                purchase_amounts(&pool, user).await,
                vec![Decimal::ZERO, eur(2600), eur(2600)]
            );
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_unpaid_session_keeps_intent(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::unpaid();

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[2])
                .await
                .unwrap();
            let err = CheckoutService::confirm(&pool, &provider, user, &session_id(start))
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::NotPaid));
            assert_eq!(pending_count(&pool).await, 1);
            assert!(purchase_amounts(&pool, user).await.is_empty());
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_expired_unpaid_intent_is_dropped(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::unpaid();

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[2])
                .await
                .unwrap();
            expire_intents(&pool).await;
            let err = CheckoutService::confirm(&pool, &provider, user, &session_id(start))
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::CheckoutExpired));
            assert_eq!(pending_count(&pool).await, 0);
            assert!(purchase_amounts(&pool, user).await.is_empty());
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_paid_session_is_recorded_past_intent_deadline(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::paid();

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[3])
                .await
                .unwrap();
            expire_intents(&pool).await;
            let outcome = CheckoutService::confirm(&pool, &provider, user, &session_id(start))
                .await
                .unwrap();

            assert_eq!(outcome, ConfirmOutcome::Recorded(PurchaseTarget::Lesson(musique.lessons[3])));
            assert_eq!(purchase_amounts(&pool, user).await, vec![eur(2600)]);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_intent_and_provider_session_share_deadline(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::unpaid();

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[0])
                .await
                .unwrap();
            let stored: chrono::DateTime<Utc> =
                sqlx::query_scalar("SELECT expires_at FROM pending_checkouts WHERE session_id = $1")
                    .bind(session_id(start))
                    .fetch_one(&pool)
                    .await
                    .unwrap();
            let sent = provider.last_expires_at().unwrap();

            // Postgres keeps microseconds only.
            assert!((stored - sent).num_milliseconds().abs() < 1);
            let ttl = sent - Utc::now();
            assert!(ttl > Duration::minutes(59) && ttl <= Duration::minutes(60));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_other_users_session_is_not_confirmed(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let buyer = insert_user(&pool, true).await;
            let other = insert_user(&pool, true).await;
            let provider = StubProvider::paid();

            let start = CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), buyer, musique.lessons[0])
                .await
                .unwrap();
            let err = CheckoutService::confirm(&pool, &provider, other, &session_id(start))
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::NoPendingCheckout));
            assert!(purchase_amounts(&pool, other).await.is_empty());
            assert_eq!(pending_count(&pool).await, 1);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_cancel_then_purge(pool: PgPool) {
            let musique = seed_musique(&pool).await;
            let user = insert_user(&pool, true).await;
            let provider = StubProvider::unpaid();

            let cancelled = session_id(
                CheckoutService::start_lesson_checkout(&pool, &provider, &settings(), user, musique.lessons[0])
                    .await
                    .unwrap(),
            );
            CheckoutService::start_cursus_checkout(&pool, &provider, &settings(), user, musique.piano)
                .await
                .unwrap();

            assert!(CheckoutService::cancel(&pool, user, &cancelled).await.unwrap());
            assert!(!CheckoutService::cancel(&pool, user, &cancelled).await.unwrap());
            assert_eq!(CheckoutService::count_expired(&pool).await.unwrap(), 0);

            expire_intents(&pool).await;
            assert_eq!(CheckoutService::count_expired(&pool).await.unwrap(), 1);
            assert_eq!(CheckoutService::purge_expired(&pool).await.unwrap(), 1);
            assert_eq!(pending_count(&pool).await, 0);
        }
    }
}
