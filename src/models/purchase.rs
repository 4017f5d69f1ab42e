use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    Lesson,
    Cursus,
}

impl PurchaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseKind::Lesson => "lesson",
            PurchaseKind::Cursus => "cursus",
        }
    }
}

impl std::fmt::Display for PurchaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(PurchaseKind::Lesson),
            "cursus" => Ok(PurchaseKind::Cursus),
            _ => Err(anyhow::anyhow!("Invalid purchase kind: {s}")),
        }
    }
}

/// What a purchase grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseTarget {
    Lesson(Uuid),
    Cursus(Uuid),
}

impl PurchaseTarget {
    pub fn new(kind: PurchaseKind, id: Uuid) -> Self {
        match kind {
            PurchaseKind::Lesson => PurchaseTarget::Lesson(id),
            PurchaseKind::Cursus => PurchaseTarget::Cursus(id),
        }
    }

    pub fn kind(&self) -> PurchaseKind {
        match self {
            PurchaseTarget::Lesson(_) => PurchaseKind::Lesson,
            PurchaseTarget::Cursus(_) => PurchaseKind::Cursus,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            PurchaseTarget::Lesson(id) | PurchaseTarget::Cursus(id) => *id,
        }
    }
}

/// A checkout intent stored between session creation and confirmation.
#[derive(Debug, Clone, FromRow)]
pub struct PendingCheckout {
    pub session_id: String,
    pub user_id: Uuid,
    pub kind: String,
    pub target_id: Uuid,
    pub amount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PendingCheckout {
    pub fn target(&self) -> anyhow::Result<PurchaseTarget> {
        Ok(PurchaseTarget::new(self.kind.parse()?, self.target_id))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Price of a whole cursus for one user, after deducting lessons already owned.
#[derive(Debug, Clone, Serialize)]
pub struct CursusQuote {
    pub cursus_id: Uuid,
    pub name: String,
    pub catalog_price: Decimal,
    pub adjusted_price: Decimal,
    pub owned_lessons: usize,
    pub remaining_lessons: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub checkout_url: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionQuery {
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pending_checkout_target_and_expiry() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let pending = PendingCheckout {
            session_id: "cs_test_1".into(),
            user_id: Uuid::new_v4(),
            kind: "cursus".into(),
            target_id: id,
            amount: Decimal::new(5200, 2),
            expires_at: now + Duration::minutes(5),
            created_at: now,
        };
        assert_eq!(pending.target().unwrap(), PurchaseTarget::Cursus(id));
        assert!(!pending.is_expired(now));
        assert!(pending.is_expired(now + Duration::minutes(5)));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let pending = PendingCheckout {
            session_id: "cs_test_2".into(),
            user_id: Uuid::new_v4(),
            kind: "theme".into(),
            target_id: Uuid::new_v4(),
            amount: Decimal::ZERO,
            expires_at: Utc::now(),
            created_at: Utc::now(),
        };
        assert!(pending.target().is_err());
    }
}
