use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    catalog::{Cursus, Lesson},
    purchase::{CursusQuote, PurchaseTarget},
};

/// Everything a user has bought, as two id sets.
#[derive(Debug, Clone, Default)]
pub struct Ownership {
    lessons: HashSet<Uuid>,
    cursus: HashSet<Uuid>,
}

impl Ownership {
    pub fn new(lessons: impl IntoIterator<Item = Uuid>, cursus: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            lessons: lessons.into_iter().collect(),
            cursus: cursus.into_iter().collect(),
        }
    }

    pub fn owns_lesson(&self, lesson_id: Uuid) -> bool {
        self.lessons.contains(&lesson_id)
    }

    pub fn owns_cursus(&self, cursus_id: Uuid) -> bool {
        self.cursus.contains(&cursus_id)
    }

    /// Access to a lesson comes from buying it or buying its cursus.
    pub fn grants(&self, lesson_id: Uuid, cursus_id: Uuid) -> bool {
        self.owns_lesson(lesson_id) || self.owns_cursus(cursus_id)
    }

    /// Returns the refusal message when `target` may not be bought again.
    /// `parent_cursus` is the cursus of a lesson target.
    pub fn purchase_blocker(
        &self,
        target: PurchaseTarget,
        parent_cursus: Option<Uuid>,
    ) -> Option<&'static str> {
        match target {
            PurchaseTarget::Lesson(id) if self.owns_lesson(id) => Some("Lesson already purchased"),
            PurchaseTarget::Lesson(_) if parent_cursus.is_some_and(|c| self.owns_cursus(c)) => {
                Some("Cursus containing this lesson already purchased")
            }
            PurchaseTarget::Cursus(id) if self.owns_cursus(id) => Some("Cursus already purchased"),
            _ => None,
        }
    }
}

/// Price of a whole cursus once individually bought lessons are deducted.
///
/// - no lesson owned: the catalog price of the cursus
/// - some owned: the sum of the remaining lessons' prices
/// - all owned: zero
pub fn adjusted_cursus_price(
    catalog_price: Decimal,
    lessons: &[(Uuid, Decimal)],
    owned: &HashSet<Uuid>,
) -> Decimal {
    let owned_count = lessons.iter().filter(|(id, _)| owned.contains(id)).count();
    if owned_count == 0 {
        return catalog_price;
    }
    lessons
        .iter()
        .filter(|(id, _)| !owned.contains(id))
        .map(|(_, price)| *price)
        .sum()
}

impl CursusQuote {
    pub fn compute(cursus: &Cursus, lessons: &[(Uuid, Decimal)], owned: &HashSet<Uuid>) -> Self {
        let owned_lessons = lessons.iter().filter(|(id, _)| owned.contains(id)).count();
        Self {
            cursus_id: cursus.id,
            name: cursus.name.clone(),
            catalog_price: cursus.price,
            adjusted_price: adjusted_cursus_price(cursus.price, lessons, owned),
            owned_lessons,
            remaining_lessons: lessons.len() - owned_lessons,
        }
    }

    /// Every lesson of a non-empty cursus is already owned.
    pub fn fully_owned(&self) -> bool {
        self.owned_lessons > 0 && self.remaining_lessons == 0
    }
}

pub struct EntitlementService;

impl EntitlementService {
    pub async fn owned_targets(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Ownership> {
        let rows: Vec<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
            "SELECT lesson_id, cursus_id FROM purchases WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut ownership = Ownership::default();
        for (lesson_id, cursus_id) in rows {
            ownership.lessons.extend(lesson_id);
            ownership.cursus.extend(cursus_id);
        }
        Ok(ownership)
    }

    pub async fn has_lesson_access(
        pool: &PgPool,
        user_id: Uuid,
        lesson: &Lesson,
    ) -> anyhow::Result<bool> {
        let granted: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM purchases
                WHERE user_id = $1 AND (lesson_id = $2 OR cursus_id = $3)
             )",
        )
        .bind(user_id)
        .bind(lesson.id)
        .bind(lesson.cursus_id)
        .fetch_one(pool)
        .await?;
        Ok(granted)
    }

    /// Takes a connection so checkout can requote inside its recording transaction.
    pub async fn quote_cursus(
        conn: &mut PgConnection,
        user_id: Uuid,
        cursus_id: Uuid,
    ) -> anyhow::Result<Option<CursusQuote>> {
        let cursus = sqlx::query_as::<_, Cursus>(
            "SELECT id, theme_id, name, price, created_at FROM cursus WHERE id = $1",
        )
        .bind(cursus_id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(cursus) = cursus else {
            return Ok(None);
        };

        let lessons: Vec<(Uuid, Decimal)> = sqlx::query_as(
            "SELECT id, price FROM lessons WHERE cursus_id = $1 ORDER BY position",
        )
        .bind(cursus_id)
        .fetch_all(&mut *conn)
        .await?;

        let owned: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT l.id FROM purchases p
             JOIN lessons l ON l.id = p.lesson_id
             WHERE p.user_id = $1 AND l.cursus_id = $2",
        )
        .bind(user_id)
        .bind(cursus_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

        Ok(Some(CursusQuote::compute(&cursus, &lessons, &owned)))
    }
}
