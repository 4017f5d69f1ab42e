use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::entitlement::{adjusted_cursus_price, Ownership};
use crate::models::catalog::{CatalogCursus, CatalogLesson, CatalogTheme, Cursus, Lesson, Theme};

pub struct CatalogService;

impl CatalogService {
    pub async fn lesson(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "SELECT id, cursus_id, title, content, video_url, price, created_at
             FROM lessons WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(lesson)
    }

    /// Full browse tree, in insertion order, annotated for one user (or anonymous with an empty ownership).
    pub async fn browse(pool: &PgPool, ownership: &Ownership) -> anyhow::Result<Vec<CatalogTheme>> {
        let themes = sqlx::query_as::<_, Theme>(
            "SELECT id, name, created_at FROM themes ORDER BY position",
        )
        .fetch_all(pool)
        .await?;
        let cursus = sqlx::query_as::<_, Cursus>(
            "SELECT id, theme_id, name, price, created_at FROM cursus ORDER BY position",
        )
        .fetch_all(pool)
        .await?;
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT id, cursus_id, title, content, video_url, price, created_at
             FROM lessons ORDER BY position",
        )
        .fetch_all(pool)
        .await?;

        Ok(build_catalog(themes, cursus, lessons, ownership))
    }
}

/// Group the flat catalog tables into the browse tree. Input order is kept.
pub fn build_catalog(
    themes: Vec<Theme>,
    cursus: Vec<Cursus>,
    lessons: Vec<Lesson>,
    ownership: &Ownership,
) -> Vec<CatalogTheme> {
    let mut lessons_by_cursus: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
    for lesson in lessons {
        lessons_by_cursus.entry(lesson.cursus_id).or_default().push(lesson);
    }
    let mut cursus_by_theme: HashMap<Uuid, Vec<Cursus>> = HashMap::new();
    for c in cursus {
        cursus_by_theme.entry(c.theme_id).or_default().push(c);
    }

    themes
        .into_iter()
        .map(|theme| {
            let cursus = cursus_by_theme
                .remove(&theme.id)
                .unwrap_or_default()
                .into_iter()
                .map(|c| {
                    let lessons = lessons_by_cursus.remove(&c.id).unwrap_or_default();
                    project_cursus(c, lessons, ownership)
                })
                .collect();
            CatalogTheme {
                id: theme.id,
                name: theme.name,
                cursus,
            }
        })
        .collect()
}

fn project_cursus(cursus: Cursus, lessons: Vec<Lesson>, ownership: &Ownership) -> CatalogCursus {
    let prices: Vec<(Uuid, Decimal)> = lessons.iter().map(|l| (l.id, l.price)).collect();
    let owned_here: HashSet<Uuid> = prices
        .iter()
        .map(|(id, _)| *id)
        .filter(|id| ownership.owns_lesson(*id))
        .collect();
    let all_lessons_owned = !lessons.is_empty() && owned_here.len() == lessons.len();
    let owns_cursus = ownership.owns_cursus(cursus.id);

    let adjusted_price = if owns_cursus {
        Decimal::ZERO
    } else {
        adjusted_cursus_price(cursus.price, &prices, &owned_here)
    };

    let lessons = lessons
        .into_iter()
        .enumerate()
        .map(|(idx, lesson)| CatalogLesson {
            is_purchased: ownership.owns_lesson(lesson.id),
            has_access: ownership.grants(lesson.id, cursus.id),
            id: lesson.id,
            title: lesson.title,
            price: lesson.price,
            index: idx + 1,
        })
        .collect();

    CatalogCursus {
        id: cursus.id,
        name: cursus.name,
        price: cursus.price,
        adjusted_price,
        has_purchased_cursus: owns_cursus || all_lessons_owned,
        lessons,
    }
}
