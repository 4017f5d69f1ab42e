use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Theme {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cursus {
    pub id: Uuid,
    pub theme_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub cursus_id: Uuid,
    pub title: String,
    pub content: String,
    pub video_url: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Browse projection: one entry per theme, with every cursus and lesson
/// annotated for the requesting user.
#[derive(Debug, Serialize)]
pub struct CatalogTheme {
    pub id: Uuid,
    pub name: String,
    pub cursus: Vec<CatalogCursus>,
}

#[derive(Debug, Serialize)]
pub struct CatalogCursus {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub adjusted_price: Decimal,
    pub has_purchased_cursus: bool,
    pub lessons: Vec<CatalogLesson>,
}

#[derive(Debug, Serialize)]
pub struct CatalogLesson {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub index: usize,
    /// Bought individually.
    pub is_purchased: bool,
    /// Bought individually or through the parent cursus.
    pub has_access: bool,
}
