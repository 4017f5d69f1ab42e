use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::catalog::Lesson;
use crate::services::progress::LessonProgress;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Certification {
    pub id: Uuid,
    pub theme_id: Uuid,
    pub theme_name: String,
    pub certified_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    pub lesson: Lesson,
    pub progress: LessonProgress,
    pub is_completed: bool,
    pub is_validated: bool,
    pub cursus_complete: bool,
}

impl LessonView {
    pub fn new(lesson: Lesson, progress: LessonProgress, cursus_complete: bool) -> Self {
        Self {
            lesson,
            progress,
            is_completed: progress != LessonProgress::Unseen,
            is_validated: progress == LessonProgress::Validated,
            cursus_complete,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ThemeCompletion {
    pub theme_id: Uuid,
    pub complete: bool,
    pub certified: bool,
}
