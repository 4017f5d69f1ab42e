use std::collections::HashSet;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{catalog::Lesson, progress::Certification},
    services::metrics,
};

/// Per-(user, lesson) progression: UNSEEN -> COMPLETED -> VALIDATED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonProgress {
    Unseen,
    Completed,
    Validated,
}

impl LessonProgress {
    pub fn from_records(completed: bool, validated: bool) -> Self {
        match (completed, validated) {
            (_, true) => LessonProgress::Validated,
            (true, false) => LessonProgress::Completed,
            (false, false) => LessonProgress::Unseen,
        }
    }

    /// Marking an already completed or validated lesson changes nothing.
    pub fn mark_completed(self) -> Self {
        match self {
            LessonProgress::Unseen => LessonProgress::Completed,
            other => other,
        }
    }

    /// Validation is only reachable once the lesson is completed.
    pub fn validate(self) -> Option<Self> {
        match self {
            LessonProgress::Unseen => None,
            LessonProgress::Completed | LessonProgress::Validated => Some(LessonProgress::Validated),
        }
    }
}

/// True when `validated` covers exactly the non-empty set `all`.
pub fn is_complete(all: &[Uuid], validated: &[Uuid]) -> bool {
    if all.is_empty() {
        return false;
    }
    let all: HashSet<&Uuid> = all.iter().collect();
    let validated: HashSet<&Uuid> = validated.iter().collect();
    all == validated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    NotYet,
    Issued,
    AlreadyHeld,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub lesson_id: Uuid,
    pub cursus_id: Uuid,
    pub theme_id: Uuid,
    pub cursus_complete: bool,
    pub theme_complete: bool,
    pub certification: CertificationStatus,
}

pub struct ProgressService;

impl ProgressService {
    pub async fn progress(pool: &PgPool, user_id: Uuid, lesson_id: Uuid) -> anyhow::Result<LessonProgress> {
        let (completed, validated): (bool, bool) = sqlx::query_as(
            "SELECT
                EXISTS(SELECT 1 FROM lesson_completions WHERE user_id = $1 AND lesson_id = $2),
                EXISTS(SELECT 1 FROM validations WHERE user_id = $1 AND lesson_id = $2)",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_one(pool)
        .await?;
        Ok(LessonProgress::from_records(completed, validated))
    }

    /// Get-or-create the completion record. Returns whether it was created.
    pub async fn mark_completed(pool: &PgPool, user_id: Uuid, lesson_id: Uuid) -> anyhow::Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO lesson_completions (user_id, lesson_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, lesson_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(lesson_id)
        .execute(pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    /// Record the validation, then re-derive cursus and theme completion and
    /// issue the theme certification when every lesson of the theme is validated.
    /// Caller has already checked access.
    pub async fn validate_lesson(
        pool: &PgPool,
        user_id: Uuid,
        lesson: &Lesson,
    ) -> Result<ValidationOutcome, AppError> {
        let current = Self::progress(pool, user_id, lesson.id).await?;
        if current.validate().is_none() {
            return Err(AppError::NotCompleted(lesson.id));
        }

        let mut tx = pool.begin().await?;

        let newly_validated = sqlx::query(
            "INSERT INTO validations (user_id, lesson_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, lesson_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(lesson.id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let theme_id: Uuid = sqlx::query_scalar("SELECT theme_id FROM cursus WHERE id = $1")
            .bind(lesson.cursus_id)
            .fetch_one(&mut *tx)
            .await?;

        let cursus_complete = cursus_completion(&mut *tx, user_id, lesson.cursus_id).await?;
        let theme_complete = theme_completion(&mut *tx, user_id, theme_id).await?;

        let certification = if theme_complete {
            let issued = sqlx::query(
                "INSERT INTO certifications (user_id, theme_id)
                 VALUES ($1, $2)
                 ON CONFLICT (user_id, theme_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(theme_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0;
            if issued {
                CertificationStatus::Issued
            } else {
                CertificationStatus::AlreadyHeld
            }
        } else {
            // A certification issued earlier stays even if the theme grew since.
            let held: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM certifications WHERE user_id = $1 AND theme_id = $2)",
            )
            .bind(user_id)
            .bind(theme_id)
            .fetch_one(&mut *tx)
            .await?;
            if held {
                CertificationStatus::AlreadyHeld
            } else {
                CertificationStatus::NotYet
            }
        };

        tx.commit().await?;

        if newly_validated {
            metrics::VALIDATIONS_COUNTER.inc();
            tracing::info!(%user_id, lesson_id = %lesson.id, "Lesson validated");
        }
        if cursus_complete {
            tracing::info!(%user_id, cursus_id = %lesson.cursus_id, "Cursus fully validated");
        }
        if certification == CertificationStatus::Issued {
            metrics::CERTIFICATIONS_COUNTER.inc();
            tracing::info!(%user_id, %theme_id, "Certification issued");
        }

        Ok(ValidationOutcome {
            lesson_id: lesson.id,
            cursus_id: lesson.cursus_id,
            theme_id,
            cursus_complete,
            theme_complete,
            certification,
        })
    }

    /// Recomputed on every call from current validation rows; never cached.
    pub async fn is_theme_complete(pool: &PgPool, user_id: Uuid, theme_id: Uuid) -> anyhow::Result<bool> {
        let mut conn = pool.acquire().await?;
        theme_completion(&mut *conn, user_id, theme_id).await
    }

    pub async fn is_cursus_complete(pool: &PgPool, user_id: Uuid, cursus_id: Uuid) -> anyhow::Result<bool> {
        let mut conn = pool.acquire().await?;
        cursus_completion(&mut *conn, user_id, cursus_id).await
    }

    pub async fn list_certifications(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Certification>> {
        let certifications = sqlx::query_as::<_, Certification>(
            "SELECT c.id, c.theme_id, t.name AS theme_name, c.certified_at
             FROM certifications c
             JOIN themes t ON t.id = c.theme_id
             WHERE c.user_id = $1
             ORDER BY c.certified_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(certifications)
    }
}

async fn cursus_completion(conn: &mut PgConnection, user_id: Uuid, cursus_id: Uuid) -> anyhow::Result<bool> {
    let all: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM lessons WHERE cursus_id = $1")
        .bind(cursus_id)
        .fetch_all(&mut *conn)
        .await?;
    let validated: Vec<Uuid> = sqlx::query_scalar(
        "SELECT v.lesson_id FROM validations v
         JOIN lessons l ON l.id = v.lesson_id
         WHERE v.user_id = $1 AND l.cursus_id = $2",
    )
    .bind(user_id)
    .bind(cursus_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(is_complete(&all, &validated))
}

async fn theme_completion(conn: &mut PgConnection, user_id: Uuid, theme_id: Uuid) -> anyhow::Result<bool> {
    let all: Vec<Uuid> = sqlx::query_scalar(
        "SELECT l.id FROM lessons l
         JOIN cursus c ON c.id = l.cursus_id
         WHERE c.theme_id = $1",
    )
    .bind(theme_id)
    .fetch_all(&mut *conn)
    .await?;
    let validated: Vec<Uuid> = sqlx::query_scalar(
        "SELECT v.lesson_id FROM validations v
         JOIN lessons l ON l.id = v.lesson_id
         JOIN cursus c ON c.id = l.cursus_id
         WHERE v.user_id = $1 AND c.theme_id = $2",
    )
    .bind(user_id)
    .bind(theme_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(is_complete(&all, &validated))
}
