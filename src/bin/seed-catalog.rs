//! Catalog seed script
//!
//! Creates the beta catalog: four themes, six cursus of two lessons each.
//! Optionally creates an activated demo client account.
//!
//! Usage:
//!   DATABASE_URL=... ./seed-catalog [--reset] [--demo-email EMAIL]
//!
//! Environment variables:
//!   DATABASE_URL   PostgreSQL connection string (required)
//!   DEMO_PASSWORD  Password for the demo account (default: Demo2024!)

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "seed-catalog", about = "Populate the knowledge catalog with its initial data")]
struct Args {
    /// Delete the existing catalog (and every purchase and progress row) first
    #[arg(long)]
    reset: bool,

    /// Also create an activated client account with this email
    #[arg(long)]
    demo_email: Option<String>,
}

struct SeedLesson {
    title: &'static str,
    price_cents: i64,
}

struct SeedCursus {
    name: &'static str,
    price_cents: i64,
    lessons: [SeedLesson; 2],
}

struct SeedTheme {
    name: &'static str,
    cursus: &'static [SeedCursus],
}

const fn lesson(title: &'static str, price_cents: i64) -> SeedLesson {
    SeedLesson { title, price_cents }
}

const CATALOG: &[SeedTheme] = &[
    SeedTheme {
        name: "Musique",
        cursus: &[
            SeedCursus {
                name: "Initiation à la guitare",
                price_cents: 5000,
                lessons: [
                    lesson("Découverte de l’instrument", 2600),
                    lesson("Les accords et les gammes", 2600),
                ],
            },
            SeedCursus {
                name: "Initiation au piano",
                price_cents: 5000,
                lessons: [
                    lesson("Découverte de l’instrument", 2600),
                    lesson("Les accords et les gammes", 2600),
                ],
            },
        ],
    },
    SeedTheme {
        name: "Informatique",
        cursus: &[SeedCursus {
            name: "Initiation au développement web",
            price_cents: 6000,
            lessons: [
                lesson("Les langages Html et CSS", 3200),
                lesson("Dynamiser votre site avec Javascript", 3200),
            ],
        }],
    },
    SeedTheme {
        name: "Jardinage",
        cursus: &[SeedCursus {
            name: "Initiation au jardinage",
            price_cents: 3000,
            lessons: [
                lesson("Les outils du jardinier", 1600),
                lesson("Jardiner avec la lune", 1600),
            ],
        }],
    },
    SeedTheme {
        name: "Cuisine",
        cursus: &[
            SeedCursus {
                name: "Initiation à la cuisine",
                price_cents: 4400,
                lessons: [
                    lesson("Les modes de cuisson", 2300),
                    lesson("Les saveurs", 2300),
                ],
            },
            SeedCursus {
                name: "Initiation à l’art du dressage culinaire",
                price_cents: 4800,
                lessons: [
                    lesson("Mettre en œuvre le style dans l’assiette", 2600),
                    lesson("Harmoniser un repas à quatre plats", 2600),
                ],
            },
        ],
    },
];

const LESSON_CONTENT: &str = "Lorem ipsum...";
const LESSON_VIDEO: &str = "https://example.com/video";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    knowledge_api::db::run_migrations(&pool).await?;

    if args.reset {
        tracing::info!("Removing existing catalog");
        // Progress and certifications go with their themes and lessons (ON DELETE CASCADE).
        sqlx::query("DELETE FROM purchases").execute(&pool).await?;
        sqlx::query("DELETE FROM pending_checkouts").execute(&pool).await?;
        sqlx::query("DELETE FROM themes").execute(&pool).await?;
    } else {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM themes")
            .fetch_one(&pool)
            .await?;
        if existing > 0 {
            tracing::warn!("Catalog already has {} theme(s); run with --reset to replace it", existing);
            return Ok(());
        }
    }

    seed_catalog(&pool).await?;

    if let Some(email) = args.demo_email {
        let password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());
        seed_demo_user(&pool, &email, &password).await?;
    }

    tracing::info!("Successfully populated the database with initial data");
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    let mut lesson_count = 0;

    for theme in CATALOG {
        let theme_id: Uuid = sqlx::query_scalar("INSERT INTO themes (name) VALUES ($1) RETURNING id")
            .bind(theme.name)
            .fetch_one(&mut *tx)
            .await?;

        for cursus in theme.cursus {
            let cursus_id: Uuid = sqlx::query_scalar(
                "INSERT INTO cursus (theme_id, name, price) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(theme_id)
            .bind(cursus.name)
            .bind(Decimal::new(cursus.price_cents, 2))
            .fetch_one(&mut *tx)
            .await?;

            for lesson in &cursus.lessons {
                sqlx::query(
                    "INSERT INTO lessons (cursus_id, title, content, video_url, price)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(cursus_id)
                .bind(lesson.title)
                .bind(LESSON_CONTENT)
                .bind(LESSON_VIDEO)
                .bind(Decimal::new(lesson.price_cents, 2))
                .execute(&mut *tx)
                .await?;
                lesson_count += 1;
            }
        }
        tracing::info!("  Theme created: {}", theme.name);
    }

    tx.commit().await?;
    tracing::info!("{} themes and {} lessons created", CATALOG.len(), lesson_count);
    Ok(())
}

async fn seed_demo_user(pool: &PgPool, email: &str, password: &str) -> Result<()> {
    let email = email.trim().to_lowercase();
    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let username = email.split('@').next().unwrap_or("demo").to_string();

    sqlx::query(
        "INSERT INTO users (email, password_hash, username, role, is_active)
         VALUES ($1, $2, $3, 'client', TRUE)
         ON CONFLICT (email) DO UPDATE
         SET password_hash = EXCLUDED.password_hash, is_active = TRUE, updated_at = NOW()",
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(&username)
    .execute(pool)
    .await?;

    tracing::info!("  Demo account ready: {}", email);
    Ok(())
}
