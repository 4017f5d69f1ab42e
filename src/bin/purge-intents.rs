/// Delete pending checkouts whose confirmation window has passed.
/// Run periodically (e.g., via cron job: */15 * * * * /app/purge-intents)
///
/// Usage: purge-intents [--dry-run]
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use knowledge_api::services::checkout::CheckoutService;

#[derive(Parser)]
#[command(name = "purge-intents", about = "Purge expired pending checkouts")]
struct Args {
    /// Only report how many intents have expired
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    if args.dry_run {
        let expired = CheckoutService::count_expired(&pool).await?;
        tracing::info!("{} expired pending checkout(s) would be purged", expired);
        return Ok(());
    }

    let purged = CheckoutService::purge_expired(&pool).await?;
    tracing::info!("Purge complete: {} pending checkout(s) removed", purged);
    Ok(())
}
