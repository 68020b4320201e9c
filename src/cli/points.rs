use advisorhub::config::Config;
use advisorhub_points::{AdjustInput, Command, Direction};
use advisorhub_shared::{Metadata, State};
use anyhow::Result;
use sqlx::{Sqlite, migrate::MigrateDatabase};
use time::OffsetDateTime;

async fn command(config: &Config) -> Result<Command> {
    let pool = advisorhub::create_pool(&config.database.url, 1).await?;

    Ok(Command::new(State::from_pool(pool), config.points.clone()))
}

#[tracing::instrument(skip(config))]
pub async fn migrate(config: &Config) -> Result<()> {
    tracing::info!("Running database migrations...");

    if !Sqlite::database_exists(&config.database.url).await? {
        tracing::info!("Database does not exist, creating: {}", config.database.url);
        Sqlite::create_database(&config.database.url).await?;
    }

    let pool = advisorhub::create_pool(&config.database.url, 1).await?;
    advisorhub_db::migrate(&pool).await?;
    pool.close().await;

    tracing::info!("Migrations completed successfully");

    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn reset(config: &Config) -> Result<()> {
    tracing::info!("Resetting database...");

    if Sqlite::database_exists(&config.database.url).await? {
        tracing::warn!("Dropping existing database: {}", config.database.url);
        Sqlite::drop_database(&config.database.url).await?;
    } else {
        tracing::info!("Database does not exist, nothing to drop");
    }

    migrate(config).await?;

    tracing::info!("Database reset completed successfully");

    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn sweep(config: &Config, as_of: Option<i64>) -> Result<()> {
    let as_of = match as_of {
        Some(as_of) => OffsetDateTime::from_unix_timestamp(as_of)?,
        None => OffsetDateTime::now_utc(),
    };

    let report = command(config).await?.sweep_expired(as_of).await?;

    for failure in &report.failures {
        tracing::error!(member_id = %failure.member_id, err = %failure.error, "member sweep failed");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[tracing::instrument(skip(config, reason))]
pub async fn adjust(
    config: &Config,
    member_id: String,
    direction: Direction,
    amount: i64,
    reason: String,
    actor: String,
) -> Result<()> {
    let input = AdjustInput {
        member_id,
        direction,
        amount,
        reason,
    };

    let outcome = command(config)
        .await?
        .adjust_points(input, &Metadata::by(actor))
        .await?;

    if !outcome.audit_logged {
        tracing::warn!(entry_id = %outcome.entry.id, "adjustment committed without audit record");
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
