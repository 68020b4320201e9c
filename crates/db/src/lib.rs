use sqlx_migrator::{
    Info, Migrator,
    migrator::{Migrate, Plan},
};

mod m0_1;
mod m0_2;
pub mod table;

pub fn migrator() -> Result<Migrator<sqlx::Sqlite>, sqlx_migrator::Error> {
    let mut migrator = Migrator::default();
    migrator.add_migrations(vec![Box::new(m0_1::Migration), Box::new(m0_2::Migration)])?;

    Ok(migrator)
}

/// Apply every pending migration on the given pool.
pub async fn migrate(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    migrator()?.run(&mut conn, &Plan::apply_all()).await?;

    Ok(())
}
