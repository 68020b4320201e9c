use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::PointsRule;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(PointsRule::Table)
        .col(
            ColumnDef::new(PointsRule::Id)
                .string()
                .not_null()
                .string_len(64)
                .primary_key(),
        )
        .col(
            ColumnDef::new(PointsRule::Name)
                .string()
                .not_null()
                .string_len(100),
        )
        .col(
            ColumnDef::new(PointsRule::Category)
                .string()
                .not_null()
                .string_len(25),
        )
        .col(ColumnDef::new(PointsRule::Points).big_integer().not_null())
        .col(ColumnDef::new(PointsRule::DailyMax).big_integer().null())
        .col(ColumnDef::new(PointsRule::WeeklyMax).big_integer().null())
        .col(ColumnDef::new(PointsRule::MonthlyMax).big_integer().null())
        .col(ColumnDef::new(PointsRule::TotalMax).big_integer().null())
        .col(ColumnDef::new(PointsRule::CooldownMinutes).big_integer().null())
        .col(
            ColumnDef::new(PointsRule::IsActive)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(PointsRule::IsSystemRule)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(PointsRule::CreatedAt).big_integer().not_null())
        .col(ColumnDef::new(PointsRule::UpdatedAt).big_integer().null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(PointsRule::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTable {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}
