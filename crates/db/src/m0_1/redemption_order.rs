use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::RedemptionOrder;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(RedemptionOrder::Table)
        .col(
            ColumnDef::new(RedemptionOrder::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(RedemptionOrder::MemberId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(RedemptionOrder::ItemId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(RedemptionOrder::EntryId)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(RedemptionOrder::PointsCost)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(RedemptionOrder::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(RedemptionOrder::Table).to_owned()
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
