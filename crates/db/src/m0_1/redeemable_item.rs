use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::RedeemableItem;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(RedeemableItem::Table)
        .col(
            ColumnDef::new(RedeemableItem::Id)
                .string()
                .not_null()
                .string_len(64)
                .primary_key(),
        )
        .col(
            ColumnDef::new(RedeemableItem::Name)
                .string()
                .not_null()
                .string_len(100),
        )
        .col(
            ColumnDef::new(RedeemableItem::PointsCost)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(RedeemableItem::Stock)
                .big_integer()
                .not_null()
                .default(-1),
        )
        .col(
            ColumnDef::new(RedeemableItem::StockUsed)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(ColumnDef::new(RedeemableItem::PerUserMax).big_integer().null())
        .col(
            ColumnDef::new(RedeemableItem::MembershipRequired)
                .text()
                .not_null(),
        )
        .col(
            ColumnDef::new(RedeemableItem::IsActive)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(RedeemableItem::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .col(ColumnDef::new(RedeemableItem::UpdatedAt).big_integer().null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(RedeemableItem::Table).to_owned()
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
