use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::LedgerEntry;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(LedgerEntry::Table)
        .col(
            ColumnDef::new(LedgerEntry::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(LedgerEntry::MemberId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(ColumnDef::new(LedgerEntry::Seq).big_integer().not_null())
        .col(
            ColumnDef::new(LedgerEntry::EntryType)
                .string()
                .not_null()
                .string_len(10),
        )
        .col(ColumnDef::new(LedgerEntry::Amount).big_integer().not_null())
        .col(
            ColumnDef::new(LedgerEntry::BalanceBefore)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(LedgerEntry::BalanceAfter)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(LedgerEntry::RuleId)
                .string()
                .null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(LedgerEntry::ItemId)
                .string()
                .null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(LedgerEntry::Reason)
                .string()
                .null()
                .string_len(500),
        )
        .col(
            ColumnDef::new(LedgerEntry::SourceEntryId)
                .string()
                .null()
                .string_len(26),
        )
        .col(ColumnDef::new(LedgerEntry::ExpiresAt).big_integer().null())
        .col(
            ColumnDef::new(LedgerEntry::IsExpired)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(LedgerEntry::CreatedAt).big_integer().not_null())
        .col(
            ColumnDef::new(LedgerEntry::CreatedBy)
                .string()
                .not_null()
                .string_len(64),
        )
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(LedgerEntry::Table).to_owned()
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
