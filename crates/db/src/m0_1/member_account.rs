use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::MemberAccount;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(MemberAccount::Table)
        .col(
            ColumnDef::new(MemberAccount::Id)
                .string()
                .not_null()
                .string_len(64)
                .primary_key(),
        )
        .col(
            ColumnDef::new(MemberAccount::PrimaryTierId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(MemberAccount::CurrentBalance)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MemberAccount::LifetimeEarned)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MemberAccount::LifetimeSpent)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MemberAccount::LifetimeExpired)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MemberAccount::Timezone)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(MemberAccount::ReferralCode)
                .string()
                .not_null()
                .string_len(26),
        )
        .col(
            ColumnDef::new(MemberAccount::ReferredBy)
                .string()
                .null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(MemberAccount::Version)
                .big_integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(MemberAccount::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .col(ColumnDef::new(MemberAccount::UpdatedAt).big_integer().null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(MemberAccount::Table).to_owned()
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
