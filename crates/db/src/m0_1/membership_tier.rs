use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::MembershipTier;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(MembershipTier::Table)
        .col(
            ColumnDef::new(MembershipTier::Id)
                .string()
                .not_null()
                .string_len(64)
                .primary_key(),
        )
        .col(
            ColumnDef::new(MembershipTier::Name)
                .string()
                .not_null()
                .string_len(50),
        )
        .col(ColumnDef::new(MembershipTier::Priority).integer().not_null())
        .col(
            ColumnDef::new(MembershipTier::PointsMultiplier)
                .double()
                .not_null()
                .default(1.0),
        )
        .col(
            ColumnDef::new(MembershipTier::CanEarnPoints)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(MembershipTier::CanRedeemPoints)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(MembershipTier::CanUseTools)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(MembershipTier::CanExport)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(MembershipTier::CanAccessAi)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(MembershipTier::MaxClients).integer().null())
        .col(
            ColumnDef::new(MembershipTier::IsActive)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(
            ColumnDef::new(MembershipTier::IsDefault)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(MembershipTier::IsPermanent)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(MembershipTier::CreatedAt)
                .big_integer()
                .not_null(),
        )
        .col(ColumnDef::new(MembershipTier::UpdatedAt).big_integer().null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(MembershipTier::Table).to_owned()
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
