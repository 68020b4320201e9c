use sea_query::{ColumnDef, Table, TableCreateStatement, TableDropStatement};

use crate::table::AuditLog;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(AuditLog::Table)
        .col(
            ColumnDef::new(AuditLog::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(AuditLog::OperatorId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(AuditLog::OperatorEmail)
                .string()
                .not_null()
                .string_len(320),
        )
        .col(
            ColumnDef::new(AuditLog::Action)
                .string()
                .not_null()
                .string_len(50),
        )
        .col(
            ColumnDef::new(AuditLog::Module)
                .string()
                .not_null()
                .string_len(25),
        )
        .col(
            ColumnDef::new(AuditLog::TargetId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(AuditLog::TargetName)
                .string()
                .not_null()
                .string_len(100),
        )
        .col(ColumnDef::new(AuditLog::Changes).text().not_null())
        .col(
            ColumnDef::new(AuditLog::Description)
                .string()
                .not_null()
                .string_len(500),
        )
        .col(ColumnDef::new(AuditLog::CreatedAt).big_integer().not_null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(AuditLog::Table).to_owned()
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
