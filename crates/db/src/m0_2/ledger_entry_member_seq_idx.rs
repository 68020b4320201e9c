use sea_query::{Index, IndexCreateStatement, IndexDropStatement};

use crate::table::LedgerEntry;

pub struct CreateIndex;

fn create_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_ledger_entry_member_seq")
        .table(LedgerEntry::Table)
        .unique()
        .col(LedgerEntry::MemberId)
        .col(LedgerEntry::Seq)
        .to_owned()
}

fn drop_index() -> IndexDropStatement {
    Index::drop()
        .name("idx_ledger_entry_member_seq")
        .table(LedgerEntry::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateIndex {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_index().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_index().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}
