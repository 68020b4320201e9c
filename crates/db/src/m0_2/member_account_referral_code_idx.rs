use sea_query::{Index, IndexCreateStatement, IndexDropStatement};

use crate::table::MemberAccount;

pub struct CreateIndex;

fn create_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_member_account_referral_code")
        .table(MemberAccount::Table)
        .unique()
        .col(MemberAccount::ReferralCode)
        .to_owned()
}

fn drop_index() -> IndexDropStatement {
    Index::drop()
        .name("idx_member_account_referral_code")
        .table(MemberAccount::Table)
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
