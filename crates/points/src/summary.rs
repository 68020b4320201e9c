use advisorhub_shared::{Result, not_found};
use serde::Serialize;

use crate::{LedgerEntry, MembershipTier, repository, member::resolve_tier};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSummary {
    pub member_id: String,
    pub current_balance: i64,
    pub lifetime_earned: i64,
    pub lifetime_spent: i64,
    pub lifetime_expired: i64,
    pub tier: MembershipTier,
    pub referral_code: String,
    pub recent_entries: Vec<LedgerEntry>,
}

impl super::Command {
    pub async fn get_user_points_summary(&self, member_id: &str) -> Result<PointsSummary> {
        let recent = self.config.recent_entries;

        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            let Some(member) = repository::find_member(&mut conn, member_id).await? else {
                not_found!("member {}", member_id);
            };

            let tier = resolve_tier(&mut conn, &member).await?;
            let recent_entries = repository::list_entries(&mut conn, member_id, recent, 0).await?;

            Ok(PointsSummary {
                member_id: member.id,
                current_balance: member.current_balance,
                lifetime_earned: member.lifetime_earned,
                lifetime_spent: member.lifetime_spent,
                lifetime_expired: member.lifetime_expired,
                tier,
                referral_code: member.referral_code,
                recent_entries,
            })
        })
        .await
    }

    /// Ledger history, newest first. `limit` is capped at 100.
    pub async fn list_entries(&self, member_id: &str, limit: u64, offset: u64) -> Result<Vec<LedgerEntry>> {
        let limit = match limit {
            0 => 20,
            limit => limit.min(100),
        };

        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::list_entries(&mut conn, member_id, limit, offset).await
        })
        .await
    }

    pub async fn find_entry(&self, entry_id: &str) -> Result<Option<LedgerEntry>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::find_entry(&mut conn, entry_id).await
        })
        .await
    }
}
