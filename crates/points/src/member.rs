use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Metadata, Result, invalid, not_found};
use serde::Deserialize;
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use ulid::Ulid;
use validator::Validate;

use crate::{MemberAccount, MembershipTier, repository, window::is_known_timezone};

/// The tier whose permissions apply to `member`: its primary tier while that
/// tier is active, the default tier otherwise.
pub(crate) async fn resolve_tier(
    conn: &mut SqliteConnection,
    member: &MemberAccount,
) -> Result<MembershipTier> {
    if let Some(tier) = repository::find_tier(&mut *conn, &member.primary_tier_id).await? {
        if tier.is_active {
            return Ok(tier);
        }
    }

    match repository::find_default_tier(conn).await? {
        Some(tier) => Ok(tier),
        None => not_found!("default tier"),
    }
}

#[derive(Validate, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrollInput {
    #[validate(length(min = 1, max = 64))]
    pub member_id: String,
    pub timezone: Option<String>,
    pub tier_id: Option<String>,
}

impl super::Command {
    #[tracing::instrument(skip_all, fields(member_id = %input.member_id))]
    pub async fn enroll(&self, input: EnrollInput, metadata: &Metadata) -> Result<MemberAccount> {
        input.validate()?;

        let timezone = input
            .timezone
            .to_owned()
            .unwrap_or_else(|| self.config.default_timezone.to_owned());

        if !is_known_timezone(&timezone) {
            invalid!("unknown timezone {}", timezone);
        }

        let member = self
            .transaction(move |conn| {
                let input = input.clone();
                let timezone = timezone.clone();
                Box::pin(async move {
                    if repository::find_member(&mut *conn, &input.member_id)
                        .await?
                        .is_some()
                    {
                        invalid!("member {} is already enrolled", input.member_id);
                    }

                    let tier = match &input.tier_id {
                        Some(tier_id) => match repository::find_tier(&mut *conn, tier_id).await? {
                            Some(tier) if tier.is_active => tier,
                            _ => not_found!("tier {}", tier_id),
                        },
                        None => match repository::find_default_tier(&mut *conn).await? {
                            Some(tier) => tier,
                            None => not_found!("default tier"),
                        },
                    };

                    let member = MemberAccount {
                        id: input.member_id,
                        primary_tier_id: tier.id,
                        current_balance: 0,
                        lifetime_earned: 0,
                        lifetime_spent: 0,
                        lifetime_expired: 0,
                        timezone,
                        referral_code: Ulid::new().to_string(),
                        referred_by: None,
                        version: 0,
                        created_at: OffsetDateTime::now_utc().unix_timestamp(),
                    };

                    repository::insert_member(&mut *conn, &member).await?;

                    Ok(member)
                })
            })
            .await?;

        tracing::info!(member_id = %member.id, tier_id = %member.primary_tier_id, "member enrolled");

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::MemberEnroll, &member.id, &member.id)
                .changes(Changes::new(serde_json::Value::Null, &member)),
        )
        .await;

        Ok(member)
    }

    pub async fn change_tier(
        &self,
        member_id: impl Into<String>,
        tier_id: impl Into<String>,
        metadata: &Metadata,
    ) -> Result<MemberAccount> {
        let member_id = member_id.into();
        let tier_id = tier_id.into();

        let (before, after) = self
            .transaction(move |conn| {
                let member_id = member_id.clone();
                let tier_id = tier_id.clone();
                Box::pin(async move {
                    let Some(mut member) = repository::find_member(&mut *conn, &member_id).await?
                    else {
                        not_found!("member {}", member_id);
                    };

                    match repository::find_tier(&mut *conn, &tier_id).await? {
                        Some(tier) if tier.is_active => {}
                        _ => not_found!("tier {}", tier_id),
                    }

                    let before = member.primary_tier_id.to_owned();
                    let now = OffsetDateTime::now_utc().unix_timestamp();
                    repository::update_member_tier(&mut *conn, &member_id, &tier_id, now).await?;
                    member.primary_tier_id = tier_id;

                    Ok((before, member))
                })
            })
            .await?;

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::MemberTierUpdate, &after.id, &after.id).changes(
                Changes::new(
                    serde_json::json!({ "tierId": before }),
                    serde_json::json!({ "tierId": after.primary_tier_id }),
                ),
            ),
        )
        .await;

        Ok(after)
    }

    pub async fn find_member(&self, member_id: &str) -> Result<Option<MemberAccount>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::find_member(&mut conn, member_id).await
        })
        .await
    }

    /// Tier currently applied to the member.
    pub async fn member_tier(&self, member_id: &str) -> Result<MembershipTier> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            let Some(member) = repository::find_member(&mut conn, member_id).await? else {
                not_found!("member {}", member_id);
            };

            resolve_tier(&mut conn, &member).await
        })
        .await
    }
}
