use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Error, Metadata, Result, invalid, not_found};
use serde::Serialize;
use sqlx::SqliteConnection;
use time::OffsetDateTime;

use crate::{
    EntrySource, EntryType, LedgerEntry, MemberAccount,
    ledger::{NewEntry, apply_entry},
    member::resolve_tier,
    repository,
    rule::{EarnDecision, evaluate, load_activity},
    window::add_months,
};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnOutcome {
    pub decision: EarnDecision,
    pub entry: Option<LedgerEntry>,
    pub audit_logged: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralOutcome {
    pub referrer_id: String,
    #[serde(flatten)]
    pub earn: EarnOutcome,
}

#[derive(Clone, Debug)]
struct EarnRequest {
    member_id: String,
    rule_id: String,
    occurred_at: OffsetDateTime,
    expiry_months: u32,
    created_by: String,
}

/// Evaluates the rule and, when granted, writes the earn entry. Runs inside
/// the caller's transaction so the limits seen are the limits enforced.
async fn earn_in_transaction(
    conn: &mut SqliteConnection,
    request: EarnRequest,
) -> Result<(EarnDecision, Option<LedgerEntry>)> {
    let Some(member) = repository::find_member(&mut *conn, &request.member_id).await? else {
        not_found!("member {}", request.member_id);
    };

    let Some(rule) = repository::find_rule(&mut *conn, &request.rule_id).await? else {
        return Err(Error::RuleNotFound(request.rule_id));
    };

    let tier = resolve_tier(&mut *conn, &member).await?;
    let activity = load_activity(&mut *conn, &member, &rule.id, request.occurred_at).await?;
    let occurred_at = request.occurred_at.unix_timestamp();
    let decision = evaluate(&rule, &tier, &activity, occurred_at)?;

    if !decision.granted {
        return Ok((decision, None));
    }

    let expires_at = match request.expiry_months {
        0 => None,
        months => Some(add_months(request.occurred_at, months)?.unix_timestamp()),
    };

    let entry = apply_entry(
        conn,
        NewEntry {
            member_id: member.id,
            entry_type: EntryType::Earn,
            amount: decision.amount,
            source: EntrySource::Rule(rule.id),
            expires_at,
            created_at: occurred_at,
            created_by: request.created_by,
        },
    )
    .await?;

    Ok((decision, Some(entry)))
}

impl super::Command {
    /// Read-only preview of what an earn attempt would produce right now.
    pub async fn evaluate_earn(
        &self,
        member_id: &str,
        rule_id: &str,
        occurred_at: OffsetDateTime,
    ) -> Result<EarnDecision> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            let Some(member) = repository::find_member(&mut conn, member_id).await? else {
                not_found!("member {}", member_id);
            };

            let Some(rule) = repository::find_rule(&mut conn, rule_id).await? else {
                return Err(Error::RuleNotFound(rule_id.to_owned()));
            };

            let tier = resolve_tier(&mut conn, &member).await?;
            let activity = load_activity(&mut conn, &member, rule_id, occurred_at).await?;

            evaluate(&rule, &tier, &activity, occurred_at.unix_timestamp())
        })
        .await
    }

    /// Awards points for `rule_id` if the rule's limits allow it.
    pub async fn earn(
        &self,
        member_id: impl Into<String>,
        rule_id: impl Into<String>,
        occurred_at: OffsetDateTime,
        metadata: &Metadata,
    ) -> Result<EarnOutcome> {
        self.earn_with_note(member_id.into(), rule_id.into(), occurred_at, metadata, None)
            .await
    }

    async fn earn_with_note(
        &self,
        member_id: String,
        rule_id: String,
        occurred_at: OffsetDateTime,
        metadata: &Metadata,
        note: Option<String>,
    ) -> Result<EarnOutcome> {
        let request = EarnRequest {
            member_id,
            rule_id,
            occurred_at,
            expiry_months: self.config.earn_expiry_months,
            created_by: metadata.trigger_by()?,
        };

        let (decision, entry) = self
            .transaction(move |conn| {
                let request = request.clone();
                Box::pin(async move { earn_in_transaction(conn, request).await })
            })
            .await?;

        let Some(entry) = entry else {
            tracing::debug!(reason = ?decision.reason, "earn denied");
            return Ok(EarnOutcome {
                decision,
                entry: None,
                audit_logged: false,
            });
        };

        let description = match note {
            Some(note) => format!("rule {}: {note}", entry.rule_id.as_deref().unwrap_or_default()),
            None => format!("rule {}", entry.rule_id.as_deref().unwrap_or_default()),
        };

        let audit_logged = append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::PointsEarn, &entry.member_id, &entry.member_id)
                .changes(Changes::points(entry.balance_before, entry.balance_after))
                .description(description),
        )
        .await;

        Ok(EarnOutcome {
            decision,
            entry: Some(entry),
            audit_logged,
        })
    }

    pub async fn on_daily_login(&self, member_id: impl Into<String>, metadata: &Metadata) -> Result<EarnOutcome> {
        let rule_id = self.config.rules.daily_login.to_owned();
        self.earn(member_id, rule_id, OffsetDateTime::now_utc(), metadata)
            .await
    }

    /// Requires a tier that allows tool use.
    pub async fn on_tool_use(
        &self,
        member_id: impl Into<String>,
        tool_name: &str,
        metadata: &Metadata,
    ) -> Result<EarnOutcome> {
        let member_id = member_id.into();
        let tool_name = tool_name.trim();

        if tool_name.is_empty() {
            invalid!("tool name is required");
        }

        if !self.member_tier(&member_id).await?.permissions.can_use_tools {
            return Err(Error::Forbidden);
        }

        self.earn_with_note(
            member_id,
            self.config.rules.tool_use.to_owned(),
            OffsetDateTime::now_utc(),
            metadata,
            Some(format!("tool {tool_name}")),
        )
        .await
    }

    pub async fn on_first_client(&self, member_id: impl Into<String>, metadata: &Metadata) -> Result<EarnOutcome> {
        let rule_id = self.config.rules.first_client.to_owned();
        self.earn(member_id, rule_id, OffsetDateTime::now_utc(), metadata)
            .await
    }

    /// Links `member_id` to the owner of `referral_code` and credits the
    /// owner under the referral rule. A member can be referred only once.
    #[tracing::instrument(skip_all)]
    pub async fn process_referral(
        &self,
        member_id: impl Into<String>,
        referral_code: impl Into<String>,
        metadata: &Metadata,
    ) -> Result<ReferralOutcome> {
        let member_id = member_id.into();
        let referral_code = referral_code.into();
        let rule_id = self.config.rules.referral.to_owned();
        let expiry_months = self.config.earn_expiry_months;
        let created_by = metadata.trigger_by()?;

        if referral_code.trim().is_empty() {
            invalid!("referral code is required");
        }

        let (referrer, decision, entry) = self
            .transaction(move |conn| {
                let member_id = member_id.clone();
                let referral_code = referral_code.clone();
                let rule_id = rule_id.clone();
                let created_by = created_by.clone();
                Box::pin(async move {
                    let referrer = link_referral(&mut *conn, &member_id, &referral_code).await?;
                    let (decision, entry) = earn_in_transaction(
                        conn,
                        EarnRequest {
                            member_id: referrer.id.to_owned(),
                            rule_id,
                            occurred_at: OffsetDateTime::now_utc(),
                            expiry_months,
                            created_by,
                        },
                    )
                    .await?;

                    Ok((referrer, decision, entry))
                })
            })
            .await?;

        tracing::info!(referrer_id = %referrer.id, granted = decision.granted, "referral processed");

        let audit_logged = match &entry {
            Some(entry) => {
                append_after_commit(
                    &self.write_db,
                    NewRecord::new(metadata, AuditAction::PointsEarn, &referrer.id, &referrer.id)
                        .changes(Changes::points(entry.balance_before, entry.balance_after))
                        .description("referral reward"),
                )
                .await
            }
            None => false,
        };

        Ok(ReferralOutcome {
            referrer_id: referrer.id,
            earn: EarnOutcome {
                decision,
                entry,
                audit_logged,
            },
        })
    }
}

async fn link_referral(
    conn: &mut SqliteConnection,
    member_id: &str,
    referral_code: &str,
) -> Result<MemberAccount> {
    let Some(member) = repository::find_member(&mut *conn, member_id).await? else {
        not_found!("member {}", member_id);
    };

    let Some(referrer) = repository::find_member_by_referral_code(&mut *conn, referral_code).await?
    else {
        not_found!("referral code {}", referral_code);
    };

    if referrer.id == member.id {
        invalid!("members cannot refer themselves");
    }

    if member.referred_by.is_some() {
        invalid!("member {} was already referred", member.id);
    }

    let now = OffsetDateTime::now_utc().unix_timestamp();
    if !repository::set_referred_by(&mut *conn, &member.id, &referrer.id, now).await? {
        return Err(Error::Conflict);
    }

    Ok(referrer)
}
