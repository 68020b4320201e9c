use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Error, Metadata, Result, invalid, not_found};
use serde::Deserialize;
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    ItemLimits, MembershipTier, Permissions, PointsRule, RedeemableItem, RuleLimits,
    UNLIMITED_STOCK, ledger::MAX_ENTRY_AMOUNT, repository,
};

#[derive(Validate, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SaveTierInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub points_multiplier: f64,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_permanent: bool,
}

#[derive(Validate, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SaveRuleInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 1, max = MAX_ENTRY_AMOUNT))]
    pub points: i64,
    #[serde(default)]
    pub limits: RuleLimits,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub is_system_rule: bool,
}

#[derive(Validate, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SaveItemInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1, max = MAX_ENTRY_AMOUNT))]
    pub points_cost: i64,
    /// `-1` for unlimited.
    #[validate(range(min = -1))]
    pub stock: i64,
    #[serde(default)]
    pub limits: ItemLimits,
    #[serde(default = "yes")]
    pub is_active: bool,
}

fn yes() -> bool {
    true
}

fn check_limits(limits: &RuleLimits) -> Result<()> {
    let values = [
        limits.daily_max,
        limits.weekly_max,
        limits.monthly_max,
        limits.total_max,
        limits.cooldown_minutes,
    ];

    if values.iter().flatten().any(|value| *value < 0) {
        invalid!("rule limits cannot be negative");
    }

    Ok(())
}

impl super::Command {
    /// Creates or replaces a tier. Marking it default clears the flag on every
    /// other tier in the same transaction.
    pub async fn save_tier(&self, input: SaveTierInput, metadata: &Metadata) -> Result<MembershipTier> {
        input.validate()?;

        if input.is_default && !input.is_active {
            invalid!("the default tier must be active");
        }

        let tier = MembershipTier {
            id: input.id,
            name: input.name,
            priority: input.priority,
            points_multiplier: input.points_multiplier,
            permissions: input.permissions,
            is_active: input.is_active,
            is_default: input.is_default,
            is_permanent: input.is_permanent,
        };

        let next = tier.clone();
        let before = self
            .transaction(move |conn| {
                let tier = next.clone();
                Box::pin(async move {
                    let before = repository::find_tier(&mut *conn, &tier.id).await?;
                    let now = OffsetDateTime::now_utc().unix_timestamp();

                    if tier.is_default {
                        repository::clear_default_tier(&mut *conn, &tier.id).await?;
                    }

                    repository::upsert_tier(&mut *conn, &tier, now).await?;

                    Ok(before)
                })
            })
            .await?;

        let action = match before {
            Some(_) => AuditAction::TierUpdate,
            None => AuditAction::TierCreate,
        };

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, action, &tier.id, &tier.name)
                .changes(Changes::new(&before, &tier)),
        )
        .await;

        Ok(tier)
    }

    pub async fn save_rule(&self, input: SaveRuleInput, metadata: &Metadata) -> Result<PointsRule> {
        input.validate()?;
        check_limits(&input.limits)?;

        let rule = PointsRule {
            id: input.id,
            name: input.name,
            category: input.category,
            points: input.points,
            limits: input.limits,
            is_active: input.is_active,
            is_system_rule: input.is_system_rule,
        };

        let next = rule.clone();
        let before = self
            .transaction(move |conn| {
                let rule = next.clone();
                Box::pin(async move {
                    let before = repository::find_rule(&mut *conn, &rule.id).await?;
                    let now = OffsetDateTime::now_utc().unix_timestamp();
                    repository::upsert_rule(&mut *conn, &rule, now).await?;

                    Ok(before)
                })
            })
            .await?;

        let action = match before {
            Some(_) => AuditAction::RuleUpdate,
            None => AuditAction::RuleCreate,
        };

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, action, &rule.id, &rule.name)
                .changes(Changes::new(&before, &rule)),
        )
        .await;

        Ok(rule)
    }

    /// System rules back the built-in triggers and cannot be deleted.
    /// Ledger entries keep their rule id after the rule is gone.
    pub async fn delete_rule(&self, rule_id: impl Into<String>, metadata: &Metadata) -> Result<()> {
        let rule_id = rule_id.into();

        let rule = self
            .transaction(move |conn| {
                let rule_id = rule_id.clone();
                Box::pin(async move {
                    let Some(rule) = repository::find_rule(&mut *conn, &rule_id).await? else {
                        not_found!("rule {}", rule_id);
                    };

                    if rule.is_system_rule {
                        return Err(Error::Forbidden);
                    }

                    repository::delete_rule(&mut *conn, &rule_id).await?;

                    Ok(rule)
                })
            })
            .await?;

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::RuleDelete, &rule.id, &rule.name)
                .changes(Changes::new(&rule, serde_json::Value::Null)),
        )
        .await;

        Ok(())
    }

    pub async fn save_item(&self, input: SaveItemInput, metadata: &Metadata) -> Result<RedeemableItem> {
        input.validate()?;

        let next = input.clone();
        let (before, item) = self
            .transaction(move |conn| {
                let input = next.clone();
                Box::pin(async move {
                    let before = repository::find_item(&mut *conn, &input.id).await?;
                    let stock_used = before.as_ref().map(|item| item.stock_used).unwrap_or(0);

                    if input.stock != UNLIMITED_STOCK && input.stock < stock_used {
                        invalid!(
                            "stock {} is below the {} units already redeemed",
                            input.stock,
                            stock_used
                        );
                    }

                    let item = RedeemableItem {
                        id: input.id,
                        name: input.name,
                        points_cost: input.points_cost,
                        stock: input.stock,
                        stock_used,
                        limits: input.limits,
                        is_active: input.is_active,
                    };

                    let now = OffsetDateTime::now_utc().unix_timestamp();
                    repository::upsert_item(&mut *conn, &item, now).await?;

                    Ok((before, item))
                })
            })
            .await?;

        let action = match before {
            Some(_) => AuditAction::ItemUpdate,
            None => AuditAction::ItemCreate,
        };

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, action, &item.id, &item.name)
                .changes(Changes::new(&before, &item)),
        )
        .await;

        Ok(item)
    }

    pub async fn set_item_active(
        &self,
        item_id: impl Into<String>,
        is_active: bool,
        metadata: &Metadata,
    ) -> Result<()> {
        let item_id = item_id.into();

        let id = item_id.clone();
        self.transaction(move |conn| {
            let item_id = id.clone();
            Box::pin(async move {
                let now = OffsetDateTime::now_utc().unix_timestamp();
                if !repository::set_item_active(&mut *conn, &item_id, is_active, now).await? {
                    not_found!("item {}", item_id);
                }

                Ok(())
            })
        })
        .await?;

        append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::ItemUpdate, &item_id, &item_id).changes(
                Changes::new(
                    serde_json::json!({ "isActive": !is_active }),
                    serde_json::json!({ "isActive": is_active }),
                ),
            ),
        )
        .await;

        Ok(())
    }

    pub async fn list_tiers(&self) -> Result<Vec<MembershipTier>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::list_tiers(&mut conn).await
        })
        .await
    }

    pub async fn list_rules(&self) -> Result<Vec<PointsRule>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::list_rules(&mut conn).await
        })
        .await
    }

    pub async fn find_rule(&self, rule_id: &str) -> Result<Option<PointsRule>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::find_rule(&mut conn, rule_id).await
        })
        .await
    }

    pub async fn list_items(&self, active_only: bool) -> Result<Vec<RedeemableItem>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::list_items(&mut conn, active_only).await
        })
        .await
    }

    pub async fn find_item(&self, item_id: &str) -> Result<Option<RedeemableItem>> {
        self.read(move || async move {
            let mut conn = self.read_db.acquire().await?;
            repository::find_item(&mut conn, item_id).await
        })
        .await
    }
}
