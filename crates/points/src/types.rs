use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use strum::{AsRefStr, Display, EnumString, VariantArray};

#[derive(
    EnumString,
    Display,
    VariantArray,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum EntryType {
    Earn,
    Spend,
    Adjust,
    Expire,
}

#[derive(
    EnumString, Display, AsRefStr, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            Direction::Credit => amount,
            Direction::Debit => -amount,
        }
    }
}

/// What a ledger entry was written for. Exactly one source per entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySource {
    Rule(String),
    Item(String),
    Manual { reason: String },
    Expiry { source_entry_id: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_earn_points: bool,
    pub can_redeem_points: bool,
    pub can_use_tools: bool,
    pub can_export: bool,
    pub can_access_ai: bool,
    pub max_clients: Option<i64>,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_earn_points: true,
            can_redeem_points: true,
            can_use_tools: true,
            can_export: false,
            can_access_ai: false,
            max_clients: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTier {
    pub id: String,
    pub name: String,
    /// Lower wins when a member qualifies for several tiers.
    pub priority: i64,
    pub points_multiplier: f64,
    #[sqlx(flatten)]
    pub permissions: Permissions,
    pub is_active: bool,
    pub is_default: bool,
    pub is_permanent: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RuleLimits {
    pub daily_max: Option<i64>,
    pub weekly_max: Option<i64>,
    pub monthly_max: Option<i64>,
    pub total_max: Option<i64>,
    pub cooldown_minutes: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointsRule {
    pub id: String,
    pub name: String,
    pub category: String,
    pub points: i64,
    #[sqlx(flatten)]
    pub limits: RuleLimits,
    pub is_active: bool,
    pub is_system_rule: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemLimits {
    pub per_user_max: Option<i64>,
    /// Tier ids allowed to redeem; empty means everyone.
    #[sqlx(json)]
    pub membership_required: Vec<String>,
}

pub const UNLIMITED_STOCK: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedeemableItem {
    pub id: String,
    pub name: String,
    pub points_cost: i64,
    pub stock: i64,
    pub stock_used: i64,
    #[sqlx(flatten)]
    pub limits: ItemLimits,
    pub is_active: bool,
}

impl RedeemableItem {
    pub fn in_stock(&self) -> bool {
        self.stock == UNLIMITED_STOCK || self.stock_used < self.stock
    }

    pub fn allows_tier(&self, tier_id: &str) -> bool {
        self.limits.membership_required.is_empty()
            || self.limits.membership_required.iter().any(|t| t == tier_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberAccount {
    pub id: String,
    pub primary_tier_id: String,
    pub current_balance: i64,
    pub lifetime_earned: i64,
    pub lifetime_spent: i64,
    pub lifetime_expired: i64,
    pub timezone: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub version: i64,
    pub created_at: i64,
}

impl MemberAccount {
    pub fn totals(&self) -> BalanceTotals {
        BalanceTotals {
            current_balance: self.current_balance,
            lifetime_earned: self.lifetime_earned,
            lifetime_spent: self.lifetime_spent,
            lifetime_expired: self.lifetime_expired,
        }
    }
}

/// Running totals kept consistent with the ledger:
/// `current_balance == lifetime_earned - lifetime_spent - lifetime_expired`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTotals {
    pub current_balance: i64,
    pub lifetime_earned: i64,
    pub lifetime_spent: i64,
    pub lifetime_expired: i64,
}

impl BalanceTotals {
    /// Totals after one entry, or `None` if any counter would overflow.
    pub fn apply(self, entry_type: EntryType, amount: i64) -> Option<Self> {
        let mut next = self;
        next.current_balance = next.current_balance.checked_add(amount)?;

        match entry_type {
            EntryType::Expire => {
                next.lifetime_expired = next.lifetime_expired.checked_sub(amount)?;
            }
            _ if amount >= 0 => next.lifetime_earned = next.lifetime_earned.checked_add(amount)?,
            _ => next.lifetime_spent = next.lifetime_spent.checked_sub(amount)?,
        }

        Some(next)
    }

    pub fn is_consistent(&self) -> bool {
        self.lifetime_earned
            .checked_sub(self.lifetime_spent)
            .and_then(|net| net.checked_sub(self.lifetime_expired))
            == Some(self.current_balance)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub member_id: String,
    /// Position in the member's ledger, starting at 1.
    pub seq: i64,
    pub entry_type: EntryType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub rule_id: Option<String>,
    pub item_id: Option<String>,
    pub reason: Option<String>,
    pub source_entry_id: Option<String>,
    pub expires_at: Option<i64>,
    pub is_expired: bool,
    pub created_at: i64,
    pub created_by: String,
}

impl LedgerEntry {
    pub fn source(&self) -> Option<EntrySource> {
        if let Some(rule_id) = &self.rule_id {
            return Some(EntrySource::Rule(rule_id.to_owned()));
        }

        if let Some(item_id) = &self.item_id {
            return Some(EntrySource::Item(item_id.to_owned()));
        }

        if let Some(reason) = &self.reason {
            return Some(EntrySource::Manual {
                reason: reason.to_owned(),
            });
        }

        self.source_entry_id
            .as_ref()
            .map(|id| EntrySource::Expiry {
                source_entry_id: id.to_owned(),
            })
    }
}
