use serde::{Deserialize, Serialize};
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
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TierCreate,
    TierUpdate,
    RuleCreate,
    RuleUpdate,
    RuleDelete,
    ItemCreate,
    ItemUpdate,
    MemberEnroll,
    MemberTierUpdate,
    PointsEarn,
    PointsRedeem,
    PointsManualAdjust,
    PointsExpire,
}

impl AuditAction {
    pub fn module(&self) -> AuditModule {
        match self {
            AuditAction::TierCreate | AuditAction::TierUpdate => AuditModule::Tier,
            AuditAction::RuleCreate | AuditAction::RuleUpdate | AuditAction::RuleDelete => {
                AuditModule::Rule
            }
            AuditAction::ItemCreate | AuditAction::ItemUpdate => AuditModule::Item,
            AuditAction::MemberEnroll | AuditAction::MemberTierUpdate => AuditModule::Member,
            AuditAction::PointsEarn
            | AuditAction::PointsRedeem
            | AuditAction::PointsManualAdjust
            | AuditAction::PointsExpire => AuditModule::Points,
        }
    }
}

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
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditModule {
    Tier,
    Rule,
    Item,
    Member,
    Points,
}

/// Opaque before/after snapshots of the mutated entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Changes {
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

impl Changes {
    pub fn new(before: impl Serialize, after: impl Serialize) -> Self {
        Self {
            before: serde_json::to_value(before).unwrap_or_default(),
            after: serde_json::to_value(after).unwrap_or_default(),
        }
    }

    pub fn points(before: i64, after: i64) -> Self {
        Self {
            before: serde_json::json!({ "points": before }),
            after: serde_json::json!({ "points": after }),
        }
    }
}
