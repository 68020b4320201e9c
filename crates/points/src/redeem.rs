use advisorhub_audit::{AuditAction, Changes, NewRecord, append_after_commit};
use advisorhub_shared::{Error, ErrorKind, Metadata, Result, not_found};
use serde::Serialize;
use sqlx::SqliteConnection;
use strum::{AsRefStr, Display};
use time::OffsetDateTime;
use ulid::Ulid;

use crate::{
    EntrySource, EntryType, LedgerEntry, MemberAccount, RedeemableItem,
    ledger::{NewEntry, apply_entry_to},
    member::resolve_tier,
    repository::{self, NewOrder},
};

/// Expected ways a redemption is turned down. Checked in declaration order;
/// the first failing check is reported.
#[derive(Display, AsRefStr, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RedemptionError {
    ItemUnavailable,
    TierIneligible,
    OutOfStock,
    PerUserLimitReached,
    InsufficientPoints,
}

impl RedemptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedemptionError::ItemUnavailable => ErrorKind::NotFound,
            RedemptionError::TierIneligible => ErrorKind::Forbidden,
            RedemptionError::OutOfStock => ErrorKind::OutOfStock,
            RedemptionError::PerUserLimitReached => ErrorKind::RuleViolation,
            RedemptionError::InsufficientPoints => ErrorKind::InsufficientPoints,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemOutcome {
    pub success: bool,
    pub order_id: Option<String>,
    pub entry: Option<LedgerEntry>,
    pub error: Option<RedemptionError>,
    pub audit_logged: bool,
}

impl RedeemOutcome {
    fn rejected(error: RedemptionError) -> Self {
        Self {
            success: false,
            order_id: None,
            entry: None,
            error: Some(error),
            audit_logged: false,
        }
    }
}

enum Redemption {
    Committed {
        order_id: String,
        item: RedeemableItem,
        entry: LedgerEntry,
    },
    Rejected(RedemptionError),
}

async fn validate(
    conn: &mut SqliteConnection,
    member: &MemberAccount,
    item: Option<RedeemableItem>,
) -> Result<std::result::Result<RedeemableItem, RedemptionError>> {
    let item = match item {
        Some(item) if item.is_active => item,
        _ => return Ok(Err(RedemptionError::ItemUnavailable)),
    };

    let tier = resolve_tier(&mut *conn, member).await?;
    if !tier.permissions.can_redeem_points || !item.allows_tier(&tier.id) {
        return Ok(Err(RedemptionError::TierIneligible));
    }

    if !item.in_stock() {
        return Ok(Err(RedemptionError::OutOfStock));
    }

    if let Some(max) = item.limits.per_user_max {
        let count = repository::count_redemptions(&mut *conn, &member.id, &item.id).await?;
        if count >= max {
            return Ok(Err(RedemptionError::PerUserLimitReached));
        }
    }

    if member.current_balance < item.points_cost {
        return Ok(Err(RedemptionError::InsufficientPoints));
    }

    Ok(Ok(item))
}

async fn redeem_in_transaction(
    conn: &mut SqliteConnection,
    member_id: String,
    item_id: String,
    created_by: String,
) -> Result<Redemption> {
    let Some(member) = repository::find_member(&mut *conn, &member_id).await? else {
        not_found!("member {}", member_id);
    };

    let item = repository::find_item(&mut *conn, &item_id).await?;
    let item = match validate(&mut *conn, &member, item).await? {
        Ok(item) => item,
        Err(reason) => return Ok(Redemption::Rejected(reason)),
    };

    tracing::debug!(member_id = %member.id, item_id = %item.id, "redemption validated");

    let now = OffsetDateTime::now_utc().unix_timestamp();

    // Lost the last unit to a concurrent redemption; the retry re-validates.
    if !repository::take_stock(&mut *conn, &item.id, now).await? {
        return Err(Error::Conflict);
    }

    let entry = apply_entry_to(
        &mut *conn,
        member,
        NewEntry {
            member_id: member_id.to_owned(),
            entry_type: EntryType::Spend,
            amount: -item.points_cost,
            source: EntrySource::Item(item.id.to_owned()),
            expires_at: None,
            created_at: now,
            created_by,
        },
    )
    .await?;

    let order_id = Ulid::new().to_string();
    repository::insert_order(
        conn,
        NewOrder {
            id: &order_id,
            member_id: &member_id,
            item_id: &item.id,
            entry_id: &entry.id,
            points_cost: item.points_cost,
            created_at: now,
        },
    )
    .await?;

    Ok(Redemption::Committed {
        order_id,
        item,
        entry,
    })
}

impl super::Command {
    /// Spends points on a catalog item. Stock, balance and the order are
    /// committed together or not at all.
    #[tracing::instrument(skip_all)]
    pub async fn redeem(
        &self,
        member_id: impl Into<String>,
        item_id: impl Into<String>,
        metadata: &Metadata,
    ) -> Result<RedeemOutcome> {
        let member_id = member_id.into();
        let item_id = item_id.into();
        let created_by = metadata.trigger_by()?;

        tracing::debug!(member_id = %member_id, item_id = %item_id, "redemption requested");

        let redemption = self
            .transaction(move |conn| {
                let member_id = member_id.clone();
                let item_id = item_id.clone();
                let created_by = created_by.clone();
                Box::pin(async move {
                    redeem_in_transaction(conn, member_id, item_id, created_by).await
                })
            })
            .await?;

        let (order_id, item, entry) = match redemption {
            Redemption::Committed {
                order_id,
                item,
                entry,
            } => (order_id, item, entry),
            Redemption::Rejected(reason) => {
                tracing::info!(reason = %reason, "redemption rejected");
                return Ok(RedeemOutcome::rejected(reason));
            }
        };

        tracing::info!(
            member_id = %entry.member_id,
            item_id = %item.id,
            order_id = %order_id,
            "redemption committed"
        );

        let audit_logged = append_after_commit(
            &self.write_db,
            NewRecord::new(metadata, AuditAction::PointsRedeem, &entry.member_id, &entry.member_id)
                .changes(Changes::points(entry.balance_before, entry.balance_after))
                .description(format!("{} ({}), order {order_id}", item.name, item.id)),
        )
        .await;

        Ok(RedeemOutcome {
            success: true,
            order_id: Some(order_id),
            entry: Some(entry),
            error: None,
            audit_logged,
        })
    }
}
