use advisorhub_db::table;
use advisorhub_shared::Result;
use sea_query::{Expr, ExprTrait, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use sqlx::SqliteConnection;

use crate::{
    BalanceTotals, EntryType, LedgerEntry, MemberAccount, MembershipTier, PointsRule,
    RedeemableItem, window::Window,
};

fn member_select() -> SelectStatement {
    Query::select()
        .columns([
            table::MemberAccount::Id,
            table::MemberAccount::PrimaryTierId,
            table::MemberAccount::CurrentBalance,
            table::MemberAccount::LifetimeEarned,
            table::MemberAccount::LifetimeSpent,
            table::MemberAccount::LifetimeExpired,
            table::MemberAccount::Timezone,
            table::MemberAccount::ReferralCode,
            table::MemberAccount::ReferredBy,
            table::MemberAccount::Version,
            table::MemberAccount::CreatedAt,
        ])
        .from(table::MemberAccount::Table)
        .to_owned()
}

pub async fn find_member(conn: &mut SqliteConnection, id: &str) -> Result<Option<MemberAccount>> {
    let statement = member_select()
        .and_where(Expr::col(table::MemberAccount::Id).eq(id))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, MemberAccount, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn find_member_by_referral_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> Result<Option<MemberAccount>> {
    let statement = member_select()
        .and_where(Expr::col(table::MemberAccount::ReferralCode).eq(code))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, MemberAccount, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn insert_member(conn: &mut SqliteConnection, member: &MemberAccount) -> Result<()> {
    let statement = Query::insert()
        .into_table(table::MemberAccount::Table)
        .columns([
            table::MemberAccount::Id,
            table::MemberAccount::PrimaryTierId,
            table::MemberAccount::CurrentBalance,
            table::MemberAccount::LifetimeEarned,
            table::MemberAccount::LifetimeSpent,
            table::MemberAccount::LifetimeExpired,
            table::MemberAccount::Timezone,
            table::MemberAccount::ReferralCode,
            table::MemberAccount::Version,
            table::MemberAccount::CreatedAt,
            table::MemberAccount::UpdatedAt,
        ])
        .values_panic([
            member.id.to_owned().into(),
            member.primary_tier_id.to_owned().into(),
            member.current_balance.into(),
            member.lifetime_earned.into(),
            member.lifetime_spent.into(),
            member.lifetime_expired.into(),
            member.timezone.to_owned().into(),
            member.referral_code.to_owned().into(),
            member.version.into(),
            member.created_at.into(),
            member.created_at.into(),
        ])
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

/// Writes new totals only if nobody bumped the member version since it was read.
pub async fn update_member_totals(
    conn: &mut SqliteConnection,
    member_id: &str,
    expected_version: i64,
    totals: &BalanceTotals,
    updated_at: i64,
) -> Result<bool> {
    let statement = Query::update()
        .table(table::MemberAccount::Table)
        .value(table::MemberAccount::CurrentBalance, totals.current_balance)
        .value(table::MemberAccount::LifetimeEarned, totals.lifetime_earned)
        .value(table::MemberAccount::LifetimeSpent, totals.lifetime_spent)
        .value(table::MemberAccount::LifetimeExpired, totals.lifetime_expired)
        .value(table::MemberAccount::Version, expected_version + 1)
        .value(table::MemberAccount::UpdatedAt, updated_at)
        .and_where(Expr::col(table::MemberAccount::Id).eq(member_id))
        .and_where(Expr::col(table::MemberAccount::Version).eq(expected_version))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let result = sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(result.rows_affected() == 1)
}

pub async fn update_member_tier(
    conn: &mut SqliteConnection,
    member_id: &str,
    tier_id: &str,
    updated_at: i64,
) -> Result<()> {
    let statement = Query::update()
        .table(table::MemberAccount::Table)
        .value(table::MemberAccount::PrimaryTierId, tier_id)
        .value(table::MemberAccount::UpdatedAt, updated_at)
        .and_where(Expr::col(table::MemberAccount::Id).eq(member_id))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

/// Records the referrer once. Returns false when the member already has one.
pub async fn set_referred_by(
    conn: &mut SqliteConnection,
    member_id: &str,
    referrer_id: &str,
    updated_at: i64,
) -> Result<bool> {
    let statement = Query::update()
        .table(table::MemberAccount::Table)
        .value(table::MemberAccount::ReferredBy, referrer_id)
        .value(table::MemberAccount::UpdatedAt, updated_at)
        .and_where(Expr::col(table::MemberAccount::Id).eq(member_id))
        .and_where(Expr::col(table::MemberAccount::ReferredBy).is_null())
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let result = sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(result.rows_affected() == 1)
}

fn tier_select() -> SelectStatement {
    Query::select()
        .columns([
            table::MembershipTier::Id,
            table::MembershipTier::Name,
            table::MembershipTier::Priority,
            table::MembershipTier::PointsMultiplier,
            table::MembershipTier::CanEarnPoints,
            table::MembershipTier::CanRedeemPoints,
            table::MembershipTier::CanUseTools,
            table::MembershipTier::CanExport,
            table::MembershipTier::CanAccessAi,
            table::MembershipTier::MaxClients,
            table::MembershipTier::IsActive,
            table::MembershipTier::IsDefault,
            table::MembershipTier::IsPermanent,
        ])
        .from(table::MembershipTier::Table)
        .to_owned()
}

pub async fn find_tier(conn: &mut SqliteConnection, id: &str) -> Result<Option<MembershipTier>> {
    let statement = tier_select()
        .and_where(Expr::col(table::MembershipTier::Id).eq(id))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, MembershipTier, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn find_default_tier(conn: &mut SqliteConnection) -> Result<Option<MembershipTier>> {
    let statement = tier_select()
        .and_where(Expr::col(table::MembershipTier::IsDefault).eq(true))
        .and_where(Expr::col(table::MembershipTier::IsActive).eq(true))
        .order_by(table::MembershipTier::Priority, Order::Asc)
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, MembershipTier, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn list_tiers(conn: &mut SqliteConnection) -> Result<Vec<MembershipTier>> {
    let statement = tier_select()
        .order_by(table::MembershipTier::Priority, Order::Asc)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, MembershipTier, _>(&sql, values)
        .fetch_all(conn)
        .await?)
}

pub async fn upsert_tier(conn: &mut SqliteConnection, tier: &MembershipTier, now: i64) -> Result<()> {
    let permissions = &tier.permissions;
    let statement = Query::insert()
        .into_table(table::MembershipTier::Table)
        .columns([
            table::MembershipTier::Id,
            table::MembershipTier::Name,
            table::MembershipTier::Priority,
            table::MembershipTier::PointsMultiplier,
            table::MembershipTier::CanEarnPoints,
            table::MembershipTier::CanRedeemPoints,
            table::MembershipTier::CanUseTools,
            table::MembershipTier::CanExport,
            table::MembershipTier::CanAccessAi,
            table::MembershipTier::MaxClients,
            table::MembershipTier::IsActive,
            table::MembershipTier::IsDefault,
            table::MembershipTier::IsPermanent,
            table::MembershipTier::CreatedAt,
            table::MembershipTier::UpdatedAt,
        ])
        .values_panic([
            tier.id.to_owned().into(),
            tier.name.to_owned().into(),
            tier.priority.into(),
            tier.points_multiplier.into(),
            permissions.can_earn_points.into(),
            permissions.can_redeem_points.into(),
            permissions.can_use_tools.into(),
            permissions.can_export.into(),
            permissions.can_access_ai.into(),
            permissions.max_clients.into(),
            tier.is_active.into(),
            tier.is_default.into(),
            tier.is_permanent.into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::column(table::MembershipTier::Id)
                .update_columns([
                    table::MembershipTier::Name,
                    table::MembershipTier::Priority,
                    table::MembershipTier::PointsMultiplier,
                    table::MembershipTier::CanEarnPoints,
                    table::MembershipTier::CanRedeemPoints,
                    table::MembershipTier::CanUseTools,
                    table::MembershipTier::CanExport,
                    table::MembershipTier::CanAccessAi,
                    table::MembershipTier::MaxClients,
                    table::MembershipTier::IsActive,
                    table::MembershipTier::IsDefault,
                    table::MembershipTier::IsPermanent,
                    table::MembershipTier::UpdatedAt,
                ])
                .to_owned(),
        )
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

pub async fn clear_default_tier(conn: &mut SqliteConnection, except_id: &str) -> Result<()> {
    let statement = Query::update()
        .table(table::MembershipTier::Table)
        .value(table::MembershipTier::IsDefault, false)
        .and_where(Expr::col(table::MembershipTier::IsDefault).eq(true))
        .and_where(Expr::col(table::MembershipTier::Id).ne(except_id))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

fn rule_select() -> SelectStatement {
    Query::select()
        .columns([
            table::PointsRule::Id,
            table::PointsRule::Name,
            table::PointsRule::Category,
            table::PointsRule::Points,
            table::PointsRule::DailyMax,
            table::PointsRule::WeeklyMax,
            table::PointsRule::MonthlyMax,
            table::PointsRule::TotalMax,
            table::PointsRule::CooldownMinutes,
            table::PointsRule::IsActive,
            table::PointsRule::IsSystemRule,
        ])
        .from(table::PointsRule::Table)
        .to_owned()
}

pub async fn find_rule(conn: &mut SqliteConnection, id: &str) -> Result<Option<PointsRule>> {
    let statement = rule_select()
        .and_where(Expr::col(table::PointsRule::Id).eq(id))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, PointsRule, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn list_rules(conn: &mut SqliteConnection) -> Result<Vec<PointsRule>> {
    let statement = rule_select()
        .order_by(table::PointsRule::Category, Order::Asc)
        .order_by(table::PointsRule::Id, Order::Asc)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, PointsRule, _>(&sql, values)
        .fetch_all(conn)
        .await?)
}

pub async fn upsert_rule(conn: &mut SqliteConnection, rule: &PointsRule, now: i64) -> Result<()> {
    let limits = &rule.limits;
    let statement = Query::insert()
        .into_table(table::PointsRule::Table)
        .columns([
            table::PointsRule::Id,
            table::PointsRule::Name,
            table::PointsRule::Category,
            table::PointsRule::Points,
            table::PointsRule::DailyMax,
            table::PointsRule::WeeklyMax,
            table::PointsRule::MonthlyMax,
            table::PointsRule::TotalMax,
            table::PointsRule::CooldownMinutes,
            table::PointsRule::IsActive,
            table::PointsRule::IsSystemRule,
            table::PointsRule::CreatedAt,
            table::PointsRule::UpdatedAt,
        ])
        .values_panic([
            rule.id.to_owned().into(),
            rule.name.to_owned().into(),
            rule.category.to_owned().into(),
            rule.points.into(),
            limits.daily_max.into(),
            limits.weekly_max.into(),
            limits.monthly_max.into(),
            limits.total_max.into(),
            limits.cooldown_minutes.into(),
            rule.is_active.into(),
            rule.is_system_rule.into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::column(table::PointsRule::Id)
                .update_columns([
                    table::PointsRule::Name,
                    table::PointsRule::Category,
                    table::PointsRule::Points,
                    table::PointsRule::DailyMax,
                    table::PointsRule::WeeklyMax,
                    table::PointsRule::MonthlyMax,
                    table::PointsRule::TotalMax,
                    table::PointsRule::CooldownMinutes,
                    table::PointsRule::IsActive,
                    table::PointsRule::IsSystemRule,
                    table::PointsRule::UpdatedAt,
                ])
                .to_owned(),
        )
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

pub async fn delete_rule(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    let statement = Query::delete()
        .from_table(table::PointsRule::Table)
        .and_where(Expr::col(table::PointsRule::Id).eq(id))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

fn item_select() -> SelectStatement {
    Query::select()
        .columns([
            table::RedeemableItem::Id,
            table::RedeemableItem::Name,
            table::RedeemableItem::PointsCost,
            table::RedeemableItem::Stock,
            table::RedeemableItem::StockUsed,
            table::RedeemableItem::PerUserMax,
            table::RedeemableItem::MembershipRequired,
            table::RedeemableItem::IsActive,
        ])
        .from(table::RedeemableItem::Table)
        .to_owned()
}

pub async fn find_item(conn: &mut SqliteConnection, id: &str) -> Result<Option<RedeemableItem>> {
    let statement = item_select()
        .and_where(Expr::col(table::RedeemableItem::Id).eq(id))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, RedeemableItem, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

pub async fn list_items(conn: &mut SqliteConnection, active_only: bool) -> Result<Vec<RedeemableItem>> {
    let mut statement = item_select()
        .order_by(table::RedeemableItem::PointsCost, Order::Asc)
        .to_owned();

    if active_only {
        statement.and_where(Expr::col(table::RedeemableItem::IsActive).eq(true));
    }

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, RedeemableItem, _>(&sql, values)
        .fetch_all(conn)
        .await?)
}

/// Inserts or updates an item. `stock_used` is owned by redemptions and never
/// overwritten here.
pub async fn upsert_item(conn: &mut SqliteConnection, item: &RedeemableItem, now: i64) -> Result<()> {
    let membership_required =
        serde_json::to_string(&item.limits.membership_required).map_err(anyhow::Error::from)?;

    let statement = Query::insert()
        .into_table(table::RedeemableItem::Table)
        .columns([
            table::RedeemableItem::Id,
            table::RedeemableItem::Name,
            table::RedeemableItem::PointsCost,
            table::RedeemableItem::Stock,
            table::RedeemableItem::StockUsed,
            table::RedeemableItem::PerUserMax,
            table::RedeemableItem::MembershipRequired,
            table::RedeemableItem::IsActive,
            table::RedeemableItem::CreatedAt,
            table::RedeemableItem::UpdatedAt,
        ])
        .values_panic([
            item.id.to_owned().into(),
            item.name.to_owned().into(),
            item.points_cost.into(),
            item.stock.into(),
            item.stock_used.into(),
            item.limits.per_user_max.into(),
            membership_required.into(),
            item.is_active.into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::column(table::RedeemableItem::Id)
                .update_columns([
                    table::RedeemableItem::Name,
                    table::RedeemableItem::PointsCost,
                    table::RedeemableItem::Stock,
                    table::RedeemableItem::PerUserMax,
                    table::RedeemableItem::MembershipRequired,
                    table::RedeemableItem::IsActive,
                    table::RedeemableItem::UpdatedAt,
                ])
                .to_owned(),
        )
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

pub async fn set_item_active(
    conn: &mut SqliteConnection,
    id: &str,
    is_active: bool,
    now: i64,
) -> Result<bool> {
    let statement = Query::update()
        .table(table::RedeemableItem::Table)
        .value(table::RedeemableItem::IsActive, is_active)
        .value(table::RedeemableItem::UpdatedAt, now)
        .and_where(Expr::col(table::RedeemableItem::Id).eq(id))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let result = sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(result.rows_affected() == 1)
}

/// Takes one unit of stock. Returns false when the item ran out in between.
pub async fn take_stock(conn: &mut SqliteConnection, item_id: &str, now: i64) -> Result<bool> {
    let statement = Query::update()
        .table(table::RedeemableItem::Table)
        .value(
            table::RedeemableItem::StockUsed,
            Expr::col(table::RedeemableItem::StockUsed).add(1),
        )
        .value(table::RedeemableItem::UpdatedAt, now)
        .and_where(Expr::col(table::RedeemableItem::Id).eq(item_id))
        .and_where(
            Expr::col(table::RedeemableItem::Stock)
                .eq(crate::UNLIMITED_STOCK)
                .or(Expr::col(table::RedeemableItem::StockUsed)
                    .lt(Expr::col(table::RedeemableItem::Stock))),
        )
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let result = sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_redemptions(
    conn: &mut SqliteConnection,
    member_id: &str,
    item_id: &str,
) -> Result<i64> {
    let statement = Query::select()
        .expr(Expr::cust("COUNT(*)"))
        .from(table::RedemptionOrder::Table)
        .and_where(Expr::col(table::RedemptionOrder::MemberId).eq(member_id))
        .and_where(Expr::col(table::RedemptionOrder::ItemId).eq(item_id))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let (count,) = sqlx::query_as_with::<_, (i64,), _>(&sql, values)
        .fetch_one(conn)
        .await?;

    Ok(count)
}

pub struct NewOrder<'a> {
    pub id: &'a str,
    pub member_id: &'a str,
    pub item_id: &'a str,
    pub entry_id: &'a str,
    pub points_cost: i64,
    pub created_at: i64,
}

pub async fn insert_order(conn: &mut SqliteConnection, order: NewOrder<'_>) -> Result<()> {
    let statement = Query::insert()
        .into_table(table::RedemptionOrder::Table)
        .columns([
            table::RedemptionOrder::Id,
            table::RedemptionOrder::MemberId,
            table::RedemptionOrder::ItemId,
            table::RedemptionOrder::EntryId,
            table::RedemptionOrder::PointsCost,
            table::RedemptionOrder::CreatedAt,
        ])
        .values_panic([
            order.id.into(),
            order.member_id.into(),
            order.item_id.into(),
            order.entry_id.into(),
            order.points_cost.into(),
            order.created_at.into(),
        ])
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

fn entry_select() -> SelectStatement {
    Query::select()
        .columns([
            table::LedgerEntry::Id,
            table::LedgerEntry::MemberId,
            table::LedgerEntry::Seq,
            table::LedgerEntry::EntryType,
            table::LedgerEntry::Amount,
            table::LedgerEntry::BalanceBefore,
            table::LedgerEntry::BalanceAfter,
            table::LedgerEntry::RuleId,
            table::LedgerEntry::ItemId,
            table::LedgerEntry::Reason,
            table::LedgerEntry::SourceEntryId,
            table::LedgerEntry::ExpiresAt,
            table::LedgerEntry::IsExpired,
            table::LedgerEntry::CreatedAt,
            table::LedgerEntry::CreatedBy,
        ])
        .from(table::LedgerEntry::Table)
        .to_owned()
}

pub async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
    let statement = Query::insert()
        .into_table(table::LedgerEntry::Table)
        .columns([
            table::LedgerEntry::Id,
            table::LedgerEntry::MemberId,
            table::LedgerEntry::Seq,
            table::LedgerEntry::EntryType,
            table::LedgerEntry::Amount,
            table::LedgerEntry::BalanceBefore,
            table::LedgerEntry::BalanceAfter,
            table::LedgerEntry::RuleId,
            table::LedgerEntry::ItemId,
            table::LedgerEntry::Reason,
            table::LedgerEntry::SourceEntryId,
            table::LedgerEntry::ExpiresAt,
            table::LedgerEntry::IsExpired,
            table::LedgerEntry::CreatedAt,
            table::LedgerEntry::CreatedBy,
        ])
        .values_panic([
            entry.id.to_owned().into(),
            entry.member_id.to_owned().into(),
            entry.seq.into(),
            entry.entry_type.to_string().into(),
            entry.amount.into(),
            entry.balance_before.into(),
            entry.balance_after.into(),
            entry.rule_id.to_owned().into(),
            entry.item_id.to_owned().into(),
            entry.reason.to_owned().into(),
            entry.source_entry_id.to_owned().into(),
            entry.expires_at.into(),
            entry.is_expired.into(),
            entry.created_at.into(),
            entry.created_by.to_owned().into(),
        ])
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(())
}

pub async fn find_entry(conn: &mut SqliteConnection, id: &str) -> Result<Option<LedgerEntry>> {
    let statement = entry_select()
        .and_where(Expr::col(table::LedgerEntry::Id).eq(id))
        .limit(1)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, LedgerEntry, _>(&sql, values)
        .fetch_optional(conn)
        .await?)
}

/// Newest first.
pub async fn list_entries(
    conn: &mut SqliteConnection,
    member_id: &str,
    limit: u64,
    offset: u64,
) -> Result<Vec<LedgerEntry>> {
    let statement = entry_select()
        .and_where(Expr::col(table::LedgerEntry::MemberId).eq(member_id))
        .order_by(table::LedgerEntry::Seq, Order::Desc)
        .limit(limit)
        .offset(offset)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, LedgerEntry, _>(&sql, values)
        .fetch_all(conn)
        .await?)
}

/// The member's whole ledger in write order.
pub async fn all_entries(conn: &mut SqliteConnection, member_id: &str) -> Result<Vec<LedgerEntry>> {
    let statement = entry_select()
        .and_where(Expr::col(table::LedgerEntry::MemberId).eq(member_id))
        .order_by(table::LedgerEntry::Seq, Order::Asc)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);

    Ok(sqlx::query_as_with::<_, LedgerEntry, _>(&sql, values)
        .fetch_all(conn)
        .await?)
}

/// Sum of `earn` amounts for a rule inside `[start, end)`.
pub async fn sum_earned(
    conn: &mut SqliteConnection,
    member_id: &str,
    rule_id: &str,
    window: Window,
) -> Result<i64> {
    let mut statement = Query::select()
        .expr(Expr::cust("COALESCE(SUM(amount), 0)"))
        .from(table::LedgerEntry::Table)
        .and_where(Expr::col(table::LedgerEntry::MemberId).eq(member_id))
        .and_where(Expr::col(table::LedgerEntry::RuleId).eq(rule_id))
        .and_where(Expr::col(table::LedgerEntry::EntryType).eq(EntryType::Earn.to_string()))
        .to_owned();

    if let Some(start) = window.start {
        statement.and_where(Expr::col(table::LedgerEntry::CreatedAt).gte(start));
    }

    if let Some(end) = window.end {
        statement.and_where(Expr::col(table::LedgerEntry::CreatedAt).lt(end));
    }

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let (sum,) = sqlx::query_as_with::<_, (i64,), _>(&sql, values)
        .fetch_one(conn)
        .await?;

    Ok(sum)
}

pub async fn last_earned_at(
    conn: &mut SqliteConnection,
    member_id: &str,
    rule_id: &str,
) -> Result<Option<i64>> {
    let statement = Query::select()
        .expr(Expr::cust("MAX(created_at)"))
        .from(table::LedgerEntry::Table)
        .and_where(Expr::col(table::LedgerEntry::MemberId).eq(member_id))
        .and_where(Expr::col(table::LedgerEntry::RuleId).eq(rule_id))
        .and_where(Expr::col(table::LedgerEntry::EntryType).eq(EntryType::Earn.to_string()))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let (last,) = sqlx::query_as_with::<_, (Option<i64>,), _>(&sql, values)
        .fetch_one(conn)
        .await?;

    Ok(last)
}

/// Flags a credit lot as swept. Returns false when another sweeper got there first.
pub async fn mark_expired(conn: &mut SqliteConnection, entry_id: &str) -> Result<bool> {
    let statement = Query::update()
        .table(table::LedgerEntry::Table)
        .value(table::LedgerEntry::IsExpired, true)
        .and_where(Expr::col(table::LedgerEntry::Id).eq(entry_id))
        .and_where(Expr::col(table::LedgerEntry::IsExpired).eq(false))
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let result = sqlx::query_with(&sql, values).execute(conn).await?;

    Ok(result.rows_affected() == 1)
}

pub async fn members_with_expiring_lots(conn: &mut SqliteConnection, as_of: i64) -> Result<Vec<String>> {
    let statement = Query::select()
        .distinct()
        .column(table::LedgerEntry::MemberId)
        .from(table::LedgerEntry::Table)
        .and_where(Expr::col(table::LedgerEntry::Amount).gt(0))
        .and_where(Expr::col(table::LedgerEntry::IsExpired).eq(false))
        .and_where(Expr::col(table::LedgerEntry::ExpiresAt).is_not_null())
        .and_where(Expr::col(table::LedgerEntry::ExpiresAt).lte(as_of))
        .order_by(table::LedgerEntry::MemberId, Order::Asc)
        .to_owned();

    let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
    let rows = sqlx::query_as_with::<_, (String,), _>(&sql, values)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
