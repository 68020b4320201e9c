use sea_query::Iden;

#[derive(Iden, Clone)]
pub enum MemberAccount {
    Table,
    Id,
    PrimaryTierId,
    CurrentBalance,
    LifetimeEarned,
    LifetimeSpent,
    LifetimeExpired,
    Timezone,
    ReferralCode,
    ReferredBy,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone)]
pub enum MembershipTier {
    Table,
    Id,
    Name,
    Priority,
    PointsMultiplier,
    CanEarnPoints,
    CanRedeemPoints,
    CanUseTools,
    CanExport,
    CanAccessAi,
    MaxClients,
    IsActive,
    IsDefault,
    IsPermanent,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone)]
pub enum PointsRule {
    Table,
    Id,
    Name,
    Category,
    Points,
    DailyMax,
    WeeklyMax,
    MonthlyMax,
    TotalMax,
    CooldownMinutes,
    IsActive,
    IsSystemRule,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone)]
pub enum RedeemableItem {
    Table,
    Id,
    Name,
    PointsCost,
    Stock,
    StockUsed,
    PerUserMax,
    MembershipRequired,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone)]
pub enum LedgerEntry {
    Table,
    Id,
    MemberId,
    Seq,
    EntryType,
    Amount,
    BalanceBefore,
    BalanceAfter,
    RuleId,
    ItemId,
    Reason,
    SourceEntryId,
    ExpiresAt,
    IsExpired,
    CreatedAt,
    CreatedBy,
}

#[derive(Iden, Clone)]
pub enum RedemptionOrder {
    Table,
    Id,
    MemberId,
    ItemId,
    EntryId,
    PointsCost,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum AuditLog {
    Table,
    Id,
    OperatorId,
    OperatorEmail,
    Action,
    Module,
    TargetId,
    TargetName,
    Changes,
    Description,
    CreatedAt,
}
