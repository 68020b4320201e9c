use advisorhub_shared::{Error, Result};
use serde::Serialize;
use sqlx::SqliteConnection;
use strum::{AsRefStr, Display};
use time::OffsetDateTime;

use crate::{
    MemberAccount, MembershipTier, PointsRule, repository,
    window::{Window, calendar_windows},
};

/// Why an otherwise valid earn attempt grants nothing.
#[derive(Display, AsRefStr, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    Cooldown,
    DailyMax,
    WeeklyMax,
    MonthlyMax,
    TotalMax,
    ZeroAmount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnDecision {
    pub granted: bool,
    pub amount: i64,
    pub reason: Option<DenialReason>,
}

impl EarnDecision {
    fn grant(amount: i64) -> Self {
        Self {
            granted: true,
            amount,
            reason: None,
        }
    }

    fn deny(reason: DenialReason) -> Self {
        Self {
            granted: false,
            amount: 0,
            reason: Some(reason),
        }
    }
}

/// What the member already earned under one rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleActivity {
    pub last_earned_at: Option<i64>,
    pub daily: i64,
    pub weekly: i64,
    pub monthly: i64,
    pub total: i64,
}

const BASIS_POINTS: i128 = 10_000;

/// Base points scaled by the tier multiplier, rounded half away from zero.
/// The multiplier is taken to four decimal places so that 50 x 1.15 is
/// exactly 57.5 and rounds to 58.
pub fn scaled_amount(points: i64, multiplier: f64) -> i64 {
    let bp = (multiplier * BASIS_POINTS as f64).round() as i128;
    let product = i128::from(points) * bp;
    let rounded = (product.abs() + BASIS_POINTS / 2) / BASIS_POINTS * product.signum();

    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

/// Decides whether `rule` grants points at `occurred_at`. Pure: every input
/// is passed in, nothing is read or written.
pub fn evaluate(
    rule: &PointsRule,
    tier: &MembershipTier,
    activity: &RuleActivity,
    occurred_at: i64,
) -> Result<EarnDecision> {
    if !rule.is_active || !tier.is_active || !tier.permissions.can_earn_points {
        return Err(Error::RuleInactive(rule.id.to_owned()));
    }

    let limits = &rule.limits;

    if let (Some(cooldown), Some(last)) = (limits.cooldown_minutes, activity.last_earned_at) {
        if cooldown > 0 && occurred_at - last < cooldown * 60 {
            return Ok(EarnDecision::deny(DenialReason::Cooldown));
        }
    }

    let amount = scaled_amount(rule.points, tier.points_multiplier);
    if amount <= 0 {
        return Ok(EarnDecision::deny(DenialReason::ZeroAmount));
    }

    let caps = [
        (limits.daily_max, activity.daily, DenialReason::DailyMax),
        (limits.weekly_max, activity.weekly, DenialReason::WeeklyMax),
        (limits.monthly_max, activity.monthly, DenialReason::MonthlyMax),
        (limits.total_max, activity.total, DenialReason::TotalMax),
    ];

    for (max, earned, reason) in caps {
        if max.is_some_and(|max| earned.saturating_add(amount) > max) {
            return Ok(EarnDecision::deny(reason));
        }
    }

    Ok(EarnDecision::grant(amount))
}

/// Sums the member's earnings for `rule_id` over the calendar windows around
/// `occurred_at`, in the member's timezone.
pub async fn load_activity(
    conn: &mut SqliteConnection,
    member: &MemberAccount,
    rule_id: &str,
    occurred_at: OffsetDateTime,
) -> Result<RuleActivity> {
    let windows = calendar_windows(occurred_at, &member.timezone)?;

    Ok(RuleActivity {
        last_earned_at: repository::last_earned_at(&mut *conn, &member.id, rule_id).await?,
        daily: repository::sum_earned(&mut *conn, &member.id, rule_id, windows.day).await?,
        weekly: repository::sum_earned(&mut *conn, &member.id, rule_id, windows.week).await?,
        monthly: repository::sum_earned(&mut *conn, &member.id, rule_id, windows.month).await?,
        total: repository::sum_earned(&mut *conn, &member.id, rule_id, Window::ALL).await?,
    })
}
