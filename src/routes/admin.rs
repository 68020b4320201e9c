use std::time::Duration;

use advisorhub_audit::{AuditAction, AuditModule, AuditRecord, FilterQuery};
use advisorhub_points::{
    AdjustInput, AdjustOutcome, EnrollInput, LedgerEntry, MemberAccount, MembershipTier,
    PointsRule, PointsSummary, RedeemableItem, SaveItemInput, SaveRuleInput, SaveTierInput,
    SweepReport, store::retry_read,
};
use advisorhub_shared::Error;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    auth::AuthAdmin,
    error::ApiError,
    routes::{ApiResponse, AppState, points::PageParams},
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SweepBody {
    /// Unix seconds; now when absent.
    pub as_of: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBody {
    pub tier_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBody {
    pub is_active: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuditParams {
    pub module: Option<AuditModule>,
    pub action: Option<AuditAction>,
    pub target_id: Option<String>,
    pub operator_id: Option<String>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl AuditParams {
    fn filter(&self) -> FilterQuery {
        FilterQuery {
            module: self.module,
            action: self.action,
            target_id: self.target_id.to_owned(),
            operator_id: self.operator_id.to_owned(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

pub async fn adjust(
    State(state): State<AppState>,
    admin: AuthAdmin,
    WithRejection(Json(input), _): WithRejection<Json<AdjustInput>, ApiError>,
) -> ApiResult<AdjustOutcome> {
    let outcome = state.command.adjust_points(input, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn sweep(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    WithRejection(Json(body), _): WithRejection<Json<SweepBody>, ApiError>,
) -> ApiResult<SweepReport> {
    let as_of = match body.as_of {
        Some(as_of) => OffsetDateTime::from_unix_timestamp(as_of)
            .map_err(|err| ApiError::BadRequest(err.to_string()))?,
        None => OffsetDateTime::now_utc(),
    };

    let report = state.command.sweep_expired(as_of).await?;

    Ok(Json(ApiResponse::ok(report)))
}

pub async fn enroll(
    State(state): State<AppState>,
    admin: AuthAdmin,
    WithRejection(Json(input), _): WithRejection<Json<EnrollInput>, ApiError>,
) -> ApiResult<MemberAccount> {
    let account = state.command.enroll(input, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(account)))
}

pub async fn member_summary(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(member_id): Path<String>,
) -> ApiResult<PointsSummary> {
    let summary = state.command.get_user_points_summary(&member_id).await?;

    Ok(Json(ApiResponse::ok(summary)))
}

pub async fn member_entries(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(member_id): Path<String>,
    WithRejection(Query(page), _): WithRejection<Query<PageParams>, ApiError>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .command
        .list_entries(&member_id, page.limit, page.offset)
        .await?;

    Ok(Json(ApiResponse::ok(entries)))
}

pub async fn change_tier(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(member_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<TierBody>, ApiError>,
) -> ApiResult<MemberAccount> {
    let account = state
        .command
        .change_tier(member_id, body.tier_id, &admin.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(account)))
}

pub async fn audit(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    WithRejection(Query(params), _): WithRejection<Query<AuditParams>, ApiError>,
) -> ApiResult<Vec<AuditRecord>> {
    let points = &state.config.points;
    let audit = &state.audit;
    let params = &params;

    let records = retry_read(
        points.max_read_retries,
        Duration::from_millis(points.read_retry_backoff_ms),
        move || async move { audit.filter(params.filter()).await },
    )
    .await?;

    Ok(Json(ApiResponse::ok(records)))
}

pub async fn audit_record(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<AuditRecord> {
    let record = state
        .audit
        .find(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("audit record {id}")))?;

    Ok(Json(ApiResponse::ok(record)))
}

pub async fn tiers(State(state): State<AppState>, _admin: AuthAdmin) -> ApiResult<Vec<MembershipTier>> {
    let tiers = state.command.list_tiers().await?;

    Ok(Json(ApiResponse::ok(tiers)))
}

pub async fn save_tier(
    State(state): State<AppState>,
    admin: AuthAdmin,
    WithRejection(Json(input), _): WithRejection<Json<SaveTierInput>, ApiError>,
) -> ApiResult<MembershipTier> {
    let tier = state.command.save_tier(input, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(tier)))
}

pub async fn rules(State(state): State<AppState>, _admin: AuthAdmin) -> ApiResult<Vec<PointsRule>> {
    let rules = state.command.list_rules().await?;

    Ok(Json(ApiResponse::ok(rules)))
}

pub async fn save_rule(
    State(state): State<AppState>,
    admin: AuthAdmin,
    WithRejection(Json(input), _): WithRejection<Json<SaveRuleInput>, ApiError>,
) -> ApiResult<PointsRule> {
    let rule = state.command.save_rule(input, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(rule)))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(rule_id): Path<String>,
) -> ApiResult<()> {
    state.command.delete_rule(rule_id, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(())))
}

pub async fn items(State(state): State<AppState>, _admin: AuthAdmin) -> ApiResult<Vec<RedeemableItem>> {
    let items = state.command.list_items(false).await?;

    Ok(Json(ApiResponse::ok(items)))
}

pub async fn save_item(
    State(state): State<AppState>,
    admin: AuthAdmin,
    WithRejection(Json(input), _): WithRejection<Json<SaveItemInput>, ApiError>,
) -> ApiResult<RedeemableItem> {
    let item = state.command.save_item(input, &admin.metadata).await?;

    Ok(Json(ApiResponse::ok(item)))
}

pub async fn set_item_active(
    State(state): State<AppState>,
    admin: AuthAdmin,
    Path(item_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<ActiveBody>, ApiError>,
) -> ApiResult<()> {
    state
        .command
        .set_item_active(item_id, body.is_active, &admin.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(())))
}
