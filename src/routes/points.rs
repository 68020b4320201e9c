use advisorhub_points::{
    EarnOutcome, EnrollInput, LedgerEntry, MemberAccount, PointsSummary, RedeemOutcome,
    RedeemableItem, ReferralOutcome,
};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    auth::AuthMember,
    error::{ApiError, status_for},
    routes::{ApiResponse, AppState},
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnrollBody {
    pub timezone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBody {
    pub tool_name: String,
}

#[derive(Deserialize)]
pub struct ReferralBody {
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemBody {
    pub item_id: String,
}

#[derive(Deserialize, Default)]
pub struct PageParams {
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

pub async fn enroll(
    State(state): State<AppState>,
    member: AuthMember,
    WithRejection(Json(body), _): WithRejection<Json<EnrollBody>, ApiError>,
) -> ApiResult<MemberAccount> {
    let input = EnrollInput {
        member_id: member.member_id,
        timezone: body.timezone,
        tier_id: None,
    };
    let account = state.command.enroll(input, &member.metadata).await?;

    Ok(Json(ApiResponse::ok(account)))
}

pub async fn daily_login(State(state): State<AppState>, member: AuthMember) -> ApiResult<EarnOutcome> {
    let outcome = state
        .command
        .on_daily_login(member.member_id, &member.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn tool_use(
    State(state): State<AppState>,
    member: AuthMember,
    WithRejection(Json(body), _): WithRejection<Json<ToolUseBody>, ApiError>,
) -> ApiResult<EarnOutcome> {
    let outcome = state
        .command
        .on_tool_use(member.member_id, &body.tool_name, &member.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn first_client(State(state): State<AppState>, member: AuthMember) -> ApiResult<EarnOutcome> {
    let outcome = state
        .command
        .on_first_client(member.member_id, &member.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn referral(
    State(state): State<AppState>,
    member: AuthMember,
    WithRejection(Json(body), _): WithRejection<Json<ReferralBody>, ApiError>,
) -> ApiResult<ReferralOutcome> {
    let outcome = state
        .command
        .process_referral(member.member_id, body.code, &member.metadata)
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

/// A turned-down redemption answers with the reason's status and the
/// outcome in `data`.
pub async fn redeem(
    State(state): State<AppState>,
    member: AuthMember,
    WithRejection(Json(body), _): WithRejection<Json<RedeemBody>, ApiError>,
) -> Result<Response, ApiError> {
    let outcome = state
        .command
        .redeem(member.member_id, body.item_id, &member.metadata)
        .await?;

    let Some(reason) = outcome.error else {
        return Ok(Json(ApiResponse::ok(outcome)).into_response());
    };

    let response = ApiResponse::<RedeemOutcome> {
        success: false,
        data: Some(outcome),
        error_kind: Some(reason.kind().to_string()),
        message: Some(reason.to_string()),
    };

    Ok((status_for(reason.kind()), Json(response)).into_response())
}

pub async fn summary(State(state): State<AppState>, member: AuthMember) -> ApiResult<PointsSummary> {
    let summary = state
        .command
        .get_user_points_summary(&member.member_id)
        .await?;

    Ok(Json(ApiResponse::ok(summary)))
}

pub async fn entries(
    State(state): State<AppState>,
    member: AuthMember,
    WithRejection(Query(page), _): WithRejection<Query<PageParams>, ApiError>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .command
        .list_entries(&member.member_id, page.limit, page.offset)
        .await?;

    Ok(Json(ApiResponse::ok(entries)))
}

pub async fn items(State(state): State<AppState>, _member: AuthMember) -> ApiResult<Vec<RedeemableItem>> {
    let items = state.command.list_items(true).await?;

    Ok(Json(ApiResponse::ok(items)))
}
