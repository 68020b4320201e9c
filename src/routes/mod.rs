use axum::{
    Router,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use sqlx::SqlitePool;

mod admin;
mod health;
mod points;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub command: advisorhub_points::Command,
    pub audit: advisorhub_audit::Query,
    pub pool: SqlitePool,
}

/// Envelope shared by every `/api` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_kind: None,
            message: None,
        }
    }

    pub fn failure(error_kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_kind: Some(error_kind.into()),
            message: Some(message.into()),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(app_state.pool.clone())
        .route("/api/points/enroll", post(points::enroll))
        .route("/api/points/daily-login", post(points::daily_login))
        .route("/api/points/tool-use", post(points::tool_use))
        .route("/api/points/first-client", post(points::first_client))
        .route("/api/points/referral", post(points::referral))
        .route("/api/points/redeem", post(points::redeem))
        .route("/api/points/summary", get(points::summary))
        .route("/api/points/entries", get(points::entries))
        .route("/api/points/items", get(points::items))
        .route("/api/admin/points/adjust", post(admin::adjust))
        .route("/api/admin/points/sweep", post(admin::sweep))
        .route("/api/admin/members", post(admin::enroll))
        .route("/api/admin/members/{id}/summary", get(admin::member_summary))
        .route("/api/admin/members/{id}/entries", get(admin::member_entries))
        .route("/api/admin/members/{id}/tier", put(admin::change_tier))
        .route("/api/admin/audit", get(admin::audit))
        .route("/api/admin/audit/{id}", get(admin::audit_record))
        .route("/api/admin/tiers", get(admin::tiers).post(admin::save_tier))
        .route("/api/admin/rules", get(admin::rules).post(admin::save_rule))
        .route("/api/admin/rules/{id}", delete(admin::delete_rule))
        .route("/api/admin/items", get(admin::items).post(admin::save_item))
        .route("/api/admin/items/{id}/active", put(admin::set_item_active))
        .with_state(app_state)
}
