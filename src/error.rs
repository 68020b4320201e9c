use advisorhub_shared::ErrorKind;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("admin role required")]
    AdminRequired,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Points(#[from] advisorhub_shared::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::RuleViolation
        | ErrorKind::InsufficientPoints
        | ErrorKind::NegativeBalance => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::OutOfStock | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_kind) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
            ApiError::AdminRequired => (StatusCode::FORBIDDEN, ErrorKind::Forbidden.to_string()),
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::ValidationError.to_string(),
            ),
            ApiError::Points(err) => (status_for(err.kind()), err.kind().to_string()),
        };

        // Internal details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(err = %self, "request failed");
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(ApiResponse::<()>::failure(error_kind, message))).into_response()
    }
}
