use std::time::{SystemTime, UNIX_EPOCH};

use advisorhub_shared::Metadata;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{config::JwtConfig, error::ApiError, routes::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    aud: String,
    exp: u64,
    iat: u64,
    iss: String,
    /// Member id.
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    role: Role,
}

/// Mints a token the way the identity provider does. Used by the CLI and
/// tests; production tokens come from the provider.
pub fn generate_token(
    config: &JwtConfig,
    sub: impl Into<String>,
    email: Option<String>,
    role: Role,
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let claims = Claims {
        aud: config.audience.to_owned(),
        exp: now + config.expiration_days * 24 * 60 * 60,
        iat: now,
        iss: config.issuer.to_owned(),
        sub: sub.into(),
        email,
        role,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

async fn verify(parts: &mut Parts, state: &AppState) -> Result<Claims, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[state.config.jwt.issuer.to_owned()]);
    validation.set_audience(&[state.config.jwt.audience.to_owned()]);

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        &validation,
    )
    .map_err(|err| {
        tracing::debug!(err = %err, "rejected bearer token");
        ApiError::Unauthorized
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    Ok(token_data.claims)
}

fn metadata(claims: &Claims) -> Metadata {
    Metadata::new(Some(claims.sub.to_owned()), claims.email.to_owned())
}

/// The calling member, identified by the token subject.
pub struct AuthMember {
    pub member_id: String,
    pub metadata: Metadata,
}

impl FromRequestParts<AppState> for AuthMember {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = verify(parts, state).await?;

        Ok(AuthMember {
            metadata: metadata(&claims),
            member_id: claims.sub,
        })
    }
}

/// An operator with the admin role.
pub struct AuthAdmin {
    pub metadata: Metadata,
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = verify(parts, state).await?;

        if claims.role != Role::Admin {
            return Err(ApiError::AdminRequired);
        }

        Ok(AuthAdmin {
            metadata: metadata(&claims),
        })
    }
}
