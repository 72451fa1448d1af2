use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;

/// Tenant resolved from the bearer token, stored in request extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentTenant(pub Uuid);

/// Claims expected inside the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the tenant's UUID as a string.
    pub sub: String,
    pub exp: usize,
}

/// Signs an HS256 token for `tenant_id` valid for `ttl`.
pub fn issue_token(secret: &str, tenant_id: Uuid, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: tenant_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validates the `Authorization: Bearer` token and attaches [`CurrentTenant`].
///
/// Any missing, malformed or expired token yields `401`.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoding_key = DecodingKey::from_secret(state.jwt_secret.as_bytes());
    let claims = decode::<Claims>(token, &decoding_key, &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            debug!("Rejected token: {}", e);
            StatusCode::UNAUTHORIZED
        })?
        .claims;

    let tenant_id = Uuid::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(CurrentTenant(tenant_id));

    Ok(next.run(req).await)
}
