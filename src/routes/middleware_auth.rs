use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Id of the operator making an admin request, taken from the verified bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Operator(pub Uuid);

impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Operator>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("UNAUTHENTICATED", "missing operator"))
    }
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// Verify the bearer JWT issued by the identity provider and attach the operator id.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req.headers().get("authorization").and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return Err(ApiError::unauthorized("UNAUTHENTICATED", "missing token")),
    };

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!(error = %e, "rejected admin token");
        ApiError::unauthorized("UNAUTHENTICATED", "invalid token")
    })?;

    let operator_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ApiError::unauthorized("UNAUTHENTICATED", "invalid subject"))?;

    req.extensions_mut().insert(Operator(operator_id));
    Ok(next.run(req).await)
}
