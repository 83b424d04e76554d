/*!
 * # Authentication Module
 *
 * Bearer-token authentication for the checkout API. A validated JWT yields an
 * [`AuthUser`] (the principal: user id, tenant id, roles) and the raw token,
 * which together form the [`RequestContext`] that every downstream adapter
 * call carries explicitly. The token is never stored in process-wide state.
 */

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::AppState;

/// Role required on every checkout endpoint
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub tenant_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated principal extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub roles: Vec<String>,
    token: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Request-scoped context handed to every downstream adapter call.
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            token: self.token.clone(),
        }
    }
}

/// Per-request credentials and identity propagated to downstream services.
///
/// Built fresh from the authenticated user on every request; nothing here
/// outlives the request it belongs to.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token: String,
}

/// Authentication failures surfaced before any business logic runs
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    #[error("Token is missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Role {0} is required")]
    Forbidden(&'static str),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = Json(json!({
            "data": null,
            "message": self.to_string(),
            "status": status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?;

        let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AuthError::MissingClaim("sub"))?;
        let tenant_id = data
            .claims
            .tenant_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(AuthError::MissingClaim("tenant_id"))?;

        Ok(AuthUser {
            user_id,
            tenant_id,
            roles: data.claims.roles,
            token: token.to_string(),
        })
    }
}

/// Extractor that additionally enforces the CUSTOMER role.
pub struct Customer(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Customer {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.has_role(ROLE_CUSTOMER) {
            return Err(AuthError::Forbidden(ROLE_CUSTOMER));
        }
        Ok(Customer(user))
    }
}
