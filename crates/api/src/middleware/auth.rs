//! JWT-based authentication extractors for Axum handlers.
//!
//! Two header forms are supported for backward compatibility with older
//! client generations:
//!
//! - User endpoints read a user-scoped JWT from the legacy `x-auth-token`
//!   header ([`AuthUser`]).
//! - Retro endpoints read a retro-scoped JWT from the standard
//!   `Authorization: Bearer` header ([`RetroToken`]).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::retro::Retro;

use crate::auth::jwt::{validate_token, Claims, JwtConfig, TokenScope};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT in the legacy `x-auth-token`
/// header.
///
/// Use this as an extractor parameter in any handler that requires a
/// logged-in user:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Forbidden("Missing x-auth-token header".into()))
            })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Forbidden("Invalid or expired token".into()))
        })?;

        if claims.scope != TokenScope::User {
            return Err(AppError::Core(CoreError::Forbidden(
                "Token is not user-scoped".into(),
            )));
        }

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

/// Optional retro token extracted from `Authorization: Bearer <jwt>`.
///
/// Extraction never fails: a missing or invalid token yields `None` and the
/// authorization decision is made per-retro by [`authorize_retro`] (a
/// public retro is readable with no token at all).
#[derive(Debug, Clone)]
pub struct RetroToken(pub Option<Claims>);

impl FromRequestParts<AppState> for RetroToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| validate_token(token, &state.config.jwt).ok());

        Ok(RetroToken(claims))
    }
}

/// Check whether `claims` grant access to `retro`.
///
/// A retro that is neither private nor password-protected is open to
/// everyone. Otherwise a retro-scoped token whose subject is this retro's
/// id is required. The subject is the stable numeric id, so a token keeps
/// working across slug renames.
pub fn retro_access_allowed(retro: &Retro, claims: Option<&Claims>) -> bool {
    if !retro.is_private && retro.password_hash.is_none() {
        return true;
    }
    matches!(
        claims,
        Some(c) if c.scope == TokenScope::Retro && c.sub == retro.id
    )
}

/// Authorize access to a retro or fail with 403.
///
/// 403 (not 401) because the client reacts to it by prompting for the
/// retro password.
pub fn authorize_retro(retro: &Retro, token: &RetroToken) -> Result<(), AppError> {
    if retro_access_allowed(retro, token.0.as_ref()) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Retro login required".into(),
        )))
    }
}

/// Validate a raw token string (e.g. from WebSocket query params) into
/// claims, ignoring invalid input.
pub fn claims_from_raw(token: Option<&str>, config: &JwtConfig) -> Option<Claims> {
    token.and_then(|t| validate_token(t, config).ok())
}
