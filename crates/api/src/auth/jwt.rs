//! JWT token generation and validation.
//!
//! Two token scopes share one HS256-signed claims layout:
//!
//! - **user** tokens (subject = user id) authenticate a logged-in user via
//!   the legacy `x-auth-token` header.
//! - **retro** tokens (subject = retro id) grant access to a single retro
//!   via `Authorization: Bearer`. The subject is the *numeric* id, not the
//!   slug, so a token survives a rename — clients only migrate the cache
//!   key.

use huddle_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token scope discriminator embedded in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    User,
    Retro,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject — user id or retro id depending on `scope`.
    pub sub: DbId,
    /// What this token grants access to.
    pub scope: TokenScope,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// User token lifetime in days (default: 30).
    pub user_token_expiry_days: i64,
    /// Retro token lifetime in days (default: 30).
    pub retro_token_expiry_days: i64,
}

/// Default user token expiry in days.
const DEFAULT_USER_EXPIRY_DAYS: i64 = 30;
/// Default retro token expiry in days.
const DEFAULT_RETRO_EXPIRY_DAYS: i64 = 30;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_USER_EXPIRY_DAYS`   | no       | `30`    |
    /// | `JWT_RETRO_EXPIRY_DAYS`  | no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let user_token_expiry_days: i64 = std::env::var("JWT_USER_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_USER_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_USER_EXPIRY_DAYS must be a valid i64");

        let retro_token_expiry_days: i64 = std::env::var("JWT_RETRO_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETRO_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_RETRO_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            user_token_expiry_days,
            retro_token_expiry_days,
        }
    }
}

fn generate_token(
    sub: DbId,
    scope: TokenScope,
    expiry_days: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + expiry_days * 24 * 60 * 60;

    let claims = Claims {
        sub,
        scope,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Generate a user-scoped token for the given user id.
pub fn generate_user_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    generate_token(
        user_id,
        TokenScope::User,
        config.user_token_expiry_days,
        config,
    )
}

/// Generate a retro-scoped token for the given retro id.
pub fn generate_retro_token(
    retro_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    generate_token(
        retro_id,
        TokenScope::Retro,
        config.retro_token_expiry_days,
        config,
    )
}

/// Validate and decode a token, returning the embedded [`Claims`].
///
/// Validates the signature and expiration automatically.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}
