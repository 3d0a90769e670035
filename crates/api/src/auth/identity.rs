//! External identity-provider boundary.
//!
//! User login and registration delegate identity verification to an
//! external OAuth provider: the client obtains an access token through the
//! provider's own flow and hands it to us; we exchange it for the user's
//! profile via the provider's userinfo endpoint. Designing an auth
//! protocol is explicitly out of scope — this module is only the seam.

use async_trait::async_trait;
use serde::Deserialize;

/// Profile returned by a verified access token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub name: String,
    pub email: String,
    /// Hosted domain, when the provider reports one (e.g. a Workspace org).
    #[serde(default, rename = "hd")]
    pub hosted_domain: Option<String>,
}

/// Error type for identity verification failures.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the access token.
    #[error("Access token rejected by identity provider")]
    InvalidToken,

    /// The provider could not be reached or returned garbage.
    #[error("Identity provider error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Verifies provider access tokens and returns the associated profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;
}

/// [`IdentityProvider`] backed by an HTTP userinfo endpoint.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

impl HttpIdentityProvider {
    /// Create a provider querying the given userinfo endpoint.
    pub fn new(userinfo_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            userinfo_url: userinfo_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Userinfo request rejected");
            return Err(IdentityError::InvalidToken);
        }

        let user = response.json::<IdentityUser>().await?;
        Ok(user)
    }
}
