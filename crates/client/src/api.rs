//! HTTP resource client.
//!
//! [`RetroApi`] builds one request per server endpoint and sends it
//! through a [`Transport`]. The transport is a trait so tests can supply
//! canned responses; production uses [`HttpTransport`] over `reqwest`.
//!
//! Two auth header forms exist for backward compatibility: retro tokens
//! ride in `Authorization: Bearer`, user tokens in the legacy
//! `x-auth-token` header.

use async_trait::async_trait;
use huddle_core::types::DbId;
use huddle_core::Category;
use serde_json::{json, Value};

/// How a request authenticates.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthScheme {
    /// No auth header.
    None,
    /// `Authorization: Bearer <token>` — retro access tokens.
    Bearer(String),
    /// Legacy `x-auth-token: <token>` — user session tokens.
    Legacy(String),
}

/// A single API request: method, path relative to the API root, optional
/// JSON body, and auth.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: reqwest::Method,
    pub path: String,
    pub body: Option<Value>,
    pub auth: AuthScheme,
}

/// A response reduced to what the dispatcher needs: status and JSON body.
///
/// Bodies that are empty or not JSON come back as `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Transport-level failure — the request never produced a status code.
#[derive(Debug, thiserror::Error)]
#[error("Transport error: {0}")]
pub struct TransportError(pub String);

/// Sends [`ApiRequest`]s. Implemented by [`HttpTransport`] in production
/// and by canned-response mocks in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `reqwest`-backed transport against a base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given API root, e.g.
    /// `http://localhost:4000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method, url);

        builder = match request.auth {
            AuthScheme::None => builder,
            AuthScheme::Bearer(token) => builder.bearer_auth(token),
            AuthScheme::Legacy(token) => builder.header("x-auth-token", token),
        };

        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        Ok(ApiResponse { status, body })
    }
}

/// Request builder for every server endpoint the dispatcher uses.
pub struct RetroApi {
    transport: Box<dyn Transport>,
}

impl RetroApi {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Convenience constructor over [`HttpTransport`].
    pub fn over_http(base_url: impl Into<String>) -> Self {
        Self::new(Box::new(HttpTransport::new(base_url)))
    }

    fn retro_auth(token: Option<&str>) -> AuthScheme {
        match token {
            Some(t) => AuthScheme::Bearer(t.to_string()),
            None => AuthScheme::None,
        }
    }

    fn user_auth(token: Option<&str>) -> AuthScheme {
        match token {
            Some(t) => AuthScheme::Legacy(t.to_string()),
            None => AuthScheme::None,
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: String,
        body: Option<Value>,
        auth: AuthScheme,
    ) -> Result<ApiResponse, TransportError> {
        self.transport
            .send(ApiRequest {
                method,
                path,
                body,
                auth,
            })
            .await
    }

    // -- Retros -------------------------------------------------------

    pub async fn create_retro(
        &self,
        name: &str,
        slug: &str,
        password: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let body = json!({ "retro": { "name": name, "slug": slug, "password": password } });
        self.send(
            reqwest::Method::POST,
            "/retros".into(),
            Some(body),
            Self::user_auth(auth_token),
        )
        .await
    }

    pub async fn get_retros(&self, auth_token: Option<&str>) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            "/retros".into(),
            None,
            Self::user_auth(auth_token),
        )
        .await
    }

    pub async fn get_retro(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            format!("/retros/{id}"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn get_retro_settings(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            format!("/retros/{id}/settings"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn update_retro(
        &self,
        id: &str,
        settings: Value,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::PATCH,
            format!("/retros/{id}"),
            Some(json!({ "retro": settings })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn update_retro_password(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let body = json!({
            "current_password": current_password,
            "new_password": new_password,
        });
        self.send(
            reqwest::Method::PATCH,
            format!("/retros/{id}/password"),
            Some(body),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn get_retro_login(&self, id: &str) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            format!("/retros/{id}/sessions/new"),
            None,
            AuthScheme::None,
        )
        .await
    }

    pub async fn login_to_retro(
        &self,
        id: &str,
        password: &str,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{id}/sessions"),
            Some(json!({ "retro": { "password": password } })),
            AuthScheme::None,
        )
        .await
    }

    pub async fn archive_retro(
        &self,
        id: &str,
        send_archive_email: bool,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{id}/archives"),
            Some(json!({ "send_archive_email": send_archive_email })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn get_retro_archives(
        &self,
        id: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            format!("/retros/{id}/archives"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn get_retro_archive(
        &self,
        id: &str,
        archive_id: DbId,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::GET,
            format!("/retros/{id}/archives/{archive_id}"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    // -- Items --------------------------------------------------------

    pub async fn create_retro_item(
        &self,
        retro_id: &str,
        category: Category,
        description: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let body = json!({ "item": { "category": category, "description": description } });
        self.send(
            reqwest::Method::POST,
            format!("/retros/{retro_id}/items"),
            Some(body),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn update_retro_item(
        &self,
        retro_id: &str,
        item_id: DbId,
        description: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::PATCH,
            format!("/retros/{retro_id}/items/{item_id}"),
            Some(json!({ "description": description })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn delete_retro_item(
        &self,
        retro_id: &str,
        item_id: DbId,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::DELETE,
            format!("/retros/{retro_id}/items/{item_id}"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn vote_retro_item(
        &self,
        retro_id: &str,
        item_id: DbId,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{retro_id}/items/{item_id}/vote"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn set_retro_item_done(
        &self,
        retro_id: &str,
        item_id: DbId,
        done: bool,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::PATCH,
            format!("/retros/{retro_id}/items/{item_id}/done"),
            Some(json!({ "done": done })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn next_retro_item(
        &self,
        retro_id: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{retro_id}/discussion/transitions"),
            Some(json!({ "transition": "NEXT" })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn highlight_retro_item(
        &self,
        retro_id: &str,
        item_id: DbId,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{retro_id}/discussion"),
            Some(json!({ "item_id": item_id })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn unhighlight_retro_item(
        &self,
        retro_id: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::DELETE,
            format!("/retros/{retro_id}/discussion"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    // -- Action items -------------------------------------------------

    pub async fn create_retro_action_item(
        &self,
        retro_id: &str,
        description: &str,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            format!("/retros/{retro_id}/action_items"),
            Some(json!({ "action_item": { "description": description } })),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn update_retro_action_item(
        &self,
        retro_id: &str,
        action_item_id: DbId,
        patch: Value,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::PATCH,
            format!("/retros/{retro_id}/action_items/{action_item_id}"),
            Some(patch),
            Self::retro_auth(token),
        )
        .await
    }

    pub async fn delete_retro_action_item(
        &self,
        retro_id: &str,
        action_item_id: DbId,
        token: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::DELETE,
            format!("/retros/{retro_id}/action_items/{action_item_id}"),
            None,
            Self::retro_auth(token),
        )
        .await
    }

    // -- Sessions / users ---------------------------------------------

    pub async fn create_session(&self, access_token: &str) -> Result<ApiResponse, TransportError> {
        self.send(
            reqwest::Method::POST,
            "/sessions".into(),
            Some(json!({ "access_token": access_token })),
            AuthScheme::None,
        )
        .await
    }

    pub async fn create_user(
        &self,
        access_token: &str,
        full_name: Option<&str>,
        company_name: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let body = json!({
            "access_token": access_token,
            "full_name": full_name,
            "company_name": company_name,
        });
        self.send(
            reqwest::Method::POST,
            "/users".into(),
            Some(body),
            AuthScheme::None,
        )
        .await
    }
}
