//! HTTP client for the matrix backend.
//!
//! Every authenticated call reads the stored session and sends its token as
//! a bearer header. A `401` on such a call means the token is no longer
//! accepted: the session file is removed and [`Error::Unauthorized`] is
//! returned so the caller can ask the user to log in again.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::accounts::{Credentials, Registration, TokenResponse, User};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{Session, SessionStore};
use crate::store::{Collection, MatrixPayload, MatrixRecord, MatrixStore, Page};

/// Client for the matrix backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    sessions: SessionStore,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        sessions: SessionStore,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sessions,
        })
    }

    /// Create a client from the `api` and `storage` configuration sections.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api.base_url.as_str(),
            Duration::from_secs(config.api.timeout_secs),
            SessionStore::new(config.session_path()),
        )
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "request");
        self.http.request(method, url)
    }

    /// Send an authenticated request and check its status.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let session = self.sessions.require()?;
        let response = request
            .header(AUTHORIZATION, session.bearer())
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(user = %session.user.username, "token rejected, clearing session");
            self.sessions.clear()?;
            return Err(Error::Unauthorized);
        }
        check(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request).await?.json().await?)
    }

    fn require_admin(&self, action: &str) -> Result<()> {
        if self.sessions.require()?.user.role.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden(format!("only administrators can {action}")))
        }
    }

    // === Authentication ===

    /// Log in and store the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend's message when the
    /// credentials are rejected, or a transport error.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .request(Method::POST, "/auth/login")
            .json(&credentials)
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;

        let session = Session {
            token: token.access_token,
            user: token.user,
        };
        self.sessions.save(&session)?;
        info!(user = %session.user.username, role = %session.user.role, "logged in");
        Ok(session)
    }

    /// Forget the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be removed.
    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()?;
        info!("logged out");
        Ok(())
    }

    /// The logged-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be read.
    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.sessions.load()?.map(|s| s.user))
    }

    // === Users ===

    /// Register a new account. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for non-administrators,
    /// [`Error::Validation`] for an invalid form, or the backend's error
    /// (for example when the username or email is taken).
    pub async fn register(&self, registration: Registration) -> Result<User> {
        self.require_admin("register users")?;
        let new_user = registration.validate()?;
        let user: User = self
            .send_json(self.request(Method::POST, "/auth/register").json(&new_user))
            .await?;
        info!(user = %user.username, role = %user.role, "registered user");
        Ok(user)
    }

    /// List accounts. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for non-administrators or the backend's
    /// error.
    pub async fn list_users(&self, page: Page) -> Result<Vec<User>> {
        self.require_admin("list users")?;
        self.send_json(paged(self.request(Method::GET, "/users"), page))
            .await
    }

    /// Delete an account. Administrators only; the backend refuses to
    /// delete the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for non-administrators or the backend's
    /// error.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.require_admin("delete users")?;
        self.send(self.request(Method::DELETE, &format!("/users/{id}")))
            .await?;
        info!(user = id, "deleted user");
        Ok(())
    }

    // === Export ===

    /// Download the spreadsheet rendering of a modular matrix.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or a transport error.
    pub async fn export_matrix(&self, id: i64) -> Result<Vec<u8>> {
        let path = format!("{}/{id}/export", Collection::Modular.path());
        let bytes = self.send(self.request(Method::GET, &path)).await?.bytes().await?;
        info!(matrix = id, size = bytes.len(), "exported matrix");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MatrixStore for ApiClient {
    async fn list(&self, collection: Collection, page: Page) -> Result<Vec<MatrixRecord>> {
        self.send_json(paged(self.request(Method::GET, collection.path()), page))
            .await
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<MatrixRecord> {
        let path = format!("{}/{id}", collection.path());
        not_found(self.send_json(self.request(Method::GET, &path)).await, id)
    }

    async fn create(
        &self,
        collection: Collection,
        payload: &MatrixPayload,
    ) -> Result<MatrixRecord> {
        self.send_json(self.request(Method::POST, collection.path()).json(payload))
            .await
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        payload: &MatrixPayload,
    ) -> Result<MatrixRecord> {
        let path = format!("{}/{id}", collection.path());
        not_found(
            self.send_json(self.request(Method::PUT, &path).json(payload))
                .await,
            id,
        )
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<()> {
        let path = format!("{}/{id}", collection.path());
        not_found(self.send(self.request(Method::DELETE, &path)).await, id)?;
        info!(%collection, matrix = id, "deleted matrix");
        Ok(())
    }
}

fn paged(request: RequestBuilder, page: Page) -> RequestBuilder {
    request.query(&[("skip", page.skip), ("limit", page.limit)])
}

/// Map a backend 404 on a single record to [`Error::NotFound`].
fn not_found<T>(result: Result<T>, id: i64) -> Result<T> {
    match result {
        Err(Error::Api { status: 404, .. }) => Err(Error::NotFound { what: "matrix", id }),
        other => other,
    }
}

/// Turn a non-success response into [`Error::Api`] carrying the backend's
/// `detail` message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(status, &body);
    debug!(status = status.as_u16(), %detail, "backend error");
    Err(Error::api(status.as_u16(), detail))
}

fn error_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
