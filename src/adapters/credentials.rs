//! OAuth credentials for the Gmail transport.
//!
//! Two providers implement [`CredentialProvider`]:
//!
//! * [`StoredTokenProvider`] reads the persisted token file and refreshes it
//!   when it has expired. It never talks to the user, so it is what an
//!   unattended process runs with.
//! * [`InteractiveProvider`] runs the installed-app authorization flow: it
//!   serves the loopback redirect with a one-route axum app, asks the
//!   operator to open the consent URL and exchanges the returned code for a
//!   token.
//!
//! [`ChainedProvider`] tries the first and falls back to the second when the
//! stored token cannot be used at all.

use crate::core::CredentialProvider;
use crate::utils::error::{Result, WatchError};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// OAuth client registration as downloaded from the Google console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientConfig>,
    web: Option<ClientConfig>,
}

impl ClientConfig {
    /// 讀取 credentials.json (installed 或 web 類型)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            WatchError::auth(format!(
                "cannot read client secrets '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| WatchError::auth("client secrets must contain 'installed' or 'web'"))
    }
}

/// Persisted token, in the authorized-user layout Google's libraries use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => expiry - ChronoDuration::seconds(EXPIRY_SKEW_SECONDS) > now,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response
            .expires_in
            .map(|secs| now + ChronoDuration::seconds(secs));
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Reads and writes the token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file counts as "no token".
    pub fn load(&self) -> Option<StoredToken> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read token file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("Ignoring malformed token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!("Token saved to {}", self.path.display());
        Ok(())
    }
}

async fn request_token(client: &Client, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let response = client.post(token_uri).form(form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WatchError::auth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body
        )));
    }
    Ok(response.json().await?)
}

/// Exchange the refresh token for a new access token.
pub async fn refresh_token(client: &Client, token: &StoredToken) -> Result<StoredToken> {
    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| WatchError::auth("token has no refresh_token"))?;

    let response = request_token(
        client,
        &token.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
        ],
    )
    .await?;

    let mut refreshed = token.clone();
    refreshed.apply(response, Utc::now());
    Ok(refreshed)
}

/// Unattended provider: stored token, refreshed when needed.
pub struct StoredTokenProvider {
    store: TokenStore,
    client: Client,
}

impl StoredTokenProvider {
    pub fn new(store: TokenStore, client: Client) -> Self {
        Self { store, client }
    }
}

#[async_trait]
impl CredentialProvider for StoredTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let token = self.store.load().ok_or_else(|| WatchError::AuthorizationRequired {
            message: format!("no token at {}", self.store.path().display()),
        })?;

        if token.is_valid_at(Utc::now()) {
            if let Some(access) = token.token {
                return Ok(access);
            }
        }

        if !token.can_refresh() {
            return Err(WatchError::AuthorizationRequired {
                message: "token expired and cannot be refreshed".to_string(),
            });
        }

        tracing::info!("Access token expired, refreshing");
        let refreshed = refresh_token(&self.client, &token).await?;
        self.store.save(&refreshed)?;
        refreshed
            .token
            .ok_or_else(|| WatchError::auth("token endpoint returned no access token"))
    }
}

/// A started authorization flow waiting for the browser redirect.
pub struct PendingAuthorization {
    listener: TcpListener,
    pub redirect_uri: String,
    pub authorize_url: Url,
    state: String,
}

/// Interactive installed-app flow over a loopback redirect.
pub struct InteractiveProvider {
    secrets_path: PathBuf,
    store: TokenStore,
    client: Client,
    scopes: Vec<String>,
}

impl InteractiveProvider {
    pub fn new(secrets_path: PathBuf, store: TokenStore, client: Client) -> Self {
        Self {
            secrets_path,
            store,
            client,
            scopes: vec![GMAIL_SEND_SCOPE.to_string()],
        }
    }

    /// Bind the loopback listener and build the consent URL.
    pub async fn begin(&self, secrets: &ClientConfig) -> Result<PendingAuthorization> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let state = uuid::Uuid::new_v4().simple().to_string();

        let mut authorize_url = Url::parse(&secrets.auth_uri)?;
        authorize_url
            .query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", secrets.client_id.as_str())
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(PendingAuthorization {
            listener,
            redirect_uri,
            authorize_url,
            state,
        })
    }

    /// Wait for the redirect, exchange the code and persist the token.
    pub async fn complete(
        &self,
        secrets: &ClientConfig,
        pending: PendingAuthorization,
    ) -> Result<StoredToken> {
        let PendingAuthorization {
            listener,
            redirect_uri,
            state,
            ..
        } = pending;
        let code = wait_for_code(listener, &state).await?;

        let response = request_token(
            &self.client,
            &secrets.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
            ],
        )
        .await?;

        let mut token = StoredToken {
            token: None,
            refresh_token: None,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: self.scopes.clone(),
            expiry: None,
        };
        token.apply(response, Utc::now());
        self.store.save(&token)?;
        Ok(token)
    }
}

#[async_trait]
impl CredentialProvider for InteractiveProvider {
    async fn access_token(&self) -> Result<String> {
        let secrets = ClientConfig::from_file(&self.secrets_path)?;
        let pending = self.begin(&secrets).await?;

        tracing::info!(
            "Please visit this URL to authorize this application: {}",
            pending.authorize_url
        );
        println!(
            "🔑 Please visit this URL to authorize this application:\n{}",
            pending.authorize_url
        );

        let token = self.complete(&secrets, pending).await?;
        tracing::info!("✅ Authorization complete, token saved to {}", self.store.path().display());
        token
            .token
            .ok_or_else(|| WatchError::auth("token endpoint returned no access token"))
    }
}

/// Try `primary`; only when it says authorization is required, use `fallback`.
pub struct ChainedProvider<A: CredentialProvider, B: CredentialProvider> {
    primary: A,
    fallback: B,
}

impl<A: CredentialProvider, B: CredentialProvider> ChainedProvider<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<A: CredentialProvider, B: CredentialProvider> CredentialProvider for ChainedProvider<A, B> {
    async fn access_token(&self) -> Result<String> {
        match self.primary.access_token().await {
            Err(WatchError::AuthorizationRequired { message }) => {
                tracing::warn!("Stored credentials unusable ({}), starting authorization", message);
                self.fallback.access_token().await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<T: CredentialProvider + ?Sized> CredentialProvider for Box<T> {
    async fn access_token(&self) -> Result<String> {
        (**self).access_token().await
    }
}

/// Query string Google appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    result_tx: Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>,
}

/// Serve the loopback redirect until `GET /` arrives, then shut down.
///
/// Anything else (`/favicon.ico` and friends) gets a 404 and leaves the
/// flow waiting.
async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Result<String> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let state = CallbackState {
        expected_state: Arc::from(expected_state),
        result_tx: Arc::new(Mutex::new(Some(result_tx))),
    };
    let app = Router::new()
        .route("/", get(authorization_callback))
        .with_state(state);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            })
            .await
    });

    let result = result_rx
        .await
        .map_err(|_| WatchError::auth("authorization listener stopped before the redirect"));

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Err(e)) => tracing::warn!("Authorization listener error: {}", e),
        Err(e) => tracing::warn!("Authorization listener task failed: {}", e),
        Ok(Ok(())) => tracing::debug!("Authorization listener closed"),
    }

    result?
}

async fn authorization_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let result = check_callback(&params, &state.expected_state);
    let reply = match &result {
        Ok(_) => (
            StatusCode::OK,
            "The authentication flow has completed. You may close this window.",
        ),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            "Authorization failed. Check the menu-watch log for details.",
        ),
    };

    let sender = state.result_tx.lock().ok().and_then(|mut slot| slot.take());
    match sender {
        Some(tx) => {
            let _ = tx.send(result);
            reply
        }
        None => (StatusCode::GONE, "Authorization already handled."),
    }
}

/// Validate the redirect parameters and pull out the authorization code.
pub fn check_callback(params: &CallbackParams, expected_state: &str) -> Result<String> {
    if let Some(error) = &params.error {
        return Err(WatchError::auth(format!("authorization denied: {}", error)));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(WatchError::auth("authorization state mismatch"));
    }
    params
        .code
        .clone()
        .ok_or_else(|| WatchError::auth("authorization callback carried no code"))
}
