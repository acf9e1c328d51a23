//! OAuth 2.0 plumbing for the Drive API.
//!
//! Reads the installed-app client secret, caches the user token on disk
//! and hands out requests carrying a fresh bearer token.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DriveError, Result};

/// Read-only access to file content and metadata
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Tokens are refreshed this long before they actually expire
const EXPIRY_SLACK_SECS: i64 = 10;

/// OAuth client registration, as found in `credentials.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Parse a client secret file with either an `installed` or `web` section
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialsFile =
            serde_json::from_str(json).map_err(|e| DriveError::InvalidConfig {
                message: format!("Unable to parse client secret: {e}"),
            })?;

        file.installed
            .or(file.web)
            .ok_or_else(|| DriveError::InvalidConfig {
                message: "Client secret has neither an `installed` nor a `web` section".to_string(),
            })
    }

    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("urn:ietf:wg:oauth:2.0:oob")
    }
}

/// A user access token, in the layout written to `token.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&json)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    /// Whether the access token can still be used at `now`
    ///
    /// A missing expiry, or the zero timestamp some writers emit for it,
    /// means the token never expires.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) if expiry.timestamp() > 0 => {
                expiry - Duration::seconds(EXPIRY_SLACK_SECS) > now
            }
            _ => true,
        }
    }
}

/// Token endpoint reply for both the code and refresh grants
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            // Refresh replies usually omit the refresh token
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

/// URL the user opens to grant read-only Drive access
pub fn authorization_url(secret: &ClientSecret) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", secret.redirect_uri()),
            ("response_type", "code"),
            ("scope", DRIVE_READONLY_SCOPE),
            ("access_type", "offline"),
            ("state", "state-token"),
        ],
    )
    .map_err(|e| DriveError::InvalidConfig {
        message: format!("Invalid auth_uri {}: {e}", secret.auth_uri),
    })?;
    Ok(url.to_string())
}

async fn request_token(
    http: &Client,
    secret: &ClientSecret,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = http.post(&secret.token_uri).form(form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DriveError::Auth {
            message: format!("Token endpoint returned {status}: {body}"),
        });
    }
    Ok(response.json().await?)
}

/// Trade an authorization code for a token
pub async fn exchange_code(http: &Client, secret: &ClientSecret, code: &str) -> Result<Token> {
    let response = request_token(
        http,
        secret,
        &[
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", secret.redirect_uri()),
        ],
    )
    .await?;
    Ok(response.into_token(None))
}

/// Load the cached token, or walk the user through the consent screen
///
/// A newly obtained token is written to `token_path`.
pub async fn obtain_token(
    http: &Client,
    secret: &ClientSecret,
    token_path: &Path,
) -> Result<Token> {
    match Token::load(token_path).await {
        Ok(token) => {
            debug!(path = %token_path.display(), "using cached token");
            return Ok(token);
        }
        Err(e) => debug!(path = %token_path.display(), error = %e, "no usable cached token"),
    }

    println!(
        "Go to the following link in your browser then type the authorization code:\n{}",
        authorization_url(secret)?
    );

    let mut code = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut code)
        .await?;
    if code.trim().is_empty() {
        return Err(DriveError::Auth {
            message: "No authorization code entered".to_string(),
        });
    }

    let token = exchange_code(http, secret, &code).await?;
    token.save(token_path).await?;
    info!(path = %token_path.display(), "saved new token");
    Ok(token)
}

/// HTTP client that signs every request with a valid access token
pub struct AuthorizedClient {
    http: Client,
    secret: ClientSecret,
    token: Mutex<Token>,
    token_path: Option<PathBuf>,
}

impl AuthorizedClient {
    pub fn new(http: Client, secret: ClientSecret, token: Token) -> Self {
        Self {
            http,
            secret,
            token: Mutex::new(token),
            token_path: None,
        }
    }

    /// Persist refreshed tokens to `path`
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Current access token, refreshed first if it is stale
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.is_fresh(Utc::now()) {
            return Ok(token.access_token.clone());
        }

        let refresh_token = token.refresh_token.clone().ok_or_else(|| DriveError::Auth {
            message: "Access token expired and no refresh token is available".to_string(),
        })?;

        debug!("refreshing access token");
        let response = request_token(
            &self.http,
            &self.secret,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
            ],
        )
        .await?;
        *token = response.into_token(Some(refresh_token));

        if let Some(path) = &self.token_path {
            token.save(path).await?;
        }
        Ok(token.access_token.clone())
    }

    /// Start a GET request carrying the bearer token
    pub async fn get(&self, url: &str) -> Result<RequestBuilder> {
        let access_token = self.access_token().await?;
        Ok(self.http.get(url).bearer_auth(access_token))
    }
}
