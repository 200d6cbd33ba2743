//! Credential loading and access-token minting for the Google APIs.
//!
//! Credentials come from the `GOOGLE_CREDENTIALS_JSON` environment variable
//! when set, otherwise from a JSON file on disk. They are read on first use,
//! not at startup, so a missing file only fails store-touching requests.

use crate::error::{StoreError, StoreResult};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Environment variable holding the credential blob.
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDENTIALS_JSON";

/// OAuth token endpoint used for refresh-token exchange.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested for service-account tokens.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for a signed assertion. Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Parsed credential blob.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// A pre-minted bearer token.
    AccessToken(String),
    /// An OAuth client plus refresh token.
    AuthorizedUser(AuthorizedUser),
    /// A service-account key, exchanged through a signed JWT assertion.
    ServiceAccount(ServiceAccount),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccount {
    /// Sign the RS256 assertion presented to the token endpoint.
    fn assertion(&self, now: u64) -> StoreResult<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| StoreError::Config(format!("invalid service account private key: {e}")))?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES.join(" "),
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| StoreError::Auth(format!("failed to sign token assertion: {e}")))
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credentials {
    /// Parse a credential blob.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` for unsupported or incomplete blobs.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let value: JsonValue = serde_json::from_str(raw)
            .map_err(|e| StoreError::Config(format!("credentials are not valid JSON: {e}")))?;

        if let Some(token) = value.get("access_token").and_then(JsonValue::as_str) {
            return Ok(Credentials::AccessToken(token.to_string()));
        }

        match value.get("type").and_then(JsonValue::as_str) {
            Some("authorized_user") => serde_json::from_value(value)
                .map(Credentials::AuthorizedUser)
                .map_err(|e| StoreError::Config(format!("incomplete authorized_user credentials: {e}"))),
            Some("service_account") => serde_json::from_value(value)
                .map(Credentials::ServiceAccount)
                .map_err(|e| StoreError::Config(format!("incomplete service_account credentials: {e}"))),
            other => Err(StoreError::Config(format!(
                "unrecognized credential type: {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }

    /// Resolve credentials from an optional inline blob, falling back to a file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` when neither source is available.
    pub fn resolve(inline: Option<&str>, file: &Path) -> StoreResult<Self> {
        if let Some(raw) = inline.filter(|raw| !raw.trim().is_empty()) {
            return Self::from_json(raw);
        }
        if file.exists() {
            let raw = std::fs::read_to_string(file)?;
            return Self::from_json(&raw);
        }
        Err(StoreError::Config(format!(
            "no credentials found: set {CREDENTIALS_ENV} or provide {}",
            file.display()
        )))
    }
}

/// Where to look for credentials.
#[derive(Debug, Clone)]
pub struct CredentialSource {
    pub inline: Option<String>,
    pub file: PathBuf,
}

impl CredentialSource {
    /// Source reading the environment variable, then `file`.
    pub fn from_env(file: impl Into<PathBuf>) -> Self {
        Self {
            inline: std::env::var(CREDENTIALS_ENV).ok(),
            file: file.into(),
        }
    }

    pub fn load(&self) -> StoreResult<Credentials> {
        Credentials::resolve(self.inline.as_deref(), &self.file)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + EXPIRY_MARGIN < at,
            None => true,
        }
    }
}

/// Hands out bearer tokens, refreshing them when needed.
pub struct TokenProvider {
    source: CredentialSource,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(source: CredentialSource, client: Client) -> Self {
        Self {
            source,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` when credentials are missing and
    /// `StoreError::Auth` when the token exchange is rejected.
    pub async fn token(&self) -> StoreResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }

        let fresh = match self.source.load()? {
            Credentials::AccessToken(token) => CachedToken {
                token,
                expires_at: None,
            },
            Credentials::AuthorizedUser(user) => {
                tracing::debug!(token_uri = %user.token_uri, "refreshing access token");
                let form = [
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ];
                self.exchange(&user.token_uri, &form).await?
            }
            Credentials::ServiceAccount(account) => {
                tracing::debug!(account = %account.client_email, "minting service account token");
                let assertion = account.assertion(jsonwebtoken::get_current_timestamp())?;
                let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
                self.exchange(&account.token_uri, &form).await?
            }
        };
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self, token_uri: &str, form: &[(&str, &str)]) -> StoreResult<CachedToken> {
        let response = self.client.post(token_uri).form(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: parsed
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}
