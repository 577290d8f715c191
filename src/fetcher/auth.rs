//! OAuth2 password-grant authentication
//!
//! Exchanges the account credentials from the secrets file for an access
//! token. Token refresh and session storage are not needed for a single
//! export run.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fetcher::{FetcherError, FetcherResult};

/// Account credentials, as stored in `secrets.json`
#[derive(Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Credentials {
    /// API client ID
    pub client_id: String,
    /// API client secret
    pub client_secret: String,
    /// Account login, also used as the export directory name
    pub username: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token for API calls and download links
    pub access_token: String,
    /// Refresh token (unused by a single export run)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

impl<'a> From<&'a Credentials> for PasswordGrant<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            grant_type: "password",
            username: &credentials.username,
            password: &credentials.password,
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
        }
    }
}

/// Authenticate with the password grant
///
/// # Arguments
/// * `client` - HTTP client
/// * `base_url` - API base URL; the token endpoint is `<base_url>/oauth/token`
/// * `credentials` - Account credentials
///
/// # Errors
/// Returns [`FetcherError::AuthError`] when the server rejects the credentials
pub async fn authenticate(
    client: &Client,
    base_url: &str,
    credentials: &Credentials,
) -> FetcherResult<AccessToken> {
    let url = format!("{}/oauth/token", base_url.trim_end_matches('/'));
    debug!(%url, username = %credentials.username, "Requesting access token");

    let response = client
        .post(&url)
        .form(&PasswordGrant::from(credentials))
        .send()
        .await
        .map_err(|e| FetcherError::NetworkError(format!("POST {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(FetcherError::AuthError(format!(
            "token request for {} returned {status}: {body}",
            credentials.username
        )));
    }

    let token = response
        .json::<AccessToken>()
        .await
        .map_err(|e| FetcherError::ParseError(format!("Failed to parse token response: {e}")))?;

    info!(username = %credentials.username, "Authenticated");
    Ok(token)
}
