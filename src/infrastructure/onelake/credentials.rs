//! Token acquisition for OneLake.
//!
//! Two strategies: an explicit service principal (tenant, client, secret) or
//! a default chain of ambient probes covering environment variables, the
//! IMDS managed-identity endpoint, and the az CLI. Each probe of the chain
//! can be excluded individually through [`DefaultCredentialOptions`].

use crate::domain::errors::{CopyError, Result};
use log::{debug, info};
use serde::Deserialize;
use std::process::Command;
use std::time::{Duration, Instant};

/// OAuth2 scope requested for storage tokens; OneLake accepts the Azure
/// Storage audience.
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
const STORAGE_RESOURCE: &str = "https://storage.azure.com";
const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Tokens are treated as expired this long before they actually are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(120);

/// A bearer token plus the moment it stops being usable.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    expires_at: Instant,
}

impl AccessToken {
    fn with_lifetime(token: String, lifetime_secs: u64) -> Self {
        let lifetime = Duration::from_secs(lifetime_secs).saturating_sub(EXPIRY_MARGIN);
        Self {
            token,
            expires_at: Instant::now() + lifetime,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Gates for the individual probes of the default credential chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCredentialOptions {
    pub exclude_environment: bool,
    pub exclude_managed_identity: bool,
    pub exclude_cli: bool,
    pub exclude_interactive: bool,
}

impl Default for DefaultCredentialOptions {
    /// Operational default: managed identity only.
    fn default() -> Self {
        Self {
            exclude_environment: true,
            exclude_managed_identity: false,
            exclude_cli: true,
            exclude_interactive: true,
        }
    }
}

impl DefaultCredentialOptions {
    /// Toggles the managed-identity probe. Excluding it re-enables the az
    /// CLI probe so a workstation run still has a working chain.
    pub fn excluding_managed_identity(exclude_managed_identity: bool) -> Self {
        let mut options = Self::default();
        options.exclude_managed_identity = exclude_managed_identity;
        if exclude_managed_identity {
            options.exclude_cli = false;
        }
        options
    }
}

/// The credential strategy a client authenticates with.
#[derive(Debug, Clone)]
pub enum TokenCredential {
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    Default(DefaultCredentialOptions),
}

impl TokenCredential {
    /// Picks the strategy. A complete tenant/client/secret triple selects
    /// the service principal; anything less falls back to the default chain.
    pub fn from_settings(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        options: DefaultCredentialOptions,
    ) -> Self {
        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                TokenCredential::ServicePrincipal {
                    tenant_id,
                    client_id,
                    client_secret,
                }
            }
            _ => TokenCredential::Default(options),
        }
    }

    /// Acquires a fresh bearer token.
    pub fn fetch_token(&self, http: &reqwest::blocking::Client) -> Result<AccessToken> {
        match self {
            TokenCredential::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => {
                info!("Using service principal credentials.");
                client_credentials_token(http, tenant_id, client_id, client_secret)
            }
            TokenCredential::Default(options) => {
                info!("Using default credential chain.");
                default_chain_token(http, options)
            }
        }
    }
}

/// OAuth2 client-credentials grant against the tenant's token endpoint.
fn client_credentials_token(
    http: &reqwest::blocking::Client,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AccessToken> {
    #[derive(Deserialize)]
    struct OAuthTokenResponse {
        access_token: String,
        expires_in: u64,
    }

    let url = format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        tenant_id
    );
    let response = http
        .post(&url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", STORAGE_SCOPE),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .map_err(|e| CopyError::CredentialError(format!("token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(CopyError::CredentialError(format!(
            "token request returned {}: {}",
            status,
            body.trim()
        )));
    }

    let token: OAuthTokenResponse = response
        .json()
        .map_err(|e| CopyError::CredentialError(format!("malformed token response: {}", e)))?;
    Ok(AccessToken::with_lifetime(
        token.access_token,
        token.expires_in,
    ))
}

/// Walks the enabled probes in order and returns the first token found.
fn default_chain_token(
    http: &reqwest::blocking::Client,
    options: &DefaultCredentialOptions,
) -> Result<AccessToken> {
    let mut failures = Vec::new();

    if !options.exclude_environment {
        match environment_token(http) {
            Ok(token) => return Ok(token),
            Err(reason) => {
                debug!("Environment credential unavailable: {}", reason);
                failures.push(format!("environment: {}", reason));
            }
        }
    }
    if !options.exclude_managed_identity {
        match managed_identity_token(http) {
            Ok(token) => return Ok(token),
            Err(reason) => {
                debug!("Managed identity unavailable: {}", reason);
                failures.push(format!("managed identity: {}", reason));
            }
        }
    }
    if !options.exclude_cli {
        match cli_token() {
            Ok(token) => return Ok(token),
            Err(reason) => {
                debug!("az CLI credential unavailable: {}", reason);
                failures.push(format!("az cli: {}", reason));
            }
        }
    }
    if !options.exclude_interactive {
        failures.push("interactive: browser-based sign-in is not supported".to_string());
    }

    Err(CopyError::CredentialError(format!(
        "no credential source available ({})",
        failures.join("; ")
    )))
}

fn environment_token(
    http: &reqwest::blocking::Client,
) -> std::result::Result<AccessToken, String> {
    let tenant_id =
        std::env::var("AZURE_TENANT_ID").map_err(|_| "AZURE_TENANT_ID not set".to_string())?;
    let client_id =
        std::env::var("AZURE_CLIENT_ID").map_err(|_| "AZURE_CLIENT_ID not set".to_string())?;
    let client_secret = std::env::var("AZURE_CLIENT_SECRET")
        .map_err(|_| "AZURE_CLIENT_SECRET not set".to_string())?;
    client_credentials_token(http, &tenant_id, &client_id, &client_secret)
        .map_err(|e| e.to_string())
}

fn managed_identity_token(
    http: &reqwest::blocking::Client,
) -> std::result::Result<AccessToken, String> {
    #[derive(Deserialize)]
    struct ImdsTokenResponse {
        access_token: String,
        // IMDS serializes numbers as strings.
        expires_in: String,
    }

    let response = http
        .get(IMDS_TOKEN_URL)
        .query(&[("api-version", "2018-02-01"), ("resource", STORAGE_RESOURCE)])
        .header("Metadata", "true")
        // The endpoint only exists on Azure hosts; keep the probe short.
        .timeout(Duration::from_secs(3))
        .send()
        .map_err(|e| format!("IMDS endpoint unreachable: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("IMDS returned {}", response.status()));
    }
    let token: ImdsTokenResponse = response
        .json()
        .map_err(|e| format!("malformed IMDS response: {}", e))?;
    let lifetime = token.expires_in.parse::<u64>().unwrap_or(3600);
    Ok(AccessToken::with_lifetime(token.access_token, lifetime))
}

fn cli_token() -> std::result::Result<AccessToken, String> {
    #[derive(Deserialize)]
    struct AzCliTokenResponse {
        #[serde(rename = "accessToken")]
        access_token: String,
        // Present on recent az versions as epoch seconds.
        #[serde(rename = "expires_on", default)]
        expires_on: Option<i64>,
    }

    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            STORAGE_RESOURCE,
            "--output",
            "json",
        ])
        .output()
        .map_err(|e| format!("failed to run az: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("az exited with {}: {}", output.status, stderr.trim()));
    }

    let token: AzCliTokenResponse = serde_json::from_slice(&output.stdout)
        .map_err(|e| format!("malformed az output: {}", e))?;
    let lifetime = token
        .expires_on
        .map(|epoch| epoch.saturating_sub(chrono::Utc::now().timestamp()).max(0) as u64)
        .unwrap_or(45 * 60);
    Ok(AccessToken::with_lifetime(token.access_token, lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_triple_selects_service_principal() {
        let credential = TokenCredential::from_settings(
            Some("tenant".into()),
            Some("client".into()),
            Some("secret".into()),
            DefaultCredentialOptions::default(),
        );
        assert!(matches!(
            credential,
            TokenCredential::ServicePrincipal { .. }
        ));
    }

    #[test]
    fn test_partial_triple_falls_back_to_default_chain() {
        let credential = TokenCredential::from_settings(
            Some("tenant".into()),
            Some("client".into()),
            None,
            DefaultCredentialOptions::default(),
        );
        assert!(matches!(credential, TokenCredential::Default(_)));
    }

    #[test]
    fn test_default_option_values() {
        let options = DefaultCredentialOptions::default();
        assert!(options.exclude_environment);
        assert!(!options.exclude_managed_identity);
        assert!(options.exclude_cli);
        assert!(options.exclude_interactive);
    }

    #[test]
    fn test_excluding_managed_identity_enables_cli() {
        let options = DefaultCredentialOptions::excluding_managed_identity(true);
        assert!(options.exclude_managed_identity);
        assert!(!options.exclude_cli);

        let unchanged = DefaultCredentialOptions::excluding_managed_identity(false);
        assert_eq!(unchanged, DefaultCredentialOptions::default());
    }

    #[test]
    fn test_fully_excluded_chain_errors_without_probing() {
        let options = DefaultCredentialOptions {
            exclude_environment: true,
            exclude_managed_identity: true,
            exclude_cli: true,
            exclude_interactive: true,
        };
        let credential = TokenCredential::Default(options);
        let http = reqwest::blocking::Client::new();

        let err = credential.fetch_token(&http).unwrap_err();
        assert!(matches!(err, CopyError::CredentialError(_)));
        assert!(err.to_string().contains("no credential source available"));
    }

    #[test]
    fn test_token_expiry_margin() {
        let token = AccessToken::with_lifetime("t".into(), 3600);
        assert!(!token.is_expired());

        // Lifetimes inside the refresh margin count as already expired.
        let short = AccessToken::with_lifetime("t".into(), 60);
        assert!(short.is_expired());
    }
}
