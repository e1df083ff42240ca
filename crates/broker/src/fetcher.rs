//! Credential exchange against the upstream password-grant token endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::clock::Clock;
use crate::errors::BrokerError;
use crate::token::{AccessToken, Credentials};

/// Token endpoint of the IOL brokerage API.
pub const DEFAULT_TOKEN_URL: &str = "https://api.invertironline.com/token";

/// Upstream calls are bounded; a hung token exchange surfaces as
/// `UpstreamUnavailable` instead of stalling the caller.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire shape of a successful password grant.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: i64,
}

/// Exchanges a credential pair for an upstream access token.
///
/// Implementations do not cache and do not retry: caching belongs to the
/// session store and the fallback slot, retry policy to the caller.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self, credentials: &Credentials) -> Result<AccessToken, BrokerError>;
}

/// `TokenFetcher` backed by the real IOL token endpoint.
pub struct IolTokenFetcher {
    client: Client,
    token_url: String,
    clock: Arc<dyn Clock>,
}

impl IolTokenFetcher {
    /// Create a fetcher against `token_url`.
    ///
    /// `accept_invalid_certs` relaxes TLS verification for development
    /// setups behind intercepting proxies; leave it off in production.
    pub fn new(token_url: String, accept_invalid_certs: bool, clock: Arc<dyn Clock>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            token_url,
            clock,
        }
    }
}

#[async_trait]
impl TokenFetcher for IolTokenFetcher {
    async fn fetch_token(&self, credentials: &Credentials) -> Result<AccessToken, BrokerError> {
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password()),
            ("grant_type", "password"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(BrokerError::UpstreamUnavailable)?;

        let status = response.status();
        if status.is_client_error() {
            debug!(%status, "Token endpoint rejected credentials");
            return Err(BrokerError::UpstreamAuth);
        }
        if !status.is_success() {
            return Err(BrokerError::Upstream(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| BrokerError::Upstream(format!("Failed to parse token grant: {}", e)))?;

        Ok(AccessToken {
            access_token: grant.access_token,
            expires_in_secs: grant.expires_in,
            obtained_at: self.clock.now(),
        })
    }
}
