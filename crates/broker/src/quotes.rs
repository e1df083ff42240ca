//! Quote fetching through an ordered chain of candidate upstream URLs.
//!
//! The public IOL quote paths are unstable: some instruments 500 on the
//! documented path, and some failure modes return HTTP 200 with an HTML
//! error page. The fetcher walks a candidate list and accepts the first
//! response that is both 200 and JSON; everything else is a soft failure
//! that moves on to the next candidate.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::errors::BrokerError;

/// Base URL of the IOL brokerage API.
pub const DEFAULT_QUOTE_BASE_URL: &str = "https://api.invertironline.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched quote plus the URL that produced it, kept for
/// observability of which candidate ended up working.
#[derive(Debug, Clone)]
pub struct QuoteResult {
    pub data: serde_json::Value,
    pub source_url: String,
}

/// Candidate request URLs for `symbol`, in the order they should be tried.
///
/// The list currently degenerates to two shapes of the same BCBA path, but
/// it stays list-based on purpose: upstream path instability has been an
/// ongoing concern and new shapes are a data change, not a code change.
/// The doubled slash in the first entry is intentional; it is the shape
/// observed to work across instrument types.
pub fn candidate_urls(base_url: &str, symbol: &str) -> Vec<String> {
    let symbol = symbol.trim().to_uppercase();
    vec![
        format!("{}//api/v2/BCBA/Titulos/{}/Cotizacion", base_url, symbol),
        format!("{}/api/v2/BCBA/Titulos/{}/Cotizacion", base_url, symbol),
    ]
}

/// Fallback-chain quote client.
pub struct QuoteFetcher {
    client: Client,
    base_url: String,
}

impl QuoteFetcher {
    pub fn new(base_url: String, accept_invalid_certs: bool) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url }
    }

    /// Fetch a quote for `symbol`, trying candidates until one yields a
    /// usable response. Fails with `QuoteUnavailable` naming the symbol
    /// once the chain is exhausted.
    pub async fn fetch_quote(
        &self,
        access_token: &str,
        instrument_type: &str,
        symbol: &str,
    ) -> Result<QuoteResult, BrokerError> {
        let normalized = symbol.trim().to_uppercase();
        debug!(tipo = %instrument_type, symbol = %normalized, "Fetching quote");

        let urls = candidate_urls(&self.base_url, &normalized);
        first_successful(&self.client, access_token, &urls)
            .await
            .ok_or(BrokerError::QuoteUnavailable { symbol: normalized })
    }
}

/// Walk `urls` in order and return the first acceptable response.
///
/// Acceptance is strictly "status 200 and a JSON content-type": a 5xx, any
/// transport error, or a 200 carrying HTML all count as soft failures and
/// the walk continues.
async fn first_successful(
    client: &Client,
    access_token: &str,
    urls: &[String],
) -> Option<QuoteResult> {
    for url in urls {
        let response = match client
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(%url, error = %e, "Candidate request failed, trying next");
                continue;
            }
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ctype| ctype.contains("application/json"))
            .unwrap_or(false);

        if status != StatusCode::OK || !is_json {
            debug!(%url, %status, is_json, "Candidate rejected, trying next");
            continue;
        }

        match response.json::<serde_json::Value>().await {
            Ok(data) => {
                return Some(QuoteResult {
                    data,
                    source_url: url.clone(),
                })
            }
            Err(e) => {
                debug!(%url, error = %e, "Candidate body unreadable, trying next");
                continue;
            }
        }
    }
    None
}
