//! Error types for the broker crate.

use thiserror::Error;

/// Errors that can occur while proxying the upstream brokerage API.
///
/// Raw transport errors never cross the HTTP boundary: every upstream
/// failure is translated into one of these variants at the component that
/// observed it, and the server maps each variant to a status code.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// No username/password available from any source (request or env).
    /// Checked before any network call is attempted.
    #[error("No brokerage credentials available")]
    MissingCredentials,

    /// The upstream explicitly rejected the credentials (4xx on the token
    /// endpoint). The caller must re-authenticate; retrying won't help.
    #[error("Upstream rejected the credentials")]
    UpstreamAuth,

    /// Network-level failure (timeout, DNS, connection reset) talking to
    /// the upstream token endpoint.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnavailable(#[from] reqwest::Error),

    /// The upstream answered but with something unusable (5xx on the token
    /// endpoint, or a body that doesn't parse as a token grant).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Unknown or already-evicted session handle. Indistinguishable from a
    /// handle that never existed.
    #[error("Session not found")]
    SessionNotFound,

    /// Every candidate URL was exhausted without a usable response.
    #[error("No quote available for {symbol}")]
    QuoteUnavailable {
        /// The normalized symbol the quote was requested for
        symbol: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_unavailable_names_symbol() {
        let error = BrokerError::QuoteUnavailable {
            symbol: "GGAL".to_string(),
        };
        assert_eq!(format!("{}", error), "No quote available for GGAL");
    }

    #[test]
    fn test_missing_credentials_display() {
        let error = BrokerError::MissingCredentials;
        assert_eq!(format!("{}", error), "No brokerage credentials available");
    }
}
