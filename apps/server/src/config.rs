use std::{net::SocketAddr, time::Duration};

use cartera_broker::{Credentials, DEFAULT_QUOTE_BASE_URL, DEFAULT_TOKEN_URL};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Front-end bundle to serve, when the server also hosts the dashboard.
    pub static_dir: Option<String>,
    pub token_url: String,
    pub quote_base_url: String,
    /// Relax upstream TLS verification (development only).
    pub accept_invalid_certs: bool,
    /// Operator credentials for the no-session quote path.
    pub fallback_credentials: Option<Credentials>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("CARTERA_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:4000".to_string())
            .parse()
            .expect("Invalid CARTERA_LISTEN_ADDR");
        let cors_allow = std::env::var("CARTERA_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("CARTERA_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);
        let static_dir = std::env::var("CARTERA_STATIC_DIR")
            .ok()
            .filter(|s| !s.is_empty());
        let token_url =
            std::env::var("IOL_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string());
        let quote_base_url = std::env::var("IOL_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_QUOTE_BASE_URL.to_string());
        let accept_invalid_certs = std::env::var("IOL_ACCEPT_INVALID_CERTS")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let fallback_credentials = match (std::env::var("IOL_USER"), std::env::var("IOL_PASS")) {
            (Ok(user), Ok(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Credentials::new(user, pass))
            }
            _ => None,
        };
        Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            static_dir,
            token_url,
            quote_base_url,
            accept_invalid_certs,
            fallback_credentials,
        }
    }
}
