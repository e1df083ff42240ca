use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use cartera_broker::{BrokerError, Credentials, SESSION_TTL_SECS};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// Header carrying the opaque session handle.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Deserialize)]
struct CredentialsRequest {
    username: Option<String>,
    password: Option<String>,
}

impl CredentialsRequest {
    fn into_credentials(self) -> ApiResult<Credentials> {
        match (self.username, self.password) {
            (Some(username), Some(password))
                if !username.trim().is_empty() && !password.is_empty() =>
            {
                Ok(Credentials::new(username, password))
            }
            _ => Err(ApiError::BadRequest(
                "Username and password are required".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    session_token: String,
    expires_in: i64,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_iol_token: Option<bool>,
}

#[derive(Serialize)]
struct QuoteMeta {
    url: String,
}

#[derive(Serialize)]
struct QuoteResponse {
    data: serde_json::Value,
    meta: QuoteMeta,
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Login failures collapse to a generic 401: the upstream being down is
/// indistinguishable from bad credentials from the client's point of view,
/// and upstream error detail must not leak account state.
fn login_rejection(err: BrokerError) -> ApiError {
    match err {
        BrokerError::MissingCredentials => ApiError::BadRequest(err.to_string()),
        _ => ApiError::Unauthorized(
            "Invalid credentials or upstream connection error".to_string(),
        ),
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let credentials = payload.into_credentials()?;
    let session_token = state
        .sessions
        .create_session(credentials)
        .await
        .map_err(login_rejection)?;
    Ok(Json(LoginResponse {
        success: true,
        session_token,
        expires_in: SESSION_TTL_SECS,
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SuccessResponse>> {
    let session_token = session_header(&headers).ok_or(ApiError::NotFound)?;
    if state.sessions.destroy_session(&session_token) {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(ApiError::NotFound)
    }
}

/// Always 200; an absent or expired session is reported as `valid: false`.
async fn session_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<SessionStatusResponse> {
    let status = session_header(&headers).map(|token| state.sessions.check_session(&token));
    match status {
        Some(status) if status.valid => Json(SessionStatusResponse {
            valid: true,
            expires_in: Some(status.remaining_secs),
            has_iol_token: Some(status.has_token),
        }),
        _ => Json(SessionStatusResponse {
            valid: false,
            expires_in: None,
            has_iol_token: None,
        }),
    }
}

/// Validate credentials against upstream without creating a session.
async fn test_credentials(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let credentials = payload.into_credentials()?;
    state
        .token_fetcher
        .fetch_token(&credentials)
        .await
        .map_err(login_rejection)?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Path((tipo, simbolo)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<QuoteResponse>> {
    if simbolo.trim().is_empty() {
        return Err(ApiError::BadRequest("Symbol is required".to_string()));
    }

    let access_token = match session_header(&headers) {
        Some(session_token) => state.sessions.get_token(&session_token).await?,
        None => state.fallback.get_token().await?,
    };

    let result = state.quotes.fetch_quote(&access_token, &tipo, &simbolo).await?;
    Ok(Json(QuoteResponse {
        data: result.data,
        meta: QuoteMeta {
            url: result.source_url,
        },
    }))
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .map(|o| o.parse().unwrap())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api = Router::new()
        .route("/health", get(health))
        .route("/iol/login", post(login))
        .route("/iol/logout", post(logout))
        .route("/iol/session", get(session_status))
        .route("/iol/test-credentials", post(test_credentials))
        .route("/iol/quote/{tipo}/{simbolo}", get(quote));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
