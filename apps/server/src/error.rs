use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cartera_broker::BrokerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadGateway(reason) => (StatusCode::BAD_GATEWAY, reason.clone()),
            ApiError::Internal(reason) => (StatusCode::INTERNAL_SERVER_ERROR, reason.clone()),
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Default mapping for the quote path. Login-style endpoints use their own
/// mapping since an unreachable upstream there is indistinguishable from
/// bad credentials. Upstream error detail is never echoed to the client.
impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::MissingCredentials => {
                ApiError::BadRequest("Brokerage credentials are not configured".to_string())
            }
            BrokerError::UpstreamAuth => {
                ApiError::Unauthorized("Upstream rejected the credentials".to_string())
            }
            BrokerError::SessionNotFound => {
                ApiError::Unauthorized("Session not found or expired".to_string())
            }
            BrokerError::UpstreamUnavailable(_) | BrokerError::Upstream(_) => {
                ApiError::BadGateway("Upstream brokerage unavailable".to_string())
            }
            BrokerError::QuoteUnavailable { .. } => ApiError::Internal(err.to_string()),
        }
    }
}
