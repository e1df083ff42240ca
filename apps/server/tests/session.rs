use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use cartera_server::{api::app_router, build_state, config::Config};
use cartera_broker::Credentials;
use serde_json::json;
use tower::ServiceExt;

/// Stub of the upstream brokerage: a password-grant token endpoint that
/// only accepts the password "p", and a quote endpoint for any symbol.
async fn spawn_stub_upstream() -> String {
    let app = Router::new()
        .route(
            "/token",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                if form.get("grant_type").map(String::as_str) == Some("password")
                    && form.get("password").map(String::as_str) == Some("p")
                {
                    Json(json!({"access_token": "tok1", "expires_in": 3600})).into_response()
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": "invalid_grant"})),
                    )
                        .into_response()
                }
            }),
        )
        .route(
            "/api/v2/BCBA/Titulos/{symbol}/Cotizacion",
            get(|| async { Json(json!({"ultimoPrecio": 500})) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn test_config(upstream: &str, fallback_credentials: Option<Credentials>) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(5),
        static_dir: None,
        token_url: format!("{}/token", upstream),
        quote_base_url: upstream.to_string(),
        accept_invalid_certs: false,
        fallback_credentials,
    }
}

async fn build_test_router(fallback_credentials: Option<Credentials>) -> axum::Router {
    let upstream = spawn_stub_upstream().await;
    let config = test_config(&upstream, fallback_credentials);
    app_router(build_state(&config), &config)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = build_test_router(None).await;

    // Login with valid credentials yields a session handle
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/iol/login",
            json!({"username": "u", "password": "p"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let login = json_body(response).await;
    assert_eq!(login["success"], true);
    assert_eq!(login["expiresIn"], 24 * 60 * 60);
    let session_token = login["sessionToken"].as_str().unwrap().to_string();
    assert_eq!(session_token.len(), 64);

    // Session status reflects the fresh session
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/iol/session")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let status = json_body(response).await;
    assert_eq!(status["valid"], true);
    assert_eq!(status["hasIolToken"], true);

    // Quote with the session handle
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/iol/quote/acciones/GGAL")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let quote = json_body(response).await;
    assert_eq!(quote["data"]["ultimoPrecio"], 500);
    assert!(quote["meta"]["url"]
        .as_str()
        .unwrap()
        .ends_with("/api/v2/BCBA/Titulos/GGAL/Cotizacion"));

    // Logout revokes the session
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/iol/logout")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Repeated logout: the handle is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/iol/logout")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Quote with the revoked handle
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/iol/quote/acciones/GGAL")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Session status is a plain "valid: false", never an error
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/iol/session")
                .header("x-session-token", &session_token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let status = json_body(response).await;
    assert_eq!(status["valid"], false);
}

#[tokio::test]
async fn login_validates_input_and_credentials() {
    let app = build_test_router(None).await;

    // Missing password
    let response = app
        .clone()
        .oneshot(post_json("/api/iol/login", json!({"username": "u"})))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Upstream rejects the credentials; no session is created
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/iol/login",
            json!({"username": "u", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Credential check endpoint mirrors the same behavior without a session
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/iol/test-credentials",
            json!({"username": "u", "password": "p"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(json_body(response).await["success"], true);

    let response = app
        .oneshot(post_json(
            "/api/iol/test-credentials",
            json!({"username": "u", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn quote_without_session_requires_env_credentials() {
    // No fallback credentials configured: fail fast with 400
    let app = build_test_router(None).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/iol/quote/acciones/GGAL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // With operator credentials the no-session path works
    let app = build_test_router(Some(Credentials::new("env-user", "p"))).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/iol/quote/acciones/GGAL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let quote = json_body(response).await;
    assert_eq!(quote["data"]["ultimoPrecio"], 500);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_test_router(None).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}
