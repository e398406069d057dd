// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared fixtures: a local stand-in for the form-delivery API and router
//! helpers.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use contact_relay::{
    config::Config,
    handlers::{router, AppState},
    limiter::ManualClock,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// A request as seen by the fake delivery endpoint.
#[derive(Debug, Clone)]
pub struct Received {
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    received: Arc<Mutex<Vec<Received>>>,
}

/// Running fake delivery endpoint.
pub struct Upstream {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl Upstream {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn upstream_handler(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.received.lock().unwrap().push(Received {
        content_type: header_string(&headers, header::CONTENT_TYPE),
        accept: header_string(&headers, header::ACCEPT),
        user_agent: header_string(&headers, header::USER_AGENT),
        body,
    });
    (state.status, Json(state.reply.clone()))
}

/// Start a fake delivery endpoint answering every POST with `status`/`reply`.
pub async fn spawn_upstream(status: StatusCode, reply: Value) -> Upstream {
    spawn_slow_upstream(status, reply, Duration::ZERO).await
}

/// Like [`spawn_upstream`], but each reply is held back for `delay`.
pub async fn spawn_slow_upstream(status: StatusCode, reply: Value, delay: Duration) -> Upstream {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = UpstreamState {
        status,
        reply,
        delay,
        received: received.clone(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/submit", post(upstream_handler))
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        url: format!("http://{}/submit", addr),
        received,
    }
}

/// Fake endpoint that accepts everything with a Web3Forms-style reply.
pub async fn accepting_upstream() -> Upstream {
    spawn_upstream(
        StatusCode::OK,
        json!({"success": true, "message": "Email sent successfully!"}),
    )
    .await
}

/// An endpoint URL on which nothing is listening.
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/submit", addr)
}

pub fn config_for(endpoint: &str) -> Config {
    let mut config = Config::default();
    config.relay.endpoint = endpoint.to_string();
    config.relay.timeout_ms = 2_000;
    config
}

/// Router with a manual clock and a fixed peer address.
pub fn test_app(config: Config) -> (Router, Arc<AppState>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let state = Arc::new(AppState::with_clock(config, clock.clone()).unwrap());
    let app = router(state.clone())
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 5], 40000))));
    (app, state, clock)
}

pub fn good_form() -> Value {
    json!({
        "name": "Anna Petrova",
        "email": "anna@site.org",
        "message": "Hello, could we talk about a website redesign?",
        "botcheck": ""
    })
}

pub fn submit_request(body: &Value, user_agent: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(ua) = user_agent {
        builder = builder.header(header::USER_AGENT, ua);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// URL-encoded POST to `/submit`.
pub fn form_request(pairs: &[(&str, &str)], user_agent: Option<&str>) -> Request<Body> {
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(ua) = user_agent {
        builder = builder.header(header::USER_AGENT, ua);
    }
    builder.body(Body::from(body)).unwrap()
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

pub fn good_form_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Anna Petrova"),
        ("email", "anna@site.org"),
        ("message", "Hello, could we talk about a website redesign?"),
        ("botcheck", ""),
    ]
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
