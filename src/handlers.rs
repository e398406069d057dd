// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay service.
//!
//! The server tier re-runs every check itself and never trusts the client:
//! rate limit, User-Agent, honeypot and the shared content heuristics, then
//! relays the form to the delivery endpoint.

use crate::config::Config;
use crate::error::{ceil_secs, SubmitError};
use crate::form::ContactForm;
use crate::limiter::{Clock, RateLimitResult, RateLimiter, SystemClock};
use crate::metrics::{Metrics, DELIVERED};
use crate::relay::{RelayClient, RelayError};
use crate::validator::{SubmissionValidator, ValidationResult};
use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequest, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";
const RATELIMIT_POLICY: &str = "ratelimit-policy";

/// Failures while assembling the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Relay setup failed: {0}")]
    Relay(#[from] RelayError),

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub validator: SubmissionValidator,
    pub relay: RelayClient,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StartupError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build state with an injected rate-limiter clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        Ok(Self {
            limiter: RateLimiter::with_clock(config.rate_limit.clone(), clock),
            validator: SubmissionValidator::new(config.form.clone()),
            relay: RelayClient::new(&config.relay)?,
            metrics: Metrics::new()?,
            config,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Accepted submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/submit", post(submit));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
    .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.set_tracked_addresses(state.limiter.tracked().await);
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accept a contact form submission.
///
/// The rate limit is checked from the request head alone, so every
/// response, including ones for unreadable bodies, counts toward the
/// window and carries the rate limit headers.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let ip = client_ip(request.headers(), addr, state.config.form.trust_forwarded_for);

    let rate = state.limiter.check(ip).await;
    let result = match rate {
        RateLimitResult::Limited { retry_after, .. } => {
            info!(%ip, retry_after_secs = ceil_secs(retry_after), "Submission rate limited");
            Err(SubmitError::RateLimited { retry_after })
        }
        RateLimitResult::Allowed { .. } => deliver(&state, ip, request).await,
    };

    let mut response = match result {
        Ok(body) => {
            state.metrics.record(DELIVERED);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            state.metrics.record(err.code());
            err.into_response()
        }
    };

    let window_secs = state.limiter.window().as_secs();
    insert_rate_limit_headers(response.headers_mut(), &rate, window_secs);
    response
}

async fn deliver(
    state: &AppState,
    ip: IpAddr,
    request: Request<Body>,
) -> Result<SubmitResponse, SubmitError> {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let ValidationResult::Invalid(err) =
        state.validator.validate_user_agent(user_agent.as_deref())
    {
        info!(%ip, error = %err, "Submission rejected");
        return Err(err.into());
    }

    let form = read_form(request).await?;
    debug!(%ip, fields = form.len(), "Processing submission");

    if let ValidationResult::Invalid(err) = state.validator.validate(user_agent.as_deref(), &form)
    {
        info!(%ip, error = %err, "Submission rejected");
        return Err(err.into());
    }

    let outcome = state.relay.submit(&form).await.map_err(|e| {
        warn!(%ip, error = %e, "Relay failed");
        SubmitError::from(e)
    })?;

    if outcome.success {
        info!(%ip, status = outcome.status, "Submission delivered");
        Ok(SubmitResponse {
            success: true,
            message: outcome.message,
        })
    } else {
        info!(%ip, status = outcome.status, upstream_message = %outcome.message, "Delivery rejected");
        Err(SubmitError::Rejected {
            message: outcome.message,
        })
    }
}

/// Decode the body as a JSON object or as URL-encoded fields, chosen by
/// `Content-Type`.
async fn read_form(request: Request<Body>) -> Result<ContactForm, SubmitError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match content_type.as_str() {
        "application/json" => Json::<ContactForm>::from_request(request, &())
            .await
            .map(|Json(form)| form)
            .map_err(|e| {
                debug!(error = %e, "Unreadable JSON body");
                SubmitError::MalformedBody
            }),
        "application/x-www-form-urlencoded" => {
            Form::<Vec<(String, String)>>::from_request(request, &())
                .await
                .map(|Form(pairs)| pairs.into_iter().collect())
                .map_err(|e| {
                    debug!(error = %e, "Unreadable form body");
                    SubmitError::MalformedBody
                })
        }
        other => {
            debug!(content_type = %other, "Unsupported content type");
            Err(SubmitError::UnsupportedContentType)
        }
    }
}

/// Client address, optionally taken from the left-most `X-Forwarded-For`.
fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, rate: &RateLimitResult, window_secs: u64) {
    let (limit, remaining, reset) = match rate {
        RateLimitResult::Allowed {
            limit,
            remaining,
            reset_in,
        } => (*limit, *remaining, ceil_secs(*reset_in)),
        RateLimitResult::Limited { limit, retry_after } => (*limit, 0, ceil_secs(*retry_after)),
    };

    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset));
    if let Ok(policy) = HeaderValue::from_str(&format!("{};w={}", limit, window_secs)) {
        headers.insert(RATELIMIT_POLICY, policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_ip_ignores_forwarded_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();

        assert_eq!(client_ip(&headers, peer, false), peer.ip());
        assert_eq!(
            client_ip(&headers, peer, true),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_client_ip_bad_forwarded_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        assert_eq!(client_ip(&headers, peer, true), peer.ip());
    }

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        insert_rate_limit_headers(
            &mut headers,
            &RateLimitResult::Limited {
                limit: 1,
                retry_after: Duration::from_millis(41_200),
            },
            60,
        );
        assert_eq!(headers[RATELIMIT_LIMIT], "1");
        assert_eq!(headers[RATELIMIT_REMAINING], "0");
        assert_eq!(headers[RATELIMIT_RESET], "42");
        assert_eq!(headers[RATELIMIT_POLICY], "1;w=60");
        assert!(headers.get("x-ratelimit-limit").is_none());
    }
}
