// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission error taxonomy.
//!
//! Every variant ends the current attempt. The `Display` text is the short
//! message shown to the visitor; internal detail is logged, never returned.

use crate::form::NAME_FIELD;
use crate::relay::{RelayError, GENERIC_FAILURE};
use crate::validator::{ReasonCode, ValidationError};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a submission attempt ended without delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("User-Agent required")]
    MissingUserAgent,

    #[error("Spam bot detected")]
    HoneypotTriggered,

    #[error("Too many attempts. Please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("{}", rejection_message(.field))]
    ValidationFailed {
        field: &'static str,
        reason: ReasonCode,
    },

    #[error("Field {field} must be a string")]
    InvalidField { field: &'static str },

    #[error("Send the form as JSON or URL-encoded fields")]
    UnsupportedContentType,

    #[error("Form body could not be read")]
    MalformedBody,

    #[error("{}", GENERIC_FAILURE)]
    Network,

    #[error("{message}")]
    Rejected { message: String },

    #[error("A submission is already in progress.")]
    Busy,
}

/// Message shown when a field fails the content heuristics on submit.
pub fn rejection_message(field: &str) -> &'static str {
    if field == NAME_FIELD {
        "Please enter a real name (at least 2 characters, with letters)."
    } else {
        "Please write a meaningful message."
    }
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingUserAgent => "MISSING_USER_AGENT",
            Self::HoneypotTriggered => "HONEYPOT_TRIGGERED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::UnsupportedContentType => "UNSUPPORTED_CONTENT_TYPE",
            Self::MalformedBody => "MALFORMED_BODY",
            Self::Network => "NETWORK_FAILURE",
            Self::Rejected { .. } => "DELIVERY_REJECTED",
            Self::Busy => "BUSY",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUserAgent
            | Self::HoneypotTriggered
            | Self::ValidationFailed { .. }
            | Self::InvalidField { .. }
            | Self::MalformedBody => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Network | Self::Rejected { .. } => StatusCode::BAD_GATEWAY,
            Self::Busy => StatusCode::CONFLICT,
        }
    }
}

impl From<ValidationError> for SubmitError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingUserAgent => Self::MissingUserAgent,
            ValidationError::HoneypotTriggered => Self::HoneypotTriggered,
            ValidationError::InvalidFieldType { field } => Self::InvalidField { field },
            ValidationError::Meaningless { field, reason } => {
                Self::ValidationFailed { field, reason }
            }
        }
    }
}

impl From<RelayError> for SubmitError {
    fn from(_: RelayError) -> Self {
        Self::Network
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&SubmitError> for ErrorResponse {
    fn from(err: &SubmitError) -> Self {
        let (field, reason) = match err {
            SubmitError::ValidationFailed { field, reason } => (Some(*field), Some(*reason)),
            SubmitError::InvalidField { field } => (Some(*field), None),
            _ => (None, None),
        };
        let retry_after_secs = match err {
            SubmitError::RateLimited { retry_after } => Some(ceil_secs(*retry_after)),
            _ => None,
        };

        Self {
            error: err.to_string(),
            code: err.code(),
            field,
            reason,
            retry_after_secs,
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        let mut response = (self.status(), Json(body)).into_response();

        if let Self::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(ceil_secs(retry_after)),
            );
        }
        response
    }
}

/// Whole seconds, rounded up so clients never retry early.
pub fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SubmitError::MissingUserAgent.status(), StatusCode::BAD_REQUEST);
        assert_eq!(SubmitError::HoneypotTriggered.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SubmitError::RateLimited {
                retry_after: Duration::from_secs(3)
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(SubmitError::Network.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            SubmitError::UnsupportedContentType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(SubmitError::MalformedBody.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_user_messages() {
        let name = SubmitError::ValidationFailed {
            field: "name",
            reason: ReasonCode::NoLetters,
        };
        assert_eq!(
            name.to_string(),
            "Please enter a real name (at least 2 characters, with letters)."
        );

        let message = SubmitError::ValidationFailed {
            field: "message",
            reason: ReasonCode::Repetitive,
        };
        assert_eq!(message.to_string(), "Please write a meaningful message.");
        assert_eq!(SubmitError::Network.to_string(), "Something went wrong!");
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from(&SubmitError::ValidationFailed {
            field: "message",
            reason: ReasonCode::BannedPhrase,
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert_eq!(json["field"], "message");
        assert_eq!(json["reason"], "banned_phrase");
        assert!(json.get("retry_after_secs").is_none());
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = SubmitError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
