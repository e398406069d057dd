// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Contact-form ingress with the same junk heuristics on both tiers:
//!
//! - Shared content heuristics (banned phrases, repetition, letter and
//!   whitespace checks)
//! - Client-side resubmission cooldown with durable storage
//! - Per-IP sliding-window rate limiting on the server
//! - User-Agent and honeypot checks
//! - Relay to a JSON form-delivery API

pub mod client;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod form;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod relay;
pub mod validator;

pub use client::ContactClient;
pub use config::Config;
pub use error::SubmitError;
pub use form::ContactForm;
pub use limiter::{RateLimitResult, RateLimiter};
pub use validator::{ContentValidator, FieldKind, ReasonCode, Verdict};
