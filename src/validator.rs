// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Junk-content heuristics shared by the client and server tiers.
//!
//! [`ContentValidator::evaluate`] is the single rule set: both the
//! interactive client check and the authoritative server check call it, so
//! the two tiers cannot drift apart. [`SubmissionValidator`] layers the
//! server-only request checks (User-Agent, honeypot) on top.

use crate::config::FormConfig;
use crate::form::{ContactForm, MESSAGE_FIELD, NAME_FIELD};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Phrases that mark a field as placeholder or keyboard-mash content.
///
/// Matched as lowercase substrings of the trimmed input.
pub const BANNED_PHRASES: &[&str] = &[
    "test", "тест", "qwe", "qwerty", "123", "1234", "12345", "123456", "1111",
    "asdf", "zxcv", "йцу", "фыв", "йцукен", "no name", "noname", "anonymous",
    "spam", "бот", "bot", "example", "user", "имя", "ваше имя", "сообщение",
    "name", "message", "email", "none", "null", "undefined",
];

/// Messages longer than this must contain whitespace.
const LONG_MESSAGE_CHARS: usize = 25;

/// Which rule subset applies to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Name,
    Message,
    Other,
}

/// Why a value was judged meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Empty,
    TooShort,
    BannedPhrase,
    Repetitive,
    NoLetters,
    NoWhitespaceLongMessage,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort => "too_short",
            Self::BannedPhrase => "banned_phrase",
            Self::Repetitive => "repetitive",
            Self::NoLetters => "no_letters",
            Self::NoWhitespaceLongMessage => "no_whitespace_long_message",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    reason: Option<ReasonCode>,
}

impl Verdict {
    pub const OK: Verdict = Verdict { reason: None };

    fn meaningless(reason: ReasonCode) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    pub fn is_meaningless(&self) -> bool {
        self.reason.is_some()
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        self.reason
    }
}

/// Pure field-content heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentValidator;

impl ContentValidator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a field value. Rules short-circuit in order, so the
    /// reported reason is the first rule that matched.
    pub fn evaluate(&self, value: &str, kind: FieldKind) -> Verdict {
        let clean = value.trim();
        let len = clean.chars().count();

        if len == 0 {
            return Verdict::meaningless(ReasonCode::Empty);
        }
        if len < 2 {
            return Verdict::meaningless(ReasonCode::TooShort);
        }

        let lower = clean.to_lowercase();
        if let Some(phrase) = BANNED_PHRASES.iter().find(|p| lower.contains(**p)) {
            debug!(phrase = *phrase, "Banned phrase matched");
            return Verdict::meaningless(ReasonCode::BannedPhrase);
        }

        if is_repetitive(clean) {
            return Verdict::meaningless(ReasonCode::Repetitive);
        }

        match kind {
            FieldKind::Name if !clean.chars().any(is_supported_letter) => {
                Verdict::meaningless(ReasonCode::NoLetters)
            }
            FieldKind::Message
                if len > LONG_MESSAGE_CHARS
                    && !clean.chars().any(|c| matches!(c, ' ' | '\t' | '\n' | '\r')) =>
            {
                Verdict::meaningless(ReasonCode::NoWhitespaceLongMessage)
            }
            _ => Verdict::OK,
        }
    }
}

/// Shorthand for `ContentValidator.evaluate(value, kind).is_meaningless()`.
pub fn is_meaningless(value: &str, kind: FieldKind) -> bool {
    ContentValidator.evaluate(value, kind).is_meaningless()
}

/// Three or more characters, all identical.
fn is_repetitive(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.chars().count() >= 3 && chars.all(|c| c == first)
}

/// Latin or Russian Cyrillic letter, either case.
fn is_supported_letter(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Request-level validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("User-Agent required")]
    MissingUserAgent,

    #[error("Spam bot detected")]
    HoneypotTriggered,

    #[error("Field {field} must be a string")]
    InvalidFieldType { field: &'static str },

    #[error("Field {field} rejected: {reason}")]
    Meaningless {
        field: &'static str,
        reason: ReasonCode,
    },
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Request is valid
    Valid,
    /// Request is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Fields checked by content heuristics, with their rule subset.
pub const VALIDATED_FIELDS: &[(&str, FieldKind)] =
    &[(NAME_FIELD, FieldKind::Name), (MESSAGE_FIELD, FieldKind::Message)];

/// Server-side submission validator.
pub struct SubmissionValidator {
    config: FormConfig,
    content: ContentValidator,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: FormConfig) -> Self {
        Self {
            config,
            content: ContentValidator::new(),
        }
    }

    /// The User-Agent header must be present and not blank.
    pub fn validate_user_agent(&self, user_agent: Option<&str>) -> ValidationResult {
        match user_agent {
            Some(ua) if !ua.trim().is_empty() => ValidationResult::Valid,
            _ => {
                debug!("Missing User-Agent");
                ValidationResult::Invalid(ValidationError::MissingUserAgent)
            }
        }
    }

    /// The honeypot field must be absent or empty.
    pub fn validate_honeypot(&self, form: &ContactForm) -> ValidationResult {
        if form.is_filled(&self.config.honeypot_field) {
            debug!(field = %self.config.honeypot_field, "Honeypot filled");
            return ValidationResult::Invalid(ValidationError::HoneypotTriggered);
        }
        ValidationResult::Valid
    }

    /// Run the content heuristics over the name and message fields.
    ///
    /// A missing field is evaluated as an empty string.
    pub fn validate_fields(&self, form: &ContactForm) -> ValidationResult {
        for &(field, kind) in VALIDATED_FIELDS {
            let value = match form.get(field) {
                None | Some(serde_json::Value::Null) => "",
                Some(serde_json::Value::String(s)) => s.as_str(),
                Some(_) => {
                    return ValidationResult::Invalid(ValidationError::InvalidFieldType {
                        field,
                    })
                }
            };

            if let Some(reason) = self.content.evaluate(value, kind).reason() {
                debug!(field, %reason, "Field content rejected");
                return ValidationResult::Invalid(ValidationError::Meaningless { field, reason });
            }
        }
        ValidationResult::Valid
    }

    /// Validate a complete submission.
    pub fn validate(&self, user_agent: Option<&str>, form: &ContactForm) -> ValidationResult {
        let ua = self.validate_user_agent(user_agent);
        if !ua.is_valid() {
            return ua;
        }

        let honeypot = self.validate_honeypot(form);
        if !honeypot.is_valid() {
            return honeypot;
        }

        self.validate_fields(form)
    }
}
