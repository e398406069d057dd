// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client tier of the contact form.
//!
//! Gives immediate feedback with the same heuristics the server enforces,
//! keeps a durable resubmission cooldown, and relays the form straight to
//! the delivery endpoint. Only one submission may be in flight; the submit
//! control stays disabled for a short delay after each attempt.

use crate::cooldown::SubmissionCooldown;
use crate::error::SubmitError;
use crate::form::ContactForm;
use crate::limiter::Clock;
use crate::relay::{RelayClient, RelayOutcome};
use crate::validator::{ContentValidator, FieldKind, VALIDATED_FIELDS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Inline message shown when a field loses focus with junk content.
pub fn blur_message(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Name => Some("Please enter a real name."),
        FieldKind::Message => Some("Please write a meaningful message."),
        FieldKind::Other => None,
    }
}

/// Enabled/disabled state of the submit control.
pub struct SubmitControl {
    clock: Arc<dyn Clock>,
    reenable_delay: Duration,
    status_hide_delay: Duration,
    in_flight: AtomicBool,
    timeline: Mutex<Option<Timeline>>,
}

#[derive(Debug, Clone, Copy)]
struct Timeline {
    reenable_at: Instant,
    status_hidden_at: Instant,
}

/// Held while a submission is in flight. Dropping it starts the
/// re-enable delay.
pub struct SubmitGuard<'a> {
    control: &'a SubmitControl,
}

impl SubmitControl {
    pub fn new(clock: Arc<dyn Clock>, reenable_delay: Duration, status_hide_delay: Duration) -> Self {
        Self {
            clock,
            reenable_delay,
            status_hide_delay,
            in_flight: AtomicBool::new(false),
            timeline: Mutex::new(None),
        }
    }

    fn timeline(&self) -> Option<Timeline> {
        *self.timeline.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_enabled(&self) -> bool {
        if self.in_flight.load(Ordering::SeqCst) {
            return false;
        }
        self.timeline()
            .map_or(true, |t| self.clock.now() >= t.reenable_at)
    }

    /// Whether the last attempt's status message is still on screen.
    pub fn status_visible(&self) -> bool {
        if self.in_flight.load(Ordering::SeqCst) {
            return true;
        }
        self.timeline()
            .map_or(false, |t| self.clock.now() < t.status_hidden_at)
    }

    /// Disable the control for one submission.
    ///
    /// The re-enable delay is checked only after the flag is won: a guard
    /// publishes its timeline before clearing the flag.
    pub fn try_acquire(&self) -> Option<SubmitGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;

        if let Some(t) = self.timeline() {
            if self.clock.now() < t.reenable_at {
                self.in_flight.store(false, Ordering::SeqCst);
                return None;
            }
        }
        Some(SubmitGuard { control: self })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        let reenable_at = self.control.clock.now() + self.control.reenable_delay;
        let timeline = Timeline {
            reenable_at,
            status_hidden_at: reenable_at + self.control.status_hide_delay,
        };
        *self
            .control
            .timeline
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(timeline);
        self.control.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Client-side form submitter.
pub struct ContactClient {
    relay: RelayClient,
    cooldown: SubmissionCooldown,
    control: SubmitControl,
    user_agent: Option<String>,
    content: ContentValidator,
}

impl ContactClient {
    pub fn new(
        relay: RelayClient,
        cooldown: SubmissionCooldown,
        control: SubmitControl,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            relay,
            cooldown,
            control,
            user_agent,
            content: ContentValidator::new(),
        }
    }

    pub fn control(&self) -> &SubmitControl {
        &self.control
    }

    /// Check one field as it loses focus. Returns the inline message, if any.
    pub fn check_field(&self, value: &str, kind: FieldKind) -> Option<&'static str> {
        if self.content.evaluate(value, kind).is_meaningless() {
            blur_message(kind)
        } else {
            None
        }
    }

    /// Run the submit-time content checks over the validated fields.
    ///
    /// Every failing field is reported, name first.
    pub fn validate(&self, form: &ContactForm) -> Result<(), Vec<SubmitError>> {
        let errors: Vec<SubmitError> = VALIDATED_FIELDS
            .iter()
            .filter_map(|&(field, kind)| {
                let value = form.text(field).unwrap_or("");
                self.content
                    .evaluate(value, kind)
                    .reason()
                    .map(|reason| SubmitError::ValidationFailed { field, reason })
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Submit the form. On success the cooldown timestamp is recorded.
    pub async fn submit(&self, form: &ContactForm) -> Result<RelayOutcome, SubmitError> {
        if self
            .user_agent
            .as_deref()
            .map_or(true, |ua| ua.trim().is_empty())
        {
            warn!("Form blocked: no User-Agent");
            return Err(SubmitError::MissingUserAgent);
        }

        match self.cooldown.remaining() {
            Ok(Some(retry_after)) => {
                debug!(?retry_after, "Resubmission window still open");
                return Err(SubmitError::RateLimited { retry_after });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cooldown store unreadable, not enforcing"),
        }

        if let Err(mut errors) = self.validate(form) {
            return Err(errors.remove(0));
        }

        let _guard = self.control.try_acquire().ok_or(SubmitError::Busy)?;

        let outcome = match self.relay.submit(form).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Submission failed");
                return Err(SubmitError::Network);
            }
        };

        if !outcome.success {
            info!(status = outcome.status, "Submission rejected by endpoint");
            return Err(SubmitError::Rejected {
                message: outcome.message,
            });
        }

        if let Err(e) = self.cooldown.record_success() {
            warn!(error = %e, "Could not record submission time");
        }
        info!(status = outcome.status, "Submission sent");
        Ok(outcome)
    }
}
