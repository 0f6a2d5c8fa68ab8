//! Cooldown gate - per-command global and per-user rate limiting

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::application::errors::CooldownAxis;
use crate::domain::entities::Command;

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Denied { axis: CooldownAxis, retry_after: Duration },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }
}

#[derive(Debug, Default)]
struct CooldownState {
    last_global: Option<Instant>,
    last_user: HashMap<String, Instant>,
}

/// Tracks when each command last ran, globally and per user
#[derive(Debug, Default)]
pub struct CooldownGate {
    states: Mutex<HashMap<String, CooldownState>>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check both axes and, if allowed, record the invocation.
    ///
    /// Global is checked before per-user. Zero durations never gate.
    pub fn check_and_arm(&self, command: &Command, user_id: &str, now: Instant) -> CooldownDecision {
        self.check_and_arm_with(&command.name, command.delay_all, command.delay_user, user_id, now)
    }

    pub fn check_and_arm_with(
        &self,
        command: &str,
        delay_all: Duration,
        delay_user: Duration,
        user_id: &str,
        now: Instant,
    ) -> CooldownDecision {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.entry(command.to_string()).or_default();

        if let Some(last) = state.last_global {
            if let Some(retry_after) = remaining(delay_all, last, now) {
                return CooldownDecision::Denied {
                    axis: CooldownAxis::Global,
                    retry_after,
                };
            }
        }

        if let Some(last) = state.last_user.get(user_id) {
            if let Some(retry_after) = remaining(delay_user, *last, now) {
                return CooldownDecision::Denied {
                    axis: CooldownAxis::User,
                    retry_after,
                };
            }
        }

        state.last_global = Some(now);
        state.last_user.insert(user_id.to_string(), now);

        // Drop user entries that can no longer gate anything
        if state.last_user.len() > 1024 {
            state
                .last_user
                .retain(|_, at| now.saturating_duration_since(*at) < delay_user);
        }

        CooldownDecision::Allowed
    }

    /// Discard all state for a command
    pub fn forget(&self, command: &str) {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(command);
    }

    pub fn tracked_commands(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or(0)
    }
}

fn remaining(window: Duration, last: Instant, now: Instant) -> Option<Duration> {
    if window.is_zero() {
        return None;
    }
    let elapsed = now.saturating_duration_since(last);
    if elapsed < window {
        Some(window - elapsed)
    } else {
        None
    }
}
