//! Global per-kind spacing of provider calls.
//!
//! The provider punishes bursts, so every charge and every status check goes
//! through one shared [`RequestThrottle`]. The sweep, accelerated rechecks and
//! submissions all draw on the same budget.

use std::{collections::HashMap, time::Duration};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::CooldownConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Charge,
    Check,
}

impl RequestKind {
    pub fn command(&self) -> &'static str {
        match self {
            RequestKind::Charge => "charging",
            RequestKind::Check => "check",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Charge => write!(f, "charge"),
            RequestKind::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug)]
pub struct RequestThrottle {
    charge_cooldown: Duration,
    check_cooldown: Duration,
    last_call: Mutex<HashMap<RequestKind, Instant>>,
}

impl RequestThrottle {
    pub fn new(charge_cooldown: Duration, check_cooldown: Duration) -> Self {
        Self {
            charge_cooldown,
            check_cooldown,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CooldownConfig) -> Self {
        Self::new(
            Duration::from_secs(config.charge),
            Duration::from_secs(config.check),
        )
    }

    pub fn cooldown(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Charge => self.charge_cooldown,
            RequestKind::Check => self.check_cooldown,
        }
    }

    /// How long until a call of `kind` would be accepted. Zero when it would be now.
    pub fn ready_in(&self, kind: RequestKind) -> Duration {
        let cooldown = self.cooldown(kind);
        match self.last_call.lock().get(&kind) {
            Some(last) => cooldown.saturating_sub(Instant::now().saturating_duration_since(*last)),
            None => Duration::ZERO,
        }
    }

    /// Claim the slot for `kind`. On rejection returns how long until the
    /// next call would be accepted. Rejected calls do not move the window.
    pub fn try_acquire(&self, kind: RequestKind) -> Result<(), Duration> {
        let cooldown = self.cooldown(kind);
        let now = Instant::now();
        let mut last_call = self.last_call.lock();
        if let Some(last) = last_call.get(&kind) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                return Err(cooldown - elapsed);
            }
        }
        last_call.insert(kind, now);
        Ok(())
    }
}
