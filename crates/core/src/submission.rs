//! Player-side gatekeeping before a card ever reaches the provider.

use std::{collections::HashMap, time::Duration};

use napthe_types::{Telco, is_valid_denomination, masking, messages};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const LOG_TARGET: &str = "napthe::submit";

/// One card as entered by a player.
#[derive(Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub request_id: String,
    pub player_name: String,
    pub telco: Telco,
    pub code: String,
    pub serial: String,
    pub amount: i64,
}

impl ChargeRequest {
    /// New request with a fresh UUID v4 request id. Code and serial are trimmed.
    pub fn new(
        player_name: impl Into<String>,
        telco: Telco,
        code: impl AsRef<str>,
        serial: impl AsRef<str>,
        amount: i64,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            player_name: player_name.into(),
            telco,
            code: code.as_ref().trim().to_string(),
            serial: serial.as_ref().trim().to_string(),
            amount,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

impl std::fmt::Debug for ChargeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargeRequest")
            .field("request_id", &self.request_id)
            .field("player_name", &self.player_name)
            .field("telco", &self.telco)
            .field("code", &masking::mask_code(&self.code))
            .field("serial", &masking::mask_serial(&self.serial))
            .field("amount", &self.amount)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("Submitted again too quickly, {remaining_secs}s left")]
    Cooldown { remaining_secs: u64 },
    #[error("Serial or code is empty")]
    EmptyCardInput,
    #[error("{0} is not a card denomination")]
    InvalidDenomination(i64),
}

impl SubmitRejected {
    /// Chat line explaining the rejection.
    pub fn player_message(&self) -> String {
        match self {
            SubmitRejected::Cooldown { remaining_secs } => {
                messages::format_error_message(&messages::submit_cooldown_message(*remaining_secs))
            }
            SubmitRejected::EmptyCardInput => messages::format_error_message(messages::EMPTY_CARD_INPUT),
            SubmitRejected::InvalidDenomination(_) => {
                messages::format_error_message("charging.invalid_amount")
            }
        }
    }
}

/// Per-player submission spacing and input checks.
#[derive(Debug)]
pub struct SubmissionGuard {
    cooldown: Duration,
    last_submission: Mutex<HashMap<String, Instant>>,
}

impl SubmissionGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: cooldown.max(Duration::from_secs(1)),
            last_submission: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record the attempt and validate it.
    ///
    /// The cooldown clock restarts on every accepted attempt, even one that
    /// then fails validation.
    pub fn check(&self, request: &ChargeRequest) -> Result<(), SubmitRejected> {
        self.claim(&request.player_name)?;

        if request.serial.trim().is_empty() || request.code.trim().is_empty() {
            info!(target: LOG_TARGET, player = %request.player_name, "Empty serial or code submitted");
            return Err(SubmitRejected::EmptyCardInput);
        }
        if !is_valid_denomination(request.amount) {
            info!(target: LOG_TARGET, player = %request.player_name, amount = request.amount, "Unknown denomination submitted");
            return Err(SubmitRejected::InvalidDenomination(request.amount));
        }

        debug!(
            target: LOG_TARGET,
            player = %request.player_name,
            request_id = %request.request_id,
            telco = %request.telco,
            amount = request.amount,
            serial = %masking::mask_serial(&request.serial),
            code = %masking::mask_code(&request.code),
            "Submission accepted"
        );
        Ok(())
    }

    fn claim(&self, player_name: &str) -> Result<(), SubmitRejected> {
        let now = Instant::now();
        let mut last_submission = self.last_submission.lock();
        last_submission.retain(|_, last| now.saturating_duration_since(*last) < self.cooldown);
        if let Some(last) = last_submission.get(player_name) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                let remaining_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                debug!(target: LOG_TARGET, player = %player_name, remaining_secs, "Submission throttled");
                return Err(SubmitRejected::Cooldown { remaining_secs });
            }
        }
        last_submission.insert(player_name.to_string(), now);
        Ok(())
    }
}
