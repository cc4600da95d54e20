use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{catalog::Telco, masking};

/// Lifecycle of a card payment. `Successful` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Successful,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Successful => write!(f, "successful"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Payment {request_id} is already {status}")]
pub struct AlreadyResolved {
    pub request_id: String,
    pub status: PaymentStatus,
}

/// One redemption attempt, from submission to its terminal outcome.
///
/// Card code and serial are kept for status lookups. They are never
/// serialized and are masked in `Debug` output.
#[derive(Clone, Serialize)]
pub struct CardPayment {
    request_id: String,
    player_name: String,
    telco: Telco,
    #[serde(skip)]
    code: String,
    #[serde(skip)]
    serial: String,
    #[serde(rename = "amount")]
    declared_amount: i64,
    created_at: DateTime<Utc>,
    status: PaymentStatus,
    processed_amount: Option<i64>,
    fail_reason: Option<String>,
}

impl CardPayment {
    pub fn new(
        request_id: impl Into<String>,
        player_name: impl Into<String>,
        telco: Telco,
        code: impl Into<String>,
        serial: impl Into<String>,
        declared_amount: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            player_name: player_name.into(),
            telco,
            code: code.into(),
            serial: serial.into(),
            declared_amount,
            created_at,
            status: PaymentStatus::Pending,
            processed_amount: None,
            fail_reason: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn telco(&self) -> Telco {
        self.telco
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn declared_amount(&self) -> i64 {
        self.declared_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn processed_amount(&self) -> Option<i64> {
        self.processed_amount
    }

    pub fn fail_reason(&self) -> Option<&str> {
        self.fail_reason.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Successful
    }

    pub fn is_failed(&self) -> bool {
        self.status == PaymentStatus::Failed
    }

    fn ensure_pending(&self) -> Result<(), AlreadyResolved> {
        if self.status.is_terminal() {
            return Err(AlreadyResolved {
                request_id: self.request_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn mark_successful(&mut self, amount: i64) -> Result<(), AlreadyResolved> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Successful;
        self.processed_amount = Some(amount);
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), AlreadyResolved> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Failed;
        self.fail_reason = Some(reason.into());
        Ok(())
    }
}

impl std::fmt::Debug for CardPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardPayment")
            .field("request_id", &self.request_id)
            .field("player_name", &self.player_name)
            .field("telco", &self.telco)
            .field("code", &masking::mask_code(&self.code))
            .field("serial", &masking::mask_serial(&self.serial))
            .field("declared_amount", &self.declared_amount)
            .field("created_at", &self.created_at)
            .field("status", &self.status)
            .field("processed_amount", &self.processed_amount)
            .field("fail_reason", &self.fail_reason)
            .finish()
    }
}
