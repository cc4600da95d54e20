//! Outbound communication with the card provider.
//!
//! [`PaymentApiClient`] signs, throttles, sends and decodes. It never fails
//! for transport or decode problems: those come back as a `-1` response so
//! callers branch on the reply alone. Only a missing configuration is an error.

pub mod signing;
pub mod throttle;
pub mod transport;

use std::sync::Arc;

use napthe_types::{
    CardPayment, ChargeResponse, ProviderReply, StatusResponse, Telco, masking,
};
use serde_json::{Map, Value, json};
use tracing::{debug, info, trace, warn};

pub use throttle::{RequestKind, RequestThrottle};
pub use transport::{HttpTransport, ProviderTransport, TransportError};

use crate::{
    config::{ConfigError, Credentials, NapTheConfig},
    error::Result,
};

const LOG_TARGET: &str = "napthe::api";

/// Longest slice of an undecodable body that is logged.
const RAW_PREVIEW_LEN: usize = 100;

/// Card details resent with a status check so the provider can match the
/// signature of the original charge.
#[derive(Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub telco: Telco,
    pub code: String,
    pub serial: String,
    pub amount: i64,
}

impl std::fmt::Debug for CardInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardInfo")
            .field("telco", &self.telco)
            .field("code", &masking::mask_code(&self.code))
            .field("serial", &masking::mask_serial(&self.serial))
            .field("amount", &self.amount)
            .finish()
    }
}

impl From<&CardPayment> for CardInfo {
    fn from(payment: &CardPayment) -> Self {
        Self {
            telco: payment.telco(),
            code: payment.code().to_string(),
            serial: payment.serial().to_string(),
            amount: payment.declared_amount(),
        }
    }
}

pub struct PaymentApiClient {
    partner_id: String,
    partner_key: String,
    transport: Arc<dyn ProviderTransport>,
    throttle: RequestThrottle,
}

impl PaymentApiClient {
    /// Build a client over an arbitrary transport. Credentials are checked on
    /// every call, not here.
    pub fn new(config: &NapTheConfig, transport: Arc<dyn ProviderTransport>) -> Self {
        Self {
            partner_id: config.partner_id.trim().to_string(),
            partner_key: config.partner_key.trim().to_string(),
            transport,
            throttle: RequestThrottle::from_config(&config.cooldowns),
        }
    }

    /// Build a client posting to `api_url` over HTTP.
    pub fn from_config(config: &NapTheConfig) -> std::result::Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.api_url()?, config.api_timeout())?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    fn credentials(&self) -> Result<Credentials> {
        if self.partner_id.is_empty() {
            return Err(ConfigError::MissingPartnerId.into());
        }
        if self.partner_key.is_empty() {
            return Err(ConfigError::MissingPartnerKey.into());
        }
        Ok(Credentials {
            partner_id: self.partner_id.clone(),
            partner_key: self.partner_key.clone(),
        })
    }

    /// Sleep until the shared cooldown for `kind` has elapsed. Another caller
    /// may still claim the slot first.
    pub async fn wait_for_slot(&self, kind: RequestKind) {
        let wait = self.throttle.ready_in(kind);
        if !wait.is_zero() {
            trace!(target: LOG_TARGET, kind = %kind, wait_ms = wait.as_millis() as u64, "Waiting for request slot");
            tokio::time::sleep(wait).await;
        }
    }

    /// Submit a card. The reply decides whether the payment is tracked.
    pub async fn charge_card(
        &self,
        telco: Telco,
        code: &str,
        serial: &str,
        amount: i64,
        request_id: &str,
    ) -> Result<ChargeResponse> {
        let credentials = self.credentials()?;

        if let Err(wait) = self.throttle.try_acquire(RequestKind::Charge) {
            debug!(target: LOG_TARGET, request_id = %request_id, wait_ms = wait.as_millis() as u64, "Charge throttled locally");
            return Ok(ChargeResponse::throttled());
        }

        let payload = charge_payload(&credentials, telco, code, serial, amount, request_id);
        let Some(body) = self.send(RequestKind::Charge, request_id, &payload).await else {
            return Ok(ChargeResponse::connection_failed());
        };

        match ChargeResponse::from_body(&body) {
            Ok(response) => {
                info!(
                    target: LOG_TARGET,
                    request_id = %request_id,
                    status = %response.status,
                    message = %response.message,
                    "Charge reply received"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(target: LOG_TARGET, request_id = %request_id, error = %e, raw = %preview(&body), "Undecodable charge reply");
                Ok(ChargeResponse::connection_failed())
            }
        }
    }

    /// Ask the provider for the current state of `request_id`.
    pub async fn check_status(
        &self,
        request_id: &str,
        card: Option<&CardInfo>,
    ) -> Result<StatusResponse> {
        let credentials = self.credentials()?;

        if let Err(wait) = self.throttle.try_acquire(RequestKind::Check) {
            debug!(target: LOG_TARGET, request_id = %request_id, wait_ms = wait.as_millis() as u64, "Status check throttled locally");
            return Ok(StatusResponse::throttled());
        }

        let payload = check_payload(&credentials, request_id, card);
        let Some(body) = self.send(RequestKind::Check, request_id, &payload).await else {
            return Ok(StatusResponse::connection_failed());
        };

        match StatusResponse::from_body(&body) {
            Ok(response) => {
                debug!(
                    target: LOG_TARGET,
                    request_id = %request_id,
                    status = %response.status,
                    message = %response.message,
                    pending = response.is_pending(),
                    "Status reply received"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(target: LOG_TARGET, request_id = %request_id, error = %e, raw = %preview(&body), "Undecodable status reply");
                Ok(StatusResponse::connection_failed())
            }
        }
    }

    async fn send(&self, kind: RequestKind, request_id: &str, payload: &Value) -> Option<String> {
        debug!(
            target: LOG_TARGET,
            command = kind.command(),
            request_id = %request_id,
            payload = %masked_payload(payload),
            "Sending provider request"
        );
        match self.transport.post_json(payload).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(target: LOG_TARGET, command = kind.command(), request_id = %request_id, error = %e, "Provider request failed");
                None
            }
        }
    }
}

fn charge_payload(
    credentials: &Credentials,
    telco: Telco,
    code: &str,
    serial: &str,
    amount: i64,
    request_id: &str,
) -> Value {
    json!({
        "telco": telco.code(),
        "code": code,
        "serial": serial,
        "amount": amount,
        "request_id": request_id,
        "partner_id": credentials.partner_id,
        "sign": signing::card_signature(&credentials.partner_key, code, serial),
        "command": RequestKind::Charge.command(),
    })
}

fn check_payload(credentials: &Credentials, request_id: &str, card: Option<&CardInfo>) -> Value {
    let mut payload = Map::new();
    payload.insert("request_id".into(), json!(request_id));
    payload.insert("partner_id".into(), json!(credentials.partner_id));
    match card {
        Some(card) => {
            payload.insert("telco".into(), json!(card.telco.code()));
            payload.insert("code".into(), json!(card.code));
            payload.insert("serial".into(), json!(card.serial));
            payload.insert("amount".into(), json!(card.amount));
            payload.insert(
                "sign".into(),
                json!(signing::card_signature(&credentials.partner_key, &card.code, &card.serial)),
            );
        }
        None => {
            payload.insert(
                "sign".into(),
                json!(signing::request_signature(&credentials.partner_key, request_id)),
            );
        }
    }
    payload.insert("command".into(), json!(RequestKind::Check.command()));
    Value::Object(payload)
}

/// Copy of `payload` safe to log.
fn masked_payload(payload: &Value) -> Value {
    let mut masked = payload.clone();
    if let Some(object) = masked.as_object_mut() {
        for (key, mask) in [
            ("code", masking::mask_code as fn(&str) -> String),
            ("serial", masking::mask_serial),
            ("sign", masking::mask_sign),
        ] {
            if let Some(Value::String(value)) = object.get_mut(key) {
                *value = mask(value);
            }
        }
    }
    masked
}

fn preview(body: &str) -> String {
    body.chars().take(RAW_PREVIEW_LEN).collect()
}
