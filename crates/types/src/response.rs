use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    THROTTLED_MESSAGE, UNKNOWN_ERROR_MESSAGE, codec,
    messages::{self, PREFIX},
};

/// Status codes returned by the card-charging provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StatusCode {
    /// Card accepted and credited.
    Success,
    /// Card is being processed.
    Pending,
    SystemMaintenance,
    IncorrectCard,
    CardUsed,
    CardNotSupported,
    IncorrectPartner,
    ConnectionError,
    ProcessingError,
    /// Generic failure, the reason is in the message.
    FailedWithReason,
    /// Provider unreachable or reply unusable.
    Error,
    /// Any code outside the documented set.
    Other(i64),
}

impl StatusCode {
    pub fn code(&self) -> i64 {
        match self {
            StatusCode::Success => 1,
            StatusCode::Pending => 2,
            StatusCode::SystemMaintenance => 3,
            StatusCode::IncorrectCard => 4,
            StatusCode::CardUsed => 5,
            StatusCode::CardNotSupported => 6,
            StatusCode::IncorrectPartner => 7,
            StatusCode::ConnectionError => 8,
            StatusCode::ProcessingError => 9,
            StatusCode::FailedWithReason => 99,
            StatusCode::Error => -1,
            StatusCode::Other(code) => *code,
        }
    }
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        match code {
            1 => StatusCode::Success,
            2 => StatusCode::Pending,
            3 => StatusCode::SystemMaintenance,
            4 => StatusCode::IncorrectCard,
            5 => StatusCode::CardUsed,
            6 => StatusCode::CardNotSupported,
            7 => StatusCode::IncorrectPartner,
            8 => StatusCode::ConnectionError,
            9 => StatusCode::ProcessingError,
            99 => StatusCode::FailedWithReason,
            -1 => StatusCode::Error,
            other => StatusCode::Other(other),
        }
    }
}

impl From<StatusCode> for i64 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Reply is not a JSON object")]
    NotAnObject,
}

/// Coarse outcome of a provider reply, the single branch point for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// Card credited.
    Successful,
    /// Still in progress at the provider.
    Pending,
    /// Provider gave a definitive business failure.
    Failed,
    /// Rejected locally by the request throttle; no call was made.
    Throttled,
    /// Transport or decode failure; outcome unknown.
    Unreachable,
}

/// Classification shared by charge and status replies.
pub trait ProviderReply {
    fn status(&self) -> StatusCode;

    fn message(&self) -> &str;

    fn is_successful(&self) -> bool {
        self.status() == StatusCode::Success
    }

    /// The provider sometimes reports an in-progress card with the generic
    /// failure code and the literal message `PENDING`.
    fn is_pending(&self) -> bool {
        match self.status() {
            StatusCode::Pending => true,
            StatusCode::FailedWithReason => self.message().eq_ignore_ascii_case("PENDING"),
            _ => false,
        }
    }

    /// Whether the provider actually answered with a business outcome.
    fn is_valid_request(&self) -> bool {
        self.status() != StatusCode::Error && self.message() != UNKNOWN_ERROR_MESSAGE
    }

    fn is_throttled(&self) -> bool {
        self.status() == StatusCode::FailedWithReason && self.message() == THROTTLED_MESSAGE
    }

    fn classify(&self) -> ReplyClass {
        if !self.is_valid_request() {
            ReplyClass::Unreachable
        } else if self.is_throttled() {
            ReplyClass::Throttled
        } else if self.is_successful() {
            ReplyClass::Successful
        } else if self.is_pending() {
            ReplyClass::Pending
        } else {
            ReplyClass::Failed
        }
    }
}

fn parse_object(body: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(object) => Ok(object),
        _ => Err(DecodeError::NotAnObject),
    }
}

fn decode_head(object: &Map<String, Value>) -> (StatusCode, String) {
    let status = object
        .get("status")
        .map(|v| codec::to_int(v, -1))
        .unwrap_or(-1);
    let message = object
        .get("message")
        .map(|v| codec::to_string(v, UNKNOWN_ERROR_MESSAGE))
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
    (StatusCode::from(status), message)
}

/// Immediate reply to a `charging` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeResponse {
    pub status: StatusCode,
    pub message: String,
    pub amount: Option<i64>,
    #[serde(rename = "trans_id")]
    pub transaction_id: Option<String>,
    pub declared_value: Option<f64>,
    pub received_value: Option<f64>,
}

impl ChargeResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            amount: None,
            transaction_id: None,
            declared_value: None,
            received_value: None,
        }
    }

    /// Stand-in when the provider could not be reached or understood.
    pub fn connection_failed() -> Self {
        Self::new(StatusCode::Error, "connection.failed")
    }

    /// Stand-in when the local throttle rejected the call.
    pub fn throttled() -> Self {
        Self::new(StatusCode::FailedWithReason, THROTTLED_MESSAGE)
    }

    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        Ok(Self::from_object(object))
    }

    pub fn from_body(body: &str) -> Result<Self, DecodeError> {
        Ok(Self::from_object(&parse_object(body)?))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let (status, message) = decode_head(object);
        Self {
            status,
            message,
            amount: codec::opt_int(object, "amount"),
            transaction_id: codec::opt_string(object, "trans_id"),
            declared_value: codec::opt_float(object, "declared_value"),
            received_value: codec::opt_float(object, "received_value"),
        }
    }

    /// Text to show the submitting player.
    pub fn friendly_message(&self) -> String {
        if !self.is_valid_request() {
            return messages::format_error_message("connection.failed");
        }
        if self.message.contains("card_existed") {
            return messages::format_error_message(messages::CARD_ALREADY_USED);
        }
        if self.is_successful() || self.is_pending() {
            return messages::format_info_message(messages::PROCESSING_NOTICE);
        }
        match self.status {
            StatusCode::SystemMaintenance => messages::format_error_message("system.maintenance"),
            _ => messages::format_error_message(&self.message),
        }
    }
}

impl ProviderReply for ChargeResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Reply to a `check` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    pub status: StatusCode,
    pub message: String,
    pub amount: Option<i64>,
    #[serde(rename = "trans_id")]
    pub transaction_id: Option<String>,
    pub declared_value: Option<f64>,
    pub received_value: Option<f64>,
    pub card_code: Option<String>,
    pub card_serial: Option<String>,
    pub card_type: Option<String>,
    pub card_value: Option<String>,
}

impl StatusResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            amount: None,
            transaction_id: None,
            declared_value: None,
            received_value: None,
            card_code: None,
            card_serial: None,
            card_type: None,
            card_value: None,
        }
    }

    pub fn connection_failed() -> Self {
        Self::new(StatusCode::Error, "connection.failed")
    }

    pub fn throttled() -> Self {
        Self::new(StatusCode::FailedWithReason, THROTTLED_MESSAGE)
    }

    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        Ok(Self::from_object(object))
    }

    pub fn from_body(body: &str) -> Result<Self, DecodeError> {
        Ok(Self::from_object(&parse_object(body)?))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let (status, message) = decode_head(object);
        Self {
            status,
            message,
            amount: codec::opt_int(object, "amount"),
            transaction_id: codec::opt_string(object, "trans_id"),
            declared_value: codec::opt_float(object, "declared_value"),
            received_value: codec::opt_float(object, "received_value"),
            card_code: codec::opt_string(object, "card_code"),
            card_serial: codec::opt_string(object, "card_serial"),
            card_type: codec::opt_string(object, "card_type"),
            card_value: codec::opt_string(object, "card_value"),
        }
    }

    pub fn friendly_message(&self) -> String {
        if !self.is_valid_request() {
            return format!("{PREFIX}Lỗi kết nối đến hệ thống thanh toán. Vui lòng thử lại sau.");
        }
        if self.is_throttled() {
            return messages::format_error_message(THROTTLED_MESSAGE);
        }
        if self.is_successful() {
            return format!("{PREFIX}Thẻ nạp thành công!");
        }
        if self.is_pending() {
            return format!("{PREFIX}Thẻ đang được xử lý. Vui lòng đợi.");
        }
        let reason = messages::translate_error_message(&self.message);
        match self.status {
            StatusCode::SystemMaintenance => {
                format!("{PREFIX}Hệ thống đang bảo trì. Vui lòng thử lại sau.")
            }
            StatusCode::FailedWithReason => format!("{PREFIX}Lỗi: {reason}"),
            _ => format!("{PREFIX}Có lỗi xảy ra: {reason}"),
        }
    }
}

impl ProviderReply for StatusResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_code_round_trips_through_i64() {
        for code in [1, 2, 3, 4, 5, 6, 7, 8, 9, 99, -1, 42] {
            assert_eq!(StatusCode::from(code).code(), code);
        }
        assert_eq!(StatusCode::from(42), StatusCode::Other(42));
    }

    #[test]
    fn test_pending_quirk() {
        assert!(ChargeResponse::new(StatusCode::Pending, "anything").is_pending());
        assert!(ChargeResponse::new(StatusCode::FailedWithReason, "PENDING").is_pending());
        assert!(ChargeResponse::new(StatusCode::FailedWithReason, "pending").is_pending());
        assert!(StatusResponse::new(StatusCode::FailedWithReason, "Pending").is_pending());
        assert!(!ChargeResponse::new(StatusCode::FailedWithReason, "card_existed").is_pending());
        assert!(!ChargeResponse::new(StatusCode::FailedWithReason, "PENDING!").is_pending());
        assert!(!ChargeResponse::new(StatusCode::ProcessingError, "PENDING").is_pending());
    }

    #[test]
    fn test_pending_quirk_classifies_as_pending() {
        let reply = ChargeResponse::new(StatusCode::FailedWithReason, "PENDING");
        assert_eq!(reply.classify(), ReplyClass::Pending);
        let reply = ChargeResponse::new(StatusCode::FailedWithReason, "card_existed");
        assert_eq!(reply.classify(), ReplyClass::Failed);
    }

    #[test]
    fn test_valid_request() {
        assert!(!ChargeResponse::connection_failed().is_valid_request());
        assert!(!ChargeResponse::new(StatusCode::Success, UNKNOWN_ERROR_MESSAGE).is_valid_request());
        assert!(ChargeResponse::new(StatusCode::IncorrectCard, "charging.card.wrong").is_valid_request());
        assert_eq!(ChargeResponse::connection_failed().classify(), ReplyClass::Unreachable);
    }

    #[test]
    fn test_throttled_is_valid_but_distinct() {
        let reply = StatusResponse::throttled();
        assert!(reply.is_valid_request());
        assert!(!reply.is_pending());
        assert_eq!(reply.classify(), ReplyClass::Throttled);
    }

    #[test]
    fn test_decode_charge_reply_with_loose_types() {
        let reply = ChargeResponse::from_json(&json!({
            "status": "2",
            "message": "PENDING",
            "amount": "50000",
            "trans_id": 123456,
            "declared_value": 50000,
            "received_value": "0"
        }))
        .unwrap();
        assert_eq!(reply.status, StatusCode::Pending);
        assert_eq!(reply.amount, Some(50000));
        assert_eq!(reply.transaction_id.as_deref(), Some("123456"));
        assert_eq!(reply.declared_value, Some(50000.0));
        assert_eq!(reply.received_value, Some(0.0));
    }

    #[test]
    fn test_decode_defaults_missing_head() {
        let reply = StatusResponse::from_json(&json!({})).unwrap();
        assert_eq!(reply.status, StatusCode::Error);
        assert_eq!(reply.message, UNKNOWN_ERROR_MESSAGE);
        assert!(!reply.is_valid_request());
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(matches!(ChargeResponse::from_body("<html>"), Err(DecodeError::Json(_))));
        assert!(matches!(ChargeResponse::from_body("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(StatusResponse::from_json(&json!("ok")), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_decode_status_reply_card_fields() {
        let reply = StatusResponse::from_body(
            r#"{"status":1,"message":"OK","amount":50000,"card_code":"31****82","card_serial":"1000****7874","card_type":"VIETTEL","card_value":"50000"}"#,
        )
        .unwrap();
        assert!(reply.is_successful());
        assert_eq!(reply.card_type.as_deref(), Some("VIETTEL"));
        assert_eq!(reply.card_value.as_deref(), Some("50000"));
    }

    #[test]
    fn test_charge_friendly_messages() {
        let used = ChargeResponse::new(StatusCode::FailedWithReason, "card_existed");
        assert!(used.friendly_message().contains(messages::CARD_ALREADY_USED));

        let unreachable = ChargeResponse::connection_failed();
        assert!(unreachable
            .friendly_message()
            .contains("Không thể kết nối đến máy chủ thanh toán"));

        let maintenance = ChargeResponse::new(StatusCode::SystemMaintenance, "maintain");
        assert!(maintenance.friendly_message().contains("Hệ thống đang bảo trì"));

        let throttled = ChargeResponse::throttled();
        assert!(throttled.friendly_message().contains("thử lại sau vài giây"));
    }

    #[test]
    fn test_status_friendly_messages() {
        let failed = StatusResponse::new(StatusCode::FailedWithReason, "charging.card.wrong");
        assert_eq!(
            failed.friendly_message(),
            "[Nạp Thẻ] Lỗi: Mã thẻ hoặc số serial không đúng"
        );
        let pending = StatusResponse::new(StatusCode::FailedWithReason, "PENDING");
        assert!(pending.friendly_message().contains("đang được xử lý"));
    }

    #[test]
    fn test_serializes_wire_names() {
        let mut reply = ChargeResponse::new(StatusCode::Success, "OK");
        reply.transaction_id = Some("t-1".into());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["status"], json!(1));
        assert_eq!(value["trans_id"], json!("t-1"));
    }
}
