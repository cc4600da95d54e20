//! Shared data types for NapThe card redemption.
//!
//! Everything in this crate is pure: decoding of provider replies, status
//! classification, the payment record, the telco catalogue and the player
//! facing message catalogue. Network access and scheduling live in
//! `napthe-core`.

pub mod catalog;
pub mod codec;
pub mod masking;
pub mod messages;
pub mod payment;
pub mod response;

pub use catalog::{CARD_AMOUNTS, Telco, UnknownTelco, format_denomination, is_valid_denomination};
pub use payment::{AlreadyResolved, CardPayment, PaymentStatus};
pub use response::{
    ChargeResponse, DecodeError, ProviderReply, ReplyClass, StatusCode, StatusResponse,
};

/// Message a reply carries when the provider could not be reached or decoded.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Message key used by locally throttled replies.
pub const THROTTLED_MESSAGE: &str = "charging.too_many_requests";
