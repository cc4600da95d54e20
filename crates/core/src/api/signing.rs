use md5::{Digest, Md5};

/// Lowercase hex MD5 of the concatenated parts.
fn md5_hex(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Signature of a charge, and of a status check that resends the card.
pub fn card_signature(partner_key: &str, code: &str, serial: &str) -> String {
    md5_hex(&[partner_key, code, serial])
}

/// Signature of a status check by request id alone.
pub fn request_signature(partner_key: &str, request_id: &str) -> String {
    md5_hex(&[partner_key, request_id])
}
