//! Redaction of card secrets before they reach any diagnostic output.

const MASK: &str = "****";

fn keep_ends(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return MASK.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{start}{MASK}{end}")
}

/// `0123456789` becomes `01****89`.
pub fn mask_code(code: &str) -> String {
    keep_ends(code, 2, 2)
}

/// `1000123456789` becomes `1000****6789`.
pub fn mask_serial(serial: &str) -> String {
    keep_ends(serial, 4, 4)
}

/// Keep the first 8 characters of a signature.
pub fn mask_sign(sign: &str) -> String {
    let head: String = sign.chars().take(8).collect();
    format!("{head}...")
}
