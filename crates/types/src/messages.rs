//! Player facing message catalogue.
//!
//! Provider replies carry terse machine keys (`charging.card.wrong`,
//! `card_existed`, ...) or free text. Players only ever see the friendly
//! Vietnamese rendering produced here; the raw text is a last resort that
//! still goes through [`translate_error_message`].

use crate::catalog::format_denomination;

/// Prefix of every chat message the plugin sends.
pub const PREFIX: &str = "[Nạp Thẻ] ";

const COLOR_ERROR: &str = "§c";
const COLOR_SUCCESS: &str = "§a";
const COLOR_INFO: &str = "§e";

pub const CARD_ALREADY_USED: &str = "Thẻ này đã được sử dụng trước đó";
pub const DEFAULT_FAILURE: &str = "Có lỗi xảy ra khi xử lý thẻ";
pub const EMPTY_CARD_INPUT: &str = "Vui lòng không để trống số sê-ri hoặc mã thẻ!";
pub const PROCESSING_NOTICE: &str = "Thẻ của bạn đang được xử lý, vui lòng đợi...";

/// Known provider keys, checked in order.
const ERROR_MAPPINGS: &[(&str, &str)] = &[
    ("charging.card_existed", CARD_ALREADY_USED),
    ("charging.card.wrong", "Mã thẻ hoặc số serial không đúng"),
    ("charging.card.notmatch", "Mệnh giá thẻ không khớp với giá trị đã chọn"),
    ("charging.card.unknown", "Không thể xác định thông tin thẻ"),
    ("charging.card.invalid", "Thẻ không hợp lệ hoặc đã bị khóa"),
    ("charging.card.timeout", "Quá thời gian xử lý thẻ, vui lòng thử lại sau"),
    ("charging.card.provider_error", "Lỗi từ nhà mạng, vui lòng thử lại sau"),
    ("charging.pending", "Thẻ đang được xử lý, vui lòng đợi"),
    ("system.maintenance", "Hệ thống đang bảo trì, vui lòng thử lại sau"),
    ("charging.invalid_card_code", "Mã thẻ không hợp lệ, vui lòng kiểm tra lại"),
    ("charging.invalid_serial", "Số serial không hợp lệ, vui lòng kiểm tra lại"),
    ("charging.wrong_telco", "Loại thẻ không đúng, vui lòng chọn đúng nhà mạng"),
    ("charging.invalid_amount", "Mệnh giá thẻ không đúng, vui lòng chọn đúng mệnh giá"),
    ("charging.card.used", "Thẻ đã được sử dụng trước đó"),
    ("charging.invalid_partner", "Lỗi xác thực đối tác thanh toán"),
    ("charging.wrong_format", "Định dạng thẻ không đúng"),
    ("charging.invalid_sign", "Lỗi xác thực chữ ký"),
    ("charging.invalid_request", "Yêu cầu không hợp lệ"),
    ("charging.card.locked", "Thẻ đã bị khóa hoặc tạm ngưng"),
    ("charging.invalid_telco", "Nhà mạng không được hỗ trợ"),
    ("charging.telco_maintain", "Nhà mạng đang bảo trì"),
    (
        "charging.too_many_requests",
        "Bạn thao tác quá nhanh, vui lòng thử lại sau vài giây",
    ),
    ("connection.failed", "Không thể kết nối đến máy chủ thanh toán"),
    ("connection.timeout", "Kết nối đến máy chủ thanh toán quá thời gian chờ"),
    ("payment.successful", "Thẻ nạp thành công!"),
    ("default", DEFAULT_FAILURE),
];

/// Word-level fallbacks, applied in order.
const TECHNICAL_TERMS: &[(&str, &str)] = &[
    ("charging", "Nạp thẻ"),
    ("card", "thẻ"),
    ("invalid", "không hợp lệ"),
    ("wrong", "không đúng"),
    ("error", "lỗi"),
    ("telco", "nhà mạng"),
    ("serial", "số seri"),
    ("code", "mã thẻ"),
    ("used", "đã sử dụng"),
    ("existed", "đã tồn tại"),
    ("amount", "mệnh giá"),
    ("process", "xử lý"),
    ("maintenance", "bảo trì"),
    ("system", "hệ thống"),
    ("pending", "đang xử lý"),
    ("request", "yêu cầu"),
    ("partner", "đối tác"),
    ("sign", "chữ ký"),
];

const VIETNAMESE_MARKS: &str = "àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡùúụủũưừứựửữỳýỵỷỹđ";

/// Messages produced locally that must not be translated again.
const LOCAL_MARKERS: &[&str] = &["Vui lòng không để trống", "để trống số sê-ri", "sê-ri hoặc mã thẻ"];

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turn a provider message (key or free text) into a friendly sentence.
pub fn translate_error_message(raw: &str) -> String {
    if LOCAL_MARKERS.iter().any(|m| raw.contains(m)) {
        return raw.to_string();
    }

    if raw.contains("card_existed") {
        return CARD_ALREADY_USED.to_string();
    }

    if let Some((_, friendly)) = ERROR_MAPPINGS.iter().find(|(key, _)| *key == raw) {
        return friendly.to_string();
    }

    if let Some((_, friendly)) = ERROR_MAPPINGS
        .iter()
        .find(|(key, _)| raw.starts_with(key) || contains_ci(raw, key))
    {
        return friendly.to_string();
    }

    if contains_ci(raw, "wrong") && contains_ci(raw, "card") {
        return "Thông tin thẻ không chính xác".to_string();
    }
    if contains_ci(raw, "invalid") && contains_ci(raw, "code") {
        return "Mã thẻ không hợp lệ".to_string();
    }
    if contains_ci(raw, "invalid") && contains_ci(raw, "serial") {
        return "Số serial không hợp lệ".to_string();
    }
    if contains_ci(raw, "timeout") {
        return "Quá thời gian xử lý thẻ, vui lòng thử lại sau".to_string();
    }
    if contains_ci(raw, "maintain") {
        return "Hệ thống đang bảo trì, vui lòng thử lại sau".to_string();
    }

    if raw.chars().any(|c| VIETNAMESE_MARKS.contains(c)) {
        return raw.to_string();
    }

    let replaced = TECHNICAL_TERMS
        .iter()
        .fold(raw.to_string(), |acc, (technical, friendly)| acc.replace(technical, friendly));
    if replaced != raw {
        let spaced: String = replaced
            .chars()
            .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
            .collect();
        return upper_first(&spaced);
    }

    DEFAULT_FAILURE.to_string()
}

/// Translate then prefix as an error line.
pub fn format_error_message(raw: &str) -> String {
    format!("{PREFIX}{COLOR_ERROR}{}", translate_error_message(raw))
}

pub fn format_success_message(text: &str) -> String {
    format!("{PREFIX}{COLOR_SUCCESS}{text}")
}

pub fn format_info_message(text: &str) -> String {
    format!("{PREFIX}{COLOR_INFO}{text}")
}

pub fn format_amount(amount: i64) -> String {
    format_denomination(amount)
}

/// Private notice for a queued card the provider later rejected.
pub fn card_rejected_message(raw: &str) -> String {
    format!(
        "{PREFIX}{COLOR_ERROR}Thẻ không hợp lệ: {}",
        translate_error_message(raw)
    )
}

/// Rejection shown when a player submits again inside the cooldown.
pub fn submit_cooldown_message(remaining_secs: u64) -> String {
    format!("Gửi quá nhanh! Vui lòng đợi {remaining_secs} giây trước khi gửi lại.")
}

/// Server-wide announcement for a completed donation.
pub fn donation_broadcast(player: &str, amount: i64) -> String {
    format!(
        "{PREFIX}Người chơi {player} đã nạp {} để ủng hộ máy chủ!",
        format_amount(amount)
    )
}

/// Private thank-you for the donating player.
pub fn donation_thanks(amount: i64) -> String {
    format_success_message(&format!(
        "Chân thành cảm ơn bạn đã ủng hộ máy chủ {}!",
        format_amount(amount)
    ))
}

/// Remove `§x` colour codes for plain terminals and log files.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}
