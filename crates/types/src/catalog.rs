use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Card denominations accepted by the provider, in VND.
pub const CARD_AMOUNTS: [i64; 6] = [10_000, 20_000, 50_000, 100_000, 200_000, 500_000];

/// Network operator (or game-card publisher) that issued a prepaid card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Telco {
    Viettel,
    Vina,
    Mobi,
    #[serde(rename = "VIETNAMMOBI")]
    VietnamMobi,
    Zing,
    Garena,
    #[serde(rename = "VCOIN")]
    VCoin,
    Gate,
}

impl Telco {
    pub const ALL: [Telco; 8] = [
        Telco::Viettel,
        Telco::Vina,
        Telco::Mobi,
        Telco::VietnamMobi,
        Telco::Zing,
        Telco::Garena,
        Telco::VCoin,
        Telco::Gate,
    ];

    /// Code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Telco::Viettel => "VIETTEL",
            Telco::Vina => "VINA",
            Telco::Mobi => "MOBI",
            Telco::VietnamMobi => "VIETNAMMOBI",
            Telco::Zing => "ZING",
            Telco::Garena => "GARENA",
            Telco::VCoin => "VCOIN",
            Telco::Gate => "GATE",
        }
    }

    /// Name shown to players.
    pub fn display_name(&self) -> &'static str {
        match self {
            Telco::Viettel => "Viettel",
            Telco::Vina => "VinaPhone",
            Telco::Mobi => "MobiFone",
            Telco::VietnamMobi => "Vietnamobile",
            Telco::Zing => "Zing",
            Telco::Garena => "Garena",
            Telco::VCoin => "VCoin",
            Telco::Gate => "Gate",
        }
    }
}

impl fmt::Display for Telco {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown telco '{0}', expected one of VIETTEL, VINA, MOBI, VIETNAMMOBI, ZING, GARENA, VCOIN, GATE")]
pub struct UnknownTelco(pub String);

impl FromStr for Telco {
    type Err = UnknownTelco;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Telco::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(wanted) || t.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTelco(s.to_string()))
    }
}

pub fn is_valid_denomination(amount: i64) -> bool {
    CARD_AMOUNTS.contains(&amount)
}

/// Format an amount with `.` thousands separators and the dong sign,
/// e.g. `50000` becomes `50.000₫`.
pub fn format_denomination(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped}₫")
}
