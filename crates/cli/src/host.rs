use console::style;
use napthe_core::DonationHost;
use napthe_types::messages;
use tracing::info;

/// Prints what a game server would broadcast or whisper.
pub struct ConsoleHost {
    bonus: i64,
}

impl ConsoleHost {
    pub fn new(bonus: i64) -> Self {
        Self { bonus }
    }

    pub fn credited(&self, amount: i64) -> i64 {
        amount.saturating_mul(self.bonus)
    }
}

impl DonationHost for ConsoleHost {
    fn notify_successful_donation(&self, player_name: &str, amount: i64) {
        let credited = self.credited(amount);
        info!(player = %player_name, amount, credited, "Donation credited");
        println!(
            "{} {}",
            style("[broadcast]").cyan(),
            messages::strip_formatting(&messages::donation_broadcast(player_name, amount))
        );
        println!(
            "{} {}",
            style(format!("[{player_name}]")).green(),
            messages::strip_formatting(&messages::donation_thanks(amount))
        );
    }

    fn notify_player_message(&self, player_name: &str, text: &str) {
        println!(
            "{} {}",
            style(format!("[{player_name}]")).yellow(),
            messages::strip_formatting(text)
        );
    }
}
