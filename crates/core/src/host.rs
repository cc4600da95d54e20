/// Callbacks into the game server embedding the core.
///
/// Both are fire-and-forget. Implementations decide what "offline" means:
/// a donation is always recorded, a chat message to an absent player is dropped.
pub trait DonationHost: Send + Sync {
    /// Credit `amount` to `player_name`, announce it and thank the player.
    fn notify_successful_donation(&self, player_name: &str, amount: i64);

    /// Deliver an already formatted chat line to `player_name`.
    fn notify_player_message(&self, player_name: &str, text: &str);
}
