use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Suppresses repeat scans of the same code for a cooldown window.
///
/// Each accepted text is remembered with its expiry instant. Expired entries
/// are dropped at the start of every check, so acceptance and expiry happen
/// in one step on the caller's thread and nothing runs in the background.
#[derive(Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    /// `None` marks a window that outlasts the clock and never closes.
    expiries: HashMap<String, Option<Instant>>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            expiries: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn should_accept(&mut self, text: &str) -> bool {
        self.should_accept_at(text, Instant::now())
    }

    /// Returns true and starts a window for `text` unless one is still open
    /// at `now`. A window is closed once `now` reaches its expiry.
    pub fn should_accept_at(&mut self, text: &str, now: Instant) -> bool {
        self.expiries
            .retain(|_, expiry| expiry.map_or(true, |expiry| expiry > now));

        if self.expiries.contains_key(text) {
            return false;
        }

        self.expiries
            .insert(text.to_string(), now.checked_add(self.cooldown));
        true
    }

    /// Number of codes currently inside their window (as of the last check).
    pub fn suppressed_len(&self) -> usize {
        self.expiries.len()
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
