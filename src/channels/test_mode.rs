//! Global test-mode toggle (spec §4.12): redirects live sends to fixed
//! operator endpoints and caps daily volume, while recording the original
//! address on the activity record.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::ChannelKind;

/// Process-wide test-mode state. Flipped via `agency-osd admin toggle-test-mode`
/// (§6.5) and consulted by every driver's `send` before it touches a real
/// provider.
#[derive(Debug)]
pub struct TestModeState {
    enabled: AtomicBool,
    daily_cap: AtomicU32,
    sent_today: AtomicU32,
    operator_email: std::sync::RwLock<Option<String>>,
    operator_phone: std::sync::RwLock<Option<String>>,
}

impl Default for TestModeState {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            daily_cap: AtomicU32::new(15),
            sent_today: AtomicU32::new(0),
            operator_email: std::sync::RwLock::new(None),
            operator_phone: std::sync::RwLock::new(None),
        }
    }
}

impl TestModeState {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_daily_cap(&self, cap: u32) {
        self.daily_cap.store(cap, Ordering::SeqCst);
    }

    /// Resets the day's counter; called by the midnight rollover alongside
    /// the Rate Ledger (spec §4.2 pattern reused here for symmetry).
    pub fn reset_day(&self) {
        self.sent_today.store(0, Ordering::SeqCst);
    }

    pub fn operator_address(&self, channel: ChannelKind) -> Option<String> {
        match channel {
            ChannelKind::Email => self.operator_email.read().expect("lock poisoned").clone(),
            ChannelKind::Sms | ChannelKind::Voice => {
                self.operator_phone.read().expect("lock poisoned").clone()
            }
            ChannelKind::LinkedIn | ChannelKind::Mail => None,
        }
    }

    pub fn set_operator_email(&self, email: Option<String>) {
        *self.operator_email.write().expect("lock poisoned") = email;
    }

    pub fn set_operator_phone(&self, phone: Option<String>) {
        *self.operator_phone.write().expect("lock poisoned") = phone;
    }

    /// Redirects `address` when test mode is on, returning the address the
    /// driver should actually dispatch to, or `None` when the daily cap has
    /// been exhausted (the caller should record a `rejected` activity).
    pub fn redirect(&self, channel: ChannelKind, address: &str) -> Option<String> {
        if !self.is_enabled() {
            return Some(address.to_owned());
        }
        let cap = self.daily_cap.load(Ordering::SeqCst);
        let prev = self.sent_today.fetch_add(1, Ordering::SeqCst);
        if prev >= cap {
            self.sent_today.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        self.operator_address(channel).or_else(|| Some(address.to_owned()))
    }
}
