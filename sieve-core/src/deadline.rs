//! Absolute wall-clock deadlines: the three nested deadlines (scanner,
//! distribution, request) are all expressed the same way — an
//! absolute epoch-seconds instant — so an inner deadline is always
//! comparable against (and strictly earlier than) its enclosing one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An absolute wall-clock deadline, in epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Deadline(pub f64);

fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl Deadline {
    pub fn at_epoch_secs(epoch_secs: f64) -> Self {
        Self(epoch_secs)
    }

    /// `secs` seconds from now.
    pub fn from_now(secs: f64) -> Self {
        Self(now_epoch_secs() + secs)
    }

    pub fn epoch_secs(&self) -> f64 {
        self.0
    }

    /// Time remaining until this deadline, clamped at zero.
    pub fn remaining(&self) -> Duration {
        let delta = self.0 - now_epoch_secs();
        Duration::from_secs_f64(delta.max(0.0))
    }

    pub fn is_expired(&self) -> bool {
        self.0 <= now_epoch_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_now_is_in_the_future() {
        let d = Deadline::from_now(5.0);
        assert!(!d.is_expired());
        assert!(d.remaining().as_secs_f64() > 0.0);
    }

    #[test]
    fn past_deadline_is_expired_with_zero_remaining() {
        let d = Deadline::from_now(-1.0);
        assert!(d.is_expired());
        assert_eq!(d.remaining(), Duration::ZERO);
    }
}
