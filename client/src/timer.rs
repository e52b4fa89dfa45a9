//! A small keyed timer queue plus the race between "next timer due" and "socket readable"
//! that drives the state machine's single-threaded event loop.
//!
//! One [`Timers`] per interface, matching the ownership rule that nothing but the global
//! option-descriptor table is shared across interfaces.

use std::time::{Duration, Instant};

/// Distinguishes the timers an interface can have outstanding. Re-arming a key replaces
/// its deadline; there is at most one deadline per key at a time.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TimerKey {
    Retransmit,
    Renew,
    Rebind,
    Expire,
    OfferTimeout,
    ArpProbe,
    ArpAnnounce,
    CoolOff,
}

const MAX_TIMERS: usize = 8;

#[derive(Copy, Clone)]
struct Entry {
    key: TimerKey,
    at: Instant,
}

/// Chronologically ordered keyed deadlines. `MAX_TIMERS` comfortably covers the handful
/// of concurrent timers a single interface's FSM ever arms.
pub struct Timers {
    entries: heapless::Vec<Entry, MAX_TIMERS>,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` to fire at `at`, replacing any existing deadline for the same key.
    pub fn set(&mut self, key: TimerKey, at: Instant) {
        self.cancel(key);
        // MAX_TIMERS bounds the key enum's own variant count, so this cannot overflow.
        let _ = self.entries.push(Entry { key, at });
        self.entries.sort_unstable_by_key(|e| e.at);
    }

    pub fn set_in(&mut self, key: TimerKey, delay: Duration) {
        self.set(key, Instant::now() + delay);
    }

    pub fn cancel(&mut self, key: TimerKey) {
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            self.entries.remove(pos);
        }
    }

    /// Cancels every timer except the ones in `keep` — used to clear an interface's
    /// timers on a phase change while leaving e.g. the expiry timer untouched.
    pub fn cancel_all_except(&mut self, keep: &[TimerKey]) {
        self.entries.retain(|e| keep.contains(&e.key));
    }

    pub fn is_set(&self, key: TimerKey) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// The soonest deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.at)
    }

    /// Pops every timer due at or before `now`, in chronological (insertion-tiebroken)
    /// order, leaving later ones armed.
    pub fn drain_due(&mut self, now: Instant) -> heapless::Vec<TimerKey, MAX_TIMERS> {
        let mut due = heapless::Vec::new();
        while let Some(entry) = self.entries.first().copied() {
            if entry.at > now {
                break;
            }
            self.entries.remove(0);
            let _ = due.push(entry.key);
        }
        due
    }

    /// Sleeps until the next deadline, or forever if none is armed (the caller races
    /// this against socket readability, so "forever" just means "don't wake for a timer").
    pub async fn sleep_until_next(&self) {
        match self.next_deadline() {
            Some(at) => {
                let now = Instant::now();
                let delay = at.saturating_duration_since(now);
                async_io::Timer::after(delay).await;
            }
            None => core::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_timers_pop_in_chronological_order() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.set(TimerKey::Rebind, now + Duration::from_secs(2));
        timers.set(TimerKey::Renew, now + Duration::from_secs(1));

        let due = timers.drain_due(now + Duration::from_secs(3));
        assert_eq!(&due[..], &[TimerKey::Renew, TimerKey::Rebind]);
        assert!(timers.next_deadline().is_none());
    }

    #[test]
    fn setting_a_key_again_replaces_it() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.set(TimerKey::Expire, now + Duration::from_secs(10));
        timers.set(TimerKey::Expire, now + Duration::from_secs(5));

        assert_eq!(timers.next_deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn cancel_all_except_keeps_named_keys() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.set(TimerKey::Renew, now);
        timers.set(TimerKey::Rebind, now);
        timers.set(TimerKey::Expire, now);

        timers.cancel_all_except(&[TimerKey::Expire]);

        assert!(!timers.is_set(TimerKey::Renew));
        assert!(!timers.is_set(TimerKey::Rebind));
        assert!(timers.is_set(TimerKey::Expire));
    }
}
