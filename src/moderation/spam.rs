use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::UserId;

/// Per-user sliding time-window message-rate counter.
pub struct SpamDetector {
    windows: HashMap<UserId, VecDeque<DateTime<Utc>>>,
    window: Duration,
    threshold: usize,
}

impl SpamDetector {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            windows: HashMap::new(),
            window,
            threshold,
        }
    }

    /// Record a send time and report whether the user is bursting.
    ///
    /// Entries older than the window are pruned on every append. On a verdict
    /// the whole window is cleared, so a single burst yields exactly one
    /// verdict instead of firing on every following message.
    pub fn record_and_check(&mut self, user_id: UserId, now: DateTime<Utc>) -> bool {
        let window = self.windows.entry(user_id).or_default();
        window.push_back(now);

        let cutoff = now - self.window;
        while window.front().is_some_and(|t| *t < cutoff) {
            window.pop_front();
        }

        if window.len() > self.threshold {
            window.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64, millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + seconds * 1000 + millis)
            .unwrap()
    }

    #[test]
    fn test_burst_yields_exactly_one_verdict() {
        let mut detector = SpamDetector::new(Duration::seconds(3), 4);
        let user = UserId::new(1);

        // 5 messages within 2 seconds: threshold 4 exceeded on the 5th only
        let verdicts: Vec<bool> = (0..5)
            .map(|i| detector.record_and_check(user, at(0, i * 400)))
            .collect();
        assert_eq!(verdicts, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_spaced_messages_do_not_trigger() {
        let mut detector = SpamDetector::new(Duration::seconds(3), 4);
        let user = UserId::new(2);

        for i in 0..4 {
            assert!(!detector.record_and_check(user, at(i, 0)));
        }
    }

    #[test]
    fn test_window_resets_after_verdict() {
        let mut detector = SpamDetector::new(Duration::seconds(3), 4);
        let user = UserId::new(3);

        for i in 0..5 {
            detector.record_and_check(user, at(0, i * 100));
        }
        // Window cleared on the verdict; the next message starts fresh
        assert!(!detector.record_and_check(user, at(0, 600)));
    }

    #[test]
    fn test_users_are_independent() {
        let mut detector = SpamDetector::new(Duration::seconds(3), 4);
        for i in 0..5 {
            detector.record_and_check(UserId::new(10), at(0, i * 100));
        }
        assert!(!detector.record_and_check(UserId::new(11), at(0, 500)));
    }
}
