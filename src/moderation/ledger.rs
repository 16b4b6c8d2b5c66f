use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::UserId;
use tracing::debug;

/// A message the classifier flagged, kept for display in warnings.
#[derive(Debug, Clone)]
pub struct FlaggedMessage {
    pub content: String,
    pub channel_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user violation counters and the recent-offense log.
#[derive(Debug, Clone, Default)]
pub struct ViolationRecord {
    pub count: u32,
    pub recent_messages: Vec<FlaggedMessage>,
    pub timeout_strikes: u32,
}

/// What the caller must act on after recording a violation.
///
/// The ledger itself performs no side effects; message deletion, DMs, the
/// admin-channel alert and the actual timeout are the caller's job and are
/// best-effort.
#[derive(Debug, Clone)]
pub enum EscalationOutcome {
    /// Below threshold, nothing to do beyond the deletion the caller already did.
    Recorded { count: u32 },
    /// Threshold hit: warn the user and the admin channel with the evidence.
    /// When `timeout` is set this was the third warning and the user must
    /// additionally be timed out for that duration.
    ThresholdReached {
        violation_count: u32,
        evidence: Vec<FlaggedMessage>,
        timeout: Option<Duration>,
    },
}

/// Owns the discipline policy: violation counting, warning thresholds and the
/// warning-to-timeout cadence.
pub struct EscalationLedger {
    records: HashMap<UserId, ViolationRecord>,
    threshold: u32,
    max_recent: usize,
    strike_limit: u32,
    timeout_duration: Duration,
}

impl EscalationLedger {
    pub fn new(
        threshold: u32,
        max_recent: usize,
        strike_limit: u32,
        timeout_duration: Duration,
    ) -> Self {
        Self {
            records: HashMap::new(),
            threshold,
            max_recent,
            strike_limit,
            timeout_duration,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record one flagged message and report what escalation it triggered.
    ///
    /// At the threshold the count and offense log reset atomically with the
    /// returned outcome, so the next violation starts a fresh cycle. Timeout
    /// strikes only reset once a timeout is actually carried in the outcome.
    pub fn record_violation(
        &mut self,
        user_id: UserId,
        content: &str,
        channel_name: &str,
        now: DateTime<Utc>,
    ) -> EscalationOutcome {
        let record = self.records.entry(user_id).or_default();

        record.count += 1;
        record.recent_messages.push(FlaggedMessage {
            content: content.to_string(),
            channel_name: channel_name.to_string(),
            timestamp: now,
        });
        if record.recent_messages.len() > self.max_recent {
            let excess = record.recent_messages.len() - self.max_recent;
            record.recent_messages.drain(..excess);
        }

        if record.count < self.threshold {
            return EscalationOutcome::Recorded {
                count: record.count,
            };
        }

        let violation_count = record.count;
        let evidence: Vec<FlaggedMessage> = record
            .recent_messages
            .iter()
            .rev()
            .take(3)
            .rev()
            .cloned()
            .collect();

        record.count = 0;
        record.recent_messages.clear();
        record.timeout_strikes += 1;

        let timeout = if record.timeout_strikes >= self.strike_limit {
            record.timeout_strikes = 0;
            Some(self.timeout_duration)
        } else {
            None
        };

        debug!(
            "Violation threshold reached for user {} (timeout: {})",
            user_id,
            timeout.is_some()
        );

        EscalationOutcome::ThresholdReached {
            violation_count,
            evidence,
            timeout,
        }
    }

    /// Record for one user, if any violations are on file.
    pub fn get(&self, user_id: UserId) -> Option<&ViolationRecord> {
        self.records.get(&user_id)
    }

    /// All users currently carrying a non-zero violation count.
    pub fn users_with_violations(&self) -> Vec<(UserId, &ViolationRecord)> {
        let mut users: Vec<_> = self
            .records
            .iter()
            .filter(|(_, r)| r.count > 0)
            .map(|(id, r)| (*id, r))
            .collect();
        users.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        users
    }

    /// Clear the count and offense log for a user. Returns false if the user
    /// had nothing on file.
    pub fn clear(&mut self, user_id: UserId) -> bool {
        match self.records.get_mut(&user_id) {
            Some(record) => {
                record.count = 0;
                record.recent_messages.clear();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> EscalationLedger {
        EscalationLedger::new(15, 10, 3, Duration::hours(6))
    }

    fn record_n(ledger: &mut EscalationLedger, user: UserId, n: u32) -> Vec<EscalationOutcome> {
        (0..n)
            .map(|i| ledger.record_violation(user, &format!("msg {}", i), "general", Utc::now()))
            .collect()
    }

    #[test]
    fn test_threshold_fires_exactly_at_t() {
        let mut ledger = ledger();
        let user = UserId::new(1);

        let outcomes = record_n(&mut ledger, user, 15);
        for outcome in &outcomes[..14] {
            assert!(matches!(outcome, EscalationOutcome::Recorded { .. }));
        }
        match &outcomes[14] {
            EscalationOutcome::ThresholdReached {
                violation_count,
                evidence,
                timeout,
            } => {
                assert_eq!(*violation_count, 15);
                assert_eq!(evidence.len(), 3);
                assert_eq!(evidence[2].content, "msg 14");
                assert!(timeout.is_none());
            }
            other => panic!("expected threshold outcome, got {:?}", other),
        }

        // Counters reset: the 16th violation starts a fresh cycle
        match ledger.record_violation(user, "again", "general", Utc::now()) {
            EscalationOutcome::Recorded { count } => assert_eq!(count, 1),
            other => panic!("expected fresh cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_on_every_third_warning() {
        let mut ledger = ledger();
        let user = UserId::new(2);

        let mut timeouts = 0;
        for cycle in 1..=6 {
            let outcomes = record_n(&mut ledger, user, 15);
            match outcomes.last().unwrap() {
                EscalationOutcome::ThresholdReached { timeout, .. } => {
                    if timeout.is_some() {
                        timeouts += 1;
                        assert!(cycle % 3 == 0, "timeout fired on cycle {}", cycle);
                        assert_eq!(*timeout, Some(Duration::hours(6)));
                    }
                }
                other => panic!("cycle {} did not reach threshold: {:?}", cycle, other),
            }
        }
        assert_eq!(timeouts, 2);
    }

    #[test]
    fn test_recent_messages_bounded() {
        let mut ledger = EscalationLedger::new(100, 5, 3, Duration::hours(6));
        let user = UserId::new(3);
        record_n(&mut ledger, user, 12);

        let record = ledger.get(user).unwrap();
        assert_eq!(record.recent_messages.len(), 5);
        assert_eq!(record.recent_messages[0].content, "msg 7");
        assert_eq!(record.recent_messages[4].content, "msg 11");
    }

    #[test]
    fn test_clear() {
        let mut ledger = ledger();
        let user = UserId::new(4);
        record_n(&mut ledger, user, 5);

        assert!(ledger.clear(user));
        assert_eq!(ledger.get(user).unwrap().count, 0);
        assert!(ledger.users_with_violations().is_empty());
        assert!(!ledger.clear(UserId::new(99)));
    }
}
