use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;

/// Per-user message activity. Created lazily on the first observed message,
/// never deleted. In-memory only.
#[derive(Debug, Clone)]
pub struct UserActivityRecord {
    pub message_count: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ActivityTracker {
    records: HashMap<UserId, UserActivityRecord>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&mut self, user_id: UserId, now: DateTime<Utc>) {
        self.records
            .entry(user_id)
            .and_modify(|r| {
                r.message_count += 1;
                r.last_seen = now;
            })
            .or_insert(UserActivityRecord {
                message_count: 1,
                last_seen: now,
            });
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserActivityRecord> {
        self.records.get(&user_id)
    }

    pub fn active_users(&self) -> usize {
        self.records.len()
    }

    pub fn total_messages(&self) -> u64 {
        self.records.values().map(|r| r.message_count).sum()
    }
}

/// Shared activity tracker type
pub type SharedActivityTracker = Arc<tokio::sync::RwLock<ActivityTracker>>;

pub fn create_shared_activity_tracker(tracker: ActivityTracker) -> SharedActivityTracker {
    Arc::new(tokio::sync::RwLock::new(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation_and_counting() {
        let mut tracker = ActivityTracker::new();
        let user = UserId::new(1);
        assert!(tracker.get(user).is_none());

        tracker.record_message(user, Utc::now());
        tracker.record_message(user, Utc::now());
        tracker.record_message(UserId::new(2), Utc::now());

        assert_eq!(tracker.get(user).unwrap().message_count, 2);
        assert_eq!(tracker.active_users(), 2);
        assert_eq!(tracker.total_messages(), 3);
    }
}
