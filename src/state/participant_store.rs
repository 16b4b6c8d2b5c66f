use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user confirmed as entered in the current contest poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub name: String,
    pub kaggle_id: String,
    pub registered_at: DateTime<Utc>,
    pub confirmed: bool,
}

/// Participants of the current poll, keyed by Discord ID (as string).
///
/// Fully rewritten on every mutation and fully cleared when a new poll is
/// created; only the identity store survives across polls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantStore {
    entries: HashMap<String, ContestParticipant>,
}

impl ParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &str) -> crate::error::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| crate::error::BotError::StateParse {
                    path: path.to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(crate::error::BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<&ContestParticipant> {
        self.entries.get(user_id)
    }

    pub fn is_confirmed(&self, user_id: &str) -> bool {
        self.entries
            .get(user_id)
            .map(|p| p.confirmed)
            .unwrap_or(false)
    }

    /// Confirm a participant, replacing any prior entry for the same user.
    pub fn confirm(&mut self, user_id: &str, name: &str, kaggle_id: &str) {
        self.entries.insert(
            user_id.to_string(),
            ContestParticipant {
                name: name.to_string(),
                kaggle_id: kaggle_id.to_string(),
                registered_at: Utc::now(),
                confirmed: true,
            },
        );
    }

    /// Update the Kaggle username on an existing entry (identity re-claims
    /// propagate into the current poll).
    pub fn update_kaggle_id(&mut self, user_id: &str, kaggle_id: &str) -> bool {
        match self.entries.get_mut(user_id) {
            Some(participant) => {
                participant.kaggle_id = kaggle_id.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a participant, returning their Kaggle username if present.
    pub fn remove(&mut self, user_id: &str) -> Option<String> {
        self.entries.remove(user_id).map(|p| p.kaggle_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContestParticipant)> {
        self.entries.iter()
    }
}

/// Shared participant store type
pub type SharedParticipantStore = Arc<tokio::sync::RwLock<ParticipantStore>>;

pub fn create_shared_participant_store(store: ParticipantStore) -> SharedParticipantStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_and_remove() {
        let mut store = ParticipantStore::new();

        store.confirm("1", "Jane", "janedoe");
        assert!(store.is_confirmed("1"));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("1").as_deref(), Some("janedoe"));
        assert!(!store.is_confirmed("1"));
        assert!(store.remove("1").is_none());
    }

    #[test]
    fn test_update_kaggle_id() {
        let mut store = ParticipantStore::new();
        store.confirm("1", "Jane", "janedoe");

        assert!(store.update_kaggle_id("1", "jane2"));
        assert_eq!(store.get("1").unwrap().kaggle_id, "jane2");
        assert!(!store.update_kaggle_id("2", "nobody"));
    }

    #[test]
    fn test_clear() {
        let mut store = ParticipantStore::new();
        store.confirm("1", "A", "a");
        store.confirm("2", "B", "b");

        store.clear();
        assert!(store.is_empty());
    }
}
