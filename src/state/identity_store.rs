use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's durable link to their Kaggle account.
///
/// The only per-user state that survives across contest polls. Owned
/// exclusively by the claiming user and never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaggleIdentity {
    /// Display name at the time of the claim
    pub name: String,

    /// Kaggle username, stored as supplied
    pub kaggle_id: String,

    /// When the identity was first claimed
    pub registered_at: DateTime<Utc>,

    /// Set on every re-claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Durable map of Discord ID (as string) to claimed Kaggle identity.
///
/// Persisted as a single JSON document keyed by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityStore {
    entries: HashMap<String, KaggleIdentity>,
}

impl IdentityStore {
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

        // Write to temp file first, then rename for atomicity
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

    pub fn get(&self, user_id: &str) -> Option<&KaggleIdentity> {
        self.entries.get(user_id)
    }

    /// Claim or re-claim an identity. Returns the previous Kaggle username on
    /// a re-claim.
    pub fn claim(&mut self, user_id: &str, name: &str, kaggle_id: &str) -> Option<String> {
        match self.entries.get_mut(user_id) {
            Some(existing) => {
                let previous = existing.kaggle_id.clone();
                existing.kaggle_id = kaggle_id.to_string();
                existing.name = name.to_string();
                existing.updated_at = Some(Utc::now());
                Some(previous)
            }
            None => {
                self.entries.insert(
                    user_id.to_string(),
                    KaggleIdentity {
                        name: name.to_string(),
                        kaggle_id: kaggle_id.to_string(),
                        registered_at: Utc::now(),
                        updated_at: None,
                    },
                );
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared identity store type
pub type SharedIdentityStore = Arc<tokio::sync::RwLock<IdentityStore>>;

pub fn create_shared_identity_store(store: IdentityStore) -> SharedIdentityStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_reclaim() {
        let mut store = IdentityStore::new();

        assert!(store.claim("123", "Jane", "janedoe").is_none());
        let identity = store.get("123").unwrap();
        assert_eq!(identity.kaggle_id, "janedoe");
        assert!(identity.updated_at.is_none());

        let previous = store.claim("123", "Jane", "jane_doe_v2");
        assert_eq!(previous.as_deref(), Some("janedoe"));
        let identity = store.get("123").unwrap();
        assert_eq!(identity.kaggle_id, "jane_doe_v2");
        assert!(identity.updated_at.is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut store = IdentityStore::new();
        store.claim("42", "Bob", "bob123");

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["42"]["kaggle_id"], "bob123");

        let roundtrip: IdentityStore = serde_json::from_value(json).unwrap();
        assert_eq!(roundtrip.get("42").unwrap().kaggle_id, "bob123");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let store = IdentityStore::load("/nonexistent/kaggle_ids.json")
            .await
            .unwrap();
        assert!(store.is_empty());
    }
}
