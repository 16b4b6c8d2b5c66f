//! Thin client for the public Kaggle API.
//!
//! Consumed as a black box: competitions are listed by search term and the
//! leaderboard is fetched as the platform's structured row listing. All
//! failures surface as descriptive [`BotError`] values; nothing here touches
//! bot state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{BotError, Result};

const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";

/// A competition as reported by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Competition {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// One leaderboard row. Rank columns are optional: the view endpoint orders
/// rows by rank without always reporting the number itself.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "teamName", default)]
    pub team_name: String,
    #[serde(default, deserialize_with = "flexible_score")]
    pub score: Option<f64>,
    #[serde(rename = "publicRank", default)]
    pub public_rank: Option<u32>,
    #[serde(rename = "privateRank", default)]
    pub private_rank: Option<u32>,
    #[serde(rename = "teamMemberUserNames", default)]
    pub member_user_names: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    #[serde(default)]
    submissions: Vec<LeaderboardRow>,
}

/// Kaggle reports scores as strings; accept string, number or null.
fn flexible_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub struct KaggleClient {
    http: reqwest::Client,
    username: String,
    key: String,
    base_url: String,
}

impl KaggleClient {
    pub fn new(username: &str, key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            username: username.to_string(),
            key: key.to_string(),
            base_url: KAGGLE_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Search competitions by term.
    pub async fn list_competitions(&self, search: &str) -> Result<Vec<Competition>> {
        let url = format!("{}/competitions/list", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.key))
            .query(&[("search", search)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::Kaggle {
                message: format!("competition list returned HTTP {}", response.status()),
            });
        }

        let competitions: Vec<Competition> = response.json().await.map_err(|e| BotError::Kaggle {
            message: format!("could not parse competition list: {}", e),
        })?;
        debug!(
            "Kaggle returned {} competitions for '{}'",
            competitions.len(),
            search
        );
        Ok(competitions)
    }

    /// Look up one competition by its exact reference.
    pub async fn find_competition(&self, reference: &str) -> Result<Competition> {
        let competitions = self.list_competitions(reference).await?;
        competitions
            .into_iter()
            .find(|c| c.reference == reference || c.reference.ends_with(&format!("/{}", reference)))
            .ok_or_else(|| BotError::CompetitionNotFound {
                reference: reference.to_string(),
            })
    }

    /// Fetch the current leaderboard rows, best rank first.
    pub async fn fetch_leaderboard(&self, reference: &str) -> Result<Vec<LeaderboardRow>> {
        let url = format!("{}/competitions/{}/leaderboard/view", self.base_url, reference);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.key))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BotError::CompetitionNotFound {
                reference: reference.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(BotError::Kaggle {
                message: format!("leaderboard fetch returned HTTP {}", response.status()),
            });
        }

        let body: LeaderboardResponse =
            response
                .json()
                .await
                .map_err(|e| BotError::MalformedLeaderboard {
                    message: e.to_string(),
                })?;
        Ok(body.submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_row_parsing() {
        let json = r#"{
            "submissions": [
                {"teamName": "Jane Doe", "score": "0.97531", "publicRank": 1},
                {"teamName": "Team Two", "score": 0.95,
                 "teamMemberUserNames": "alice, bob"},
                {"teamName": "No Score"}
            ]
        }"#;

        let parsed: LeaderboardResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.submissions.len(), 3);
        assert_eq!(parsed.submissions[0].score, Some(0.97531));
        assert_eq!(parsed.submissions[0].public_rank, Some(1));
        assert_eq!(parsed.submissions[1].score, Some(0.95));
        assert_eq!(
            parsed.submissions[1].member_user_names.as_deref(),
            Some("alice, bob")
        );
        assert!(parsed.submissions[2].score.is_none());
        assert!(parsed.submissions[2].public_rank.is_none());
    }

    #[test]
    fn test_competition_parsing() {
        let json = r#"[
            {"ref": "titanic", "title": "Titanic", "deadline": "2030-01-01T00:00:00Z"},
            {"ref": "spaceship-titanic", "title": "Spaceship Titanic"}
        ]"#;

        let parsed: Vec<Competition> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].reference, "titanic");
        assert!(parsed[0].deadline.is_some());
        assert!(parsed[1].deadline.is_none());
    }
}
