use poise::serenity_prelude::UserId;

use crate::kaggle::LeaderboardRow;
use crate::state::ContestParticipant;

/// Shorter side of a containment match must be at least this long. Guards
/// short identities ("jane") against unrelated teams ("Janet Smith");
/// normalized equality is always accepted regardless of length.
const MIN_CONTAINMENT_LEN: usize = 5;

/// A participant matched to a leaderboard row.
#[derive(Debug, Clone)]
pub struct MatchedResult {
    pub user_id: UserId,
    pub display_name: String,
    pub kaggle_id: String,
    pub team_name: String,
    pub member_user_names: Option<String>,
    pub score: Option<f64>,
    pub resolved_rank: Option<u32>,
    pub private_rank: Option<u32>,
}

/// Outcome of one reconciliation run. Derived, never stored; recomputed on
/// every request.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Sorted ascending by resolved rank, unresolvable ranks last.
    pub matched: Vec<MatchedResult>,
    /// Participants with no leaderboard row; reported, not dropped.
    pub unmatched: Vec<(UserId, String)>,
}

impl Reconciliation {
    /// User ids of the top `k` matched participants, for the winner role.
    pub fn top_user_ids(&self, k: usize) -> Vec<UserId> {
        self.matched.iter().take(k).map(|m| m.user_id).collect()
    }
}

/// Match registered participants against leaderboard rows and resolve ranks.
///
/// Identities and team fields are stripped to lowercase alphanumeric before
/// comparison. A row matches on normalized equality, or on containment in
/// either direction when the shorter side has at least
/// [`MIN_CONTAINMENT_LEN`] characters. First matching row wins. Rank comes
/// from the row's explicit rank column (public, then private) and falls back
/// to the row position when the snapshot carries no rank at all.
pub fn reconcile(
    participants: &[(UserId, ContestParticipant)],
    rows: &[LeaderboardRow],
) -> Reconciliation {
    let mut result = Reconciliation::default();

    for (user_id, participant) in participants {
        let needle = strip_identity(&participant.kaggle_id);
        if needle.is_empty() {
            result.unmatched.push((*user_id, participant.name.clone()));
            continue;
        }

        let hit = rows.iter().enumerate().find(|(_, row)| {
            row_fields(row).any(|field| identity_matches(&needle, &strip_identity(field)))
        });

        match hit {
            Some((position, row)) => {
                let resolved_rank = row
                    .public_rank
                    .or(row.private_rank)
                    .or(Some(position as u32 + 1));
                result.matched.push(MatchedResult {
                    user_id: *user_id,
                    display_name: participant.name.clone(),
                    kaggle_id: participant.kaggle_id.clone(),
                    team_name: row.team_name.clone(),
                    member_user_names: row.member_user_names.clone(),
                    score: row.score,
                    resolved_rank,
                    private_rank: row.private_rank,
                });
            }
            None => result.unmatched.push((*user_id, participant.name.clone())),
        }
    }

    result
        .matched
        .sort_by_key(|m| m.resolved_rank.unwrap_or(u32::MAX));
    result
}

/// The row fields an identity may appear in.
fn row_fields(row: &LeaderboardRow) -> impl Iterator<Item = &str> {
    std::iter::once(row.team_name.as_str()).chain(row.member_user_names.as_deref())
}

fn strip_identity(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn identity_matches(needle: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if needle == candidate {
        return true;
    }
    let shorter = needle.len().min(candidate.len());
    shorter >= MIN_CONTAINMENT_LEN && (candidate.contains(needle) || needle.contains(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(id: u64, name: &str, kaggle_id: &str) -> (UserId, ContestParticipant) {
        (
            UserId::new(id),
            ContestParticipant {
                name: name.to_string(),
                kaggle_id: kaggle_id.to_string(),
                registered_at: Utc::now(),
                confirmed: true,
            },
        )
    }

    fn row(team: &str, score: f64, public_rank: Option<u32>) -> LeaderboardRow {
        LeaderboardRow {
            team_name: team.to_string(),
            score: Some(score),
            public_rank,
            private_rank: None,
            member_user_names: None,
        }
    }

    #[test]
    fn test_punctuation_insensitive_containment() {
        let participants = vec![participant(1, "Jane", "janedoe")];
        let rows = vec![row("Jane Doe", 0.91, Some(4))];

        let result = reconcile(&participants, &rows);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].team_name, "Jane Doe");
        assert_eq!(result.matched[0].resolved_rank, Some(4));
    }

    #[test]
    fn test_short_id_does_not_false_match() {
        // "jane" (4 chars) is inside "janetsmith" but below the containment
        // length guard, so only exact normalized equality could match it
        let participants = vec![participant(1, "Jane", "jane")];
        let rows = vec![row("Janet Smith", 0.95, Some(1)), row("Jane", 0.5, Some(9))];

        let result = reconcile(&participants, &rows);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].team_name, "Jane");
    }

    #[test]
    fn test_unmatched_reported() {
        let participants = vec![
            participant(1, "A", "someuser"),
            participant(2, "B", "ghostuser"),
        ];
        let rows = vec![row("some_user", 0.7, Some(2))];

        let result = reconcile(&participants, &rows);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.unmatched[0].0, UserId::new(2));
    }

    #[test]
    fn test_sorted_by_rank_with_position_fallback() {
        let participants = vec![
            participant(1, "A", "alpha team"),
            participant(2, "B", "bravoteam"),
            participant(3, "C", "charlieteam"),
        ];
        // No rank columns at all: row position becomes the rank
        let rows = vec![
            LeaderboardRow {
                team_name: "charlieteam".to_string(),
                score: Some(0.99),
                public_rank: None,
                private_rank: None,
                member_user_names: None,
            },
            LeaderboardRow {
                team_name: "alphateam".to_string(),
                score: Some(0.98),
                public_rank: None,
                private_rank: None,
                member_user_names: None,
            },
            LeaderboardRow {
                team_name: "bravoteam".to_string(),
                score: Some(0.97),
                public_rank: None,
                private_rank: None,
                member_user_names: None,
            },
        ];

        let result = reconcile(&participants, &rows);
        let order: Vec<u64> = result.matched.iter().map(|m| m.user_id.get()).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(result.matched[0].resolved_rank, Some(1));
        assert_eq!(result.top_user_ids(2), vec![UserId::new(3), UserId::new(1)]);
    }

    #[test]
    fn test_member_usernames_column_matches() {
        let participants = vec![participant(1, "Dana", "dana_k")];
        let rows = vec![LeaderboardRow {
            team_name: "The Overfitters".to_string(),
            score: Some(0.88),
            public_rank: Some(7),
            private_rank: Some(5),
            member_user_names: Some("danak, someone_else".to_string()),
        }];

        let result = reconcile(&participants, &rows);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].resolved_rank, Some(7));
        assert_eq!(result.matched[0].private_rank, Some(5));
    }

    #[test]
    fn test_first_matching_row_wins() {
        let participants = vec![participant(1, "E", "echo_team")];
        let rows = vec![
            row("echoteam", 0.9, Some(3)),
            row("echoteam duplicate", 0.8, Some(8)),
        ];

        let result = reconcile(&participants, &rows);
        assert_eq!(result.matched[0].resolved_rank, Some(3));
    }
}
