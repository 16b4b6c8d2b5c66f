use chrono::Duration;
use poise::serenity_prelude::ChannelId;

use crate::moderation::ClassifierMode;

/// All runtime configuration, collected once at startup from the environment.
///
/// Core logic never reads env vars directly; thresholds and channel ids are
/// passed in through this struct.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Channel that receives moderation threshold alerts.
    pub warning_channel: Option<ChannelId>,

    /// Channel that receives published contest leaderboards.
    pub leaderboard_channel: Option<ChannelId>,

    /// Channel that receives the daily activity digest.
    pub stats_channel: Option<ChannelId>,

    /// Channels exempt from bad-word classification (e.g. music bots).
    pub moderation_whitelist: Vec<ChannelId>,

    /// Violations before a warning fires.
    pub violation_threshold: u32,

    /// Flagged messages kept per user for display.
    pub max_recent_violations: usize,

    /// Warnings before a timeout is imposed.
    pub timeout_strike_limit: u32,

    /// Length of an imposed timeout.
    pub timeout_duration: Duration,

    /// Sliding window for burst detection.
    pub spam_window: Duration,

    /// Messages allowed inside the spam window before a verdict.
    pub spam_threshold: usize,

    /// Classifier recall/precision tradeoff.
    pub classifier_mode: ClassifierMode,

    /// Directory for persisted JSON state.
    pub state_path: String,

    /// Kaggle API credentials.
    pub kaggle_username: String,
    pub kaggle_key: String,

    /// Name of the role granted to top-ranked participants.
    pub winner_role_name: String,
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self {
            warning_channel: env_channel("WARNING_CHANNEL_ID"),
            leaderboard_channel: env_channel("LEADERBOARD_CHANNEL_ID"),
            stats_channel: env_channel("STATS_CHANNEL_ID"),
            moderation_whitelist: std::env::var("BAD_WORD_WHITELIST")
                .unwrap_or_default()
                .split(',')
                .filter_map(|s| s.trim().parse::<u64>().ok())
                .map(ChannelId::new)
                .collect(),
            violation_threshold: env_parse("BAD_WORD_THRESHOLD", 15),
            max_recent_violations: env_parse("MAX_RECENT_VIOLATIONS", 10),
            timeout_strike_limit: 3,
            timeout_duration: Duration::hours(env_parse("TIMEOUT_HOURS", 6)),
            spam_window: Duration::seconds(env_parse("SPAM_WINDOW_SECONDS", 3)),
            spam_threshold: env_parse("SPAM_THRESHOLD", 4),
            classifier_mode: match std::env::var("CLASSIFIER_MODE").as_deref() {
                Ok("strict") => ClassifierMode::Strict,
                _ => ClassifierMode::Standard,
            },
            state_path: std::env::var("STATE_PATH").unwrap_or_else(|_| "state".to_string()),
            kaggle_username: std::env::var("KAGGLE_USERNAME").unwrap_or_default(),
            kaggle_key: std::env::var("KAGGLE_KEY").unwrap_or_default(),
            winner_role_name: std::env::var("WINNER_ROLE_NAME")
                .unwrap_or_else(|_| "🏆 Contest Winner".to_string()),
        }
    }
}

fn env_channel(key: &str) -> Option<ChannelId> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|id| *id != 0)
        .map(ChannelId::new)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
