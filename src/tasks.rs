//! Background timers: the poll-expiry task and the daily activity digest.
//!
//! Both are tracked as cancellable handles. A poll timer is cancelled and
//! replaced whenever a new poll supersedes the old one, so a stale timer can
//! never fire against discarded state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::contest::SharedRegistrationManager;
use crate::state::SharedActivityTracker;

/// Owns the deferred expiry task of the currently active poll.
#[derive(Default)]
pub struct PollTimer {
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the expiry announcement for the active poll, cancelling any
    /// timer belonging to a superseded poll.
    pub async fn schedule(
        &self,
        http: Arc<serenity::Http>,
        registration: SharedRegistrationManager,
        announce_channel: serenity::ChannelId,
        expires_at: DateTime<Utc>,
    ) {
        let mut slot = self.handle.lock().await;
        if let Some(old) = slot.take() {
            old.abort();
        }

        *slot = Some(tokio::spawn(async move {
            let wait = (expires_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(wait).await;

            let total = registration.expire_poll().await;
            info!("Contest poll expired with {} participants", total);

            let embed = serenity::CreateEmbed::new()
                .title("⏰ Contest Poll Closed")
                .description(format!("Registration closed! Total: **{}**", total))
                .color(0xff9900);
            if let Err(e) = announce_channel
                .send_message(&http, serenity::CreateMessage::new().embed(embed))
                .await
            {
                error!("Failed to announce poll expiry: {}", e);
            }
        }));
    }

    pub async fn cancel(&self) {
        if let Some(old) = self.handle.lock().await.take() {
            old.abort();
        }
    }
}

/// Shared poll timer type
pub type SharedPollTimer = Arc<PollTimer>;

pub fn create_shared_poll_timer() -> SharedPollTimer {
    Arc::new(PollTimer::new())
}

/// Post the daily activity digest to the stats channel. Purely additive;
/// reads activity counters and nothing else.
pub fn spawn_daily_digest(
    http: Arc<serenity::Http>,
    activity: SharedActivityTracker,
    stats_channel: Option<serenity::ChannelId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(channel) = stats_channel else {
            info!("STATS_CHANNEL_ID not set, daily digest disabled");
            return;
        };

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 3600));
        interval.tick().await; // skip the immediate first tick

        loop {
            interval.tick().await;

            let (active_users, total_messages) = {
                let tracker = activity.read().await;
                (tracker.active_users(), tracker.total_messages())
            };

            let embed = serenity::CreateEmbed::new()
                .title("📊 Daily Server Summary")
                .description(format!("**{}**", Utc::now().format("%B %d, %Y")))
                .field("Active Users", active_users.to_string(), true)
                .field("Total Messages", total_messages.to_string(), true)
                .color(0x00ff00);

            if let Err(e) = channel
                .send_message(&http, serenity::CreateMessage::new().embed(embed))
                .await
            {
                error!("Failed to post daily digest: {}", e);
            }
        }
    })
}
