use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check bad-word warnings for a user or the whole server (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn checkwarnings(
    ctx: Context<'_>,
    #[description = "User to check (omit for all users)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let ledger = ctx.data().ledger.read().await;
    let threshold = ledger.threshold();

    let embed = match user {
        Some(user) => {
            let record = ledger.get(user.id);
            let mut embed = serenity::CreateEmbed::new()
                .title(format!("⚠️ Warnings for {}", user.name))
                .color(0xff9900)
                .thumbnail(user.face());

            match record {
                Some(record) if record.count > 0 => {
                    embed = embed
                        .field(
                            "Violations",
                            format!("**{}** / {}", record.count, threshold),
                            true,
                        )
                        .field(
                            "Timeout Strikes",
                            record.timeout_strikes.to_string(),
                            true,
                        );
                    if !record.recent_messages.is_empty() {
                        let recent: Vec<String> = record
                            .recent_messages
                            .iter()
                            .rev()
                            .take(3)
                            .map(|m| format!("`#{}`: {}", m.channel_name, m.content))
                            .collect();
                        embed = embed.field("Recent Messages", recent.join("\n"), false);
                    }
                    embed
                }
                _ => embed.description("✅ No violations on record."),
            }
        }
        None => {
            let users = ledger.users_with_violations();
            let mut embed = serenity::CreateEmbed::new()
                .title("⚠️ Server Warnings")
                .color(0xff9900);

            if users.is_empty() {
                embed = embed.description("✅ No users have violations!");
            } else {
                for (user_id, record) in users.iter().take(20) {
                    embed = embed.field(
                        format!("<@{}>", user_id),
                        format!(
                            "Violations: **{}** / {} | Strikes: {}",
                            record.count, threshold, record.timeout_strikes
                        ),
                        false,
                    );
                }
            }
            embed
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Clear a user's bad-word warnings (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn clearwarnings(
    ctx: Context<'_>,
    #[description = "User whose warnings to clear"] user: serenity::User,
) -> Result<(), Error> {
    let cleared = {
        let mut ledger = ctx.data().ledger.write().await;
        ledger.clear(user.id)
    };

    let reply = if cleared {
        info!("Warnings cleared for {} by {}", user.name, ctx.author().name);
        format!("✅ Cleared all warnings for **{}**", user.name)
    } else {
        format!("**{}** has no warnings to clear.", user.name)
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Show server statistics (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn serverstats(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();

    let (active_users, total_messages) = {
        let tracker = data.activity.read().await;
        (tracker.active_users(), tracker.total_messages())
    };
    let users_with_warnings = {
        let ledger = data.ledger.read().await;
        ledger.users_with_violations().len()
    };
    let participant_count = data.participants.read().await.len();
    let identity_count = data.identities.read().await.len();

    let embed = serenity::CreateEmbed::new()
        .title("📊 Server Statistics")
        .field("Active Users", active_users.to_string(), true)
        .field("Total Messages", total_messages.to_string(), true)
        .field("Users w/ Warnings", users_with_warnings.to_string(), true)
        .field("Contest Participants", participant_count.to_string(), true)
        .field("Saved Kaggle IDs", identity_count.to_string(), true)
        .color(0x3498db)
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
