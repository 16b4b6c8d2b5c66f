use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::contest::reconcile;
use crate::error::BotError;
use crate::{Context, Error};

/// Create a contest poll (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn createcontest(
    ctx: Context<'_>,
    #[description = "Hours until poll expires"] duration_hours: f64,
    #[description = "Contest poll question"] question: String,
) -> Result<(), Error> {
    if duration_hours <= 0.0 {
        ctx.send(
            poise::CreateReply::default()
                .content("Poll duration must be positive.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let expires_at = Utc::now() + Duration::seconds((duration_hours * 3600.0) as i64);
    let expiry_str = expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let embed = serenity::CreateEmbed::new()
        .title("📊 Contest Poll - Weekly AI Competition")
        .description(&question)
        .field(
            "How to Participate",
            "React with 👍 to join!\nYou'll receive a DM for your Kaggle ID.",
            false,
        )
        .field(
            "⏰ Deadline",
            format!("Expires: **{}**\n({} hours)", expiry_str, duration_hours),
            false,
        )
        .color(0x00ff00)
        .timestamp(serenity::Timestamp::now());

    let reply = ctx.send(poise::CreateReply::default().embed(embed)).await?;
    let poll_message = reply.message().await?;
    poll_message
        .react(
            &ctx.http(),
            serenity::ReactionType::Unicode("👍".to_string()),
        )
        .await?;

    // Supersedes any previous poll: participants and pending conversations
    // are wiped before the new session opens
    let registration = ctx.data().registration.clone();
    registration
        .create_poll(poll_message.id, expires_at, &question)
        .await;

    ctx.data()
        .poll_timer
        .schedule(
            ctx.serenity_context().http.clone(),
            registration,
            poll_message.channel_id,
            expires_at,
        )
        .await;

    info!(
        "Contest poll created by {} ({} hours)",
        ctx.author().name,
        duration_hours
    );
    Ok(())
}

/// Show contest participants (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn participants(ctx: Context<'_>) -> Result<(), Error> {
    let participants = ctx.data().participants.read().await;

    if participants.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No participants yet!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("🏆 Contest Participants")
        .color(0x0099ff)
        .timestamp(serenity::Timestamp::now());

    for (_, participant) in participants.iter() {
        embed = embed.field(
            &participant.name,
            format!(
                "[{}](https://www.kaggle.com/{})",
                participant.kaggle_id, participant.kaggle_id
            ),
            false,
        );
    }
    embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
        "Total: {}",
        participants.len()
    )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Clear all participants and the active poll (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn clearparticipants(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().registration.clear_all().await;
    ctx.data().poll_timer.cancel().await;

    ctx.send(
        poise::CreateReply::default()
            .content("✅ Cleared!")
            .ephemeral(true),
    )
    .await?;
    info!("Participants cleared by {}", ctx.author().name);
    Ok(())
}

/// Set the Kaggle competition and notify participants (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setcompetition(
    ctx: Context<'_>,
    #[description = "Kaggle competition ID (e.g., titanic)"] competition_id: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let data = ctx.data();

    // Deadline lookup is best-effort; the competition is set regardless
    let deadline = match data.kaggle.find_competition(&competition_id).await {
        Ok(competition) => competition.deadline,
        Err(e) => {
            warn!("Could not look up competition '{}': {}", competition_id, e);
            None
        }
    };
    let deadline_str = deadline
        .map(|d| d.format("%B %d, %Y at %H:%M UTC").to_string())
        .unwrap_or_else(|| "Check Kaggle for deadline".to_string());

    {
        let mut competition = data.competition.write().await;
        competition.reference = Some(competition_id.clone());
        competition.deadline = deadline;
    }

    // DM every registered participant the competition link
    let recipients: Vec<(serenity::UserId, String)> = {
        let participants = data.participants.read().await;
        participants
            .iter()
            .filter_map(|(id, p)| {
                id.parse::<u64>()
                    .ok()
                    .map(|raw| (serenity::UserId::new(raw), p.kaggle_id.clone()))
            })
            .collect()
    };

    let mut notified = 0;
    let mut failed = 0;
    for (user_id, kaggle_id) in &recipients {
        let dm_embed = serenity::CreateEmbed::new()
            .title("🏆 New Competition Announced!")
            .description("A new Kaggle competition has been set for our contest!")
            .field("📌 Competition", format!("**{}**", competition_id), false)
            .field(
                "🔗 Competition Link",
                format!(
                    "[Click here to join!](https://www.kaggle.com/c/{})",
                    competition_id
                ),
                false,
            )
            .field("⏰ Deadline", &deadline_str, false)
            .field("📝 Your Kaggle ID", format!("**{}**", kaggle_id), false)
            .color(0x00ff00)
            .timestamp(serenity::Timestamp::now());

        let sent = async {
            let dm = user_id.create_dm_channel(&ctx.http()).await?;
            dm.send_message(&ctx.http(), serenity::CreateMessage::new().embed(dm_embed))
                .await
        }
        .await;

        match sent {
            Ok(_) => notified += 1,
            Err(e) => {
                failed += 1;
                warn!("Failed to notify user {}: {}", user_id, e);
            }
        }
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("✅ Competition Set Successfully!")
        .description(format!("**Competition ID:** `{}`", competition_id))
        .field(
            "🔗 URL",
            format!("https://www.kaggle.com/c/{}", competition_id),
            false,
        )
        .field("⏰ Deadline", &deadline_str, false)
        .color(0x00ff00)
        .timestamp(serenity::Timestamp::now());

    embed = if recipients.is_empty() {
        embed.field(
            "⚠️ No Participants",
            "No registered participants to notify.\nUse `/createcontest` to gather participants first!",
            false,
        )
    } else {
        embed.field(
            "📨 Notifications Sent",
            format!(
                "✅ Notified: **{}** participants\n❌ Failed: **{}** participants",
                notified, failed
            ),
            false,
        )
    };
    embed = embed.field(
        "📊 Next Step",
        "Use `/leaderboard` to fetch live scores",
        false,
    );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the live Kaggle leaderboard for registered participants (admin)
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();

    let reference = {
        let competition = data.competition.read().await;
        competition.reference.clone()
    };
    let Some(reference) = reference else {
        ctx.send(
            poise::CreateReply::default()
                .content("❌ No active competition set!\nUse `/setcompetition <id>` first.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    ctx.defer().await?;

    // A failed fetch leaves every bit of contest state untouched
    let rows = match data.kaggle.fetch_leaderboard(&reference).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Leaderboard fetch failed for '{}': {}", reference, e);
            ctx.send(
                poise::CreateReply::default()
                    .content(format!(
                        "❌ Error fetching leaderboard: {}\n\
                         Make sure the competition ID is correct and participants have submitted.",
                        e
                    ))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let registered: Vec<(serenity::UserId, crate::state::ContestParticipant)> = {
        let participants = data.participants.read().await;
        participants
            .iter()
            .filter_map(|(id, p)| {
                id.parse::<u64>()
                    .ok()
                    .map(|raw| (serenity::UserId::new(raw), p.clone()))
            })
            .collect()
    };

    let result = reconcile(&registered, &rows);

    if result.matched.is_empty() {
        let registered_ids: Vec<String> =
            registered.iter().map(|(_, p)| p.kaggle_id.clone()).collect();
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "📊 No registered participants found on the leaderboard yet!\n\n\
                     **Registered Kaggle IDs:** {}\n\
                     **Hint:** Make sure participants have submitted to the competition \
                     and their Kaggle username matches exactly.",
                    registered_ids.join(", ")
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let embed = build_leaderboard_embed(&reference, &result);

    // Winner role churn for the new top 3
    if let Some(guild_id) = ctx.guild_id() {
        if let Err(e) = assign_winner_roles(&ctx, guild_id, result.top_user_ids(3)).await {
            error!("Winner role update failed: {}", e);
        }
    }

    if let Some(channel) = data.config.leaderboard_channel {
        if let Err(e) = channel
            .send_message(
                &ctx.http(),
                serenity::CreateMessage::new().embed(embed.clone()),
            )
            .await
        {
            warn!("Failed to mirror leaderboard to channel: {}", e);
        }
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn build_leaderboard_embed(
    reference: &str,
    result: &reconcile::Reconciliation,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("🏆 Contest Leaderboard")
        .description(format!("**Competition:** {}", reference))
        .field(
            "📌 Competition Info",
            format!(
                "🔗 [View on Kaggle](https://www.kaggle.com/c/{})\n👥 **{}** matched participants",
                reference,
                result.matched.len()
            ),
            false,
        )
        .color(0xffd700)
        .timestamp(serenity::Timestamp::now());

    for (i, entry) in result.matched.iter().take(10).enumerate() {
        let medal = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            n => format!("**{}.**", n + 1),
        };
        let rank = entry
            .resolved_rank
            .map(|r| format!("🎯 Rank: **#{}**", r))
            .unwrap_or_else(|| "🎯 Rank: **N/A**".to_string());
        let private = entry
            .private_rank
            .map(|r| format!("\n🔒 Private: **#{}**", r))
            .unwrap_or_default();
        let score = entry
            .score
            .map(|s| format!("💯 Score: **{:.5}**", s))
            .unwrap_or_else(|| "💯 Score: **N/A**".to_string());

        embed = embed.field(
            format!("{} {}", medal, entry.display_name),
            format!(
                "{}\n{}{}\n👤 [{}](https://www.kaggle.com/{})",
                score, rank, private, entry.team_name, entry.kaggle_id
            ),
            false,
        );
    }

    if result.matched.len() > 10 {
        let mut remaining = String::new();
        for (i, entry) in result.matched.iter().enumerate().skip(10).take(10) {
            let rank = entry
                .resolved_rank
                .map(|r| r.to_string())
                .unwrap_or_else(|| "?".to_string());
            remaining.push_str(&format!(
                "`{}.` {} - Rank #{}\n",
                i + 1,
                entry.display_name,
                rank
            ));
        }
        if result.matched.len() > 20 {
            remaining.push_str(&format!(
                "\n*...and {} more participants*",
                result.matched.len() - 20
            ));
        }
        embed = embed.field("📋 Other Participants", remaining, false);
    }

    if !result.unmatched.is_empty() {
        let names: Vec<&str> = result.unmatched.iter().map(|(_, n)| n.as_str()).collect();
        embed = embed.field(
            "❓ Not on the leaderboard yet",
            names.join(", "),
            false,
        );
    }

    embed.footer(serenity::CreateEmbedFooter::new(format!(
        "🏆 Total Participants: {} • Updated",
        result.matched.len() + result.unmatched.len()
    )))
}

/// Grant the winner role to the new top ranks and revoke it from previous
/// holders who fell out. Assignment is idempotent.
async fn assign_winner_roles(
    ctx: &Context<'_>,
    guild_id: serenity::GuildId,
    new_winners: Vec<serenity::UserId>,
) -> crate::error::Result<()> {
    let data = ctx.data();
    let role_name = &data.config.winner_role_name;

    let existing_role = guild_id
        .roles(&ctx.http())
        .await?
        .into_iter()
        .find(|(_, role)| role.name == *role_name)
        .map(|(id, _)| id);

    let role_id = match existing_role {
        Some(id) => id,
        None => {
            let role = guild_id
                .create_role(
                    &ctx.http(),
                    serenity::EditRole::new()
                        .name(role_name)
                        .colour(serenity::Colour::GOLD),
                )
                .await
                .map_err(|e| BotError::Discord {
                    message: format!("could not create winner role: {}", e),
                })?;
            info!("Created '{}' role", role_name);
            role.id
        }
    };

    let previous = {
        let competition = data.competition.read().await;
        competition.winners.clone()
    };

    for user_id in previous.iter().filter(|u| !new_winners.contains(u)) {
        if let Err(e) = ctx
            .http()
            .remove_member_role(guild_id, *user_id, role_id, Some("No longer in contest top 3"))
            .await
        {
            warn!("Failed to revoke winner role from {}: {}", user_id, e);
        }
    }

    for (i, user_id) in new_winners.iter().enumerate() {
        if previous.contains(user_id) {
            continue; // already holds the role
        }
        match ctx
            .http()
            .add_member_role(
                guild_id,
                *user_id,
                role_id,
                Some(&format!("Top {} in contest", i + 1)),
            )
            .await
        {
            Ok(_) => info!("Assigned winner role to {}", user_id),
            Err(e) => warn!("Failed to assign winner role to {}: {}", user_id, e),
        }
    }

    let mut competition = data.competition.write().await;
    competition.winners = new_winners;
    Ok(())
}
