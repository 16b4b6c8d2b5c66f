use chrono::Utc;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;
use tracing::{debug, error, info, warn};

use crate::contest::DmOutcome;
use crate::messages;
use crate::moderation::EscalationOutcome;
use crate::{Data, Error};

/// Handle incoming messages.
///
/// Guild messages run through the moderation pipeline, short-circuiting on
/// the first verdict: bad-word violation, then spam, then plain activity
/// tracking. DMs only ever feed the registration conversation.
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    // Ignore bot messages
    if msg.author.bot {
        return Ok(());
    }

    if msg.guild_id.is_none() {
        return handle_dm_message(ctx, msg, data).await;
    }

    // Bad words first: instant deletion for server messages with text
    if !msg.content.trim().is_empty()
        && !data.config.moderation_whitelist.contains(&msg.channel_id)
        && data.classifier.is_violation(&msg.content)
    {
        return handle_violation(ctx, msg, data).await;
    }

    {
        let mut spam = data.spam_detector.write().await;
        if spam.record_and_check(msg.author.id, Utc::now()) {
            drop(spam);
            return handle_spam_verdict(ctx, msg, data).await;
        }
    }

    // Track user activity
    let mut activity = data.activity.write().await;
    activity.record_message(msg.author.id, Utc::now());

    Ok(())
}

/// Delete the message, record the violation and act on the escalation outcome.
async fn handle_violation(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    debug!(
        "Bad word detected from {}: '{}'",
        msg.author.name,
        msg.content.chars().take(50).collect::<String>()
    );
    if let Err(e) = msg.delete(&ctx.http).await {
        error!("Failed to delete flagged message: {}", e);
    }

    let channel_name = msg
        .channel_id
        .name(ctx)
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    // The ledger mutation is the source of truth; every notification below is
    // best-effort and must not roll it back.
    let outcome = {
        let mut ledger = data.ledger.write().await;
        ledger.record_violation(msg.author.id, &msg.content, &channel_name, Utc::now())
    };

    let EscalationOutcome::ThresholdReached {
        violation_count,
        evidence,
        timeout,
    } = outcome
    else {
        return Ok(());
    };

    info!(
        "Violation threshold reached for {} ({} violations)",
        msg.author.name, violation_count
    );

    // DM the user
    if let Err(e) = dm_user(
        ctx,
        msg.author.id,
        messages::warning_dm(data.config.violation_threshold, &evidence),
    )
    .await
    {
        warn!("Could not DM warning to {}: {}", msg.author.name, e);
    }

    // Alert the admin channel
    if let Some(warning_channel) = data.config.warning_channel {
        let mut embed = serenity::CreateEmbed::new()
            .title("⚠️ Bad Word Threshold Reached")
            .description(format!(
                "**User:** {} ({})\n**Violations:** {}",
                msg.author.mention(),
                msg.author.name,
                violation_count
            ))
            .color(0xff0000)
            .timestamp(serenity::Timestamp::now());
        for (i, flagged) in evidence.iter().enumerate() {
            embed = embed.field(
                format!("Message {} - #{}", i + 1, flagged.channel_name),
                format!("```{}```", flagged.content),
                false,
            );
        }
        if let Err(e) = warning_channel
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            error!("Failed to alert warning channel: {}", e);
        }
    }

    // Apply the timeout on the third warning
    if let Some(duration) = timeout {
        apply_timeout(ctx, msg, data, duration).await;
    }

    Ok(())
}

async fn apply_timeout(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
    duration: chrono::Duration,
) {
    let Some(guild_id) = msg.guild_id else {
        return;
    };
    let until = Utc::now() + duration;
    let edit = serenity::EditMember::new()
        .disable_communication_until(until.to_rfc3339())
        .audit_log_reason("Exceeded bad word warnings 3 times");

    match guild_id.edit_member(&ctx.http, msg.author.id, edit).await {
        Ok(_) => {
            info!(
                "Timed out {} for {} hours",
                msg.author.name,
                duration.num_hours()
            );
            if let Some(warning_channel) = data.config.warning_channel {
                let _ = warning_channel
                    .say(
                        &ctx.http,
                        format!(
                            "🔇 **{} has been timed out for {} hours** (3 warnings reached)",
                            msg.author.mention(),
                            duration.num_hours()
                        ),
                    )
                    .await;
            }
            if let Err(e) = dm_user(
                ctx,
                msg.author.id,
                messages::timeout_dm(duration.num_hours()),
            )
            .await
            {
                warn!("Could not DM timeout notice to {}: {}", msg.author.name, e);
            }
        }
        Err(e) => error!("Error timing out user {}: {}", msg.author.name, e),
    }
}

/// Spam verdict: one notice per burst, delivery best-effort.
async fn handle_spam_verdict(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    info!("Spam burst detected from {}", msg.author.name);

    // The burst still counts as activity
    {
        let mut activity = data.activity.write().await;
        activity.record_message(msg.author.id, Utc::now());
    }

    if let Err(e) = msg
        .reply(&ctx.http, messages::slow_down_notice(&msg.author.name))
        .await
    {
        warn!("Could not send spam notice: {}", e);
    }
    Ok(())
}

/// DM messages only drive the registration conversation.
async fn handle_dm_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    debug!("Processing DM from: {}", msg.author.name);

    let outcome = data
        .registration
        .handle_dm_reply(msg.author.id, &msg.author.name, &msg.content, Utc::now())
        .await;

    let reply = match outcome {
        DmOutcome::NotPending => return Ok(()),
        DmOutcome::PollExpired => messages::poll_expired(),
        DmOutcome::ConfirmedExisting { kaggle_id } => {
            messages::registration_confirmed_existing(&kaggle_id)
        }
        DmOutcome::ConfirmedNew { kaggle_id } => messages::registration_confirmed_new(&kaggle_id),
        DmOutcome::AskKaggleId => messages::ask_kaggle_id(),
        DmOutcome::Cancelled => messages::registration_cancelled(),
        DmOutcome::Reprompt => messages::reprompt_yes_no(),
    };

    // The transition already happened; a failed DM must not undo it
    if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
        warn!("Could not reply to DM from {}: {}", msg.author.name, e);
    }

    Ok(())
}

async fn dm_user(
    ctx: &serenity::Context,
    user_id: serenity::UserId,
    content: String,
) -> Result<(), serenity::Error> {
    let dm = user_id.create_dm_channel(&ctx.http).await?;
    dm.send_message(&ctx.http, serenity::CreateMessage::new().content(content))
        .await?;
    Ok(())
}
