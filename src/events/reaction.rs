use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::contest::{OptInOutcome, OptOutOutcome};
use crate::messages;
use crate::{Data, Error};

/// A reaction added to the active poll message starts (or short-circuits) the
/// registration conversation.
pub async fn handle_reaction_add(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    if is_bot(ctx, user_id) {
        return Ok(());
    }

    let outcome = data
        .registration
        .handle_opt_in(user_id, reaction.message_id, Utc::now())
        .await;

    let user_name = display_name(ctx, user_id).await;
    let dm = match outcome {
        OptInOutcome::NotActivePoll => return Ok(()),
        OptInOutcome::PollExpired => messages::poll_expired(),
        OptInOutcome::AlreadyRegistered { kaggle_id } => messages::already_registered(&kaggle_id),
        OptInOutcome::PromptConfirmIdentity { kaggle_id } => {
            messages::prompt_confirm_identity(&user_name, &kaggle_id)
        }
        OptInOutcome::PromptParticipate => messages::prompt_participate(&user_name),
    };

    debug!("Poll reaction from {} ({:?})", user_name, reaction.emoji);
    if let Err(e) = dm_user(ctx, user_id, dm).await {
        // DMs disabled: the pending entry stays; the user can still be
        // reached once they open their DMs and reply, or the poll expiry
        // sweeps it away.
        warn!("Error sending DM to user {}: {}", user_id, e);
    }

    Ok(())
}

/// Retracting the reaction withdraws the registration (or cancels the
/// half-finished conversation).
pub async fn handle_reaction_remove(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    if is_bot(ctx, user_id) {
        return Ok(());
    }

    let outcome = data
        .registration
        .handle_opt_out(user_id, reaction.message_id)
        .await;

    let dm = match outcome {
        OptOutOutcome::NotActivePoll | OptOutOutcome::NotInvolved => return Ok(()),
        OptOutOutcome::RemovedParticipant { kaggle_id } => {
            messages::removed_from_contest(&kaggle_id)
        }
        OptOutOutcome::CancelledPending => messages::registration_cancelled(),
    };

    if let Err(e) = dm_user(ctx, user_id, dm).await {
        warn!("Error sending DM to user {}: {}", user_id, e);
    }

    Ok(())
}

fn is_bot(ctx: &serenity::Context, user_id: serenity::UserId) -> bool {
    ctx.cache
        .user(user_id)
        .map(|u| u.bot)
        .unwrap_or(false)
}

async fn display_name(ctx: &serenity::Context, user_id: serenity::UserId) -> String {
    if let Some(user) = ctx.cache.user(user_id) {
        return user.name.clone();
    }
    match user_id.to_user(&ctx.http).await {
        Ok(user) => user.name,
        Err(_) => user_id.to_string(),
    }
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
