use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::{Context, Error};

/// Check if the bot is responsive
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(
        poise::CreateReply::default()
            .content("🏓 Pong! Bot is online!")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show all available commands
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("🤖 AI Olympiad Bot Commands")
        .description("All commands use slash (/) prefix")
        .field(
            "General Commands",
            "`/ping` - Check if bot is online\n\
             `/help` - Show this help message\n\
             `/activity` - Check your activity stats\n\
             `/setkaggle` - Set your Kaggle ID\n\
             `/mykaggle` - View your Kaggle ID",
            false,
        )
        .field(
            "Admin Commands",
            "`/createcontest` - Create contest poll\n\
             `/setcompetition` - Set Kaggle competition\n\
             `/leaderboard` - Show live leaderboard\n\
             `/participants` - Show contest participants\n\
             `/clearparticipants` - Clear participant list\n\
             `/serverstats` - Show server statistics\n\
             `/checkwarnings` - Check bad word warnings\n\
             `/clearwarnings` - Clear user warnings",
            false,
        )
        .field(
            "Features",
            "✅ Bad word detection\n✅ Contest registration\n✅ Daily server stats",
            false,
        )
        .color(0xe74c3c);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Check your server activity stats
#[poise::command(slash_command)]
pub async fn activity(ctx: Context<'_>) -> Result<(), Error> {
    let record = {
        let tracker = ctx.data().activity.read().await;
        tracker.get(ctx.author().id).cloned()
    };

    let Some(record) = record else {
        ctx.send(
            poise::CreateReply::default()
                .content("You have no recorded activity yet!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("📊 Activity Stats for {}", ctx.author().name))
        .field("Messages Sent", record.message_count.to_string(), true)
        .field(
            "Last Seen",
            record.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
            true,
        )
        .thumbnail(ctx.author().face())
        .color(0x9b59b6);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Set or update your Kaggle ID
#[poise::command(slash_command)]
pub async fn setkaggle(
    ctx: Context<'_>,
    #[description = "Your Kaggle username"] kaggle_id: String,
) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let data = ctx.data();

    let previous = {
        let mut identities = data.identities.write().await;
        identities.claim(&user_id, &ctx.author().name, &kaggle_id)
    };

    // The durable claim also flows into the current poll's entry, if any
    let participant_updated = {
        let mut participants = data.participants.write().await;
        participants.update_kaggle_id(&user_id, &kaggle_id)
    };

    let identities_path = format!("{}/kaggle_ids.json", data.config.state_path);
    if let Err(e) = data.identities.read().await.save(&identities_path).await {
        error!("Failed to save Kaggle identities: {}", e);
    }
    if participant_updated {
        let participants_path = format!("{}/contest_participants.json", data.config.state_path);
        if let Err(e) = data.participants.read().await.save(&participants_path).await {
            error!("Failed to save participants: {}", e);
        }
    }

    let reply = match previous {
        Some(old_id) => format!(
            "✅ **Kaggle ID Updated!**\n\nPrevious: ~~{}~~\nNew: **{}**",
            old_id, kaggle_id
        ),
        None => format!(
            "✅ **Kaggle ID Saved!**\n\nID: **{}**\nProfile: https://www.kaggle.com/{}",
            kaggle_id, kaggle_id
        ),
    };
    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// View your saved Kaggle ID
#[poise::command(slash_command)]
pub async fn mykaggle(ctx: Context<'_>) -> Result<(), Error> {
    let identity = {
        let identities = ctx.data().identities.read().await;
        identities.get(&ctx.author().id.to_string()).cloned()
    };

    let reply = match identity {
        Some(identity) => format!(
            "**Your Kaggle Profile:**\n\
             ID: **{}**\n\
             Profile: https://www.kaggle.com/{}\n\n\
             💡 Use `/setkaggle` to update",
            identity.kaggle_id, identity.kaggle_id
        ),
        None => "❌ **No Kaggle ID Found**\n\n\
             Set it with: `/setkaggle <username>`\n\
             Example: `/setkaggle johndoe123`"
            .to_string(),
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
