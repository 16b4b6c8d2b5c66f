use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;
use tracing::{debug, info};

use crate::messages;
use crate::{Data, Error};

/// Welcome new members in the first general/welcome channel we can find.
pub async fn handle_member_add(
    ctx: &serenity::Context,
    member: &serenity::Member,
    _data: &Data,
) -> Result<(), Error> {
    info!("New member joined: {} ({})", member.user.name, member.user.id);

    let channels = member.guild_id.channels(&ctx.http).await?;
    let welcome_channel = channels
        .values()
        .find(|c| c.name == "general" || c.name == "welcome")
        .map(|c| c.id);

    let Some(channel_id) = welcome_channel else {
        debug!("No welcome channel in guild {}", member.guild_id);
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("🎉 Welcome to AI Olympiad Community!")
        .description(messages::welcome_message(&member.mention().to_string()))
        .color(serenity::Colour::from_rgb(46, 204, 113))
        .thumbnail(member.user.face());

    channel_id
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;

    Ok(())
}
