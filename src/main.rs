use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot for AI Olympiad community moderation and Kaggle contests
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod contest;
mod error;
mod events;
mod kaggle;
mod messages;
mod moderation;
mod state;
mod tasks;

use commands::{
    activity, checkwarnings, clearparticipants, clearwarnings, createcontest, help, leaderboard,
    mykaggle, participants, ping, serverstats, setcompetition, setkaggle,
};
use config::BotConfig;
use contest::{
    create_shared_competition_state, create_shared_registration_manager, SharedCompetitionState,
    SharedRegistrationManager,
};
use events::{handle_member_add, handle_message, handle_reaction_add, handle_reaction_remove};
use kaggle::KaggleClient;
use moderation::{
    create_shared_ledger, create_shared_spam_detector, EscalationLedger, SharedEscalationLedger,
    SharedSpamDetector, SpamDetector, ViolationClassifier,
};
use state::{
    create_shared_activity_tracker, create_shared_identity_store, create_shared_participant_store,
    ActivityTracker, IdentityStore, ParticipantStore, SharedActivityTracker, SharedIdentityStore,
    SharedParticipantStore,
};
use tasks::{create_shared_poll_timer, spawn_daily_digest, SharedPollTimer};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub classifier: ViolationClassifier,
    pub ledger: SharedEscalationLedger,
    pub spam_detector: SharedSpamDetector,
    pub activity: SharedActivityTracker,
    pub identities: SharedIdentityStore,
    pub participants: SharedParticipantStore,
    pub registration: SharedRegistrationManager,
    pub competition: SharedCompetitionState,
    pub kaggle: Arc<KaggleClient>,
    pub poll_timer: SharedPollTimer,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message(ctx, new_message, data).await {
                error!("Failed to handle message: {}", e);
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Err(e) = handle_reaction_add(ctx, add_reaction, data).await {
                error!("Failed to handle reaction add: {}", e);
            }
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            if let Err(e) = handle_reaction_remove(ctx, removed_reaction, data).await {
                error!("Failed to handle reaction remove: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!("Failed to handle new member: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_max_level(tracing::Level::INFO)
        .init();

    let token = std::env::var("DISCORD_TOKEN").expect("Missing DISCORD_TOKEN environment variable");

    let config = Arc::new(BotConfig::from_env());
    if config.kaggle_username.is_empty() || config.kaggle_key.is_empty() {
        warn!("KAGGLE_USERNAME/KAGGLE_KEY not set, leaderboard commands will fail");
    }

    // Ensure state directory exists
    tokio::fs::create_dir_all(&config.state_path).await.ok();

    info!("Loading Kaggle identities...");
    let identities_path = format!("{}/kaggle_ids.json", config.state_path);
    let identities = IdentityStore::load(&identities_path)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load Kaggle identities: {}, using empty store", e);
            IdentityStore::new()
        });
    info!("Loaded {} Kaggle identities", identities.len());
    let identities = create_shared_identity_store(identities);

    info!("Loading contest participants...");
    let participants_path = format!("{}/contest_participants.json", config.state_path);
    let participant_store = ParticipantStore::load(&participants_path)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load participants: {}, using empty store", e);
            ParticipantStore::new()
        });
    info!("Loaded {} contest participants", participant_store.len());
    let participant_store = create_shared_participant_store(participant_store);

    let classifier = ViolationClassifier::new(config.classifier_mode);
    let ledger = create_shared_ledger(EscalationLedger::new(
        config.violation_threshold,
        config.max_recent_violations,
        config.timeout_strike_limit,
        config.timeout_duration,
    ));
    let spam_detector = create_shared_spam_detector(SpamDetector::new(
        config.spam_window,
        config.spam_threshold,
    ));
    let activity_tracker = create_shared_activity_tracker(ActivityTracker::new());
    let registration = create_shared_registration_manager(
        identities.clone(),
        participant_store.clone(),
        &config.state_path,
    );
    let competition = create_shared_competition_state();
    let kaggle = Arc::new(KaggleClient::new(
        &config.kaggle_username,
        &config.kaggle_key,
    ));
    let poll_timer = create_shared_poll_timer();

    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let digest_config = config.clone();
    let digest_activity = activity_tracker.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                help(),
                activity(),
                setkaggle(),
                mykaggle(),
                createcontest(),
                participants(),
                clearparticipants(),
                setcompetition(),
                leaderboard(),
                checkwarnings(),
                clearwarnings(),
                serverstats(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id()
                            .map(|g| g.to_string())
                            .unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Error in command '{}': {}",
                                ctx.command().qualified_name,
                                error
                            );
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse {
                            error, input, ctx, ..
                        } => {
                            error!(
                                "Argument parse error in '{}': {} (input: {:?})",
                                ctx.command().qualified_name,
                                error,
                                input
                            );
                        }
                        poise::FrameworkError::MissingBotPermissions {
                            missing_permissions,
                            ctx,
                            ..
                        } => {
                            error!(
                                "Bot missing permissions for '{}': {:?}",
                                ctx.command().qualified_name,
                                missing_permissions
                            );
                            let _ = ctx
                                .say(format!(
                                    "Bot is missing permissions: {:?}",
                                    missing_permissions
                                ))
                                .await;
                        }
                        poise::FrameworkError::MissingUserPermissions {
                            missing_permissions,
                            ctx,
                            ..
                        } => {
                            error!(
                                "User {} missing permissions for '{}': {:?}",
                                ctx.author().name,
                                ctx.command().qualified_name,
                                missing_permissions
                            );
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!(
                                "Command '{}' is guild-only, used in DM by {}",
                                ctx.command().qualified_name,
                                ctx.author().name
                            );
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id
                {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        )
                        .await
                        {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!(
                                "Successfully registered {} commands for guild {}",
                                framework.options().commands.len(),
                                guild_id
                            );
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) =
                        poise::builtins::register_globally(ctx, &framework.options().commands).await
                    {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!(
                            "Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                            framework.options().commands.len()
                        );
                    }
                }

                let _ = spawn_daily_digest(
                    ctx.http.clone(),
                    digest_activity,
                    digest_config.stats_channel,
                );

                Ok(Data {
                    config,
                    classifier,
                    ledger,
                    spam_detector,
                    activity: activity_tracker,
                    identities,
                    participants: participant_store,
                    registration,
                    competition,
                    kaggle,
                    poll_timer,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable MESSAGE_CONTENT and GUILD_MEMBERS in the Discord Developer Portal:");
            error!("https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable MESSAGE_CONTENT and GUILD_MEMBERS in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
