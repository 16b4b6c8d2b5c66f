// src/messages.rs

use crate::moderation::FlaggedMessage;

pub fn warning_dm(threshold: u32, evidence: &[FlaggedMessage]) -> String {
    let flagged = evidence
        .iter()
        .map(|m| format!("  • {}", m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "⚠️ **Official Warning - Language Violation**\n\n\
        You have reached the inappropriate language threshold (**{} violations**).\n\n\
        **Recent flagged messages:**\n{}\n\n\
        Please review our server rules and maintain respectful communication.\n\
        **Note:** Accumulating 3 warnings will result in a timeout.\n\n\
        —————————————————\n\
        *AI Olympiad Community Moderation Team*",
        threshold, flagged
    )
}

pub fn timeout_dm(hours: i64) -> String {
    format!(
        "🔇 **You have been timed out for {} hours**\n\n\
        You received 3 warnings for inappropriate language.\n\
        Please review the server rules.",
        hours
    )
}

pub fn slow_down_notice(name: &str) -> String {
    format!(
        "🐌 **Slow down, {}!**\n\n\
        You're sending messages too quickly. Please wait a moment before posting again.",
        name
    )
}

pub fn prompt_confirm_identity(name: &str, kaggle_id: &str) -> String {
    format!(
        "Hi {}! 👋\n\n\
        Thanks for your interest in our weekly contest!\n\n\
        **Your Kaggle ID:** {}\n\n\
        Are you ready to participate?\n\
        Reply with **Yes** to confirm or **No** to cancel.\n\n\
        ⏰ You can register until the poll expires.",
        name, kaggle_id
    )
}

pub fn prompt_participate(name: &str) -> String {
    format!(
        "Hi {}! 👋\n\n\
        Thanks for your interest in our weekly contest!\n\n\
        Would you like to participate?\n\
        Reply with **Yes** to continue or **No** to cancel.\n\n\
        ⏰ You can register until the poll expires.",
        name
    )
}

pub fn ask_kaggle_id() -> String {
    "Great! 🎉\n\n\
    Please reply with your **Kaggle ID** (username).\n\n\
    **Format:** Just type your Kaggle username (e.g., johndoe123)\n\
    Example: If your profile is kaggle.com/johndoe123, reply with: johndoe123"
        .to_string()
}

pub fn registration_confirmed_existing(kaggle_id: &str) -> String {
    format!(
        "✅ **Registration Confirmed!**\n\n\
        Kaggle ID: **{}**\n\
        You'll receive the competition link once registration closes!\n\
        Good luck in the contest! 🚀",
        kaggle_id
    )
}

pub fn registration_confirmed_new(kaggle_id: &str) -> String {
    format!(
        "✅ **Registration Confirmed!**\n\n\
        Kaggle ID: **{}**\n\
        Your Kaggle ID has been saved for future contests.\n\n\
        You'll receive the competition link once registration closes!\n\n\
        💡 **Tip:** Use `/setkaggle <new_id>` anytime to update your Kaggle ID.\n\n\
        Good luck in the contest! 🚀",
        kaggle_id
    )
}

pub fn registration_cancelled() -> String {
    "❌ Registration cancelled. You can react again if you change your mind!".to_string()
}

pub fn reprompt_yes_no() -> String {
    "Please reply with **Yes** to confirm or **No** to cancel.".to_string()
}

pub fn poll_expired() -> String {
    "⏰ Sorry, the contest poll has expired. Registration is closed.".to_string()
}

pub fn already_registered(kaggle_id: &str) -> String {
    format!("✅ You're already registered with Kaggle ID: **{}**", kaggle_id)
}

pub fn removed_from_contest(kaggle_id: &str) -> String {
    format!(
        "❌ You've been removed from the contest. Your Kaggle ID **{}** has been unregistered.",
        kaggle_id
    )
}

pub fn welcome_message(mention: &str) -> String {
    format!(
        "Hey {}! Welcome to the server! 🤖\n\n\
        We're excited to have you here!\n\
        • Check out our contests and challenges\n\
        • Use `/help` to see all available commands\n\
        • Link your Kaggle profile with `/setkaggle`\n\n\
        Let's build something amazing together! 🚀",
        mention
    )
}
