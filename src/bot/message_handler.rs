//! Message Handler module for plain text messages
//!
//! The reply keyboard sends its button labels as ordinary text, so those
//! labels are mapped back onto the matching commands here.

use anyhow::Result;
use tracing::debug;

use crate::localization::t_lang;

use super::commands::{handle_command, CommandTable};
use super::context::BotContext;
use super::update::Update;

/// Command triggered by a reply-keyboard label in the sender's language
pub fn keyboard_command(text: &str, language_code: Option<&str>) -> Option<&'static str> {
    if text == t_lang("keyboard-help", language_code) {
        Some("help")
    } else if text == t_lang("keyboard-my-recipes", language_code) {
        Some("recipes")
    } else {
        None
    }
}

pub async fn handle_text(
    ctx: &BotContext,
    commands: &CommandTable,
    update: &Update,
    text: &str,
) -> Result<()> {
    let lang = update.sender.language();

    if let Some(command) = keyboard_command(text, lang) {
        debug!(command, "Reply keyboard button pressed");
        return handle_command(ctx, commands, update, command).await;
    }

    ctx.transport
        .send_message(update.chat_id, &t_lang("text-hint", lang), None)
        .await?;
    Ok(())
}
