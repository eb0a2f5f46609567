//! Slash-command registry and the built-in command handlers.

use std::collections::HashMap;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::db::User;
use crate::identity::resolve_user;
use crate::localization::{t_args_lang, t_lang};
use crate::recipes::escape_html;

use super::callback_handler::send_recipe_list;
use super::context::BotContext;
use super::ui_builder::main_menu_keyboard;
use super::update::Update;

pub type CommandHandler = for<'a> fn(&'a BotContext, &'a Update) -> BoxFuture<'a, Result<()>>;

/// Command name to handler lookup. Names are stored lowercased without the slash.
pub struct CommandTable {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The commands the bot advertises: start, help, recipes.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("start", start);
        table.register("help", help);
        table.register("recipes", recipes);
        table
    }

    pub fn register(&mut self, name: &'static str, handler: CommandHandler) {
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<CommandHandler> {
        self.handlers.get(name).copied()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Dispatch a command update; unknown names get a hint instead of silence.
pub async fn handle_command(
    ctx: &BotContext,
    commands: &CommandTable,
    update: &Update,
    name: &str,
) -> Result<()> {
    match commands.get(name) {
        Some(handler) => handler(ctx, update).await,
        None => {
            debug!(command = name, "Unknown command");
            ctx.transport
                .send_message(
                    update.chat_id,
                    &t_lang("unknown-command", update.sender.language()),
                    None,
                )
                .await?;
            Ok(())
        }
    }
}

/// Resolve the sender, telling them about a storage failure before propagating it.
pub(crate) async fn resolve_sender(ctx: &BotContext, update: &Update) -> Result<User> {
    match resolve_user(ctx.store.as_ref(), &update.sender.profile()).await {
        Ok(user) => Ok(user),
        Err(e) => {
            if let Err(send_error) = ctx
                .transport
                .send_message(
                    update.chat_id,
                    &t_lang("error-storage", update.sender.language()),
                    None,
                )
                .await
            {
                warn!(error = %send_error, "Failed to report storage failure to user");
            }
            Err(e)
        }
    }
}

fn start<'a>(ctx: &'a BotContext, update: &'a Update) -> BoxFuture<'a, Result<()>> {
    handle_start(ctx, update).boxed()
}

fn help<'a>(ctx: &'a BotContext, update: &'a Update) -> BoxFuture<'a, Result<()>> {
    handle_help(ctx, update).boxed()
}

fn recipes<'a>(ctx: &'a BotContext, update: &'a Update) -> BoxFuture<'a, Result<()>> {
    handle_recipes(ctx, update).boxed()
}

async fn handle_start(ctx: &BotContext, update: &Update) -> Result<()> {
    let user = resolve_sender(ctx, update).await?;
    info!(user_id = user.id, telegram_id = user.telegram_id, "User started the bot");

    let lang = update.sender.language();
    let name = escape_html(&update.sender.first_name);
    let welcome = format!(
        "👋 <b>{}</b>\n\n{}\n\n📸 {}\n\n{}",
        t_args_lang("welcome-title", &[("name", name.as_str())], lang),
        t_lang("welcome-description", lang),
        t_lang("welcome-send-photo", lang),
        t_lang("welcome-commands", lang)
    );

    ctx.transport
        .send_message(update.chat_id, &welcome, Some(main_menu_keyboard(lang)))
        .await?;
    Ok(())
}

async fn handle_help(ctx: &BotContext, update: &Update) -> Result<()> {
    ctx.transport
        .send_message(
            update.chat_id,
            &t_lang("help-text", update.sender.language()),
            None,
        )
        .await?;
    Ok(())
}

async fn handle_recipes(ctx: &BotContext, update: &Update) -> Result<()> {
    let user = resolve_sender(ctx, update).await?;
    send_recipe_list(ctx, update, &user).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_has_advertised_commands() {
        let table = CommandTable::standard();
        for name in ["start", "help", "recipes"] {
            assert!(table.get(name).is_some(), "missing /{name}");
        }
        assert!(table.get("settings").is_none());
    }
}
