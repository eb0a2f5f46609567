//! Callback Handler module for processing inline keyboard callback queries
//!
//! Every action re-derives the acting user from the callback's sender and
//! passes that user's id to storage, so a token for someone else's recipe
//! behaves exactly like a token for a recipe that does not exist.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::db::User;
use crate::localization::t_lang;

use super::callback_codec::CallbackAction;
use super::commands::resolve_sender;
use super::context::BotContext;
use super::transport::send_long_message;
use super::ui_builder::{recipe_list_keyboard, recipe_view_keyboard};
use super::update::Update;

/// What a callback ended up doing, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Listed(usize),
    Empty,
    Viewed(i64),
    NotFound,
    Deleted { removed: bool },
    Invalid,
}

/// Handle one button press. The callback is answered exactly once, after the
/// action has run, whatever its outcome.
pub async fn handle_callback(
    ctx: &BotContext,
    update: &Update,
    callback_id: &str,
    data: &str,
    message_id: Option<i32>,
) -> Result<CallbackOutcome> {
    debug!(telegram_id = update.sender.telegram_id, data, "Received callback query");

    let outcome = match CallbackAction::decode(data) {
        Ok(action) => perform_action(ctx, update, action, message_id).await,
        Err(e) => {
            warn!(error = %e, "Rejected callback token");
            ctx.transport
                .send_message(
                    update.chat_id,
                    &t_lang("callback-invalid", update.sender.language()),
                    None,
                )
                .await
                .map(|_| CallbackOutcome::Invalid)
        }
    };

    if let Err(e) = ctx.transport.answer_callback(callback_id).await {
        warn!(error = %e, callback_id, "Failed to answer callback query");
    }

    outcome
}

/// Run a decoded action on behalf of the callback's sender.
pub async fn perform_action(
    ctx: &BotContext,
    update: &Update,
    action: CallbackAction,
    message_id: Option<i32>,
) -> Result<CallbackOutcome> {
    let user = resolve_sender(ctx, update).await?;

    match action {
        CallbackAction::ListRecipes => send_recipe_list(ctx, update, &user).await,
        CallbackAction::ViewRecipe(recipe_id) => view_recipe(ctx, update, &user, recipe_id).await,
        CallbackAction::DeleteRecipe(recipe_id) => {
            delete_recipe(ctx, update, &user, recipe_id, message_id).await
        }
    }
}

/// Send the user's most recent recipes as a button list, or the empty-state hint.
pub async fn send_recipe_list(
    ctx: &BotContext,
    update: &Update,
    user: &User,
) -> Result<CallbackOutcome> {
    let lang = update.sender.language();
    let recipes = match ctx.store.list_recipes(user.id, ctx.max_recipes).await {
        Ok(recipes) => recipes,
        Err(e) => return Err(report_storage_failure(ctx, update, e).await),
    };

    if recipes.is_empty() {
        ctx.transport
            .send_message(update.chat_id, &t_lang("recipes-empty", lang), None)
            .await?;
        return Ok(CallbackOutcome::Empty);
    }

    debug!(user_id = user.id, count = recipes.len(), "Listing saved recipes");
    ctx.transport
        .send_message(
            update.chat_id,
            &format!("📖 <b>{}</b>", t_lang("recipes-list-title", lang)),
            Some(recipe_list_keyboard(&recipes)),
        )
        .await?;
    Ok(CallbackOutcome::Listed(recipes.len()))
}

async fn view_recipe(
    ctx: &BotContext,
    update: &Update,
    user: &User,
    recipe_id: i64,
) -> Result<CallbackOutcome> {
    let lang = update.sender.language();
    let recipe = match ctx.store.get_recipe(recipe_id, user.id).await {
        Ok(recipe) => recipe,
        Err(e) => return Err(report_storage_failure(ctx, update, e).await),
    };

    match recipe {
        Some(recipe) => {
            send_long_message(
                ctx.transport.as_ref(),
                update.chat_id,
                &recipe.content,
                Some(recipe_view_keyboard(recipe.id, lang)),
            )
            .await?;
            Ok(CallbackOutcome::Viewed(recipe.id))
        }
        None => {
            debug!(user_id = user.id, recipe_id, "Recipe not found for user");
            ctx.transport
                .send_message(update.chat_id, &t_lang("recipe-not-found", lang), None)
                .await?;
            Ok(CallbackOutcome::NotFound)
        }
    }
}

async fn delete_recipe(
    ctx: &BotContext,
    update: &Update,
    user: &User,
    recipe_id: i64,
    message_id: Option<i32>,
) -> Result<CallbackOutcome> {
    let removed = match ctx.store.delete_recipe(recipe_id, user.id).await {
        Ok(removed) => removed,
        Err(e) => return Err(report_storage_failure(ctx, update, e).await),
    };
    info!(user_id = user.id, recipe_id, removed, "Handled recipe delete");

    if let Some(message_id) = message_id {
        if let Err(e) = ctx.transport.delete_message(update.chat_id, message_id).await {
            warn!(error = %e, message_id, "Failed to remove recipe message");
        }
    }

    ctx.transport
        .send_message(
            update.chat_id,
            &t_lang("recipe-deleted", update.sender.language()),
            None,
        )
        .await?;
    Ok(CallbackOutcome::Deleted { removed })
}

async fn report_storage_failure(
    ctx: &BotContext,
    update: &Update,
    error: anyhow::Error,
) -> anyhow::Error {
    if let Err(e) = ctx
        .transport
        .send_message(
            update.chat_id,
            &t_lang("error-storage", update.sender.language()),
            None,
        )
        .await
    {
        warn!(error = %e, "Failed to report storage failure to user");
    }
    error
}
