//! Photo pipeline: download, recognize, generate, persist, deliver.
//!
//! Each stage failure ends the pipeline with one localized message to the
//! user. Capability and format failures are expected outcomes and are not
//! returned as errors; only transport and identity failures propagate.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::errors::{CapabilityError, GenerationError, RecognitionError};
use crate::localization::t_lang;
use crate::recipes::format_recipe;

use super::commands::resolve_sender;
use super::context::BotContext;
use super::transport::{send_long_message, Keyboard};
use super::ui_builder::{format_items_list, saved_recipe_keyboard};
use super::update::Update;

/// How a photo update ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// Recipe delivered; `recipe_id` is set when it was also saved
    Delivered { recipe_id: Option<i64> },
    /// A stage failed and the user was told which message key
    Failed { message_key: &'static str },
}

fn recognition_failure_key(error: &RecognitionError) -> &'static str {
    match error {
        RecognitionError::Capability(CapabilityError::Unavailable) => "capability-unavailable",
        RecognitionError::Capability(_) => "recognition-failed",
        RecognitionError::UnsupportedImage => "error-unsupported-format",
        RecognitionError::Empty => "recognition-empty",
        RecognitionError::Malformed(_) => "error-not-understood",
    }
}

fn generation_failure_key(error: &GenerationError) -> &'static str {
    match error {
        GenerationError::Capability(CapabilityError::Unavailable) => "capability-unavailable",
        GenerationError::Capability(_) => "generation-failed",
        GenerationError::Malformed(_) => "error-not-understood",
    }
}

pub async fn handle_photo(ctx: &BotContext, update: &Update, file_id: &str) -> Result<PhotoOutcome> {
    let lang = update.sender.language();
    let chat_id = update.chat_id;

    let user = resolve_sender(ctx, update).await?;
    info!(user_id = user.id, "Processing photo");

    let status_id = ctx
        .transport
        .send_message(chat_id, &format!("📸 {}", t_lang("processing-photo", lang)), None)
        .await?;

    let fail = |message_key: &'static str| async move {
        if let Err(e) = ctx.transport.delete_message(chat_id, status_id).await {
            warn!(error = %e, "Failed to remove status message");
        }
        ctx.transport
            .send_message(chat_id, &format!("❌ {}", t_lang(message_key, lang)), None)
            .await?;
        Ok::<_, anyhow::Error>(PhotoOutcome::Failed { message_key })
    };

    let image = match ctx.transport.fetch_file(file_id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to download photo");
            return fail("error-download-failed").await;
        }
    };

    let items = match ctx.recognizer.recognize(&image).await {
        Ok(recognized) => recognized.items,
        Err(e) => {
            warn!(error = %e, "Recognition stage failed");
            return fail(recognition_failure_key(&e)).await;
        }
    };

    let items_message = format!(
        "{}\n👨‍🍳 {}",
        format_items_list(&items, lang),
        t_lang("generating-recipe", lang)
    );
    if let Err(e) = ctx.transport.send_message(chat_id, &items_message, None).await {
        if let Err(delete_error) = ctx.transport.delete_message(chat_id, status_id).await {
            warn!(error = %delete_error, "Failed to remove status message");
        }
        return Err(e);
    }

    let recipe = match ctx.generator.generate(&items).await {
        Ok(recipe) => recipe,
        Err(e) => {
            warn!(error = %e, "Generation stage failed");
            return fail(generation_failure_key(&e)).await;
        }
    };

    let content = format_recipe(&recipe, lang);

    // Losing the saved copy does not cost the user the recipe itself.
    let (recipe_id, keyboard): (Option<i64>, Option<Keyboard>) =
        match ctx.store.save_recipe(user.id, &recipe, &content).await {
            Ok(stored) => (Some(stored.id), Some(saved_recipe_keyboard(stored.id, lang))),
            Err(e) => {
                warn!(error = %e, user_id = user.id, "Failed to save recipe, delivering anyway");
                (None, None)
            }
        };

    if let Err(e) = ctx.transport.delete_message(chat_id, status_id).await {
        warn!(error = %e, "Failed to remove status message");
    }
    send_long_message(ctx.transport.as_ref(), chat_id, &content, keyboard).await?;

    info!(user_id = user.id, ?recipe_id, title = %recipe.title, "Recipe delivered");
    Ok(PhotoOutcome::Delivered { recipe_id })
}
