//! # Recipe Generation Module
//!
//! Wraps the text-generation capability (item list in, structured recipe out)
//! and renders recipes for display.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CapabilityConfig, RecoveryConfig};
use crate::errors::GenerationError;
use crate::llm::{ChatCompletion, ChatMessage, ChatRequest, GuardedCompletion};
use crate::localization::t_lang;
use crate::structured_output::{parse_object, Schema};

const SYSTEM_PROMPT: &str =
    "You are a culinary expert. Your job is to create recipes from the products that are available.";

/// A generated recipe. Every field is required to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
}

impl Schema for Recipe {
    fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.ingredients.is_empty()
            || self.ingredients.iter().any(|i| i.trim().is_empty())
        {
            Some("ingredients")
        } else if self.instructions.trim().is_empty() {
            Some("instructions")
        } else {
            None
        }
    }
}

/// Parse generation output. Strict only: recipes never come from loose lines.
pub fn parse_recipe(text: &str) -> Result<Recipe, GenerationError> {
    Ok(parse_object(text)?)
}

fn recipe_prompt(items: &[String]) -> String {
    format!(
        "Come up with a recipe based on the following products.\n\
         Products: {}.\n\n\
         You do not have to use every product in the list, and you may add basic \
         ingredients that are not in it.\n\
         Return the recipe as JSON with the following fields:\n\
         {{\n  \"title\": \"Recipe name\",\n  \"ingredients\": [\"ingredient 1\", \"ingredient 2\", ...],\n  \
         \"instructions\": \"Step-by-step cooking instructions\"\n}}\n\n\
         Do not add any other fields or text, only JSON.",
        items.join(", ")
    )
}

/// Recipe-generation adapter over a chat-completion text model.
pub struct RecipeGenerator {
    completion: GuardedCompletion,
    model: String,
    max_tokens: u32,
}

impl RecipeGenerator {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        config: &CapabilityConfig,
        recovery: &RecoveryConfig,
    ) -> Self {
        Self {
            completion: GuardedCompletion::new(client, recovery),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub async fn generate(&self, items: &[String]) -> Result<Recipe, GenerationError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(recipe_prompt(items)),
            ],
            max_tokens: self.max_tokens,
        };

        let content = self.completion.complete(request).await?;
        debug!(content = %content, "Generation capability response");

        match parse_recipe(&content) {
            Ok(recipe) => {
                info!(
                    title = %recipe.title,
                    ingredients_count = recipe.ingredients.len(),
                    "Recipe generated"
                );
                Ok(recipe)
            }
            Err(GenerationError::Malformed(e)) => {
                warn!(error = %e, raw = %content, "Generation output could not be used");
                Err(GenerationError::Malformed(e))
            }
            Err(e) => Err(e),
        }
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a recipe as Telegram HTML: title, numbered ingredients, instructions.
pub fn format_recipe(recipe: &Recipe, language_code: Option<&str>) -> String {
    let mut result = format!("🍳 <b>{}</b>\n\n", escape_html(recipe.title.trim()));

    result.push_str(&format!(
        "<b>{}</b>\n",
        t_lang("recipe-ingredients-heading", language_code)
    ));
    for (i, ingredient) in recipe.ingredients.iter().enumerate() {
        result.push_str(&format!("{}. {}\n", i + 1, escape_html(ingredient.trim())));
    }

    result.push_str(&format!(
        "\n<b>{}</b>\n",
        t_lang("recipe-instructions-heading", language_code)
    ));
    result.push_str(&escape_html(&recipe.instructions));

    result
}
