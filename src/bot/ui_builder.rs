//! UI Builder module for creating keyboards and formatting messages

use crate::db::StoredRecipe;
use crate::localization::t_lang;
use crate::recipes::escape_html;

use super::callback_codec::CallbackAction;
use super::transport::{InlineButton, Keyboard};

const MAX_BUTTON_LABEL_CHARS: usize = 40;

/// Telegram rejects messages over 4096 characters; stay below it.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Shorten a label for an inline button, counting characters rather than bytes.
pub fn truncate_label(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > MAX_BUTTON_LABEL_CHARS {
        let head: String = text.chars().take(MAX_BUTTON_LABEL_CHARS - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Split message text into parts of at most `MAX_MESSAGE_CHARS` characters.
///
/// Parts break at line ends where possible, then at spaces, so HTML tags and
/// entities produced by the formatters stay whole. Short text is one part.
pub fn split_message(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for line in text.split_inclusive('\n') {
        let line_chars = line.chars().count();
        if current_chars + line_chars > MAX_MESSAGE_CHARS && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if line_chars <= MAX_MESSAGE_CHARS {
            current.push_str(line);
            current_chars += line_chars;
            continue;
        }

        for word in line.split_inclusive(' ') {
            let word_chars = word.chars().count();
            if current_chars + word_chars > MAX_MESSAGE_CHARS && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let mut rest = word;
            while rest.chars().count() > MAX_MESSAGE_CHARS {
                let cut = rest
                    .char_indices()
                    .nth(MAX_MESSAGE_CHARS)
                    .map_or(rest.len(), |(index, _)| index);
                parts.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
            current_chars += rest.chars().count();
        }
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

/// Format recognized items as a bulleted list under a heading
pub fn format_items_list(items: &[String], language_code: Option<&str>) -> String {
    let mut result = format!("<b>{}</b>\n", t_lang("recognized-items-title", language_code));
    for item in items {
        result.push_str(&format!("• {}\n", escape_html(item)));
    }
    result
}

/// One button per saved recipe, opening it
pub fn recipe_list_keyboard(recipes: &[StoredRecipe]) -> Keyboard {
    let rows = recipes
        .iter()
        .map(|recipe| {
            vec![InlineButton::new(
                format!("🍳 {}", truncate_label(&recipe.title)),
                CallbackAction::ViewRecipe(recipe.id),
            )]
        })
        .collect();
    Keyboard::Inline(rows)
}

/// Buttons under an opened saved recipe
pub fn recipe_view_keyboard(recipe_id: i64, language_code: Option<&str>) -> Keyboard {
    Keyboard::Inline(vec![
        vec![InlineButton::new(
            t_lang("button-delete", language_code),
            CallbackAction::DeleteRecipe(recipe_id),
        )],
        vec![InlineButton::new(
            t_lang("button-back", language_code),
            CallbackAction::ListRecipes,
        )],
    ])
}

/// Buttons under a freshly generated and saved recipe
pub fn saved_recipe_keyboard(recipe_id: i64, language_code: Option<&str>) -> Keyboard {
    Keyboard::Inline(vec![vec![
        InlineButton::new(
            t_lang("button-delete", language_code),
            CallbackAction::DeleteRecipe(recipe_id),
        ),
        InlineButton::new(
            t_lang("button-my-recipes", language_code),
            CallbackAction::ListRecipes,
        ),
    ]])
}

/// Reply keyboard shown after /start
pub fn main_menu_keyboard(language_code: Option<&str>) -> Keyboard {
    Keyboard::Reply(vec![vec![
        t_lang("keyboard-help", language_code),
        t_lang("keyboard-my-recipes", language_code),
    ]])
}
