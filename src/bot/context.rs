use std::sync::Arc;

use crate::db::RecipeStore;
use crate::recipes::RecipeGenerator;
use crate::vision::ItemRecognizer;

use super::transport::Transport;

/// Shared, read-only handles every update handler works with.
pub struct BotContext {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn RecipeStore>,
    pub recognizer: ItemRecognizer,
    pub generator: RecipeGenerator,
    /// Upper bound on entries shown in the saved-recipe list
    pub max_recipes: i64,
}
