//! # Localization Tests
//!
//! Message retrieval, argument formatting and language fallback.

use recipe_bot::localization::LocalizationManager;
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-text", "en", None);
        assert!(message.contains("/recipes"));
        assert!(message.contains("<b>"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("recipe-not-found", "de", None);
        assert_eq!(message, "Recipe not found.");
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("name", "Ann");

        let message = manager.get_message_in_language("welcome-title", "en", Some(&args));
        assert_eq!(message, "Hello, Ann!");
    }

    #[test]
    fn test_russian_localization() {
        let manager = setup_localization();

        let russian = manager.get_message_in_language("recipes-empty", "ru", None);
        let english = manager.get_message_in_language("recipes-empty", "en", None);
        assert!(!russian.is_empty());
        assert_ne!(russian, english);
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(LocalizationManager::resolve_language(Some("en")), "en");
        assert_eq!(LocalizationManager::resolve_language(Some("ru-RU")), "ru");
        assert_eq!(LocalizationManager::resolve_language(Some("RU")), "ru");
        assert_eq!(LocalizationManager::resolve_language(None), "en");
        assert_eq!(LocalizationManager::resolve_language(Some("fr")), "en");
    }

    #[test]
    fn test_convenience_functions() {
        recipe_bot::localization::init_localization().expect("Failed to initialize localization");

        let message = recipe_bot::localization::t_lang("keyboard-help", Some("en"));
        assert_eq!(message, "Help");

        let greeting =
            recipe_bot::localization::t_args_lang("welcome-title", &[("name", "Ivan")], Some("ru"));
        assert!(greeting.contains("Ivan"));
    }
}
