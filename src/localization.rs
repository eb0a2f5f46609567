//! Localized user-facing messages backed by Fluent bundles.
//!
//! Bundles are compiled into the binary from `locales/<lang>/main.ftl`.
//! Lookups pick the bundle from the Telegram user's language code and fall
//! back to English.

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("ru", include_str!("../locales/ru/main.ftl")),
];

/// Localization manager for the recipe bot
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in RESOURCES {
            bundles.insert(*language, Self::create_bundle(language, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(language: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Isolation marks would leak into plain Telegram text.
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("invalid {language} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("duplicate messages in {language} resource: {errors:?}"))?;

        Ok(bundle)
    }

    /// Map a Telegram language code (`ru`, `ru-RU`, `en_US`) to a shipped language.
    pub fn resolve_language(language_code: Option<&str>) -> &'static str {
        language_code
            .and_then(|code| code.split(['-', '_']).next())
            .map(str::to_ascii_lowercase)
            .and_then(|primary| {
                RESOURCES
                    .iter()
                    .map(|(language, _)| *language)
                    .find(|language| *language == primary)
            })
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Get a localized message in a specific language, falling back to English.
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .filter(|bundle| bundle.has_message(key))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let Some(message) = bundle.get_message(key) else {
            return format!("Missing translation: {key}");
        };
        let Some(pattern) = message.value() else {
            return format!("Missing value for key: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = Vec::new();
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager. Safe to call more than once.
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

fn manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        // The bundles are compiled in; failing here means a broken .ftl file.
        LocalizationManager::new().unwrap_or_else(|e| panic!("bundled locales are invalid: {e}"))
    })
}

/// Localized message for the user's language code.
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    let language = LocalizationManager::resolve_language(language_code);
    manager().get_message_in_language(key, language, None)
}

/// Localized message with named arguments.
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let language = LocalizationManager::resolve_language(language_code);
    let args: HashMap<&str, &str> = args.iter().copied().collect();
    manager().get_message_in_language(key, language, Some(&args))
}
