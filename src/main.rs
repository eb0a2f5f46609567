use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use recipe_bot::bot::telegram::{register_commands, run_polling, TelegramTransport};
use recipe_bot::bot::{BotContext, CommandTable, Dispatcher};
use recipe_bot::config::Config;
use recipe_bot::db::{self, PgRecipeStore};
use recipe_bot::llm::OpenAiClient;
use recipe_bot::localization::init_localization;
use recipe_bot::logging::init_tracing;
use recipe_bot::recipes::RecipeGenerator;
use recipe_bot::vision::ItemRecognizer;

const UPDATE_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format)?;
    init_localization()?;

    info!("Starting Recipe Telegram Bot");

    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    db::init_database_schema(&pool).await?;

    let http = reqwest::Client::new();
    let vision_client = Arc::new(OpenAiClient::from_config(http.clone(), &config.vision));
    let generation_client = Arc::new(OpenAiClient::from_config(http.clone(), &config.generation));

    let bot = Bot::new(&config.telegram_bot_token);
    if let Err(e) = register_commands(&bot).await {
        error!(error = %e, "Could not register bot commands, continuing");
    }

    let ctx = Arc::new(BotContext {
        transport: Arc::new(TelegramTransport::new(bot.clone(), http)),
        store: Arc::new(PgRecipeStore::new(pool)),
        recognizer: ItemRecognizer::new(vision_client, &config.vision, &config.recovery),
        generator: RecipeGenerator::new(generation_client, &config.generation, &config.recovery),
        max_recipes: config.max_recipes_per_user,
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_for_shutdown(shutdown.clone()));

    let (sender, receiver) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
    let poller = tokio::spawn(run_polling(bot, sender, shutdown.clone()));

    info!("Bot initialized, starting dispatcher");
    let dispatcher = Dispatcher::new(ctx, CommandTable::standard(), config.shutdown_grace);
    dispatcher.run(receiver, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = poller.await {
        error!(error = %e, "Polling task failed");
    }

    info!("Recipe Telegram Bot stopped");
    Ok(())
}

async fn watch_for_shutdown(shutdown: CancellationToken) {
    wait_for_signal().await;
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "Could not install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
