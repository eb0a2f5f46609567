//! Concurrent update dispatcher.
//!
//! Each update runs in its own task so a slow photo pipeline never delays a
//! command from another user. On shutdown no new updates are accepted and
//! in-flight handlers get a bounded grace period to finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::callback_handler::handle_callback;
use super::commands::{handle_command, CommandTable};
use super::context::BotContext;
use super::message_handler::handle_text;
use super::photo_handler::handle_photo;
use super::update::{Update, UpdateKind};

pub struct Dispatcher {
    ctx: Arc<BotContext>,
    commands: Arc<CommandTable>,
    tracker: TaskTracker,
    grace: Duration,
}

impl Dispatcher {
    pub fn new(ctx: Arc<BotContext>, commands: CommandTable, grace: Duration) -> Self {
        Self {
            ctx,
            commands: Arc::new(commands),
            tracker: TaskTracker::new(),
            grace,
        }
    }

    /// Number of handlers still running
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start handling one update in the background.
    pub fn spawn(&self, update: Update) {
        let ctx = Arc::clone(&self.ctx);
        let commands = Arc::clone(&self.commands);
        let span = info_span!(
            "update",
            kind = update.kind.name(),
            telegram_id = update.sender.telegram_id,
            chat_id = update.chat_id
        );

        self.tracker.spawn(
            async move {
                if let Err(e) = handle_update(&ctx, &commands, &update).await {
                    error!(error = %e, "Update handler failed");
                }
            }
            .instrument(span),
        );
    }

    /// Dispatch updates until the channel closes or `shutdown` fires, then
    /// wait up to the grace period for running handlers.
    pub async fn run(&self, mut updates: mpsc::Receiver<Update>, shutdown: CancellationToken) {
        info!("Dispatcher started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting updates");
                    break;
                }
                update = updates.recv() => match update {
                    Some(update) => self.spawn(update),
                    None => {
                        debug!("Update channel closed");
                        break;
                    }
                },
            }
        }

        self.drain().await;
    }

    /// Stop accepting work and wait for in-flight handlers, bounded by the grace period.
    pub async fn drain(&self) {
        self.tracker.close();
        if tokio::time::timeout(self.grace, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                in_flight = self.tracker.len(),
                grace_secs = self.grace.as_secs(),
                "Grace period elapsed with handlers still running"
            );
        } else {
            info!("All update handlers finished");
        }
    }
}

/// Route one classified update to its handler.
pub async fn handle_update(ctx: &BotContext, commands: &CommandTable, update: &Update) -> Result<()> {
    match &update.kind {
        UpdateKind::Command { name, .. } => handle_command(ctx, commands, update, name).await,
        UpdateKind::Photo { file_id } => {
            let outcome = handle_photo(ctx, update, file_id).await?;
            debug!(?outcome, "Photo handled");
            Ok(())
        }
        UpdateKind::Callback {
            callback_id,
            data,
            message_id,
        } => {
            let outcome = handle_callback(ctx, update, callback_id, data, *message_id).await?;
            debug!(?outcome, "Callback handled");
            Ok(())
        }
        UpdateKind::Text { text } => handle_text(ctx, commands, update, text).await,
    }
}
