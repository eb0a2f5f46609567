//! Telegram Bot API adapter built on teloxide.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use teloxide::prelude::*;
use teloxide::types::{
    AllowedUpdate, BotCommand, CallbackQuery, CallbackQueryId, FileId, InlineKeyboardButton,
    InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, Message, MessageId, ParseMode, ReplyMarkup,
    Update as TelegramUpdate, UpdateKind as TelegramUpdateKind, User as TelegramUser,
};
use teloxide::update_listeners::{AsUpdateStream, Polling, UpdateListener};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::localization::t_lang;

use super::transport::{Keyboard, Transport};
use super::update::{RawCallback, RawUpdate, Sender, Update};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Languages the command menu is registered for, besides the default
const COMMAND_MENU_LANGUAGES: &[&str] = &["ru"];

pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot: Bot, http: reqwest::Client) -> Self {
        Self { bot, http }
    }
}

fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(
            rows.into_iter().map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton::callback(button.label, button.action.encode()))
                    .collect::<Vec<_>>()
            }),
        )),
        Keyboard::Reply(rows) => ReplyMarkup::Keyboard(KeyboardMarkup::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
        )),
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        let sent = match keyboard {
            Some(keyboard) => request.reply_markup(reply_markup(keyboard)).await,
            None => request.await,
        }
        .context("Failed to send message")?;
        Ok(sent.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .context("Failed to delete message")?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
            .context("Failed to answer callback query")?;
        Ok(())
    }

    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("Failed to resolve file")?;
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let bytes = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to download file")?
            .error_for_status()
            .context("File download rejected")?
            .bytes()
            .await
            .context("Failed to read file body")?;

        debug!(size = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }
}

/// Publish the command menu in the default language and each localized one.
pub async fn register_commands(bot: &Bot) -> Result<()> {
    let commands_for = |lang: Option<&str>| {
        vec![
            BotCommand::new("start", t_lang("command-start-description", lang)),
            BotCommand::new("help", t_lang("command-help-description", lang)),
            BotCommand::new("recipes", t_lang("command-recipes-description", lang)),
        ]
    };

    bot.set_my_commands(commands_for(None))
        .await
        .context("Failed to register bot commands")?;

    for &lang in COMMAND_MENU_LANGUAGES {
        bot.set_my_commands(commands_for(Some(lang)))
            .language_code(lang.to_string())
            .await
            .with_context(|| format!("Failed to register bot commands for {lang}"))?;
    }

    info!("Bot commands registered");
    Ok(())
}

fn sender_from(user: &TelegramUser) -> Sender {
    Sender {
        telegram_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone(),
    }
}

fn raw_from_message(message: &Message) -> RawUpdate {
    RawUpdate {
        sender: message.from.as_ref().map(sender_from),
        chat_id: message.chat.id.0,
        text: message.text().map(str::to_string),
        photo_file_ids: message
            .photo()
            .map(|sizes| sizes.iter().map(|size| size.file.id.0.clone()).collect())
            .unwrap_or_default(),
        callback: None,
    }
}

fn raw_from_callback(query: &CallbackQuery) -> RawUpdate {
    let sender = sender_from(&query.from);
    // Without the hosting message the private chat id equals the user id.
    let chat_id = query
        .message
        .as_ref()
        .map(|message| message.chat().id.0)
        .unwrap_or(sender.telegram_id);

    RawUpdate {
        chat_id,
        text: None,
        photo_file_ids: Vec::new(),
        callback: Some(RawCallback {
            id: query.id.0.clone(),
            data: query.data.clone(),
            message_id: query.message.as_ref().map(|message| message.id().0),
        }),
        sender: Some(sender),
    }
}

/// Map a Telegram update onto the bot's update model; unsupported kinds yield `None`.
pub fn convert_update(update: TelegramUpdate) -> Option<Update> {
    let raw = match &update.kind {
        TelegramUpdateKind::Message(message) => raw_from_message(message),
        TelegramUpdateKind::CallbackQuery(query) => raw_from_callback(query),
        _ => return None,
    };
    Update::classify(raw)
}

/// Long-poll Telegram and forward classified updates until `shutdown` fires
/// or the receiving side goes away.
pub async fn run_polling(bot: Bot, updates: mpsc::Sender<Update>, shutdown: CancellationToken) {
    let mut listener = Polling::builder(bot)
        .timeout(POLL_TIMEOUT)
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
        .delete_webhook()
        .await
        .build();
    let stop_token = listener.stop_token();
    let stream = listener.as_stream();
    tokio::pin!(stream);
    info!("Polling for updates");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(telegram_update)) => {
                let Some(update) = convert_update(telegram_update) else {
                    continue;
                };
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    sent = updates.send(update) => {
                        if sent.is_err() {
                            debug!("Dispatcher gone, stopping polling");
                            break;
                        }
                    }
                }
            }
            // The listener backs off before its next request.
            Some(Err(e)) => warn!(error = %e, "Failed to fetch updates"),
            None => {
                info!("Update polling stopped");
                return;
            }
        }
    }

    // A stopped listener confirms the batch it already handed out, then ends.
    // Updates it still yields arrive after the dispatcher stopped accepting work.
    stop_token.stop();
    let confirm = async {
        let mut dropped = 0usize;
        while stream.next().await.is_some() {
            dropped += 1;
        }
        dropped
    };
    match tokio::time::timeout(STOP_CONFIRM_TIMEOUT, confirm).await {
        Ok(dropped) => debug!(dropped, "Confirmed last update batch"),
        Err(_) => warn!("Timed out confirming the last update batch"),
    }

    info!("Update polling stopped");
}
