//! Outbound messaging interface the handlers talk to.

use anyhow::Result;
use async_trait::async_trait;

use super::callback_codec::CallbackAction;
use super::ui_builder::split_message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub action: CallbackAction,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message, answered through callback queries
    Inline(Vec<Vec<InlineButton>>),
    /// Persistent reply keyboard; pressing a button sends its label as text
    Reply(Vec<Vec<String>>),
}

/// Messaging platform operations. Text is sent with HTML formatting.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message and return its id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;

    /// Acknowledge a button press so the client stops its loading indicator.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;

    /// Download the raw bytes of an uploaded file.
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Send text that may exceed the platform's message size as consecutive
/// messages. The keyboard goes on the last part; its id is returned.
pub async fn send_long_message(
    transport: &dyn Transport,
    chat_id: i64,
    text: &str,
    keyboard: Option<Keyboard>,
) -> Result<i32> {
    let mut parts = split_message(text);
    let last = parts.pop().unwrap_or_default();
    for part in &parts {
        transport.send_message(chat_id, part, None).await?;
    }
    transport.send_message(chat_id, &last, keyboard).await
}
