//! Transport-independent inbound update model and its classification rule.

use crate::db::UserProfile;

/// The Telegram user an update came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

impl Sender {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            telegram_id: self.telegram_id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language_code.as_deref()
    }
}

/// One classified inbound event. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub sender: Sender,
    pub chat_id: i64,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// `/name args`; the name is lowercased and stripped of any `@botname`
    Command { name: String, args: String },
    /// Photo message; `file_id` is the largest size Telegram offered
    Photo { file_id: String },
    /// Inline button press
    Callback {
        callback_id: String,
        data: String,
        /// Message that hosted the pressed button, when Telegram still has it
        message_id: Option<i32>,
    },
    Text { text: String },
}

impl UpdateKind {
    pub fn name(&self) -> &'static str {
        match self {
            UpdateKind::Command { .. } => "command",
            UpdateKind::Photo { .. } => "photo",
            UpdateKind::Callback { .. } => "callback",
            UpdateKind::Text { .. } => "text",
        }
    }
}

/// An inbound event as the transport sees it, before classification.
#[derive(Debug, Clone, Default)]
pub struct RawUpdate {
    pub sender: Option<Sender>,
    pub chat_id: i64,
    pub text: Option<String>,
    /// Photo sizes in the order Telegram sends them, smallest first
    pub photo_file_ids: Vec<String>,
    pub callback: Option<RawCallback>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCallback {
    pub id: String,
    pub data: Option<String>,
    pub message_id: Option<i32>,
}

/// Split `/name@bot args` into a lowercased name and the remaining arguments.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.to_string()))
}

impl Update {
    /// Classify a raw event. Priority: explicit command, photo, callback,
    /// non-empty text. Anything else (or an event without a sender) is ignored.
    pub fn classify(raw: RawUpdate) -> Option<Update> {
        let sender = raw.sender?;
        let text = raw.text.as_deref();

        let kind = if let Some((name, args)) = text.and_then(parse_command) {
            UpdateKind::Command { name, args }
        } else if let Some(file_id) = raw.photo_file_ids.last() {
            UpdateKind::Photo {
                file_id: file_id.clone(),
            }
        } else if let Some(callback) = raw.callback {
            UpdateKind::Callback {
                callback_id: callback.id,
                data: callback.data.unwrap_or_default(),
                message_id: callback.message_id,
            }
        } else if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            UpdateKind::Text {
                text: text.to_string(),
            }
        } else {
            return None;
        };

        Some(Update {
            sender,
            chat_id: raw.chat_id,
            kind,
        })
    }
}
