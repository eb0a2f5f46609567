//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `update`: transport-independent update model and classification
//! - `callback_codec`: inline button payload encoding
//! - `transport`: outbound messaging interface, `telegram` implements it
//! - `dispatcher`: concurrent fan-out of updates to handlers
//! - `commands`, `message_handler`, `photo_handler`, `callback_handler`: handlers
//! - `ui_builder`: keyboards and message formatting

pub mod callback_codec;
pub mod callback_handler;
pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod message_handler;
pub mod photo_handler;
pub mod telegram;
pub mod transport;
pub mod ui_builder;
pub mod update;

pub use callback_codec::CallbackAction;
pub use callback_handler::{handle_callback, perform_action, CallbackOutcome};
pub use commands::CommandTable;
pub use context::BotContext;
pub use dispatcher::{handle_update, Dispatcher};
pub use photo_handler::{handle_photo, PhotoOutcome};
pub use transport::{InlineButton, Keyboard, Transport};
pub use update::{RawCallback, RawUpdate, Sender, Update, UpdateKind};
