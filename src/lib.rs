//! # Recipe Telegram Bot
//!
//! A Telegram bot that recognizes food products in photos with a vision
//! model, generates a recipe from them with a text model, and keeps each
//! user's recipes in PostgreSQL for later browsing.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod llm;
pub mod localization;
pub mod logging;
pub mod recipes;
pub mod structured_output;
pub mod vision;
