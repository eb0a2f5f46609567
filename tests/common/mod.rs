//! In-memory fakes for the transport, capability and storage seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use recipe_bot::bot::{BotContext, Keyboard, Sender, Transport, Update, UpdateKind};
use recipe_bot::config::{CapabilityConfig, RecoveryConfig};
use recipe_bot::db::{RecipeStore, StoredRecipe, User, UserProfile};
use recipe_bot::errors::CapabilityError;
use recipe_bot::llm::{ChatCompletion, ChatRequest};
use recipe_bot::recipes::{Recipe, RecipeGenerator};
use recipe_bot::vision::ItemRecognizer;

/// Smallest byte prefix the image sniffer recognizes as PNG
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub const OMELETTE_JSON: &str = r#"{"title":"Tomato Omelette","ingredients":["2 eggs","1 tomato"],"instructions":"Whisk and cook."}"#;

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub id: i32,
}

pub struct RecordingTransport {
    pub sent: Mutex<Vec<SentMessage>>,
    pub deleted: Mutex<Vec<(i64, i32)>>,
    pub answered: Mutex<Vec<String>>,
    pub file: Vec<u8>,
    pub fail_fetch: AtomicBool,
    /// Zero-based index of the send attempt that fails, if any
    pub fail_send_at: Mutex<Option<usize>>,
    attempts: AtomicUsize,
    next_id: AtomicI32,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::with_file(PNG_BYTES.to_vec())
    }

    pub fn with_file(file: Vec<u8>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            answered: Mutex::new(Vec::new()),
            file,
            fail_fetch: AtomicBool::new(false),
            fail_send_at: Mutex::new(None),
            attempts: AtomicUsize::new(0),
            next_id: AtomicI32::new(100),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn last(&self) -> SentMessage {
        self.sent().pop().expect("no message sent")
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_send_at.lock().unwrap() == Some(attempt) {
            return Err(anyhow!("send rejected"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
            id,
        });
        Ok(id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    async fn fetch_file(&self, _file_id: &str) -> Result<Vec<u8>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow!("download failed"));
        }
        Ok(self.file.clone())
    }
}

/// Replays canned responses in order; an exhausted script answers with no content.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, CapabilityError>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
    gate: Option<Arc<Notify>>,
    pub started: Arc<Notify>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String, CapabilityError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Arc::new(Notify::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Block every call until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<String, CapabilityError> {
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CapabilityError::EmptyResponse))
    }
}

/// Store that applies the same owner filtering as the SQL queries.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    recipes: Mutex<Vec<StoredRecipe>>,
    next_user_id: AtomicI64,
    next_recipe_id: AtomicI64,
    pub user_writes: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipes(&self) -> Vec<StoredRecipe> {
        self.recipes.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn user_writes(&self) -> usize {
        self.user_writes.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(anyhow!("database unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<User> {
        self.user_writes.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter().find(|u| u.telegram_id == profile.telegram_id) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1,
            telegram_id: profile.telegram_id,
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<User> {
        self.user_writes.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.telegram_id == profile.telegram_id)
            .ok_or_else(|| anyhow!("user not found"))?;
        user.username = profile.username.clone();
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn save_recipe(
        &self,
        user_id: i64,
        recipe: &Recipe,
        content: &str,
    ) -> Result<StoredRecipe> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        let stored = StoredRecipe {
            id: self.next_recipe_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            title: recipe.title.clone(),
            content: content.to_string(),
            ingredients: recipe.ingredients.clone(),
            created_at: Utc::now(),
        };
        self.recipes.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_recipes(&self, user_id: i64, limit: i64) -> Result<Vec<StoredRecipe>> {
        self.check_reads()?;
        let mut owned: Vec<StoredRecipe> = self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        owned.truncate(limit.max(0) as usize);
        Ok(owned)
    }

    async fn get_recipe(&self, recipe_id: i64, user_id: i64) -> Result<Option<StoredRecipe>> {
        self.check_reads()?;
        Ok(self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == recipe_id && r.user_id == user_id)
            .cloned())
    }

    async fn delete_recipe(&self, recipe_id: i64, user_id: i64) -> Result<bool> {
        self.check_reads()?;
        let mut recipes = self.recipes.lock().unwrap();
        let before = recipes.len();
        recipes.retain(|r| !(r.id == recipe_id && r.user_id == user_id));
        Ok(recipes.len() < before)
    }
}

pub fn capability_config() -> CapabilityConfig {
    CapabilityConfig {
        api_base: "http://localhost".to_string(),
        api_key: "test".to_string(),
        model: "test-model".to_string(),
        max_tokens: 100,
    }
}

pub fn context(
    transport: Arc<RecordingTransport>,
    store: Arc<MemoryStore>,
    vision: Arc<ScriptedCompletion>,
    generation: Arc<ScriptedCompletion>,
) -> BotContext {
    let recovery = RecoveryConfig::default();
    BotContext {
        transport,
        store,
        recognizer: ItemRecognizer::new(vision, &capability_config(), &recovery),
        generator: RecipeGenerator::new(generation, &capability_config(), &recovery),
        max_recipes: 50,
    }
}

/// Context whose capabilities are never expected to be called
pub fn idle_context(transport: Arc<RecordingTransport>, store: Arc<MemoryStore>) -> BotContext {
    context(
        transport,
        store,
        Arc::new(ScriptedCompletion::new(vec![])),
        Arc::new(ScriptedCompletion::new(vec![])),
    )
}

pub fn sender(telegram_id: i64) -> Sender {
    Sender {
        telegram_id,
        username: Some(format!("user{telegram_id}")),
        first_name: "Ann".to_string(),
        last_name: None,
        language_code: Some("en".to_string()),
    }
}

pub fn update(telegram_id: i64, kind: UpdateKind) -> Update {
    Update {
        sender: sender(telegram_id),
        chat_id: telegram_id,
        kind,
    }
}

pub fn photo_update(telegram_id: i64) -> Update {
    update(
        telegram_id,
        UpdateKind::Photo {
            file_id: "photo-large".to_string(),
        },
    )
}

pub fn command_update(telegram_id: i64, name: &str) -> Update {
    update(
        telegram_id,
        UpdateKind::Command {
            name: name.to_string(),
            args: String::new(),
        },
    )
}

pub fn text_update(telegram_id: i64, text: &str) -> Update {
    update(
        telegram_id,
        UpdateKind::Text {
            text: text.to_string(),
        },
    )
}

pub fn callback_update(telegram_id: i64, data: &str, message_id: Option<i32>) -> Update {
    update(
        telegram_id,
        UpdateKind::Callback {
            callback_id: format!("cb-{telegram_id}-{data}"),
            data: data.to_string(),
            message_id,
        },
    )
}

/// Save a recipe for `telegram_id` directly through the store.
pub async fn seed_recipe(store: &MemoryStore, telegram_id: i64, title: &str) -> StoredRecipe {
    let user = recipe_bot::identity::resolve_user(store, &sender(telegram_id).profile())
        .await
        .unwrap();
    let recipe = Recipe {
        title: title.to_string(),
        ingredients: vec!["water".to_string()],
        instructions: "Boil.".to_string(),
    };
    store
        .save_recipe(user.id, &recipe, &format!("<b>{title}</b>"))
        .await
        .unwrap()
}
