//! # Database Module
//!
//! PostgreSQL persistence for users and their saved recipes.
//!
//! Every recipe read or delete filters on both the recipe id and the owning
//! user's id in SQL, so one user can never observe or remove another user's
//! recipe, and concurrent deletes of the same id are harmless.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use crate::recipes::Recipe;

/// Internal user record keyed by Telegram user id
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display attributes reported by Telegram for the current sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl User {
    /// Whether the stored display fields differ from what Telegram reports now.
    pub fn differs_from(&self, profile: &UserProfile) -> bool {
        self.username != profile.username
            || self.first_name != profile.first_name
            || self.last_name != profile.last_name
    }
}

/// A recipe saved by its owner
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredRecipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// Rendered display form, shown as-is when the recipe is viewed
    pub content: String,
    pub ingredients: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Storage operations the bot needs.
///
/// `get_recipe` and `delete_recipe` must filter on id and owner together at
/// the storage boundary.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn get_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>>;
    async fn create_user(&self, profile: &UserProfile) -> Result<User>;
    async fn update_user(&self, profile: &UserProfile) -> Result<User>;
    async fn save_recipe(&self, user_id: i64, recipe: &Recipe, content: &str)
        -> Result<StoredRecipe>;
    /// Most recent first, at most `limit` entries.
    async fn list_recipes(&self, user_id: i64, limit: i64) -> Result<Vec<StoredRecipe>>;
    async fn get_recipe(&self, recipe_id: i64, user_id: i64) -> Result<Option<StoredRecipe>>;
    /// Returns whether a row was removed; removing nothing is not an error.
    async fn delete_recipe(&self, recipe_id: i64, user_id: i64) -> Result<bool>;
}

/// Connect to PostgreSQL
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL UNIQUE,
            username TEXT,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            ingredients TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS recipes_user_created_idx
         ON recipes (user_id, created_at DESC)",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, created_at, updated_at";
const RECIPE_COLUMNS: &str = "id, user_id, title, content, ingredients, created_at";

pub async fn get_user_by_telegram_id(pool: &PgPool, telegram_id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read user")
}

/// Insert a user; a concurrent insert for the same Telegram id converges on one row.
pub async fn create_user(pool: &PgPool, profile: &UserProfile) -> Result<User> {
    info!(telegram_id = profile.telegram_id, "Creating new user");

    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (telegram_id, username, first_name, last_name)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (telegram_id) DO UPDATE SET
             username = EXCLUDED.username,
             first_name = EXCLUDED.first_name,
             last_name = EXCLUDED.last_name,
             updated_at = NOW()
         RETURNING {USER_COLUMNS}"
    ))
    .bind(profile.telegram_id)
    .bind(&profile.username)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .fetch_one(pool)
    .await
    .context("Failed to create user")
}

pub async fn update_user(pool: &PgPool, profile: &UserProfile) -> Result<User> {
    debug!(telegram_id = profile.telegram_id, "Updating user display fields");

    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET username = $2, first_name = $3, last_name = $4, updated_at = NOW()
         WHERE telegram_id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(profile.telegram_id)
    .bind(&profile.username)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .fetch_one(pool)
    .await
    .context("Failed to update user")
}

pub async fn save_recipe(
    pool: &PgPool,
    user_id: i64,
    recipe: &Recipe,
    content: &str,
) -> Result<StoredRecipe> {
    let stored = sqlx::query_as::<_, StoredRecipe>(&format!(
        "INSERT INTO recipes (user_id, title, content, ingredients)
         VALUES ($1, $2, $3, $4)
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&recipe.title)
    .bind(content)
    .bind(&recipe.ingredients)
    .fetch_one(pool)
    .await
    .context("Failed to save recipe")?;

    info!(user_id, recipe_id = stored.id, "Recipe saved");
    Ok(stored)
}

pub async fn list_recipes_by_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<StoredRecipe>> {
    sqlx::query_as::<_, StoredRecipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list recipes")
}

pub async fn get_recipe(
    pool: &PgPool,
    recipe_id: i64,
    user_id: i64,
) -> Result<Option<StoredRecipe>> {
    sqlx::query_as::<_, StoredRecipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
    ))
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read recipe")
}

pub async fn delete_recipe(pool: &PgPool, recipe_id: i64, user_id: i64) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?
        .rows_affected();

    if rows_affected > 0 {
        info!(user_id, recipe_id, "Recipe deleted");
    } else {
        debug!(user_id, recipe_id, "No recipe deleted");
    }
    Ok(rows_affected > 0)
}

/// `RecipeStore` backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn get_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        get_user_by_telegram_id(&self.pool, telegram_id).await
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<User> {
        create_user(&self.pool, profile).await
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<User> {
        update_user(&self.pool, profile).await
    }

    async fn save_recipe(
        &self,
        user_id: i64,
        recipe: &Recipe,
        content: &str,
    ) -> Result<StoredRecipe> {
        save_recipe(&self.pool, user_id, recipe, content).await
    }

    async fn list_recipes(&self, user_id: i64, limit: i64) -> Result<Vec<StoredRecipe>> {
        list_recipes_by_user(&self.pool, user_id, limit).await
    }

    async fn get_recipe(&self, recipe_id: i64, user_id: i64) -> Result<Option<StoredRecipe>> {
        get_recipe(&self.pool, recipe_id, user_id).await
    }

    async fn delete_recipe(&self, recipe_id: i64, user_id: i64) -> Result<bool> {
        delete_recipe(&self.pool, recipe_id, user_id).await
    }
}
