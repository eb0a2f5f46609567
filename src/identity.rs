//! Get-or-create resolution of Telegram senders to internal users.

use anyhow::Result;
use tracing::debug;

use crate::db::{RecipeStore, User, UserProfile};

/// Return the stored user for `profile`, creating it on first contact.
///
/// When Telegram reports display fields that differ from the stored ones the
/// record is refreshed; otherwise no write happens.
pub async fn resolve_user(store: &dyn RecipeStore, profile: &UserProfile) -> Result<User> {
    match store.get_user_by_telegram_id(profile.telegram_id).await? {
        Some(user) if user.differs_from(profile) => {
            debug!(telegram_id = profile.telegram_id, "User display fields drifted, refreshing");
            store.update_user(profile).await
        }
        Some(user) => Ok(user),
        None => store.create_user(profile).await,
    }
}
