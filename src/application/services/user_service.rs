use crate::application::errors::BotError;
use crate::domain::entities::User;
use crate::domain::traits::{PlatformApi, Store};

/// Resolve a login typed in chat to a user, asking the platform for users
/// the store has never seen.
pub async fn find_or_create_from_input(
    store: &dyn Store,
    platform: &dyn PlatformApi,
    input: &str,
) -> Result<Option<User>, BotError> {
    let login = normalize_login(input);
    if login.is_empty() {
        return Ok(None);
    }

    if let Some(user) = store.find_user_by_login(&login).await? {
        return Ok(Some(user));
    }

    match platform.get_user_by_login(&login).await? {
        Some(user) => {
            store.save_user(&user).await?;
            tracing::debug!("Created user {} ({}) from platform lookup", user.login, user.id);
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Strip an `@` mention prefix and lower-case
pub fn normalize_login(input: &str) -> String {
    input.trim().trim_start_matches('@').to_lowercase()
}
