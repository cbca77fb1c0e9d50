//! User directory service: registration, lookup, search, soft-delete.

use std::sync::Arc;

use tracing::info;

use stealth_core::error::AppError;
use stealth_core::result::AppResult;
use stealth_core::types::UserId;
use stealth_database::store::UserDirectory;
use stealth_entity::user::{NewUser, User};

use crate::connection::manager::ConnectionManager;

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 32;
/// Default and maximum page size for searches.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

/// Manages the durable user records that messages are addressed to.
#[derive(Debug, Clone)]
pub struct UserService {
    users: Arc<dyn UserDirectory>,
    connections: Arc<ConnectionManager>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(users: Arc<dyn UserDirectory>, connections: Arc<ConnectionManager>) -> Self {
        Self { users, connections }
    }

    /// Create a user. Usernames are trimmed, must be 3 to 32 characters of
    /// ASCII letters, digits, `_`, `-` or `.`, and must be unique.
    pub async fn register(&self, mut user: NewUser) -> AppResult<User> {
        user.username = validate_username(&user.username)?;
        user.display_name = user
            .display_name
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let created = self.users.create_user(user).await?;
        info!(user_id = %created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// An active user by exact username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{}' not found", username.trim())))
    }

    /// Active users matching `query`. `limit` is clamped to 1..=100.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> AppResult<Vec<User>> {
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        self.users.search_users(query, limit).await
    }

    /// Soft-delete `target`. Only the user themself may do this. Live
    /// connections of the user are closed, which takes them offline.
    pub async fn deactivate(&self, requester: UserId, target: UserId) -> AppResult<()> {
        if requester != target {
            return Err(AppError::authorization("Users can only delete their own account"));
        }
        if !self.users.deactivate_user(target).await? {
            return Err(AppError::not_found("User not found"));
        }

        let closed = self.connections.disconnect_user(target).await;
        info!(user_id = %target, closed, "User deactivated");
        Ok(())
    }
}

/// Normalize and check a username.
pub fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    if username.len() < 3 || username.len() > MAX_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username must be 3 to {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::validation(
            "username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::router::RoomRouter;
    use crate::connection::pool::ConnectionPool;
    use crate::metrics::EngineMetrics;
    use crate::pipeline::service::MessagePipeline;
    use crate::presence::tracker::PresenceTracker;
    use serde_json::json;
    use stealth_core::config::RealtimeConfig;
    use stealth_core::error::ErrorKind;
    use stealth_database::MemoryStore;

    struct Fixture {
        service: UserService,
        connections: Arc<ConnectionManager>,
        presence: Arc<PresenceTracker>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let config = RealtimeConfig::default();
        let metrics = Arc::new(EngineMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let router = Arc::new(RoomRouter::new(
            pool.clone(),
            metrics.clone(),
            config.max_subscriptions_per_connection,
        ));
        let presence = Arc::new(PresenceTracker::new());
        let pipeline = Arc::new(MessagePipeline::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            router.clone(),
            metrics.clone(),
        ));
        let connections = Arc::new(ConnectionManager::new(
            config,
            pool,
            router,
            presence.clone(),
            pipeline,
            metrics,
        ));
        Fixture {
            service: UserService::new(Arc::new(store), connections.clone()),
            connections,
            presence,
        }
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  alice_01 ").unwrap(), "alice_01");
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("bob smith").is_err());
        assert!(validate_username("<script>").is_err());
    }

    #[tokio::test]
    async fn test_register_and_find() {
        let fx = fixture();
        let created = fx
            .service
            .register(NewUser {
                display_name: Some("  ".to_string()),
                ..NewUser::named(" alice ")
            })
            .await
            .unwrap();
        assert_eq!(created.username, "alice");
        assert_eq!(created.display_name, None);

        let found = fx.service.find_by_username("alice").await.unwrap();
        assert_eq!(found.id, created.id);

        let err = fx.service.register(NewUser::named("alice")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = fx.service.find_by_username("nobody").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_search_clamps_limit() {
        let fx = fixture();
        for name in ["ann", "anna", "annie", "bob"] {
            fx.service.register(NewUser::named(name)).await.unwrap();
        }
        assert_eq!(fx.service.search("ann", None).await.unwrap().len(), 3);
        assert_eq!(fx.service.search("", Some(0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_is_self_only_and_disconnects() {
        let fx = fixture();
        let alice = fx.service.register(NewUser::named("alice")).await.unwrap();
        let bob = fx.service.register(NewUser::named("bob")).await.unwrap();

        let (handle, _rx) = fx.connections.register(None);
        fx.connections
            .handle_inbound(
                handle.id,
                &json!({"event": "join-room", "data": alice.id.to_string()}).to_string(),
            )
            .await;
        assert!(fx.presence.query_status(alice.id).is_online);

        let err = fx.service.deactivate(bob.id, alice.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        fx.service.deactivate(alice.id, alice.id).await.unwrap();
        assert!(!handle.is_alive());
        assert_eq!(fx.connections.connection_count(), 0);
        assert!(!fx.presence.query_status(alice.id).is_online);

        let err = fx.service.deactivate(alice.id, alice.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(fx.service.find_by_username("alice").await.is_err());
    }
}
