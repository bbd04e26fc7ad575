use async_trait::async_trait;
use redis::Client as RedisClient;
use shared::spin_limit::SpinSession;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug)]
pub enum SessionStoreError {
    Redis(redis::RedisError),
    Serialize(serde_json::Error),
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis(e) => write!(f, "Redis error: {}", e),
            Self::Serialize(e) => write!(f, "Session encoding error: {}", e),
        }
    }
}

impl std::error::Error for SessionStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Redis(e) => Some(e),
            Self::Serialize(e) => Some(e),
        }
    }
}

/// Server-side home of the per-user spin allowance. Keyed by the
/// authenticated user id so clearing browser state buys nothing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<SpinSession, SessionStoreError>;
    async fn save(&self, user_id: Uuid, session: &SpinSession) -> Result<(), SessionStoreError>;
}

pub struct RedisSessionStore {
    client: RedisClient,
}

impl RedisSessionStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn key(user_id: Uuid) -> String {
        format!("wheel:spin_session:{}", user_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, user_id: Uuid) -> Result<SpinSession, SessionStoreError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(SessionStoreError::Redis)?;

        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(SessionStoreError::Redis)?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(session) => Ok(session),
                Err(e) => {
                    // A corrupt entry only ever grants a fresh window; start over.
                    warn!("discarding unreadable spin session for {}: {}", user_id, e);
                    Ok(SpinSession::default())
                }
            },
            None => Ok(SpinSession::default()),
        }
    }

    async fn save(&self, user_id: Uuid, session: &SpinSession) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(session).map_err(SessionStoreError::Serialize)?;

        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(SessionStoreError::Redis)?;

        redis::cmd("SET")
            .arg(Self::key(user_id))
            .arg(json)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(SessionStoreError::Redis)?;

        Ok(())
    }
}
