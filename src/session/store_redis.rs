use crate::session::{AuthSession, Marker, SessionStore};
use anyhow::Result;
use redis::AsyncCommands;

const MARKER_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct RedisSessionStore {
    pub client: redis::Client,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    pub fn auth_key(session_id: &str) -> String {
        format!("session:{}:auth", session_id)
    }

    pub fn marker_key(session_id: &str, marker: Marker) -> String {
        format!("session:{}:marker:{}", session_id, marker.key())
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn auth_session(&self, session_id: &str) -> Result<Option<AuthSession>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::auth_key(session_id)).await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str::<AuthSession>(&p)?)),
            None => Ok(None),
        }
    }

    async fn put_marker(&self, session_id: &str, marker: Marker, value: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(Self::marker_key(session_id, marker), value, MARKER_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn peek_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::marker_key(session_id, marker)).await?;
        Ok(value)
    }

    async fn take_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::marker_key(session_id, marker);
        let (value, _removed): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(&key)
            .del(&key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
