use crate::session::{AuthSession, Marker, SessionStore};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Entry {
    auth: Option<AuthSession>,
    markers: HashMap<Marker, String>,
}

/// Process-local session store for tests and single-node development.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_auth(&self, session_id: &str, auth: AuthSession) {
        let mut write = self.inner.write().await;
        write.entry(session_id.to_string()).or_default().auth = Some(auth);
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn auth_session(&self, session_id: &str) -> Result<Option<AuthSession>> {
        let read = self.inner.read().await;
        Ok(read.get(session_id).and_then(|e| e.auth.clone()))
    }

    async fn put_marker(&self, session_id: &str, marker: Marker, value: &str) -> Result<()> {
        let mut write = self.inner.write().await;
        write
            .entry(session_id.to_string())
            .or_default()
            .markers
            .insert(marker, value.to_string());
        Ok(())
    }

    async fn peek_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>> {
        let read = self.inner.read().await;
        Ok(read
            .get(session_id)
            .and_then(|e| e.markers.get(&marker).cloned()))
    }

    async fn take_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>> {
        let mut write = self.inner.write().await;
        Ok(write
            .get_mut(session_id)
            .and_then(|e| e.markers.remove(&marker)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
