use crate::error::ConfirmError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod memory;
pub mod store_redis;

/// Bearer token persisted by the login flow. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.trim().is_empty() && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    AutoStartId,
    EndTrialRequestId,
}

impl Marker {
    pub fn key(&self) -> &'static str {
        match self {
            Self::AutoStartId => "auto_start_id",
            Self::EndTrialRequestId => "end_trial_request_id",
        }
    }
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn auth_session(&self, session_id: &str) -> Result<Option<AuthSession>>;

    async fn put_marker(&self, session_id: &str, marker: Marker, value: &str) -> Result<()>;

    async fn peek_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>>;

    /// Read and remove in one step.
    async fn take_marker(&self, session_id: &str, marker: Marker) -> Result<Option<String>>;

    async fn ping(&self) -> Result<()>;
}

const SESSION_UNAVAILABLE_MESSAGE: &str =
    "We could not load your account right now. Please try again in a moment.";

/// One browser session's view of the store.
#[derive(Clone)]
pub struct SessionHandle {
    store: Arc<dyn SessionStore>,
    session_id: String,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn SessionStore>, session_id: &str) -> Self {
        Self {
            store,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Precondition for every backend call. No refresh is attempted.
    pub async fn bearer_token(&self) -> std::result::Result<String, ConfirmError> {
        if self.session_id.is_empty() {
            return Err(ConfirmError::AuthRequired);
        }
        match self.store.auth_session(&self.session_id).await {
            Ok(Some(session)) if session.is_valid_at(Utc::now()) => Ok(session.token),
            Ok(_) => Err(ConfirmError::AuthRequired),
            Err(e) => {
                tracing::error!("session lookup failed for {}: {}", self.session_id, e);
                Err(ConfirmError::Transport {
                    message: SESSION_UNAVAILABLE_MESSAGE.to_string(),
                })
            }
        }
    }

    pub async fn put_marker(&self, marker: Marker, value: &str) -> Result<()> {
        self.store.put_marker(&self.session_id, marker, value).await
    }

    pub async fn peek_marker(&self, marker: Marker) -> Result<Option<String>> {
        self.store.peek_marker(&self.session_id, marker).await
    }

    pub async fn take_marker(&self, marker: Marker) -> Result<Option<String>> {
        self.store.take_marker(&self.session_id, marker).await
    }
}
