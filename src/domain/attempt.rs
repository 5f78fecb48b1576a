use crate::domain::status::IntentStatus;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentAttempt {
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    pub intent_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_status: Option<IntentStatus>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
}

/// Retry bookkeeping for one status poll loop. `attempt_number` is 1-based
/// and never exceeds `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollAttempt {
    pub attempt_number: u32,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl PollAttempt {
    pub fn first(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempt_number: 1,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn is_last(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }

    pub fn next(&self) -> Option<Self> {
        if self.is_last() {
            return None;
        }
        Some(Self {
            attempt_number: self.attempt_number + 1,
            ..*self
        })
    }
}
