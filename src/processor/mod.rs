use crate::domain::status::IntentStatus;
use crate::error::ConfirmError;

pub mod mock;
pub mod stripe;

#[derive(Debug, Clone, PartialEq)]
pub struct IntentSnapshot {
    pub id: String,
    pub status: IntentStatus,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub error_message: Option<String>,
}

/// Result of continuing a step-up (3-D Secure) authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum StepUpOutcome {
    Completed(IntentSnapshot),
    /// The cardholder still has to act, typically on the bank's page.
    StillRequiresAction { redirect_url: Option<String> },
    Failed { message: String },
}

#[async_trait::async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn retrieve_payment_intent(&self, client_secret: &str)
        -> Result<IntentSnapshot, ConfirmError>;

    /// Accepts payment-intent and setup-intent secrets alike.
    async fn handle_step_up(&self, client_secret: &str) -> Result<StepUpOutcome, ConfirmError>;
}

/// Source of the processor's publishable key, fetched lazily once.
#[async_trait::async_trait]
pub trait PublishableKeySource: Send + Sync {
    async fn publishable_key(&self) -> Result<String, ConfirmError>;
}
