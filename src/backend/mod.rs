use crate::domain::result::{OrderSnapshot, SubscriptionSnapshot};
use crate::error::ConfirmError;

pub mod http;
pub mod wire;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub order: OrderSnapshot,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusReport {
    pub order: OrderSnapshot,
    pub action_client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSubscription {
    pub setup_intent_id: String,
    pub recurring_price_id: String,
    pub with_trial: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionActivation {
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub requires_action: bool,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionStatusReport {
    pub subscription: SubscriptionSnapshot,
    pub requires_action: bool,
    pub action_client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndTrialAction {
    TrialEnded,
    RequiresAuthentication { client_secret: Option<String> },
    PaymentFailed,
    Unknown(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndTrialReply {
    pub action: EndTrialAction,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionReport {
    pub session_id: String,
    pub status: Option<String>,
    pub payment_status: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentLookup<'a> {
    Order(&'a str),
    Session(&'a str),
}

/// The backend REST API as the confirmation flows see it. Every call takes
/// the bearer token explicitly; implementations never look it up.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    async fn confirm_payment(
        &self,
        token: &str,
        order_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<PaymentConfirmation, ConfirmError>;

    async fn payment_status(
        &self,
        token: &str,
        order_id: &str,
    ) -> Result<OrderStatusReport, ConfirmError>;

    async fn activate_subscription(
        &self,
        token: &str,
        request: &ActivateSubscription,
    ) -> Result<SubscriptionActivation, ConfirmError>;

    async fn subscription_status(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<SubscriptionStatusReport, ConfirmError>;

    async fn cancel_subscription(&self, token: &str) -> Result<Option<String>, ConfirmError>;

    /// Unlike the other calls, an error envelope that carries an `action`
    /// is a normal reply here.
    async fn end_trial(&self, token: &str, request_id: &str)
        -> Result<EndTrialReply, ConfirmError>;

    async fn assessment_id(
        &self,
        token: &str,
        lookup: AssessmentLookup<'_>,
    ) -> Result<Option<String>, ConfirmError>;

    async fn check_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<CheckoutSessionReport, ConfirmError>;
}
