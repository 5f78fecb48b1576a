use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Loading,
    AuthRequired,
    RequiresAction,
    Processing,
    Success,
    Failed,
}

impl ResultKind {
    /// `processing` is re-enterable; everything else but `loading` ends the flow.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading | Self::Processing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: Option<String>,
    pub status: String,
    pub payment_intent_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub unlocked_item_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub subscription_id: Option<String>,
    pub status: String,
    pub payment_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    pub session_id: Option<String>,
    pub order_id: Option<String>,
    pub payment_status: String,
    pub assessment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfirmationData {
    Order(OrderSnapshot),
    Subscription(SubscriptionSnapshot),
    Checkout(CheckoutSnapshot),
}

impl ConfirmationData {
    /// Item the next page should auto-start, if the payment unlocked one.
    pub fn unlocked_item_id(&self) -> Option<&str> {
        match self {
            Self::Order(order) => order.unlocked_item_id.as_deref(),
            Self::Checkout(checkout) => checkout.assessment_id.as_deref(),
            Self::Subscription(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub kind: ResultKind,
    pub message: Option<String>,
    pub data: Option<ConfirmationData>,
}

impl ConfirmationResult {
    pub fn loading() -> Self {
        Self {
            kind: ResultKind::Loading,
            message: None,
            data: None,
        }
    }

    pub fn auth_required() -> Self {
        Self {
            kind: ResultKind::AuthRequired,
            message: Some("Please log in to view your payment status.".to_string()),
            data: None,
        }
    }

    pub fn success(data: ConfirmationData) -> Self {
        Self {
            kind: ResultKind::Success,
            message: None,
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Failed,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn processing(message: impl Into<String>, data: Option<ConfirmationData>) -> Self {
        Self {
            kind: ResultKind::Processing,
            message: Some(message.into()),
            data,
        }
    }

    pub fn requires_action(message: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::RequiresAction,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<ConfirmationData>) -> Self {
        self.data = data;
        self
    }

    pub fn view(&self) -> ResultView {
        let (icon, title, default_message, actions) = match self.kind {
            ResultKind::Loading => (
                "spinner",
                "Confirming your payment",
                "Please wait while we confirm your payment.",
                vec![],
            ),
            ResultKind::AuthRequired => (
                "lock",
                "Login required",
                "Please log in to view your payment status.",
                vec![UserAction::GoToLogin],
            ),
            ResultKind::RequiresAction => (
                "shield",
                "Authentication required",
                "Your bank needs to verify this payment. Please try again.",
                vec![UserAction::Retry, UserAction::GoToDashboard],
            ),
            ResultKind::Processing => (
                "clock",
                "Payment processing",
                "Your payment is being processed. This can take a few minutes.",
                vec![UserAction::Refresh, UserAction::GoToDashboard],
            ),
            ResultKind::Success => (
                "check",
                "Payment successful",
                "Thank you! Your payment has been confirmed.",
                vec![UserAction::GoToDashboard],
            ),
            ResultKind::Failed => (
                "cross",
                "Payment failed",
                "Something went wrong with your payment.",
                vec![UserAction::Retry, UserAction::GoToDashboard],
            ),
        };

        ResultView {
            state: self.kind,
            icon,
            title,
            message: self
                .message
                .clone()
                .unwrap_or_else(|| default_message.to_string()),
            actions,
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Retry,
    GoToDashboard,
    Refresh,
    GoToLogin,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub state: ResultKind,
    pub icon: &'static str,
    pub title: &'static str,
    pub message: String,
    pub actions: Vec<UserAction>,
    pub data: Option<ConfirmationData>,
}

/// Navigation scheduled after a terminal state has been shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub after: Duration,
}

impl Navigation {
    /// `Refresh` takes whole seconds: rounded up, never below 1.
    pub fn refresh_header(&self) -> String {
        let millis = self.after.as_millis();
        let secs = millis.div_ceil(1000).max(1);
        format!("{}; url={}", secs, self.target)
    }
}
