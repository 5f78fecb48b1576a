//! Backend reply envelopes and their normalization into typed reports.
//!
//! The backend is not consistent about where it puts things: status may sit
//! on `data` or on a nested `order`/`subscription` object, secrets come as
//! `clientSecret`, `actionClientSecret` or `authentication.clientSecret`, and
//! a few endpoints answer without a `data` wrapper at all. All of that is
//! resolved here and nowhere else.

use crate::backend::{
    CheckoutSessionReport, EndTrialAction, EndTrialReply, OrderStatusReport,
    SubscriptionActivation, SubscriptionStatusReport,
};
use crate::domain::result::{OrderSnapshot, SubscriptionSnapshot};
use crate::error::ConfirmError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Value,
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        self.success == Some(false)
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("fail"))
    }

    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.as_str().map(str::to_string))
            .or_else(|| {
                self.error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|m| !m.trim().is_empty())
    }

    pub fn to_error(&self, http_status: Option<u16>) -> ConfirmError {
        let message = self.message().unwrap_or_else(|| match http_status {
            Some(code) if !(200..300).contains(&code) => {
                format!("Request failed with status {}", code)
            }
            _ => "The server reported an error".to_string(),
        });
        ConfirmError::Backend {
            message,
            request_id: self.request_id.clone(),
            http_status,
        }
    }

    /// `data` when present, otherwise the unwrapped top-level fields. An
    /// unwrapped body keeps its own `status` unless that is the envelope's
    /// outcome word.
    pub fn payload<T: DeserializeOwned + Default>(&self) -> Result<T, ConfirmError> {
        let source = if self.data.is_null() {
            let mut fields = self.rest.clone();
            if let Some(status) = self.status.as_deref().filter(|s| !is_envelope_status(s)) {
                fields.insert("status".to_string(), Value::String(status.to_string()));
            }
            if fields.is_empty() {
                return Ok(T::default());
            }
            Value::Object(fields)
        } else {
            self.data.clone()
        };
        serde_json::from_value(source)
            .map_err(|e| ConfirmError::backend(format!("unexpected response from server: {}", e)))
    }
}

fn is_envelope_status(status: &str) -> bool {
    ["success", "ok", "error", "fail"]
        .iter()
        .any(|s| status.eq_ignore_ascii_case(s))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default, alias = "order_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "payment_status")]
    pub payment_status: Option<String>,
    #[serde(default, alias = "payment_intent_id")]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Number>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "assessment_id", alias = "gameId")]
    pub assessment_id: Option<String>,
    #[serde(default, alias = "requires_action")]
    pub requires_action: Option<bool>,
    #[serde(default, alias = "action_client_secret", alias = "clientSecret")]
    pub action_client_secret: Option<String>,
    #[serde(default)]
    pub order: Option<Box<OrderData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    #[serde(default, alias = "subscription_id")]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "payment_status")]
    pub payment_status: Option<String>,
    #[serde(default, alias = "requires_action")]
    pub requires_action: Option<bool>,
    #[serde(default, alias = "client_secret")]
    pub client_secret: Option<String>,
    #[serde(default, alias = "action_client_secret")]
    pub action_client_secret: Option<String>,
    #[serde(default)]
    pub subscription: Option<Box<SubscriptionData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationData {
    #[serde(default, alias = "client_secret")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTrialData {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub authentication: Option<AuthenticationData>,
    #[serde(default, alias = "client_secret")]
    pub client_secret: Option<String>,
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionData {
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "payment_status")]
    pub payment_status: Option<String>,
    #[serde(default, alias = "order_id")]
    pub order_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentData {
    #[serde(default, alias = "assessment_id")]
    pub assessment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishableKeyData {
    #[serde(default, rename = "publishableKey", alias = "publishable_key")]
    pub publishable_key: Option<String>,
}

fn amount_minor(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64))
}

pub fn normalize_order(data: OrderData, fallback_order_id: Option<&str>) -> OrderStatusReport {
    let nested = data.order.map(|o| *o).unwrap_or_default();

    let status = data
        .status
        .or(data.payment_status)
        .or(nested.status)
        .or(nested.payment_status)
        .unwrap_or_else(|| "unknown".to_string());

    let order = OrderSnapshot {
        order_id: data
            .order_id
            .or(nested.order_id)
            .or_else(|| fallback_order_id.map(str::to_string)),
        status,
        payment_intent_id: data.payment_intent_id.or(nested.payment_intent_id),
        amount_minor: data
            .amount
            .as_ref()
            .or(nested.amount.as_ref())
            .and_then(amount_minor),
        currency: data.currency.or(nested.currency),
        unlocked_item_id: data.assessment_id.or(nested.assessment_id),
    };

    let requires_action = data.requires_action.or(nested.requires_action).unwrap_or(false)
        || order.status.eq_ignore_ascii_case("requires_action");
    let action_client_secret = if requires_action {
        data.action_client_secret.or(nested.action_client_secret)
    } else {
        None
    };

    OrderStatusReport {
        order,
        action_client_secret,
    }
}

fn flatten_subscription(data: SubscriptionData) -> SubscriptionData {
    let nested = data.subscription.map(|s| *s).unwrap_or_default();
    SubscriptionData {
        subscription_id: data.subscription_id.or(nested.subscription_id),
        status: data.status.or(nested.status),
        payment_status: data.payment_status.or(nested.payment_status),
        requires_action: data.requires_action.or(nested.requires_action),
        client_secret: data.client_secret.or(nested.client_secret),
        action_client_secret: data.action_client_secret.or(nested.action_client_secret),
        subscription: None,
    }
}

pub fn normalize_activation(data: SubscriptionData) -> SubscriptionActivation {
    let data = flatten_subscription(data);
    SubscriptionActivation {
        subscription_id: data.subscription_id,
        status: data.status,
        payment_status: data.payment_status,
        requires_action: data.requires_action.unwrap_or(false),
        client_secret: data.client_secret.or(data.action_client_secret),
    }
}

pub fn normalize_subscription_status(
    data: SubscriptionData,
    fallback_subscription_id: &str,
) -> SubscriptionStatusReport {
    let data = flatten_subscription(data);
    let requires_action = data.requires_action.unwrap_or(false);
    SubscriptionStatusReport {
        subscription: SubscriptionSnapshot {
            subscription_id: data
                .subscription_id
                .or_else(|| Some(fallback_subscription_id.to_string())),
            status: data.status.unwrap_or_else(|| "unknown".to_string()),
            payment_status: data.payment_status,
        },
        requires_action,
        action_client_secret: data.action_client_secret.or(data.client_secret),
    }
}

pub fn normalize_end_trial(envelope: &Envelope, data: EndTrialData) -> EndTrialReply {
    let action = match data.action.as_deref() {
        Some("trial_ended_successfully") => EndTrialAction::TrialEnded,
        Some("requires_3ds_authentication") | Some("requires_action") => {
            EndTrialAction::RequiresAuthentication {
                client_secret: data
                    .authentication
                    .and_then(|a| a.client_secret)
                    .or(data.client_secret),
            }
        }
        Some("payment_failed") => EndTrialAction::PaymentFailed,
        other => EndTrialAction::Unknown(other.map(str::to_string)),
    };

    EndTrialReply {
        action,
        message: envelope.message(),
        request_id: envelope.request_id.clone().or(data.request_id),
    }
}

pub fn normalize_checkout_session(
    data: CheckoutSessionData,
    fallback_session_id: &str,
) -> CheckoutSessionReport {
    CheckoutSessionReport {
        session_id: data
            .session_id
            .unwrap_or_else(|| fallback_session_id.to_string()),
        status: data.status,
        payment_status: data.payment_status.unwrap_or_else(|| "unpaid".to_string()),
        order_id: data.order_id,
    }
}
