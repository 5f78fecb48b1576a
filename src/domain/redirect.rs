use crate::domain::attempt::PaymentAttempt;
use crate::domain::status::IntentStatus;
use std::collections::HashMap;

/// Query parameters a landing page can receive from the processor or the
/// backend. Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectParams {
    pub order_id: Option<String>,
    pub payment_intent: Option<String>,
    pub payment_intent_client_secret: Option<String>,
    pub redirect_status: Option<String>,
    pub setup_intent_id: Option<String>,
    pub setup_intent_client_secret: Option<String>,
    pub recurring_price_id: Option<String>,
    pub with_trial: Option<String>,
    pub subscription_id: Option<String>,
    pub session_id: Option<String>,
    pub legacy_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentLanding {
    Redirected {
        order_id: Option<String>,
        intent_id: Option<String>,
        status: IntentStatus,
    },
    ClientSecret {
        order_id: Option<String>,
        client_secret: String,
    },
    OrderOnly {
        order_id: String,
    },
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionLanding {
    Activate {
        setup_intent_id: String,
        recurring_price_id: String,
        with_trial: bool,
    },
    SetupFailed,
    Poll {
        subscription_id: String,
    },
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutLanding {
    Session { session_id: String },
    Order { order_id: String },
    Malformed,
}

impl RedirectParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            query
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty() && *v != "undefined" && *v != "null")
                .map(str::to_string)
        };

        Self {
            order_id: get("orderId"),
            payment_intent: get("payment_intent"),
            payment_intent_client_secret: get("payment_intent_client_secret"),
            redirect_status: get("redirect_status"),
            setup_intent_id: get("setupIntentId").or_else(|| get("setup_intent")),
            setup_intent_client_secret: get("setup_intent_client_secret"),
            recurring_price_id: get("recurringPriceId"),
            with_trial: get("withTrial"),
            subscription_id: get("subscriptionId"),
            session_id: get("session_id"),
            legacy_order_id: get("order_id"),
        }
    }

    pub fn payment_attempt(&self) -> PaymentAttempt {
        PaymentAttempt {
            order_id: self.order_id.clone(),
            subscription_id: self.subscription_id.clone(),
            intent_id: self.payment_intent.clone().or_else(|| {
                self.payment_intent_client_secret
                    .as_deref()
                    .and_then(intent_id_from_secret)
            }),
            client_secret: self.payment_intent_client_secret.clone(),
            redirect_status: self.redirect_status.as_deref().map(IntentStatus::parse),
            amount_minor: None,
            currency: None,
        }
    }

    pub fn payment_landing(&self) -> PaymentLanding {
        if let Some(status) = &self.redirect_status {
            return PaymentLanding::Redirected {
                order_id: self.order_id.clone(),
                intent_id: self.payment_attempt().intent_id,
                status: IntentStatus::parse(status),
            };
        }
        if let Some(secret) = &self.payment_intent_client_secret {
            return PaymentLanding::ClientSecret {
                order_id: self.order_id.clone(),
                client_secret: secret.clone(),
            };
        }
        match &self.order_id {
            Some(order_id) => PaymentLanding::OrderOnly {
                order_id: order_id.clone(),
            },
            None => PaymentLanding::Malformed,
        }
    }

    pub fn subscription_landing(&self) -> SubscriptionLanding {
        let setup_failed = self
            .redirect_status
            .as_deref()
            .map(IntentStatus::parse)
            .is_some_and(|s| s == IntentStatus::RequiresPaymentMethod);
        if setup_failed {
            return SubscriptionLanding::SetupFailed;
        }

        if let (Some(setup_intent_id), Some(recurring_price_id)) =
            (&self.setup_intent_id, &self.recurring_price_id)
        {
            return SubscriptionLanding::Activate {
                setup_intent_id: setup_intent_id.clone(),
                recurring_price_id: recurring_price_id.clone(),
                with_trial: self
                    .with_trial
                    .as_deref()
                    .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1"),
            };
        }

        match &self.subscription_id {
            Some(subscription_id) => SubscriptionLanding::Poll {
                subscription_id: subscription_id.clone(),
            },
            None => SubscriptionLanding::Malformed,
        }
    }

    pub fn checkout_landing(&self) -> CheckoutLanding {
        if let Some(session_id) = &self.session_id {
            return CheckoutLanding::Session {
                session_id: session_id.clone(),
            };
        }
        match self.legacy_order_id.as_ref().or(self.order_id.as_ref()) {
            Some(order_id) => CheckoutLanding::Order {
                order_id: order_id.clone(),
            },
            None => CheckoutLanding::Malformed,
        }
    }
}

/// `pi_123_secret_abc` -> `pi_123`.
pub fn intent_id_from_secret(secret: &str) -> Option<String> {
    secret
        .split_once("_secret_")
        .map(|(id, _)| id.to_string())
        .filter(|id| !id.is_empty())
}
