use crate::domain::redirect::intent_id_from_secret;
use crate::domain::status::IntentStatus;
use crate::error::ConfirmError;
use crate::processor::{IntentSnapshot, PaymentProcessor, PublishableKeySource, StepUpOutcome};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stripe's publishable-key surface: the same calls Stripe.js makes from a
/// browser, so no secret key ever reaches this service.
pub struct StripeProcessor {
    pub base_url: String,
    pub client: reqwest::Client,
    key_source: Arc<dyn PublishableKeySource>,
    key: RwLock<Option<String>>,
}

struct StaticKey(String);

#[async_trait::async_trait]
impl PublishableKeySource for StaticKey {
    async fn publishable_key(&self) -> Result<String, ConfirmError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    status: String,
    amount: Option<i64>,
    currency: Option<String>,
    last_payment_error: Option<StripeErrorBody>,
    last_setup_error: Option<StripeErrorBody>,
    next_action: Option<NextAction>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct NextAction {
    redirect_to_url: Option<RedirectToUrl>,
}

#[derive(Debug, Deserialize)]
struct RedirectToUrl {
    url: Option<String>,
}

impl StripeIntent {
    fn error_message(&self) -> Option<String> {
        self.last_payment_error
            .as_ref()
            .or(self.last_setup_error.as_ref())
            .and_then(|e| e.message.clone())
    }

    fn redirect_url(&self) -> Option<String> {
        self.next_action
            .as_ref()
            .and_then(|a| a.redirect_to_url.as_ref())
            .and_then(|r| r.url.clone())
    }

    fn snapshot(&self) -> IntentSnapshot {
        IntentSnapshot {
            id: self.id.clone(),
            status: IntentStatus::parse(&self.status),
            amount_minor: self.amount,
            currency: self.currency.clone(),
            error_message: self.error_message(),
        }
    }
}

impl StripeProcessor {
    pub fn new(
        base_url: impl Into<String>,
        client: reqwest::Client,
        key_source: Arc<dyn PublishableKeySource>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            key_source,
            key: RwLock::new(None),
        }
    }

    pub fn with_key(base_url: impl Into<String>, client: reqwest::Client, key: &str) -> Self {
        Self::new(base_url, client, Arc::new(StaticKey(key.to_string())))
    }

    async fn key(&self) -> Result<String, ConfirmError> {
        {
            let read = self.key.read().await;
            if let Some(key) = &*read {
                return Ok(key.clone());
            }
        }

        let key = self.key_source.publishable_key().await?;
        let mut write = self.key.write().await;
        *write = Some(key.clone());
        Ok(key)
    }

    fn intent_path(client_secret: &str) -> Result<(&'static str, String), ConfirmError> {
        let id = intent_id_from_secret(client_secret)
            .ok_or_else(|| ConfirmError::processor("invalid payment client secret"))?;
        let kind = if id.starts_with("seti_") {
            "setup_intents"
        } else {
            "payment_intents"
        };
        Ok((kind, id))
    }

    async fn fetch_intent(&self, client_secret: &str) -> Result<StripeIntent, ConfirmError> {
        let (kind, id) = Self::intent_path(client_secret)?;
        let key = self.key().await?;
        let resp = self
            .client
            .get(format!("{}/v1/{}/{}", self.base_url, kind, id))
            .bearer_auth(key)
            .query(&[("client_secret", client_secret)])
            .send()
            .await?;
        read_intent(resp).await
    }

    async fn confirm_intent(&self, client_secret: &str) -> Result<StripeIntent, ConfirmError> {
        let (kind, id) = Self::intent_path(client_secret)?;
        let key = self.key().await?;
        let resp = self
            .client
            .post(format!("{}/v1/{}/{}/confirm", self.base_url, kind, id))
            .bearer_auth(key)
            .form(&[("client_secret", client_secret)])
            .send()
            .await?;
        read_intent(resp).await
    }
}

async fn read_intent(resp: reqwest::Response) -> Result<StripeIntent, ConfirmError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<StripeIntent>()
            .await
            .map_err(|e| ConfirmError::processor(format!("unreadable processor response: {}", e)));
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| format!("payment processor returned HTTP {}", status.as_u16()));
    Err(ConfirmError::Processor { message })
}

fn step_up_outcome(intent: &StripeIntent) -> StepUpOutcome {
    match IntentStatus::parse(&intent.status) {
        IntentStatus::Succeeded | IntentStatus::Processing => {
            StepUpOutcome::Completed(intent.snapshot())
        }
        IntentStatus::RequiresAction | IntentStatus::RequiresConfirmation => {
            StepUpOutcome::StillRequiresAction {
                redirect_url: intent.redirect_url(),
            }
        }
        IntentStatus::RequiresPaymentMethod | IntentStatus::Canceled => StepUpOutcome::Failed {
            message: intent
                .error_message()
                .unwrap_or_else(|| "Authentication failed. Please try another card.".to_string()),
        },
        IntentStatus::Other(s) => StepUpOutcome::Failed {
            message: format!("unexpected authentication status: {}", s),
        },
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for StripeProcessor {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
    ) -> Result<IntentSnapshot, ConfirmError> {
        Ok(self.fetch_intent(client_secret).await?.snapshot())
    }

    async fn handle_step_up(&self, client_secret: &str) -> Result<StepUpOutcome, ConfirmError> {
        let intent = self.fetch_intent(client_secret).await?;
        if IntentStatus::parse(&intent.status) == IntentStatus::RequiresConfirmation {
            let confirmed = self.confirm_intent(client_secret).await?;
            return Ok(step_up_outcome(&confirmed));
        }
        Ok(step_up_outcome(&intent))
    }
}
