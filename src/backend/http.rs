use crate::backend::wire::{
    self, AssessmentData, CheckoutSessionData, EndTrialData, Envelope, OrderData,
    PublishableKeyData, SubscriptionData,
};
use crate::backend::{
    ActivateSubscription, AssessmentLookup, BackendApi, CheckoutSessionReport, EndTrialAction,
    EndTrialReply, OrderStatusReport, PaymentConfirmation, SubscriptionActivation,
    SubscriptionStatusReport,
};
use crate::error::ConfirmError;
use crate::processor::PublishableKeySource;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::json;

#[derive(Clone)]
pub struct HttpBackend {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Appends `id` as one percent-encoded path segment.
    fn resource_url(&self, path: &str, id: &str) -> Result<reqwest::Url, ConfirmError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(ConfirmError::backend(format!("invalid identifier {:?}", id)));
        }
        let mut url = reqwest::Url::parse(&self.url(path))
            .map_err(|e| ConfirmError::backend(format!("invalid backend url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ConfirmError::backend("invalid backend url"))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Sends the request and decodes the envelope without judging it.
    async fn exchange(&self, req: RequestBuilder) -> Result<(StatusCode, Envelope), ConfirmError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConfirmError::AuthRequired);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok((status, Envelope::default()));
        }

        match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) => Ok((status, envelope)),
            Err(_) if status.is_success() => {
                Err(ConfirmError::backend("unexpected response from server"))
            }
            Err(_) => Err(ConfirmError::Backend {
                message: format!("Request failed with status {}", status.as_u16()),
                request_id: None,
                http_status: Some(status.as_u16()),
            }),
        }
    }

    async fn call(&self, req: RequestBuilder) -> Result<Envelope, ConfirmError> {
        let (status, envelope) = self.exchange(req).await?;
        if !status.is_success() || envelope.is_error() {
            return Err(envelope.to_error(Some(status.as_u16())));
        }
        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl BackendApi for HttpBackend {
    async fn confirm_payment(
        &self,
        token: &str,
        order_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<PaymentConfirmation, ConfirmError> {
        let envelope = self
            .call(
                self.client
                    .post(self.url("/stripe-elements/confirm-payment"))
                    .bearer_auth(token)
                    .json(&json!({
                        "orderId": order_id,
                        "paymentIntentId": payment_intent_id,
                    })),
            )
            .await?;

        let mut report = wire::normalize_order(envelope.payload::<OrderData>()?, Some(order_id));
        if report.order.payment_intent_id.is_none() {
            report.order.payment_intent_id = payment_intent_id.map(str::to_string);
        }
        Ok(PaymentConfirmation {
            order: report.order,
            message: envelope.message(),
        })
    }

    async fn payment_status(
        &self,
        token: &str,
        order_id: &str,
    ) -> Result<OrderStatusReport, ConfirmError> {
        let url = self.resource_url("/stripe-elements/payment-status", order_id)?;
        let envelope = self
            .call(self.client.get(url).bearer_auth(token))
            .await?;
        Ok(wire::normalize_order(
            envelope.payload::<OrderData>()?,
            Some(order_id),
        ))
    }

    async fn activate_subscription(
        &self,
        token: &str,
        request: &ActivateSubscription,
    ) -> Result<SubscriptionActivation, ConfirmError> {
        let envelope = self
            .call(
                self.client
                    .post(self.url("/stripe-elements/activate-subscription"))
                    .bearer_auth(token)
                    .json(&json!({
                        "setupIntentId": request.setup_intent_id,
                        "recurringPriceId": request.recurring_price_id,
                        "withTrial": request.with_trial,
                    })),
            )
            .await?;
        Ok(wire::normalize_activation(
            envelope.payload::<SubscriptionData>()?,
        ))
    }

    async fn subscription_status(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<SubscriptionStatusReport, ConfirmError> {
        let url = self.resource_url("/stripe-elements/subscription-status", subscription_id)?;
        let envelope = self
            .call(self.client.get(url).bearer_auth(token))
            .await?;
        Ok(wire::normalize_subscription_status(
            envelope.payload::<SubscriptionData>()?,
            subscription_id,
        ))
    }

    async fn cancel_subscription(&self, token: &str) -> Result<Option<String>, ConfirmError> {
        let envelope = self
            .call(
                self.client
                    .post(self.url("/stripe/subscription/cancel"))
                    .bearer_auth(token)
                    .json(&json!({})),
            )
            .await?;
        Ok(envelope.message())
    }

    async fn end_trial(
        &self,
        token: &str,
        request_id: &str,
    ) -> Result<EndTrialReply, ConfirmError> {
        let (status, envelope) = self
            .exchange(
                self.client
                    .post(self.url("/stripe/end-trial-pro"))
                    .bearer_auth(token)
                    .header("X-Request-Id", request_id)
                    .json(&json!({ "requestId": request_id })),
            )
            .await?;

        let data = envelope.payload::<EndTrialData>().unwrap_or_default();
        let mut reply = wire::normalize_end_trial(&envelope, data);
        if reply.request_id.is_none() {
            reply.request_id = Some(request_id.to_string());
        }

        let failed = !status.is_success() || envelope.is_error();
        if failed && matches!(reply.action, EndTrialAction::Unknown(_)) {
            return Err(ConfirmError::Backend {
                message: envelope
                    .message()
                    .unwrap_or_else(|| "Could not end the trial".to_string()),
                request_id: reply.request_id,
                http_status: Some(status.as_u16()),
            });
        }
        Ok(reply)
    }

    async fn assessment_id(
        &self,
        token: &str,
        lookup: AssessmentLookup<'_>,
    ) -> Result<Option<String>, ConfirmError> {
        let query = match lookup {
            AssessmentLookup::Order(id) => [("orderId", id)],
            AssessmentLookup::Session(id) => [("sessionId", id)],
        };
        let envelope = self
            .call(
                self.client
                    .get(self.url("/stripe/assessment-id"))
                    .bearer_auth(token)
                    .query(&query),
            )
            .await?;
        Ok(envelope.payload::<AssessmentData>()?.assessment_id)
    }

    async fn check_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<CheckoutSessionReport, ConfirmError> {
        let envelope = self
            .call(
                self.client
                    .get(self.url("/stripe/session/check"))
                    .bearer_auth(token)
                    .query(&[("stripeSessionId", session_id)]),
            )
            .await?;
        Ok(wire::normalize_checkout_session(
            envelope.payload::<CheckoutSessionData>()?,
            session_id,
        ))
    }
}

#[async_trait::async_trait]
impl PublishableKeySource for HttpBackend {
    async fn publishable_key(&self) -> Result<String, ConfirmError> {
        let envelope = self
            .call(self.client.get(self.url("/stripe-elements/config")))
            .await?;
        envelope
            .payload::<PublishableKeyData>()?
            .publishable_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfirmError::backend("payment configuration is missing a publishable key"))
    }
}
