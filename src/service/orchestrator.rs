use crate::backend::{ActivateSubscription, AssessmentLookup, BackendApi, SubscriptionActivation};
use crate::config::AppConfig;
use crate::domain::attempt::{PaymentAttempt, PollAttempt};
use crate::domain::redirect::{CheckoutLanding, PaymentLanding, RedirectParams, SubscriptionLanding};
use crate::domain::result::{
    CheckoutSnapshot, ConfirmationData, ConfirmationResult, Navigation, OrderSnapshot, ResultKind,
    SubscriptionSnapshot,
};
use crate::domain::status::{checkout_progress, subscription_progress, IntentStatus, Progress};
use crate::error::ConfirmError;
use crate::processor::{PaymentProcessor, StepUpOutcome};
use crate::service::clock::Sleeper;
use crate::service::lifecycle::Lifecycle;
use crate::service::poller::{observe_order, observe_subscription, PollDirective, PollObservation, PollPolicy, PollTarget};
use crate::session::{Marker, SessionHandle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const RETRY_PAYMENT_MESSAGE: &str =
    "Your payment was not successful. Please try again with a different payment method.";
const SETUP_FAILED_MESSAGE: &str =
    "We could not save your card. Please try again with a different payment method.";
const STEP_UP_PENDING_MESSAGE: &str =
    "Your bank still needs to verify this payment. Please retry and complete the authentication.";
const MISSING_SECRET_MESSAGE: &str =
    "Additional authentication is required, but it cannot be completed here. Please retry.";
const PROCESSING_MESSAGE: &str =
    "Your payment is processing. We will update your account as soon as it completes.";
const STILL_CHECKING_MESSAGE: &str = "Confirming your payment with our servers...";
const PENDING_AFTER_POLLING_MESSAGE: &str =
    "Your payment is still being confirmed. Refresh this page in a moment to check again.";
const SUBSCRIPTION_FAILED_MESSAGE: &str =
    "Your subscription could not be activated. Please try again.";
const CHECKOUT_PENDING_MESSAGE: &str =
    "Your checkout is not complete yet. Refresh this page in a moment to check again.";
const CHECKOUT_EXPIRED_MESSAGE: &str = "This checkout session has expired. Please start again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorPolicy {
    pub poll_delay: Duration,
    pub order_max_attempts: u32,
    pub subscription_max_attempts: u32,
    pub success_redirect_delay: Duration,
    pub dashboard_path: String,
    pub login_path: String,
    /// Report success when the processor says so, even if the backend
    /// confirmation call fails.
    pub trust_processor_success: bool,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(2),
            order_max_attempts: 10,
            subscription_max_attempts: 15,
            success_redirect_delay: Duration::from_secs(3),
            dashboard_path: "/dashboard".to_string(),
            login_path: "/login".to_string(),
            trust_processor_success: true,
        }
    }
}

impl OrchestratorPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            poll_delay: cfg.poll_delay(),
            order_max_attempts: cfg.order_poll_max_attempts,
            subscription_max_attempts: cfg.subscription_poll_max_attempts,
            success_redirect_delay: cfg.success_redirect_delay(),
            dashboard_path: cfg.dashboard_path.clone(),
            login_path: cfg.login_path.clone(),
            trust_processor_success: cfg.trust_processor_success,
        }
    }

    pub fn poll_policy(&self, target: &PollTarget) -> PollPolicy {
        let max_attempts = match target {
            PollTarget::Order(_) => self.order_max_attempts,
            PollTarget::Subscription(_) => self.subscription_max_attempts,
        };
        PollPolicy {
            max_attempts,
            delay: self.poll_delay,
        }
    }
}

/// Long-lived collaborators shared by every flow, owned by `AppState`.
#[derive(Clone)]
pub struct FlowDeps {
    pub backend: Arc<dyn BackendApi>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub sleeper: Arc<dyn Sleeper>,
    pub policy: OrchestratorPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: ConfirmationResult,
    pub navigation: Option<Navigation>,
}

/// Drives one landing page's confirmation flow to a settled result.
///
/// One instance per payment attempt. The current result is published on a
/// watch channel; subscribers see `loading`, any number of intermediate
/// `processing` results while polling, then the settled result. Nothing is
/// published after the lifecycle is unmounted.
pub struct ConfirmationOrchestrator {
    deps: FlowDeps,
    session: SessionHandle,
    lifecycle: Lifecycle,
    current: watch::Sender<ConfirmationResult>,
}

impl ConfirmationOrchestrator {
    pub fn new(deps: FlowDeps, session: SessionHandle, lifecycle: Lifecycle) -> Self {
        let (current, _) = watch::channel(ConfirmationResult::loading());
        Self {
            deps,
            session,
            lifecycle,
            current,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConfirmationResult> {
        self.current.subscribe()
    }

    pub fn current(&self) -> ConfirmationResult {
        self.current.borrow().clone()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub async fn confirm_payment(&self, params: &RedirectParams) -> Option<Outcome> {
        self.settle(self.payment_flow(params)).await
    }

    pub async fn activate_subscription(&self, params: &RedirectParams) -> Option<Outcome> {
        self.settle(self.subscription_flow(params)).await
    }

    pub async fn confirm_checkout(&self, params: &RedirectParams) -> Option<Outcome> {
        self.settle(self.checkout_flow(params)).await
    }

    fn publish(&self, result: ConfirmationResult) {
        if !self.lifecycle.is_unmounted() {
            self.current.send_replace(result);
        }
    }

    async fn settle<F>(&self, flow: F) -> Option<Outcome>
    where
        F: Future<Output = Result<ConfirmationResult, ConfirmError>>,
    {
        let result = match flow.await {
            Ok(result) => result,
            Err(ConfirmError::Unmounted) => {
                tracing::debug!("confirmation flow for session {} abandoned", self.session.session_id());
                return None;
            }
            Err(e) if e.is_auth_problem() => ConfirmationResult::auth_required(),
            Err(e) => ConfirmationResult::failed(e.to_string()),
        };
        if self.lifecycle.is_unmounted() {
            return None;
        }

        let navigation = if result.kind == ResultKind::Success {
            self.remember_unlocked_item(&result).await;
            Some(Navigation {
                target: self.deps.policy.dashboard_path.clone(),
                after: self.deps.policy.success_redirect_delay,
            })
        } else {
            None
        };

        tracing::info!(
            "confirmation flow for session {} settled as {:?}",
            self.session.session_id(),
            result.kind
        );
        self.publish(result.clone());
        Some(Outcome { result, navigation })
    }

    async fn remember_unlocked_item(&self, result: &ConfirmationResult) {
        let Some(item_id) = result.data.as_ref().and_then(|d| d.unlocked_item_id()) else {
            return;
        };
        if let Err(e) = self.session.put_marker(Marker::AutoStartId, item_id).await {
            tracing::warn!("could not store auto-start marker: {}", e);
        }
    }

    async fn token(&self) -> Result<String, ConfirmError> {
        self.publish(ConfirmationResult::loading());
        self.lifecycle.scoped(self.session.bearer_token()).await
    }

    async fn payment_flow(&self, params: &RedirectParams) -> Result<ConfirmationResult, ConfirmError> {
        let token = self.token().await?;
        let mut attempt = params.payment_attempt();

        match params.payment_landing() {
            PaymentLanding::Redirected { status, .. } => {
                self.branch_on_intent(&token, &attempt, status, None).await
            }
            PaymentLanding::ClientSecret { client_secret, .. } => {
                let intent = self
                    .lifecycle
                    .scoped(self.deps.processor.retrieve_payment_intent(&client_secret))
                    .await?;
                attempt.intent_id = Some(intent.id.clone());
                attempt.amount_minor = intent.amount_minor;
                attempt.currency = intent.currency.clone();
                self.branch_on_intent(&token, &attempt, intent.status, intent.error_message)
                    .await
            }
            PaymentLanding::OrderOnly { order_id } => {
                self.poll(&token, PollTarget::Order(order_id)).await
            }
            PaymentLanding::Malformed => Err(ConfirmError::MalformedRedirect),
        }
    }

    async fn branch_on_intent(
        &self,
        token: &str,
        attempt: &PaymentAttempt,
        status: IntentStatus,
        processor_message: Option<String>,
    ) -> Result<ConfirmationResult, ConfirmError> {
        match status {
            IntentStatus::Succeeded => self.confirm_succeeded(token, attempt).await,
            IntentStatus::RequiresPaymentMethod | IntentStatus::Canceled => Ok(
                ConfirmationResult::failed(
                    processor_message.unwrap_or_else(|| RETRY_PAYMENT_MESSAGE.to_string()),
                ),
            ),
            IntentStatus::Processing => match &attempt.order_id {
                Some(order_id) => self.poll(token, PollTarget::Order(order_id.clone())).await,
                None => Ok(ConfirmationResult::processing(
                    PROCESSING_MESSAGE,
                    Some(ConfirmationData::Order(limited_order(attempt, "processing"))),
                )),
            },
            IntentStatus::RequiresAction | IntentStatus::RequiresConfirmation => {
                Ok(ConfirmationResult::requires_action(STEP_UP_PENDING_MESSAGE))
            }
            IntentStatus::Other(s) => Ok(ConfirmationResult::failed(format!(
                "Unexpected payment status \"{}\". Please contact support if you were charged.",
                s
            ))),
        }
    }

    async fn confirm_succeeded(
        &self,
        token: &str,
        attempt: &PaymentAttempt,
    ) -> Result<ConfirmationResult, ConfirmError> {
        let fallback = ConfirmationData::Order(limited_order(attempt, "succeeded"));
        let Some(order_id) = attempt.order_id.as_deref() else {
            return Ok(ConfirmationResult::success(fallback));
        };

        let confirmed = self
            .lifecycle
            .scoped(self.deps.backend.confirm_payment(
                token,
                order_id,
                attempt.intent_id.as_deref(),
            ))
            .await;

        match confirmed {
            Ok(confirmation) => Ok(ConfirmationResult::success(ConfirmationData::Order(
                confirmation.order,
            ))),
            Err(ConfirmError::Unmounted) => Err(ConfirmError::Unmounted),
            Err(e) if self.deps.policy.trust_processor_success => {
                tracing::warn!(
                    "backend confirmation failed for order {} after processor success: {}",
                    order_id,
                    e
                );
                Ok(ConfirmationResult::success(fallback))
            }
            Err(e) => Err(e),
        }
    }

    async fn subscription_flow(
        &self,
        params: &RedirectParams,
    ) -> Result<ConfirmationResult, ConfirmError> {
        let token = self.token().await?;

        match params.subscription_landing() {
            SubscriptionLanding::SetupFailed => Ok(ConfirmationResult::failed(SETUP_FAILED_MESSAGE)),
            SubscriptionLanding::Activate {
                setup_intent_id,
                recurring_price_id,
                with_trial,
            } => {
                let request = ActivateSubscription {
                    setup_intent_id,
                    recurring_price_id,
                    with_trial,
                };
                let activation = self
                    .lifecycle
                    .scoped(self.deps.backend.activate_subscription(&token, &request))
                    .await?;
                self.follow_activation(&token, activation).await
            }
            SubscriptionLanding::Poll { subscription_id } => {
                self.poll(&token, PollTarget::Subscription(subscription_id)).await
            }
            SubscriptionLanding::Malformed => Err(ConfirmError::MalformedRedirect),
        }
    }

    async fn follow_activation(
        &self,
        token: &str,
        activation: SubscriptionActivation,
    ) -> Result<ConfirmationResult, ConfirmError> {
        let snapshot = SubscriptionSnapshot {
            subscription_id: activation.subscription_id.clone(),
            status: activation
                .status
                .clone()
                .unwrap_or_else(|| "incomplete".to_string()),
            payment_status: activation.payment_status.clone(),
        };

        if activation.requires_action {
            let Some(secret) = activation.client_secret.as_deref() else {
                return Ok(ConfirmationResult::requires_action(MISSING_SECRET_MESSAGE));
            };
            if let Some(result) = self.step_up(secret).await? {
                return Ok(result);
            }
        } else {
            match subscription_progress(&snapshot.status, snapshot.payment_status.as_deref()) {
                Progress::Succeeded => {
                    return Ok(ConfirmationResult::success(ConfirmationData::Subscription(
                        snapshot,
                    )))
                }
                Progress::Failed => {
                    return Ok(ConfirmationResult::failed(SUBSCRIPTION_FAILED_MESSAGE)
                        .with_data(Some(ConfirmationData::Subscription(snapshot))))
                }
                Progress::RequiresAction | Progress::Pending => {}
            }
        }

        match activation.subscription_id {
            Some(subscription_id) => {
                self.poll(token, PollTarget::Subscription(subscription_id)).await
            }
            None => Ok(ConfirmationResult::processing(
                PENDING_AFTER_POLLING_MESSAGE,
                Some(ConfirmationData::Subscription(snapshot)),
            )),
        }
    }

    async fn checkout_flow(
        &self,
        params: &RedirectParams,
    ) -> Result<ConfirmationResult, ConfirmError> {
        let token = self.token().await?;

        match params.checkout_landing() {
            CheckoutLanding::Session { session_id } => {
                let report = self
                    .lifecycle
                    .scoped(self.deps.backend.check_session(&token, &session_id))
                    .await?;
                let mut snapshot = CheckoutSnapshot {
                    session_id: Some(report.session_id.clone()),
                    order_id: report.order_id.clone(),
                    payment_status: report.payment_status.clone(),
                    assessment_id: None,
                };

                match checkout_progress(report.status.as_deref(), &report.payment_status) {
                    Progress::Succeeded => {
                        snapshot.assessment_id = self
                            .lookup_assessment(&token, AssessmentLookup::Session(&session_id))
                            .await?;
                        Ok(ConfirmationResult::success(ConfirmationData::Checkout(snapshot)))
                    }
                    Progress::Failed => Ok(ConfirmationResult::failed(CHECKOUT_EXPIRED_MESSAGE)
                        .with_data(Some(ConfirmationData::Checkout(snapshot)))),
                    Progress::RequiresAction | Progress::Pending => {
                        Ok(ConfirmationResult::processing(
                            CHECKOUT_PENDING_MESSAGE,
                            Some(ConfirmationData::Checkout(snapshot)),
                        ))
                    }
                }
            }
            CheckoutLanding::Order { order_id } => {
                let assessment_id = self
                    .lifecycle
                    .scoped(
                        self.deps
                            .backend
                            .assessment_id(&token, AssessmentLookup::Order(&order_id)),
                    )
                    .await?;
                Ok(ConfirmationResult::success(ConfirmationData::Checkout(
                    CheckoutSnapshot {
                        session_id: None,
                        order_id: Some(order_id),
                        payment_status: "paid".to_string(),
                        assessment_id,
                    },
                )))
            }
            CheckoutLanding::Malformed => Err(ConfirmError::MalformedRedirect),
        }
    }

    /// Best effort: a paid session stays paid even if the lookup fails.
    async fn lookup_assessment(
        &self,
        token: &str,
        lookup: AssessmentLookup<'_>,
    ) -> Result<Option<String>, ConfirmError> {
        match self
            .lifecycle
            .scoped(self.deps.backend.assessment_id(token, lookup))
            .await
        {
            Ok(id) => Ok(id),
            Err(ConfirmError::Unmounted) => Err(ConfirmError::Unmounted),
            Err(e) => {
                tracing::warn!("assessment lookup failed for {:?}: {}", lookup, e);
                Ok(None)
            }
        }
    }

    /// `Ok(None)` when authentication completed and the flow may continue.
    async fn step_up(&self, client_secret: &str) -> Result<Option<ConfirmationResult>, ConfirmError> {
        let outcome = self
            .lifecycle
            .scoped(self.deps.processor.handle_step_up(client_secret))
            .await?;
        match outcome {
            StepUpOutcome::Completed(intent) => {
                tracing::debug!("step-up completed for {} ({})", intent.id, intent.status.as_str());
                Ok(None)
            }
            StepUpOutcome::StillRequiresAction { .. } => Ok(Some(
                ConfirmationResult::requires_action(STEP_UP_PENDING_MESSAGE),
            )),
            StepUpOutcome::Failed { message } => Ok(Some(ConfirmationResult::failed(message))),
        }
    }

    async fn observe(&self, token: &str, target: &PollTarget) -> Result<PollObservation, ConfirmError> {
        match target {
            PollTarget::Order(order_id) => {
                let report = self
                    .lifecycle
                    .scoped(self.deps.backend.payment_status(token, order_id))
                    .await?;
                Ok(observe_order(report))
            }
            PollTarget::Subscription(subscription_id) => {
                let report = self
                    .lifecycle
                    .scoped(self.deps.backend.subscription_status(token, subscription_id))
                    .await?;
                Ok(observe_subscription(report))
            }
        }
    }

    /// Bounded status polling. Attempt N+1 starts only after attempt N has
    /// been classified and the delay has elapsed; at most one inline step-up
    /// is performed per loop.
    async fn poll(&self, token: &str, target: PollTarget) -> Result<ConfirmationResult, ConfirmError> {
        let policy = self.deps.policy.poll_policy(&target);
        let mut attempt = PollAttempt::first(policy.max_attempts, policy.delay);
        let mut stepped_up = false;

        loop {
            let observation = self.observe(token, &target).await?;

            match observation.directive {
                PollDirective::Success => {
                    return Ok(ConfirmationResult::success(observation.data));
                }
                PollDirective::FailNow(message) => {
                    return Ok(ConfirmationResult::failed(message).with_data(Some(observation.data)));
                }
                PollDirective::ActionUnavailable => {
                    return Ok(ConfirmationResult::requires_action(MISSING_SECRET_MESSAGE)
                        .with_data(Some(observation.data)));
                }
                PollDirective::StepUp(secret) if !stepped_up => {
                    stepped_up = true;
                    if let Some(result) = self.step_up(&secret).await? {
                        return Ok(result.with_data(Some(observation.data)));
                    }
                }
                PollDirective::StepUp(_) | PollDirective::Continue => {}
            }

            let Some(next) = attempt.next() else {
                tracing::warn!(
                    "status polling for {:?} gave no final answer after {} attempts",
                    target,
                    attempt.attempt_number
                );
                return Ok(ConfirmationResult::processing(
                    PENDING_AFTER_POLLING_MESSAGE,
                    Some(observation.data),
                ));
            };

            self.publish(ConfirmationResult::processing(
                STILL_CHECKING_MESSAGE,
                Some(observation.data),
            ));
            self.lifecycle
                .scoped(async {
                    self.deps.sleeper.sleep(attempt.delay).await;
                    Ok::<(), ConfirmError>(())
                })
                .await?;
            attempt = next;
        }
    }
}

fn limited_order(attempt: &PaymentAttempt, status: &str) -> OrderSnapshot {
    OrderSnapshot {
        order_id: None,
        status: status.to_string(),
        payment_intent_id: attempt.intent_id.clone(),
        amount_minor: attempt.amount_minor,
        currency: attempt.currency.clone(),
        unlocked_item_id: None,
    }
}
