#![allow(dead_code)]

use bazzingo_checkout::backend::{
    ActivateSubscription, AssessmentLookup, BackendApi, CheckoutSessionReport, EndTrialAction,
    EndTrialReply, OrderStatusReport, PaymentConfirmation, SubscriptionActivation,
    SubscriptionStatusReport,
};
use bazzingo_checkout::domain::redirect::RedirectParams;
use bazzingo_checkout::domain::result::{OrderSnapshot, SubscriptionSnapshot};
use bazzingo_checkout::error::ConfirmError;
use bazzingo_checkout::processor::mock::MockProcessor;
use bazzingo_checkout::service::clock::Sleeper;
use bazzingo_checkout::service::lifecycle::Lifecycle;
use bazzingo_checkout::service::orchestrator::{FlowDeps, OrchestratorPolicy};
use bazzingo_checkout::session::memory::InMemorySessionStore;
use bazzingo_checkout::session::{AuthSession, Marker, SessionHandle, SessionStore};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SESSION_ID: &str = "sess_1";
pub const TOKEN: &str = "tok_1";

/// Queue of canned replies. The last reply repeats once the queue drains
/// to one entry; an empty script answers with a backend error.
pub struct Script<T> {
    replies: Mutex<VecDeque<Result<T, ConfirmError>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T: Clone> Script<T> {
    pub fn push(&self, reply: Result<T, ConfirmError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn next(&self) -> Result<T, ConfirmError> {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            return replies.pop_front().unwrap();
        }
        replies
            .front()
            .cloned()
            .unwrap_or_else(|| Err(ConfirmError::backend("unscripted call")))
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    pub confirm: Script<PaymentConfirmation>,
    pub payment_status: Script<OrderStatusReport>,
    pub activate: Script<SubscriptionActivation>,
    pub subscription_status: Script<SubscriptionStatusReport>,
    pub cancel: Script<Option<String>>,
    pub end_trial: Script<EndTrialReply>,
    pub assessment: Script<Option<String>>,
    pub session: Script<CheckoutSessionReport>,
    calls: Mutex<Vec<String>>,
    tokens: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(endpoint))
            .count()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    fn record(&self, token: &str, call: String) {
        self.tokens.lock().unwrap().push(token.to_string());
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl BackendApi for ScriptedBackend {
    async fn confirm_payment(
        &self,
        token: &str,
        order_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<PaymentConfirmation, ConfirmError> {
        self.record(
            token,
            format!("confirm_payment:{}:{}", order_id, payment_intent_id.unwrap_or("-")),
        );
        self.confirm.next()
    }

    async fn payment_status(
        &self,
        token: &str,
        order_id: &str,
    ) -> Result<OrderStatusReport, ConfirmError> {
        self.record(token, format!("payment_status:{}", order_id));
        self.payment_status.next()
    }

    async fn activate_subscription(
        &self,
        token: &str,
        request: &ActivateSubscription,
    ) -> Result<SubscriptionActivation, ConfirmError> {
        self.record(
            token,
            format!(
                "activate_subscription:{}:{}:{}",
                request.setup_intent_id, request.recurring_price_id, request.with_trial
            ),
        );
        self.activate.next()
    }

    async fn subscription_status(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<SubscriptionStatusReport, ConfirmError> {
        self.record(token, format!("subscription_status:{}", subscription_id));
        self.subscription_status.next()
    }

    async fn cancel_subscription(&self, token: &str) -> Result<Option<String>, ConfirmError> {
        self.record(token, "cancel_subscription".to_string());
        self.cancel.next()
    }

    async fn end_trial(&self, token: &str, request_id: &str) -> Result<EndTrialReply, ConfirmError> {
        self.record(token, format!("end_trial:{}", request_id));
        self.end_trial.next()
    }

    async fn assessment_id(
        &self,
        token: &str,
        lookup: AssessmentLookup<'_>,
    ) -> Result<Option<String>, ConfirmError> {
        let key = match lookup {
            AssessmentLookup::Order(id) => format!("order={}", id),
            AssessmentLookup::Session(id) => format!("session={}", id),
        };
        self.record(token, format!("assessment_id:{}", key));
        self.assessment.next()
    }

    async fn check_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<CheckoutSessionReport, ConfirmError> {
        self.record(token, format!("check_session:{}", session_id));
        self.session.next()
    }
}

/// Records requested delays instead of waiting. Optionally unmounts a
/// lifecycle once a given number of sleeps has been requested.
#[derive(Default)]
pub struct VirtualClock {
    sleeps: Mutex<Vec<Duration>>,
    unmount_after: Mutex<Option<(usize, Lifecycle)>>,
}

impl VirtualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unmount_after(&self, sleeps: usize, lifecycle: &Lifecycle) {
        *self.unmount_after.lock().unwrap() = Some((sleeps, lifecycle.clone()));
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for VirtualClock {
    async fn sleep(&self, duration: Duration) {
        let taken = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        let trigger = self.unmount_after.lock().unwrap().clone();
        if let Some((after, lifecycle)) = trigger {
            if taken >= after {
                lifecycle.unmount();
            }
        }
        tokio::task::yield_now().await;
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub processor: Arc<MockProcessor>,
    pub clock: Arc<VirtualClock>,
    pub store: InMemorySessionStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_processor("ALWAYS_SUCCEEDED")
    }

    pub fn with_processor(behavior: &str) -> Self {
        Self {
            backend: ScriptedBackend::new(),
            processor: Arc::new(MockProcessor::new(behavior)),
            clock: VirtualClock::new(),
            store: InMemorySessionStore::new(),
        }
    }

    pub fn deps(&self) -> FlowDeps {
        FlowDeps {
            backend: self.backend.clone(),
            processor: self.processor.clone(),
            sleeper: self.clock.clone(),
            policy: OrchestratorPolicy::default(),
        }
    }

    pub async fn signed_in(&self) -> SessionHandle {
        self.store
            .insert_auth(
                SESSION_ID,
                AuthSession {
                    token: TOKEN.to_string(),
                    expires_at: None,
                },
            )
            .await;
        self.session()
    }

    pub fn session(&self) -> SessionHandle {
        SessionHandle::new(Arc::new(self.store.clone()), SESSION_ID)
    }
}

pub fn params(pairs: &[(&str, &str)]) -> RedirectParams {
    let query: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RedirectParams::from_query(&query)
}

pub fn order_report(order_id: &str, status: &str, secret: Option<&str>) -> OrderStatusReport {
    OrderStatusReport {
        order: OrderSnapshot {
            order_id: Some(order_id.to_string()),
            status: status.to_string(),
            ..Default::default()
        },
        action_client_secret: secret.map(str::to_string),
    }
}

pub fn subscription_report(
    subscription_id: &str,
    status: &str,
    secret: Option<&str>,
) -> SubscriptionStatusReport {
    SubscriptionStatusReport {
        subscription: SubscriptionSnapshot {
            subscription_id: Some(subscription_id.to_string()),
            status: status.to_string(),
            payment_status: None,
        },
        requires_action: secret.is_some(),
        action_client_secret: secret.map(str::to_string),
    }
}

pub fn end_trial_reply(action: EndTrialAction) -> EndTrialReply {
    EndTrialReply {
        action,
        message: None,
        request_id: None,
    }
}

/// Session store whose backing service is down.
pub struct UnreachableStore;

#[async_trait::async_trait]
impl SessionStore for UnreachableStore {
    async fn auth_session(&self, _session_id: &str) -> anyhow::Result<Option<AuthSession>> {
        Err(anyhow::anyhow!("Connection refused (os error 111)"))
    }

    async fn put_marker(&self, _session_id: &str, _marker: Marker, _value: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("Connection refused (os error 111)"))
    }

    async fn peek_marker(&self, _session_id: &str, _marker: Marker) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("Connection refused (os error 111)"))
    }

    async fn take_marker(&self, _session_id: &str, _marker: Marker) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("Connection refused (os error 111)"))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("Connection refused (os error 111)"))
    }
}

pub fn unreachable_session() -> SessionHandle {
    SessionHandle::new(Arc::new(UnreachableStore), SESSION_ID)
}
