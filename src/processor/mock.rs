use crate::domain::redirect::intent_id_from_secret;
use crate::domain::status::IntentStatus;
use crate::error::ConfirmError;
use crate::processor::{IntentSnapshot, PaymentProcessor, StepUpOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Canned processor for local runs and tests.
///
/// Behaviours: `ALWAYS_SUCCEEDED` (default), `ALWAYS_PROCESSING`,
/// `ALWAYS_REQUIRES_ACTION`, `ALWAYS_DECLINED`, `STEP_UP_DECLINED`,
/// `STEP_UP_INCOMPLETE`, `ALWAYS_ERROR`.
pub struct MockProcessor {
    pub behavior: String,
    retrieve_calls: AtomicUsize,
    step_up_calls: AtomicUsize,
}

impl MockProcessor {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_uppercase(),
            retrieve_calls: AtomicUsize::new(0),
            step_up_calls: AtomicUsize::new(0),
        }
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    pub fn step_up_calls(&self) -> usize {
        self.step_up_calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self, client_secret: &str, status: IntentStatus) -> IntentSnapshot {
        IntentSnapshot {
            id: intent_id_from_secret(client_secret).unwrap_or_else(|| "pi_mock".to_string()),
            status,
            amount_minor: Some(999),
            currency: Some("usd".to_string()),
            error_message: None,
        }
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
    ) -> Result<IntentSnapshot, ConfirmError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        let status = match self.behavior.as_str() {
            "ALWAYS_PROCESSING" => IntentStatus::Processing,
            "ALWAYS_REQUIRES_ACTION" => IntentStatus::RequiresAction,
            "ALWAYS_DECLINED" => {
                let mut snapshot =
                    self.snapshot(client_secret, IntentStatus::RequiresPaymentMethod);
                snapshot.error_message = Some("mock decline".to_string());
                return Ok(snapshot);
            }
            "ALWAYS_ERROR" => return Err(ConfirmError::processor("mock processor unavailable")),
            _ => IntentStatus::Succeeded,
        };
        Ok(self.snapshot(client_secret, status))
    }

    async fn handle_step_up(&self, client_secret: &str) -> Result<StepUpOutcome, ConfirmError> {
        self.step_up_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior.as_str() {
            "STEP_UP_DECLINED" | "ALWAYS_DECLINED" => Ok(StepUpOutcome::Failed {
                message: "mock authentication failed".to_string(),
            }),
            "STEP_UP_INCOMPLETE" | "ALWAYS_REQUIRES_ACTION" => {
                Ok(StepUpOutcome::StillRequiresAction {
                    redirect_url: Some("https://mock.invalid/3ds".to_string()),
                })
            }
            "ALWAYS_ERROR" => Err(ConfirmError::processor("mock processor unavailable")),
            _ => Ok(StepUpOutcome::Completed(
                self.snapshot(client_secret, IntentStatus::Succeeded),
            )),
        }
    }
}
