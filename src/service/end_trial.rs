use crate::backend::{EndTrialAction, EndTrialReply};
use crate::error::ConfirmError;
use crate::processor::StepUpOutcome;
use crate::service::lifecycle::Lifecycle;
use crate::service::orchestrator::FlowDeps;
use crate::session::{Marker, SessionHandle};
use serde::Serialize;

const MISSING_SECRET_MESSAGE: &str =
    "Your bank asked for authentication, but the request could not be completed. Please try again.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EndTrialOutcome {
    TrialEnded {
        message: Option<String>,
    },
    PaymentFailed {
        message: String,
    },
    /// Step-up was attempted but the cardholder still has to act.
    AuthenticationIncomplete {
        message: String,
    },
    Unknown {
        action: Option<String>,
        message: Option<String>,
    },
    AuthRequired,
    Failed {
        message: String,
        request_id: Option<String>,
    },
}

/// "End trial now": request, step up if asked, retry exactly once.
pub struct EndTrialFlow {
    deps: FlowDeps,
    session: SessionHandle,
    lifecycle: Lifecycle,
}

impl EndTrialFlow {
    pub fn new(deps: FlowDeps, session: SessionHandle, lifecycle: Lifecycle) -> Self {
        Self {
            deps,
            session,
            lifecycle,
        }
    }

    /// `None` when the host went away before a definite answer.
    pub async fn run(&self) -> Option<EndTrialOutcome> {
        let token = match self.lifecycle.scoped(self.session.bearer_token()).await {
            Ok(token) => token,
            Err(ConfirmError::Unmounted) => return None,
            Err(e) if e.is_auth_problem() => return Some(EndTrialOutcome::AuthRequired),
            Err(e) => {
                return Some(EndTrialOutcome::Failed {
                    message: e.to_string(),
                    request_id: None,
                })
            }
        };

        let request_id = self.request_id().await;
        let outcome = match self.attempt(&token, &request_id).await {
            Ok(outcome) => outcome,
            Err(ConfirmError::Unmounted) => return None,
            Err(e) if e.is_auth_problem() => EndTrialOutcome::AuthRequired,
            Err(e) => {
                tracing::warn!("end trial failed (request {}): {}", request_id, e);
                EndTrialOutcome::Failed {
                    message: e.to_string(),
                    request_id: Some(e.request_id().unwrap_or(&request_id).to_string()),
                }
            }
        };

        if matches!(
            outcome,
            EndTrialOutcome::TrialEnded { .. } | EndTrialOutcome::PaymentFailed { .. }
        ) {
            if let Err(e) = self.session.take_marker(Marker::EndTrialRequestId).await {
                tracing::warn!("could not clear end-trial request id: {}", e);
            }
        }
        if self.lifecycle.is_unmounted() {
            return None;
        }
        tracing::info!("end trial for session {} finished: {:?}", self.session.session_id(), outcome);
        Some(outcome)
    }

    /// Reuses a pending id so a reload does not start a second end-trial.
    async fn request_id(&self) -> String {
        match self.session.peek_marker(Marker::EndTrialRequestId).await {
            Ok(Some(id)) if !id.is_empty() => return id,
            Ok(_) => {}
            Err(e) => tracing::warn!("could not read end-trial request id: {}", e),
        }
        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.session.put_marker(Marker::EndTrialRequestId, &id).await {
            tracing::warn!("could not store end-trial request id: {}", e);
        }
        id
    }

    async fn attempt(&self, token: &str, request_id: &str) -> Result<EndTrialOutcome, ConfirmError> {
        let reply = self.call(token, request_id).await?;
        let EndTrialAction::RequiresAuthentication { client_secret } = &reply.action else {
            return Ok(settled(reply));
        };
        let Some(secret) = client_secret else {
            return Ok(EndTrialOutcome::Failed {
                message: MISSING_SECRET_MESSAGE.to_string(),
                request_id: reply.request_id,
            });
        };

        match self
            .lifecycle
            .scoped(self.deps.processor.handle_step_up(secret))
            .await?
        {
            StepUpOutcome::Completed(_) => {}
            StepUpOutcome::StillRequiresAction { .. } => {
                return Ok(EndTrialOutcome::AuthenticationIncomplete {
                    message: "Authentication was not completed. Please try again.".to_string(),
                })
            }
            StepUpOutcome::Failed { message } => {
                return Ok(EndTrialOutcome::PaymentFailed { message })
            }
        }

        let retried = self.call(token, request_id).await?;
        if let EndTrialAction::RequiresAuthentication { .. } = retried.action {
            tracing::warn!("end trial asked for authentication twice (request {})", request_id);
            return Ok(EndTrialOutcome::Unknown {
                action: Some("requires_3ds_authentication".to_string()),
                message: retried.message,
            });
        }
        Ok(settled(retried))
    }

    async fn call(&self, token: &str, request_id: &str) -> Result<EndTrialReply, ConfirmError> {
        self.lifecycle
            .scoped(self.deps.backend.end_trial(token, request_id))
            .await
    }
}

fn settled(reply: EndTrialReply) -> EndTrialOutcome {
    match reply.action {
        EndTrialAction::TrialEnded => EndTrialOutcome::TrialEnded {
            message: reply.message,
        },
        EndTrialAction::PaymentFailed => EndTrialOutcome::PaymentFailed {
            message: reply
                .message
                .unwrap_or_else(|| "Your payment could not be completed.".to_string()),
        },
        EndTrialAction::RequiresAuthentication { .. } => EndTrialOutcome::Unknown {
            action: Some("requires_3ds_authentication".to_string()),
            message: reply.message,
        },
        EndTrialAction::Unknown(action) => EndTrialOutcome::Unknown {
            action,
            message: reply.message,
        },
    }
}
