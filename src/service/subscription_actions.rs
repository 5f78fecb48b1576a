use crate::backend::BackendApi;
use crate::error::ConfirmError;
use crate::service::lifecycle::Lifecycle;
use crate::session::SessionHandle;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled { message: Option<String> },
    AuthRequired,
    Failed { message: String },
}

/// Cancels the signed-in user's subscription. `None` if the host went away.
pub async fn cancel_subscription(
    backend: &dyn BackendApi,
    session: &SessionHandle,
    lifecycle: &Lifecycle,
) -> Option<CancelOutcome> {
    let result = async {
        let token = lifecycle.scoped(session.bearer_token()).await?;
        lifecycle.scoped(backend.cancel_subscription(&token)).await
    }
    .await;

    match result {
        Ok(message) => {
            tracing::info!("subscription cancelled for session {}", session.session_id());
            Some(CancelOutcome::Cancelled { message })
        }
        Err(ConfirmError::Unmounted) => None,
        Err(e) if e.is_auth_problem() => Some(CancelOutcome::AuthRequired),
        Err(e) => {
            tracing::warn!("subscription cancel failed: {}", e);
            Some(CancelOutcome::Failed {
                message: e.to_string(),
            })
        }
    }
}
