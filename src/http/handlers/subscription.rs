use crate::http::session_cookie;
use crate::service::end_trial::{EndTrialFlow, EndTrialOutcome};
use crate::service::lifecycle::Lifecycle;
use crate::service::subscription_actions::{cancel_subscription, CancelOutcome};
use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn end_trial(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session(&session_cookie::session_id(&headers));
    let lifecycle = Lifecycle::new();
    let _mounted = lifecycle.guard();

    let Some(outcome) = EndTrialFlow::new(state.deps.clone(), session, lifecycle.clone())
        .run()
        .await
    else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let status = match &outcome {
        EndTrialOutcome::TrialEnded { .. } => StatusCode::OK,
        EndTrialOutcome::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
        EndTrialOutcome::AuthenticationIncomplete { .. } => StatusCode::CONFLICT,
        EndTrialOutcome::Unknown { .. } => StatusCode::ACCEPTED,
        EndTrialOutcome::AuthRequired => StatusCode::UNAUTHORIZED,
        EndTrialOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome)).into_response()
}

pub async fn cancel(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session(&session_cookie::session_id(&headers));
    let lifecycle = Lifecycle::new();
    let _mounted = lifecycle.guard();

    let Some(outcome) =
        cancel_subscription(state.deps.backend.as_ref(), &session, &lifecycle).await
    else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let status = match &outcome {
        CancelOutcome::Cancelled { .. } => StatusCode::OK,
        CancelOutcome::AuthRequired => StatusCode::UNAUTHORIZED,
        CancelOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome)).into_response()
}
