use crate::domain::redirect::RedirectParams;
use crate::domain::result::ResultView;
use crate::http::session_cookie;
use crate::service::lifecycle::Lifecycle;
use crate::service::orchestrator::{ConfirmationOrchestrator, Outcome};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum Landing {
    Payment,
    Subscription,
    Checkout,
}

#[derive(Debug, Serialize)]
struct Links {
    dashboard: String,
    login: String,
}

#[derive(Debug, Serialize)]
struct LandingBody {
    #[serde(flatten)]
    view: ResultView,
    links: Links,
}

pub async fn payment_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    land(state, headers, query, Landing::Payment).await
}

pub async fn subscription_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    land(state, headers, query, Landing::Subscription).await
}

pub async fn checkout_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    land(state, headers, query, Landing::Checkout).await
}

async fn land(
    state: AppState,
    headers: HeaderMap,
    query: HashMap<String, String>,
    landing: Landing,
) -> Response {
    let params = RedirectParams::from_query(&query);
    let session = state.session(&session_cookie::session_id(&headers));
    let lifecycle = Lifecycle::new();
    // dropped with the handler future when the client disconnects
    let _mounted = lifecycle.guard();

    let orchestrator = ConfirmationOrchestrator::new(state.deps.clone(), session, lifecycle);
    let outcome = match landing {
        Landing::Payment => orchestrator.confirm_payment(&params).await,
        Landing::Subscription => orchestrator.activate_subscription(&params).await,
        Landing::Checkout => orchestrator.confirm_checkout(&params).await,
    };

    match outcome {
        Some(outcome) => render(&state, outcome),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn render(state: &AppState, outcome: Outcome) -> Response {
    let body = LandingBody {
        view: outcome.result.view(),
        links: Links {
            dashboard: state.deps.policy.dashboard_path.clone(),
            login: state.deps.policy.login_path.clone(),
        },
    };
    let mut response = (StatusCode::OK, Json(body)).into_response();

    if let Some(nav) = outcome.navigation {
        match HeaderValue::from_str(&nav.refresh_header()) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static("refresh"), value);
            }
            Err(e) => tracing::warn!("invalid navigation target {}: {}", nav.target, e),
        }
    }
    response
}
