use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let sessions_ok = match state.sessions.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("session store ping failed: {}", e);
            false
        }
    };

    let status = if sessions_ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": sessions_ok,
            "session_store": sessions_ok,
            "processor": state.deps.processor.name(),
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
