use crate::http::handlers::{landing, ops, subscription};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/payment/complete", get(landing::payment_complete))
        .route("/subscription/complete", get(landing::subscription_complete))
        .route("/checkout/complete", get(landing::checkout_complete))
        .route("/subscription/end-trial", post(subscription::end_trial))
        .route("/subscription/cancel", post(subscription::cancel))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .with_state(state)
}
