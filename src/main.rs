use bazzingo_checkout::backend::http::HttpBackend;
use bazzingo_checkout::config::AppConfig;
use bazzingo_checkout::http::routes::build_router;
use bazzingo_checkout::processor::mock::MockProcessor;
use bazzingo_checkout::processor::stripe::StripeProcessor;
use bazzingo_checkout::processor::PaymentProcessor;
use bazzingo_checkout::service::clock::TokioSleeper;
use bazzingo_checkout::service::orchestrator::{FlowDeps, OrchestratorPolicy};
use bazzingo_checkout::session::store_redis::RedisSessionStore;
use bazzingo_checkout::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let client = reqwest::Client::new();

    let backend = Arc::new(HttpBackend::new(cfg.backend_base_url.clone(), client.clone()));

    let processor: Arc<dyn PaymentProcessor> = match cfg.processor_adapter.as_str() {
        "MOCK" => Arc::new(MockProcessor::new(&cfg.mock_processor_behavior)),
        _ => match &cfg.stripe_publishable_key {
            Some(key) => Arc::new(StripeProcessor::with_key(
                cfg.stripe_api_base_url.clone(),
                client.clone(),
                key,
            )),
            None => Arc::new(StripeProcessor::new(
                cfg.stripe_api_base_url.clone(),
                client.clone(),
                backend.clone(),
            )),
        },
    };

    let state = AppState {
        deps: FlowDeps {
            backend,
            processor: processor.clone(),
            sleeper: Arc::new(TokioSleeper),
            policy: OrchestratorPolicy::from_config(&cfg),
        },
        sessions: Arc::new(RedisSessionStore::new(&cfg.redis_url)?),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        "listening on {} (processor: {}, backend: {})",
        cfg.bind_addr,
        processor.name(),
        cfg.backend_base_url
    );
    axum::serve(listener, app).await?;
    Ok(())
}
