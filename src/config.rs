use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub backend_base_url: String,
    pub stripe_api_base_url: String,
    pub stripe_publishable_key: Option<String>,
    pub processor_adapter: String,
    pub mock_processor_behavior: String,
    pub poll_delay_ms: u64,
    pub order_poll_max_attempts: u32,
    pub subscription_poll_max_attempts: u32,
    pub success_redirect_delay_ms: u64,
    pub dashboard_path: String,
    pub login_path: String,
    pub trust_processor_success: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
            backend_base_url: std::env::var("BACKEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
            stripe_api_base_url: std::env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_publishable_key: std::env::var("STRIPE_PUBLISHABLE_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            processor_adapter: std::env::var("PROCESSOR_ADAPTER")
                .unwrap_or_else(|_| "STRIPE".to_string())
                .to_uppercase(),
            mock_processor_behavior: std::env::var("MOCK_PROCESSOR_BEHAVIOR")
                .unwrap_or_else(|_| "ALWAYS_SUCCEEDED".to_string()),
            poll_delay_ms: env_parse("POLL_DELAY_MS", 2000),
            order_poll_max_attempts: env_parse("ORDER_POLL_MAX_ATTEMPTS", 10),
            subscription_poll_max_attempts: env_parse("SUBSCRIPTION_POLL_MAX_ATTEMPTS", 15),
            success_redirect_delay_ms: env_parse("SUCCESS_REDIRECT_DELAY_MS", 3000),
            dashboard_path: std::env::var("DASHBOARD_PATH")
                .unwrap_or_else(|_| "/dashboard".to_string()),
            login_path: std::env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            trust_processor_success: env_parse("TRUST_PROCESSOR_SUCCESS", true),
        }
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn success_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.success_redirect_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
