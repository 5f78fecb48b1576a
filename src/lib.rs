pub mod config;
pub mod error;
pub mod domain {
    pub mod attempt;
    pub mod redirect;
    pub mod result;
    pub mod status;
}
pub mod backend;
pub mod processor;
pub mod session;
pub mod http {
    pub mod handlers {
        pub mod landing;
        pub mod ops;
        pub mod subscription;
    }
    pub mod routes;
    pub mod session_cookie;
}
pub mod service {
    pub mod clock;
    pub mod end_trial;
    pub mod lifecycle;
    pub mod orchestrator;
    pub mod poller;
    pub mod subscription_actions;
}

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub deps: service::orchestrator::FlowDeps,
    pub sessions: Arc<dyn session::SessionStore>,
}

impl AppState {
    pub fn session(&self, session_id: &str) -> session::SessionHandle {
        session::SessionHandle::new(self.sessions.clone(), session_id)
    }
}
