/// Everything that can interrupt a confirmation flow.
///
/// None of these leave the orchestrator: each one is folded into a
/// `ConfirmationResult` at the flow boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfirmError {
    #[error("your session has expired, please log in again")]
    AuthRequired,
    #[error("{message}")]
    Processor { message: String },
    #[error("{message}")]
    Backend {
        message: String,
        request_id: Option<String>,
        http_status: Option<u16>,
    },
    #[error("{message}")]
    Transport { message: String },
    #[error("we could not verify this payment: the confirmation link is incomplete")]
    MalformedRedirect,
    #[error("confirmation flow was abandoned")]
    Unmounted,
}

const AUTH_HINTS: [&str; 6] = [
    "unauthorized",
    "unauthenticated",
    "not authenticated",
    "token",
    "session expired",
    "login",
];

impl ConfirmError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            request_id: None,
            http_status: None,
        }
    }

    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor {
            message: message.into(),
        }
    }

    /// Whether the error means the user has to log in again.
    pub fn is_auth_problem(&self) -> bool {
        match self {
            Self::AuthRequired => true,
            Self::Backend {
                http_status: Some(401 | 403),
                ..
            } => true,
            Self::Backend { message, .. } | Self::Transport { message } => {
                let lowered = message.to_lowercase();
                AUTH_HINTS.iter().any(|hint| lowered.contains(hint))
            }
            _ => false,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Backend { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConfirmError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().is_some_and(|s| s.as_u16() == 401 || s.as_u16() == 403) {
            return Self::AuthRequired;
        }
        Self::Transport {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_401_is_auth_problem() {
        let e = ConfirmError::Backend {
            message: "nope".to_string(),
            request_id: None,
            http_status: Some(401),
        };
        assert!(e.is_auth_problem());
    }

    #[test]
    fn message_mentioning_token_is_auth_problem() {
        assert!(ConfirmError::backend("Invalid token provided").is_auth_problem());
        assert!(!ConfirmError::backend("card declined").is_auth_problem());
    }

    #[test]
    fn processor_errors_never_count_as_auth() {
        assert!(!ConfirmError::processor("token expired on card").is_auth_problem());
    }
}
