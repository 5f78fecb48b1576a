/// Intent status as the processor reports it, either in the redirect
/// `redirect_status` parameter or from a direct retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresAction,
    RequiresConfirmation,
    Canceled,
    Other(String),
}

impl IntentStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_action" => Self::RequiresAction,
            "requires_confirmation" => Self::RequiresConfirmation,
            "canceled" | "cancelled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresAction => "requires_action",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }
}

/// Where a backend-reported order or subscription stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Succeeded,
    Failed,
    RequiresAction,
    Pending,
}

pub fn order_progress(status: &str) -> Progress {
    match status.trim().to_lowercase().as_str() {
        "succeeded" | "success" | "paid" | "completed" => Progress::Succeeded,
        "failed" | "payment_failed" | "canceled" | "cancelled" | "requires_payment_method" => {
            Progress::Failed
        }
        "requires_action" => Progress::RequiresAction,
        _ => Progress::Pending,
    }
}

pub fn subscription_progress(status: &str, payment_status: Option<&str>) -> Progress {
    let status = status.trim().to_lowercase();
    let payment_status = payment_status.map(|p| p.trim().to_lowercase());

    match status.as_str() {
        "active" | "trialing" => return Progress::Succeeded,
        "canceled" | "cancelled" | "incomplete_expired" | "unpaid" => return Progress::Failed,
        _ => {}
    }

    match payment_status.as_deref() {
        Some("failed") | Some("requires_payment_method") | Some("canceled") => Progress::Failed,
        Some("requires_action") => Progress::RequiresAction,
        _ if status == "requires_action" => Progress::RequiresAction,
        _ => Progress::Pending,
    }
}

/// Hosted-checkout session state from `/stripe/session/check`.
pub fn checkout_progress(status: Option<&str>, payment_status: &str) -> Progress {
    match payment_status.trim().to_lowercase().as_str() {
        "paid" | "no_payment_required" => return Progress::Succeeded,
        _ => {}
    }
    match status.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("expired") => Progress::Failed,
        _ => Progress::Pending,
    }
}
