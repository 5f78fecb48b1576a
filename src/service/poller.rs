use crate::backend::{OrderStatusReport, SubscriptionStatusReport};
use crate::domain::result::ConfirmationData;
use crate::domain::status::{order_progress, subscription_progress, Progress};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    Order(String),
    Subscription(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollDirective {
    Success,
    Continue,
    FailNow(String),
    /// Backend wants step-up authentication with this secret.
    StepUp(String),
    /// Backend wants step-up but gave no secret to perform it with.
    ActionUnavailable,
}

/// What a single status poll observed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollObservation {
    pub directive: PollDirective,
    pub data: ConfirmationData,
}

pub fn classify_order_report(report: &OrderStatusReport) -> PollDirective {
    match order_progress(&report.order.status) {
        Progress::Succeeded => PollDirective::Success,
        Progress::Failed => PollDirective::FailNow(format!(
            "Payment {}. Please try again.",
            report.order.status.to_lowercase().replace('_', " ")
        )),
        Progress::RequiresAction => match &report.action_client_secret {
            Some(secret) => PollDirective::StepUp(secret.clone()),
            None => PollDirective::ActionUnavailable,
        },
        Progress::Pending => match &report.action_client_secret {
            Some(secret) => PollDirective::StepUp(secret.clone()),
            None => PollDirective::Continue,
        },
    }
}

pub fn classify_subscription_report(report: &SubscriptionStatusReport) -> PollDirective {
    let progress = subscription_progress(
        &report.subscription.status,
        report.subscription.payment_status.as_deref(),
    );
    match progress {
        Progress::Succeeded => PollDirective::Success,
        Progress::Failed => PollDirective::FailNow(
            "Your subscription payment could not be completed. Please try again.".to_string(),
        ),
        Progress::RequiresAction | Progress::Pending => {
            let wants_action = report.requires_action || progress == Progress::RequiresAction;
            match (&report.action_client_secret, wants_action) {
                (Some(secret), true) => PollDirective::StepUp(secret.clone()),
                (None, true) if progress == Progress::RequiresAction => {
                    PollDirective::ActionUnavailable
                }
                _ => PollDirective::Continue,
            }
        }
    }
}

pub fn observe_order(report: OrderStatusReport) -> PollObservation {
    PollObservation {
        directive: classify_order_report(&report),
        data: ConfirmationData::Order(report.order),
    }
}

pub fn observe_subscription(report: SubscriptionStatusReport) -> PollObservation {
    PollObservation {
        directive: classify_subscription_report(&report),
        data: ConfirmationData::Subscription(report.subscription),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{OrderSnapshot, SubscriptionSnapshot};

    fn order(status: &str, secret: Option<&str>) -> OrderStatusReport {
        OrderStatusReport {
            order: OrderSnapshot {
                order_id: Some("ord_1".to_string()),
                status: status.to_string(),
                ..Default::default()
            },
            action_client_secret: secret.map(str::to_string),
        }
    }

    fn subscription(status: &str, requires_action: bool, secret: Option<&str>) -> SubscriptionStatusReport {
        SubscriptionStatusReport {
            subscription: SubscriptionSnapshot {
                subscription_id: Some("sub_1".to_string()),
                status: status.to_string(),
                payment_status: None,
            },
            requires_action,
            action_client_secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn processing_order_continues() {
        assert_eq!(classify_order_report(&order("processing", None)), PollDirective::Continue);
    }

    #[test]
    fn requires_action_with_secret_steps_up() {
        assert_eq!(
            classify_order_report(&order("requires_action", Some("pi_1_secret_a"))),
            PollDirective::StepUp("pi_1_secret_a".to_string())
        );
        assert_eq!(
            classify_order_report(&order("requires_action", None)),
            PollDirective::ActionUnavailable
        );
    }

    #[test]
    fn failed_order_fails_now() {
        assert!(matches!(
            classify_order_report(&order("failed", None)),
            PollDirective::FailNow(_)
        ));
    }

    #[test]
    fn incomplete_subscription_with_action_steps_up() {
        assert_eq!(
            classify_subscription_report(&subscription("incomplete", true, Some("pi_2_secret_b"))),
            PollDirective::StepUp("pi_2_secret_b".to_string())
        );
        assert_eq!(
            classify_subscription_report(&subscription("incomplete", false, None)),
            PollDirective::Continue
        );
        assert_eq!(
            classify_subscription_report(&subscription("trialing", false, None)),
            PollDirective::Success
        );
    }
}
