mod common;

use bazzingo_checkout::backend::SubscriptionActivation;
use bazzingo_checkout::domain::result::{ConfirmationData, ResultKind};
use bazzingo_checkout::error::ConfirmError;
use bazzingo_checkout::service::lifecycle::Lifecycle;
use bazzingo_checkout::service::orchestrator::ConfirmationOrchestrator;
use common::{params, subscription_report, Harness};

#[tokio::test]
async fn step_up_then_poll_until_trialing() {
    let h = Harness::new();
    h.backend.activate.push(Ok(SubscriptionActivation {
        subscription_id: Some("sub_1".to_string()),
        status: Some("incomplete".to_string()),
        requires_action: true,
        client_secret: Some("sec_1".to_string()),
        ..Default::default()
    }));
    h.backend
        .subscription_status
        .push(Ok(subscription_report("sub_1", "incomplete", None)))
        .push(Ok(subscription_report("sub_1", "trialing", None)));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[
            ("setupIntentId", "si_1"),
            ("recurringPriceId", "price_1"),
            ("withTrial", "true"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Success);
    assert_eq!(h.processor.step_up_calls(), 1);
    assert_eq!(
        h.backend.calls(),
        vec![
            "activate_subscription:si_1:price_1:true".to_string(),
            "subscription_status:sub_1".to_string(),
            "subscription_status:sub_1".to_string(),
        ]
    );
    match outcome.result.data {
        Some(ConfirmationData::Subscription(sub)) => assert_eq!(sub.status, "trialing"),
        other => panic!("unexpected data: {:?}", other),
    }
    assert!(outcome.navigation.is_some());
}

#[tokio::test]
async fn active_activation_succeeds_without_polling() {
    let h = Harness::new();
    h.backend.activate.push(Ok(SubscriptionActivation {
        subscription_id: Some("sub_2".to_string()),
        status: Some("active".to_string()),
        ..Default::default()
    }));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[("setupIntentId", "si_2"), ("recurringPriceId", "price_1")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Success);
    assert_eq!(h.backend.count("subscription_status"), 0);
    assert_eq!(h.processor.step_up_calls(), 0);
    assert!(h.backend.calls()[0].ends_with(":false"));
}

#[tokio::test]
async fn error_reply_from_activation_is_failed() {
    let h = Harness::new();
    h.backend
        .activate
        .push(Err(ConfirmError::backend("Price not found")));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[("setupIntentId", "si_3"), ("recurringPriceId", "price_x")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert_eq!(outcome.result.message.as_deref(), Some("Price not found"));
}

#[tokio::test]
async fn incomplete_step_up_stops_before_polling() {
    let h = Harness::with_processor("STEP_UP_INCOMPLETE");
    h.backend.activate.push(Ok(SubscriptionActivation {
        subscription_id: Some("sub_4".to_string()),
        requires_action: true,
        client_secret: Some("sec_4".to_string()),
        ..Default::default()
    }));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[("setupIntentId", "si_4"), ("recurringPriceId", "price_1")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::RequiresAction);
    assert_eq!(h.backend.count("subscription_status"), 0);
}

#[tokio::test]
async fn failed_setup_redirect_makes_no_backend_call() {
    let h = Harness::new();
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[
            ("setup_intent_client_secret", "seti_1_secret_q"),
            ("redirect_status", "requires_payment_method"),
            ("recurringPriceId", "price_1"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn declined_redirect_with_setup_intent_id_skips_activation() {
    let h = Harness::new();
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[
            ("setupIntentId", "si_6"),
            ("recurringPriceId", "price_1"),
            ("redirect_status", "requires_payment_method"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert_eq!(h.backend.count("activate_subscription"), 0);
}

#[tokio::test]
async fn bare_subscription_id_polls_fifteen_times() {
    let h = Harness::new();
    h.backend
        .subscription_status
        .push(Ok(subscription_report("sub_5", "incomplete", None)));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .activate_subscription(&params(&[("subscriptionId", "sub_5")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Processing);
    assert_eq!(h.backend.count("subscription_status"), 15);
    assert_eq!(h.clock.sleeps().len(), 14);
}
