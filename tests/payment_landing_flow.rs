mod common;

use bazzingo_checkout::backend::PaymentConfirmation;
use bazzingo_checkout::domain::result::{ConfirmationData, OrderSnapshot, ResultKind};
use bazzingo_checkout::error::ConfirmError;
use bazzingo_checkout::service::lifecycle::Lifecycle;
use bazzingo_checkout::service::orchestrator::ConfirmationOrchestrator;
use bazzingo_checkout::session::Marker;
use common::{params, Harness};

fn confirmed(order_id: &str, unlocked: Option<&str>) -> PaymentConfirmation {
    PaymentConfirmation {
        order: OrderSnapshot {
            order_id: Some(order_id.to_string()),
            status: "paid".to_string(),
            payment_intent_id: Some("pi_1".to_string()),
            amount_minor: Some(1999),
            currency: Some("usd".to_string()),
            unlocked_item_id: unlocked.map(str::to_string),
        },
        message: None,
    }
}

#[tokio::test]
async fn succeeded_redirect_confirms_with_backend() {
    let h = Harness::new();
    h.backend.confirm.push(Ok(confirmed("ord_1", Some("asm_7"))));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[
            ("orderId", "ord_1"),
            ("payment_intent", "pi_1"),
            ("redirect_status", "succeeded"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Success);
    assert_eq!(h.backend.calls(), vec!["confirm_payment:ord_1:pi_1".to_string()]);
    assert_eq!(h.backend.tokens(), vec![common::TOKEN.to_string()]);

    let nav = outcome.navigation.unwrap();
    assert_eq!(nav.target, "/dashboard");
    assert_eq!(nav.refresh_header(), "3; url=/dashboard");

    assert_eq!(
        h.session().take_marker(Marker::AutoStartId).await.unwrap().as_deref(),
        Some("asm_7")
    );
    assert_eq!(orchestrator.current().kind, ResultKind::Success);
}

#[tokio::test]
async fn backend_failure_after_processor_success_still_succeeds() {
    let h = Harness::new();
    h.backend.confirm.push(Err(ConfirmError::Transport {
        message: "connection reset by peer".to_string(),
    }));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[
            ("orderId", "ord_2"),
            ("payment_intent", "pi_2"),
            ("redirect_status", "succeeded"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Success);
    match outcome.result.data {
        Some(ConfirmationData::Order(order)) => {
            assert_eq!(order.status, "succeeded");
            assert_eq!(order.payment_intent_id.as_deref(), Some("pi_2"));
            assert_eq!(order.order_id, None);
        }
        other => panic!("unexpected data: {:?}", other),
    }
    assert_eq!(h.backend.count("confirm_payment"), 1);
}

#[tokio::test]
async fn backend_failure_is_reported_when_leniency_is_off() {
    let h = Harness::new();
    h.backend
        .confirm
        .push(Err(ConfirmError::backend("Order not found")));
    let mut deps = h.deps();
    deps.policy.trust_processor_success = false;
    let orchestrator = ConfirmationOrchestrator::new(deps, h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("orderId", "ord_2"), ("redirect_status", "succeeded")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert_eq!(outcome.result.message.as_deref(), Some("Order not found"));
    assert!(outcome.navigation.is_none());
}

#[tokio::test]
async fn requires_payment_method_fails_without_backend_call() {
    let h = Harness::new();
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[
            ("orderId", "ord_3"),
            ("redirect_status", "requires_payment_method"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert!(outcome.result.view().actions.contains(
        &bazzingo_checkout::domain::result::UserAction::Retry
    ));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn missing_session_is_auth_required_without_any_call() {
    let h = Harness::new();
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.session(), Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("orderId", "ord_1"), ("redirect_status", "succeeded")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::AuthRequired);
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.processor.retrieve_calls(), 0);
}

#[tokio::test]
async fn backend_401_is_auth_required() {
    let h = Harness::new();
    h.backend.confirm.push(Err(ConfirmError::AuthRequired));
    let mut deps = h.deps();
    deps.policy.trust_processor_success = false;
    let orchestrator = ConfirmationOrchestrator::new(deps, h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("orderId", "ord_1"), ("redirect_status", "succeeded")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::AuthRequired);
}

#[tokio::test]
async fn client_secret_only_retrieves_intent_then_confirms() {
    let h = Harness::new();
    h.backend.confirm.push(Ok(confirmed("ord_4", None)));
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[
            ("orderId", "ord_4"),
            ("payment_intent_client_secret", "pi_44_secret_abc"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Success);
    assert_eq!(h.processor.retrieve_calls(), 1);
    assert_eq!(h.backend.calls(), vec!["confirm_payment:ord_4:pi_44".to_string()]);
}

#[tokio::test]
async fn client_secret_with_pending_step_up_is_requires_action() {
    let h = Harness::with_processor("ALWAYS_REQUIRES_ACTION");
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[
            ("orderId", "ord_5"),
            ("payment_intent_client_secret", "pi_5_secret_x"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::RequiresAction);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn declined_intent_surfaces_processor_message() {
    let h = Harness::with_processor("ALWAYS_DECLINED");
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("payment_intent_client_secret", "pi_6_secret_y")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert_eq!(outcome.result.message.as_deref(), Some("mock decline"));
}

#[tokio::test]
async fn processor_error_becomes_failed_with_its_message() {
    let h = Harness::with_processor("ALWAYS_ERROR");
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("payment_intent_client_secret", "pi_7_secret_z")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert_eq!(outcome.result.message.as_deref(), Some("mock processor unavailable"));
}

#[tokio::test]
async fn no_recognized_parameters_is_failed() {
    let h = Harness::new();
    let orchestrator = ConfirmationOrchestrator::new(h.deps(), h.signed_in().await, Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("orderId", "undefined")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn session_store_outage_is_failed_not_auth_required() {
    let h = Harness::new();
    let orchestrator =
        ConfirmationOrchestrator::new(h.deps(), common::unreachable_session(), Lifecycle::new());

    let outcome = orchestrator
        .confirm_payment(&params(&[("orderId", "ord_1"), ("redirect_status", "succeeded")]))
        .await
        .unwrap();

    assert_eq!(outcome.result.kind, ResultKind::Failed);
    assert!(h.backend.calls().is_empty());
}
