//! Smoke tests for the workflow harness wiring.

mod common;

use checkout_core::models::PaymentChoice;
use checkout_core::services::{CheckoutStage, GatewayReadiness};

#[tokio::test]
async fn harness_spawns_a_composing_engine() {
    let rig = common::setup().await;

    assert_eq!(rig.engine.checkout.stage(), CheckoutStage::Composing);
    assert_eq!(rig.engine.gateway.readiness(), GatewayReadiness::NotReady);

    let readiness = rig.engine.gateway.await_ready().await;
    assert_eq!(readiness, GatewayReadiness::Ready);
}

#[tokio::test]
async fn confirming_an_empty_draft_never_reaches_the_backend() {
    let rig = common::setup().await;
    rig.engine.checkout.begin();

    let err = rig
        .engine
        .checkout
        .confirm(PaymentChoice::cash(None))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Customer details are required");
    assert_eq!(rig.engine.checkout.stage(), CheckoutStage::Composing);
    assert_eq!(rig.backend.sale_count(), 0);
}
