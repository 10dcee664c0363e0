mod common;

use common::{dec, payment_row, sale_view_body, TestCheckout};

use checkout_core::dtos::SaleViewResponse;
use checkout_core::models::{PaymentChoice, PaymentMethod, PaymentStatus};
use checkout_core::services::{CompletionOutcome, SaleTransactionsView};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn view_from(body: Value) -> SaleTransactionsView {
    let response: SaleViewResponse =
        serde_json::from_value(body).expect("Failed to decode the sale view fixture");
    SaleTransactionsView::from_response(response)
}

/// Sale of 500,000 with 200,000 settled and one incomplete payment row.
fn settled_and_incomplete() -> SaleTransactionsView {
    view_from(sale_view_body(
        "sale-7",
        "500000",
        "ONE_OFF",
        None,
        &[
            payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
            payment_row("pay-2", "TX-2", "300000", "INCOMPLETE"),
        ],
    ))
}

/// Sale of 500,000 with 200,000 settled and the balance still pending.
fn settled_and_pending() -> SaleTransactionsView {
    view_from(sale_view_body(
        "sale-7",
        "500000",
        "ONE_OFF",
        None,
        &[
            payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
            payment_row("pay-2", "TX-2", "300000", "PENDING"),
        ],
    ))
}

async fn mount_verify_success(server: &MockServer, payment_status: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/payment/verify/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": "success", "paymentStatus": payment_status }
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_record_ok(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/v1/sales/record-cash-payment"))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment recorded"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_refreshed_view(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/sales/single/sale-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn expect_no_calls(server: &MockServer, http_method: &str, endpoint: &str) {
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn loading_a_sale_derives_its_summary() {
    let rig = TestCheckout::spawn().await;
    Mock::given(method("GET"))
        .and(path("/v1/sales/single/sale-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sale_view_body(
            "sale-7",
            "500000",
            "INSTALLMENT",
            Some(4),
            &[
                payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
                payment_row("pay-2", "TX-2", "100000", "INCOMPLETE"),
                payment_row("pay-3", "TX-3", "200000", "PENDING"),
            ],
        )))
        .mount(&rig.server)
        .await;

    let view = rig.engine.transactions.load("sale-7").await.unwrap();

    assert_eq!(view.sale_id, "sale-7");
    assert_eq!(view.customer_name, "Ada Obi");
    assert_eq!(view.payments.len(), 3);
    assert_eq!(view.summary.total_paid, dec("200000"));
    assert_eq!(view.summary.remaining_balance, dec("300000"));
    assert_eq!(view.summary.payments_made, 1);
    assert!(view.summary.is_installment);
    assert_eq!(view.summary.total_installments, 4);
}

#[tokio::test]
async fn make_payment_charges_the_pending_row_for_its_recorded_amount() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_pending();

    rig.widget.push_success("TX-2");
    mount_verify_success(&rig.server, "COMPLETED").await;
    mount_record_ok(
        &rig.server,
        json!({
            "saleId": "sale-7",
            "paymentMethod": "ONLINE",
            "amount": "300000",
            "status": "COMPLETED"
        }),
    )
    .await;
    mount_refreshed_view(
        &rig.server,
        sale_view_body(
            "sale-7",
            "500000",
            "ONE_OFF",
            None,
            &[
                payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
                payment_row("pay-2", "TX-2", "300000", "COMPLETED"),
            ],
        ),
    )
    .await;

    let outcome = rig
        .engine
        .transactions
        .make_payment(&view, "pay-2")
        .await
        .unwrap();
    let receipt = match outcome {
        CompletionOutcome::Recorded(receipt) => receipt,
        other => panic!("expected a recorded completion, got {:?}", other),
    };

    assert_eq!(receipt.reference, "TX-2");
    assert_eq!(receipt.amount, dec("300000"));
    assert_eq!(receipt.status, PaymentStatus::Completed);
    assert!(receipt.fully_paid);
    assert!(receipt.view.summary.is_fully_paid());
    assert_eq!(rig.widget.opened()[0].amount, 30_000_000);
    assert!(rig.notifier.contains("Sale fully paid"));
}

#[tokio::test]
async fn make_payment_rejects_rows_that_are_not_pending() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    let err = rig
        .engine
        .transactions
        .make_payment(&view, "pay-1")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Only pending payments can be made from here"
    );
    assert_eq!(rig.widget.open_count(), 0);
}

#[tokio::test]
async fn making_an_unknown_payment_is_a_validation_error() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_pending();

    let err = rig
        .engine
        .transactions
        .make_payment(&view, "pay-99")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Payment not found on this sale");
}

#[tokio::test]
async fn completion_over_the_remaining_balance_is_rejected_before_any_call() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();
    expect_no_calls(&rig.server, "POST", "/v1/sales/record-cash-payment").await;
    expect_no_calls(&rig.server, "GET", "/v1/sales/single/sale-7").await;

    let err = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::cash(Some(dec("300001"))))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Payment amount cannot exceed the remaining balance of 300000"
    );
    assert_eq!(rig.widget.open_count(), 0);
}

#[tokio::test]
async fn completing_a_row_that_is_not_incomplete_is_rejected() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_pending();

    let err = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::cash(None))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Only incomplete payments can be completed");
}

#[tokio::test]
async fn cash_completion_that_clears_the_balance_is_fully_paid() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    mount_record_ok(
        &rig.server,
        json!({
            "saleId": "sale-7",
            "paymentMethod": "CASH",
            "amount": "300000",
            "status": "COMPLETED"
        }),
    )
    .await;
    mount_refreshed_view(
        &rig.server,
        sale_view_body(
            "sale-7",
            "500000",
            "ONE_OFF",
            None,
            &[
                payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
                payment_row("pay-2", "TX-2", "300000", "COMPLETED"),
            ],
        ),
    )
    .await;

    let outcome = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::cash(Some(dec("300000"))))
        .await
        .unwrap();
    let receipt = match outcome {
        CompletionOutcome::Recorded(receipt) => receipt,
        other => panic!("expected a recorded completion, got {:?}", other),
    };

    assert_eq!(receipt.reference, "TX-2");
    assert!(receipt.fully_paid);
    assert_eq!(rig.widget.open_count(), 0);
    assert!(rig.notifier.contains("Sale fully paid"));
}

#[tokio::test]
async fn partial_cash_completion_stays_incomplete() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    mount_record_ok(
        &rig.server,
        json!({ "amount": "100000", "status": "INCOMPLETE" }),
    )
    .await;
    mount_refreshed_view(
        &rig.server,
        sale_view_body(
            "sale-7",
            "500000",
            "ONE_OFF",
            None,
            &[
                payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
                payment_row("pay-2", "TX-2", "100000", "INCOMPLETE"),
            ],
        ),
    )
    .await;

    let outcome = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::cash(Some(dec("100000"))))
        .await
        .unwrap();
    let receipt = match outcome {
        CompletionOutcome::Recorded(receipt) => receipt,
        other => panic!("expected a recorded completion, got {:?}", other),
    };

    assert!(!receipt.fully_paid);
    assert_eq!(receipt.status, PaymentStatus::Incomplete);
    assert!(rig
        .notifier
        .contains("Payment recorded. Outstanding balance: 200,000"));
}

#[tokio::test]
async fn online_completion_mints_a_fresh_reference() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    rig.widget.push_success("SALE-echoed");
    mount_verify_success(&rig.server, "INCOMPLETE").await;
    mount_record_ok(
        &rig.server,
        json!({
            "paymentMethod": "ONLINE",
            "amount": "50000",
            "status": "INCOMPLETE"
        }),
    )
    .await;
    mount_refreshed_view(
        &rig.server,
        sale_view_body(
            "sale-7",
            "500000",
            "ONE_OFF",
            None,
            &[
                payment_row("pay-1", "TX-1", "200000", "COMPLETED"),
                payment_row("pay-2", "TX-2", "300000", "INCOMPLETE"),
                payment_row("pay-3", "SALE-echoed", "50000", "INCOMPLETE"),
            ],
        ),
    )
    .await;

    // No explicit amount: the suggestion (ten percent of 500,000) applies.
    let outcome = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::online())
        .await
        .unwrap();
    let receipt = match outcome {
        CompletionOutcome::Recorded(receipt) => receipt,
        other => panic!("expected a recorded completion, got {:?}", other),
    };

    let opened = rig.widget.opened();
    assert!(opened[0].reference.starts_with("SALE-sale-7-"));
    assert_ne!(opened[0].reference, "TX-2");
    assert_eq!(opened[0].amount, 5_000_000);
    assert_eq!(receipt.amount, dec("50000"));
    assert_eq!(receipt.status, PaymentStatus::Incomplete);
}

#[tokio::test]
async fn cancelled_completion_leaves_the_sale_untouched() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    rig.widget.push_cancelled();
    expect_no_calls(&rig.server, "GET", "/v1/payment/verify/callback").await;
    expect_no_calls(&rig.server, "POST", "/v1/sales/record-cash-payment").await;

    let outcome = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::online())
        .await
        .unwrap();

    assert!(matches!(outcome, CompletionOutcome::Cancelled));
    assert!(rig.notifier.contains("Payment was cancelled"));
}

#[tokio::test]
async fn declined_completion_is_not_verified() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_pending();

    rig.widget.push_declined("TX-2", "failed");
    expect_no_calls(&rig.server, "GET", "/v1/payment/verify/callback").await;
    expect_no_calls(&rig.server, "POST", "/v1/sales/record-cash-payment").await;

    let outcome = rig
        .engine
        .transactions
        .make_payment(&view, "pay-2")
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::Declined { status } => assert_eq!(status, "failed"),
        other => panic!("expected a declined completion, got {:?}", other),
    }
    assert!(rig
        .notifier
        .contains("Payment was not successful. Please try again"));
}

#[tokio::test]
async fn verification_gap_during_completion_quotes_the_reference() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_pending();

    rig.widget.push_success("TX-2");
    Mock::given(method("GET"))
        .and(path("/v1/payment/verify/callback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": "failed" }
        })))
        .expect(1)
        .mount(&rig.server)
        .await;
    expect_no_calls(&rig.server, "POST", "/v1/sales/record-cash-payment").await;

    let err = rig
        .engine
        .transactions
        .make_payment(&view, "pay-2")
        .await
        .unwrap_err();

    assert!(err.is_reconciliation_gap());
    assert_eq!(err.gap_reference(), Some("TX-2"));
    assert!(rig.notifier.contains("contact support with reference: TX-2"));
}

#[tokio::test]
async fn suggested_amounts_follow_the_ten_percent_rule() {
    let rig = TestCheckout::spawn().await;

    let wide_open = settled_and_incomplete();
    assert_eq!(
        rig.engine.transactions.suggested_completion_amount(&wide_open),
        dec("50000")
    );

    let small_sale = view_from(sale_view_body(
        "sale-8",
        "5000",
        "ONE_OFF",
        None,
        &[payment_row("pay-1", "TX-1", "5000", "INCOMPLETE")],
    ));
    assert_eq!(
        rig.engine.transactions.suggested_completion_amount(&small_sale),
        dec("1000")
    );

    let nearly_settled = view_from(sale_view_body(
        "sale-9",
        "500000",
        "ONE_OFF",
        None,
        &[
            payment_row("pay-1", "TX-1", "499200", "COMPLETED"),
            payment_row("pay-2", "TX-2", "800", "INCOMPLETE"),
        ],
    ));
    assert_eq!(
        rig.engine
            .transactions
            .suggested_completion_amount(&nearly_settled),
        dec("800")
    );
}

#[tokio::test]
async fn cash_completion_failure_surfaces_the_backend_message() {
    let rig = TestCheckout::spawn().await;
    let view = settled_and_incomplete();

    Mock::given(method("POST"))
        .and(path("/v1/sales/record-cash-payment"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "Database unavailable"
        })))
        .mount(&rig.server)
        .await;

    let err = rig
        .engine
        .transactions
        .complete_payment(&view, "pay-2", PaymentChoice::cash(Some(dec("100000"))))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Database unavailable");
    assert!(rig.notifier.contains("Database unavailable"));
}

#[test]
fn choice_methods_carry_their_wire_names() {
    assert_eq!(PaymentChoice::cash(None).method, PaymentMethod::Cash);
    assert_eq!(PaymentChoice::online().method, PaymentMethod::Online);
    assert_eq!(PaymentMethod::Online.as_str(), "ONLINE");
}
