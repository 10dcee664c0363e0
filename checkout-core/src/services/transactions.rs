//! Sale transactions view and completion flow.
//!
//! Loads the payment history for one sale and finishes what checkout left
//! open: PENDING payments get made, INCOMPLETE payments get completed, and
//! COMPLETED payments are read-only.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::Settings;
use crate::dtos::{RecordPaymentRequest, SaleViewResponse};
use crate::error::CheckoutError;
use crate::models::{
    PaymentChoice, PaymentInfo, PaymentMethod, PaymentSession, PaymentStatus, PaymentSummary,
    SessionMetadata,
};
use crate::services::api::SalesApi;
use crate::services::gateway::{CheckoutOutcome, GatewayAdapter, GatewayReadiness};
use crate::services::notices::{Notice, Notifier};
use crate::services::verification::{VerificationClient, VerificationOutcome};
use crate::utils::format_amount;

/// Action the transactions screen offers for one payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    MakePayment,
    CompletePayment,
}

impl TransactionAction {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionAction::MakePayment => "Make Payment",
            TransactionAction::CompletePayment => "Complete Payment",
        }
    }
}

/// Actions available for a payment in the given status.
pub fn actions_for(status: PaymentStatus) -> &'static [TransactionAction] {
    match status {
        PaymentStatus::Pending => &[TransactionAction::MakePayment],
        PaymentStatus::Incomplete => &[TransactionAction::CompletePayment],
        PaymentStatus::Completed => &[],
    }
}

/// One sale's payment history plus the derived summary.
#[derive(Debug, Clone)]
pub struct SaleTransactionsView {
    pub sale_id: String,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub payments: Vec<PaymentInfo>,
    pub summary: PaymentSummary,
}

impl SaleTransactionsView {
    pub fn from_response(response: SaleViewResponse) -> Self {
        let summary = PaymentSummary::derive(
            response.sale.total_amount,
            &response.payment_info,
            response.sale.payment_plan,
            response.sale.total_installments,
        );
        Self {
            sale_id: response.sale.id,
            total_amount: response.sale.total_amount,
            customer_name: response.customer.name,
            customer_email: response.customer.email,
            customer_phone: response.customer.phone_number,
            payments: response.payment_info,
            summary,
        }
    }

    pub fn payment(&self, payment_id: &str) -> Option<&PaymentInfo> {
        self.payments.iter().find(|p| p.id == payment_id)
    }
}

/// Terminal result of one completion attempt.
#[derive(Debug)]
pub enum CompletionOutcome {
    Recorded(CompletionReceipt),
    /// Operator closed the widget.
    Cancelled,
    /// Gateway resolved with a non-success status; no verification was run.
    Declined { status: String },
}

/// What a recorded completion settled on, with the refreshed view.
#[derive(Debug)]
pub struct CompletionReceipt {
    pub sale_id: String,
    pub reference: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub fully_paid: bool,
    pub view: SaleTransactionsView,
}

pub struct TransactionsFlow {
    api: SalesApi,
    gateway: Arc<GatewayAdapter>,
    verifier: VerificationClient,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
}

impl TransactionsFlow {
    pub fn new(
        api: SalesApi,
        gateway: Arc<GatewayAdapter>,
        verifier: VerificationClient,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            api,
            gateway,
            verifier,
            notifier,
            settings,
        }
    }

    pub async fn load(&self, sale_id: &str) -> Result<SaleTransactionsView, CheckoutError> {
        let response = self.api.fetch_sale(sale_id).await?;
        Ok(SaleTransactionsView::from_response(response))
    }

    /// Default amount offered when completing a payment: ten percent of the
    /// sale total with a configured floor, never more than what remains.
    pub fn suggested_completion_amount(&self, view: &SaleTransactionsView) -> Decimal {
        view.summary
            .suggested_completion_amount(self.settings.reconciliation.completion_floor)
    }

    /// Charge a PENDING payment for its recorded amount through the gateway.
    pub async fn make_payment(
        &self,
        view: &SaleTransactionsView,
        payment_id: &str,
    ) -> Result<CompletionOutcome, CheckoutError> {
        let row = view.payment(payment_id).ok_or_else(|| {
            CheckoutError::Validation("Payment not found on this sale".to_string())
        })?;
        if row.status != PaymentStatus::Pending {
            return Err(CheckoutError::Validation(
                "Only pending payments can be made from here".to_string(),
            ));
        }

        let amount = row.amount;
        let reference = row.transaction_ref.clone();
        let status = view.summary.status_after_payment(amount);
        self.run_online(view, reference, amount, status).await
    }

    /// Pay down an INCOMPLETE payment, in cash or through the gateway.
    pub async fn complete_payment(
        &self,
        view: &SaleTransactionsView,
        payment_id: &str,
        choice: PaymentChoice,
    ) -> Result<CompletionOutcome, CheckoutError> {
        let row = view.payment(payment_id).ok_or_else(|| {
            CheckoutError::Validation("Payment not found on this sale".to_string())
        })?;
        if row.status != PaymentStatus::Incomplete {
            return Err(CheckoutError::Validation(
                "Only incomplete payments can be completed".to_string(),
            ));
        }

        choice.validate(Some(view.summary.remaining_balance))?;
        let amount = choice
            .amount
            .unwrap_or_else(|| self.suggested_completion_amount(view));
        let status = view.summary.status_after_payment(amount);

        match choice.method {
            PaymentMethod::Cash => {
                let record = RecordPaymentRequest {
                    sale_id: view.sale_id.clone(),
                    payment_method: PaymentMethod::Cash,
                    amount,
                    status,
                    notes: choice.notes,
                };
                if let Err(e) = self.api.record_payment(&record).await {
                    self.notifier.publish(Notice::error(e.to_string()));
                    return Err(e.into());
                }
                let receipt = self
                    .finish_recorded(view, row.transaction_ref.clone(), amount, status)
                    .await;
                Ok(CompletionOutcome::Recorded(receipt))
            }
            PaymentMethod::Online => {
                // Fresh reference: the original one was consumed by the
                // earlier charge attempt and the gateway rejects reuse.
                let reference = format!("SALE-{}-{}", view.sale_id, Uuid::new_v4());
                self.run_online(view, reference, amount, status).await
            }
        }
    }

    async fn run_online(
        &self,
        view: &SaleTransactionsView,
        reference: String,
        amount: Decimal,
        status: PaymentStatus,
    ) -> Result<CompletionOutcome, CheckoutError> {
        let session = PaymentSession {
            public_key: self.settings.gateway.public_key.clone(),
            email: view.customer_email.clone(),
            amount,
            total_amount: view.total_amount,
            reference: reference.clone(),
            sale_id: view.sale_id.clone(),
            currency: self.settings.gateway.currency.clone(),
            channels: self.settings.gateway.channels.clone(),
            metadata: SessionMetadata {
                sale_id: view.sale_id.clone(),
                customer_name: view.customer_name.clone(),
                phone_number: view.customer_phone.clone(),
            },
        };

        if self.gateway.readiness() != GatewayReadiness::Ready {
            self.gateway.await_ready().await;
        }

        let outcome = match self.gateway.initialize_payment(&session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier.publish(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let callback = match outcome {
            CheckoutOutcome::Cancelled => {
                self.notifier.publish(Notice::info("Payment was cancelled"));
                return Ok(CompletionOutcome::Cancelled);
            }
            CheckoutOutcome::Completed(callback) if !callback.is_success() => {
                tracing::warn!(
                    reference = %callback.reference,
                    status = %callback.status,
                    "Gateway returned a non-success status"
                );
                self.notifier
                    .publish(Notice::error("Payment was not successful. Please try again"));
                return Ok(CompletionOutcome::Declined {
                    status: callback.status,
                });
            }
            CheckoutOutcome::Completed(callback) => callback,
        };

        if let VerificationOutcome::Failed { reason } =
            self.verifier.verify(&callback.reference).await
        {
            let gap = CheckoutError::VerificationGap {
                reference: callback.reference.clone(),
                source: reason,
            };
            self.notifier.publish(Notice::warning(gap.to_string()));
            return Err(gap);
        }

        let record = RecordPaymentRequest {
            sale_id: view.sale_id.clone(),
            payment_method: PaymentMethod::Online,
            amount,
            status,
            notes: None,
        };
        if let Err(e) = self.api.record_payment(&record).await {
            let gap = CheckoutError::RecordingGap {
                reference: callback.reference.clone(),
                source: e,
            };
            self.notifier.publish(Notice::warning(gap.to_string()));
            return Err(gap);
        }

        let receipt = self
            .finish_recorded(view, callback.reference, amount, status)
            .await;
        Ok(CompletionOutcome::Recorded(receipt))
    }

    async fn finish_recorded(
        &self,
        view: &SaleTransactionsView,
        reference: String,
        amount: Decimal,
        status: PaymentStatus,
    ) -> CompletionReceipt {
        if status == PaymentStatus::Completed {
            self.notifier.publish(Notice::success("Sale fully paid"));
        } else {
            let outstanding = (view.summary.remaining_balance - amount).max(Decimal::ZERO);
            self.notifier.publish(Notice::success(format!(
                "Payment recorded. Outstanding balance: {}",
                format_amount(outstanding)
            )));
        }

        tracing::info!(
            sale_id = %view.sale_id,
            reference = %reference,
            amount = %amount,
            status = %status,
            "Completion recorded"
        );

        let refreshed = match self.verifier.await_reflected(&view.sale_id, &reference).await {
            Ok(reflected) => {
                if !reflected.reflected {
                    self.notifier.publish(Notice::warning(
                        "Payment record is still settling. Refresh the sale shortly",
                    ));
                }
                SaleTransactionsView::from_response(reflected.view)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Consistency poll failed");
                view.clone()
            }
        };

        CompletionReceipt {
            sale_id: view.sale_id.clone(),
            reference,
            amount,
            status,
            fully_paid: status == PaymentStatus::Completed,
            view: refreshed,
        }
    }
}
