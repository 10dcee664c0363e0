//! Sale summary and checkout flow.
//!
//! Drives a composed draft through review, the CASH or ONLINE branch, and
//! server reconciliation. The backend total always supersedes the client
//! estimate, and every error leaves the operator where they can retry.

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::config::Settings;
use crate::dtos::{CreateSaleRequest, RecordPaymentRequest};
use crate::error::CheckoutError;
use crate::models::{
    settlement_status, PaymentChoice, PaymentMethod, PaymentSession, PaymentStatus, SaleDraft,
    SessionMetadata,
};
use crate::services::api::SalesApi;
use crate::services::gateway::{CheckoutOutcome, GatewayAdapter, GatewayReadiness};
use crate::services::notices::{Notice, Notifier};
use crate::services::store::SaleDraftStore;
use crate::services::verification::{VerificationClient, VerificationOutcome};
use crate::utils::format_amount;

/// Where the checkout stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Composing,
    ConfirmingReview,
    CashPending,
    GatewayPending,
    Reconciled,
}

/// Outcome of confirming the review.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// Cash reconciled in one step.
    Reconciled(CheckoutReceipt),
    /// Online: the sale exists and a session is minted; the operator still
    /// has to launch the widget.
    AwaitingGateway {
        sale_id: String,
        reference: String,
        amount: Decimal,
    },
}

/// Terminal result of one widget launch.
#[derive(Debug)]
pub enum LaunchResult {
    Reconciled(CheckoutReceipt),
    /// Operator closed the widget; the session is kept for retry.
    Cancelled,
    /// Gateway resolved with a non-success status; no verification was run.
    Declined { status: String },
}

/// What a reconciled checkout settled on.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub sale_id: String,
    pub reference: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

pub struct CheckoutFlow {
    store: SaleDraftStore,
    api: SalesApi,
    gateway: Arc<GatewayAdapter>,
    verifier: VerificationClient,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    stage: Mutex<CheckoutStage>,
}

impl CheckoutFlow {
    pub fn new(
        store: SaleDraftStore,
        api: SalesApi,
        gateway: Arc<GatewayAdapter>,
        verifier: VerificationClient,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            api,
            gateway,
            verifier,
            notifier,
            settings,
            stage: Mutex::new(CheckoutStage::Composing),
        }
    }

    /// Called when the compose screen opens; clears any stale draft.
    pub fn begin(&self) {
        self.store.purge();
        self.set_stage(CheckoutStage::Composing);
    }

    pub fn stage(&self) -> CheckoutStage {
        *self.stage.lock().unwrap()
    }

    /// Move from composing to the review screen. `form_complete` is the
    /// screen's own completeness check over the draft.
    pub fn proceed_to_review<F>(&self, form_complete: F) -> Result<(), CheckoutError>
    where
        F: Fn(&SaleDraft) -> bool,
    {
        let draft = self.store.snapshot();
        if !form_complete(&draft) {
            return Err(CheckoutError::Validation(
                "Fill in all required fields before proceeding".to_string(),
            ));
        }
        self.set_stage(CheckoutStage::ConfirmingReview);
        Ok(())
    }

    /// Back to the form without losing the draft.
    pub fn back_to_form(&self) {
        self.set_stage(CheckoutStage::Composing);
    }

    /// Confirm the review with a payment choice and run the matching branch.
    pub async fn confirm(&self, choice: PaymentChoice) -> Result<ConfirmOutcome, CheckoutError> {
        choice.validate(None)?;
        self.store.set_payment_method(choice.method);

        match choice.method {
            PaymentMethod::Cash => self
                .confirm_cash(choice)
                .await
                .map(ConfirmOutcome::Reconciled),
            PaymentMethod::Online => self.confirm_online().await,
        }
    }

    /// Edit the charge amount before launching the widget.
    pub fn set_payment_amount(&self, amount: Decimal) -> Result<(), CheckoutError> {
        if amount <= Decimal::ZERO {
            return Err(CheckoutError::Validation(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        self.store.set_payment_amount(amount)
    }

    /// Launch the hosted widget for the minted session and reconcile the
    /// result.
    pub async fn launch_payment(&self) -> Result<LaunchResult, CheckoutError> {
        let session = self.store.payment_session().ok_or_else(|| {
            CheckoutError::Validation("No payment session. Confirm the sale first".to_string())
        })?;

        self.set_stage(CheckoutStage::GatewayPending);

        if self.gateway.readiness() != GatewayReadiness::Ready {
            self.gateway.await_ready().await;
        }

        let outcome = match self.gateway.initialize_payment(&session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.set_stage(CheckoutStage::ConfirmingReview);
                self.notifier.publish(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        match outcome {
            CheckoutOutcome::Cancelled => {
                self.set_stage(CheckoutStage::ConfirmingReview);
                self.notifier.publish(Notice::info("Payment was cancelled"));
                Ok(LaunchResult::Cancelled)
            }
            CheckoutOutcome::Completed(callback) if !callback.is_success() => {
                tracing::warn!(
                    reference = %callback.reference,
                    status = %callback.status,
                    "Gateway returned a non-success status"
                );
                self.set_stage(CheckoutStage::ConfirmingReview);
                self.notifier
                    .publish(Notice::error("Payment was not successful. Please try again"));
                Ok(LaunchResult::Declined {
                    status: callback.status,
                })
            }
            CheckoutOutcome::Completed(callback) => self
                .reconcile_online(&session, &callback.reference)
                .await
                .map(LaunchResult::Reconciled),
        }
    }

    /// Handle a gateway redirect return carrying txref/transactionid query
    /// parameters instead of the inline callback.
    pub async fn handle_redirect_return(
        &self,
        reference: &str,
        transaction_id: &str,
    ) -> Result<(), CheckoutError> {
        match self.verifier.verify_redirect(reference, transaction_id).await {
            VerificationOutcome::Verified { payment_status, .. } => {
                let notice = match payment_status {
                    Some(PaymentStatus::Completed) => {
                        Notice::success("Payment verified successfully")
                    }
                    Some(PaymentStatus::Incomplete) => {
                        Notice::warning("Partial payment verified. Balance remains on this sale")
                    }
                    Some(PaymentStatus::Pending) | None => {
                        Notice::info("Payment is processing. The record will update shortly")
                    }
                };
                self.notifier.publish(notice);
                Ok(())
            }
            VerificationOutcome::Failed { reason } => {
                let gap = CheckoutError::VerificationGap {
                    reference: reference.to_string(),
                    source: reason,
                };
                self.notifier.publish(Notice::warning(gap.to_string()));
                Err(gap)
            }
        }
    }

    async fn confirm_cash(&self, choice: PaymentChoice) -> Result<CheckoutReceipt, CheckoutError> {
        let draft = self.store.snapshot();
        let request = CreateSaleRequest::from_draft(&draft)?;

        self.set_stage(CheckoutStage::CashPending);

        let created = match self.api.create_sale(&request).await {
            Ok(created) => created,
            Err(e) => {
                self.set_stage(CheckoutStage::ConfirmingReview);
                self.notifier.publish(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let total = created.payment_data.amount;
        let amount = choice.amount.unwrap_or(total);
        let status = settlement_status(amount, total, draft.has_installment_plan());

        tracing::info!(
            sale_id = %created.sale.id,
            amount = %amount,
            total = %total,
            status = %status,
            "Recording cash payment"
        );

        let record = RecordPaymentRequest {
            sale_id: created.sale.id.clone(),
            payment_method: PaymentMethod::Cash,
            amount,
            status,
            notes: choice.notes,
        };

        if let Err(e) = self.api.record_payment(&record).await {
            self.set_stage(CheckoutStage::ConfirmingReview);
            self.notifier.publish(Notice::error(e.to_string()));
            return Err(e.into());
        }

        let receipt = CheckoutReceipt {
            sale_id: created.sale.id,
            reference: created.payment_data.transaction_ref,
            amount,
            status,
        };
        self.finish(&receipt, total);
        Ok(receipt)
    }

    async fn confirm_online(&self) -> Result<ConfirmOutcome, CheckoutError> {
        if let Some(session) = self.store.payment_session() {
            // A sale already exists for this draft; keep its session instead
            // of creating a duplicate.
            self.set_stage(CheckoutStage::GatewayPending);
            return Ok(ConfirmOutcome::AwaitingGateway {
                sale_id: session.sale_id,
                reference: session.reference,
                amount: session.amount,
            });
        }

        let draft = self.store.snapshot();
        let request = CreateSaleRequest::from_draft(&draft)?;

        let created = match self.api.create_sale(&request).await {
            Ok(created) => created,
            Err(e) => {
                self.notifier.publish(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let session = PaymentSession {
            public_key: self.settings.gateway.public_key.clone(),
            email: request.customer.email.clone(),
            amount: created.payment_data.amount,
            total_amount: created.payment_data.amount,
            reference: created.payment_data.transaction_ref.clone(),
            sale_id: created.sale.id.clone(),
            currency: self.settings.gateway.currency.clone(),
            channels: self.settings.gateway.channels.clone(),
            metadata: SessionMetadata {
                sale_id: created.sale.id.clone(),
                customer_name: request.customer.name.clone(),
                phone_number: Some(request.customer.phone_number.clone()),
            },
        };

        tracing::info!(
            sale_id = %session.sale_id,
            reference = %session.reference,
            amount = %session.amount,
            "Payment session minted"
        );
        self.store.set_payment_session(session.clone());
        self.set_stage(CheckoutStage::GatewayPending);

        Ok(ConfirmOutcome::AwaitingGateway {
            sale_id: session.sale_id,
            reference: session.reference,
            amount: session.amount,
        })
    }

    /// Gateway succeeded: verify, record, purge. Failures past this point
    /// are reconciliation gaps; the draft is kept and the reference quoted.
    async fn reconcile_online(
        &self,
        session: &PaymentSession,
        reference: &str,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let payment_status = match self.verifier.verify(reference).await {
            VerificationOutcome::Verified { payment_status, .. } => payment_status,
            VerificationOutcome::Failed { reason } => {
                let gap = CheckoutError::VerificationGap {
                    reference: reference.to_string(),
                    source: reason,
                };
                self.notifier.publish(Notice::warning(gap.to_string()));
                return Err(gap);
            }
        };

        self.notify_verified(payment_status, session);

        let draft = self.store.snapshot();
        let status = settlement_status(
            session.amount,
            session.total_amount,
            draft.has_installment_plan(),
        );
        let record = RecordPaymentRequest {
            sale_id: session.sale_id.clone(),
            payment_method: PaymentMethod::Online,
            amount: session.amount,
            status,
            notes: None,
        };

        if let Err(e) = self.api.record_payment(&record).await {
            let gap = CheckoutError::RecordingGap {
                reference: reference.to_string(),
                source: e,
            };
            self.notifier.publish(Notice::warning(gap.to_string()));
            return Err(gap);
        }

        let receipt = CheckoutReceipt {
            sale_id: session.sale_id.clone(),
            reference: reference.to_string(),
            amount: session.amount,
            status,
        };
        self.finish(&receipt, session.total_amount);

        match self.verifier.await_reflected(&receipt.sale_id, reference).await {
            Ok(reflected) if !reflected.reflected => {
                self.notifier.publish(Notice::warning(
                    "Payment record is still settling. Refresh the sale shortly",
                ));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Consistency poll failed"),
        }

        Ok(receipt)
    }

    fn notify_verified(&self, payment_status: Option<PaymentStatus>, session: &PaymentSession) {
        match payment_status {
            Some(PaymentStatus::Completed) => self
                .notifier
                .publish(Notice::success("Payment verified successfully")),
            Some(PaymentStatus::Incomplete) => {
                let outstanding = (session.total_amount - session.amount).max(Decimal::ZERO);
                self.notifier.publish(Notice::warning(format!(
                    "Partial payment verified. Outstanding balance: {}",
                    format_amount(outstanding)
                )));
            }
            Some(PaymentStatus::Pending) | None => self
                .notifier
                .publish(Notice::info("Payment is processing. The record will update shortly")),
        }
    }

    fn finish(&self, receipt: &CheckoutReceipt, total: Decimal) {
        match receipt.status {
            PaymentStatus::Completed => self
                .notifier
                .publish(Notice::success("Payment recorded successfully")),
            _ => {
                let outstanding = (total - receipt.amount).max(Decimal::ZERO);
                self.notifier.publish(Notice::success(format!(
                    "Payment recorded. Outstanding balance: {}",
                    format_amount(outstanding)
                )));
            }
        }

        self.store.purge();
        self.set_stage(CheckoutStage::Reconciled);
        tracing::info!(
            sale_id = %receipt.sale_id,
            reference = %receipt.reference,
            status = %receipt.status,
            "Sale reconciled"
        );
    }

    fn set_stage(&self, next: CheckoutStage) {
        let mut guard = self.stage.lock().unwrap();
        if *guard != next {
            tracing::debug!(from = ?*guard, to = ?next, "Checkout stage changed");
        }
        *guard = next;
    }
}
