//! Payment verification against the backend.
//!
//! A gateway callback is provisional until the backend has confirmed the
//! charge. `verify` folds every possible response into one outcome, and the
//! consistency poll replaces a blind settle delay with a bounded re-fetch of
//! the sale view.

use rust_decimal::Decimal;
use tokio::time::sleep;

use crate::config::ReconciliationSettings;
use crate::dtos::{SaleViewResponse, VerifyCallbackResponse};
use crate::error::{ApiError, VerificationError};
use crate::models::PaymentStatus;
use crate::services::api::SalesApi;

/// Result of asking the backend whether a gateway charge went through.
#[derive(Debug)]
pub enum VerificationOutcome {
    /// The backend accepted the charge: "success", or the provisional
    /// "processing" while settlement is in flight. `payment_status` drives
    /// messaging when present.
    Verified {
        payment_status: Option<PaymentStatus>,
        amount: Option<Decimal>,
    },
    /// The charge could not be confirmed.
    Failed { reason: VerificationError },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

/// Sale view returned by the consistency poll.
#[derive(Debug, Clone)]
pub struct ReflectedView {
    pub view: SaleViewResponse,
    /// Whether the payment record reached a post-verification status within
    /// the poll budget.
    pub reflected: bool,
}

#[derive(Clone)]
pub struct VerificationClient {
    api: SalesApi,
    settings: ReconciliationSettings,
}

impl VerificationClient {
    pub fn new(api: SalesApi, settings: ReconciliationSettings) -> Self {
        Self { api, settings }
    }

    /// Verify a charge by transaction reference.
    pub async fn verify(&self, reference: &str) -> VerificationOutcome {
        tracing::info!(reference = %reference, "Verifying payment");
        match self.api.verify_payment(reference).await {
            Ok(body) => Self::interpret(reference, body),
            Err(e) => {
                tracing::error!(reference = %reference, error = %e, "Payment verification request failed");
                VerificationOutcome::Failed {
                    reason: VerificationError::Api(e),
                }
            }
        }
    }

    /// Verify a charge reported through the gateway's redirect return.
    pub async fn verify_redirect(
        &self,
        reference: &str,
        transaction_id: &str,
    ) -> VerificationOutcome {
        tracing::info!(reference = %reference, transaction_id = %transaction_id, "Verifying redirect return");
        match self.api.verify_redirect(reference, transaction_id).await {
            Ok(body) => Self::interpret(reference, body),
            Err(e) => {
                tracing::error!(reference = %reference, error = %e, "Redirect verification request failed");
                VerificationOutcome::Failed {
                    reason: VerificationError::Api(e),
                }
            }
        }
    }

    fn interpret(reference: &str, body: VerifyCallbackResponse) -> VerificationOutcome {
        let data = body.data;
        match data.status.as_str() {
            "success" | "processing" => {
                tracing::info!(
                    reference = %reference,
                    status = %data.status,
                    payment_status = ?data.payment_status,
                    "Payment verified"
                );
                VerificationOutcome::Verified {
                    payment_status: data.payment_status,
                    amount: data.amount,
                }
            }
            other => {
                tracing::warn!(reference = %reference, status = %other, "Payment verification rejected");
                VerificationOutcome::Failed {
                    reason: VerificationError::Rejected {
                        status: other.to_string(),
                    },
                }
            }
        }
    }

    /// Poll the sale view until the record for `reference` reflects a
    /// post-verification status. Bounded; exhaustion returns the latest view
    /// flagged as unreflected rather than failing the flow.
    pub async fn await_reflected(
        &self,
        sale_id: &str,
        reference: &str,
    ) -> Result<ReflectedView, ApiError> {
        let mut last = self.api.fetch_sale(sale_id).await?;
        if Self::is_reflected(&last, reference) {
            return Ok(ReflectedView {
                view: last,
                reflected: true,
            });
        }

        for attempt in 1..self.settings.poll_max_attempts {
            sleep(self.settings.poll_interval()).await;

            last = self.api.fetch_sale(sale_id).await?;
            if Self::is_reflected(&last, reference) {
                tracing::debug!(attempt, reference = %reference, "Payment record reflected");
                return Ok(ReflectedView {
                    view: last,
                    reflected: true,
                });
            }
        }

        tracing::warn!(
            reference = %reference,
            attempts = self.settings.poll_max_attempts,
            "Payment record still pending after poll budget"
        );
        Ok(ReflectedView {
            view: last,
            reflected: false,
        })
    }

    fn is_reflected(view: &SaleViewResponse, reference: &str) -> bool {
        view.payment_info
            .iter()
            .any(|p| p.transaction_ref == reference && p.status != PaymentStatus::Pending)
    }
}
