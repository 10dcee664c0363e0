//! Derived payment summary and settlement math.
//!
//! Everything here is a pure recomputation from server-provided inputs. The
//! backend stays the source of truth for money; these helpers only decide
//! what to display and which status to request next.

use rust_decimal::Decimal;

use super::draft::PaymentPlan;
use super::payment::{PaymentInfo, PaymentStatus};

/// Where a sale stands against its total, recomputed on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSummary {
    pub total_amount: Decimal,
    /// Sum of COMPLETED payment records.
    pub total_paid: Decimal,
    /// Never negative.
    pub remaining_balance: Decimal,
    /// Percentage of the total already paid, 0 when the total is 0.
    pub payment_progress: Decimal,
    pub is_installment: bool,
    pub total_installments: u32,
    /// Count of COMPLETED payment records.
    pub payments_made: u32,
}

impl PaymentSummary {
    /// Derive the summary from the sale total and its payment records.
    pub fn derive(
        total_amount: Decimal,
        payments: &[PaymentInfo],
        plan: PaymentPlan,
        total_installments: Option<u32>,
    ) -> Self {
        let completed = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed);
        let total_paid: Decimal = completed.clone().map(|p| p.amount).sum();
        let payments_made = completed.count() as u32;

        let remaining_balance = (total_amount - total_paid).max(Decimal::ZERO);
        let payment_progress = if total_amount.is_zero() {
            Decimal::ZERO
        } else {
            (total_paid * Decimal::ONE_HUNDRED / total_amount).round_dp(1)
        };

        Self {
            total_amount,
            total_paid,
            remaining_balance,
            payment_progress,
            is_installment: plan == PaymentPlan::Installment,
            total_installments: total_installments.unwrap_or(0),
            payments_made,
        }
    }

    /// Whether the sale is already settled.
    pub fn is_fully_paid(&self) -> bool {
        if self.is_installment && self.total_installments > 0 {
            self.payments_made >= self.total_installments
        } else {
            self.remaining_balance <= Decimal::ZERO
        }
    }

    /// Whether one more payment of `amount` settles the sale: on an
    /// installment plan the count reaches the plan length, otherwise the
    /// amount clears the remaining balance.
    pub fn fully_paid_after(&self, amount: Decimal) -> bool {
        if self.is_installment && self.total_installments > 0 {
            self.payments_made + 1 >= self.total_installments
        } else {
            self.remaining_balance - amount <= Decimal::ZERO
        }
    }

    /// Status to request when recording one more payment of `amount`.
    pub fn status_after_payment(&self, amount: Decimal) -> PaymentStatus {
        if self.fully_paid_after(amount) {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Incomplete
        }
    }

    /// Prefill for the completion form: min(remaining balance,
    /// max(10% of the total, `floor`)).
    pub fn suggested_completion_amount(&self, floor: Decimal) -> Decimal {
        let ten_percent = self.total_amount / Decimal::TEN;
        ten_percent.max(floor).min(self.remaining_balance)
    }
}

/// Status for the first payment recorded at checkout. Installment plans and
/// partial amounts leave the sale INCOMPLETE; a one-off payment of the full
/// total settles it outright.
pub fn settlement_status(amount: Decimal, total: Decimal, is_installment: bool) -> PaymentStatus {
    if is_installment || amount < total {
        PaymentStatus::Incomplete
    } else {
        PaymentStatus::Completed
    }
}
