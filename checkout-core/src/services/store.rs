//! Shared store for the one active sale draft.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::error::CheckoutError;
use crate::models::{
    Customer, MiscellaneousCost, PaymentMethod, PaymentSession, ProductLine, ProductParameters,
    Recipient, SaleDraft,
};

/// Handle to the draft. Clones share the same state; mutation happens
/// through the methods, never by holding the lock across an await.
#[derive(Clone, Default)]
pub struct SaleDraftStore {
    inner: Arc<RwLock<SaleDraft>>,
}

impl SaleDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the empty draft. Runs when the compose screen opens and
    /// after every reconciled payment.
    pub fn purge(&self) {
        *self.inner.write().unwrap() = SaleDraft::default();
        tracing::debug!("Sale draft purged");
    }

    /// Cloned view for review rendering.
    pub fn snapshot(&self) -> SaleDraft {
        self.inner.read().unwrap().clone()
    }

    pub fn set_category(&self, category: impl Into<String>) {
        self.inner.write().unwrap().category = Some(category.into());
    }

    pub fn set_customer(&self, customer: Customer) {
        self.inner.write().unwrap().customer = Some(customer);
    }

    pub fn add_product(&self, product: ProductLine) {
        self.inner.write().unwrap().products.push(product);
    }

    /// Replace the parameters of a product line. Returns false when the
    /// product is not in the draft.
    pub fn update_parameters(&self, product_id: &str, parameters: ProductParameters) -> bool {
        let mut draft = self.inner.write().unwrap();
        match draft
            .products
            .iter_mut()
            .find(|p| p.product_id == product_id)
        {
            Some(line) => {
                line.parameters = parameters;
                true
            }
            None => false,
        }
    }

    pub fn set_recipient(&self, product_id: &str, recipient: Recipient) -> bool {
        let mut draft = self.inner.write().unwrap();
        match draft
            .products
            .iter_mut()
            .find(|p| p.product_id == product_id)
        {
            Some(line) => {
                line.recipient = Some(recipient);
                true
            }
            None => false,
        }
    }

    pub fn add_miscellaneous(&self, product_id: &str, cost: MiscellaneousCost) -> bool {
        let mut draft = self.inner.write().unwrap();
        match draft
            .products
            .iter_mut()
            .find(|p| p.product_id == product_id)
        {
            Some(line) => {
                line.miscellaneous.push(cost);
                true
            }
            None => false,
        }
    }

    pub fn parameters_by_product(&self, product_id: &str) -> Option<ProductParameters> {
        self.inner
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .map(|p| p.parameters.clone())
    }

    pub fn recipient_by_product(&self, product_id: &str) -> Option<Recipient> {
        self.inner
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .and_then(|p| p.recipient.clone())
    }

    pub fn miscellaneous_by_product(&self, product_id: &str) -> Vec<MiscellaneousCost> {
        self.inner
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .map(|p| p.miscellaneous.clone())
            .unwrap_or_default()
    }

    pub fn set_payment_method(&self, method: PaymentMethod) {
        self.inner.write().unwrap().payment_method = Some(method);
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.inner.read().unwrap().payment_method
    }

    /// Transition the draft to awaiting payment.
    pub fn set_payment_session(&self, session: PaymentSession) {
        let mut draft = self.inner.write().unwrap();
        if draft.payment_details.is_some() {
            tracing::warn!(reference = %session.reference, "Replacing an existing payment session");
        }
        draft.payment_details = Some(session);
    }

    pub fn payment_session(&self) -> Option<PaymentSession> {
        self.inner.read().unwrap().payment_details.clone()
    }

    /// Edit the charge before launch. The only in-place mutation the session
    /// allows.
    pub fn set_payment_amount(&self, amount: Decimal) -> Result<(), CheckoutError> {
        let mut draft = self.inner.write().unwrap();
        match draft.payment_details.as_mut() {
            Some(session) => {
                session.amount = amount;
                Ok(())
            }
            None => Err(CheckoutError::Validation(
                "No payment session to update".to_string(),
            )),
        }
    }

    /// Once a session exists, the composition form gives way to the payment
    /// panel.
    pub fn is_awaiting_payment(&self) -> bool {
        self.inner.read().unwrap().payment_details.is_some()
    }
}
