//! Payment domain types shared by the gateway adapter, verification client,
//! and the checkout and completion flows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Lifecycle status of a server-side payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Incomplete,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Incomplete => "INCOMPLETE",
            PaymentStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the operator collects the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Online => "ONLINE",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom fields forwarded to the gateway with every invocation so support
/// can trace a charge back to its sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub sale_id: String,
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Everything needed to run one hosted-gateway invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub public_key: String,
    pub email: String,
    /// Charge amount in major currency units; editable before launch.
    pub amount: Decimal,
    /// Server-authoritative sale total at minting time.
    pub total_amount: Decimal,
    /// Transaction reference, unique per attempt. Never reused.
    pub reference: String,
    pub sale_id: String,
    pub currency: String,
    pub channels: Vec<String>,
    pub metadata: SessionMetadata,
}

/// Server-side record of one payment attempt against a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub id: String,
    pub transaction_ref: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
}

/// The operator's selection from the payment mode selector.
#[derive(Debug, Clone)]
pub struct PaymentChoice {
    pub method: PaymentMethod,
    /// Entered amount; defaults to the applicable total when absent.
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl PaymentChoice {
    pub fn cash(amount: Option<Decimal>) -> Self {
        Self {
            method: PaymentMethod::Cash,
            amount,
            notes: None,
        }
    }

    pub fn online() -> Self {
        Self {
            method: PaymentMethod::Online,
            amount: None,
            notes: None,
        }
    }

    /// Check the entered amount before either branch does any network work.
    /// `cap` is the remaining balance during completion, `None` at checkout.
    pub fn validate(&self, cap: Option<Decimal>) -> Result<(), CheckoutError> {
        if let Some(amount) = self.amount {
            if amount <= Decimal::ZERO {
                return Err(CheckoutError::Validation(
                    "Payment amount must be greater than zero".to_string(),
                ));
            }
            if let Some(cap) = cap {
                if amount > cap {
                    return Err(CheckoutError::Validation(format!(
                        "Payment amount cannot exceed the remaining balance of {}",
                        cap
                    )));
                }
            }
        }
        Ok(())
    }
}
