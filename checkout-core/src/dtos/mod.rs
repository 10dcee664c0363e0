//! Wire schemas for the backend endpoints.
//!
//! One type per request and response so a decode failure names the endpoint
//! that produced it instead of surfacing as a missing field somewhere else.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;
use crate::models::{
    Customer, PaymentInfo, PaymentMethod, PaymentPlan, PaymentStatus, ProductLine, SaleDraft,
};

/// `POST /v1/sales/create` request body: the full draft payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub customer: Customer,
    pub products: Vec<ProductLine>,
    pub payment_method: PaymentMethod,
}

impl CreateSaleRequest {
    /// Build the payload from the draft. The review gate should have caught
    /// an empty draft already; this is the last check before the wire.
    pub fn from_draft(draft: &SaleDraft) -> Result<Self, CheckoutError> {
        let customer = draft.customer.clone().ok_or_else(|| {
            CheckoutError::Validation("Customer details are required".to_string())
        })?;
        if draft.products.is_empty() {
            return Err(CheckoutError::Validation(
                "At least one product is required".to_string(),
            ));
        }
        let payment_method = draft
            .payment_method
            .ok_or_else(|| CheckoutError::Validation("Select a payment method".to_string()))?;

        Ok(Self {
            category: draft.category.clone(),
            customer,
            products: draft.products.clone(),
            payment_method,
        })
    }
}

/// `POST /v1/sales/create` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleResponse {
    pub sale: CreatedSale,
    pub payment_data: PaymentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSale {
    pub id: String,
}

/// Authoritative figures minted with the sale. The amount supersedes any
/// client-side estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub amount: Decimal,
    pub transaction_ref: String,
}

/// `POST /v1/sales/record-cash-payment` request body. Despite the path, the
/// backend accepts CASH and ONLINE records alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub sale_id: String,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `POST /v1/sales/record-cash-payment` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /v1/payment/verify/callback` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCallbackResponse {
    pub data: VerifyCallbackData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCallbackData {
    /// Gateway-side status; "success" and "processing" count as provisional
    /// passes.
    pub status: String,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// `GET /v1/sales/single/:id` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleViewResponse {
    pub sale: SaleHeader,
    #[serde(default)]
    pub payment_info: Vec<PaymentInfo>,
    pub customer: CustomerSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleHeader {
    pub id: String,
    pub total_amount: Decimal,
    pub payment_plan: PaymentPlan,
    #[serde(default)]
    pub total_installments: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Error body some endpoints send with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductParameters;
    use std::str::FromStr;

    #[test]
    fn from_draft_rejects_missing_customer() {
        let draft = SaleDraft {
            payment_method: Some(PaymentMethod::Cash),
            ..SaleDraft::default()
        };

        let err = CreateSaleRequest::from_draft(&draft).unwrap_err();
        assert!(err.to_string().contains("Customer"));
    }

    #[test]
    fn from_draft_rejects_missing_payment_method() {
        let draft = SaleDraft {
            customer: Some(Customer {
                name: "Ada Obi".to_string(),
                email: "ada@example.com".to_string(),
                phone_number: "+2348000000000".to_string(),
                address: None,
            }),
            products: vec![ProductLine {
                product_id: "prod-1".to_string(),
                name: "Inverter".to_string(),
                unit_price: Decimal::from_str("250000").unwrap(),
                quantity: 1,
                parameters: ProductParameters::default(),
                recipient: None,
                miscellaneous: vec![],
            }],
            ..SaleDraft::default()
        };

        let err = CreateSaleRequest::from_draft(&draft).unwrap_err();
        assert!(err.to_string().contains("payment method"));
    }

    #[test]
    fn create_sale_response_uses_camel_case() {
        let body = serde_json::json!({
            "sale": { "id": "sale-42" },
            "paymentData": { "amount": 150000, "transactionRef": "TX-99" }
        });

        let parsed: CreateSaleResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.sale.id, "sale-42");
        assert_eq!(parsed.payment_data.transaction_ref, "TX-99");
        assert_eq!(parsed.payment_data.amount, Decimal::from(150000));
    }

    #[test]
    fn verify_response_tolerates_missing_optionals() {
        let body = serde_json::json!({ "data": { "status": "processing" } });

        let parsed: VerifyCallbackResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.data.status, "processing");
        assert_eq!(parsed.data.payment_status, None);
        assert_eq!(parsed.data.amount, None);
    }
}
