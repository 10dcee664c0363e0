//! Sale draft model: the one in-progress sale an operator is composing.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::{PaymentMethod, PaymentSession};

/// Customer the sale is being made to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Payment plan chosen for a product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPlan {
    OneOff,
    Installment,
}

impl PaymentPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPlan::OneOff => "ONE_OFF",
            PaymentPlan::Installment => "INSTALLMENT",
        }
    }
}

/// Per-product sale parameters captured during composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParameters {
    pub payment_plan: PaymentPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_installments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_deposit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    /// Category-specific fields (panel wattage, meter number, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Default for ProductParameters {
    fn default() -> Self {
        Self {
            payment_plan: PaymentPlan::OneOff,
            number_of_installments: None,
            initial_deposit: None,
            discount: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Delivery recipient for a product line, when different from the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Named extra cost attached to a product line (delivery, installation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiscellaneousCost {
    pub name: String,
    pub cost: Decimal,
}

/// One product line in the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub parameters: ProductParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub miscellaneous: Vec<MiscellaneousCost>,
}

impl ProductLine {
    /// Line estimate: unit price times quantity plus miscellaneous costs,
    /// less the line discount.
    pub fn line_total(&self) -> Decimal {
        let misc: Decimal = self.miscellaneous.iter().map(|m| m.cost).sum();
        let discount = self.parameters.discount.unwrap_or(Decimal::ZERO);
        self.unit_price * Decimal::from(self.quantity) + misc - discount
    }
}

/// The one active sale draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub category: Option<String>,
    pub customer: Option<Customer>,
    pub products: Vec<ProductLine>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: Option<PaymentSession>,
}

impl SaleDraft {
    /// Client-side estimate shown on the review screen. The total returned
    /// by the backend on sale creation supersedes this value.
    pub fn estimated_total(&self) -> Decimal {
        self.products.iter().map(ProductLine::line_total).sum()
    }

    /// Whether any line is sold on an installment plan.
    pub fn has_installment_plan(&self) -> bool {
        self.products
            .iter()
            .any(|p| p.parameters.payment_plan == PaymentPlan::Installment)
    }

    /// Largest installment count across lines, if any line has one.
    pub fn total_installments(&self) -> Option<u32> {
        self.products
            .iter()
            .filter_map(|p| p.parameters.number_of_installments)
            .max()
    }
}
