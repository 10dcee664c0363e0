//! Domain models for the checkout core.

pub mod draft;
pub mod payment;
pub mod summary;

pub use draft::{
    Customer, MiscellaneousCost, PaymentPlan, ProductLine, ProductParameters, Recipient, SaleDraft,
};
pub use payment::{
    PaymentChoice, PaymentInfo, PaymentMethod, PaymentSession, PaymentStatus, SessionMetadata,
};
pub use summary::{settlement_status, PaymentSummary};
