pub mod api;
pub mod checkout;
pub mod gateway;
pub mod notices;
pub mod store;
pub mod transactions;
pub mod verification;

pub use api::SalesApi;
pub use checkout::{CheckoutFlow, CheckoutReceipt, CheckoutStage, ConfirmOutcome, LaunchResult};
pub use gateway::{
    CheckoutOutcome, CheckoutWidget, GatewayAdapter, GatewayCallback, GatewayReadiness,
    WidgetConfig, WidgetError,
};
pub use notices::{MemoryNotifier, Notice, Notifier, Severity};
pub use store::SaleDraftStore;
pub use transactions::{
    actions_for, CompletionOutcome, CompletionReceipt, SaleTransactionsView, TransactionAction,
    TransactionsFlow,
};
pub use verification::{ReflectedView, VerificationClient, VerificationOutcome};
