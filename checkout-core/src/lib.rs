//! Checkout, payment gateway, and reconciliation core for the sales
//! dashboard.
//!
//! The crate drives a sale from composed draft to settled record: the
//! [`services::CheckoutFlow`] owns the review-confirm-reconcile lifecycle,
//! the [`services::GatewayAdapter`] wraps the hosted payment widget behind
//! bounded readiness polling, and the [`services::TransactionsFlow`] finishes
//! PENDING and INCOMPLETE payments later. The backend stays the source of
//! truth for totals and settlement status throughout.

pub mod config;
pub mod dtos;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use config::Settings;
use services::{
    CheckoutFlow, CheckoutWidget, GatewayAdapter, Notifier, SaleDraftStore, SalesApi,
    TransactionsFlow, VerificationClient,
};

/// Wires the flows, the draft store, and the gateway adapter around one
/// settings snapshot.
pub struct CheckoutEngine {
    pub store: SaleDraftStore,
    pub gateway: Arc<GatewayAdapter>,
    pub checkout: CheckoutFlow,
    pub transactions: TransactionsFlow,
}

impl CheckoutEngine {
    pub fn build(
        settings: Settings,
        widget: Arc<dyn CheckoutWidget>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let api = SalesApi::new(&settings.api);
        let verifier = VerificationClient::new(api.clone(), settings.reconciliation.clone());
        let gateway = Arc::new(GatewayAdapter::new(widget, settings.gateway.clone()));
        let store = SaleDraftStore::new();

        if settings.gateway.public_key.is_empty() {
            tracing::warn!("Gateway public key not configured - online payments will be limited");
        } else {
            tracing::info!("Gateway adapter initialized");
        }

        let checkout = CheckoutFlow::new(
            store.clone(),
            api.clone(),
            Arc::clone(&gateway),
            verifier.clone(),
            Arc::clone(&notifier),
            settings.clone(),
        );
        let transactions = TransactionsFlow::new(
            api,
            Arc::clone(&gateway),
            verifier,
            notifier,
            settings,
        );

        Self {
            store,
            gateway,
            checkout,
            transactions,
        }
    }
}
