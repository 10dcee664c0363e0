//! Hosted payment gateway adapter.
//!
//! The gateway ships as an externally loaded checkout widget. The adapter
//! owns everything around it: probing that the widget has attached,
//! validating a session before handing it over, converting major units to
//! the gateway's minor units, and collapsing the widget's continuation
//! channels into a single terminal outcome per invocation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use validator::ValidateEmail;

use crate::config::GatewaySettings;
use crate::error::GatewayError;
use crate::models::{PaymentSession, SessionMetadata};

/// Readiness of the hosted widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayReadiness {
    NotReady,
    Polling,
    Ready,
    Unavailable,
}

/// Configuration handed to the widget for one invocation. The amount is in
/// minor units; the adapter owns the conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub key: String,
    pub email: String,
    /// Minor currency units (major times 100).
    pub amount: u64,
    pub currency: String,
    pub reference: String,
    pub channels: Vec<String>,
    pub metadata: SessionMetadata,
}

/// What the gateway reported when the widget resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCallback {
    /// Gateway status string; only "success" proceeds to verification.
    pub status: String,
    pub reference: String,
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl GatewayCallback {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Terminal result of one widget invocation. Exactly one per call.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Operator closed the widget without paying.
    Cancelled,
    /// The widget resolved with a gateway callback, success or not.
    Completed(GatewayCallback),
}

/// Errors the widget itself can raise.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("handler construction failed")]
    HandlerCreation,
    #[error("{0}")]
    Other(String),
}

/// Contract of the hosted checkout widget.
///
/// `is_attached` probes whether the external script has loaded; `open` runs
/// one checkout attempt to its terminal outcome and resolves exactly once.
#[async_trait]
pub trait CheckoutWidget: Send + Sync {
    fn is_attached(&self) -> bool;
    async fn open(&self, config: WidgetConfig) -> Result<CheckoutOutcome, WidgetError>;
}

/// Adapter between the flows and the hosted widget.
pub struct GatewayAdapter {
    widget: Arc<dyn CheckoutWidget>,
    settings: GatewaySettings,
    state_tx: watch::Sender<GatewayReadiness>,
    state_rx: watch::Receiver<GatewayReadiness>,
    cancel: Mutex<CancellationToken>,
    last_error: Mutex<Option<String>>,
}

impl GatewayAdapter {
    pub fn new(widget: Arc<dyn CheckoutWidget>, settings: GatewaySettings) -> Self {
        let (state_tx, state_rx) = watch::channel(GatewayReadiness::NotReady);
        Self {
            widget,
            settings,
            state_tx,
            state_rx,
            cancel: Mutex::new(CancellationToken::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Current readiness.
    pub fn readiness(&self) -> GatewayReadiness {
        *self.state_rx.borrow()
    }

    /// Watch readiness transitions.
    pub fn subscribe(&self) -> watch::Receiver<GatewayReadiness> {
        self.state_rx.clone()
    }

    /// Latest failure message, for surfaces that poll instead of matching
    /// error values.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Drive readiness to a terminal state: probe immediately, then re-probe
    /// on a fixed interval up to the configured attempt budget. A fresh call
    /// after exhaustion restarts the window.
    pub async fn await_ready(&self) -> GatewayReadiness {
        if self.widget.is_attached() {
            self.set_state(GatewayReadiness::Ready);
            return GatewayReadiness::Ready;
        }

        let token = {
            let mut guard = self.cancel.lock().unwrap();
            *guard = CancellationToken::new();
            guard.clone()
        };

        self.set_state(GatewayReadiness::Polling);
        tracing::info!(
            max_attempts = self.settings.readiness_max_attempts,
            interval_ms = self.settings.readiness_interval_ms,
            "Waiting for the payment widget to attach"
        );

        for attempt in 1..=self.settings.readiness_max_attempts {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(attempt, "Readiness polling cancelled");
                    self.set_state(GatewayReadiness::NotReady);
                    return GatewayReadiness::NotReady;
                }
                _ = tokio::time::sleep(self.settings.readiness_interval()) => {}
            }

            if self.widget.is_attached() {
                tracing::info!(attempt, "Payment widget attached");
                self.set_state(GatewayReadiness::Ready);
                return GatewayReadiness::Ready;
            }
        }

        tracing::warn!(
            attempts = self.settings.readiness_max_attempts,
            "Payment widget never attached"
        );
        self.park_error(&GatewayError::Unavailable.to_string());
        self.set_state(GatewayReadiness::Unavailable);
        GatewayReadiness::Unavailable
    }

    /// Stop an in-flight readiness poll.
    pub fn cancel_polling(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    /// Run one checkout attempt. Exactly one terminal outcome comes back per
    /// invocation; the adapter never retries on its own.
    pub async fn initialize_payment(
        &self,
        session: &PaymentSession,
    ) -> Result<CheckoutOutcome, GatewayError> {
        match self.readiness() {
            GatewayReadiness::Ready => {}
            GatewayReadiness::Unavailable => return Err(self.fail(GatewayError::Unavailable)),
            GatewayReadiness::NotReady | GatewayReadiness::Polling => {
                return Err(self.fail(GatewayError::NotReady))
            }
        }

        if let Err(e) = validate_session(session) {
            return Err(self.fail(e));
        }

        let amount = match to_minor_units(session.amount) {
            Ok(amount) => amount,
            Err(e) => return Err(self.fail(e)),
        };

        let config = WidgetConfig {
            key: session.public_key.clone(),
            email: session.email.clone(),
            amount,
            currency: session.currency.clone(),
            reference: session.reference.clone(),
            channels: session.channels.clone(),
            metadata: session.metadata.clone(),
        };

        tracing::info!(
            reference = %session.reference,
            amount_minor = amount,
            currency = %session.currency,
            "Opening payment widget"
        );

        match self.widget.open(config).await {
            Ok(outcome) => {
                self.last_error.lock().unwrap().take();
                match &outcome {
                    CheckoutOutcome::Cancelled => {
                        tracing::info!(reference = %session.reference, "Payment widget closed by the operator")
                    }
                    CheckoutOutcome::Completed(cb) => {
                        tracing::info!(reference = %cb.reference, status = %cb.status, "Payment widget resolved")
                    }
                }
                Ok(outcome)
            }
            Err(WidgetError::HandlerCreation) => Err(self.fail(GatewayError::HandlerCreationFailed)),
            Err(WidgetError::Other(message)) => Err(self.fail(GatewayError::Widget(message))),
        }
    }

    fn set_state(&self, next: GatewayReadiness) {
        let prev = *self.state_rx.borrow();
        if prev != next {
            tracing::debug!(?prev, ?next, "Gateway readiness changed");
        }
        self.state_tx.send_replace(next);
    }

    fn park_error(&self, message: &str) {
        *self.last_error.lock().unwrap() = Some(message.to_string());
    }

    fn fail(&self, error: GatewayError) -> GatewayError {
        tracing::error!(error = %error, "Payment initialization rejected");
        self.park_error(&error.to_string());
        error
    }
}

/// Convert a major-unit amount to the gateway's integer minor units,
/// rounding halves away from zero: 1500.5 becomes 150050.
pub fn to_minor_units(amount: Decimal) -> Result<u64, GatewayError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(GatewayError::InvalidAmount)
}

fn validate_session(session: &PaymentSession) -> Result<(), GatewayError> {
    let mut missing = Vec::new();
    if session.public_key.is_empty() {
        missing.push("key");
    }
    if session.email.is_empty() {
        missing.push("email");
    }
    // A zero amount reads as absent, the way the hosted script treats it.
    if session.amount.is_zero() {
        missing.push("amount");
    }
    if session.reference.is_empty() {
        missing.push("ref");
    }
    if !missing.is_empty() {
        return Err(GatewayError::MissingConfigField(missing));
    }

    if session.amount <= Decimal::ZERO {
        return Err(GatewayError::InvalidAmount);
    }
    if !session.email.validate_email() {
        return Err(GatewayError::InvalidEmail);
    }
    Ok(())
}

/// Widget that never attaches. Placeholder for headless environments where
/// the hosted script cannot load.
#[derive(Debug, Default)]
pub struct DetachedWidget;

#[async_trait]
impl CheckoutWidget for DetachedWidget {
    fn is_attached(&self) -> bool {
        false
    }

    async fn open(&self, _config: WidgetConfig) -> Result<CheckoutOutcome, WidgetError> {
        Err(WidgetError::Other(
            "checkout widget is not attached".to_string(),
        ))
    }
}

/// Widget that approves every charge. Development stand-in for the hosted
/// script; never wire it to a live key.
#[derive(Debug, Default)]
pub struct AutoApproveWidget;

#[async_trait]
impl CheckoutWidget for AutoApproveWidget {
    fn is_attached(&self) -> bool {
        true
    }

    async fn open(&self, config: WidgetConfig) -> Result<CheckoutOutcome, WidgetError> {
        tracing::warn!(reference = %config.reference, "Auto-approving payment (development widget)");
        Ok(CheckoutOutcome::Completed(GatewayCallback {
            status: "success".to_string(),
            reference: config.reference,
            transaction: Some(format!("dev-{}", uuid::Uuid::new_v4())),
            redirect_url: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn converts_major_to_minor_units() {
        let amount = Decimal::from_str("1500.5").unwrap();
        assert_eq!(to_minor_units(amount).unwrap(), 150050);

        assert_eq!(to_minor_units(Decimal::from(2)).unwrap(), 200);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn rounds_half_minor_units_away_from_zero() {
        let amount = Decimal::from_str("10.005").unwrap();
        assert_eq!(to_minor_units(amount).unwrap(), 1001);
    }

    #[test]
    fn negative_amount_does_not_convert() {
        let amount = Decimal::from_str("-1").unwrap();
        assert!(matches!(
            to_minor_units(amount),
            Err(GatewayError::InvalidAmount)
        ));
    }
}
