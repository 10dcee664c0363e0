//! Error taxonomy for the checkout core.
//!
//! Every variant renders to an operator-readable message. Flows log the
//! structured cause and surface the message unchanged.

use thiserror::Error;

/// Failures raised by the gateway adapter before or during a hosted-widget
/// invocation. None of these mean money has moved.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Required session fields are empty; the list names every one of them.
    #[error("Invalid payment configuration. Missing: {}", .0.join(", "))]
    MissingConfigField(Vec<&'static str>),
    #[error("Invalid payment amount. Amount must be greater than zero")]
    InvalidAmount,
    #[error("Invalid email address format")]
    InvalidEmail,
    #[error("Payment gateway is still loading. Please wait a moment and try again")]
    NotReady,
    #[error("Payment gateway is not available. Please reload the page and try again")]
    Unavailable,
    #[error("Failed to create payment handler")]
    HandlerCreationFailed,
    #[error("Payment widget error: {0}")]
    Widget(String),
}

/// Failures talking to the backend, one shape per cause so callers can tell
/// an unreachable server from a rejection from a garbled body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed.
    #[error("Could not reach the server for {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success status; the message is the server's when it sent one.
    #[error("{message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    /// A success status with a body that did not match the schema.
    #[error("Unexpected response from {endpoint}: {detail}")]
    Decode {
        endpoint: &'static str,
        detail: String,
    },
}

impl ApiError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiError::Transport { endpoint, .. } => endpoint,
            ApiError::Status { endpoint, .. } => endpoint,
            ApiError::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// Why a payment could not be verified.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The backend answered, but not with a success or processing status.
    #[error("Verification returned status {status:?}")]
    Rejected { status: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Top-level error for the checkout and completion flows.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Operator input problem; recoverable in place.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Network(#[from] ApiError),
    /// Gateway succeeded but verification could not confirm the charge.
    #[error("Payment completed but verification failed. Please contact support with reference: {reference}")]
    VerificationGap {
        reference: String,
        #[source]
        source: VerificationError,
    },
    /// Verified charge that the backend failed to record.
    #[error("Payment was verified but could not be recorded. Please contact support with reference: {reference}")]
    RecordingGap {
        reference: String,
        #[source]
        source: ApiError,
    },
}

impl CheckoutError {
    /// Did money move at the gateway without the backend confirming it?
    pub fn is_reconciliation_gap(&self) -> bool {
        matches!(
            self,
            CheckoutError::VerificationGap { .. } | CheckoutError::RecordingGap { .. }
        )
    }

    /// Transaction reference to quote to support, for gap errors.
    pub fn gap_reference(&self) -> Option<&str> {
        match self {
            CheckoutError::VerificationGap { reference, .. } => Some(reference),
            CheckoutError::RecordingGap { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_fields_are_listed_in_order() {
        let err = GatewayError::MissingConfigField(vec!["key", "email", "ref"]);
        assert_eq!(
            err.to_string(),
            "Invalid payment configuration. Missing: key, email, ref"
        );
    }

    #[test]
    fn gap_errors_carry_the_reference() {
        let err = CheckoutError::VerificationGap {
            reference: "TX-1234".to_string(),
            source: VerificationError::Rejected {
                status: "failed".to_string(),
            },
        };

        assert!(err.is_reconciliation_gap());
        assert_eq!(err.gap_reference(), Some("TX-1234"));
        assert!(err.to_string().contains("TX-1234"));
    }

    #[test]
    fn validation_errors_are_not_gaps() {
        let err = CheckoutError::Validation("Amount required".to_string());
        assert!(!err.is_reconciliation_gap());
        assert_eq!(err.gap_reference(), None);
    }
}
