//! Typed client for the sales backend.

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::ApiSettings;
use crate::dtos::{
    ApiErrorBody, CreateSaleRequest, CreateSaleResponse, RecordPaymentRequest,
    RecordPaymentResponse, SaleViewResponse, VerifyCallbackResponse,
};
use crate::error::ApiError;

/// Client for the sales backend. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct SalesApi {
    client: Client,
    base_url: String,
}

impl SalesApi {
    pub fn new(settings: &ApiSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `POST /v1/sales/create`: create the sale and receive the
    /// authoritative total and transaction reference.
    pub async fn create_sale(
        &self,
        request: &CreateSaleRequest,
    ) -> Result<CreateSaleResponse, ApiError> {
        const ENDPOINT: &str = "create-sale";
        let url = format!("{}/v1/sales/create", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        Self::read_json(ENDPOINT, "Could not create the sale", response).await
    }

    /// `POST /v1/sales/record-cash-payment`: record a payment against an
    /// existing sale. Used for CASH and ONLINE records alike.
    pub async fn record_payment(
        &self,
        request: &RecordPaymentRequest,
    ) -> Result<RecordPaymentResponse, ApiError> {
        const ENDPOINT: &str = "record-payment";
        let url = format!("{}/v1/sales/record-cash-payment", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        Self::read_json(ENDPOINT, "Could not record the payment", response).await
    }

    /// `GET /v1/payment/verify/callback?txref=REF`: ask the backend whether
    /// a gateway charge went through.
    pub async fn verify_payment(
        &self,
        reference: &str,
    ) -> Result<VerifyCallbackResponse, ApiError> {
        self.verify_with_params(&[("txref", reference)]).await
    }

    /// Same endpoint, fed from the gateway's redirect return parameters.
    pub async fn verify_redirect(
        &self,
        reference: &str,
        transaction_id: &str,
    ) -> Result<VerifyCallbackResponse, ApiError> {
        self.verify_with_params(&[("txref", reference), ("transactionid", transaction_id)])
            .await
    }

    async fn verify_with_params(
        &self,
        params: &[(&str, &str)],
    ) -> Result<VerifyCallbackResponse, ApiError> {
        const ENDPOINT: &str = "verify-payment";
        let url = format!("{}/v1/payment/verify/callback", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        Self::read_json(ENDPOINT, "Could not verify the payment", response).await
    }

    /// `GET /v1/sales/single/:id`: fetch a sale with its payment records.
    pub async fn fetch_sale(&self, sale_id: &str) -> Result<SaleViewResponse, ApiError> {
        const ENDPOINT: &str = "fetch-sale";
        let url = format!("{}/v1/sales/single/{}", self.base_url, sale_id);

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|source| ApiError::Transport {
                    endpoint: ENDPOINT,
                    source,
                })?;

        Self::read_json(ENDPOINT, "Could not load the sale", response).await
    }

    /// Split status from body, surface the server's message on failure, and
    /// report an undecodable success body as its own error.
    async fn read_json<T: DeserializeOwned>(
        endpoint: &'static str,
        fallback: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        tracing::debug!(endpoint, status = %status, "Backend response");

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                tracing::error!(endpoint, error = %e, "Failed to decode backend response");
                ApiError::Decode {
                    endpoint,
                    detail: e.to_string(),
                }
            })
        } else {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(ApiErrorBody::into_message)
                .unwrap_or_else(|| format!("{} (status {})", fallback, status.as_u16()));
            tracing::error!(endpoint, status = %status, message = %message, "Backend request failed");
            Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                message,
            })
        }
    }
}
