//! services/api/src/adapters/payment.rs
//!
//! This module contains the adapter for the Chapa payment gateway.
//! It implements the `PaymentGateway` port from the `core` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use studyforge_core::domain::{CheckoutRequest, CheckoutSession};
use studyforge_core::ports::{PaymentGateway, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PaymentGateway` against Chapa's
/// transaction-initialize endpoint.
#[derive(Clone)]
pub struct ChapaAdapter {
    http: reqwest::Client,
    secret_key: Option<String>,
    api_url: String,
    return_url: String,
}

impl ChapaAdapter {
    /// Creates a new `ChapaAdapter`. `return_url` is where the hosted
    /// checkout sends the payer back after completion.
    pub fn new(secret_key: Option<String>, api_url: String, return_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_url,
            return_url,
        }
    }
}

//=========================================================================================
// Wire Shapes
//=========================================================================================

#[derive(Serialize)]
struct InitializePayload<'a> {
    amount: f64,
    currency: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
    customizations: Customizations<'a>,
    meta: Meta<'a>,
}

#[derive(Serialize)]
struct Customizations<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct Meta<'a> {
    hide_receipt: &'a str,
}

#[derive(Deserialize)]
struct InitializeResponse {
    status: String,
    message: Option<String>,
    data: Option<CheckoutData>,
}

#[derive(Deserialize)]
struct CheckoutData {
    checkout_url: String,
}

//=========================================================================================
// `PaymentGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentGateway for ChapaAdapter {
    async fn initialize_checkout(&self, request: &CheckoutRequest) -> PortResult<CheckoutSession> {
        // Required fields are checked before anything goes over the wire.
        if let Some(field) = request.missing_field() {
            return Err(PortError::Unexpected(format!(
                "payment request is missing required field: {field}"
            )));
        }

        let secret_key = self.secret_key.as_deref().ok_or_else(|| {
            PortError::Unexpected("CHAPA_SECRET_KEY is not configured".to_string())
        })?;

        let payload = InitializePayload {
            amount: request.amount,
            currency: &request.currency,
            email: &request.email,
            first_name: &request.first_name,
            last_name: &request.last_name,
            tx_ref: &request.tx_ref,
            callback_url: &request.callback_url,
            return_url: &self.return_url,
            customizations: Customizations {
                title: "StudyForge plan upgrade",
                description: "Changing plan",
            },
            meta: Meta {
                hide_receipt: "true",
            },
        };

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.api_url))
            .bearer_auth(secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("payment gateway unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "payment initialization rejected");
            return Err(PortError::Unexpected(format!(
                "payment gateway returned {status}"
            )));
        }

        let body: InitializeResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("malformed gateway response: {e}")))?;

        if body.status != "success" {
            return Err(PortError::Unexpected(
                body.message
                    .unwrap_or_else(|| "Payment processing error".to_string()),
            ));
        }

        body.data
            .map(|data| CheckoutSession {
                checkout_url: data.checkout_url,
            })
            .ok_or_else(|| {
                PortError::Unexpected("gateway returned no checkout URL".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_response_body_parses() {
        let raw = r#"{
            "status": "success",
            "message": "Hosted Link",
            "data": { "checkout_url": "https://checkout.chapa.co/checkout/payment/abc" }
        }"#;
        let body: InitializeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.status, "success");
        assert!(body.data.unwrap().checkout_url.starts_with("https://"));
    }

    #[test]
    fn error_response_body_parses_without_data() {
        let raw = r#"{ "status": "failed", "message": "Invalid currency" }"#;
        let body: InitializeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.status, "failed");
        assert!(body.data.is_none());
    }

    #[tokio::test]
    async fn incomplete_request_is_rejected_before_dispatch() {
        let adapter = ChapaAdapter::new(
            None,
            "https://api.chapa.co/v1".to_string(),
            "http://localhost:3000/dashboard/account".to_string(),
        );
        let request = CheckoutRequest {
            amount: 100.0,
            currency: "ETB".to_string(),
            email: String::new(),
            first_name: "Sara".to_string(),
            last_name: "Bekele".to_string(),
            tx_ref: "tx-1".to_string(),
            callback_url: "https://example.com/cb".to_string(),
        };

        let err = adapter.initialize_checkout(&request).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(msg) if msg.contains("email")));
    }
}
