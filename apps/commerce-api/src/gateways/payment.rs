//! Payment processor client.
//!
//! Creates a hosted checkout session from the cart's payment lines. The
//! processor answers with a redirect URL, a client secret for embedded
//! checkout, or both.

use std::time::Duration;

use async_trait::async_trait;
use boutique_core::checkout::PaymentLineItem;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{send, GatewayError, GatewayResult};
use crate::config::PaymentConfig;

const SERVICE: &str = "payment";

/// What the processor needs to open a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionRequest {
    /// Lets the processor deduplicate sessions for the same cart.
    pub client_reference_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub line_items: Vec<PaymentLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Handle returned to the storefront to continue payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub session_id: String,
    pub redirect_url: Option<String>,
    pub client_secret: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session. Called once per attempt; never retried here.
    async fn create_session(&self, request: &PaymentSessionRequest) -> GatewayResult<PaymentSession>;
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    client_secret: Option<String>,
}

/// [`PaymentGateway`] over the processor's REST API.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    config: PaymentConfig,
    http: Client,
}

impl HttpPaymentGateway {
    pub fn new(config: PaymentConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| GatewayError::Transport { service: SERVICE, source })?;

        Ok(HttpPaymentGateway { config, http })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_session(&self, request: &PaymentSessionRequest) -> GatewayResult<PaymentSession> {
        let url = format!("{}/v1/checkout/sessions", self.config.base_url.trim_end_matches('/'));

        debug!(
            client_reference_id = %request.client_reference_id,
            lines = request.line_items.len(),
            "Creating payment session"
        );

        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = send(SERVICE, builder).await?;
        let parsed: SessionResponse = response.json().await.map_err(|e| GatewayError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        let session = into_session(parsed)?;
        info!(session_id = %session.session_id, "Payment session created");
        Ok(session)
    }
}

fn into_session(response: SessionResponse) -> GatewayResult<PaymentSession> {
    if response.id.trim().is_empty() {
        return Err(GatewayError::InvalidResponse {
            service: SERVICE,
            reason: "session id is empty".to_string(),
        });
    }

    if response.url.is_none() && response.client_secret.is_none() {
        return Err(GatewayError::InvalidResponse {
            service: SERVICE,
            reason: "neither a redirect URL nor a client secret was returned".to_string(),
        });
    }

    Ok(PaymentSession {
        session_id: response.id,
        redirect_url: response.url,
        client_secret: response.client_secret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_needs_a_way_to_pay() {
        let response = SessionResponse {
            id: "cs_1".to_string(),
            url: None,
            client_secret: None,
        };
        assert!(matches!(into_session(response), Err(GatewayError::InvalidResponse { .. })));

        let response = SessionResponse {
            id: "cs_1".to_string(),
            url: Some("https://pay.example.com/cs_1".to_string()),
            client_secret: None,
        };
        let session = into_session(response).unwrap();
        assert_eq!(session.redirect_url.as_deref(), Some("https://pay.example.com/cs_1"));
    }

    #[test]
    fn test_request_serializes_cents() {
        let request = PaymentSessionRequest {
            client_reference_id: "cart-1".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_name: "Jane Doe".to_string(),
            line_items: vec![PaymentLineItem {
                name: "Mug".to_string(),
                description: Some("VAT 21% included".to_string()),
                price: 1999,
                quantity: 2,
                currency: "eur".to_string(),
            }],
            success_url: "http://localhost/ok".to_string(),
            cancel_url: "http://localhost/cancel".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["lineItems"][0]["price"], 1999);
        assert_eq!(json["clientReferenceId"], "cart-1");
    }
}
