//! Outbound HTTP clients: the hosted payment page and the email service.
//!
//! Both sit behind traits so services and tests never depend on a live
//! upstream. Neither client retries; the payment call fails loudly to the
//! caller and email failures are only logged by the event handler.

pub mod email;
pub mod payment;

use thiserror::Error;

pub use self::email::{EmailSender, HttpEmailSender, OrderConfirmationMailer};
pub use self::payment::{HttpPaymentGateway, PaymentGateway, PaymentSession, PaymentSessionRequest};

/// Upstream service errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} rejected the request with status {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {reason}")]
    InvalidResponse { service: &'static str, reason: String },
}

impl GatewayError {
    pub fn service(&self) -> &'static str {
        match self {
            GatewayError::Transport { service, .. }
            | GatewayError::Rejected { service, .. }
            | GatewayError::InvalidResponse { service, .. } => service,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Sends a prepared request and turns non-2xx replies into [`GatewayError::Rejected`].
pub(crate) async fn send(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> GatewayResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|source| GatewayError::Transport { service, source })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected { service, status, body });
    }

    Ok(response)
}
