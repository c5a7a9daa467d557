//! Transactional email client and the order-confirmation handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boutique_core::checkout::{email_confirmation, OrderConfirmationEmail};
use boutique_core::events::DomainEvent;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use super::{send, GatewayError, GatewayResult};
use crate::config::EmailConfig;
use crate::events::{EventHandler, HandlerResult};

const SERVICE: &str = "email";

const ORDER_CONFIRMATION_TEMPLATE: &str = "order_confirmation";

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_order_confirmation(&self, email: &OrderConfirmationEmail) -> GatewayResult<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    from: &'a str,
    to: &'a str,
    template: &'a str,
    data: &'a OrderConfirmationEmail,
}

/// [`EmailSender`] over the email service's REST API.
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    config: EmailConfig,
    http: Client,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| GatewayError::Transport { service: SERVICE, source })?;

        Ok(HttpEmailSender { config, http })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_order_confirmation(&self, email: &OrderConfirmationEmail) -> GatewayResult<()> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let message = MessageRequest {
            from: &self.config.from_address,
            to: &email.customer_email,
            template: ORDER_CONFIRMATION_TEMPLATE,
            data: email,
        };

        let mut builder = self.http.post(&url).json(&message);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        send(SERVICE, builder).await?;
        debug!(order_id = %email.order_id, "Order confirmation accepted by email service");
        Ok(())
    }
}

/// Sends the confirmation email once an order is persisted.
pub struct OrderConfirmationMailer {
    sender: Arc<dyn EmailSender>,
}

impl OrderConfirmationMailer {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        OrderConfirmationMailer { sender }
    }
}

#[async_trait]
impl EventHandler for OrderConfirmationMailer {
    fn name(&self) -> &'static str {
        "order_confirmation_mailer"
    }

    async fn handle(&self, event: &DomainEvent) -> HandlerResult {
        let DomainEvent::OrderCreated { order } = event else {
            return Ok(());
        };

        let email = email_confirmation(order);
        self.sender.send_order_confirmation(&email).await?;

        info!(order_id = %order.id, to = %email.customer_email, "Order confirmation sent");
        Ok(())
    }
}
