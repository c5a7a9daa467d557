//! HTTP routes.
//!
//! ```text
//! GET    /health
//! GET    /products/{id}
//! GET    /carts/{key}                       DELETE /carts/{key}
//! POST   /carts/{key}/items
//! PUT    /carts/{key}/items/{productId}     DELETE /carts/{key}/items/{productId}
//! POST   /carts/{key}/payment
//! POST   /carts/{key}/checkout
//! GET    /orders/{id}
//! GET    /orders/{id}/confirmation
//! POST   /orders/{id}/delivered
//! POST   /orders/{id}/credit-notes          GET    /orders/{id}/credit-notes
//! POST   /credit-notes/{id}/refund
//! ```

pub mod carts;
pub mod health;
pub mod orders;
pub mod products;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/products/{id}", get(products::get_product))
        .route("/carts/{key}", get(carts::get_cart).delete(carts::clear_cart))
        .route("/carts/{key}/items", post(carts::add_item))
        .route(
            "/carts/{key}/items/{product_id}",
            put(carts::update_item).delete(carts::remove_item),
        )
        .route("/carts/{key}/payment", post(carts::start_payment))
        .route("/carts/{key}/checkout", post(carts::checkout))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/confirmation", get(orders::confirmation))
        .route("/orders/{id}/delivered", post(orders::mark_delivered))
        .route(
            "/orders/{id}/credit-notes",
            post(orders::issue_credit_note).get(orders::list_credit_notes),
        )
        .route("/credit-notes/{id}/refund", post(orders::refund_credit_note))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use boutique_core::checkout::OrderConfirmationEmail;
    use boutique_db::{Database, DbConfig, NewProduct};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::cart_store::MemoryCartStore;
    use crate::config::CommerceConfig;
    use crate::gateways::{EmailSender, GatewayError, GatewayResult};
    use crate::services::checkout_service::tests::{checkout_request, FakePaymentGateway};

    #[derive(Default)]
    struct FakeEmailSender {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for FakeEmailSender {
        async fn send_order_confirmation(&self, email: &OrderConfirmationEmail) -> GatewayResult<()> {
            if self.fail {
                return Err(GatewayError::Rejected {
                    service: "email",
                    status: 500,
                    body: "smtp down".to_string(),
                });
            }
            self.sent.lock().unwrap().push(email.order_id.clone());
            Ok(())
        }
    }

    struct TestApp {
        router: Router,
        product_id: i64,
        email: Arc<FakeEmailSender>,
    }

    async fn app_with_email(email: FakeEmailSender) -> TestApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Linen apron".to_string(),
                description: None,
                price_ht_cents: 1652,
                vat_rate_bps: 2100,
                is_active: true,
            })
            .await
            .unwrap();

        let email = Arc::new(email);
        let state = AppState::build(
            &CommerceConfig::default(),
            db,
            Arc::new(MemoryCartStore::new()),
            Arc::new(FakePaymentGateway::default()),
            email.clone(),
        )
        .await;

        TestApp {
            router: router(state),
            product_id: product.id,
            email,
        }
    }

    async fn app() -> TestApp {
        app_with_email(FakeEmailSender::default()).await
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn add_to_cart(app: &TestApp, key: &str, quantity: i64) -> (StatusCode, Value) {
        send(
            &app.router,
            Method::POST,
            &format!("/carts/{}/items", key),
            Some(json!({ "productId": app.product_id, "quantity": quantity })),
        )
        .await
    }

    async fn place_order(app: &TestApp, key: &str) -> Value {
        add_to_cart(app, key, 2).await;
        let body = serde_json::to_value(checkout_request()).unwrap();
        let (status, order) = send(&app.router, Method::POST, &format!("/carts/{}/checkout", key), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        order
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app.router, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cartStoreBackend"], "memory");
    }

    #[tokio::test]
    async fn test_product_prices() {
        let app = app().await;
        let (status, body) = send(&app.router, Method::GET, &format!("/products/{}", app.product_id), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priceHt"], 1652);
        assert_eq!(body["priceTtc"], 1999);
        assert_eq!(body["vatRate"], 2100);

        let (status, body) = send(&app.router, Method::GET, "/products/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cart_lifecycle() {
        let app = app().await;

        let (status, cart) = add_to_cart(&app, "session:abc", 2).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["summary"]["totals"]["totalTtc"], 3998);

        let uri = format!("/carts/session:abc/items/{}", app.product_id);
        let (status, cart) = send(&app.router, Method::PUT, &uri, Some(json!({ "quantity": 3 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["summary"]["totals"]["totalTtc"], 5997);

        let (status, cart) = send(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["items"].as_array().unwrap().len(), 0);

        let (status, _) = send(&app.router, Method::DELETE, "/carts/session:abc", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app.router, Method::GET, "/carts/session:abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_quantity_is_validation_error() {
        let app = app().await;
        let (status, body) = add_to_cart(&app, "session:abc", 0).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let app = app().await;
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/carts/session:abc/items",
            Some(json!({ "productId": 4242, "quantity": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_checkout_then_cart_is_gone() {
        let app = app().await;
        let order = place_order(&app, "session:abc").await;

        assert_eq!(order["summary"]["totals"]["totalTtc"], 3998);
        assert_eq!(order["delivered"], false);
        assert_eq!(app.email.sent.lock().unwrap().len(), 1);

        let body = serde_json::to_value(checkout_request()).unwrap();
        let (status, _) = send(&app.router, Method::POST, "/carts/session:abc/checkout", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let order_id = order["id"].as_str().unwrap();
        let (status, fetched) = send(&app.router, Method::GET, &format!("/orders/{}", order_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], order["id"]);
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_checkout() {
        let app = app_with_email(FakeEmailSender {
            fail: true,
            ..Default::default()
        })
        .await;

        let order = place_order(&app, "customer:7").await;
        assert!(order["id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_payment_session() {
        let app = app().await;
        add_to_cart(&app, "session:abc", 1).await;

        let customer = serde_json::to_value(checkout_request().customer).unwrap();
        let (status, session) = send(
            &app.router,
            Method::POST,
            "/carts/session:abc/payment",
            Some(json!({ "customer": customer })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(session["sessionId"].as_str().unwrap().starts_with("cs_"));
    }

    #[tokio::test]
    async fn test_credit_note_refund_once() {
        let app = app().await;
        let order = place_order(&app, "session:abc").await;
        let order_id = order["id"].as_str().unwrap();

        let (status, delivered) =
            send(&app.router, Method::POST, &format!("/orders/{}/delivered", order_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(delivered["delivered"], true);

        let (status, note) = send(
            &app.router,
            Method::POST,
            &format!("/orders/{}/credit-notes", order_id),
            Some(json!({ "reason": "damaged", "lines": [{ "productId": app.product_id, "quantity": 1 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(note["status"], "pending");

        let (status, notes) =
            send(&app.router, Method::GET, &format!("/orders/{}/credit-notes", order_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notes.as_array().unwrap().len(), 1);

        let refund_uri = format!("/credit-notes/{}/refund", note["id"].as_str().unwrap());
        let (status, refunded) = send(&app.router, Method::POST, &refund_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refunded["status"], "refunded");

        let (status, body) = send(&app.router, Method::POST, &refund_uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }
}
