//! Cart and checkout endpoints.
//!
//! `{key}` is a cart key: `session:<id>`, `customer:<id>`, or a bare
//! session id.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use boutique_core::checkout::CheckoutRequest;
use boutique_core::order::Order;
use boutique_core::snapshot::CustomerDetails;
use boutique_core::Cart;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::gateways::PaymentSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPaymentRequest {
    pub customer: CustomerDetails,
}

pub async fn get_cart(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<Json<Cart>> {
    Ok(Json(state.carts.get_cart(&key).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<AddItemRequest>,
) -> ApiResult<Json<Cart>> {
    let cart = state.carts.add_item(&key, body.product_id, body.quantity).await?;
    Ok(Json(cart))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path((key, product_id)): Path<(String, i64)>,
    Json(body): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<Cart>> {
    let cart = state.carts.update_quantity(&key, product_id, body.quantity).await?;
    Ok(Json(cart))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((key, product_id)): Path<(String, i64)>,
) -> ApiResult<Json<Cart>> {
    Ok(Json(state.carts.remove_item(&key, product_id).await?))
}

pub async fn clear_cart(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<StatusCode> {
    state.carts.clear(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_payment(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<StartPaymentRequest>,
) -> ApiResult<Json<PaymentSession>> {
    let session = state.checkout.start_payment(&key, &body.customer).await?;
    Ok(Json(session))
}

pub async fn checkout(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.checkout.complete_checkout(&key, &body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
