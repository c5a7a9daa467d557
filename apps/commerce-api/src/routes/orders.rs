//! Order and credit note endpoints (backoffice).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use boutique_core::checkout::OrderConfirmationEmail;
use boutique_core::credit_note::CreditNote;
use boutique_core::order::Order;

use crate::error::ApiResult;
use crate::services::IssueCreditNote;
use crate::state::AppState;

pub async fn get_order(State(state): State<AppState>, Path(order_id): Path<String>) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.get_order(&order_id).await?))
}

pub async fn confirmation(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderConfirmationEmail>> {
    Ok(Json(state.orders.confirmation(&order_id).await?))
}

pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.mark_delivered(&order_id).await?))
}

pub async fn issue_credit_note(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(body): Json<IssueCreditNote>,
) -> ApiResult<(StatusCode, Json<CreditNote>)> {
    let note = state.orders.issue_credit_note(&order_id, &body).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn list_credit_notes(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Vec<CreditNote>>> {
    Ok(Json(state.orders.list_credit_notes(&order_id).await?))
}

pub async fn refund_credit_note(
    State(state): State<AppState>,
    Path(credit_note_id): Path<String>,
) -> ApiResult<Json<CreditNote>> {
    Ok(Json(state.orders.refund_credit_note(&credit_note_id).await?))
}
