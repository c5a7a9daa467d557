//! Catalog lookup.

use axum::extract::{Path, State};
use axum::Json;
use boutique_core::{CatalogProduct, Money, VatRate};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A catalog product with its tax-inclusive unit price.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_ht: Money,
    pub price_ttc: Money,
    pub vat_rate: VatRate,
    pub is_active: bool,
}

impl From<CatalogProduct> for ProductResponse {
    fn from(product: CatalogProduct) -> Self {
        let price_ht = product.price_ht();
        let vat_rate = product.vat_rate();
        ProductResponse {
            id: product.id,
            name: product.name,
            description: product.description,
            price_ht,
            price_ttc: price_ht.add_vat(vat_rate),
            vat_rate,
            is_active: product.is_active,
        }
    }
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .db
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    Ok(Json(product.into()))
}
