//! services/api/src/web/checkout.rs
//!
//! The checkout endpoint. Guests may check out; a valid bearer token attaches
//! the order to its user.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{CartLine, ShippingInfo};
use utoipa::ToSchema;

use crate::web::{
    auth::MessageResponse,
    error::{ApiJson, HttpError},
    middleware::MaybeUser,
    state::AppState,
};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: i32,
    /// Defaults to 1.
    pub quantity: Option<i32>,
    /// Overrides the catalog price when present.
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
}

/// A cart plus shipping details. Missing text fields are reported by name.
#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[schema(value_type = Option<f64>)]
    pub total_amount: Option<Decimal>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub msg: String,
    pub order_id: i32,
}

/// Place an order for the submitted cart.
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    request_body = CheckoutRequest,
    security((), ("bearer" = [])),
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 400, description = "Invalid cart or not enough stock", body = MessageResponse),
        (status = 401, description = "A token was sent but is not valid", body = MessageResponse),
        (status = 404, description = "A product does not exist", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(MaybeUser(user_id)): Extension<MaybeUser>,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let cart: Vec<CartLine> = req
        .items
        .into_iter()
        .map(|item| CartLine {
            product_id: item.product_id,
            quantity: item.quantity.unwrap_or(1),
            unit_price: item.unit_price,
        })
        .collect();

    let shipping = ShippingInfo {
        full_name: req.full_name,
        email: req.email,
        phone: req.phone,
        street_address: req.street_address,
        city: req.city,
        postal_code: req.postal_code,
        country: req.country,
        total_amount: req.total_amount,
    };

    let placed = state.orders.place_order(&cart, shipping, user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            msg: "Checkout successful".to_string(),
            order_id: placed.order.id,
        }),
    ))
}
