//! services/api/src/web/account.rs
//!
//! The caller's order history and profile.

use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use storefront_core::domain::{OrderLine, OrderWithItems, ProfileChanges, User, UserId};
use utoipa::ToSchema;

use crate::web::{
    auth::MessageResponse,
    error::{ApiJson, HttpError},
    state::AppState,
};

//=========================================================================================
// Order History
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub product_id: i32,
    pub qty: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub product_name: String,
    pub image: Option<String>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            qty: line.qty,
            price: line.price,
            product_name: line.product_name.unwrap_or_else(|| "Unknown".to_string()),
            image: line.image,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub status: String,
    /// `YYYY-MM-DD`
    pub order_date: String,
    pub items: Vec<OrderLineResponse>,
}

impl From<OrderWithItems> for OrderResponse {
    fn from(o: OrderWithItems) -> Self {
        Self {
            id: o.order.id,
            total_amount: o.order.total_amount,
            status: o.order.status.to_string(),
            order_date: o.order.created_at.format("%Y-%m-%d").to_string(),
            items: o.lines.into_iter().map(OrderLineResponse::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OrdersResponse {
    pub orders: Vec<OrderResponse>,
}

/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/user/orders",
    tag = "account",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Order history", body = OrdersResponse),
        (status = 401, description = "Missing or bad token", body = MessageResponse)
    )
)]
pub async fn list_orders_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<OrdersResponse>, HttpError> {
    let orders = state.accounts.list_orders(user_id).await?;
    Ok(Json(OrdersResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
    }))
}

//=========================================================================================
// Profile
//=========================================================================================

/// Distinguishes an explicit `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Absent keys are left unchanged. `phone` and `address` may be set to `null`.
#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<User> for ProfileUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            address: user.address,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub msg: String,
    pub user: ProfileUser,
}

/// Update the caller's profile.
#[utoipa::path(
    put,
    path = "/user/profile",
    tag = "account",
    request_body = UpdateProfileRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Email or username already taken", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, HttpError> {
    let user = state
        .accounts
        .update_profile(
            user_id,
            ProfileChanges {
                full_name: req.full_name,
                email: req.email,
                username: req.username,
                phone: req.phone,
                address: req.address,
            },
        )
        .await?;

    Ok(Json(ProfileResponse {
        msg: "Profile updated successfully".to_string(),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_clears_while_absent_keys_are_untouched() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"phone": null, "full_name": "Ana"}"#).unwrap();

        assert_eq!(req.phone, Some(None));
        assert_eq!(req.address, None);
        assert_eq!(req.full_name.as_deref(), Some("Ana"));
    }
}
